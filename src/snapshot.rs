use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::market_trends::InvestmentScores;
use crate::spending::SpendingProfiles;
use crate::tables::{
    AppearanceRecord, ClubDirectory, Player, Tables, TransferRecord, ValuationRecord,
};

/// Read-only tables plus everything derived from them once per load.
#[derive(Debug)]
pub struct Snapshot {
    tables: Tables,
    clubs: ClubDirectory,
    player_index: HashMap<u32, usize>,
    transfers_by_player: HashMap<u32, Vec<usize>>,
    valuations_by_player: HashMap<u32, Vec<usize>>,
    appearances_by_player: HashMap<u32, Vec<usize>>,
    investment: InvestmentScores,
    spending: SpendingProfiles,
    valuation_p75: Option<f64>,
}

impl Snapshot {
    pub fn build(tables: Tables) -> Self {
        let clubs = ClubDirectory::from_clubs(&tables.clubs);

        let mut player_index = HashMap::with_capacity(tables.players.len());
        for (idx, p) in tables.players.iter().enumerate() {
            player_index.entry(p.player_id).or_insert(idx);
        }
        let transfers_by_player = group_by_player(tables.transfers.iter().map(|t| t.player_id));
        let valuations_by_player = group_by_player(tables.valuations.iter().map(|v| v.player_id));
        let appearances_by_player =
            group_by_player(tables.appearances.iter().map(|a| a.player_id));

        let investment = InvestmentScores::compute(&tables.transfers, &clubs);
        let spending = SpendingProfiles::compute(&tables.transfers);
        let valuation_p75 = quantile(
            tables
                .valuations
                .iter()
                .filter_map(|v| v.market_value)
                .filter(|v| v.is_finite())
                .collect(),
            0.75,
        );

        info!(
            players = player_index.len(),
            clubs = clubs.len(),
            leagues = investment.len(),
            spending_profiles = spending.len(),
            "built snapshot"
        );

        Self {
            tables,
            clubs,
            player_index,
            transfers_by_player,
            valuations_by_player,
            appearances_by_player,
            investment,
            spending,
            valuation_p75,
        }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn clubs(&self) -> &ClubDirectory {
        &self.clubs
    }

    pub fn player(&self, player_id: u32) -> Option<&Player> {
        self.player_index
            .get(&player_id)
            .and_then(|&idx| self.tables.players.get(idx))
    }

    pub fn transfers_of(&self, player_id: u32) -> Vec<&TransferRecord> {
        pick(&self.transfers_by_player, player_id, &self.tables.transfers)
    }

    pub fn valuations_of(&self, player_id: u32) -> Vec<&ValuationRecord> {
        pick(&self.valuations_by_player, player_id, &self.tables.valuations)
    }

    pub fn appearances_of(&self, player_id: u32) -> Vec<&AppearanceRecord> {
        pick(&self.appearances_by_player, player_id, &self.tables.appearances)
    }

    pub fn investment(&self) -> &InvestmentScores {
        &self.investment
    }

    pub fn spending(&self) -> &SpendingProfiles {
        &self.spending
    }

    /// 75th percentile of every recorded valuation, linearly interpolated.
    pub fn valuation_p75(&self) -> Option<f64> {
        self.valuation_p75
    }
}

/// Holds the published snapshot. Readers clone the `Arc` and keep it for the
/// whole request; a reload builds a new snapshot and swaps it in.
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swaps in `snapshot` and returns the one it replaced.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }
}

fn group_by_player(ids: impl Iterator<Item = u32>) -> HashMap<u32, Vec<usize>> {
    let mut out: HashMap<u32, Vec<usize>> = HashMap::new();
    for (idx, id) in ids.enumerate() {
        out.entry(id).or_default().push(idx);
    }
    out
}

fn pick<'a, T>(index: &HashMap<u32, Vec<usize>>, player_id: u32, rows: &'a [T]) -> Vec<&'a T> {
    index
        .get(&player_id)
        .map(|idxs| idxs.iter().filter_map(|&i| rows.get(i)).collect())
        .unwrap_or_default()
}

fn quantile(mut values: Vec<f64>, q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let pos = (values.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(values[lo] + (values[hi] - values[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        assert_eq!(quantile(vec![], 0.75), None);
        assert_eq!(quantile(vec![4.0], 0.75), Some(4.0));
        assert_eq!(quantile(vec![1.0, 2.0, 3.0, 4.0, 5.0], 0.75), Some(4.0));
        assert_eq!(quantile(vec![4.0, 1.0, 3.0, 2.0], 0.75), Some(3.25));
    }

    #[test]
    fn publish_swaps_without_touching_held_snapshots() {
        let mut first = Tables::default();
        first.players.push(Player {
            player_id: 1,
            ..Default::default()
        });
        let handle = SnapshotHandle::new(Snapshot::build(first));
        let held = handle.current();
        assert!(held.player(1).is_some());

        let previous = handle.publish(Snapshot::build(Tables::default()));
        assert!(Arc::ptr_eq(&held, &previous));
        assert!(held.player(1).is_some());
        assert!(handle.current().player(1).is_none());
    }
}
