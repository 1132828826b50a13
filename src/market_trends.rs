use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::tables::{ClubDirectory, TransferRecord};

pub const MAX_INVESTMENT_SCORE: f64 = 10.0;

/// A league's investment score, or the explicit absence of one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeagueInvestment {
    Known(f64),
    Unknown,
}

impl LeagueInvestment {
    /// Destination multiplier: `1 + score / 10`, neutral when unknown.
    pub fn multiplier(self) -> f64 {
        match self {
            LeagueInvestment::Known(score) => 1.0 + score / MAX_INVESTMENT_SCORE,
            LeagueInvestment::Unknown => 1.0,
        }
    }

    /// Score rescaled to [0, 1], or `default` when unknown.
    pub fn factor_or(self, default: f64) -> f64 {
        match self {
            LeagueInvestment::Known(score) => score / MAX_INVESTMENT_SCORE,
            LeagueInvestment::Unknown => default,
        }
    }
}

/// Inbound transfer spend per league, scaled so the biggest spender is 10.
#[derive(Debug, Clone, Default)]
pub struct InvestmentScores {
    by_league: HashMap<String, f64>,
}

impl InvestmentScores {
    pub fn compute(transfers: &[TransferRecord], clubs: &ClubDirectory) -> Self {
        // Every league with at least one club is present, spend or not.
        let mut totals: HashMap<String, f64> = clubs
            .clubs()
            .filter_map(|c| c.league_id.clone())
            .map(|league| (league, 0.0))
            .collect();

        for t in transfers {
            let Some(league) = t.to_club_id.and_then(|id| clubs.league_of(id)) else {
                continue;
            };
            if let Some(total) = totals.get_mut(league) {
                *total += t.fee_or_zero();
            }
        }

        let max = totals.values().copied().fold(0.0_f64, f64::max);
        let by_league = totals
            .into_iter()
            .map(|(league, total)| {
                let score = if max > 0.0 {
                    total / max * MAX_INVESTMENT_SCORE
                } else {
                    0.0
                };
                (league, score)
            })
            .collect();
        Self { by_league }
    }

    pub fn from_scores<I, K>(scores: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            by_league: scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, league_id: &str) -> LeagueInvestment {
        match self.by_league.get(league_id) {
            Some(score) => LeagueInvestment::Known(*score),
            None => LeagueInvestment::Unknown,
        }
    }

    pub fn lookup(&self, league_id: Option<&str>) -> LeagueInvestment {
        league_id.map_or(LeagueInvestment::Unknown, |id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_league.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_league.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeagueMarketRow {
    pub league_id: String,
    pub total_bought: f64,
    pub total_sold: f64,
    pub net_spending: f64,
    pub n_clubs: usize,
    pub avg_spending_per_club: f64,
    pub investment_score: f64,
    pub attractiveness_score: f64,
    pub net_score: f64,
    pub market_trend_score: f64,
}

/// Buying, selling and net positions per league, each min-max scaled to
/// [0, 10], combined as `0.5 * investment + 0.3 * attractiveness + 0.2 * net`.
/// Rows come back sorted by `market_trend_score` descending.
pub fn market_report(transfers: &[TransferRecord], clubs: &ClubDirectory) -> Vec<LeagueMarketRow> {
    let mut n_clubs: BTreeMap<String, usize> = BTreeMap::new();
    for club in clubs.clubs() {
        if let Some(league) = club.league_id.as_ref() {
            *n_clubs.entry(league.clone()).or_default() += 1;
        }
    }

    let mut bought: HashMap<&str, f64> = HashMap::new();
    let mut sold: HashMap<&str, f64> = HashMap::new();
    for t in transfers {
        let fee = t.fee_or_zero();
        if let Some(league) = t.to_club_id.and_then(|id| clubs.league_of(id)) {
            *bought.entry(league).or_default() += fee;
        }
        if let Some(league) = t.from_club_id.and_then(|id| clubs.league_of(id)) {
            *sold.entry(league).or_default() += fee;
        }
    }

    // Only leagues that bought or sold at least once get a row.
    let leagues: BTreeSet<&str> = bought.keys().chain(sold.keys()).copied().collect();
    let mut rows: Vec<LeagueMarketRow> = leagues
        .into_iter()
        .map(|league| {
            let total_bought = bought.get(league).copied().unwrap_or(0.0);
            let total_sold = sold.get(league).copied().unwrap_or(0.0);
            let n = n_clubs.get(league).copied().unwrap_or(0);
            LeagueMarketRow {
                league_id: league.to_string(),
                total_bought,
                total_sold,
                net_spending: total_bought - total_sold,
                n_clubs: n,
                avg_spending_per_club: total_bought / n.max(1) as f64,
                investment_score: 0.0,
                attractiveness_score: 0.0,
                net_score: 0.0,
                market_trend_score: 0.0,
            }
        })
        .collect();

    let investment = min_max_scale(rows.iter().map(|r| r.total_bought));
    let attractiveness = min_max_scale(rows.iter().map(|r| r.total_sold));
    let net = min_max_scale(rows.iter().map(|r| r.net_spending));
    for (idx, row) in rows.iter_mut().enumerate() {
        row.investment_score = investment[idx];
        row.attractiveness_score = attractiveness[idx];
        row.net_score = net[idx];
        row.market_trend_score =
            0.5 * row.investment_score + 0.3 * row.attractiveness_score + 0.2 * row.net_score;
    }

    rows.sort_by(|a, b| {
        b.market_trend_score
            .total_cmp(&a.market_trend_score)
            .then_with(|| a.league_id.cmp(&b.league_id))
    });
    rows
}

pub fn write_report_csv(path: &Path, rows: &[LeagueMarketRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create market report {}", path.display()))?;
    for row in rows {
        writer.serialize(row).context("write market report row")?;
    }
    writer.flush().context("flush market report")?;
    Ok(())
}

fn min_max_scale(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let values: Vec<f64> = values.collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    values
        .iter()
        .map(|v| {
            if span > 0.0 {
                (v - min) / span * MAX_INVESTMENT_SCORE
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Club;

    fn club(id: u32, league: &str) -> Club {
        Club {
            club_id: id,
            name: format!("Club {id}"),
            league_id: Some(league.to_string()),
        }
    }

    fn transfer(from: u32, to: u32, fee: Option<f64>) -> TransferRecord {
        TransferRecord {
            from_club_id: Some(from),
            to_club_id: Some(to),
            from_club_name: format!("Club {from}"),
            to_club_name: format!("Club {to}"),
            fee,
            ..Default::default()
        }
    }

    fn directory() -> ClubDirectory {
        ClubDirectory::from_clubs(&[club(1, "GB1"), club(2, "GB1"), club(3, "ES1"), club(4, "PO1")])
    }

    #[test]
    fn leagues_without_spend_score_zero() {
        let transfers = vec![
            transfer(3, 1, Some(80.0)),
            transfer(4, 2, Some(20.0)),
            transfer(1, 3, Some(50.0)),
            transfer(2, 3, None),
        ];
        let scores = InvestmentScores::compute(&transfers, &directory());
        assert_eq!(scores.get("GB1"), LeagueInvestment::Known(10.0));
        assert_eq!(scores.get("ES1"), LeagueInvestment::Known(5.0));
        assert_eq!(scores.get("PO1"), LeagueInvestment::Known(0.0));
        assert_eq!(scores.get("IT1"), LeagueInvestment::Unknown);
    }

    #[test]
    fn zero_spend_everywhere_avoids_division() {
        let transfers = vec![transfer(1, 3, None), transfer(3, 4, Some(0.0))];
        let scores = InvestmentScores::compute(&transfers, &directory());
        assert_eq!(scores.len(), 3);
        assert_eq!(scores.get("GB1"), LeagueInvestment::Known(0.0));
        assert_eq!(scores.get("ES1"), LeagueInvestment::Known(0.0));
    }

    #[test]
    fn multiplier_and_factor() {
        assert_eq!(LeagueInvestment::Known(10.0).multiplier(), 2.0);
        assert_eq!(LeagueInvestment::Known(0.0).multiplier(), 1.0);
        assert_eq!(LeagueInvestment::Unknown.multiplier(), 1.0);
        assert!((LeagueInvestment::Known(4.0).factor_or(0.3) - 0.4).abs() < 1e-12);
        assert_eq!(LeagueInvestment::Unknown.factor_or(0.3), 0.3);
    }

    #[test]
    fn report_combines_scaled_scores() {
        let transfers = vec![transfer(3, 1, Some(100.0)), transfer(4, 3, Some(40.0))];
        let rows = market_report(&transfers, &directory());
        assert_eq!(rows.len(), 3);

        let gb = rows.iter().find(|r| r.league_id == "GB1").unwrap();
        assert_eq!(gb.n_clubs, 2);
        assert_eq!(gb.total_bought, 100.0);
        assert_eq!(gb.avg_spending_per_club, 50.0);
        assert_eq!(gb.investment_score, 10.0);
        assert_eq!(gb.attractiveness_score, 0.0);
        assert_eq!(gb.net_score, 10.0);
        assert!((gb.market_trend_score - 7.0).abs() < 1e-9);
        assert_eq!(rows[0].league_id, "GB1");

        let po = rows.iter().find(|r| r.league_id == "PO1").unwrap();
        assert_eq!(po.total_sold, 40.0);
        assert_eq!(po.net_spending, -40.0);
        assert!((po.net_score - 1.25).abs() < 1e-9);
        assert!((po.market_trend_score - 1.45).abs() < 1e-9);
    }

    #[test]
    fn report_skips_leagues_without_transfers() {
        let clubs = ClubDirectory::from_clubs(&[
            club(1, "GB1"),
            club(2, "GB1"),
            club(3, "ES1"),
            club(4, "PO1"),
            club(5, "IT1"),
        ]);
        let transfers = vec![transfer(3, 1, Some(100.0)), transfer(4, 3, Some(40.0))];
        let rows = market_report(&transfers, &clubs);

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.league_id != "IT1"));
        let po = rows.iter().find(|r| r.league_id == "PO1").unwrap();
        assert_eq!(po.n_clubs, 1);
        assert_eq!(po.investment_score, 0.0);
        assert!((po.net_score - 1.25).abs() < 1e-9);
        let es = rows.iter().find(|r| r.league_id == "ES1").unwrap();
        assert!((es.investment_score - 4.0).abs() < 1e-9);
    }
}
