use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::snapshot::Snapshot;
use crate::tables::{MarketValue, Player};

const FORM_WINDOW_MONTHS: u32 = 6;

/// Inputs handed to trained classifiers. Performance counts cover the six
/// months before the reference date; `worthiness` uses the whole record.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub player_id: u32,
    pub age: Option<i32>,
    pub position: Option<String>,
    pub nationality: Option<String>,
    pub height_in_cm: Option<f64>,
    pub market_value: MarketValue,
    pub contract_remaining_years: Option<f64>,
    pub goals: u32,
    pub assists: u32,
    pub minutes_played: u32,
    pub matches: u32,
    pub num_transfers: usize,
    pub avg_transfer_fee: f64,
    pub worthiness: f64,
    pub valuable_player: bool,
}

/// Calendar-year difference, the way ages are quoted on transfer sites.
pub fn age_on(birth: Option<NaiveDate>, reference: NaiveDate) -> Option<i32> {
    birth.map(|b| reference.year() - b.year())
}

pub fn build_feature_row(
    snapshot: &Snapshot,
    player: &Player,
    market_value: MarketValue,
    reference: NaiveDate,
) -> FeatureRow {
    let window_start = reference
        .checked_sub_months(Months::new(FORM_WINDOW_MONTHS))
        .unwrap_or(reference);

    let appearances = snapshot.appearances_of(player.player_id);
    let (mut goals, mut assists, mut minutes, mut matches) = (0u32, 0u32, 0u32, 0u32);
    for a in &appearances {
        let Some(date) = a.date else {
            continue;
        };
        if date >= window_start && date < reference {
            goals = goals.saturating_add(a.goals);
            assists = assists.saturating_add(a.assists);
            minutes = minutes.saturating_add(a.minutes_played);
            matches = matches.saturating_add(1);
        }
    }

    let worthiness = if appearances.is_empty() {
        0.0
    } else {
        let n = appearances.len() as f64;
        let mean_goals = appearances.iter().map(|a| a.goals as f64).sum::<f64>() / n;
        let mean_assists = appearances.iter().map(|a| a.assists as f64).sum::<f64>() / n;
        let mean_minutes = appearances.iter().map(|a| a.minutes_played as f64).sum::<f64>() / n;
        mean_goals * 4.0 + mean_assists * 3.0 + mean_minutes / 90.0
    };

    let prior_transfers: Vec<_> = snapshot
        .transfers_of(player.player_id)
        .into_iter()
        .filter(|t| t.transfer_date.is_some_and(|d| d < reference))
        .collect();
    let known_fees: Vec<f64> = prior_transfers
        .iter()
        .filter_map(|t| t.fee)
        .filter(|f| f.is_finite())
        .collect();
    let avg_transfer_fee = if known_fees.is_empty() {
        0.0
    } else {
        known_fees.iter().sum::<f64>() / known_fees.len() as f64
    };

    let valuable_player = match (market_value.known(), snapshot.valuation_p75()) {
        (Some(value), Some(p75)) => value > p75,
        _ => false,
    };

    FeatureRow {
        player_id: player.player_id,
        age: age_on(player.date_of_birth, reference),
        position: player.position.clone(),
        nationality: player.nationality.clone(),
        height_in_cm: player.height_in_cm,
        market_value,
        contract_remaining_years: player
            .contract_expiration_date
            .map(|end| (end - reference).num_days() as f64 / 365.0),
        goals,
        assists,
        minutes_played: minutes,
        matches,
        num_transfers: prior_transfers.len(),
        avg_transfer_fee,
        worthiness,
        valuable_player,
    }
}
