use chrono::NaiveDate;

use crate::config::DepartureConfig;
use crate::market_trends::LeagueInvestment;

#[derive(Debug, Clone, Copy)]
pub struct DepartureInputs {
    pub transfer_count: usize,
    pub age: Option<i32>,
    pub contract_expiration: Option<NaiveDate>,
    pub league_investment: LeagueInvestment,
}

/// `0.6` for contracts ending on or before the cutoff, `0.2` otherwise
/// (an unknown expiry counts as running).
pub fn contract_factor(expiration: Option<NaiveDate>, cfg: &DepartureConfig) -> f64 {
    match expiration {
        Some(end) if end <= cfg.contract_cutoff => cfg.expiring_contract_factor,
        _ => cfg.running_contract_factor,
    }
}

/// `min(1, transfers/10 + (100 - age)/200 + contract_factor)`; an unknown age
/// adds nothing.
pub fn base_score(inputs: &DepartureInputs, cfg: &DepartureConfig) -> f64 {
    let history = inputs.transfer_count as f64 / 10.0;
    let youth = inputs
        .age
        .map(|age| (100.0 - age as f64) / 200.0)
        .unwrap_or(0.0);
    clamp_unit(history + youth + contract_factor(inputs.contract_expiration, cfg))
}

/// Linear heuristic departure score in [0, 1]. Not calibrated against
/// observed departures; read it as a ranking signal, not a frequency.
pub fn estimate_departure(inputs: &DepartureInputs, cfg: &DepartureConfig) -> f64 {
    let league = inputs
        .league_investment
        .factor_or(cfg.unknown_league_factor);
    clamp_unit(base_score(inputs, cfg) + league)
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
