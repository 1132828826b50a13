use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tables::parse_date;

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

pub const DEFAULT_REFERENCE_DATE: NaiveDate = ymd(2025, 1, 1);
pub const DEFAULT_CONTRACT_CUTOFF: NaiveDate = ymd(2025, 6, 30);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWeights {
    pub recent_outgoing: f64,
    pub club_transitions: f64,
    pub nationality: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            recent_outgoing: 0.5,
            club_transitions: 0.5,
            nationality: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffordabilityBands {
    // Upper limit is mean + std_multiplier * std.
    pub std_multiplier: f64,
    pub over_limit_multiplier: f64,
    pub under_mean_multiplier: f64,
}

impl Default for AffordabilityBands {
    fn default() -> Self {
        Self {
            std_multiplier: 1.5,
            over_limit_multiplier: 0.2,
            under_mean_multiplier: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartureConfig {
    pub contract_cutoff: NaiveDate,
    pub expiring_contract_factor: f64,
    pub running_contract_factor: f64,
    pub unknown_league_factor: f64,
}

impl Default for DepartureConfig {
    fn default() -> Self {
        Self {
            contract_cutoff: DEFAULT_CONTRACT_CUTOFF,
            expiring_contract_factor: 0.6,
            running_contract_factor: 0.2,
            unknown_league_factor: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// "Today" for ages, valuations and feature windows.
    pub reference_date: NaiveDate,
    pub top_k: usize,
    pub weights: SourceWeights,
    pub affordability: AffordabilityBands,
    pub departure: DepartureConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_date: DEFAULT_REFERENCE_DATE,
            top_k: 5,
            weights: SourceWeights::default(),
            affordability: AffordabilityBands::default(),
            departure: DepartureConfig::default(),
        }
    }
}

impl EngineConfig {
    /// JSON file from `OUTLOOK_CONFIG` when set, then `OUTLOOK_*` overrides.
    pub fn load() -> Self {
        match env::var("OUTLOOK_CONFIG") {
            Ok(path) if !path.trim().is_empty() => match Self::from_json_file(Path::new(path.trim())) {
                Ok(cfg) => cfg.with_env_overrides(),
                Err(err) => {
                    warn!("ignoring config file: {err:#}");
                    Self::from_env()
                }
            },
            _ => Self::from_env(),
        }
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(date) = env_date("OUTLOOK_REFERENCE_DATE") {
            self.reference_date = date;
        }
        if let Some(date) = env_date("OUTLOOK_CONTRACT_CUTOFF") {
            self.departure.contract_cutoff = date;
        }
        if let Some(k) = env::var("OUTLOOK_TOP_K")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|k| *k > 0)
        {
            self.top_k = k;
        }
        if let Some(w) = env_weight("OUTLOOK_WEIGHT_RECENT") {
            self.weights.recent_outgoing = w;
        }
        if let Some(w) = env_weight("OUTLOOK_WEIGHT_TRANSITIONS") {
            self.weights.club_transitions = w;
        }
        if let Some(w) = env_weight("OUTLOOK_WEIGHT_NATIONALITY") {
            self.weights.nationality = w;
        }
        self
    }
}

fn env_date(key: &str) -> Option<NaiveDate> {
    env::var(key).ok().and_then(|val| parse_date(&val))
}

fn env_weight(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<f64>().ok())
        .filter(|w| w.is_finite() && *w >= 0.0)
}
