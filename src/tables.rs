use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

pub const PLAYERS_FILE: &str = "players.csv";
pub const CLUBS_FILE: &str = "clubs.csv";
pub const TRANSFERS_FILE: &str = "transfers.csv";
pub const VALUATIONS_FILE: &str = "player_valuations.csv";
pub const APPEARANCES_FILE: &str = "appearances.csv";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Player {
    pub player_id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(
        rename = "country_of_citizenship",
        default,
        deserialize_with = "de_opt_text"
    )]
    pub nationality: Option<String>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub current_club_id: Option<u32>,
    #[serde(default)]
    pub current_club_name: String,
    #[serde(
        rename = "current_club_domestic_competition_id",
        default,
        deserialize_with = "de_opt_text"
    )]
    pub current_league_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub contract_expiration_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub height_in_cm: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Club {
    pub club_id: u32,
    pub name: String,
    #[serde(
        rename = "domestic_competition_id",
        default,
        deserialize_with = "de_opt_text"
    )]
    pub league_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferRecord {
    pub player_id: u32,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub transfer_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub from_club_id: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_parse")]
    pub to_club_id: Option<u32>,
    #[serde(default)]
    pub from_club_name: String,
    #[serde(default)]
    pub to_club_name: String,
    #[serde(rename = "transfer_fee", default, deserialize_with = "de_opt_parse")]
    pub fee: Option<f64>,
}

impl TransferRecord {
    /// Unknown, negative and non-finite fees all count as a zero-fee move.
    pub fn fee_or_zero(&self) -> f64 {
        match self.fee {
            Some(fee) if fee.is_finite() && fee > 0.0 => fee,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValuationRecord {
    pub player_id: u32,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(
        rename = "market_value_in_eur",
        default,
        deserialize_with = "de_opt_parse"
    )]
    pub market_value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppearanceRecord {
    pub player_id: u32,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_count")]
    pub goals: u32,
    #[serde(default, deserialize_with = "de_count")]
    pub assists: u32,
    #[serde(default, deserialize_with = "de_count")]
    pub minutes_played: u32,
}

/// Market value as seen by the affordability step. `Unknown` is never
/// compared against a club's spending profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarketValue {
    Known(f64),
    Unknown,
}

impl MarketValue {
    pub fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            Some(v) if v.is_finite() && v > 0.0 => MarketValue::Known(v),
            _ => MarketValue::Unknown,
        }
    }

    pub fn known(self) -> Option<f64> {
        match self {
            MarketValue::Known(v) => Some(v),
            MarketValue::Unknown => None,
        }
    }
}

impl Serialize for MarketValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MarketValue::Known(v) => serializer.serialize_f64(*v),
            MarketValue::Unknown => serializer.serialize_none(),
        }
    }
}

/// Latest valuation at or before `as_of`.
///
/// Returns `None` when the player has no valuation records at all. Records
/// that all postdate `as_of`, or an unusable latest value, give
/// `MarketValue::Unknown`.
pub fn latest_market_value(records: &[&ValuationRecord], as_of: NaiveDate) -> Option<MarketValue> {
    if records.is_empty() {
        return None;
    }
    let latest = records
        .iter()
        .filter_map(|r| r.date.map(|d| (d, r.market_value)))
        .filter(|(d, _)| *d <= as_of)
        .max_by(|a, b| a.0.cmp(&b.0));
    Some(match latest {
        Some((_, value)) => MarketValue::from_raw(value),
        None => MarketValue::Unknown,
    })
}

/// Club lookups by id and by display name. When an id or a name repeats, the
/// last row carrying it wins.
#[derive(Debug, Clone, Default)]
pub struct ClubDirectory {
    by_id: HashMap<u32, Club>,
    id_by_name: HashMap<String, u32>,
}

impl ClubDirectory {
    pub fn from_clubs(clubs: &[Club]) -> Self {
        let mut by_id = HashMap::with_capacity(clubs.len());
        let mut id_by_name = HashMap::with_capacity(clubs.len());
        for club in clubs {
            by_id.insert(club.club_id, club.clone());
            id_by_name.insert(club.name.clone(), club.club_id);
        }
        Self { by_id, id_by_name }
    }

    pub fn get(&self, club_id: u32) -> Option<&Club> {
        self.by_id.get(&club_id)
    }

    pub fn id_for_name(&self, name: &str) -> Option<u32> {
        self.id_by_name.get(name).copied()
    }

    pub fn league_of(&self, club_id: u32) -> Option<&str> {
        self.get(club_id).and_then(|c| c.league_id.as_deref())
    }

    pub fn league_for_name(&self, name: &str) -> Option<&str> {
        self.id_for_name(name).and_then(|id| self.league_of(id))
    }

    pub fn clubs(&self) -> impl Iterator<Item = &Club> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub players: Vec<Player>,
    pub clubs: Vec<Club>,
    pub transfers: Vec<TransferRecord>,
    pub valuations: Vec<ValuationRecord>,
    pub appearances: Vec<AppearanceRecord>,
}

impl Tables {
    /// Reads the transfer-market CSV export from `dir`. `appearances.csv` is
    /// optional; the other four files are required.
    pub fn load_csv_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(anyhow!("data directory {} does not exist", dir.display()));
        }
        let players = read_csv::<Player>(&dir.join(PLAYERS_FILE))?;
        let clubs = read_csv::<Club>(&dir.join(CLUBS_FILE))?;
        let transfers = read_csv::<TransferRecord>(&dir.join(TRANSFERS_FILE))?;
        let valuations = read_csv::<ValuationRecord>(&dir.join(VALUATIONS_FILE))?;
        let appearances_path = dir.join(APPEARANCES_FILE);
        let appearances = if appearances_path.exists() {
            read_csv::<AppearanceRecord>(&appearances_path)?
        } else {
            Vec::new()
        };

        let tables = Self {
            players,
            clubs,
            transfers,
            valuations,
            appearances,
        };
        info!(
            dir = %dir.display(),
            players = tables.players.len(),
            clubs = tables.clubs.len(),
            transfers = tables.transfers.len(),
            valuations = tables.valuations.len(),
            appearances = tables.appearances.len(),
            "loaded csv tables"
        );
        Ok(tables)
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open csv {}", path.display()))?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (idx, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(err) => {
                skipped += 1;
                if skipped <= 5 {
                    warn!(file = %path.display(), line = idx + 2, "skipping row: {err}");
                }
            }
        }
    }
    if skipped > 0 {
        warn!(file = %path.display(), skipped, "rows skipped while reading csv");
    }
    Ok(rows)
}

/// Accepts `YYYY-MM-DD` with an optional time suffix (`2025-06-30 00:00:00`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn de_opt_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan")))
}

fn de_opt_parse<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = de_opt_text(de)?;
    Ok(raw.and_then(|s| s.parse::<T>().ok()))
}

fn de_opt_date<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw = de_opt_text(de)?;
    Ok(raw.as_deref().and_then(parse_date))
}

fn de_count<'de, D: Deserializer<'de>>(de: D) -> Result<u32, D::Error> {
    let raw: Option<f64> = de_opt_parse(de)?;
    Ok(raw
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u32)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valuation(day: &str, value: Option<f64>) -> ValuationRecord {
        ValuationRecord {
            player_id: 1,
            date: parse_date(day),
            market_value: value,
        }
    }

    #[test]
    fn parse_date_accepts_time_suffix() {
        assert_eq!(
            parse_date("2025-06-30 00:00:00"),
            NaiveDate::from_ymd_opt(2025, 6, 30)
        );
        assert_eq!(parse_date("2025-06"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn latest_value_respects_reference_date() {
        let a = valuation("2023-01-10", Some(5_000_000.0));
        let b = valuation("2024-07-01", Some(9_000_000.0));
        let c = valuation("2026-01-01", Some(20_000_000.0));
        let records = vec![&a, &c, &b];
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            latest_market_value(&records, as_of),
            Some(MarketValue::Known(9_000_000.0))
        );
    }

    #[test]
    fn latest_value_distinguishes_missing_from_unknown() {
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(latest_market_value(&[], as_of), None);

        let future = valuation("2030-01-01", Some(1.0));
        assert_eq!(
            latest_market_value(&[&future], as_of),
            Some(MarketValue::Unknown)
        );

        let zero = valuation("2020-01-01", Some(0.0));
        assert_eq!(
            latest_market_value(&[&zero], as_of),
            Some(MarketValue::Unknown)
        );
    }

    #[test]
    fn club_directory_last_name_wins() {
        let clubs = vec![
            Club {
                club_id: 1,
                name: "Sporting".to_string(),
                league_id: Some("PO1".to_string()),
            },
            Club {
                club_id: 2,
                name: "Sporting".to_string(),
                league_id: Some("ES2".to_string()),
            },
        ];
        let dir = ClubDirectory::from_clubs(&clubs);
        assert_eq!(dir.id_for_name("Sporting"), Some(2));
        assert_eq!(dir.league_for_name("Sporting"), Some("ES2"));
        assert_eq!(dir.league_of(1), Some("PO1"));
        assert_eq!(dir.league_for_name("Nowhere"), None);
    }

    #[test]
    fn fee_or_zero_sanitizes() {
        let mut t = TransferRecord::default();
        assert_eq!(t.fee_or_zero(), 0.0);
        t.fee = Some(f64::NAN);
        assert_eq!(t.fee_or_zero(), 0.0);
        t.fee = Some(-3.0);
        assert_eq!(t.fee_or_zero(), 0.0);
        t.fee = Some(2.5e6);
        assert_eq!(t.fee_or_zero(), 2.5e6);
    }
}
