use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::destinations::{
    DestinationInputs, RankedDestinations, normalize, round2, score_destinations, select_top,
};
use crate::error::{ErrorPayload, EstimateError};
use crate::features::{FeatureRow, age_on, build_feature_row};
use crate::models::{EstimateSource, ModelSet};
use crate::patterns::extract_patterns;
use crate::probability::{DepartureInputs, estimate_departure};
use crate::score_map::ScoreMap;
use crate::snapshot::{Snapshot, SnapshotHandle};
use crate::tables::{MarketValue, Player, Tables, latest_market_value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferEstimate {
    pub player_id: u32,
    pub market_value: MarketValue,
    /// Percentage points, [0, 100].
    pub transfer_probability: f64,
    pub likely_destinations: RankedDestinations,
    pub probability_source: EstimateSource,
    pub destination_source: EstimateSource,
}

/// What a caller receives for one player: the estimate, or an error payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EstimateResponse {
    Estimate(TransferEstimate),
    Error(ErrorPayload),
}

impl From<Result<TransferEstimate, EstimateError>> for EstimateResponse {
    fn from(result: Result<TransferEstimate, EstimateError>) -> Self {
        match result {
            Ok(estimate) => EstimateResponse::Estimate(estimate),
            Err(err) => EstimateResponse::Error(ErrorPayload::from(&err)),
        }
    }
}

/// Entry point for transfer estimates.
///
/// Built once at process start from a loaded table set. Requests read the
/// currently published snapshot and never mutate it; `reload` publishes a
/// new snapshot without disturbing requests already running.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    models: ModelSet,
    snapshots: SnapshotHandle,
}

impl Engine {
    pub fn new(snapshot: Snapshot, config: EngineConfig) -> Self {
        Self {
            config,
            models: ModelSet::heuristic_only(),
            snapshots: SnapshotHandle::new(snapshot),
        }
    }

    pub fn from_tables(tables: Tables, config: EngineConfig) -> Self {
        Self::new(Snapshot::build(tables), config)
    }

    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models = models;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.current()
    }

    pub fn reload(&self, tables: Tables) {
        let previous = self.snapshots.publish(Snapshot::build(tables));
        info!(
            previous_players = previous.tables().players.len(),
            "published new snapshot"
        );
    }

    pub fn estimate_transfer(&self, player_id: u32) -> Result<TransferEstimate, EstimateError> {
        let snapshot = self.snapshots.current();
        self.estimate_on(&snapshot, player_id)
    }

    pub fn respond(&self, player_id: u32) -> EstimateResponse {
        self.estimate_transfer(player_id).into()
    }

    /// Estimates for many players against one snapshot, in input order.
    pub fn estimate_many(&self, player_ids: &[u32]) -> Vec<EstimateResponse> {
        let snapshot = self.snapshots.current();
        player_ids
            .par_iter()
            .map(|&id| self.estimate_on(&snapshot, id).into())
            .collect()
    }

    fn estimate_on(
        &self,
        snapshot: &Snapshot,
        player_id: u32,
    ) -> Result<TransferEstimate, EstimateError> {
        let cfg = &self.config;
        let player = snapshot
            .player(player_id)
            .ok_or(EstimateError::PlayerNotFound(player_id))?;
        let market_value =
            latest_market_value(&snapshot.valuations_of(player_id), cfg.reference_date)
                .ok_or(EstimateError::NoValuation(player_id))?;

        let features = (!self.models.is_empty())
            .then(|| build_feature_row(snapshot, player, market_value, cfg.reference_date));

        let (probability, probability_source) =
            match features.as_ref().and_then(|row| self.model_departure(row)) {
                Some(p) => (p, EstimateSource::Model),
                None => (
                    self.heuristic_departure(snapshot, player),
                    EstimateSource::Heuristic,
                ),
            };

        let (likely_destinations, destination_source) = match features
            .as_ref()
            .and_then(|row| self.model_destinations(snapshot, row))
        {
            Some(ranked) => (ranked, EstimateSource::Model),
            None => (
                self.heuristic_destinations(snapshot, player, market_value),
                EstimateSource::Heuristic,
            ),
        };

        debug!(
            player_id,
            probability,
            destinations = likely_destinations.len(),
            "estimated transfer"
        );

        Ok(TransferEstimate {
            player_id,
            market_value,
            transfer_probability: round2(probability * 100.0),
            likely_destinations,
            probability_source,
            destination_source,
        })
    }

    fn heuristic_departure(&self, snapshot: &Snapshot, player: &Player) -> f64 {
        let inputs = DepartureInputs {
            transfer_count: snapshot.transfers_of(player.player_id).len(),
            age: age_on(player.date_of_birth, self.config.reference_date),
            contract_expiration: player.contract_expiration_date,
            league_investment: snapshot
                .investment()
                .lookup(player.current_league_id.as_deref()),
        };
        estimate_departure(&inputs, &self.config.departure)
    }

    fn heuristic_destinations(
        &self,
        snapshot: &Snapshot,
        player: &Player,
        market_value: MarketValue,
    ) -> RankedDestinations {
        let tables = snapshot.tables();
        let patterns = extract_patterns(&tables.players, &tables.transfers, player);
        score_destinations(
            &DestinationInputs {
                patterns: &patterns,
                clubs: snapshot.clubs(),
                investment: snapshot.investment(),
                spending: snapshot.spending(),
                market_value,
            },
            &self.config,
        )
    }

    fn model_departure(&self, row: &FeatureRow) -> Option<f64> {
        let model = self.models.departure.as_ref()?;
        match model.predict_departure_probability(row) {
            Ok(p) if p.is_finite() => Some(p.clamp(0.0, 1.0)),
            Ok(p) => {
                warn!(player_id = row.player_id, "departure model returned {p}, using heuristic");
                None
            }
            Err(err) => {
                warn!(player_id = row.player_id, "departure model failed: {err:#}");
                None
            }
        }
    }

    fn model_destinations(&self, snapshot: &Snapshot, row: &FeatureRow) -> Option<RankedDestinations> {
        let model = self.models.destination.as_ref()?;
        let scores = match model.predict_destination_scores(row) {
            Ok(scores) => scores,
            Err(err) => {
                warn!(player_id = row.player_id, "destination model failed: {err:#}");
                return None;
            }
        };

        let clubs = snapshot.clubs();
        let mut map = ScoreMap::new();
        for (club_id, score) in scores {
            if let Some(club) = clubs.get(club_id) {
                map.add(&club.name, score);
            }
        }
        let ranked = select_top(normalize(&map), self.config.top_k, clubs);
        if ranked.is_empty() {
            warn!(player_id = row.player_id, "destination model gave no usable clubs, using heuristic");
            return None;
        }
        Some(ranked)
    }
}
