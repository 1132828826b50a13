use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::features::FeatureRow;

/// Trained club classifier: ranked `(club_id, score)` pairs for a feature row.
pub trait DestinationModel: Send + Sync {
    fn predict_destination_scores(&self, row: &FeatureRow) -> Result<Vec<(u32, f64)>>;
}

/// Trained departure classifier: probability in [0, 1] that the player leaves.
pub trait DepartureModel: Send + Sync {
    fn predict_departure_probability(&self, row: &FeatureRow) -> Result<f64>;
}

/// Which path produced a part of the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Heuristic,
    Model,
}

/// Optional trained models. Empty means heuristic-only.
#[derive(Clone, Default)]
pub struct ModelSet {
    pub destination: Option<Arc<dyn DestinationModel>>,
    pub departure: Option<Arc<dyn DepartureModel>>,
}

impl ModelSet {
    pub fn heuristic_only() -> Self {
        Self::default()
    }

    pub fn with_destination(mut self, model: Arc<dyn DestinationModel>) -> Self {
        self.destination = Some(model);
        self
    }

    pub fn with_departure(mut self, model: Arc<dyn DepartureModel>) -> Self {
        self.departure = Some(model);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_none() && self.departure.is_none()
    }
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("destination", &self.destination.is_some())
            .field("departure", &self.departure.is_some())
            .finish()
    }
}
