pub mod config;
pub mod destinations;
pub mod engine;
pub mod error;
pub mod export;
pub mod features;
pub mod logging;
pub mod market_trends;
pub mod models;
pub mod patterns;
pub mod probability;
pub mod score_map;
pub mod snapshot;
pub mod source;
pub mod spending;
pub mod store;
pub mod tables;

pub use config::EngineConfig;
pub use engine::{Engine, EstimateResponse, TransferEstimate};
pub use error::EstimateError;
