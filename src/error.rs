use serde::Serialize;
use thiserror::Error;

/// Request-level failures. Each one ends a single request early and is
/// reported back as a payload, never as a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    #[error("player not found")]
    PlayerNotFound(u32),
    #[error("no valuation data for player")]
    NoValuation(u32),
}

impl EstimateError {
    pub fn player_id(&self) -> u32 {
        match self {
            EstimateError::PlayerNotFound(id) | EstimateError::NoValuation(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub player_id: u32,
    pub error: String,
}

impl From<&EstimateError> for ErrorPayload {
    fn from(err: &EstimateError) -> Self {
        Self {
            player_id: err.player_id(),
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_message_and_id() {
        let payload = ErrorPayload::from(&EstimateError::NoValuation(42));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["player_id"], 42);
        assert_eq!(json["error"], "no valuation data for player");
        assert_eq!(
            EstimateError::PlayerNotFound(7).to_string(),
            "player not found"
        );
    }
}
