//! Error types for the planner core and the glue around it.

use std::time::Duration;

use thiserror::Error;

use crate::stop::StopId;

/// Classified failure reported by a routing service.
///
/// The builder only retries the transient classes; everything else fails the
/// build on first sight.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::RateLimited(_) | ServiceError::Unavailable(_))
    }
}

/// Why a matrix build gave up.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingFailure {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("matrix build timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("routing service failed with {} unresolved pair(s): {cause}", unresolved.len())]
    RoutingService {
        unresolved: Vec<(StopId, StopId)>,
        #[source]
        cause: RoutingFailure,
    },

    #[error("cost matrix has no entry for {from} -> {to}")]
    IncompleteMatrix { from: StopId, to: StopId },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PlannerError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        PlannerError::InvalidInput(message.into())
    }

    /// Prefixes an input error message with where it was found.
    pub(crate) fn with_context(self, context: &str) -> Self {
        match self {
            PlannerError::InvalidInput(message) => {
                PlannerError::InvalidInput(format!("{context}: {message}"))
            }
            other => other,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        PlannerError::Config(message.into())
    }
}

pub type Result<T, E = PlannerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classes() {
        assert!(ServiceError::RateLimited("429".into()).is_transient());
        assert!(ServiceError::Unavailable("503".into()).is_transient());
        assert!(!ServiceError::InvalidCoordinates("bad".into()).is_transient());
        assert!(!ServiceError::InvalidResponse("short row".into()).is_transient());
    }

    #[test]
    fn routing_error_counts_pairs() {
        let err = PlannerError::RoutingService {
            unresolved: vec![
                (StopId::from("a"), StopId::from("b")),
                (StopId::from("b"), StopId::from("a")),
            ],
            cause: RoutingFailure::Service(ServiceError::Unavailable("down".into())),
        };
        let message = err.to_string();
        assert!(message.contains("2 unresolved pair(s)"), "{message}");
        assert!(message.contains("down"), "{message}");
    }
}
