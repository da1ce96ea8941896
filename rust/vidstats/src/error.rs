use crate::request::{Entity, Metric, SpecialMode};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication failed")]
    Auth,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A special mode was requested against an entity it cannot run on.
    #[error("validation failed: special={special} requires entity={required}, got entity={actual}")]
    EntityMismatch {
        special: SpecialMode,
        required: Entity,
        actual: Entity,
    },

    #[error("validation failed: {field}={value}: {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// The metric has no meaning for the requested entity (e.g. a delta sum
    /// over final statistics). Never coerced to another metric.
    #[error("unsupported metric: metric={metric} is not supported for entity={entity}")]
    UnsupportedMetric { metric: Metric, entity: Entity },

    #[error("query execution failed")]
    Execution(#[source] anyhow::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// True for failures caused by the request itself; retrying the same
    /// input cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Auth
                | ServiceError::InvalidRequest(_)
                | ServiceError::EntityMismatch { .. }
                | ServiceError::Validation { .. }
                | ServiceError::UnsupportedMetric { .. }
        )
    }

    /// Execution failures are logged where they happen, next to the SQL text.
    fn logged_at_response(&self) -> bool {
        !self.is_client_error() && !matches!(self, ServiceError::Execution(_))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Auth => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidRequest(_)
            | ServiceError::EntityMismatch { .. }
            | ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::UnsupportedMetric { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.logged_at_response() {
            error!(error = ?self, "request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_internal_failures_log_at_response() {
        let internal = ServiceError::Internal(anyhow::anyhow!("unbound placeholder"));
        assert!(internal.logged_at_response());
        assert!(!ServiceError::Execution(anyhow::anyhow!("timeout")).logged_at_response());
        assert!(!ServiceError::Auth.logged_at_response());
        assert!(!ServiceError::InvalidRequest("entity: unknown".into()).logged_at_response());
    }

    #[test]
    fn execution_body_hides_the_cause() {
        let err = ServiceError::Execution(anyhow::anyhow!("relation \"videos\" does not exist"));
        assert_eq!(err.to_string(), "query execution failed");
    }
}
