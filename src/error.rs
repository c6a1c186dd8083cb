//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ObjectId, RewardRequestStatus};

/// Message returned to clients for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "user \"...\" has already requested reward \"...\" for event \"...\""
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`ServiceError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Kind of catalog or request entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// An [`crate::domain::Event`].
    Event,
    /// A [`crate::domain::Reward`].
    Reward,
    /// A [`crate::domain::RewardRequest`].
    RewardRequest,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Event => "event",
            Self::Reward => "reward",
            Self::RewardRequest => "reward request",
        };
        f.write_str(name)
    }
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status               |
/// |-----------|----------------------|---------------------------|
/// | 1000–1999 | Validation / Linkage | 400 Bad Request           |
/// | 2000–2999 | Not Found / Conflict | 404 Not Found / 409       |
/// | 3000–3999 | Server               | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input: missing field, wrong type, or an id that is not
    /// a 24-character hex string.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The reward exists but the event does not offer it.
    #[error("reward \"{reward_id}\" is not associated with event \"{event_id}\"")]
    Linkage {
        /// Event named in the claim.
        event_id: ObjectId,
        /// Reward named in the claim.
        reward_id: ObjectId,
    },

    /// A referenced entity does not exist.
    #[error("{kind} with id \"{id}\" not found")]
    NotFound {
        /// Which kind of entity was looked up.
        kind: EntityKind,
        /// The id that was looked up.
        id: ObjectId,
    },

    /// An active (pending, approved or paid) request already exists for
    /// the same user, event and reward.
    #[error("user \"{user_id}\" has already requested reward \"{reward_id}\" for event \"{event_id}\"")]
    DuplicateRequest {
        /// Claiming user.
        user_id: ObjectId,
        /// Claimed event.
        event_id: ObjectId,
        /// Claimed reward.
        reward_id: ObjectId,
    },

    /// Status change refused by the strict transition policy.
    #[error("status transition from {from} to {to} is not allowed")]
    InvalidTransition {
        /// Current status.
        from: RewardRequestStatus,
        /// Requested status.
        to: RewardRequestStatus,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Shorthand for a [`ServiceError::NotFound`].
    #[must_use]
    pub const fn not_found(kind: EntityKind, id: ObjectId) -> Self {
        Self::NotFound { kind, id }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Linkage { .. } => 1002,
            Self::NotFound { .. } => 2001,
            Self::DuplicateRequest { .. } => 2002,
            Self::InvalidTransition { .. } => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Linkage { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateRequest { .. } | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for failures whose details must not reach the client.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Internal(_))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_internal() {
            tracing::error!(error = %self, "request failed");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn id(hex: &str) -> ObjectId {
        let Ok(id) = hex.parse() else {
            panic!("valid id");
        };
        id
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        let e = id("aaaaaaaaaaaaaaaaaaaaaaaa");
        let r = id("bbbbbbbbbbbbbbbbbbbbbbbb");
        let u = id("cccccccccccccccccccccccc");

        assert_eq!(
            ServiceError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Linkage {
                event_id: e,
                reward_id: r
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::not_found(EntityKind::Event, e).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::DuplicateRequest {
                user_id: u,
                event_id: e,
                reward_id: r
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Persistence("db down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = ServiceError::not_found(EntityKind::RewardRequest, id("0123456789abcdef01234567"));
        assert_eq!(
            err.to_string(),
            "reward request with id \"0123456789abcdef01234567\" not found"
        );
    }

    #[test]
    fn linkage_message_names_both_ids() {
        let err = ServiceError::Linkage {
            event_id: id("aaaaaaaaaaaaaaaaaaaaaaaa"),
            reward_id: id("bbbbbbbbbbbbbbbbbbbbbbbb"),
        };
        let msg = err.to_string();
        assert!(msg.contains("aaaaaaaaaaaaaaaaaaaaaaaa"));
        assert!(msg.contains("bbbbbbbbbbbbbbbbbbbbbbbb"));
        assert!(msg.contains("not associated"));
    }

    #[test]
    fn internal_errors_are_flagged() {
        assert!(ServiceError::Persistence("x".into()).is_internal());
        assert!(ServiceError::Internal("x".into()).is_internal());
        assert!(!ServiceError::Validation("x".into()).is_internal());
    }
}
