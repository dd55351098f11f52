use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::order::OrderStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("rider {0} not found")]
    RiderNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("order {order_id} is already {status}")]
    AlreadyAccepted {
        order_id: String,
        status: OrderStatus,
    },

    #[error("order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::OrderNotFound(_) | AppError::RiderNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_)
            | AppError::AlreadyAccepted { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::WriteFailed(_) | AppError::QueryFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

/// Failures reported by a store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(String),

    #[error("document {} changed concurrently", current.id)]
    PreconditionFailed {
        current: Box<crate::models::order::Order>,
    },

    #[error("document {0} already exists")]
    AlreadyExists(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Push dispatch failures. Logged by the dispatcher, never surfaced to riders.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("push token lookup failed: {0}")]
    Lookup(String),

    #[error("push transport failed: {0}")]
    Transport(String),

    #[error("push endpoint rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotificationError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::AppError;
    use crate::models::order::OrderStatus;

    #[test]
    fn errors_map_to_http_statuses() {
        let cases = [
            (AppError::OrderNotFound("o-1".to_string()), StatusCode::NOT_FOUND),
            (AppError::RiderNotFound("r-1".to_string()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("bad".to_string()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("taken".to_string()), StatusCode::CONFLICT),
            (
                AppError::AlreadyAccepted {
                    order_id: "o-1".to_string(),
                    status: OrderStatus::Accepted,
                },
                StatusCode::CONFLICT,
            ),
            (
                AppError::InvalidTransition {
                    order_id: "o-1".to_string(),
                    from: OrderStatus::Pending,
                    to: OrderStatus::Delivered,
                },
                StatusCode::CONFLICT,
            ),
            (AppError::WriteFailed("down".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::QueryFailed("down".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let message = err.to_string();
            assert_eq!(err.into_response().status(), expected, "{message}");
        }
    }
}
