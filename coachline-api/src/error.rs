use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coachline_core::CoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(err) => match err {
                CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::SeatConflict(_) | CoreError::AlreadyCancelled(_) | CoreError::JobInProgress(_) => {
                    StatusCode::CONFLICT
                }
                CoreError::PriceUnavailable { .. }
                | CoreError::MissingSegment { .. }
                | CoreError::StopNotOnRoute { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::ConfigMissing(_) | CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Core(CoreError::Storage(msg)) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::InvalidInput("seats".into()), StatusCode::BAD_REQUEST),
            (CoreError::NotFound("ticket".into()), StatusCode::NOT_FOUND),
            (CoreError::SeatConflict("A1".into()), StatusCode::CONFLICT),
            (CoreError::AlreadyCancelled(Uuid::nil()), StatusCode::CONFLICT),
            (CoreError::JobInProgress("rebalance".into()), StatusCode::CONFLICT),
            (
                CoreError::MissingSegment { from: "Dhaka".into(), to: "Comilla".into() },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CoreError::ConfigMissing("pricing".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let response = AppError::from(CoreError::Storage("connection refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
