use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::errors::AstraError;

impl IntoResponse for AstraError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AstraError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AstraError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AstraError::InvalidState(_) => (StatusCode::CONFLICT, self.to_string()),
            AstraError::Config(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        (status, Json(json!({"error": message}))).into_response()
    }
}
