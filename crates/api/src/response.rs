use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Envelope wrapped around every API payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
    pub error: Option<String>,
    pub ts: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data,
            error: None,
            ts: Utc::now(),
        }
    }
}

impl ApiResponse<Value> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: json!({}),
            error: Some(message.into()),
            ts: Utc::now(),
        }
    }
}

/// Failure envelope with a non-200 status code.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, ApiResponse::<Value>::failure(message)).into_response()
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
