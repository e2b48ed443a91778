use actix_web::http::StatusCode;
use serde::Serialize;

/// Response body shared by every endpoint, success or failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub message: String,
    pub code: u16,
    pub error_code: u32,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            message: "ok".to_string(),
            code: StatusCode::OK.as_u16(),
            error_code: 0,
            data,
        }
    }
}

impl Envelope<serde_json::Value> {
    pub fn error(message: String, status: StatusCode, error_code: u32) -> Self {
        Self {
            message,
            code: status.as_u16(),
            error_code,
            data: serde_json::json!({}),
        }
    }
}
