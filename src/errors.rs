use crate::models::envelope::Envelope;
use crate::storage::convert::ConvertError;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No `file` part in the request
    #[error("file is required")]
    MissingFile,

    /// MIME type outside the allow-list, no admin credential
    #[error("unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("file too large (max: {max_size} bytes)")]
    TooLarge { max_size: usize },

    /// The multipart body itself could not be read
    #[error("malformed upload: {message}")]
    Malformed { message: String },

    #[error("image conversion failed")]
    Conversion(#[source] ConvertError),

    #[error("storage error")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Application-level code carried in the envelope's `errorCode`.
    pub fn error_code(&self) -> u32 {
        match self {
            ApiError::MissingFile => 10001,
            ApiError::UnsupportedType { .. } => 10002,
            ApiError::TooLarge { .. } => 10003,
            ApiError::Malformed { .. } => 10004,
            ApiError::Conversion(_) => 20001,
            ApiError::Io(_) => 20002,
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::Conversion(_) | ApiError::Io(_))
    }
}

impl From<actix_multipart::MultipartError> for ApiError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        ApiError::Malformed {
            message: err.to_string(),
        }
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(_: actix_web::error::BlockingError) -> Self {
        ApiError::Conversion(ConvertError::Cancelled)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        if self.is_server_error() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            ApiError::Conversion(source) => log::error!("{}: {}", self, source),
            ApiError::Io(source) => log::error!("{}: {}", self, source),
            _ => log::debug!("rejected upload: {}", self),
        }
        HttpResponse::build(status).json(Envelope::error(self.to_string(), status, self.error_code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn parameter_errors_are_422() {
        for err in [
            ApiError::MissingFile,
            ApiError::UnsupportedType {
                mime_type: "text/plain".into(),
            },
            ApiError::TooLarge { max_size: 10 },
            ApiError::Malformed {
                message: "boundary".into(),
            },
        ] {
            assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
            assert!(err.error_code() / 10000 == 1);
        }
    }

    #[test]
    fn server_errors_are_500() {
        let err = ApiError::Io(std::io::Error::other("disk full"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), 20002);

        let err = ApiError::Conversion(ConvertError::Cancelled);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), 20001);
    }

    #[actix_web::test]
    async fn renders_error_envelope() {
        let resp = ApiError::TooLarge { max_size: 1024 }.error_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 422);
        assert_eq!(json["errorCode"], 10003);
        assert_eq!(json["message"], "file too large (max: 1024 bytes)");
        assert_eq!(json["data"], serde_json::json!({}));
    }
}
