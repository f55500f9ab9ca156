//! Mapping of engine errors onto HTTP responses.

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::core::Error;

/// Message returned for faults whose details must stay in the logs.
const INTERNAL_MESSAGE: &str = "Analysis failed due to an internal error";

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

/// An engine error on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ApiError {
    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::UnsupportedLanguage { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Error::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Io(_)
            | Error::Config(_)
            | Error::Serialization(_)
            | Error::Toml(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = if self.is_internal() {
            tracing::error!("Internal error while handling request: {}", self.0);
            ErrorBody {
                success: false,
                error: "internal_error".to_string(),
                message: INTERNAL_MESSAGE.to_string(),
            }
        } else {
            ErrorBody {
                success: false,
                error: self.0.kind().to_string(),
                message: self.0.to_string(),
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Turn JSON extractor failures into the standard error envelope.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let error = match err {
        JsonPayloadError::OverflowKnownLength { length, limit } => Error::PayloadTooLarge {
            size: length,
            max: limit,
        },
        JsonPayloadError::Overflow { limit } => Error::PayloadTooLarge {
            size: limit + 1,
            max: limit,
        },
        other => Error::InvalidArgument(other.to_string()),
    };
    ApiError(error).into()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::unsupported("a.txt"), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (
                Error::timeout("analysis", Duration::from_secs(1)),
                StatusCode::REQUEST_TIMEOUT,
            ),
            (
                Error::FileNotFound {
                    path: PathBuf::from("x.py"),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                Error::InvalidArgument("missing".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::PayloadTooLarge { size: 10, max: 5 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let resp = ApiError(Error::internal("secret path /etc/x")).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = ApiError(Error::Io(std::io::Error::other("disk")));
        assert!(err.is_internal());
    }
}
