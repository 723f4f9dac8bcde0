//! API errors and their HTTP mapping

use crate::http::ApiResponse;
use hyper::StatusCode;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use vetcare_core::FieldError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Conflict(String),

    #[error("too many requests")]
    RateLimited { retry_after: Duration },

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The model or mail provider failed
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body `{error, fields?}` plus headers
    pub fn into_response(self) -> ApiResponse {
        let status = self.status();
        let retry_after = match &self {
            ApiError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        };
        match &self {
            ApiError::Internal(detail) => error!(detail = %detail, "request failed"),
            ApiError::Upstream(detail) => warn!(detail = %detail, "upstream call failed"),
            _ => {}
        }

        let (message, fields) = match self {
            // Internal details stay in the log
            ApiError::Internal(_) => ("internal server error".to_string(), None),
            ApiError::Upstream(_) => ("upstream service unavailable".to_string(), None),
            ApiError::Validation(fields) => ("validation failed".to_string(), Some(fields)),
            other => (other.to_string(), None),
        };

        let body = match fields {
            Some(fields) => json!({ "error": message, "fields": fields }),
            None => json!({ "error": message }),
        };
        let mut response = ApiResponse::new(status, body);
        if let Some(wait) = retry_after {
            // Whole seconds, rounded up
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            response.headers.push(("retry-after", secs.max(1).to_string()));
        }
        response
    }
}

impl From<vetcare_core::Error> for ApiError {
    fn from(err: vetcare_core::Error) -> Self {
        use vetcare_core::Error;
        match err {
            Error::Validation(fields) => ApiError::Validation(fields),
            Error::NotFound { collection, id } => ApiError::NotFound(format!("{collection} {id}")),
            Error::Forbidden => ApiError::Forbidden,
            e @ (Error::Conflict(_) | Error::InsufficientStock { .. }) => {
                ApiError::Conflict(e.to_string())
            }
        }
    }
}

impl From<vetcare_db::Error> for ApiError {
    fn from(err: vetcare_db::Error) -> Self {
        match err {
            vetcare_db::Error::Core(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<vetcare_ai::Error> for ApiError {
    fn from(err: vetcare_ai::Error) -> Self {
        use vetcare_ai::Error;
        match err {
            Error::InvalidRequest(msg) => ApiError::BadRequest(msg),
            Error::Store(e) => e.into(),
            e @ (Error::Http(_)
            | Error::Provider { .. }
            | Error::EmptyResponse
            | Error::MalformedOutput(_)) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
