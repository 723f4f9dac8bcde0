//! Request/response values passed between hyper and the handlers

use crate::error::ApiError;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// A decoded API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub bearer: Option<String>,
    pub body: Bytes,
}

impl ApiRequest {
    /// Build from a method and a request target such as `/api/pro/agenda?date=2024-06-01`
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            bearer: None,
            body: Bytes::new(),
        }
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Self {
        self.body = serde_json::to_vec(value).map(Bytes::from).unwrap_or_default();
        self
    }

    /// Read a hyper request, buffering at most [`MAX_BODY_BYTES`]
    pub async fn from_hyper(req: Request<Incoming>) -> Result<Self, ApiError> {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut request = ApiRequest::new(parts.method.clone(), target);
        request.bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let collected = Limited::new(body, MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;
        request.body = collected.to_bytes();
        Ok(request)
    }

    /// Decode the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.body.is_empty() {
            return Err(ApiError::BadRequest("a JSON body is required".to_string()));
        }
        serde_json::from_slice(&self.body).map_err(|e| ApiError::BadRequest(e.to_string()))
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Decode `a=1&b=x%20y`; `+` is a space, later keys win
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// A JSON response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn ok<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        Ok(Self::new(StatusCode::OK, serde_json::to_value(value)?))
    }

    pub fn created<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        Ok(Self::new(StatusCode::CREATED, serde_json::to_value(value)?))
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, Value::Null)
    }

    pub fn into_hyper(self) -> Response<Full<Bytes>> {
        let body = if self.status == StatusCode::NO_CONTENT {
            Bytes::new()
        } else {
            Bytes::from(self.body.to_string())
        };

        let mut builder = Response::builder().status(self.status);
        if !body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        for (name, value) in &self.headers {
            builder = builder.header(*name, value.as_str());
        }
        builder.body(Full::new(body)).unwrap_or_else(|_| {
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}
