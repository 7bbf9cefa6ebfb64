// ELD Trip Planner
// Copyright 2025 The eldplan Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Entry point to the REST server.
//!
//! Every API lives in its own `.rs` file, using a name like
//! `<entity>_<method>.rs`.  This may seem overkill, but putting every API in
//! its own file makes it easy to ensure all the integration tests for the
//! given API truly belong to that API.
//!
//! This is the only layer that converts typed errors into HTTP statuses.
//! Every failed request carries the uniform body
//! `{"error": <human>, "code": <ENUM>, "details": {...}}`.

use crate::driver::{Driver, DriverError};
use crate::model::ModelError;
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use http::header::HeaderValue;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

mod auth_login_post;
mod auth_logout_post;
mod auth_refresh_post;
mod auth_register_post;
mod geocode_get;
pub(crate) mod httputils;
#[cfg(test)]
pub(crate) mod testutils;
mod trip_delete;
mod trip_get;
mod trips_calculate_post;
mod trips_list_get;

/// Machine-readable error classes, mapped one-to-one to HTTP statuses.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorCode {
    /// Input schema or range failure.
    #[serde(rename = "VALIDATION")]
    Validation,

    /// Missing or invalid access token.
    #[serde(rename = "UNAUTHENTICATED")]
    Unauthenticated,

    /// Accessing an entity not owned by the caller.
    #[serde(rename = "FORBIDDEN")]
    Forbidden,

    /// The requested entity does not exist for this caller.
    #[serde(rename = "NOT_FOUND")]
    NotFound,

    /// A uniqueness constraint failed, e.g. a duplicate email.
    #[serde(rename = "CONFLICT")]
    Conflict,

    /// An adapter or caller quota was exceeded.
    #[serde(rename = "RATE_LIMITED")]
    RateLimited,

    /// An upstream collaborator returned a non-retryable failure.
    #[serde(rename = "UPSTREAM_INVALID")]
    UpstreamInvalid,

    /// The deadline expired while waiting on an upstream collaborator.
    #[serde(rename = "UPSTREAM_TIMEOUT")]
    UpstreamTimeout,

    /// Unexpected invariant violation.
    #[serde(rename = "INTERNAL")]
    Internal,
}

/// Frontend errors.  These are the errors that are visible to the user on
/// failed requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Indicates a uniqueness conflict in the request.
    #[error("{0}")]
    Conflict(String),

    /// Indicates an authorization problem.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a quota was exceeded.
    #[error("{0}")]
    RateLimited(String),

    /// Indicates an authentication problem.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Indicates a non-retryable upstream failure; `field` names the
    /// offending request field when there is one.
    #[error("{message}")]
    UpstreamInvalid {
        /// Human-readable description of the failure.
        message: String,

        /// The request field that caused the failure, when attributable.
        field: Option<&'static str>,
    },

    /// Indicates that the deadline expired waiting on an upstream service.
    #[error("{0}")]
    UpstreamTimeout(String),
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(_) => RestError::Conflict(e.to_string()),
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::DeadlineExceeded(_) => RestError::UpstreamTimeout(e.to_string()),
            DriverError::Forbidden(_) => RestError::Forbidden(e.to_string()),
            DriverError::InvalidInput(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
            DriverError::RateLimited(_) => RestError::RateLimited(e.to_string()),
            DriverError::Unauthorized(_) => RestError::Unauthorized(e.to_string()),
            DriverError::UpstreamInvalid { message, field } => {
                RestError::UpstreamInvalid { message, field }
            }
        }
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl RestError {
    /// Returns the machine-readable class of the error.
    fn code(&self) -> ErrorCode {
        match self {
            RestError::Conflict(_) => ErrorCode::Conflict,
            RestError::Forbidden(_) => ErrorCode::Forbidden,
            RestError::InternalError(_) => ErrorCode::Internal,
            RestError::InvalidRequest(_) => ErrorCode::Validation,
            RestError::NotFound(_) => ErrorCode::NotFound,
            RestError::RateLimited(_) => ErrorCode::RateLimited,
            RestError::Unauthorized(_) => ErrorCode::Unauthenticated,
            RestError::UpstreamInvalid { .. } => ErrorCode::UpstreamInvalid,
            RestError::UpstreamTimeout(_) => ErrorCode::UpstreamTimeout,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            RestError::Conflict(_) => http::StatusCode::CONFLICT,
            RestError::Forbidden(_) => http::StatusCode::FORBIDDEN,
            RestError::InternalError(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => http::StatusCode::NOT_FOUND,
            RestError::RateLimited(_) => http::StatusCode::TOO_MANY_REQUESTS,
            RestError::Unauthorized(_) => http::StatusCode::UNAUTHORIZED,
            RestError::UpstreamInvalid { .. } => http::StatusCode::UNPROCESSABLE_ENTITY,
            RestError::UpstreamTimeout(_) => http::StatusCode::GATEWAY_TIMEOUT,
        };

        let mut headers = HeaderMap::new();
        if status == http::StatusCode::UNAUTHORIZED {
            headers.insert(
                "WWW-Authenticate",
                "Bearer realm=\"eldplan\"".parse().expect("Hardcoded header must be valid"),
            );
        }

        let mut details = serde_json::Map::new();
        if let RestError::UpstreamInvalid { field: Some(field), .. } = &self {
            details.insert("field".to_owned(), serde_json::Value::String((*field).to_owned()));
        }

        let response = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
            details: serde_json::Value::Object(details),
        };

        (status, headers, Json(response)).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Human-readable representation of the error.
    pub(crate) error: String,

    /// Machine-readable error class.
    pub(crate) code: ErrorCode,

    /// Structured detail, e.g. the offending request field.
    pub(crate) details: serde_json::Value,
}

/// Creates the router for the application.
///
/// When `allowed_origins` is given, cross-origin requests are allowed from
/// exactly those origins; the single entry `*` allows any.
pub(crate) fn app(driver: Driver, allowed_origins: Option<Vec<String>>) -> Result<Router, String> {
    let router = Router::new()
        .route("/api/trips/calculate", post(trips_calculate_post::handler))
        .route("/api/trips", get(trips_list_get::handler))
        .route(
            "/api/trips/:id",
            get(trip_get::handler).delete(trip_delete::handler),
        )
        .route("/api/geocode", get(geocode_get::handler))
        .route("/api/auth/register", post(auth_register_post::handler))
        .route("/api/auth/login", post(auth_login_post::handler))
        .route("/api/auth/refresh", post(auth_refresh_post::handler))
        .route("/api/auth/logout", post(auth_logout_post::handler))
        .with_state(driver);

    match allowed_origins {
        None => Ok(router),
        Some(origins) => {
            let allow_origin = if origins.iter().any(|o| o == "*") {
                AllowOrigin::any()
            } else {
                let mut values = Vec::with_capacity(origins.len());
                for origin in origins {
                    values.push(
                        origin
                            .parse::<HeaderValue>()
                            .map_err(|e| format!("Invalid origin '{}': {}", origin, e))?,
                    );
                }
                AllowOrigin::list(values)
            };
            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers(Any)
                .allow_origin(allow_origin);
            Ok(router.layer(cors))
        }
    }
}
