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

//! Business logic for the service.
//!
//! The public operations exposed by the driver are all "one shot": they
//! consume the driver so that callers cannot easily chain two operations
//! where one transaction was intended.

use crate::clocks::Clock;
use crate::db::{self, Db, DbError, Executor};
use crate::env::get_optional_var;
use crate::geo::{Geocoder, RestStopLocator, Router};
use crate::model::{AccessToken, ModelError, User};
use std::sync::Arc;
use std::time::Duration;

mod auth;
pub use auth::TokenPair;
mod calculate;
pub use calculate::CalculateRequest;
mod geocode;
#[cfg(test)]
pub(crate) mod testutils;
mod trips;

/// Default lifetime of an access token.
const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default lifetime of a refresh token.
const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Default deadline for a single request, upstream calls included.
const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// Business logic errors.  These errors encompass backend and logical
/// errors.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// Indicates that a request to create an entry failed because it
    /// already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// Catch-all error type for unexpected internal errors.
    #[error("{0}")]
    BackendError(String),

    /// Indicates that the request deadline expired while waiting on an
    /// upstream service.
    #[error("{0}")]
    DeadlineExceeded(String),

    /// Indicates an attempt to access an entity owned by someone else.
    #[error("{0}")]
    Forbidden(String),

    /// Indicates an error in the input data.
    #[error("{0}")]
    InvalidInput(String),

    /// Indicates that a requested entry does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that an adapter or caller quota was exceeded.
    #[error("{0}")]
    RateLimited(String),

    /// Indicates an authentication problem.
    #[error("{0}")]
    Unauthorized(String),

    /// Indicates that an upstream collaborator could not fulfill the
    /// request; `field` names the offending input when there is one.
    #[error("{message}")]
    UpstreamInvalid {
        /// Human-readable description of the failure.
        message: String,

        /// The request field that caused the failure, when attributable.
        field: Option<&'static str>,
    },
}

impl From<DbError> for DriverError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::AlreadyExists => DriverError::AlreadyExists(e.to_string()),
            DbError::BackendError(_) => DriverError::BackendError(e.to_string()),
            DbError::DataIntegrityError(_) => DriverError::BackendError(e.to_string()),
            DbError::NotFound => DriverError::NotFound(e.to_string()),
            DbError::Unavailable => DriverError::BackendError(e.to_string()),
        }
    }
}

impl From<ModelError> for DriverError {
    fn from(e: ModelError) -> Self {
        DriverError::InvalidInput(e.to_string())
    }
}

/// Result type for this module.
pub type DriverResult<T> = Result<T, DriverError>;

/// Configuration options for the driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct DriverOptions {
    /// Lifetime of newly issued access tokens.
    pub access_token_ttl: Duration,

    /// Lifetime of newly issued refresh tokens.
    pub refresh_token_ttl: Duration,

    /// Deadline for a single request, upstream calls included.
    pub request_deadline: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            request_deadline: DEFAULT_REQUEST_DEADLINE,
        }
    }
}

impl DriverOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            access_token_ttl: get_optional_var::<Duration>("ACCESS_TOKEN_TTL_SECONDS")?
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL),
            refresh_token_ttl: get_optional_var::<Duration>("REFRESH_TOKEN_TTL_SECONDS")?
                .unwrap_or(DEFAULT_REFRESH_TOKEN_TTL),
            request_deadline: get_optional_var::<Duration>("REQUEST_DEADLINE_SECONDS")?
                .unwrap_or(DEFAULT_REQUEST_DEADLINE),
        })
    }
}

/// Business logic.
#[derive(Clone)]
pub struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Address resolution collaborator.
    geocoder: Arc<dyn Geocoder + Send + Sync>,

    /// Leg routing collaborator.
    router: Arc<dyn Router + Send + Sync>,

    /// Rest-stop naming collaborator.
    locator: Arc<dyn RestStopLocator + Send + Sync>,

    /// Options for the driver.
    opts: DriverOptions,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        geocoder: Arc<dyn Geocoder + Send + Sync>,
        router: Arc<dyn Router + Send + Sync>,
        locator: Arc<dyn RestStopLocator + Send + Sync>,
        opts: DriverOptions,
    ) -> Self {
        Self { db, clock, geocoder, router, locator, opts }
    }

    /// Validates the session behind `token` and returns the user that owns
    /// it.
    pub(crate) async fn get_session(
        &self,
        ex: &mut Executor,
        token: &AccessToken,
    ) -> DriverResult<User> {
        let (user_id, expires_at) = match db::get_session(ex, token).await {
            Ok(session) => session,
            Err(DbError::NotFound) => {
                return Err(DriverError::Unauthorized("Invalid access token".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        if self.clock.now_utc() > expires_at {
            return Err(DriverError::Unauthorized(
                "Session expired; please log in again".to_owned(),
            ));
        }

        Ok(db::get_user_by_id(ex, user_id).await?)
    }
}
