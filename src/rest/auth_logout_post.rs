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

//! API to log out: the refresh token is revoked and the access session is
//! deleted.

use crate::driver::Driver;
use crate::model::RefreshToken;
use crate::rest::httputils::get_bearer_auth;
use crate::rest::RestError;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use http::HeaderMap;
use serde::Deserialize;

/// Wire shape of the request body.
#[derive(Deserialize)]
pub(crate) struct Request {
    /// The refresh token to revoke.
    refresh: String,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> Result<impl IntoResponse, RestError> {
    let access = get_bearer_auth(&headers)?;
    let refresh = RefreshToken::new(request.refresh)
        .map_err(|e| RestError::InvalidRequest(e.to_string()))?;

    driver.logout(access, refresh).await?;
    Ok(http::StatusCode::NO_CONTENT)
}
