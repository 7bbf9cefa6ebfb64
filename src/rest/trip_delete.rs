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

//! API to delete one of the caller's trips.

use crate::driver::Driver;
use crate::model::TripId;
use crate::rest::httputils::get_bearer_auth;
use crate::rest::RestError;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use http::HeaderMap;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, RestError> {
    let token = get_bearer_auth(&headers)?;

    let id = id
        .parse::<TripId>()
        .map_err(|_e| RestError::NotFound(format!("Trip {} not found", id)))?;

    driver.delete_trip(token, id).await?;
    Ok(http::StatusCode::NO_CONTENT)
}
