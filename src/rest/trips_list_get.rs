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

//! API to list the caller's trips.

use crate::driver::Driver;
use crate::rest::httputils::get_bearer_auth;
use crate::rest::RestError;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use http::HeaderMap;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, RestError> {
    let token = get_bearer_auth(&headers)?;
    let trips = driver.list_trips(token).await?;
    Ok(Json(trips))
}
