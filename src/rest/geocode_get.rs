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

//! API to suggest addresses for a partial query.  Unauthenticated so the
//! client can offer suggestions on the login-free landing form.

use crate::driver::Driver;
use crate::model::NamedPlace;
use crate::rest::RestError;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Query parameters accepted by the API.
#[derive(Deserialize)]
pub(crate) struct Params {
    /// The partial address to complete.
    #[serde(default)]
    address: String,
}

/// Wire shape of the response.
#[derive(Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct Response {
    /// Candidate places, best match first.
    results: Vec<NamedPlace>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Query(params): Query<Params>,
) -> Result<impl IntoResponse, RestError> {
    let results = driver.suggest_addresses(params.address).await?;
    Ok(Json(Response { results }))
}
