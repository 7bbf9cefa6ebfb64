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

//! API to authenticate an existing account.

use crate::driver::{Driver, TokenPair};
use crate::model::{EmailAddress, Password, User};
use crate::rest::RestError;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Wire shape of the request body.
#[derive(Deserialize)]
pub(crate) struct Request {
    /// Email address of the account.
    email: String,

    /// Password of the account.
    password: String,
}

/// Wire shape of the response.
#[derive(Serialize)]
pub(crate) struct Response {
    /// The authenticated account.
    user: User,

    /// Tokens for the new session.
    tokens: TokenPair,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Json(request): Json<Request>,
) -> Result<impl IntoResponse, RestError> {
    // Credential shape problems read as bad credentials, not as validation
    // errors, so the endpoint does not leak which accounts exist.
    let email = EmailAddress::new(request.email)
        .map_err(|_e| RestError::Unauthorized("Invalid credentials".to_owned()))?;
    let password = Password::new(request.password)
        .map_err(|_e| RestError::Unauthorized("Invalid credentials".to_owned()))?;

    let (user, tokens) = driver.login(email, password).await?;
    Ok(Json(Response { user, tokens }))
}
