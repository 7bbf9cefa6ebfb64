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

//! API to exchange a refresh token for a fresh token pair.

use crate::driver::Driver;
use crate::model::RefreshToken;
use crate::rest::RestError;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

/// Wire shape of the request body.
#[derive(Deserialize)]
pub(crate) struct Request {
    /// The refresh token to rotate.
    refresh: String,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Json(request): Json<Request>,
) -> Result<impl IntoResponse, RestError> {
    let token = RefreshToken::new(request.refresh)
        .map_err(|_e| RestError::Unauthorized("Invalid refresh token".to_owned()))?;

    let tokens = driver.refresh(token).await?;
    Ok(Json(tokens))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutils::*;
    use crate::rest::ErrorCode;
    use http::Method;
    use serde_json::json;

    fn route() -> (Method, &'static str) {
        (Method::POST, "/api/auth/refresh")
    }

    #[tokio::test]
    async fn test_ok_and_rotation() {
        let context = TestContext::setup().await;
        let tokens = context.register("driver@example.com").await;

        let rotated = OneShotBuilder::new(context.app(), route())
            .send_json(json!({"refresh": tokens.refresh.as_str()}))
            .await
            .expect_json::<serde_json::Value>()
            .await;
        assert!(rotated["access"].is_string());
        assert_ne!(tokens.refresh.as_str(), rotated["refresh"].as_str().unwrap());

        // The rotated-out token no longer works.
        OneShotBuilder::new(context.app(), route())
            .send_json(json!({"refresh": tokens.refresh.as_str()}))
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error(ErrorCode::Unauthenticated, "revoked")
            .await;
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({"refresh": "garbage"}))
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error(ErrorCode::Unauthenticated, "Invalid refresh token")
            .await;
    }
}
