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

//! API to fetch one of the caller's trips in full.

use crate::driver::Driver;
use crate::model::TripId;
use crate::rest::httputils::get_bearer_auth;
use crate::rest::RestError;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use http::HeaderMap;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, RestError> {
    let token = get_bearer_auth(&headers)?;

    // A malformed id cannot name any trip, so it reads as absent rather
    // than invalid.
    let id = id
        .parse::<TripId>()
        .map_err(|_e| RestError::NotFound(format!("Trip {} not found", id)))?;

    let trip = driver.get_trip(token, id).await?;
    Ok(Json(trip))
}

#[cfg(test)]
mod tests {
    use crate::geo::MockRouter;
    use crate::model::{Trip, TripId};
    use crate::rest::testutils::*;
    use crate::rest::ErrorCode;
    use http::Method;
    use serde_json::json;

    fn route(id: &str) -> (Method, String) {
        (Method::GET, format!("/api/trips/{}", id))
    }

    async fn calculate(context: &TestContext, access: &str) -> Trip {
        let body = json!({
            "current_location": "Chicago, IL",
            "pickup_location": "Milwaukee, WI",
            "dropoff_location": "Madison, WI",
            "current_cycle_hours": 0.0,
            "start_time": "2026-01-17T06:30:00-06:00",
        });
        OneShotBuilder::new(context.app(), (Method::POST, "/api/trips/calculate"))
            .with_bearer_auth(access)
            .send_json(body)
            .await
            .expect_json::<Trip>()
            .await
    }

    fn router() -> MockRouter {
        MockRouter::new()
            .with_leg("Chicago", "Milwaukee", 93.0, 1.75)
            .with_leg("Milwaukee", "Madison", 80.0, 1.5)
    }

    #[tokio::test]
    async fn test_ok_includes_ledgers() {
        let context = TestContext::setup_with_router(router()).await;
        let tokens = context.register("driver@example.com").await;

        let stored = calculate(&context, tokens.access.as_str()).await;

        let fetched = OneShotBuilder::new(context.app(), route(&stored.id.to_string()))
            .with_bearer_auth(tokens.access.as_str())
            .send_empty()
            .await
            .expect_json::<Trip>()
            .await;
        assert_eq!(stored, fetched);
        assert!(!fetched.daily_logs.is_empty());
    }

    #[tokio::test]
    async fn test_missing() {
        let context = TestContext::setup().await;
        let tokens = context.register("driver@example.com").await;

        OneShotBuilder::new(context.app(), route(&TripId::generate().to_string()))
            .with_bearer_auth(tokens.access.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error(ErrorCode::NotFound, "not found")
            .await;
    }

    #[tokio::test]
    async fn test_malformed_id_reads_as_missing() {
        let context = TestContext::setup().await;
        let tokens = context.register("driver@example.com").await;

        OneShotBuilder::new(context.app(), route("not-a-uuid"))
            .with_bearer_auth(tokens.access.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error(ErrorCode::NotFound, "not found")
            .await;
    }

    #[tokio::test]
    async fn test_not_owned_reads_as_missing() {
        let context = TestContext::setup_with_router(router()).await;
        let owner = context.register("owner@example.com").await;
        let other = context.register("other@example.com").await;

        let stored = calculate(&context, owner.access.as_str()).await;

        OneShotBuilder::new(context.app(), route(&stored.id.to_string()))
            .with_bearer_auth(other.access.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error(ErrorCode::NotFound, "not found")
            .await;
    }
}
