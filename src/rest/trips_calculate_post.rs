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

//! API to calculate and persist a compliant trip schedule.

use crate::driver::{CalculateRequest, Driver};
use crate::model::CycleHours;
use crate::rest::httputils::get_bearer_auth;
use crate::rest::RestError;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use http::HeaderMap;
use serde::Deserialize;
use time::OffsetDateTime;

/// Wire shape of the request body.  Range validation happens here so the
/// caller gets the uniform error shape instead of an extractor rejection.
#[derive(Deserialize)]
pub(crate) struct Request {
    /// The driver's current address.
    current_location: String,

    /// The pickup address.
    pickup_location: String,

    /// The dropoff address.
    dropoff_location: String,

    /// Cycle hours already accrued, 0 to 70.
    current_cycle_hours: f64,

    /// When the trip starts; the current time when absent.
    #[serde(default, with = "time::serde::rfc3339::option")]
    start_time: Option<OffsetDateTime>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> Result<impl IntoResponse, RestError> {
    let token = get_bearer_auth(&headers)?;

    let request = CalculateRequest {
        current_location: request.current_location,
        pickup_location: request.pickup_location,
        dropoff_location: request.dropoff_location,
        current_cycle_hours: CycleHours::new(request.current_cycle_hours)?,
        start_time: request.start_time,
    };

    let trip = driver.calculate(token, request).await?;
    Ok(Json(trip))
}

#[cfg(test)]
mod tests {
    use crate::geo::MockRouter;
    use crate::model::{AccessToken, Trip};
    use crate::rest::testutils::*;
    use crate::rest::ErrorCode;
    use http::Method;
    use serde_json::json;

    fn route() -> (Method, &'static str) {
        (Method::POST, "/api/trips/calculate")
    }

    fn body() -> serde_json::Value {
        json!({
            "current_location": "Chicago, IL",
            "pickup_location": "Milwaukee, WI",
            "dropoff_location": "Madison, WI",
            "current_cycle_hours": 10.0,
            "start_time": "2026-01-17T06:30:00-06:00",
        })
    }

    fn short_haul_router() -> MockRouter {
        MockRouter::new()
            .with_leg("Chicago", "Milwaukee", 93.0, 1.75)
            .with_leg("Milwaukee", "Madison", 80.0, 1.5)
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup_with_router(short_haul_router()).await;
        let tokens = context.register("driver@example.com").await;

        let trip = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(tokens.access.as_str())
            .send_json(body())
            .await
            .expect_json::<Trip>()
            .await;

        assert_eq!(173.0, trip.summary.total_distance_miles);
        assert_eq!(4, trip.stops.len());
        assert_eq!(1, trip.daily_logs.len());
        assert!((trip.daily_logs[0].hours.total() - 24.0).abs() < 1.0 / 60.0);
    }

    #[tokio::test]
    async fn test_response_shape() {
        let context = TestContext::setup_with_router(short_haul_router()).await;
        let tokens = context.register("driver@example.com").await;

        let raw = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(tokens.access.as_str())
            .send_json(body())
            .await
            .expect_json::<serde_json::Value>()
            .await;

        assert!(raw["trip_id"].is_string());
        assert!(raw["route"]["polyline"].is_string());
        assert_eq!(2, raw["route"]["segments"].as_array().unwrap().len());
        assert_eq!("start", raw["stops"][0]["kind"]);
        assert_eq!(1, raw["stops"][0]["order"]);
        assert!(raw["stops"][0]["coordinates"]["lat"].is_number());
        let day = &raw["daily_logs"][0];
        assert_eq!(1, day["day"]);
        assert_eq!("2026-01-17", day["date"]);
        assert_eq!("-06:00", day["timezone"]);
        assert!(day["hours"]["off_duty"].is_number());
        assert_eq!("00:00", day["entries"][0]["start"]);
        assert_eq!("24:00", day["entries"].as_array().unwrap().last().unwrap()["end"]);
    }

    #[tokio::test]
    async fn test_cycle_hours_out_of_range() {
        let context = TestContext::setup().await;
        let tokens = context.register("driver@example.com").await;

        let mut bad = body();
        bad["current_cycle_hours"] = serde_json::json!(100.0);
        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(tokens.access.as_str())
            .send_json(bad)
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error(ErrorCode::Validation, "between 0 and 70")
            .await;
    }

    #[tokio::test]
    async fn test_geocode_miss_is_unprocessable_and_names_the_field() {
        let context = TestContext::setup().await;
        let tokens = context.register("driver@example.com").await;

        let mut bad = body();
        bad["dropoff_location"] = serde_json::json!("Not A Real Town, ZZ");
        let details = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(tokens.access.as_str())
            .send_json(bad)
            .await
            .expect_status(http::StatusCode::UNPROCESSABLE_ENTITY)
            .expect_error(ErrorCode::UpstreamInvalid, "dropoff_location")
            .await;
        assert_eq!("dropoff_location", details["field"]);
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(body())
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error(ErrorCode::Unauthenticated, "Missing Authorization")
            .await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(AccessToken::generate().as_str())
            .send_json(body())
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error(ErrorCode::Unauthenticated, "Invalid access token")
            .await;
    }
}
