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

//! Extends the driver with the `calculate` method, the hot path of the
//! service.

use crate::db;
use crate::driver::{Driver, DriverError, DriverResult};
use crate::geo::{polyline, AdapterError};
use crate::logbook::project;
use crate::model::{
    AccessToken, Coordinate, CycleHours, NamedPlace, RoutePlan, RouteSegment, Trip, TripId,
};
use crate::rules::PROPERTY_CARRYING_70H_8D;
use crate::scheduler::{plan_trip, TripPlan};
use serde::Deserialize;
use time::OffsetDateTime;

/// A trip calculation request, as accepted by the API.
#[derive(Clone, Debug, Deserialize)]
pub struct CalculateRequest {
    /// The driver's current address.
    pub current_location: String,

    /// The pickup address.
    pub pickup_location: String,

    /// The dropoff address.
    pub dropoff_location: String,

    /// Cycle hours already accrued, validated into 0 to 70.
    pub current_cycle_hours: CycleHours,

    /// When the trip starts; the current time when absent.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
}

/// Resolves an adapter failure while geocoding `field`.
fn geocode_error(field: &'static str, e: AdapterError) -> DriverError {
    match e {
        AdapterError::Invalid(msg) => DriverError::UpstreamInvalid {
            message: format!("Could not geocode {}: {}", field, msg),
            field: Some(field),
        },
        AdapterError::Unavailable(msg) => {
            DriverError::BackendError(format!("Geocoder unavailable: {}", msg))
        }
    }
}

/// Resolves an adapter failure while routing.
fn route_error(e: AdapterError) -> DriverError {
    match e {
        AdapterError::Invalid(msg) => DriverError::UpstreamInvalid {
            message: format!("Could not calculate route: {}", msg),
            field: None,
        },
        AdapterError::Unavailable(msg) => {
            DriverError::BackendError(format!("Router unavailable: {}", msg))
        }
    }
}

/// Stitches the encoded path of the whole trip from its two legs, falling
/// back to the straight line when a leg carries no geometry.
fn full_polyline(seg1: &RouteSegment, seg2: &RouteSegment) -> String {
    let mut points: Vec<Coordinate> = vec![];
    for segment in [seg1, seg2] {
        let decoded = segment.polyline.as_deref().and_then(polyline::decode).unwrap_or_else(|| {
            vec![segment.origin.coordinates, segment.destination.coordinates]
        });
        let skip = usize::from(points.last() == decoded.first() && !points.is_empty());
        points.extend(decoded.into_iter().skip(skip));
    }
    polyline::encode(&points)
}

impl Driver {
    /// Geocodes one request field, failing with an attribution to it.
    async fn geocode_field(
        &self,
        field: &'static str,
        address: &str,
    ) -> DriverResult<NamedPlace> {
        match self.geocoder.geocode(address).await {
            Ok(Some(place)) => Ok(place),
            Ok(None) => Err(DriverError::UpstreamInvalid {
                message: format!("Could not geocode {}: no match for '{}'", field, address),
                field: Some(field),
            }),
            Err(e) => Err(geocode_error(field, e)),
        }
    }

    /// Resolves the addresses and routes the two legs of the trip.
    async fn resolve_route(
        &self,
        request: &CalculateRequest,
    ) -> DriverResult<(NamedPlace, NamedPlace, NamedPlace, RouteSegment, RouteSegment)> {
        // The three geocodes are independent and may overlap; the two
        // routing calls depend on their output.
        let (current, pickup, dropoff) = futures::try_join!(
            self.geocode_field("current_location", &request.current_location),
            self.geocode_field("pickup_location", &request.pickup_location),
            self.geocode_field("dropoff_location", &request.dropoff_location),
        )?;

        let seg_to_pickup = self.router.route(&current, &pickup).await.map_err(route_error)?;
        let seg_to_dropoff = self.router.route(&pickup, &dropoff).await.map_err(route_error)?;

        Ok((current, pickup, dropoff, seg_to_pickup, seg_to_dropoff))
    }

    /// Computes a compliant schedule for the requested trip and persists it
    /// for the caller.
    pub async fn calculate(self, token: AccessToken, request: CalculateRequest) -> DriverResult<Trip> {
        for (field, value) in [
            ("current_location", &request.current_location),
            ("pickup_location", &request.pickup_location),
            ("dropoff_location", &request.dropoff_location),
        ] {
            if value.trim().is_empty() {
                return Err(DriverError::InvalidInput(format!("{} cannot be empty", field)));
            }
        }

        let user = {
            let mut ex = self.db.ex().await?;
            self.get_session(&mut ex, &token).await?
        };

        let (current, pickup, dropoff, seg_to_pickup, seg_to_dropoff) =
            match tokio::time::timeout(self.opts.request_deadline, self.resolve_route(&request))
                .await
            {
                Ok(resolved) => resolved?,
                Err(_elapsed) => {
                    return Err(DriverError::DeadlineExceeded(
                        "Deadline exceeded while waiting on upstream services".to_owned(),
                    ));
                }
            };

        let start_time = request.start_time.unwrap_or_else(|| self.clock.now_utc());
        let plan = TripPlan {
            start_time,
            start_place: current.clone(),
            pickup_place: pickup.clone(),
            dropoff_place: dropoff.clone(),
            seg_to_pickup: seg_to_pickup.clone(),
            seg_to_dropoff: seg_to_dropoff.clone(),
            opening_cycle_hours: request.current_cycle_hours,
        };

        let schedule = plan_trip(&PROPERTY_CARRYING_70H_8D, self.locator.as_ref(), &plan);
        let daily_logs = project(&schedule.activities, start_time.offset());

        let trip = Trip {
            id: TripId::generate(),
            current_location: request.current_location,
            pickup_location: request.pickup_location,
            dropoff_location: request.dropoff_location,
            current_place: current,
            pickup_place: pickup,
            dropoff_place: dropoff,
            current_cycle_hours: request.current_cycle_hours,
            route: RoutePlan {
                polyline: full_polyline(&seg_to_pickup, &seg_to_dropoff),
                segments: vec![seg_to_pickup, seg_to_dropoff],
            },
            stops: schedule.stops,
            daily_logs,
            summary: schedule.summary,
            created_at: self.clock.now_utc(),
        };

        let mut tx = self.db.begin().await?;
        db::put_trip(tx.ex(), *user.id(), &trip).await?;
        tx.commit().await?;

        Ok(trip)
    }
}
