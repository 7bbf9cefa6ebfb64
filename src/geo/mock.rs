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

//! Mock geocoder and router with canned, deterministic responses.

use crate::geo::{polyline, AdapterError, AdapterResult, Geocoder, Router};
use crate::model::{Coordinate, NamedPlace, RouteSegment};
use async_trait::async_trait;
use futures::lock::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Well-known US cities the mock geocoder resolves.
const CITIES: &[(&str, f64, f64, &str)] = &[
    ("green bay, wi", 44.5133, -88.0133, "Green Bay, Brown County, Wisconsin, USA"),
    ("chicago, il", 41.8781, -87.6298, "Chicago, Cook County, Illinois, USA"),
    ("milwaukee, wi", 43.0389, -87.9065, "Milwaukee, Milwaukee County, Wisconsin, USA"),
    ("madison, wi", 43.0731, -89.4012, "Madison, Dane County, Wisconsin, USA"),
    ("indianapolis, in", 39.7684, -86.1581, "Indianapolis, Marion County, Indiana, USA"),
    ("columbus, oh", 39.9612, -82.9988, "Columbus, Franklin County, Ohio, USA"),
    ("dallas, tx", 32.7767, -96.7970, "Dallas, Dallas County, Texas, USA"),
    ("denver, co", 39.7392, -104.9903, "Denver, Denver County, Colorado, USA"),
    ("los angeles, ca", 34.0522, -118.2437, "Los Angeles, Los Angeles County, California, USA"),
    ("new york, ny", 40.7128, -74.0060, "New York City, New York, USA"),
];

/// Geocoder with a canned city table.  Unknown addresses miss rather than
/// resolving randomly, to keep tests deterministic.
#[derive(Clone, Default)]
pub(crate) struct MockGeocoder {
    /// Number of queries served, per address.
    query_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockGeocoder {
    /// Addresses equal to this marker make the geocoder return an error.
    pub(crate) const RETURN_ERROR: &'static str = "return error";

    /// Creates a new mock geocoder.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times `address` has been queried.
    pub(crate) async fn query_count(&self, address: &str) -> usize {
        *self.query_counts.lock().await.get(address).unwrap_or(&0)
    }

    /// Resolves an address against the city table.
    fn lookup(address: &str) -> Option<NamedPlace> {
        let normalized = address.trim().to_lowercase();
        for (key, lat, lng, display_name) in CITIES {
            let city = key.split(',').next().unwrap();
            if *key == normalized || normalized.contains(city) {
                let name = display_name.split(',').next().unwrap();
                return Some(NamedPlace::new(
                    name,
                    *display_name,
                    Coordinate::new(*lat, *lng),
                ));
            }
        }
        None
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> AdapterResult<Option<NamedPlace>> {
        *self.query_counts.lock().await.entry(address.to_owned()).or_insert(0) += 1;
        if address == Self::RETURN_ERROR {
            return Err(AdapterError::Unavailable("Geocoder is down".to_owned()));
        }
        Ok(Self::lookup(address))
    }

    async fn search(&self, query: &str, limit: usize) -> AdapterResult<Vec<NamedPlace>> {
        *self.query_counts.lock().await.entry(query.to_owned()).or_insert(0) += 1;
        let normalized = query.trim().to_lowercase();
        let results = CITIES
            .iter()
            .filter(|(key, _, _, display_name)| {
                key.contains(&normalized) || display_name.to_lowercase().contains(&normalized)
            })
            .take(limit)
            .map(|(_, lat, lng, display_name)| {
                let name = display_name.split(',').next().unwrap();
                NamedPlace::new(name, *display_name, Coordinate::new(*lat, *lng))
            })
            .collect();
        Ok(results)
    }
}

/// Router that routes legs with canned figures, falling back to a
/// great-circle estimate at truck speed.
#[derive(Clone, Default)]
pub(crate) struct MockRouter {
    /// Canned legs, keyed by origin and destination names.
    fixed: HashMap<(String, String), (f64, f64)>,

    /// Number of route queries served.
    route_count: Arc<Mutex<usize>>,
}

impl MockRouter {
    /// Road distance is this much longer than the great circle.
    const ROAD_FACTOR: f64 = 1.3;

    /// Average truck speed for the fallback estimate, in mph.
    const AVG_SPEED_MPH: f64 = 55.0;

    /// Creates a new mock router.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers canned `(distance_miles, duration_hours)` figures for the
    /// leg from `origin` to `destination`, by place name.
    pub(crate) fn with_leg(
        mut self,
        origin: &str,
        destination: &str,
        distance_miles: f64,
        duration_hours: f64,
    ) -> Self {
        self.fixed
            .insert((origin.to_owned(), destination.to_owned()), (distance_miles, duration_hours));
        self
    }

    /// Returns the number of route queries served.
    pub(crate) async fn route_count(&self) -> usize {
        *self.route_count.lock().await
    }
}

#[async_trait]
impl Router for MockRouter {
    async fn route(
        &self,
        origin: &NamedPlace,
        destination: &NamedPlace,
    ) -> AdapterResult<RouteSegment> {
        *self.route_count.lock().await += 1;

        let (distance_miles, duration_hours) =
            match self.fixed.get(&(origin.name.clone(), destination.name.clone())) {
                Some(figures) => *figures,
                None => {
                    let miles = origin.coordinates.haversine_miles(&destination.coordinates)
                        * Self::ROAD_FACTOR;
                    (miles, miles / Self::AVG_SPEED_MPH)
                }
            };

        let path = vec![
            origin.coordinates,
            origin.coordinates.lerp(&destination.coordinates, 0.25),
            origin.coordinates.lerp(&destination.coordinates, 0.5),
            origin.coordinates.lerp(&destination.coordinates, 0.75),
            destination.coordinates,
        ];

        RouteSegment::new(
            origin.clone(),
            destination.clone(),
            distance_miles,
            duration_hours,
            Some(polyline::encode(&path)),
        )
        .map_err(|e| AdapterError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_geocoder_known_city() {
        let geocoder = MockGeocoder::new();
        let place = geocoder.geocode("Chicago, IL").await.unwrap().unwrap();
        assert_eq!("Chicago", place.name);
        assert_eq!(Coordinate::new(41.8781, -87.6298), place.coordinates);
    }

    #[tokio::test]
    async fn test_mock_geocoder_unknown_address_misses() {
        let geocoder = MockGeocoder::new();
        assert!(geocoder.geocode("A Place That Does Not Exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_geocoder_search_respects_limit() {
        let geocoder = MockGeocoder::new();
        let results = geocoder.search("wi", 2).await.unwrap();
        assert_eq!(2, results.len());
    }

    #[tokio::test]
    async fn test_mock_router_fixed_leg() {
        let router = MockRouter::new().with_leg("Chicago", "Milwaukee", 93.0, 1.75);
        let geocoder = MockGeocoder::new();
        let chicago = geocoder.geocode("Chicago, IL").await.unwrap().unwrap();
        let milwaukee = geocoder.geocode("Milwaukee, WI").await.unwrap().unwrap();

        let segment = router.route(&chicago, &milwaukee).await.unwrap();
        assert_eq!(93.0, segment.distance_miles);
        assert_eq!(1.75, segment.duration_hours);
        assert!(segment.polyline.is_some());
    }

    #[tokio::test]
    async fn test_mock_router_fallback_estimate() {
        let router = MockRouter::new();
        let geocoder = MockGeocoder::new();
        let chicago = geocoder.geocode("Chicago, IL").await.unwrap().unwrap();
        let milwaukee = geocoder.geocode("Milwaukee, WI").await.unwrap().unwrap();

        let segment = router.route(&chicago, &milwaukee).await.unwrap();
        assert!((90.0..130.0).contains(&segment.distance_miles));
        assert!((segment.distance_miles / 55.0 - segment.duration_hours).abs() < 1e-9);
    }
}
