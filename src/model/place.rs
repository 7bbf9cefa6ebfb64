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

//! The `Coordinate` and `NamedPlace` data types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A latitude/longitude pair in decimal degrees.
///
/// Values are truncated to six fractional digits at construction time, which
/// is the precision the store persists (roughly 11 cm).
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub lat: f64,

    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a new coordinate, rounding both axes to six decimal places.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat: round6(lat), lng: round6(lng) }
    }

    /// Linearly interpolates between `self` and `other` at `fraction`, which
    /// must be in `0.0..=1.0`.
    pub fn lerp(&self, other: &Coordinate, fraction: f64) -> Coordinate {
        let fraction = fraction.clamp(0.0, 1.0);
        Coordinate::new(
            self.lat + (other.lat - self.lat) * fraction,
            self.lng + (other.lng - self.lng) * fraction,
        )
    }

    /// Computes the great-circle distance to `other` in statute miles.
    pub fn haversine_miles(&self, other: &Coordinate) -> f64 {
        const EARTH_RADIUS_MILES: f64 = 3959.0;

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_MILES * c
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Rounds a coordinate axis to six decimal places.
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// A geocoded place: an address, its coordinates, and a canonical display
/// name.  Immutable after creation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NamedPlace {
    /// Short display name, e.g. the city or the truck-stop brand.
    pub name: String,

    /// Full address line.
    pub address: String,

    /// Location of the place.
    pub coordinates: Coordinate,
}

impl NamedPlace {
    /// Creates a new named place.
    pub fn new<N: Into<String>, A: Into<String>>(
        name: N,
        address: A,
        coordinates: Coordinate,
    ) -> Self {
        Self { name: name.into(), address: address.into(), coordinates }
    }

    /// Creates a placeholder place for an unnamed point along the route.
    pub fn unnamed(kind: &str, coordinates: Coordinate) -> Self {
        Self {
            name: format!("{} near {}", kind, coordinates),
            address: format!("{} near {}", kind, coordinates),
            coordinates,
        }
    }
}
