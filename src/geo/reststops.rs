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

//! Rest-stop locator that names a plausible truck stop near a point.
//!
//! The locator is advisory labelling only.  It picks deterministically from
//! a fixed table of truck-stop brands so that identical inputs always yield
//! identical schedules.

use crate::geo::RestStopLocator;
use crate::model::{Coordinate, NamedPlace, StopKind};

/// Truck-stop brands to pick from.
const BRANDS: &[&str] = &[
    "Pilot Travel Center",
    "Love's Travel Stop",
    "Flying J Travel Center",
    "TA Travel Center",
    "Petro Stopping Center",
];

/// Locator that deterministically assigns truck-stop names along the route.
#[derive(Clone, Default)]
pub struct TruckStopLocator {}

impl TruckStopLocator {
    /// Creates a new locator.
    pub fn new() -> Self {
        Self {}
    }
}

/// Derives a stable index from a coordinate.
fn coordinate_seed(coordinates: Coordinate) -> u64 {
    let lat = (coordinates.lat * 1_000_000.0).round() as i64;
    let lng = (coordinates.lng * 1_000_000.0).round() as i64;
    (lat.unsigned_abs()).wrapping_mul(31).wrapping_add(lng.unsigned_abs())
}

impl RestStopLocator for TruckStopLocator {
    fn locate(&self, near: Coordinate, kind: StopKind) -> Option<NamedPlace> {
        let seed = coordinate_seed(near);
        let brand = BRANDS[(seed % BRANDS.len() as u64) as usize];
        let exit = 10 + seed % 380;

        let name = match kind {
            StopKind::Fuel => brand.to_owned(),
            StopKind::Break30Min => "Rest Area".to_owned(),
            StopKind::Rest10Hr => brand.to_owned(),
            StopKind::Restart34Hr => format!("Home Terminal / {}", brand),
            _ => brand.to_owned(),
        };
        let address = format!("{}, Exit {}, Interstate Highway, USA", brand, exit);

        Some(NamedPlace::new(name, address, near))
    }
}
