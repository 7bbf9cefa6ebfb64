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

//! HOS-compliant trip planner and ELD daily-log generator.
//!
//! The service takes three addresses and the driver's already-accrued cycle
//! hours, and produces a schedule that complies with the FMCSA
//! property-carrying-driver hours-of-service rules (70-hour/8-day cycle):
//! an ordered stop list, per-calendar-day duty-status ledgers, and summary
//! totals.
//!
//! The code is organized in layers, each of which only depends on the ones
//! before it:
//!
//! 1.  `model`: High-level data types that represent concepts in the domain.
//!     There is no logic here beyond construction-time validation.
//!
//! 1.  `rules`: The immutable hours-of-service policy table.
//!
//! 1.  `scheduler` and `logbook`: The computational core.  The scheduler is
//!     a deterministic state machine that turns a routed trip plan into a
//!     timeline of driving, rest, and service events; the logbook projector
//!     slices that timeline into per-calendar-day duty-status ledgers.
//!
//! 1.  `geo`: Contracts and implementations for the geocoding, routing, and
//!     rest-stop collaborators, including caching wrappers and mocks.
//!
//! 1.  `db`: The persistence layer.  PostgreSQL backs production and SQLite
//!     backs the unit tests.
//!
//! 1.  `driver`: The business logic layer, coordinating adapters and the
//!     database inside a single transaction per operation.
//!
//! 1.  `rest`: The HTTP layer.  Every API lives in its own file and is
//!     backed by a `Driver`.  This is the only layer that converts typed
//!     errors to HTTP statuses.
//!
//! 1.  `main`: The app launcher, which gathers configuration data from
//!     environment variables and calls `serve`.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use crate::clocks::Clock;
use crate::db::Db;
use crate::driver::{Driver, DriverOptions};
use crate::geo::{Geocoder, RestStopLocator, Router};
use crate::rest::app;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod geo;
pub mod logbook;
pub mod model;
pub mod rest;
pub mod rules;
pub mod scheduler;

/// Instantiates all resources to serve the application on `bind_addr`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would
/// force us to expose many crate-internal types to the public, which in turn
/// would make dead code detection harder.
#[allow(clippy::too_many_arguments)]
pub async fn serve(
    bind_addr: SocketAddr,
    db: Arc<dyn Db + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    geocoder: Arc<dyn Geocoder + Send + Sync>,
    router: Arc<dyn Router + Send + Sync>,
    locator: Arc<dyn RestStopLocator + Send + Sync>,
    opts: DriverOptions,
    allowed_origins: Option<Vec<String>>,
) -> Result<(), Box<dyn Error>> {
    let driver = Driver::new(db, clock, geocoder, router, locator, opts);
    let app = app(driver, allowed_origins)?;

    axum_server::bind(bind_addr).serve(app.into_make_service()).await?;
    Ok(())
}
