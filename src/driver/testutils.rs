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

//! Common utilities to test driver operations against mocks and an
//! in-memory database.

use crate::clocks::testutils::SettableClock;
use crate::clocks::Clock;
use crate::db::sqlite::testutils::setup;
use crate::db::Db;
use crate::driver::{Driver, DriverOptions, TokenPair};
use crate::geo::{MockGeocoder, MockRouter, TruckStopLocator};
use crate::model::{EmailAddress, Password, User};
use std::sync::Arc;
use time::macros::datetime;

/// State for a driver test.
pub(crate) struct TestContext {
    /// The driver under test.
    pub(crate) driver: Driver,

    /// The database the driver is backed by.
    pub(crate) db: Arc<dyn Db + Send + Sync>,

    /// The fake clock the driver observes.
    pub(crate) clock: Arc<SettableClock>,

    /// The mock geocoder behind the driver.
    pub(crate) geocoder: MockGeocoder,

    /// The mock router behind the driver.
    pub(crate) router: MockRouter,
}

impl TestContext {
    /// Builds a driver over mocks, a settable clock, and a fresh in-memory
    /// database.
    pub(crate) async fn setup_with(router: MockRouter, opts: DriverOptions) -> Self {
        let db: Arc<dyn Db + Send + Sync> = Arc::from(setup().await);
        let clock = Arc::from(SettableClock::new(datetime!(2026-01-17 06:00:00 UTC)));
        let geocoder = MockGeocoder::new();

        let driver = Driver::new(
            db.clone(),
            clock.clone() as Arc<dyn Clock + Send + Sync>,
            Arc::from(geocoder.clone()),
            Arc::from(router.clone()),
            Arc::from(TruckStopLocator::new()),
            opts,
        );

        Self { driver, db, clock, geocoder, router }
    }

    /// Builds a default test context.
    pub(crate) async fn setup() -> Self {
        Self::setup_with(MockRouter::new(), DriverOptions::default()).await
    }

    /// Registers a test account and returns it with its tokens.
    pub(crate) async fn register_user(&self, email: &str) -> (User, TokenPair) {
        self.driver
            .clone()
            .register(
                EmailAddress::new(email).unwrap(),
                Password::new("correct horse").unwrap(),
                "Test Driver".to_owned(),
            )
            .await
            .unwrap()
    }
}
