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

//! Contracts and implementations for the geographic collaborators: the
//! geocoder, the router, and the rest-stop locator.
//!
//! Every adapter is a pure function from a request record to a response
//! record, hidden behind a trait so the scheduler and the driver can be
//! exercised with canned responses.  The live implementations retry
//! transient failures with bounded backoff and are wrapped with LRU caches.

use crate::clocks::Clock;
use crate::model::{Coordinate, NamedPlace, RouteSegment, StopKind};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

mod caching;
pub use caching::{CacheOptions, CachingGeocoder, CachingRouter};
#[cfg(test)]
mod mock;
#[cfg(test)]
pub(crate) use mock::{MockGeocoder, MockRouter};
mod nominatim;
pub use nominatim::{NominatimGeocoder, NominatimOptions};
mod ors;
pub use ors::{OrsRouter, OrsRouterOptions};
pub mod polyline;
mod reststops;
pub use reststops::TruckStopLocator;

/// Number of attempts for retryable adapter calls.
const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff delay between attempts.
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Upper bound on the backoff delay between attempts.
const BACKOFF_CAP: Duration = Duration::from_secs(2);

/// Adapter errors.  The distinction drives the retry policy: `Unavailable`
/// failures are transient and retried; `Invalid` failures are not.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AdapterError {
    /// The upstream rejected the request or had no useful answer.
    #[error("{0}")]
    Invalid(String),

    /// The upstream could not be reached or failed transiently.
    #[error("{0}")]
    Unavailable(String),
}

/// Result type for this module.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Interface to turn addresses into coordinates.
#[async_trait]
pub trait Geocoder {
    /// Resolves `address` into a place, or `None` when the upstream has no
    /// match for it.
    async fn geocode(&self, address: &str) -> AdapterResult<Option<NamedPlace>>;

    /// Returns up to `limit` candidate places matching `query`.
    async fn search(&self, query: &str, limit: usize) -> AdapterResult<Vec<NamedPlace>>;
}

/// Interface to route between two places.
#[async_trait]
pub trait Router {
    /// Computes the drivable leg from `origin` to `destination`.
    async fn route(
        &self,
        origin: &NamedPlace,
        destination: &NamedPlace,
    ) -> AdapterResult<RouteSegment>;
}

/// Interface to find a plausible truck stop near a point along the route.
///
/// This collaborator is advisory: hours-of-service accounting never depends
/// on it, and a miss is replaced with a synthetic placeholder.
pub trait RestStopLocator {
    /// Returns a named stop near `near` suitable for a stop of kind `kind`.
    fn locate(&self, near: Coordinate, kind: StopKind) -> Option<NamedPlace>;
}

/// Runs `op` up to `MAX_ATTEMPTS` times, sleeping with exponential backoff
/// between transient failures.  Non-retryable failures surface immediately.
pub(crate) async fn with_retries<T, F, Fut>(
    clock: &Arc<dyn Clock + Send + Sync>,
    mut op: F,
) -> AdapterResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AdapterResult<T>>,
{
    let mut delay = BACKOFF_BASE;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(AdapterError::Unavailable(e)) if attempt < MAX_ATTEMPTS => {
                log::warn!("Transient adapter failure (attempt {}): {}", attempt, e);
                clock.sleep(delay).await;
                delay = std::cmp::min(delay * 2, BACKOFF_CAP);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
