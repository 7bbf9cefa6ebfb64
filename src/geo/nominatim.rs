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

//! Geocoder implementation backed by a Nominatim-class endpoint.

use crate::clocks::Clock;
use crate::env::get_optional_var;
use crate::geo::{with_retries, AdapterError, AdapterResult, Geocoder};
use crate::model::{Coordinate, NamedPlace};
use async_trait::async_trait;
use futures::lock::Mutex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Default base URL of the geocoding endpoint.
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// User agent we identify as.  Public Nominatim instances require one.
const USER_AGENT: &str = concat!("eldplan/", env!("CARGO_PKG_VERSION"));

/// Minimum spacing between requests.  Public Nominatim instances allow at
/// most one request per second.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Options to configure a `NominatimGeocoder`.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct NominatimOptions {
    /// Base URL of the endpoint.
    pub base_url: String,
}

impl Default for NominatimOptions {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_owned() }
    }
}

impl NominatimOptions {
    /// Creates a set of options from the `GEOCODER_BASE_URL` environment
    /// variable, falling back to the public endpoint.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            base_url: get_optional_var::<String>("GEOCODER_BASE_URL")?
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        })
    }
}

/// One result row as returned by the search API.
#[derive(Deserialize)]
struct SearchRow {
    /// Latitude, encoded as a string.
    lat: String,

    /// Longitude, encoded as a string.
    lon: String,

    /// Full display name of the match.
    display_name: String,
}

impl SearchRow {
    /// Converts the wire row into a place, validating the coordinates.
    fn into_place(self) -> AdapterResult<NamedPlace> {
        let lat = self
            .lat
            .parse::<f64>()
            .map_err(|e| AdapterError::Invalid(format!("Invalid latitude in response: {}", e)))?;
        let lng = self
            .lon
            .parse::<f64>()
            .map_err(|e| AdapterError::Invalid(format!("Invalid longitude in response: {}", e)))?;
        let name = self.display_name.split(',').next().unwrap_or(&self.display_name).to_owned();
        Ok(NamedPlace::new(name, self.display_name, Coordinate::new(lat, lng)))
    }
}

/// Geocoder that talks to a Nominatim-class endpoint over HTTP.
#[derive(Clone)]
pub struct NominatimGeocoder {
    /// Base URL of the endpoint.
    base_url: String,

    /// Asynchronous HTTP client with which to issue the requests.
    client: Client,

    /// Clock used for request spacing and retry backoff.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Completion time of the last outbound request.  Held across the
    /// pre-request sleep so concurrent callers queue behind the budget.
    last_request: Arc<Mutex<Option<OffsetDateTime>>>,
}

impl NominatimGeocoder {
    /// Creates a new geocoder using `opts` for configuration.
    pub fn new(opts: NominatimOptions, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            base_url: opts.base_url,
            client: Client::default(),
            clock,
            last_request: Arc::from(Mutex::from(None)),
        }
    }

    /// Waits out the per-adapter rate budget and stamps this request.
    async fn honor_rate_budget(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = self.clock.now_utc() - last;
            if let Ok(elapsed) = Duration::try_from(elapsed) {
                if elapsed < MIN_REQUEST_INTERVAL {
                    self.clock.sleep(MIN_REQUEST_INTERVAL - elapsed).await;
                }
            }
        }
        *last_request = Some(self.clock.now_utc());
    }

    /// Issues one search request and parses its rows.
    async fn query(&self, query: &str, limit: usize) -> AdapterResult<Vec<SearchRow>> {
        self.honor_rate_budget().await;

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", &limit.to_string()),
                ("countrycodes", "us"),
            ])
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(format!("Geocoder request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => response.json::<Vec<SearchRow>>().await.map_err(|e| {
                AdapterError::Invalid(format!("Geocoder returned malformed data: {}", e))
            }),
            status if status.is_client_error() => Err(AdapterError::Invalid(format!(
                "Geocoder rejected the request with status {}",
                status
            ))),
            status => Err(AdapterError::Unavailable(format!(
                "Geocoder failed with status {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> AdapterResult<Option<NamedPlace>> {
        let rows = with_retries(&self.clock, || self.query(address, 1)).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_place()?)),
            None => Ok(None),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> AdapterResult<Vec<NamedPlace>> {
        let rows = with_retries(&self.clock, || self.query(query, limit)).await?;
        rows.into_iter().map(SearchRow::into_place).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_env_default() {
        temp_env::with_var_unset("GEOCODER_BASE_URL", || {
            let opts = NominatimOptions::from_env().unwrap();
            assert_eq!(NominatimOptions::default(), opts);
        });
    }

    #[test]
    fn test_options_from_env_override() {
        temp_env::with_var("GEOCODER_BASE_URL", Some("http://localhost:8080"), || {
            let opts = NominatimOptions::from_env().unwrap();
            assert_eq!("http://localhost:8080", opts.base_url);
        });
    }

    #[test]
    fn test_search_row_parsing() {
        let row = SearchRow {
            lat: "41.8781".to_owned(),
            lon: "-87.6298".to_owned(),
            display_name: "Chicago, Cook County, Illinois, USA".to_owned(),
        };
        let place = row.into_place().unwrap();
        assert_eq!("Chicago", place.name);
        assert_eq!(Coordinate::new(41.8781, -87.6298), place.coordinates);
    }

    #[test]
    fn test_search_row_bad_coordinates() {
        let row = SearchRow {
            lat: "not a number".to_owned(),
            lon: "-87.6298".to_owned(),
            display_name: "Chicago".to_owned(),
        };
        match row.into_place() {
            Err(AdapterError::Invalid(msg)) => assert!(msg.contains("Invalid latitude")),
            e => panic!("{:?}", e),
        }
    }
}
