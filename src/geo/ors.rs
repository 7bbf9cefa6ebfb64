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

//! Router implementation backed by the OpenRouteService directions API.

use crate::clocks::Clock;
use crate::env::get_required_var;
use crate::geo::{with_retries, AdapterError, AdapterResult, Router};
use crate::model::{NamedPlace, RouteSegment};
use async_trait::async_trait;
use derivative::Derivative;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Base URL of the directions API.
const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org/v2";

/// Vehicle profile used for all requests.  Heavy goods vehicle matches the
/// trucks this planner is for.
const PROFILE: &str = "driving-hgv";

/// Meters per statute mile.
const METERS_PER_MILE: f64 = 1609.34;

/// Options to configure an `OrsRouter`.
#[derive(Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct OrsRouterOptions {
    /// The API key to authenticate with.
    #[derivative(Debug = "ignore")]
    pub api_key: String,

    /// Base URL of the endpoint.
    pub base_url: String,
}

impl OrsRouterOptions {
    /// Creates a set of options from the `ROUTER_API_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            api_key: get_required_var::<String>("ROUTER_API_KEY")?,
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }
}

/// Body of a directions request.
#[derive(Serialize)]
struct DirectionsRequest {
    /// Waypoints in longitude, latitude order, which is what the API wants.
    coordinates: Vec<[f64; 2]>,

    /// Whether to include turn-by-turn instructions.
    instructions: bool,
}

/// Distance and duration totals within a directions response.
#[derive(Deserialize)]
struct DirectionsSummary {
    /// Total distance in meters.
    distance: f64,

    /// Total duration in seconds.
    duration: f64,
}

/// One route alternative within a directions response.
#[derive(Deserialize)]
struct DirectionsRoute {
    /// Distance and duration totals.
    summary: DirectionsSummary,

    /// Encoded polyline of the route geometry.
    geometry: Option<String>,
}

/// Response from the directions API.
#[derive(Deserialize)]
struct DirectionsResponse {
    /// Route alternatives, best first.
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

/// Router that talks to the OpenRouteService directions API.
#[derive(Clone)]
pub struct OrsRouter {
    /// The API key to authenticate with.
    api_key: String,

    /// Base URL of the endpoint.
    base_url: String,

    /// Asynchronous HTTP client with which to issue the requests.
    client: Client,

    /// Clock used for retry backoff.
    clock: Arc<dyn Clock + Send + Sync>,
}

impl OrsRouter {
    /// Creates a new router using `opts` for configuration.
    pub fn new(opts: OrsRouterOptions, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            api_key: opts.api_key,
            base_url: opts.base_url,
            client: Client::default(),
            clock,
        }
    }

    /// Issues one directions request.
    async fn query(
        &self,
        origin: &NamedPlace,
        destination: &NamedPlace,
    ) -> AdapterResult<DirectionsRoute> {
        let request = DirectionsRequest {
            coordinates: vec![
                [origin.coordinates.lng, origin.coordinates.lat],
                [destination.coordinates.lng, destination.coordinates.lat],
            ],
            instructions: false,
        };

        let response = self
            .client
            .post(format!("{}/directions/{}", self.base_url, PROFILE))
            .header("Authorization", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(format!("Router request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {
                let body = response.json::<DirectionsResponse>().await.map_err(|e| {
                    AdapterError::Invalid(format!("Router returned malformed data: {}", e))
                })?;
                body.routes.into_iter().next().ok_or_else(|| {
                    AdapterError::Invalid(format!(
                        "No route found from {} to {}",
                        origin.name, destination.name
                    ))
                })
            }
            status if status.is_client_error() => Err(AdapterError::Invalid(format!(
                "Router rejected the request with status {}",
                status
            ))),
            status => {
                Err(AdapterError::Unavailable(format!("Router failed with status {}", status)))
            }
        }
    }
}

#[async_trait]
impl Router for OrsRouter {
    async fn route(
        &self,
        origin: &NamedPlace,
        destination: &NamedPlace,
    ) -> AdapterResult<RouteSegment> {
        let route = with_retries(&self.clock, || self.query(origin, destination)).await?;

        RouteSegment::new(
            origin.clone(),
            destination.clone(),
            route.summary.distance / METERS_PER_MILE,
            route.summary.duration / 3600.0,
            route.geometry,
        )
        .map_err(|e| AdapterError::Invalid(format!("Router returned a bad segment: {}", e)))
    }
}
