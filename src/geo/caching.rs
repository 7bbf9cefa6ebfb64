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

//! Wrappers over the geocoder and the router to cache query results.
//!
//! Caches are keyed by request equality, bounded by entry count and TTL, and
//! only successful responses are stored.

use crate::env::get_optional_var;
use crate::geo::{AdapterResult, Geocoder, Router};
use crate::model::{NamedPlace, RouteSegment};
use async_trait::async_trait;
use futures::lock::Mutex;
use log::warn;
use lru_time_cache::LruCache;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum amount of time to keep cached entries in memory.
const DEFAULT_TTL_SECONDS: u64 = 60 * 60;

/// Default maximum number of responses to keep cached in memory.
const DEFAULT_CAPACITY: usize = 10 * 1024;

/// Options to configure a caching adapter wrapper.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct CacheOptions {
    /// The TTL for the entries in the cache.
    pub ttl: Duration,

    /// The cache capacity in number of entries.
    pub capacity: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(DEFAULT_TTL_SECONDS), capacity: DEFAULT_CAPACITY }
    }
}

impl CacheOptions {
    /// Creates a set of options from environment variables whose name is
    /// prefixed with the given `prefix`.
    ///
    /// This will use variables such as `<prefix>_CACHE_TTL` and
    /// `<prefix>_CACHE_CAPACITY`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            ttl: get_optional_var::<Duration>(&format!("{}_CACHE_TTL", prefix))?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_TTL_SECONDS)),
            capacity: get_optional_var::<usize>(&format!("{}_CACHE_CAPACITY", prefix))?
                .unwrap_or(DEFAULT_CAPACITY),
        })
    }
}

/// Geocoder wrapper that caches responses from the wrapped geocoder.
#[derive(Clone)]
pub struct CachingGeocoder<G> {
    /// The wrapped geocoder.
    delegee: G,

    /// Cache of successful single-address lookups.
    geocode_cache: Arc<Mutex<LruCache<String, Option<NamedPlace>>>>,

    /// Cache of successful suggestion queries.
    search_cache: Arc<Mutex<LruCache<(String, usize), Vec<NamedPlace>>>>,
}

impl<G> CachingGeocoder<G> {
    /// Creates a new caching geocoder that wraps `delegee` using `opts` for
    /// configuration.
    pub fn new(opts: CacheOptions, delegee: G) -> Self {
        Self {
            delegee,
            geocode_cache: Arc::from(Mutex::from(LruCache::with_expiry_duration_and_capacity(
                opts.ttl,
                opts.capacity,
            ))),
            search_cache: Arc::from(Mutex::from(LruCache::with_expiry_duration_and_capacity(
                opts.ttl,
                opts.capacity,
            ))),
        }
    }
}

#[async_trait]
impl<G> Geocoder for CachingGeocoder<G>
where
    G: Geocoder + Send + Sync,
{
    async fn geocode(&self, address: &str) -> AdapterResult<Option<NamedPlace>> {
        let key = address.to_owned();
        {
            let mut cache = self.geocode_cache.lock().await;
            if let Some(place) = cache.get(&key) {
                return Ok(place.clone());
            }
        }

        let place = self.delegee.geocode(address).await?;

        let mut cache = self.geocode_cache.lock().await;
        if let Some(old_place) = cache.insert(key, place.clone()) {
            if old_place != place {
                warn!(
                    "Cache insertion race detected with inconsistent values: {:?} != {:?}",
                    old_place, place
                );
            }
        }
        Ok(place)
    }

    async fn search(&self, query: &str, limit: usize) -> AdapterResult<Vec<NamedPlace>> {
        let key = (query.to_owned(), limit);
        {
            let mut cache = self.search_cache.lock().await;
            if let Some(places) = cache.get(&key) {
                return Ok(places.clone());
            }
        }

        let places = self.delegee.search(query, limit).await?;

        let mut cache = self.search_cache.lock().await;
        cache.insert(key, places.clone());
        Ok(places)
    }
}

/// Cache key for a routed leg: both endpoints at microdegree resolution.
type RouteKey = ((i64, i64), (i64, i64));

/// Quantizes a place into a cache key component.
fn place_key(place: &NamedPlace) -> (i64, i64) {
    (
        (place.coordinates.lat * 1_000_000.0).round() as i64,
        (place.coordinates.lng * 1_000_000.0).round() as i64,
    )
}

/// Router wrapper that caches responses from the wrapped router.
#[derive(Clone)]
pub struct CachingRouter<R> {
    /// The wrapped router.
    delegee: R,

    /// Cache of successfully routed legs.
    cache: Arc<Mutex<LruCache<RouteKey, RouteSegment>>>,
}

impl<R> CachingRouter<R> {
    /// Creates a new caching router that wraps `delegee` using `opts` for
    /// configuration.
    pub fn new(opts: CacheOptions, delegee: R) -> Self {
        Self {
            delegee,
            cache: Arc::from(Mutex::from(LruCache::with_expiry_duration_and_capacity(
                opts.ttl,
                opts.capacity,
            ))),
        }
    }
}

#[async_trait]
impl<R> Router for CachingRouter<R>
where
    R: Router + Send + Sync,
{
    async fn route(
        &self,
        origin: &NamedPlace,
        destination: &NamedPlace,
    ) -> AdapterResult<RouteSegment> {
        let key = (place_key(origin), place_key(destination));
        {
            let mut cache = self.cache.lock().await;
            if let Some(segment) = cache.get(&key) {
                return Ok(segment.clone());
            }
        }

        let segment = self.delegee.route(origin, destination).await?;

        let mut cache = self.cache.lock().await;
        if let Some(old_segment) = cache.insert(key, segment.clone()) {
            if old_segment != segment {
                warn!(
                    "Cache insertion race detected with inconsistent values: {:?} != {:?}",
                    old_segment, segment
                );
            }
        }
        Ok(segment)
    }
}
