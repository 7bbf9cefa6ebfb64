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

//! Extends the driver with the address suggestion method.

use crate::driver::{Driver, DriverError, DriverResult};
use crate::geo::AdapterError;
use crate::model::NamedPlace;

/// Maximum number of suggestions returned per query.
const SUGGESTION_LIMIT: usize = 5;

/// Queries shorter than this return nothing instead of hitting the
/// geocoder.
const MIN_QUERY_LENGTH: usize = 2;

impl Driver {
    /// Returns address suggestions for a partial `query`.
    pub async fn suggest_addresses(self, query: String) -> DriverResult<Vec<NamedPlace>> {
        let query = query.trim();
        if query.len() < MIN_QUERY_LENGTH {
            return Ok(vec![]);
        }

        match self.geocoder.search(query, SUGGESTION_LIMIT).await {
            Ok(places) => Ok(places),
            Err(AdapterError::Invalid(msg)) => Err(DriverError::UpstreamInvalid {
                message: format!("Address search failed: {}", msg),
                field: None,
            }),
            Err(AdapterError::Unavailable(msg)) => {
                Err(DriverError::BackendError(format!("Geocoder unavailable: {}", msg)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::testutils::TestContext;

    #[tokio::test]
    async fn test_suggestions_for_known_prefix() {
        let context = TestContext::setup().await;
        let places =
            context.driver.clone().suggest_addresses("madison".to_owned()).await.unwrap();
        assert_eq!(1, places.len());
        assert_eq!("Madison", places[0].name);
    }

    #[tokio::test]
    async fn test_short_queries_return_nothing_without_a_lookup() {
        let context = TestContext::setup().await;
        assert!(context.driver.clone().suggest_addresses("m".to_owned()).await.unwrap().is_empty());
        assert!(context.driver.clone().suggest_addresses("  ".to_owned()).await.unwrap().is_empty());
        assert_eq!(0, context.geocoder.query_count("m").await);
    }

    #[tokio::test]
    async fn test_suggestions_capped_at_limit() {
        let context = TestContext::setup().await;
        let places = context.driver.clone().suggest_addresses("us".to_owned()).await.unwrap();
        assert!(places.len() <= 5);
    }
}
