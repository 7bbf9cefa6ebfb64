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

//! Entry point to the service.  Gathers configuration data from environment
//! variables and launches the server.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use eldplan::clocks::{Clock, SystemClock};
use eldplan::db::postgres::{PostgresDb, PostgresOptions};
use eldplan::db::{init_schema, Db};
use eldplan::driver::DriverOptions;
use eldplan::env::get_optional_var;
use eldplan::geo::{
    CacheOptions, CachingGeocoder, CachingRouter, NominatimGeocoder, NominatimOptions, OrsRouter,
    OrsRouterOptions, TruckStopLocator,
};
use log::info;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

/// Default bind address when `HTTP_LISTEN_ADDR` is not set.
const DEFAULT_LISTEN_ADDR: &str = ":8000";

/// Parses a listen address, accepting the `:port` shorthand for
/// all-interfaces binding.
fn parse_listen_addr(raw: &str) -> Result<SocketAddr, String> {
    let full = if raw.starts_with(':') { format!("0.0.0.0{}", raw) } else { raw.to_owned() };
    full.parse::<SocketAddr>().map_err(|e| format!("Invalid listen address '{}': {}", raw, e))
}

/// Parses the comma-separated CORS allowlist.
fn parse_allowed_origins(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|raw| raw.split(',').map(|origin| origin.trim().to_owned()).collect())
}

/// Gathers configuration, wires the components together, and serves.
async fn run() -> Result<(), Box<dyn Error>> {
    let addr = parse_listen_addr(
        &get_optional_var::<String>("HTTP_LISTEN_ADDR")?
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned()),
    )?;
    let allowed_origins = parse_allowed_origins(get_optional_var::<String>("ALLOWED_ORIGINS")?);

    let clock: Arc<dyn Clock + Send + Sync> = Arc::from(SystemClock::default());

    let db: Arc<dyn Db + Send + Sync> =
        Arc::from(PostgresDb::connect(PostgresOptions::from_env()?)?);
    init_schema(&mut db.ex().await?).await?;

    let geocoder = CachingGeocoder::new(
        CacheOptions::from_env("GEOCODER")?,
        NominatimGeocoder::new(NominatimOptions::from_env()?, clock.clone()),
    );
    let router = CachingRouter::new(
        CacheOptions::from_env("ROUTER")?,
        OrsRouter::new(OrsRouterOptions::from_env()?, clock.clone()),
    );
    let locator = TruckStopLocator::new();

    let opts = DriverOptions::from_env()?;

    info!("Listening on {}", addr);
    eldplan::serve(
        addr,
        db,
        clock,
        Arc::from(geocoder),
        Arc::from(router),
        Arc::from(locator),
        opts,
        allowed_origins,
    )
    .await
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listen_addr_shorthand() {
        assert_eq!("0.0.0.0:8000".parse::<SocketAddr>().unwrap(), parse_listen_addr(":8000").unwrap());
    }

    #[test]
    fn test_parse_listen_addr_full() {
        assert_eq!(
            "127.0.0.1:3000".parse::<SocketAddr>().unwrap(),
            parse_listen_addr("127.0.0.1:3000").unwrap()
        );
    }

    #[test]
    fn test_parse_listen_addr_invalid() {
        assert!(parse_listen_addr("nonsense").unwrap_err().contains("Invalid listen address"));
    }

    #[test]
    fn test_parse_allowed_origins() {
        assert_eq!(None, parse_allowed_origins(None));
        assert_eq!(
            Some(vec!["https://a.example.com".to_owned(), "https://b.example.com".to_owned()]),
            parse_allowed_origins(Some("https://a.example.com, https://b.example.com".to_owned()))
        );
    }
}
