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

//! Utilities to deal with environment variables.

use std::{env, time::Duration};

/// Result type for environment errors.
type Result<T> = std::result::Result<T, String>;

/// Wrapper around an environment variable's value to support conversions to
/// other types.
pub struct Value(String);

impl TryFrom<Value> for String {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        Ok(value.0)
    }
}

/// Generates a `TryFrom<Value>` for a type that can be parsed by `FromStr`.
macro_rules! tryfrom_value_for_fromstr [
    ( $t:ty ) => {
        impl TryFrom<Value> for $t {
            type Error = String;

            fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
                value.0.parse::<$t>().map_err(|e| format!("Invalid {}: {}", stringify!($t), e))
            }
        }
    }
];

tryfrom_value_for_fromstr!(u16);
tryfrom_value_for_fromstr!(u32);
tryfrom_value_for_fromstr!(u64);
tryfrom_value_for_fromstr!(usize);

impl TryFrom<Value> for Duration {
    type Error = String;

    /// Parses a duration expressed as a quantity and a unit, e.g. `250ms` or
    /// `30s`.  A bare number is taken to be seconds, which is what the
    /// `*_SECONDS` variables carry.
    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        let mut split_point = value.0.len();
        for (i, ch) in value.0.chars().enumerate() {
            if !ch.is_ascii_digit() {
                split_point = i;
                break;
            }
        }
        let (quantity, unit) = value.0.split_at(split_point);

        let quantity = quantity
            .parse::<u64>()
            .map_err(|e| format!("Invalid time quantity '{}': {}", quantity, e))?;

        match unit {
            "ms" => Ok(Duration::from_millis(quantity)),
            "" | "s" => Ok(Duration::from_secs(quantity)),
            "m" => Ok(Duration::from_secs(quantity.saturating_mul(60))),
            "h" => Ok(Duration::from_secs(quantity.saturating_mul(60 * 60))),
            "d" => Ok(Duration::from_secs(quantity.saturating_mul(24 * 60 * 60))),
            unit => Err(format!("Invalid time unit '{}'", unit)),
        }
    }
}

/// Gets an optional environment variable `name` with a conversion to a
/// target type `T`.
pub fn get_optional_var<T: TryFrom<Value, Error = String>>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => match Value(value).try_into() {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(format!("Invalid type in environment variable {}: {}", name, e)),
        },
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(format!("Invalid value in environment variable {}", name))
        }
    }
}

/// Gets a required environment variable `name` with a conversion to a target
/// type `T`.
pub fn get_required_var<T: TryFrom<Value, Error = String>>(name: &str) -> Result<T> {
    match env::var(name) {
        Ok(value) => match Value(value).try_into() {
            Ok(value) => Ok(value),
            Err(e) => Err(format!("Invalid type in environment variable {}: {}", name, e)),
        },
        Err(env::VarError::NotPresent) => {
            Err(format!("Required environment variable {} not present", name))
        }
        Err(env::VarError::NotUnicode(_)) => {
            Err(format!("Invalid value in environment variable {}", name))
        }
    }
}
