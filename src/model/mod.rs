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

//! High-level data types for the trip-planning domain.
//!
//! There should be no logic in here beyond construction-time validation.
//! Extensive use of the newtype pattern is strongly encouraged.

use serde::Serializer;

mod auth;
mod place;
mod trip;

pub use auth::{AccessToken, EmailAddress, HashedPassword, Password, RefreshToken, User, UserId};
pub use place::{Coordinate, NamedPlace};
pub use trip::{
    Activity, CycleHours, DailyLedger, DutyStatus, LedgerEntry, LedgerHours, Remark, RoutePlan,
    RouteSegment, Stop, StopKind, Trip, TripId, TripOverview, TripSummary,
};

/// Model errors.  Usually a result of invalid data inputs.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Result type for this module.
pub type ModelResult<T> = Result<T, ModelError>;

/// Formats a minute-of-day count as `HH:MM`, where `1440` renders as the
/// end-of-day marker `24:00`.
pub(crate) fn format_minute_of_day(minute: u16) -> String {
    debug_assert!(minute <= 24 * 60);
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Serializes a minute-of-day count as its `HH:MM` rendering.
pub(crate) fn serialize_minute_of_day<S: Serializer>(
    minute: &u16,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_minute_of_day(*minute))
}

/// Deserializes an `HH:MM` rendering back into a minute-of-day count.
pub(crate) fn deserialize_minute_of_day<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<u16, D::Error> {
    use serde::de::Error;

    let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
    let (hh, mm) = raw
        .split_once(':')
        .ok_or_else(|| D::Error::custom(format!("Invalid time of day '{}'", raw)))?;
    let hh = hh.parse::<u16>().map_err(D::Error::custom)?;
    let mm = mm.parse::<u16>().map_err(D::Error::custom)?;
    let minute = hh * 60 + mm;
    if minute > 24 * 60 || mm >= 60 {
        return Err(D::Error::custom(format!("Time of day '{}' out of range", raw)));
    }
    Ok(minute)
}

/// Rounds an hour or mile quantity to two decimal places, which is the
/// precision official daily logs carry.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minute_of_day() {
        assert_eq!("00:00", format_minute_of_day(0));
        assert_eq!("06:30", format_minute_of_day(6 * 60 + 30));
        assert_eq!("23:59", format_minute_of_day(23 * 60 + 59));
        assert_eq!("24:00", format_minute_of_day(24 * 60));
    }

    #[test]
    fn test_round2() {
        assert_eq!(3.25, round2(3.25));
        assert_eq!(3.33, round2(3.3333333));
        assert_eq!(24.0, round2(23.999999));
    }

    #[test]
    fn test_minute_of_day_round_trip() {
        #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
        struct Wrapper(
            #[serde(
                serialize_with = "serialize_minute_of_day",
                deserialize_with = "deserialize_minute_of_day"
            )]
            u16,
        );

        for minute in [0u16, 1, 59, 60, 999, 1439, 1440] {
            let text = serde_json::to_string(&Wrapper(minute)).unwrap();
            assert_eq!(Wrapper(minute), serde_json::from_str(&text).unwrap());
        }

        serde_json::from_str::<Wrapper>("\"25:00\"").unwrap_err();
        serde_json::from_str::<Wrapper>("\"12:60\"").unwrap_err();
        serde_json::from_str::<Wrapper>("\"nope\"").unwrap_err();
    }
}
