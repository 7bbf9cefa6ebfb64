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

//! Data types that describe a planned trip: segments, stops, activities,
//! daily ledgers, and the persisted aggregate.

use crate::model::{
    deserialize_minute_of_day, serialize_minute_of_day, ModelError, ModelResult, NamedPlace,
};
use crate::rules::PROPERTY_CARRYING_70H_8D;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Unique identifier of a persisted trip.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TripId(Uuid);

impl TripId {
    /// Creates an identifier from a raw UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TripId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Uuid>() {
            Ok(id) => Ok(Self(id)),
            Err(e) => Err(ModelError(format!("Invalid trip id: {}", e))),
        }
    }
}

/// Hours already accrued against the 70-hour cycle, validated into range.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct CycleHours(f64);

impl CycleHours {
    /// Creates a new quantity of cycle hours after validating its range.
    pub fn new(hours: f64) -> ModelResult<Self> {
        if !hours.is_finite() {
            return Err(ModelError("Cycle hours must be a finite number".to_owned()));
        }
        if !(0.0..=PROPERTY_CARRYING_70H_8D.cycle_limit).contains(&hours) {
            return Err(ModelError(format!(
                "Cycle hours must be between 0 and {}, got {}",
                PROPERTY_CARRYING_70H_8D.cycle_limit, hours
            )));
        }
        Ok(Self(hours))
    }

    /// Returns the raw number of hours.
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for CycleHours {
    type Error = ModelError;

    fn try_from(hours: f64) -> ModelResult<Self> {
        CycleHours::new(hours)
    }
}

impl From<CycleHours> for f64 {
    fn from(hours: CycleHours) -> f64 {
        hours.0
    }
}

/// One routed leg of the trip, as returned by the router.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RouteSegment {
    /// Origin of the leg.
    #[serde(rename = "from")]
    pub origin: NamedPlace,

    /// Destination of the leg.
    #[serde(rename = "to")]
    pub destination: NamedPlace,

    /// Road distance of the leg in statute miles.
    pub distance_miles: f64,

    /// Driving time of the leg in hours.
    pub duration_hours: f64,

    /// Encoded polyline of the leg's geometry, when the router supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

impl RouteSegment {
    /// Creates a new segment after validating that the distance and duration
    /// are non-negative.
    pub fn new(
        origin: NamedPlace,
        destination: NamedPlace,
        distance_miles: f64,
        duration_hours: f64,
        polyline: Option<String>,
    ) -> ModelResult<Self> {
        if !(distance_miles >= 0.0) || !(duration_hours >= 0.0) {
            return Err(ModelError(format!(
                "Segment distance and duration must be non-negative, got {} mi / {} h",
                distance_miles, duration_hours
            )));
        }
        Ok(Self { origin, destination, distance_miles, duration_hours, polyline })
    }
}

/// The duty status of the driver during an interval.  The four statuses
/// partition every minute of every day.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    /// Off duty.
    OffDuty,

    /// Resting in the sleeper berth.
    SleeperBerth,

    /// Driving the vehicle.
    Driving,

    /// On duty but not driving: inspections, loading, fueling, breaks.
    OnDuty,
}

impl DutyStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            DutyStatus::OffDuty => "off_duty",
            DutyStatus::SleeperBerth => "sleeper_berth",
            DutyStatus::Driving => "driving",
            DutyStatus::OnDuty => "on_duty",
        }
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a stop along the trip.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum StopKind {
    /// Trip origin with the pre-trip inspection.
    #[serde(rename = "start")]
    Start,

    /// Loading at the pickup location.
    #[serde(rename = "pickup")]
    Pickup,

    /// Unloading at the dropoff location.
    #[serde(rename = "dropoff")]
    Dropoff,

    /// Fueling stop.
    #[serde(rename = "fuel")]
    Fuel,

    /// The 30-minute break required after 8 hours of driving.
    #[serde(rename = "break_30min")]
    Break30Min,

    /// The 10-hour rest that resets the daily counters.
    #[serde(rename = "rest_10hr")]
    Rest10Hr,

    /// The 34-hour restart that resets the cycle.
    #[serde(rename = "restart_34hr")]
    Restart34Hr,

    /// Trip end with the post-trip inspection.
    #[serde(rename = "end_post_trip")]
    EndPostTrip,
}

impl StopKind {
    /// Returns the wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            StopKind::Start => "start",
            StopKind::Pickup => "pickup",
            StopKind::Dropoff => "dropoff",
            StopKind::Fuel => "fuel",
            StopKind::Break30Min => "break_30min",
            StopKind::Rest10Hr => "rest_10hr",
            StopKind::Restart34Hr => "restart_34hr",
            StopKind::EndPostTrip => "end_post_trip",
        }
    }
}

impl fmt::Display for StopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, time-bounded event along the trip that is not continuous
/// driving.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Stop {
    /// Position of the stop in the trip, 1-based and monotonic.
    pub order: u32,

    /// What happens at this stop.
    pub kind: StopKind,

    /// Where the stop takes place.
    #[serde(flatten)]
    pub place: NamedPlace,

    /// When the driver arrives at the stop.
    #[serde(with = "time::serde::rfc3339")]
    pub arrival: OffsetDateTime,

    /// When the driver leaves the stop.
    #[serde(with = "time::serde::rfc3339")]
    pub departure: OffsetDateTime,

    /// Length of the stop in whole minutes.
    pub duration_minutes: i64,

    /// Human-readable description of the activity at the stop.
    pub activity: String,

    /// Duty status during the stop.
    pub status: DutyStatus,
}

/// A contiguous interval of trip time with a single duty status.
///
/// Activities tile the whole trip from the first event to the last with no
/// gaps; the logbook projector slices them at day boundaries.
#[derive(Clone, Debug, PartialEq)]
pub struct Activity {
    /// Duty status during the interval.
    pub status: DutyStatus,

    /// Start of the interval.
    pub start: OffsetDateTime,

    /// End of the interval.
    pub end: OffsetDateTime,

    /// Description for the daily log, empty for filler intervals.
    pub description: String,

    /// Human-readable location tag for the daily log.
    pub location: String,

    /// Miles covered during the interval; zero unless driving.
    pub miles: f64,
}

impl Activity {
    /// Returns the duration of the activity in fractional hours.
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).as_seconds_f64() / 3600.0
    }
}

/// One duty-status line of a daily ledger.  Bounds are minutes of the day in
/// the ledger's reference zone so that a day tiles exactly into 1440
/// minutes and the `24:00` end marker is representable.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// Duty status during the entry.
    pub status: DutyStatus,

    /// Minute of the day at which the entry starts.
    #[serde(
        deserialize_with = "deserialize_minute_of_day",
        serialize_with = "serialize_minute_of_day",
        rename = "start"
    )]
    pub start_minute: u16,

    /// Minute of the day at which the entry ends.
    #[serde(
        deserialize_with = "deserialize_minute_of_day",
        serialize_with = "serialize_minute_of_day",
        rename = "end"
    )]
    pub end_minute: u16,

    /// Where the driver is during the entry.
    pub location: String,

    /// Description of the activity, empty for filler intervals.
    pub activity: String,
}

/// A remark on a daily ledger: a status change worth an annotation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Remark {
    /// Minute of the day of the remark.
    #[serde(
        deserialize_with = "deserialize_minute_of_day",
        serialize_with = "serialize_minute_of_day"
    )]
    pub time: u16,

    /// Where the driver is at the time of the remark.
    pub location: String,

    /// What the remark describes.
    pub activity: String,
}

/// Hour totals of a daily ledger, one bucket per duty status.  The four
/// buckets always sum to exactly 24.00.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct LedgerHours {
    /// Hours spent off duty.
    pub off_duty: f64,

    /// Hours spent in the sleeper berth.
    pub sleeper_berth: f64,

    /// Hours spent driving.
    pub driving: f64,

    /// Hours spent on duty, not driving.
    pub on_duty: f64,
}

impl LedgerHours {
    /// Returns the sum of the four buckets.
    pub fn total(&self) -> f64 {
        self.off_duty + self.sleeper_berth + self.driving + self.on_duty
    }
}

/// One calendar day's duty-status accounting, suitable for rendering an
/// official daily log sheet.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DailyLedger {
    /// 1-based day number within the trip.
    #[serde(rename = "day")]
    pub day_number: u32,

    /// Calendar date of the ledger in the reference zone.
    #[serde(with = "iso_date")]
    pub date: Date,

    /// UTC offset of the reference zone, e.g. `-06:00`.
    pub timezone: String,

    /// Location at the start of the day.
    pub start_location: String,

    /// Location at the end of the day.
    pub end_location: String,

    /// Miles driven during this calendar day.
    pub total_miles: f64,

    /// Hour totals per duty status.
    pub hours: LedgerHours,

    /// Ordered duty-status entries tiling the day.
    pub entries: Vec<LedgerEntry>,

    /// Ordered remarks for the day.
    pub remarks: Vec<Remark>,
}

/// Serde helpers for calendar dates in `YYYY-MM-DD` form.
mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::FormatItem;
    use time::macros::format_description;
    use time::Date;

    /// The date format used on the wire.
    const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    /// Serializes a date as `YYYY-MM-DD`.
    pub(super) fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer
            .serialize_str(&date.format(FORMAT).map_err(|e| serde::ser::Error::custom(e))?)
    }

    /// Deserializes a date from `YYYY-MM-DD`.
    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Aggregate totals of a planned trip.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TripSummary {
    /// Total road distance of the trip in miles.
    pub total_distance_miles: f64,

    /// Total driving time of the trip in hours.
    pub total_driving_hours: f64,

    /// Number of calendar days the trip touches.
    pub total_days: u32,

    /// Cycle hours already accrued when the trip starts.
    pub cycle_hours_used: f64,

    /// Cycle hours left when the trip ends.
    pub cycle_hours_remaining: f64,

    /// Number of stops emitted, per kind.
    pub stop_counts: BTreeMap<StopKind, u32>,

    /// When the trip starts.
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,

    /// When the trip ends.
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

/// The routed path of the whole trip.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoutePlan {
    /// Encoded polyline of the full start-to-dropoff path.
    pub polyline: String,

    /// The two legs of the trip: start to pickup and pickup to dropoff.
    pub segments: Vec<RouteSegment>,
}

/// A fully planned trip, as persisted and as returned by the API.
///
/// Trips are materialized by a single calculation and are never partially
/// updated; re-running a calculation produces a new trip.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Trip {
    /// Unique identifier of the trip.
    #[serde(rename = "trip_id")]
    pub id: TripId,

    /// The driver's current address, as supplied by the caller.
    pub current_location: String,

    /// The pickup address, as supplied by the caller.
    pub pickup_location: String,

    /// The dropoff address, as supplied by the caller.
    pub dropoff_location: String,

    /// Geocoded place for the current address.
    pub current_place: NamedPlace,

    /// Geocoded place for the pickup address.
    pub pickup_place: NamedPlace,

    /// Geocoded place for the dropoff address.
    pub dropoff_place: NamedPlace,

    /// Cycle hours already accrued when the trip starts.
    pub current_cycle_hours: CycleHours,

    /// The routed path.
    pub route: RoutePlan,

    /// Ordered stops along the trip.
    pub stops: Vec<Stop>,

    /// Per-calendar-day duty-status ledgers.
    pub daily_logs: Vec<DailyLedger>,

    /// Aggregate totals.
    pub summary: TripSummary,

    /// When the trip was computed.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The truncated view of a trip used in listings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TripOverview {
    /// Unique identifier of the trip.
    pub id: TripId,

    /// The driver's current address, as supplied by the caller.
    pub current_location: String,

    /// The pickup address, as supplied by the caller.
    pub pickup_location: String,

    /// The dropoff address, as supplied by the caller.
    pub dropoff_location: String,

    /// Total road distance of the trip in miles.
    pub total_distance_miles: f64,

    /// Total driving time of the trip in hours.
    pub total_driving_hours: f64,

    /// Number of calendar days the trip touches.
    pub total_days: u32,

    /// When the trip was computed.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
