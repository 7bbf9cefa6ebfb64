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

//! The hours-of-service scheduler.
//!
//! This is a deterministic state machine that consumes a two-segment routed
//! trip plan and emits the stops and duty-status activities of a compliant
//! schedule.  Four limits are enforced simultaneously against the driving
//! workload: the 11-hour driving limit, the 14-hour on-duty window, the
//! 8-hour cumulative-driving-before-break limit, and the 70-hour cycle.
//!
//! The scheduler is pure: given identical inputs and identical locator
//! responses it produces identical output.  It performs no I/O and cannot
//! fail after its inputs have been validated; in the worst case it emits
//! many rest stops.

use crate::geo::{polyline, RestStopLocator};
use crate::model::{
    round2, Activity, Coordinate, CycleHours, DutyStatus, NamedPlace, RouteSegment, Stop,
    StopKind, TripSummary,
};
use crate::rules::HosRules;
use std::collections::BTreeMap;
use time::{Duration, OffsetDateTime};

/// Slack under which an hour quantity counts as exhausted.  Guards the
/// driving loop against floating-point residue.
const EPS_HOURS: f64 = 1e-6;

/// Slack for mileage comparisons against the fuel interval.
const EPS_MILES: f64 = 1e-6;

/// A routed trip ready for scheduling.
#[derive(Clone, Debug)]
pub struct TripPlan {
    /// Wall-clock time at which the driver starts.
    pub start_time: OffsetDateTime,

    /// Where the driver currently is.
    pub start_place: NamedPlace,

    /// Where the load is picked up.
    pub pickup_place: NamedPlace,

    /// Where the load is dropped off.
    pub dropoff_place: NamedPlace,

    /// Routed leg from the start to the pickup.
    pub seg_to_pickup: RouteSegment,

    /// Routed leg from the pickup to the dropoff.
    pub seg_to_dropoff: RouteSegment,

    /// Cycle hours already accrued when the trip starts.
    pub opening_cycle_hours: CycleHours,
}

/// The scheduler's output: stops, the activity tiling, and totals.
#[derive(Clone, Debug)]
pub struct Schedule {
    /// Ordered stops along the trip.
    pub stops: Vec<Stop>,

    /// Ordered activities tiling the trip from first event to last.
    pub activities: Vec<Activity>,

    /// Aggregate totals.
    pub summary: TripSummary,
}

/// Which limit forced a 10-hour rest.
#[derive(Clone, Copy, Debug, PartialEq)]
enum RestCause {
    /// The 11-hour driving limit was reached.
    DrivingLimit,

    /// The 14-hour on-duty window was exhausted.
    WindowLimit,
}

/// Converts fractional hours into a time span.
fn hours(value: f64) -> Duration {
    Duration::seconds_f64(value * 3600.0)
}

/// Mutable scheduling state.  All counters are updated together by the
/// transition helpers below.
struct Scheduler<'a> {
    /// The policy in force.
    rules: &'a HosRules,

    /// Collaborator that names rest and fuel stops.
    locator: &'a dyn RestStopLocator,

    /// Wall-clock cursor.
    now: OffsetDateTime,

    /// Hours of driving accumulated since the last 10-hour reset.
    drive_today: f64,

    /// When the current on-duty window began; `None` while fully off duty.
    window_start: Option<OffsetDateTime>,

    /// Hours of driving since the last qualifying break.
    drive_since_break: f64,

    /// Hours counted against the rolling cycle.
    cycle_used: f64,

    /// Miles driven since the last fuel stop.
    miles_since_fuel: f64,

    /// Where the driver currently is.
    position: NamedPlace,

    /// Stops emitted so far.
    stops: Vec<Stop>,

    /// Activities emitted so far.
    activities: Vec<Activity>,
}

impl<'a> Scheduler<'a> {
    /// Creates the initial state for `plan`.
    fn new(rules: &'a HosRules, locator: &'a dyn RestStopLocator, plan: &TripPlan) -> Self {
        Self {
            rules,
            locator,
            now: plan.start_time,
            drive_today: 0.0,
            window_start: None,
            drive_since_break: 0.0,
            cycle_used: plan.opening_cycle_hours.as_f64(),
            miles_since_fuel: 0.0,
            position: plan.start_place.clone(),
            stops: vec![],
            activities: vec![],
        }
    }

    /// Hours elapsed in the current on-duty window.
    fn window_elapsed(&self) -> f64 {
        match self.window_start {
            Some(start) => (self.now - start).as_seconds_f64() / 3600.0,
            None => 0.0,
        }
    }

    /// Appends a stop of `kind` at `place` lasting `duration_hours`.
    fn push_stop(
        &mut self,
        kind: StopKind,
        place: &NamedPlace,
        duration_hours: f64,
        activity: &str,
        status: DutyStatus,
    ) {
        let arrival = self.now;
        let departure = arrival + hours(duration_hours);
        self.stops.push(Stop {
            order: u32::try_from(self.stops.len() + 1).expect("Stop counts are tiny"),
            kind,
            place: place.clone(),
            arrival,
            departure,
            duration_minutes: (duration_hours * 60.0).round_ties_even() as i64,
            activity: activity.to_owned(),
            status,
        });
        self.activities.push(Activity {
            status,
            start: arrival,
            end: departure,
            description: activity.to_owned(),
            location: place.name.clone(),
            miles: 0.0,
        });
    }

    /// Performs an on-duty service stop: inspection, loading, fueling, or a
    /// break.  Opens the on-duty window if it is closed and accrues cycle
    /// time.
    fn on_duty_stop(
        &mut self,
        kind: StopKind,
        place: NamedPlace,
        duration_hours: f64,
        activity: &str,
    ) {
        if self.window_start.is_none() {
            self.window_start = Some(self.now);
        }
        self.push_stop(kind, &place, duration_hours, activity, DutyStatus::OnDuty);
        self.accrue_cycle(duration_hours);
        self.now += hours(duration_hours);
        self.position = place;
    }

    /// Adds on-duty time to the cycle, saturating at the limit so the next
    /// driving attempt forces the restart.
    fn accrue_cycle(&mut self, duration_hours: f64) {
        self.cycle_used = (self.cycle_used + duration_hours).min(self.rules.cycle_limit);
    }

    /// Takes the 30-minute break.  Only the break counter resets; the break
    /// is on-duty time, so the window keeps running and the cycle accrues.
    fn take_break(&mut self, here: Coordinate) {
        let place = self.snap_stop(StopKind::Break30Min, here);
        self.on_duty_stop(StopKind::Break30Min, place, self.rules.break_duration, "30-minute break");
        self.drive_since_break = 0.0;
    }

    /// Takes the 10-hour rest forced by `cause`.  Resets the daily counters
    /// and closes the window; the cycle is untouched.
    fn take_rest(&mut self, here: Coordinate, cause: RestCause) {
        let activity = match cause {
            RestCause::DrivingLimit => "10-hour rest period (11-hour driving limit reached)",
            RestCause::WindowLimit => "10-hour rest period (14-hour on-duty window reached)",
        };
        let place = self.snap_stop(StopKind::Rest10Hr, here);
        self.push_stop(
            StopKind::Rest10Hr,
            &place,
            self.rules.off_duty_reset,
            activity,
            DutyStatus::OffDuty,
        );
        self.now += hours(self.rules.off_duty_reset);
        self.drive_today = 0.0;
        self.drive_since_break = 0.0;
        self.window_start = None;
        self.position = place;
    }

    /// Takes the 34-hour restart at `place`.  Resets everything including
    /// the cycle.
    fn take_restart(&mut self, place: NamedPlace) {
        self.push_stop(
            StopKind::Restart34Hr,
            &place,
            self.rules.restart_duration,
            "34-hour restart",
            DutyStatus::OffDuty,
        );
        self.now += hours(self.rules.restart_duration);
        self.cycle_used = 0.0;
        self.drive_today = 0.0;
        self.drive_since_break = 0.0;
        self.window_start = None;
        self.position = place;
    }

    /// Takes a fueling stop.
    fn take_fuel(&mut self, here: Coordinate) {
        let place = self.snap_stop(StopKind::Fuel, here);
        self.on_duty_stop(StopKind::Fuel, place, self.rules.fueling, "Fueling");
        self.miles_since_fuel = 0.0;
    }

    /// Resolves a named place for an inserted stop near `here`.  The snap is
    /// labelling only: a locator miss falls back to a synthetic placeholder
    /// and the stop still counts.
    fn snap_stop(&self, kind: StopKind, here: Coordinate) -> NamedPlace {
        self.locator.locate(here, kind).unwrap_or_else(|| NamedPlace::unnamed("Rest Area", here))
    }

    /// Drives one routed segment, inserting breaks, rests, restarts, and
    /// fuel stops as the limits demand.
    fn drive_segment(&mut self, segment: &RouteSegment, description: &str) {
        if segment.duration_hours <= EPS_HOURS {
            // Zero-length leg, e.g. the pickup is at the start position.
            return;
        }

        let total_hours = segment.duration_hours;
        let speed = segment.distance_miles / total_hours;
        let path = segment.polyline.as_deref().and_then(polyline::decode);
        let location = format!("En route to {}", segment.destination.name);

        let mut hours_remaining = total_hours;
        while hours_remaining > EPS_HOURS {
            let drive_rem = (self.rules.driving_limit - self.drive_today).max(0.0);
            let window_rem = (self.rules.on_duty_window - self.window_elapsed()).max(0.0);
            let break_rem = (self.rules.break_after - self.drive_since_break).max(0.0);
            let cycle_rem = (self.rules.cycle_limit - self.cycle_used).max(0.0);
            let mut available = drive_rem.min(window_rem).min(break_rem).min(cycle_rem);

            let here = self.segment_coordinate(segment, &path, total_hours, hours_remaining);

            if available <= EPS_HOURS {
                // A limit binds; resolve in strict priority order.
                if cycle_rem <= EPS_HOURS {
                    let place = self.snap_stop(StopKind::Restart34Hr, here);
                    self.take_restart(place);
                } else if drive_rem <= EPS_HOURS || window_rem <= EPS_HOURS {
                    // When both run out at the same instant the window is
                    // the recorded cause.
                    let cause = if window_rem <= drive_rem {
                        RestCause::WindowLimit
                    } else {
                        RestCause::DrivingLimit
                    };
                    self.take_rest(here, cause);
                } else {
                    self.take_break(here);
                }
                continue;
            }

            // Fuel before driving when the interval is due and there is
            // enough room in the window to do so.
            if self.miles_since_fuel >= self.rules.fuel_interval_miles - EPS_MILES
                && available >= self.rules.fueling
            {
                self.take_fuel(here);
                available -= self.rules.fueling;
                if available <= EPS_HOURS {
                    continue;
                }
            }

            // Cap the slice so the fuel threshold is never overshot and the
            // stop count stays at one per interval crossed.
            let mut slice = available.min(hours_remaining);
            if self.miles_since_fuel < self.rules.fuel_interval_miles {
                let hours_to_fuel =
                    (self.rules.fuel_interval_miles - self.miles_since_fuel) / speed;
                if hours_to_fuel > EPS_HOURS {
                    slice = slice.min(hours_to_fuel);
                }
            }

            if self.window_start.is_none() {
                self.window_start = Some(self.now);
            }

            let miles = slice * speed;
            self.activities.push(Activity {
                status: DutyStatus::Driving,
                start: self.now,
                end: self.now + hours(slice),
                description: description.to_owned(),
                location: location.clone(),
                miles,
            });
            self.now += hours(slice);
            self.drive_today += slice;
            self.drive_since_break += slice;
            self.accrue_cycle(slice);
            self.miles_since_fuel += miles;
            hours_remaining -= slice;

            self.check_invariants();
        }

        self.position = segment.destination.clone();
    }

    /// Computes the current coordinate along `segment` given the un-driven
    /// remainder.
    fn segment_coordinate(
        &self,
        segment: &RouteSegment,
        path: &Option<Vec<Coordinate>>,
        total_hours: f64,
        hours_remaining: f64,
    ) -> Coordinate {
        let fraction = 1.0 - hours_remaining / total_hours;
        match path {
            Some(points) => polyline::point_along(points, fraction).unwrap_or_else(|| {
                segment.origin.coordinates.lerp(&segment.destination.coordinates, fraction)
            }),
            None => segment.origin.coordinates.lerp(&segment.destination.coordinates, fraction),
        }
    }

    /// Asserts the state invariants that must hold after every driving
    /// transition.
    fn check_invariants(&self) {
        debug_assert!(self.drive_today <= self.rules.driving_limit + EPS_HOURS);
        debug_assert!(self.drive_since_break <= self.rules.break_after + EPS_HOURS);
        debug_assert!((0.0..=self.rules.cycle_limit + EPS_HOURS).contains(&self.cycle_used));
        debug_assert!(self.window_elapsed() <= self.rules.on_duty_window + EPS_HOURS);
    }
}

/// Schedules `plan` under `rules`, producing the stops, the activity
/// tiling, and the trip summary.
pub fn plan_trip(rules: &HosRules, locator: &dyn RestStopLocator, plan: &TripPlan) -> Schedule {
    let mut state = Scheduler::new(rules, locator, plan);

    // A driver who is already out of cycle hours cannot even inspect the
    // vehicle; the restart happens where they are.
    if state.cycle_used >= rules.cycle_limit {
        let here = state.position.clone();
        state.take_restart(here);
    }

    state.on_duty_stop(
        StopKind::Start,
        plan.start_place.clone(),
        rules.pre_trip,
        "Pre-trip inspection",
    );
    state.drive_segment(&plan.seg_to_pickup, "Driving to pickup");
    state.on_duty_stop(StopKind::Pickup, plan.pickup_place.clone(), rules.pickup, "Loading");
    state.drive_segment(&plan.seg_to_dropoff, "Driving to dropoff");
    state.on_duty_stop(StopKind::Dropoff, plan.dropoff_place.clone(), rules.dropoff, "Unloading");
    state.on_duty_stop(
        StopKind::EndPostTrip,
        plan.dropoff_place.clone(),
        rules.post_trip,
        "Post-trip inspection",
    );

    let mut stop_counts = BTreeMap::new();
    for stop in &state.stops {
        *stop_counts.entry(stop.kind).or_insert(0u32) += 1;
    }

    let reference = plan.start_time.offset();
    let start_day = plan.start_time.to_offset(reference).date().to_julian_day();
    let end_day = state.now.to_offset(reference).date().to_julian_day();
    let total_days = u32::try_from(end_day - start_day + 1).expect("Trips move forward in time");

    let summary = TripSummary {
        total_distance_miles: round2(
            plan.seg_to_pickup.distance_miles + plan.seg_to_dropoff.distance_miles,
        ),
        total_driving_hours: round2(
            plan.seg_to_pickup.duration_hours + plan.seg_to_dropoff.duration_hours,
        ),
        total_days,
        cycle_hours_used: round2(plan.opening_cycle_hours.as_f64()),
        cycle_hours_remaining: round2(rules.cycle_limit - state.cycle_used),
        stop_counts,
        start_time: plan.start_time,
        end_time: state.now,
    };

    Schedule { stops: state.stops, activities: state.activities, summary }
}
