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

//! The hours-of-service policy table.
//!
//! These values encode the FMCSA rules for property-carrying drivers under
//! the 70-hour/8-day cycle, plus the fixed durations this planner assigns to
//! non-driving activities.  They are deliberately a single immutable record:
//! nothing in the scheduler hardcodes a limit.

/// Immutable hours-of-service policy.
#[derive(Clone, Copy, Debug)]
pub struct HosRules {
    /// Maximum hours of driving per duty period.
    pub driving_limit: f64,

    /// Maximum elapsed on-duty window, in hours, from the first on-duty
    /// event after a reset.
    pub on_duty_window: f64,

    /// Cumulative driving hours after which a break is required.
    pub break_after: f64,

    /// Duration of the required break, in hours.
    pub break_duration: f64,

    /// Consecutive off-duty hours that reset the daily counters.
    pub off_duty_reset: f64,

    /// Maximum on-duty hours within the rolling cycle.
    pub cycle_limit: f64,

    /// Length of the rolling cycle, in days.
    pub cycle_days: u32,

    /// Consecutive off-duty hours that reset the cycle to zero.
    pub restart_duration: f64,

    /// Miles between fuel stops.
    pub fuel_interval_miles: f64,

    /// Duration of the pre-trip inspection, in hours.
    pub pre_trip: f64,

    /// Duration of the post-trip inspection, in hours.
    pub post_trip: f64,

    /// Duration of loading at the pickup, in hours.
    pub pickup: f64,

    /// Duration of unloading at the dropoff, in hours.
    pub dropoff: f64,

    /// Duration of a fueling stop, in hours.
    pub fueling: f64,
}

/// The rules for property-carrying drivers, 70-hour/8-day cycle.
pub const PROPERTY_CARRYING_70H_8D: HosRules = HosRules {
    driving_limit: 11.0,
    on_duty_window: 14.0,
    break_after: 8.0,
    break_duration: 0.5,
    off_duty_reset: 10.0,
    cycle_limit: 70.0,
    cycle_days: 8,
    restart_duration: 34.0,
    fuel_interval_miles: 1000.0,
    pre_trip: 0.5,
    post_trip: 0.5,
    pickup: 1.0,
    dropoff: 1.0,
    fueling: 0.5,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_match_fmcsa() {
        let rules = PROPERTY_CARRYING_70H_8D;
        assert_eq!(11.0, rules.driving_limit);
        assert_eq!(14.0, rules.on_duty_window);
        assert_eq!(8.0, rules.break_after);
        assert_eq!(0.5, rules.break_duration);
        assert_eq!(10.0, rules.off_duty_reset);
        assert_eq!(70.0, rules.cycle_limit);
        assert_eq!(8, rules.cycle_days);
        assert_eq!(34.0, rules.restart_duration);
        assert_eq!(1000.0, rules.fuel_interval_miles);
    }

    #[test]
    fn test_activity_durations() {
        let rules = PROPERTY_CARRYING_70H_8D;
        assert_eq!(0.5, rules.pre_trip);
        assert_eq!(0.5, rules.post_trip);
        assert_eq!(1.0, rules.pickup);
        assert_eq!(1.0, rules.dropoff);
        assert_eq!(0.5, rules.fueling);
    }
}
