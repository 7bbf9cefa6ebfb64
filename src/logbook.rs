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

//! The daily-log projector.
//!
//! Takes the scheduler's activity tiling and slices it into per-calendar-day
//! duty-status ledgers, the shape an official ELD log sheet renders.  Day
//! boundaries are midnights in a fixed reference zone; time before the first
//! activity of a day and after the last is filled with off-duty so that
//! every ledger accounts for exactly 24 hours.

use crate::model::{round2, Activity, DailyLedger, DutyStatus, LedgerEntry, LedgerHours, Remark};
use time::{Date, OffsetDateTime, Time, UtcOffset};

/// Minutes in a day.
const DAY_MINUTES: u16 = 24 * 60;

/// Renders a UTC offset as `+HH:MM` or `-HH:MM`.
fn offset_label(offset: UtcOffset) -> String {
    let (hours, minutes, _seconds) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!("{}{:02}:{:02}", sign, hours.abs(), minutes.abs())
}

/// Converts a timestamp into a minute of day `date`, rounding to the
/// nearest minute with ties to even.  Timestamps past the end of the date
/// clamp to the 24:00 marker.
fn minute_of_day(ts: OffsetDateTime, date: Date, reference: UtcOffset) -> u16 {
    let local = ts.to_offset(reference);
    if local.date() > date {
        return DAY_MINUTES;
    }
    let time = local.time();
    let seconds = f64::from(time.hour()) * 3600.0
        + f64::from(time.minute()) * 60.0
        + f64::from(time.second())
        + f64::from(time.nanosecond()) / 1e9;
    let minute = (seconds / 60.0).round_ties_even() as u16;
    minute.min(DAY_MINUTES)
}

/// Projects the activity tiling into one ledger per calendar day between the
/// first and the last event, inclusive.
///
/// `activities` must be ordered and gap-free, which is what the scheduler
/// produces.  The returned ledgers each account for exactly 24 hours.
pub fn project(activities: &[Activity], reference: UtcOffset) -> Vec<DailyLedger> {
    let Some(first) = activities.first() else {
        return vec![];
    };
    let last = activities.last().expect("Non-empty slice has a last element");

    let first_date = first.start.to_offset(reference).date();
    let last_date = last.end.to_offset(reference).date();

    let mut ledgers = vec![];
    let mut date = first_date;
    let mut day_number = 1u32;
    loop {
        ledgers.push(project_day(activities, date, day_number, reference, &last.location));
        if date >= last_date {
            break;
        }
        date = date.next_day().expect("Trip dates are nowhere near the calendar limits");
        day_number += 1;
    }
    ledgers
}

/// Builds the ledger for a single calendar day.
fn project_day(
    activities: &[Activity],
    date: Date,
    day_number: u32,
    reference: UtcOffset,
    fallback_location: &str,
) -> DailyLedger {
    let day_start = date.with_time(Time::MIDNIGHT).assume_offset(reference);
    let day_end = date
        .next_day()
        .expect("Trip dates are nowhere near the calendar limits")
        .with_time(Time::MIDNIGHT)
        .assume_offset(reference);

    let mut entries: Vec<LedgerEntry> = vec![];
    let mut remarks: Vec<Remark> = vec![];
    let mut total_miles = 0.0;

    for activity in activities {
        let overlap_start = if activity.start > day_start { activity.start } else { day_start };
        let overlap_end = if activity.end < day_end { activity.end } else { day_end };
        if overlap_end <= overlap_start {
            continue;
        }

        let start_minute = minute_of_day(overlap_start, date, reference);
        let end_minute = minute_of_day(overlap_end, date, reference);

        if activity.miles > 0.0 {
            let fraction = (overlap_end - overlap_start).as_seconds_f64()
                / (activity.end - activity.start).as_seconds_f64();
            total_miles += activity.miles * fraction;
        }

        // A remark belongs to the day the activity begins on, even when the
        // activity spills across midnight.
        if !activity.description.is_empty() && overlap_start == activity.start {
            remarks.push(Remark {
                time: start_minute,
                location: activity.location.clone(),
                activity: activity.description.clone(),
            });
        }

        if end_minute > start_minute {
            entries.push(LedgerEntry {
                status: activity.status,
                start_minute,
                end_minute,
                location: activity.location.clone(),
                activity: activity.description.clone(),
            });
        }
    }

    // Pad the day out to its full 24 hours with off-duty time.
    let lead = entries
        .first()
        .filter(|first| first.start_minute > 0)
        .map(|first| (first.start_minute, first.location.clone()));
    if let Some((end_minute, location)) = lead {
        entries.insert(
            0,
            LedgerEntry {
                status: DutyStatus::OffDuty,
                start_minute: 0,
                end_minute,
                location,
                activity: String::new(),
            },
        );
    }
    let tail = match entries.last() {
        Some(last) if last.end_minute < DAY_MINUTES => {
            Some((last.end_minute, last.location.clone()))
        }
        Some(_) => None,
        None => Some((0, fallback_location.to_owned())),
    };
    if let Some((start_minute, location)) = tail {
        entries.push(LedgerEntry {
            status: DutyStatus::OffDuty,
            start_minute,
            end_minute: DAY_MINUTES,
            location,
            activity: String::new(),
        });
    }

    // Total the three working buckets from the minute spans and let
    // off-duty absorb the remainder, so the four always sum to 24.00.
    let mut driving_minutes = 0u32;
    let mut on_duty_minutes = 0u32;
    let mut sleeper_minutes = 0u32;
    for entry in &entries {
        let span = u32::from(entry.end_minute - entry.start_minute);
        match entry.status {
            DutyStatus::Driving => driving_minutes += span,
            DutyStatus::OnDuty => on_duty_minutes += span,
            DutyStatus::SleeperBerth => sleeper_minutes += span,
            DutyStatus::OffDuty => (),
        }
    }
    let driving = round2(f64::from(driving_minutes) / 60.0);
    let on_duty = round2(f64::from(on_duty_minutes) / 60.0);
    let sleeper_berth = round2(f64::from(sleeper_minutes) / 60.0);
    let hours = LedgerHours {
        off_duty: round2(24.0 - driving - on_duty - sleeper_berth),
        sleeper_berth,
        driving,
        on_duty,
    };

    let start_location =
        entries.first().map(|e| e.location.clone()).unwrap_or_else(|| fallback_location.to_owned());
    let end_location =
        entries.last().map(|e| e.location.clone()).unwrap_or_else(|| fallback_location.to_owned());

    DailyLedger {
        day_number,
        date,
        timezone: offset_label(reference),
        start_location,
        end_location,
        total_miles: round2(total_miles),
        hours,
        entries,
        remarks,
    }
}
