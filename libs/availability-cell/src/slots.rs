// libs/availability-cell/src/slots.rs
//
// Pure slot resolution: no store access, no clock reads. Identical inputs
// always yield identical, ascending-ordered output.
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::models::{DailyAvailability, DayOfWeek, TimeSlot, WeeklySchedule};

pub const SLOT_INTERVAL_MINUTES: i64 = 30;

/// Resolve the candidate slots for a date.
///
/// A custom-date override for `date` replaces the weekly schedule entirely:
/// its slots are returned verbatim, sorted by time. Otherwise slots are
/// walked from the weekday's `start_time` to `end_time` in fixed 30-minute
/// increments over a half-open interval (the last slot starts strictly
/// before `end_time`), skipping starts that fall inside the break window.
/// A closed or missing weekday yields an empty list, not an error.
pub fn generate_slots(
    date: NaiveDate,
    weekly_schedule: &[WeeklySchedule],
    custom_dates: &[DailyAvailability],
) -> Vec<TimeSlot> {
    if let Some(override_day) = custom_dates.iter().find(|c| c.date == date) {
        let mut slots: Vec<TimeSlot> = override_day
            .time_slots
            .iter()
            .map(|slot| TimeSlot {
                time: slot.time,
                available: slot.available,
                max_appointments: slot.max_appointments.unwrap_or(1),
            })
            .collect();
        slots.sort_by_key(|slot| slot.time);
        return slots;
    }

    let day = DayOfWeek::from(date.weekday());
    let Some(schedule) = weekly_schedule.iter().find(|s| s.day == day) else {
        return Vec::new();
    };
    if !schedule.is_available {
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut current = schedule.start_time;

    while current < schedule.end_time {
        if !in_break(current, schedule) {
            slots.push(TimeSlot {
                time: current,
                available: true,
                max_appointments: schedule.max_appointments,
            });
        }

        let (next, wrapped) =
            current.overflowing_add_signed(Duration::minutes(SLOT_INTERVAL_MINUTES));
        if wrapped != 0 {
            // Stepped past midnight; the day is over.
            break;
        }
        current = next;
    }

    slots
}

/// Overlay booked start times onto generated slots: a slot whose capacity
/// is exhausted is marked unavailable but kept in the list so the UI can
/// render it greyed out.
pub fn apply_bookings(slots: Vec<TimeSlot>, booked_times: &[NaiveTime]) -> Vec<TimeSlot> {
    slots
        .into_iter()
        .map(|mut slot| {
            let taken = booked_times.iter().filter(|t| **t == slot.time).count() as u32;
            if taken >= slot.max_appointments {
                slot.available = false;
            }
            slot
        })
        .collect()
}

/// Remaining capacity of one slot given the booked start times for the day.
pub fn remaining_capacity(slot: &TimeSlot, booked_times: &[NaiveTime]) -> u32 {
    let taken = booked_times.iter().filter(|t| **t == slot.time).count() as u32;
    slot.max_appointments.saturating_sub(taken)
}

fn in_break(time: NaiveTime, schedule: &WeeklySchedule) -> bool {
    schedule
        .break_time
        .as_ref()
        .map(|b| time >= b.start && time < b.end)
        .unwrap_or(false)
}
