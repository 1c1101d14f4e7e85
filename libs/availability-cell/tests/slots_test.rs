use chrono::{NaiveDate, NaiveTime};

use availability_cell::models::{
    BreakWindow, DailyAvailability, DayOfWeek, OverrideSlot, WeeklySchedule,
};
use availability_cell::slots::{apply_bookings, generate_slots, remaining_capacity};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// 2025-06-02 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn open_monday(start: NaiveTime, end: NaiveTime) -> WeeklySchedule {
    WeeklySchedule {
        day: DayOfWeek::Monday,
        start_time: start,
        end_time: end,
        is_available: true,
        max_appointments: 1,
        break_time: None,
    }
}

#[test]
fn full_workday_yields_sixteen_half_hour_slots() {
    let schedule = vec![open_monday(t(9, 0), t(17, 0))];
    let slots = generate_slots(monday(), &schedule, &[]);

    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0].time, t(9, 0));
    assert_eq!(slots[15].time, t(16, 30));
    assert!(slots.iter().all(|s| s.available));
}

#[test]
fn end_time_itself_is_not_a_slot() {
    let schedule = vec![open_monday(t(9, 0), t(10, 0))];
    let slots = generate_slots(monday(), &schedule, &[]);

    let times: Vec<NaiveTime> = slots.iter().map(|s| s.time).collect();
    assert_eq!(times, vec![t(9, 0), t(9, 30)]);
}

#[test]
fn break_window_removes_its_slots() {
    let mut day = open_monday(t(9, 0), t(17, 0));
    day.break_time = Some(BreakWindow {
        start: t(12, 0),
        end: t(13, 0),
    });
    let slots = generate_slots(monday(), &[day], &[]);

    assert_eq!(slots.len(), 14);
    assert!(!slots.iter().any(|s| s.time == t(12, 0)));
    assert!(!slots.iter().any(|s| s.time == t(12, 30)));
    assert!(slots.iter().any(|s| s.time == t(13, 0)));
}

#[test]
fn closed_day_yields_no_slots() {
    let mut day = open_monday(t(9, 0), t(17, 0));
    day.is_available = false;

    assert!(generate_slots(monday(), &[day], &[]).is_empty());
}

#[test]
fn missing_weekday_entry_yields_no_slots() {
    let tuesday_only = vec![WeeklySchedule {
        day: DayOfWeek::Tuesday,
        start_time: t(9, 0),
        end_time: t(17, 0),
        is_available: true,
        max_appointments: 1,
        break_time: None,
    }];

    assert!(generate_slots(monday(), &tuesday_only, &[]).is_empty());
}

#[test]
fn custom_date_override_replaces_weekly_schedule() {
    let schedule = vec![open_monday(t(9, 0), t(17, 0))];
    let overrides = vec![DailyAvailability {
        date: monday(),
        time_slots: vec![
            OverrideSlot {
                time: t(14, 0),
                available: true,
                max_appointments: None,
            },
            OverrideSlot {
                time: t(10, 0),
                available: true,
                max_appointments: Some(3),
            },
        ],
    }];

    let slots = generate_slots(monday(), &schedule, &overrides);

    // Two override slots instead of the sixteen weekly ones, sorted by time.
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].time, t(10, 0));
    assert_eq!(slots[0].max_appointments, 3);
    assert_eq!(slots[1].time, t(14, 0));
    assert_eq!(slots[1].max_appointments, 1);
}

#[test]
fn override_for_another_date_does_not_apply() {
    let schedule = vec![open_monday(t(9, 0), t(17, 0))];
    let overrides = vec![DailyAvailability {
        date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        time_slots: vec![OverrideSlot {
            time: t(10, 0),
            available: true,
            max_appointments: None,
        }],
    }];

    assert_eq!(generate_slots(monday(), &schedule, &overrides).len(), 16);
}

#[test]
fn override_keeps_closed_slots_visible() {
    let overrides = vec![DailyAvailability {
        date: monday(),
        time_slots: vec![OverrideSlot {
            time: t(10, 0),
            available: false,
            max_appointments: None,
        }],
    }];

    let slots = generate_slots(monday(), &[], &overrides);
    assert_eq!(slots.len(), 1);
    assert!(!slots[0].available);
}

#[test]
fn generation_is_deterministic() {
    let mut day = open_monday(t(8, 0), t(18, 30));
    day.break_time = Some(BreakWindow {
        start: t(12, 30),
        end: t(13, 30),
    });
    let schedule = vec![day];

    let first = generate_slots(monday(), &schedule, &[]);
    let second = generate_slots(monday(), &schedule, &[]);
    assert_eq!(first, second);

    let times: Vec<NaiveTime> = first.iter().map(|s| s.time).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);
}

#[test]
fn booked_slot_at_capacity_is_marked_unavailable_but_kept() {
    let schedule = vec![open_monday(t(9, 0), t(11, 0))];
    let slots = generate_slots(monday(), &schedule, &[]);

    let applied = apply_bookings(slots, &[t(9, 30)]);

    assert_eq!(applied.len(), 4);
    let taken = applied.iter().find(|s| s.time == t(9, 30)).unwrap();
    assert!(!taken.available);
    assert!(applied.iter().filter(|s| s.time != t(9, 30)).all(|s| s.available));
}

#[test]
fn multi_capacity_slot_stays_open_until_full() {
    let mut day = open_monday(t(9, 0), t(10, 0));
    day.max_appointments = 2;
    let slots = generate_slots(monday(), &[day], &[]);

    let one_booking = apply_bookings(slots.clone(), &[t(9, 0)]);
    assert!(one_booking[0].available);
    assert_eq!(remaining_capacity(&one_booking[0], &[t(9, 0)]), 1);

    let two_bookings = apply_bookings(slots, &[t(9, 0), t(9, 0)]);
    assert!(!two_bookings[0].available);
    assert_eq!(remaining_capacity(&two_bookings[0], &[t(9, 0), t(9, 0)]), 0);
}
