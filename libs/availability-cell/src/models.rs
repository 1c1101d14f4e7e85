// libs/availability-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wall-clock times travel over the wire as `HH:MM` strings (the store may
/// echo `HH:MM:SS`, which is accepted on the way back in).
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        };
        write!(f, "{}", name)
    }
}

/// Sub-interval of a working day excluded from generated slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

/// Recurring availability pattern for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub day: DayOfWeek,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub max_appointments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_time: Option<BreakWindow>,
}

/// One explicit slot inside a custom-date override. A missing capacity
/// means one booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideSlot {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_appointments: Option<u32>,
}

/// Date-specific availability that entirely replaces the weekly schedule
/// for that date. Override semantics, not merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAvailability {
    pub date: NaiveDate,
    pub time_slots: Vec<OverrideSlot>,
}

/// Store document: one per provider, collection `availability`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub weekly_schedule: Vec<WeeklySchedule>,
    #[serde(default)]
    pub custom_dates: Vec<DailyAvailability>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bookable (time, capacity) pair produced by the slot generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub available: bool,
    pub max_appointments: u32,
}

/// Minimal projection of a booked appointment, read locally when listing
/// slots (only the start time matters for capacity).
#[derive(Debug, Clone, Deserialize)]
pub struct BookedAppointment {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWeeklyScheduleRequest {
    pub weekly_schedule: Vec<WeeklySchedule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("No availability found for this doctor")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document store error: {0}")]
    Store(String),
}

/// Mon-Fri 09:00-17:00 open, weekend closed. Used when a provider's
/// document is created before they have edited anything.
pub fn default_weekly_schedule() -> Vec<WeeklySchedule> {
    let workday = |day| WeeklySchedule {
        day,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        is_available: true,
        max_appointments: 1,
        break_time: None,
    };
    let weekend = |day| WeeklySchedule {
        day,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        is_available: false,
        max_appointments: 1,
        break_time: None,
    };

    vec![
        workday(DayOfWeek::Monday),
        workday(DayOfWeek::Tuesday),
        workday(DayOfWeek::Wednesday),
        workday(DayOfWeek::Thursday),
        workday(DayOfWeek::Friday),
        weekend(DayOfWeek::Saturday),
        weekend(DayOfWeek::Sunday),
    ]
}
