// libs/availability-cell/src/services/schedule.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::{StoreClient, StoreError};

use crate::models::{
    default_weekly_schedule, AvailabilityError, BookedAppointment, DailyAvailability,
    DoctorAvailability, TimeSlot, WeeklySchedule,
};
use crate::slots::{apply_bookings, generate_slots};

pub struct ScheduleService {
    store: StoreClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// Fetch a provider's availability document, if one exists yet.
    pub async fn get_availability(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorAvailability>, AvailabilityError> {
        debug!("Fetching availability for doctor: {}", doctor_id);

        let path = format!("/rest/v1/availability?doctor_id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;

        let Some(doc) = result.into_iter().next() else {
            return Ok(None);
        };

        let availability: DoctorAvailability = serde_json::from_value(doc)
            .map_err(|e| AvailabilityError::Store(format!("failed to parse availability: {}", e)))?;

        Ok(Some(availability))
    }

    /// Replace a provider's recurring weekly pattern, creating the document
    /// with defaults when the provider has none yet.
    pub async fn upsert_weekly_schedule(
        &self,
        doctor_id: Uuid,
        weekly_schedule: Vec<WeeklySchedule>,
        auth_token: &str,
    ) -> Result<DoctorAvailability, AvailabilityError> {
        debug!("Updating weekly schedule for doctor: {}", doctor_id);

        validate_weekly_schedule(&weekly_schedule)?;

        let existing = self.get_availability(doctor_id, auth_token).await?;

        let result: Vec<Value> = match existing {
            Some(current) => {
                let path = format!("/rest/v1/availability?id=eq.{}", current.id);
                let update = json!({
                    "weekly_schedule": weekly_schedule,
                    "updated_at": Utc::now().to_rfc3339()
                });
                self.store
                    .update_returning(&path, Some(auth_token), update)
                    .await
                    .map_err(map_store_error)?
            }
            None => {
                let now = Utc::now().to_rfc3339();
                let document = json!({
                    "doctor_id": doctor_id,
                    "weekly_schedule": weekly_schedule,
                    "custom_dates": [],
                    "created_at": now,
                    "updated_at": now
                });
                self.store
                    .insert_returning("/rest/v1/availability", Some(auth_token), document)
                    .await
                    .map_err(map_store_error)?
            }
        };

        parse_single(result)
    }

    /// Set or replace the override for one date. Replaces any previous
    /// override for the same date.
    pub async fn set_custom_date(
        &self,
        doctor_id: Uuid,
        override_day: DailyAvailability,
        auth_token: &str,
    ) -> Result<DoctorAvailability, AvailabilityError> {
        debug!(
            "Setting custom date {} for doctor {}",
            override_day.date, doctor_id
        );

        validate_override(&override_day)?;

        let current = self
            .get_or_create_availability(doctor_id, auth_token)
            .await?;

        let mut custom_dates: Vec<DailyAvailability> = current
            .custom_dates
            .into_iter()
            .filter(|c| c.date != override_day.date)
            .collect();
        custom_dates.push(override_day);
        custom_dates.sort_by_key(|c| c.date);

        self.write_custom_dates(current.id, custom_dates, auth_token)
            .await
    }

    /// Drop the override for one date, restoring the weekly schedule there.
    pub async fn remove_custom_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DoctorAvailability, AvailabilityError> {
        debug!("Removing custom date {} for doctor {}", date, doctor_id);

        let current = self
            .get_availability(doctor_id, auth_token)
            .await?
            .ok_or(AvailabilityError::NotFound)?;

        let custom_dates: Vec<DailyAvailability> = current
            .custom_dates
            .into_iter()
            .filter(|c| c.date != date)
            .collect();

        self.write_custom_dates(current.id, custom_dates, auth_token)
            .await
    }

    /// Candidate slots for (doctor, date) with booked counts applied. The
    /// appointment read is fresh on every call; this is the listing the UI
    /// re-fetches after any availability rejection.
    pub async fn get_time_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, AvailabilityError> {
        debug!("Resolving slots for doctor {} on {}", doctor_id, date);

        let Some(availability) = self.get_availability(doctor_id, auth_token).await? else {
            debug!("Doctor {} has no availability document", doctor_id);
            return Ok(Vec::new());
        };

        let slots = generate_slots(date, &availability.weekly_schedule, &availability.custom_dates);
        if slots.is_empty() {
            return Ok(slots);
        }

        let booked_times = self
            .get_booked_times(doctor_id, date, auth_token)
            .await?;

        Ok(apply_bookings(slots, &booked_times))
    }

    /// Booked start times for (doctor, date), counting only appointments
    /// that hold capacity (pending or confirmed). Legacy documents spell
    /// pending as `scheduled` and hold capacity all the same.
    pub async fn get_booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<chrono::NaiveTime>, AvailabilityError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&status=in.(pending,scheduled,confirmed)&select=time",
            doctor_id, date
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;

        let booked: Vec<BookedAppointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedAppointment>, _>>()
            .map_err(|e| AvailabilityError::Store(format!("failed to parse appointments: {}", e)))?;

        Ok(booked.into_iter().map(|b| b.time).collect())
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn get_or_create_availability(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorAvailability, AvailabilityError> {
        if let Some(existing) = self.get_availability(doctor_id, auth_token).await? {
            return Ok(existing);
        }

        warn!(
            "No availability document for doctor {}, creating with default schedule",
            doctor_id
        );

        let now = Utc::now().to_rfc3339();
        let document = json!({
            "doctor_id": doctor_id,
            "weekly_schedule": default_weekly_schedule(),
            "custom_dates": [],
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self
            .store
            .insert_returning("/rest/v1/availability", Some(auth_token), document)
            .await
            .map_err(map_store_error)?;

        parse_single(result)
    }

    async fn write_custom_dates(
        &self,
        availability_id: Uuid,
        custom_dates: Vec<DailyAvailability>,
        auth_token: &str,
    ) -> Result<DoctorAvailability, AvailabilityError> {
        let path = format!("/rest/v1/availability?id=eq.{}", availability_id);
        let update = json!({
            "custom_dates": custom_dates,
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .store
            .update_returning(&path, Some(auth_token), update)
            .await
            .map_err(map_store_error)?;

        parse_single(result)
    }
}

fn parse_single(result: Vec<Value>) -> Result<DoctorAvailability, AvailabilityError> {
    let doc = result
        .into_iter()
        .next()
        .ok_or_else(|| AvailabilityError::Store("store returned no document".to_string()))?;

    serde_json::from_value(doc)
        .map_err(|e| AvailabilityError::Store(format!("failed to parse availability: {}", e)))
}

fn map_store_error(err: StoreError) -> AvailabilityError {
    AvailabilityError::Store(err.to_string())
}

fn validate_weekly_schedule(entries: &[WeeklySchedule]) -> Result<(), AvailabilityError> {
    for entry in entries {
        if entry.max_appointments == 0 {
            return Err(AvailabilityError::Validation(format!(
                "{}: max_appointments must be at least 1",
                entry.day
            )));
        }
        if entry.is_available && entry.start_time >= entry.end_time {
            return Err(AvailabilityError::Validation(format!(
                "{}: start_time must be before end_time",
                entry.day
            )));
        }
        if let Some(break_time) = &entry.break_time {
            if break_time.start >= break_time.end
                || break_time.start < entry.start_time
                || break_time.end > entry.end_time
            {
                return Err(AvailabilityError::Validation(format!(
                    "{}: break window must lie within the working day",
                    entry.day
                )));
            }
        }
    }

    for (i, entry) in entries.iter().enumerate() {
        if entries[..i].iter().any(|other| other.day == entry.day) {
            return Err(AvailabilityError::Validation(format!(
                "duplicate schedule entry for {}",
                entry.day
            )));
        }
    }

    Ok(())
}

fn validate_override(override_day: &DailyAvailability) -> Result<(), AvailabilityError> {
    if let Some(slot) = override_day
        .time_slots
        .iter()
        .find(|s| s.max_appointments == Some(0))
    {
        return Err(AvailabilityError::Validation(format!(
            "{} {}: max_appointments must be at least 1",
            override_day.date,
            slot.time.format("%H:%M")
        )));
    }

    for (i, slot) in override_day.time_slots.iter().enumerate() {
        if override_day.time_slots[..i]
            .iter()
            .any(|other| other.time == slot.time)
        {
            return Err(AvailabilityError::Validation(format!(
                "duplicate override slot at {}",
                slot.time.format("%H:%M")
            )));
        }
    }

    Ok(())
}
