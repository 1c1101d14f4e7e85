// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::services::schedule::ScheduleService;
use availability_cell::slots::{generate_slots, remaining_capacity};
use shared_config::AppConfig;
use shared_database::store::{StoreClient, StoreError};
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest,
};
use crate::services::lifecycle::LifecycleService;
use crate::services::stats::StatsService;

pub struct BookingService {
    store: StoreClient,
    schedule: ScheduleService,
    lifecycle: LifecycleService,
    stats: StatsService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let store = StoreClient::new(config);
        Self {
            schedule: ScheduleService::new(config),
            lifecycle: LifecycleService::new(),
            stats: StatsService::new(store.clone()),
            store,
        }
    }

    /// Optimistic slot validation against a fresh read of the schedule and
    /// the day's bookings. A race between two bookings for the last opening
    /// can still slip through; the doctor resolves it by rejecting one.
    pub async fn validate_slot(
        &self,
        doctor_id: Uuid,
        date: chrono::NaiveDate,
        time: chrono::NaiveTime,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let Some(availability) = self
            .schedule
            .get_availability(doctor_id, auth_token)
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?
        else {
            return Err(AppointmentError::OutsideAvailability);
        };

        let slots = generate_slots(date, &availability.weekly_schedule, &availability.custom_dates);
        let Some(slot) = slots.iter().find(|s| s.time == time && s.available) else {
            return Err(AppointmentError::OutsideAvailability);
        };

        let booked = self
            .schedule
            .get_booked_times(doctor_id, date, auth_token)
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        if remaining_capacity(slot, &booked) == 0 {
            debug!(
                "Slot {} on {} for doctor {} is at capacity",
                time.format("%H:%M"),
                date,
                doctor_id
            );
            return Err(AppointmentError::SlotFull);
        }

        Ok(())
    }

    /// Create a pending appointment after validating the requested slot.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if actor.id != request.patient_id.to_string() && !actor.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }
        if request.patient_name.trim().is_empty() || request.doctor_name.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "patient and doctor names are required".to_string(),
            ));
        }

        self.validate_slot(request.doctor_id, request.date, request.time, auth_token)
            .await?;

        let now = Utc::now().to_rfc3339();
        let document = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "patient_name": request.patient_name,
            "doctor_name": request.doctor_name,
            "date": request.date,
            "time": request.time.format("%H:%M").to_string(),
            "status": AppointmentStatus::Pending,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now,
        });

        let created: Vec<Appointment> = self
            .store
            .insert_returning("/rest/v1/appointments", Some(auth_token), document)
            .await
            .map_err(map_store_error)?;

        let appointment = created.into_iter().next().ok_or_else(|| {
            AppointmentError::Store("store returned no rows for created appointment".to_string())
        })?;

        info!(
            "Booked appointment {} for patient {} with doctor {} on {} at {}",
            appointment.id,
            appointment.patient_id,
            appointment.doctor_id,
            appointment.date,
            appointment.time.format("%H:%M")
        );

        self.stats.record_appointment_created(auth_token);

        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Filtered listing, ordered by date then time.
    pub async fn search_appointments(
        &self,
        query: &AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut params = vec!["order=date.asc,time.asc".to_string()];

        if let Some(patient_id) = query.patient_id {
            params.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            params.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = query.status {
            // Legacy documents spell pending as `scheduled`; match both.
            if status == AppointmentStatus::Pending {
                params.push("status=in.(pending,scheduled)".to_string());
            } else {
                params.push(format!("status=eq.{}", status));
            }
        }
        if let Some(from) = query.from_date {
            params.push(format!("date=gte.{}", from));
        }
        if let Some(to) = query.to_date {
            params.push(format!("date=lte.{}", to));
        }
        if let Some(limit) = query.limit {
            params.push(format!("limit={}", limit));
        }
        if let Some(offset) = query.offset {
            params.push(format!("offset={}", offset));
        }

        let path = format!("/rest/v1/appointments?{}", params.join("&"));
        self.store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)
    }

    /// Apply a status transition after the lifecycle rules approve it.
    ///
    /// Confirmation re-checks the doctor's current schedule: a slot removed
    /// since booking turns the confirm into an availability rejection.
    pub async fn transition_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        self.lifecycle
            .validate_transition(&appointment, new_status, actor)?;

        if new_status == AppointmentStatus::Confirmed {
            self.recheck_availability(&appointment, auth_token).await?;
        }

        let mut patch = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339(),
            "last_modified_by": actor.id,
        });
        if new_status == AppointmentStatus::Completed {
            patch["completed_at"] = json!(Utc::now().to_rfc3339());
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Appointment> = self
            .store
            .update_returning(&path, Some(auth_token), patch)
            .await
            .map_err(map_store_error)?;

        let updated = updated.into_iter().next().ok_or(AppointmentError::NotFound)?;

        info!(
            "Appointment {} moved {} -> {} by {}",
            appointment_id, appointment.status, new_status, actor.id
        );

        if new_status == AppointmentStatus::Completed {
            self.stats.record_analysis_completed(auth_token);
        } else {
            self.stats
                .notify_status_change(&updated, new_status, &actor.id, auth_token);
        }

        Ok(updated)
    }

    /// Link a diagnostic analysis to an active appointment. Completion
    /// requires this to have happened first.
    pub async fn attach_analysis(
        &self,
        appointment_id: Uuid,
        analysis_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if !appointment.status.holds_capacity() {
            return Err(AppointmentError::Validation(format!(
                "cannot attach analysis to a {} appointment",
                appointment.status
            )));
        }
        let is_assigned_doctor =
            actor.is_doctor() && actor.id == appointment.doctor_id.to_string();
        if !is_assigned_doctor && !actor.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        let analysis_path = format!("/rest/v1/analyses?id=eq.{}&select=id", analysis_id);
        let found: Vec<Value> = self
            .store
            .request(Method::GET, &analysis_path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;
        if found.is_empty() {
            warn!(
                "Analysis {} not found while attaching to appointment {}",
                analysis_id, appointment_id
            );
            return Err(AppointmentError::AnalysisNotFound);
        }

        let patch = json!({
            "attached_analysis_id": analysis_id,
            "updated_at": Utc::now().to_rfc3339(),
            "last_modified_by": actor.id,
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Appointment> = self
            .store
            .update_returning(&path, Some(auth_token), patch)
            .await
            .map_err(map_store_error)?;

        updated.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Hard delete, admin only. Regular flows cancel instead.
    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        if !actor.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let deleted: Vec<Value> = self
            .store
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(map_store_error)?;

        if deleted.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted by {}", appointment_id, actor.id);
        Ok(())
    }

    async fn recheck_availability(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let Some(availability) = self
            .schedule
            .get_availability(appointment.doctor_id, auth_token)
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?
        else {
            return Err(AppointmentError::OutsideAvailability);
        };

        let slots = generate_slots(
            appointment.date,
            &availability.weekly_schedule,
            &availability.custom_dates,
        );
        let still_open = slots
            .iter()
            .any(|s| s.time == appointment.time && s.available);
        if !still_open {
            warn!(
                "Confirm refused: doctor {} no longer offers {} on {}",
                appointment.doctor_id,
                appointment.time.format("%H:%M"),
                appointment.date
            );
            return Err(AppointmentError::OutsideAvailability);
        }

        Ok(())
    }
}

fn map_store_error(err: StoreError) -> AppointmentError {
    match err {
        StoreError::NotFound(_) => AppointmentError::NotFound,
        other => AppointmentError::Store(other.to_string()),
    }
}
