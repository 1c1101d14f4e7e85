// libs/appointment-cell/src/services/lifecycle.rs
//
// Pure status state machine. No store access: callers load the appointment,
// ask this service whether the transition is legal for the acting user, and
// persist the result themselves.
use tracing::warn;

use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

pub struct LifecycleService;

impl LifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Statuses reachable from `status` in one step. Terminal states return
    /// an empty list.
    pub fn valid_transitions(&self, status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Rejected,
            ],
            AppointmentStatus::Confirmed => {
                vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Cancelled
            | AppointmentStatus::Rejected
            | AppointmentStatus::Completed => Vec::new(),
        }
    }

    /// Validate that `actor` may move `appointment` to `new_status`.
    ///
    /// Checks run in order: edge legality, actor permission, then the
    /// completion precondition (an analysis must already be attached).
    pub fn validate_transition(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        actor: &User,
    ) -> Result<(), AppointmentError> {
        let current = appointment.status;

        if !self.valid_transitions(current).contains(&new_status) {
            warn!(
                "Rejected transition {} -> {} for appointment {}",
                current, new_status, appointment.id
            );
            return Err(AppointmentError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }

        if !self.actor_may_transition(appointment, new_status, actor) {
            return Err(AppointmentError::Unauthorized);
        }

        if new_status == AppointmentStatus::Completed && appointment.attached_analysis_id.is_none()
        {
            return Err(AppointmentError::MissingAnalysis);
        }

        Ok(())
    }

    fn actor_may_transition(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        actor: &User,
    ) -> bool {
        let is_assigned_doctor =
            actor.is_doctor() && actor.id == appointment.doctor_id.to_string();
        let is_booking_patient =
            actor.is_patient() && actor.id == appointment.patient_id.to_string();

        match new_status {
            AppointmentStatus::Confirmed | AppointmentStatus::Rejected => {
                is_assigned_doctor || actor.is_admin()
            }
            AppointmentStatus::Cancelled => {
                is_assigned_doctor || is_booking_patient || actor.is_admin()
            }
            // Only the doctor who held the appointment can complete it.
            AppointmentStatus::Completed => is_assigned_doctor,
            AppointmentStatus::Pending => false,
        }
    }
}

impl Default for LifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
