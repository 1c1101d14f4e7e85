// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use availability_cell::models::hhmm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Legacy documents carry `scheduled` for this state; it is accepted on
    /// read and never written back.
    #[serde(alias = "scheduled")]
    Pending,
    Confirmed,
    Cancelled,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Rejected | AppointmentStatus::Completed
        )
    }

    /// Whether an appointment in this state counts against slot capacity.
    pub fn holds_capacity(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

/// Store document: one per booking, collection `appointments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_analysis_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachAnalysisRequest {
    pub analysis_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Requested time is outside the doctor's availability")]
    OutsideAvailability,

    #[error("Requested time slot is fully booked")]
    SlotFull,

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment cannot be completed without an attached analysis")]
    MissingAnalysis,

    #[error("Referenced analysis does not exist")]
    AnalysisNotFound,

    #[error("Not authorized to perform this action")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document store error: {0}")]
    Store(String),
}

impl AppointmentError {
    /// Stable machine-readable code surfaced alongside the human message.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AppointmentError::NotFound => "NOT_FOUND",
            AppointmentError::OutsideAvailability => "OUTSIDE_AVAILABILITY",
            AppointmentError::SlotFull => "SLOT_FULL",
            AppointmentError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppointmentError::MissingAnalysis => "MISSING_ANALYSIS",
            AppointmentError::AnalysisNotFound => "ANALYSIS_NOT_FOUND",
            AppointmentError::Unauthorized => "FORBIDDEN",
            AppointmentError::Validation(_) => "VALIDATION_ERROR",
            AppointmentError::Store(_) => "STORE_UNAVAILABLE",
        }
    }
}
