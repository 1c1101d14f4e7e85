// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, AttachAnalysisRequest, BookAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::booking::BookingService;

fn map_appointment_error(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::AnalysisNotFound => {
            AppError::NotFound("Referenced analysis does not exist".to_string())
        }
        AppointmentError::OutsideAvailability
        | AppointmentError::SlotFull
        | AppointmentError::InvalidTransition { .. }
        | AppointmentError::MissingAnalysis => AppError::ConflictWithReason {
            reason: err.reason_code(),
            message: err.to_string(),
        },
        AppointmentError::Unauthorized => {
            AppError::Forbidden("Not authorized to perform this action".to_string())
        }
        AppointmentError::Validation(msg) => AppError::ValidationError(msg),
        AppointmentError::Store(msg) => AppError::StoreUnavailable(msg),
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .book_appointment(request, &user, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

/// Filtered listing. Non-admins are pinned to their own appointments no
/// matter what filters they send.
#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        let own_id = parse_actor_id(&user)?;
        if user.is_doctor() {
            query.doctor_id = Some(own_id);
        } else {
            query.patient_id = Some(own_id);
        }
    }

    let service = BookingService::new(&state);

    let appointments = service
        .search_appointments(&query, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_appointment_error)?;

    let involved = user.id == appointment.patient_id.to_string()
        || user.id == appointment.doctor_id.to_string();
    if !involved && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.id != patient_id.to_string() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this patient's appointments".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let query = AppointmentSearchQuery {
        patient_id: Some(patient_id),
        ..Default::default()
    };

    let appointments = service
        .search_appointments(&query, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.id != doctor_id.to_string() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this doctor's appointments".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let query = AppointmentSearchQuery {
        doctor_id: Some(doctor_id),
        ..Default::default()
    };

    let appointments = service
        .search_appointments(&query, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .transition_status(appointment_id, request.status, &user, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn attach_analysis(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<AttachAnalysisRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .attach_analysis(appointment_id, request.analysis_id, &user, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    service
        .delete_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "deleted": appointment_id
    })))
}

fn parse_actor_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("token subject is not a valid user id".to_string()))
}
