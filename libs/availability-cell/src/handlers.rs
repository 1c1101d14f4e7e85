// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityError, DailyAvailability, SlotsQuery, UpdateWeeklyScheduleRequest,
};
use crate::services::schedule::ScheduleService;

/// Providers may edit only their own schedule; admins may edit anyone's.
fn authorize_schedule_write(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    let is_owner = user.is_doctor() && user.id == doctor_id.to_string();
    if !is_owner && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to modify this doctor's availability".to_string(),
        ));
    }
    Ok(())
}

fn map_availability_error(err: AvailabilityError) -> AppError {
    match err {
        AvailabilityError::NotFound => {
            AppError::NotFound("No availability found for this doctor".to_string())
        }
        AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
        AvailabilityError::Store(msg) => AppError::StoreUnavailable(msg),
    }
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);

    let availability = service
        .get_availability(doctor_id, auth.token())
        .await
        .map_err(map_availability_error)?
        .ok_or_else(|| AppError::NotFound("No availability found for this doctor".to_string()))?;

    Ok(Json(json!({ "availability": availability })))
}

#[axum::debug_handler]
pub async fn update_weekly_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateWeeklyScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    authorize_schedule_write(&user, doctor_id)?;

    let service = ScheduleService::new(&state);

    let availability = service
        .upsert_weekly_schedule(doctor_id, request.weekly_schedule, auth.token())
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn set_custom_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<DailyAvailability>,
) -> Result<Json<Value>, AppError> {
    authorize_schedule_write(&user, doctor_id)?;

    let service = ScheduleService::new(&state);

    let availability = service
        .set_custom_date(doctor_id, request, auth.token())
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn remove_custom_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    authorize_schedule_write(&user, doctor_id)?;

    let service = ScheduleService::new(&state);

    let availability = service
        .remove_custom_date(doctor_id, date, auth.token())
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": availability
    })))
}

/// Slot listing for the booking UI. Always a fresh read; clients re-fetch
/// this after any availability rejection instead of retrying blindly.
#[axum::debug_handler]
pub async fn get_time_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);

    let slots = service
        .get_time_slots(doctor_id, query.date, auth.token())
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots
    })))
}
