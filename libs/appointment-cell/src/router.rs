// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/search", get(handlers::search_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/status", patch(handlers::update_status))
        .route("/{appointment_id}/analysis", post(handlers::attach_analysis))
        .route(
            "/patients/{patient_id}",
            get(handlers::get_patient_appointments),
        )
        .route(
            "/doctors/{doctor_id}",
            get(handlers::get_doctor_appointments),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
