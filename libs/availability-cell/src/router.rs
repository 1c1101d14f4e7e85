// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/{doctor_id}", get(handlers::get_availability))
        .route("/{doctor_id}/weekly", put(handlers::update_weekly_schedule))
        .route("/{doctor_id}/custom-dates", post(handlers::set_custom_date))
        .route(
            "/{doctor_id}/custom-dates/{date}",
            delete(handlers::remove_custom_date),
        )
        .route("/{doctor_id}/slots", get(handlers::get_time_slots))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
