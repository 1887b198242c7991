use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};

use voyage_booking::BookingView;
use voyage_core::booking::{Booking, BookingRequest};
use voyage_core::Actor;

use crate::extract::{ValidatedJson, ValidatedPath};
use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(request): ValidatedJson<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.engine.create_booking(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    Ok(Json(state.engine.history(&actor).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(state.engine.get_booking(&actor, id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.engine.cancel_booking(&actor, id).await?))
}
