use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};

use voyage_booking::{BookingReport, Dashboard};
use voyage_core::catalog::{Location, LocationInput, Vehicle, VehicleInput};
use voyage_core::schedule::{ScheduleDetails, ScheduleInput};
use voyage_core::{AdminActor, BookingKind, ScheduleRef};

use crate::extract::{ValidatedJson, ValidatedPath};
use crate::{error::AppError, state::AppState};

// Every route here sits behind `admin_auth_middleware`, which inserts the `AdminActor`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(location_routes("/v1/admin/stations", BookingKind::Train))
        .merge(location_routes("/v1/admin/airports", BookingKind::Flight))
        .merge(vehicle_routes("/v1/admin/trains", BookingKind::Train))
        .merge(vehicle_routes("/v1/admin/flights", BookingKind::Flight))
        .route(
            "/v1/admin/schedules/{kind}",
            get(list_schedules).post(create_schedule),
        )
        .route(
            "/v1/admin/schedules/{kind}/{id}",
            get(get_schedule).put(update_schedule).delete(delete_schedule),
        )
        .route("/v1/admin/dashboard", get(dashboard))
        .route("/v1/admin/reports", get(report))
}

fn location_routes(path: &str, kind: BookingKind) -> Router<AppState> {
    Router::new()
        .route(path, get(list_locations).post(create_location))
        .route(
            &format!("{}/{{id}}", path),
            get(get_location).put(update_location).delete(delete_location),
        )
        .layer(Extension(kind))
}

fn vehicle_routes(path: &str, kind: BookingKind) -> Router<AppState> {
    Router::new()
        .route(path, get(list_vehicles).post(create_vehicle))
        .route(
            &format!("{}/{{id}}", path),
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .layer(Extension(kind))
}

// ============================================================================
// Stations & Airports
// ============================================================================

async fn list_locations(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
) -> Result<Json<Vec<Location>>, AppError> {
    Ok(Json(state.admin.list_locations(&admin, kind).await?))
}

async fn get_location(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(state.admin.get_location(&admin, kind, id).await?))
}

async fn create_location(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedJson(input): ValidatedJson<LocationInput>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let location = state.admin.create_location(&admin, kind, input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn update_location(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(input): ValidatedJson<LocationInput>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(state.admin.update_location(&admin, kind, id, input).await?))
}

async fn delete_location(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<StatusCode, AppError> {
    state.admin.delete_location(&admin, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Trains & Flights
// ============================================================================

async fn list_vehicles(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    Ok(Json(state.admin.list_vehicles(&admin, kind).await?))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(state.admin.get_vehicle(&admin, kind, id).await?))
}

async fn create_vehicle(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedJson(input): ValidatedJson<VehicleInput>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let vehicle = state.admin.create_vehicle(&admin, kind, input).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn update_vehicle(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(input): ValidatedJson<VehicleInput>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(state.admin.update_vehicle(&admin, kind, id, input).await?))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    Extension(kind): Extension<BookingKind>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<StatusCode, AppError> {
    state.admin.delete_vehicle(&admin, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Schedules
// ============================================================================

async fn list_schedules(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    ValidatedPath(kind): ValidatedPath<String>,
) -> Result<Json<Vec<ScheduleDetails>>, AppError> {
    let kind: BookingKind = kind.parse()?;
    Ok(Json(state.admin.list_schedules(&admin, kind).await?))
}

async fn get_schedule(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    ValidatedPath((kind, id)): ValidatedPath<(String, i64)>,
) -> Result<Json<ScheduleDetails>, AppError> {
    let schedule = ScheduleRef::new(kind.parse()?, id);
    Ok(Json(state.admin.get_schedule(&admin, schedule).await?))
}

async fn create_schedule(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    ValidatedPath(kind): ValidatedPath<String>,
    ValidatedJson(input): ValidatedJson<ScheduleInput>,
) -> Result<(StatusCode, Json<ScheduleDetails>), AppError> {
    let kind: BookingKind = kind.parse()?;
    let details = state.admin.create_schedule(&admin, kind, input).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

async fn update_schedule(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    ValidatedPath((kind, id)): ValidatedPath<(String, i64)>,
    ValidatedJson(input): ValidatedJson<ScheduleInput>,
) -> Result<Json<ScheduleDetails>, AppError> {
    let schedule = ScheduleRef::new(kind.parse()?, id);
    Ok(Json(state.admin.update_schedule(&admin, schedule, input).await?))
}

async fn delete_schedule(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
    ValidatedPath((kind, id)): ValidatedPath<(String, i64)>,
) -> Result<StatusCode, AppError> {
    let schedule = ScheduleRef::new(kind.parse()?, id);
    state.admin.delete_schedule(&admin, schedule).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Dashboard & Reports
// ============================================================================

async fn dashboard(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(state.reports.dashboard(&admin).await?))
}

async fn report(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminActor>,
) -> Result<Json<BookingReport>, AppError> {
    Ok(Json(state.reports.report(&admin).await?))
}
