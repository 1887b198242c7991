use std::sync::Arc;
use tracing::info;

use voyage_core::catalog::{Location, LocationInput, Vehicle, VehicleInput};
use voyage_core::repository::{CatalogRepository, ScheduleRepository};
use voyage_core::schedule::{ScheduleDetails, ScheduleInput};
use voyage_core::{AdminActor, BookingKind, CoreError, CoreResult, ScheduleRef};

/// Catalog maintenance. Every operation requires proof of the admin gate.
pub struct CatalogAdmin {
    catalog: Arc<dyn CatalogRepository>,
    schedules: Arc<dyn ScheduleRepository>,
}

impl CatalogAdmin {
    pub fn new(catalog: Arc<dyn CatalogRepository>, schedules: Arc<dyn ScheduleRepository>) -> Self {
        Self { catalog, schedules }
    }

    // ========================================================================
    // Stations and airports
    // ========================================================================

    pub async fn list_locations(&self, _admin: &AdminActor, kind: BookingKind) -> CoreResult<Vec<Location>> {
        self.catalog.list_locations(kind).await
    }

    pub async fn get_location(&self, _admin: &AdminActor, kind: BookingKind, id: i64) -> CoreResult<Location> {
        self.catalog
            .get_location(kind, id)
            .await?
            .ok_or_else(|| CoreError::not_found(kind.location_label(), id))
    }

    pub async fn create_location(
        &self,
        admin: &AdminActor,
        kind: BookingKind,
        input: LocationInput,
    ) -> CoreResult<Location> {
        input.validate(kind)?;
        let location = self.catalog.create_location(kind, input.normalized()).await?;
        info!(
            "Admin {} created {} {} ({})",
            admin.user_id(),
            kind.location_label(),
            location.id,
            location.code
        );
        Ok(location)
    }

    pub async fn update_location(
        &self,
        admin: &AdminActor,
        kind: BookingKind,
        id: i64,
        input: LocationInput,
    ) -> CoreResult<Location> {
        input.validate(kind)?;
        let location = self.catalog.update_location(kind, id, input.normalized()).await?;
        info!("Admin {} updated {} {}", admin.user_id(), kind.location_label(), id);
        Ok(location)
    }

    pub async fn delete_location(&self, admin: &AdminActor, kind: BookingKind, id: i64) -> CoreResult<()> {
        self.catalog.delete_location(kind, id).await?;
        info!("Admin {} deleted {} {}", admin.user_id(), kind.location_label(), id);
        Ok(())
    }

    // ========================================================================
    // Trains and flights
    // ========================================================================

    pub async fn list_vehicles(&self, _admin: &AdminActor, kind: BookingKind) -> CoreResult<Vec<Vehicle>> {
        self.catalog.list_vehicles(kind).await
    }

    pub async fn get_vehicle(&self, _admin: &AdminActor, kind: BookingKind, id: i64) -> CoreResult<Vehicle> {
        self.catalog
            .get_vehicle(kind, id)
            .await?
            .ok_or_else(|| CoreError::not_found(kind.as_str(), id))
    }

    pub async fn create_vehicle(
        &self,
        admin: &AdminActor,
        kind: BookingKind,
        input: VehicleInput,
    ) -> CoreResult<Vehicle> {
        input.validate(kind)?;
        let vehicle = self.catalog.create_vehicle(kind, input.normalized()).await?;
        info!("Admin {} created {} {} ({})", admin.user_id(), kind, vehicle.id, vehicle.number);
        Ok(vehicle)
    }

    pub async fn update_vehicle(
        &self,
        admin: &AdminActor,
        kind: BookingKind,
        id: i64,
        input: VehicleInput,
    ) -> CoreResult<Vehicle> {
        input.validate(kind)?;
        let vehicle = self.catalog.update_vehicle(kind, id, input.normalized()).await?;
        info!("Admin {} updated {} {}", admin.user_id(), kind, id);
        Ok(vehicle)
    }

    pub async fn delete_vehicle(&self, admin: &AdminActor, kind: BookingKind, id: i64) -> CoreResult<()> {
        self.catalog.delete_vehicle(kind, id).await?;
        info!("Admin {} deleted {} {}", admin.user_id(), kind, id);
        Ok(())
    }

    // ========================================================================
    // Schedules
    // ========================================================================

    pub async fn list_schedules(
        &self,
        _admin: &AdminActor,
        kind: BookingKind,
    ) -> CoreResult<Vec<ScheduleDetails>> {
        self.schedules.list_schedules(kind).await
    }

    pub async fn get_schedule(&self, _admin: &AdminActor, schedule: ScheduleRef) -> CoreResult<ScheduleDetails> {
        self.schedules
            .get_schedule(schedule)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", schedule)))
    }

    /// The store seeds the seat counters from the vehicle's capacity.
    pub async fn create_schedule(
        &self,
        admin: &AdminActor,
        kind: BookingKind,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails> {
        input.validate()?;
        self.check_references(kind, &input).await?;
        let details = self.schedules.create_schedule(kind, input).await?;
        info!("Admin {} created {}", admin.user_id(), details.reference());
        Ok(details)
    }

    pub async fn update_schedule(
        &self,
        admin: &AdminActor,
        schedule: ScheduleRef,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails> {
        input.validate()?;
        self.check_references(schedule.kind, &input).await?;
        let details = self.schedules.update_schedule(schedule, input).await?;
        info!("Admin {} updated {}", admin.user_id(), schedule);
        Ok(details)
    }

    pub async fn delete_schedule(&self, admin: &AdminActor, schedule: ScheduleRef) -> CoreResult<()> {
        self.schedules.delete_schedule(schedule).await?;
        info!("Admin {} deleted {}", admin.user_id(), schedule);
        Ok(())
    }

    /// The vehicle and both locations must exist and belong to `kind`.
    async fn check_references(&self, kind: BookingKind, input: &ScheduleInput) -> CoreResult<()> {
        if self.catalog.get_vehicle(kind, input.vehicle_id).await?.is_none() {
            return Err(CoreError::not_found(kind.as_str(), input.vehicle_id));
        }
        for id in [input.departure_location_id, input.arrival_location_id] {
            if self.catalog.get_location(kind, id).await?.is_none() {
                return Err(CoreError::not_found(kind.location_label(), id));
            }
        }
        Ok(())
    }
}
