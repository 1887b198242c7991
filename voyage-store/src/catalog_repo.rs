use async_trait::async_trait;
use sqlx::PgPool;

use voyage_core::catalog::{Location, LocationInput, Vehicle, VehicleInput};
use voyage_core::repository::CatalogRepository;
use voyage_core::{BookingKind, CoreError, CoreResult, SeatCounts};

use crate::sql::{
    is_foreign_key_violation, is_unique_violation, location_columns, location_from_row, storage,
    tables, vehicle_columns, vehicle_from_row,
};

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn location_in_use(&self, kind: BookingKind, id: i64) -> CoreResult<bool> {
        let t = tables(kind);
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1 OR {} = $1)",
            t.schedule_table, t.departure_fk, t.arrival_fk
        );
        let (in_use,): (bool,) = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(in_use)
    }

    async fn vehicle_in_use<'e, E>(executor: E, kind: BookingKind, id: i64) -> CoreResult<bool>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let t = tables(kind);
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
            t.schedule_table, t.vehicle_fk
        );
        let (in_use,): (bool,) = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(executor)
            .await
            .map_err(storage)?;
        Ok(in_use)
    }
}

fn duplicate_or_storage(kind_label: &str) -> impl Fn(sqlx::Error) -> CoreError + '_ {
    move |e| {
        if is_unique_violation(&e) {
            CoreError::Conflict(format!("a {} with that code or number already exists", kind_label))
        } else {
            storage(e)
        }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create_location(&self, kind: BookingKind, input: LocationInput) -> CoreResult<Location> {
        let t = tables(kind);
        let sql = format!(
            "INSERT INTO {lt} (code, name, city, state, country) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {cols}",
            lt = t.location_table,
            cols = location_columns("", t.location_table)
        );
        let row = sqlx::query(&sql)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.country)
            .fetch_one(&self.pool)
            .await
            .map_err(duplicate_or_storage(kind.location_label()))?;
        location_from_row(kind, &row, "").map_err(storage)
    }

    async fn update_location(
        &self,
        kind: BookingKind,
        id: i64,
        input: LocationInput,
    ) -> CoreResult<Location> {
        let t = tables(kind);
        let sql = format!(
            "UPDATE {lt} SET code = $2, name = $3, city = $4, state = $5, country = $6 \
             WHERE id = $1 RETURNING {cols}",
            lt = t.location_table,
            cols = location_columns("", t.location_table)
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.country)
            .fetch_optional(&self.pool)
            .await
            .map_err(duplicate_or_storage(kind.location_label()))?
            .ok_or_else(|| CoreError::not_found(kind.location_label(), id))?;
        location_from_row(kind, &row, "").map_err(storage)
    }

    async fn delete_location(&self, kind: BookingKind, id: i64) -> CoreResult<()> {
        if self.location_in_use(kind, id).await? {
            return Err(CoreError::Conflict(format!(
                "{} {} is used by a schedule",
                kind.location_label(),
                id
            )));
        }
        let sql = format!("DELETE FROM {} WHERE id = $1", tables(kind).location_table);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    CoreError::Conflict(format!("{} {} is used by a schedule", kind.location_label(), id))
                } else {
                    storage(e)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(kind.location_label(), id));
        }
        Ok(())
    }

    async fn get_location(&self, kind: BookingKind, id: i64) -> CoreResult<Option<Location>> {
        let t = tables(kind);
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            location_columns("", t.location_table),
            t.location_table
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(|r| location_from_row(kind, &r, ""))
            .transpose()
            .map_err(storage)
    }

    async fn list_locations(&self, kind: BookingKind) -> CoreResult<Vec<Location>> {
        let t = tables(kind);
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            location_columns("", t.location_table),
            t.location_table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(storage)?;
        rows.iter()
            .map(|r| location_from_row(kind, r, ""))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)
    }

    async fn create_vehicle(&self, kind: BookingKind, input: VehicleInput) -> CoreResult<Vehicle> {
        let t = tables(kind);
        let (columns, values) = match kind {
            BookingKind::Flight => (
                format!("{}, {}, aircraft_type", t.vehicle_number, t.vehicle_name),
                "$1, $2, $6",
            ),
            BookingKind::Train => (format!("{}, {}", t.vehicle_number, t.vehicle_name), "$1, $2"),
        };
        let sql = format!(
            "INSERT INTO {vt} ({columns}, total_seats_economy, total_seats_business, total_seats_first) \
             VALUES ({values}, $3, $4, $5) RETURNING {cols}",
            vt = t.vehicle_table,
            columns = columns,
            values = values,
            cols = vehicle_columns(kind, "", t.vehicle_table)
        );
        let mut query = sqlx::query(&sql)
            .bind(&input.number)
            .bind(&input.name)
            .bind(input.capacity.economy)
            .bind(input.capacity.business)
            .bind(input.capacity.first);
        if kind == BookingKind::Flight {
            query = query.bind(&input.aircraft_type);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(duplicate_or_storage(kind.as_str()))?;
        vehicle_from_row(kind, &row, "").map_err(storage)
    }

    async fn update_vehicle(
        &self,
        kind: BookingKind,
        id: i64,
        input: VehicleInput,
    ) -> CoreResult<Vehicle> {
        let t = tables(kind);
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // 1. Lock the row and compare capacity
        let lock = format!(
            "SELECT total_seats_economy, total_seats_business, total_seats_first \
             FROM {} WHERE id = $1 FOR UPDATE",
            t.vehicle_table
        );
        let current: Option<(i32, i32, i32)> = sqlx::query_as(&lock)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        let (economy, business, first) = current.ok_or_else(|| CoreError::not_found(kind.as_str(), id))?;

        if SeatCounts::new(economy, business, first) != input.capacity
            && Self::vehicle_in_use(&mut *tx, kind, id).await?
        {
            return Err(CoreError::Conflict(format!(
                "{} {} has schedules; its capacity cannot change",
                kind, id
            )));
        }

        // 2. Apply
        let aircraft = match kind {
            BookingKind::Flight => ", aircraft_type = $7",
            BookingKind::Train => "",
        };
        let sql = format!(
            "UPDATE {vt} SET {num} = $2, {name} = $3, total_seats_economy = $4, \
             total_seats_business = $5, total_seats_first = $6{aircraft} \
             WHERE id = $1 RETURNING {cols}",
            vt = t.vehicle_table,
            num = t.vehicle_number,
            name = t.vehicle_name,
            aircraft = aircraft,
            cols = vehicle_columns(kind, "", t.vehicle_table)
        );
        let mut query = sqlx::query(&sql)
            .bind(id)
            .bind(&input.number)
            .bind(&input.name)
            .bind(input.capacity.economy)
            .bind(input.capacity.business)
            .bind(input.capacity.first);
        if kind == BookingKind::Flight {
            query = query.bind(&input.aircraft_type);
        }
        let row = query
            .fetch_one(&mut *tx)
            .await
            .map_err(duplicate_or_storage(kind.as_str()))?;
        let vehicle = vehicle_from_row(kind, &row, "").map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(vehicle)
    }

    async fn delete_vehicle(&self, kind: BookingKind, id: i64) -> CoreResult<()> {
        if Self::vehicle_in_use(&self.pool, kind, id).await? {
            return Err(CoreError::Conflict(format!("{} {} is used by a schedule", kind, id)));
        }
        let sql = format!("DELETE FROM {} WHERE id = $1", tables(kind).vehicle_table);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    CoreError::Conflict(format!("{} {} is used by a schedule", kind, id))
                } else {
                    storage(e)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(kind.as_str(), id));
        }
        Ok(())
    }

    async fn get_vehicle(&self, kind: BookingKind, id: i64) -> CoreResult<Option<Vehicle>> {
        let t = tables(kind);
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            vehicle_columns(kind, "", t.vehicle_table),
            t.vehicle_table
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(|r| vehicle_from_row(kind, &r, ""))
            .transpose()
            .map_err(storage)
    }

    async fn list_vehicles(&self, kind: BookingKind) -> CoreResult<Vec<Vehicle>> {
        let t = tables(kind);
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            vehicle_columns(kind, "", t.vehicle_table),
            t.vehicle_table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(storage)?;
        rows.iter()
            .map(|r| vehicle_from_row(kind, r, ""))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)
    }
}
