use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use voyage_catalog::like_pattern;
use voyage_core::repository::ScheduleRepository;
use voyage_core::schedule::{ScheduleDetails, ScheduleInput};
use voyage_core::{BookingKind, CoreError, CoreResult, ScheduleRef, SeatCounts};

use crate::sql::{
    is_foreign_key_violation, schedule_columns, schedule_details_from_row, schedule_details_select,
    schedule_from_row, storage, tables,
};

pub struct PgScheduleRepository {
    pool: PgPool,
}

impl PgScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn require(&self, schedule: ScheduleRef) -> CoreResult<ScheduleDetails> {
        self.get_schedule(schedule)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", schedule)))
    }
}

fn missing_reference(kind: BookingKind) -> impl Fn(sqlx::Error) -> CoreError {
    move |e| {
        if is_foreign_key_violation(&e) {
            CoreError::NotFound(format!(
                "referenced {} or {} does not exist",
                kind.as_str(),
                kind.location_label()
            ))
        } else {
            storage(e)
        }
    }
}

/// Holds a share lock on the vehicle row until the transaction ends, so a
/// concurrent capacity edit waits for it.
async fn vehicle_capacity(
    conn: &mut sqlx::PgConnection,
    kind: BookingKind,
    id: i64,
) -> CoreResult<SeatCounts> {
    let sql = format!(
        "SELECT total_seats_economy, total_seats_business, total_seats_first FROM {} \
         WHERE id = $1 FOR SHARE",
        tables(kind).vehicle_table
    );
    let row: Option<(i32, i32, i32)> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(storage)?;
    let (economy, business, first) = row.ok_or_else(|| CoreError::not_found(kind.as_str(), id))?;
    Ok(SeatCounts::new(economy, business, first))
}

#[async_trait]
impl ScheduleRepository for PgScheduleRepository {
    async fn create_schedule(
        &self,
        kind: BookingKind,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails> {
        let t = tables(kind);
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // 1. Seed counters from the locked vehicle row
        let seats = vehicle_capacity(&mut tx, kind, input.vehicle_id).await?;

        // 2. Insert
        let sql = format!(
            "INSERT INTO {st} ({vfk}, {dfk}, {afk}, departure_time, arrival_time, \
             economy_price, business_price, first_price, \
             available_seats_economy, available_seats_business, available_seats_first) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
            st = t.schedule_table,
            vfk = t.vehicle_fk,
            dfk = t.departure_fk,
            afk = t.arrival_fk
        );
        let (id,): (i64,) = sqlx::query_as(&sql)
            .bind(input.vehicle_id)
            .bind(input.departure_location_id)
            .bind(input.arrival_location_id)
            .bind(input.departure_time)
            .bind(input.arrival_time)
            .bind(input.fares.economy)
            .bind(input.fares.business)
            .bind(input.fares.first)
            .bind(seats.economy)
            .bind(seats.business)
            .bind(seats.first)
            .fetch_one(&mut *tx)
            .await
            .map_err(missing_reference(kind))?;
        tx.commit().await.map_err(storage)?;

        self.require(ScheduleRef::new(kind, id)).await
    }

    async fn update_schedule(
        &self,
        schedule: ScheduleRef,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails> {
        let kind = schedule.kind;
        let t = tables(kind);
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // 1. Lock the schedule row
        let lock = format!(
            "SELECT {} FROM {} s WHERE s.id = $1 FOR UPDATE",
            schedule_columns(kind, "s"),
            t.schedule_table
        );
        let row = sqlx::query(&lock)
            .bind(schedule.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", schedule)))?;
        let current = schedule_from_row(kind, &row).map_err(storage)?;

        // 2. Counters stay put unless the vehicle changes before any sale
        let mut seats = current.available_seats;
        if input.vehicle_id != current.vehicle_id {
            let old = vehicle_capacity(&mut tx, kind, current.vehicle_id).await?;
            let new = vehicle_capacity(&mut tx, kind, input.vehicle_id).await?;
            seats = current.reseed_for_vehicle(&old, &new)?;
        }

        // 3. Apply
        let sql = format!(
            "UPDATE {st} SET {vfk} = $2, {dfk} = $3, {afk} = $4, departure_time = $5, \
             arrival_time = $6, economy_price = $7, business_price = $8, first_price = $9, \
             available_seats_economy = $10, available_seats_business = $11, \
             available_seats_first = $12 WHERE id = $1",
            st = t.schedule_table,
            vfk = t.vehicle_fk,
            dfk = t.departure_fk,
            afk = t.arrival_fk
        );
        sqlx::query(&sql)
            .bind(schedule.id)
            .bind(input.vehicle_id)
            .bind(input.departure_location_id)
            .bind(input.arrival_location_id)
            .bind(input.departure_time)
            .bind(input.arrival_time)
            .bind(input.fares.economy)
            .bind(input.fares.business)
            .bind(input.fares.first)
            .bind(seats.economy)
            .bind(seats.business)
            .bind(seats.first)
            .execute(&mut *tx)
            .await
            .map_err(missing_reference(kind))?;

        tx.commit().await.map_err(storage)?;
        self.require(schedule).await
    }

    async fn delete_schedule(&self, schedule: ScheduleRef) -> CoreResult<()> {
        let t = tables(schedule.kind);
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Lock first so no booking can land between the check and the delete
        let lock = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", t.schedule_table);
        let found: Option<(i64,)> = sqlx::query_as(&lock)
            .bind(schedule.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        if found.is_none() {
            return Err(CoreError::NotFound(format!("{} does not exist", schedule)));
        }

        let (booked,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM bookings \
             WHERE booking_type = $1 AND schedule_id = $2 AND status = 'confirmed')",
        )
        .bind(schedule.kind.as_str())
        .bind(schedule.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;
        if booked {
            return Err(CoreError::Conflict(format!(
                "{} has confirmed bookings",
                schedule
            )));
        }

        let sql = format!("DELETE FROM {} WHERE id = $1", t.schedule_table);
        sqlx::query(&sql)
            .bind(schedule.id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn get_schedule(&self, schedule: ScheduleRef) -> CoreResult<Option<ScheduleDetails>> {
        let sql = format!("{} WHERE s.id = $1", schedule_details_select(schedule.kind));
        let row = sqlx::query(&sql)
            .bind(schedule.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(|r| schedule_details_from_row(schedule.kind, &r))
            .transpose()
            .map_err(storage)
    }

    async fn list_schedules(&self, kind: BookingKind) -> CoreResult<Vec<ScheduleDetails>> {
        let sql = format!("{} ORDER BY s.id", schedule_details_select(kind));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(storage)?;
        rows.iter()
            .map(|r| schedule_details_from_row(kind, r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)
    }

    async fn search_schedules(
        &self,
        kind: BookingKind,
        source: &str,
        destination: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<ScheduleDetails>> {
        let sql = format!(
            "{} WHERE s.departure_time >= $1 AND s.departure_time < $2 \
             AND (d.name ILIKE $3 OR d.code ILIKE $3 OR d.city ILIKE $3) \
             AND (a.name ILIKE $4 OR a.code ILIKE $4 OR a.city ILIKE $4) \
             ORDER BY s.departure_time, s.id",
            schedule_details_select(kind)
        );
        let rows = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .bind(like_pattern(source))
            .bind(like_pattern(destination))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter()
            .map(|r| schedule_details_from_row(kind, r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)
    }
}
