use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

use voyage_catalog::total_fare;
use voyage_core::booking::{Booking, BookingStats, NewBooking, Passenger, PassengerDetails};
use voyage_core::repository::BookingRepository;
use voyage_core::{ByClass, CoreError, CoreResult, ScheduleRef, TravelClass};

use crate::sql::{available_column, parse_column, price_column, storage, tables};

const BOOKING_COLUMNS: &str =
    "id, user_id, booking_type, schedule_id, travel_class, total_amount, status, booking_date";
const PASSENGER_COLUMNS: &str =
    "id, booking_id, first_name, last_name, age, gender, seat_number, meal_preference";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach passengers to a page of booking rows in one round trip.
    async fn hydrate(&self, rows: Vec<PgRow>) -> CoreResult<Vec<Booking>> {
        let mut bookings = rows
            .iter()
            .map(booking_from_row)
            .collect::<CoreResult<Vec<_>>>()?;
        if bookings.is_empty() {
            return Ok(bookings);
        }

        let ids: Vec<i64> = bookings.iter().map(|b| b.id).collect();
        let sql = format!(
            "SELECT {} FROM passengers WHERE booking_id = ANY($1) ORDER BY id",
            PASSENGER_COLUMNS
        );
        let passenger_rows = sqlx::query(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let mut by_booking: HashMap<i64, Vec<Passenger>> = HashMap::new();
        for row in &passenger_rows {
            let passenger = passenger_from_row(row)?;
            by_booking.entry(passenger.booking_id).or_default().push(passenger);
        }
        for booking in &mut bookings {
            booking.passengers = by_booking.remove(&booking.id).unwrap_or_default();
        }
        Ok(bookings)
    }
}

fn booking_from_row(row: &PgRow) -> CoreResult<Booking> {
    let kind: String = row.try_get("booking_type").map_err(storage)?;
    let class: String = row.try_get("travel_class").map_err(storage)?;
    let status: String = row.try_get("status").map_err(storage)?;
    Ok(Booking {
        id: row.try_get("id").map_err(storage)?,
        user_id: row.try_get("user_id").map_err(storage)?,
        schedule: ScheduleRef::new(parse_column(&kind)?, row.try_get("schedule_id").map_err(storage)?),
        travel_class: parse_column(&class)?,
        total_amount: row.try_get("total_amount").map_err(storage)?,
        status: parse_column(&status)?,
        created_at: row.try_get("booking_date").map_err(storage)?,
        passengers: Vec::new(),
    })
}

fn passenger_from_row(row: &PgRow) -> CoreResult<Passenger> {
    let gender: String = row.try_get("gender").map_err(storage)?;
    let meal: Option<String> = row.try_get("meal_preference").map_err(storage)?;
    Ok(Passenger {
        id: row.try_get("id").map_err(storage)?,
        booking_id: row.try_get("booking_id").map_err(storage)?,
        details: PassengerDetails {
            first_name: row.try_get("first_name").map_err(storage)?,
            last_name: row.try_get("last_name").map_err(storage)?,
            age: row.try_get("age").map_err(storage)?,
            gender: parse_column(&gender)?,
            seat_number: row.try_get("seat_number").map_err(storage)?,
            meal_preference: meal.as_deref().map(parse_column).transpose()?,
        },
    })
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: NewBooking) -> CoreResult<Booking> {
        let t = tables(booking.schedule.kind);
        let seats = available_column(booking.travel_class);
        let requested = booking.passenger_count();

        let mut tx = self.pool.begin().await.map_err(storage)?;

        // 1. Conditional decrement; no row means missing schedule or not enough seats
        let decrement = format!(
            "UPDATE {st} SET {seats} = {seats} - $2 WHERE id = $1 AND {seats} >= $2 RETURNING {price}",
            st = t.schedule_table,
            seats = seats,
            price = price_column(booking.travel_class)
        );
        let price: Option<(i64,)> = sqlx::query_as(&decrement)
            .bind(booking.schedule.id)
            .bind(requested)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;

        let unit_price = match price {
            Some((unit_price,)) => unit_price,
            None => {
                let recheck = format!("SELECT {} FROM {} WHERE id = $1", seats, t.schedule_table);
                let available: Option<(i32,)> = sqlx::query_as(&recheck)
                    .bind(booking.schedule.id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage)?;
                return Err(match available {
                    Some((available,)) => CoreError::InsufficientCapacity { requested, available },
                    None => CoreError::NotFound(format!("{} does not exist", booking.schedule)),
                });
            }
        };

        // 2. Booking row, with the total fixed from the price read under the lock
        let total_amount = total_fare(unit_price, requested)?;
        let insert = format!(
            "INSERT INTO bookings (user_id, booking_type, schedule_id, travel_class, total_amount, status) \
             VALUES ($1, $2, $3, $4, $5, 'confirmed') RETURNING {}",
            BOOKING_COLUMNS
        );
        let row = sqlx::query(&insert)
            .bind(booking.user_id)
            .bind(booking.schedule.kind.as_str())
            .bind(booking.schedule.id)
            .bind(booking.travel_class.as_str())
            .bind(total_amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;
        let mut created = booking_from_row(&row)?;

        // 3. Passengers
        let insert_passenger = format!(
            "INSERT INTO passengers (booking_id, first_name, last_name, age, gender, seat_number, meal_preference) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            PASSENGER_COLUMNS
        );
        for details in &booking.passengers {
            let row = sqlx::query(&insert_passenger)
                .bind(created.id)
                .bind(&details.first_name)
                .bind(&details.last_name)
                .bind(details.age)
                .bind(details.gender.as_str())
                .bind(&details.seat_number)
                .bind(details.meal_preference.map(|m| m.as_str()))
                .fetch_one(&mut *tx)
                .await
                .map_err(storage)?;
            created.passengers.push(passenger_from_row(&row)?);
        }

        // 4. Commit as one unit
        tx.commit().await.map_err(storage)?;
        Ok(created)
    }

    async fn cancel_booking(&self, id: i64) -> CoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Only a confirmed booking flips; a repeat finds nothing to release
        let flipped: Option<(String, i64, String)> = sqlx::query_as(
            "UPDATE bookings SET status = 'cancelled' WHERE id = $1 AND status = 'confirmed' \
             RETURNING booking_type, schedule_id, travel_class",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        if let Some((kind, schedule_id, class)) = flipped {
            let class: TravelClass = parse_column(&class)?;
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM passengers WHERE booking_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(storage)?;
            let seats = available_column(class);
            let release = format!(
                "UPDATE {} SET {seats} = {seats} + $2 WHERE id = $1",
                tables(parse_column(&kind)?).schedule_table,
                seats = seats
            );
            sqlx::query(&release)
                .bind(schedule_id)
                .bind(count as i32)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        self.get_booking(id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", id))
    }

    async fn get_booking(&self, id: i64) -> CoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_bookings_for_user(&self, user_id: i64) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY booking_date DESC, id DESC",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        self.hydrate(rows).await
    }

    async fn recent_bookings(&self, limit: i64) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings ORDER BY booking_date DESC, id DESC LIMIT $1",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        self.hydrate(rows).await
    }

    async fn booking_stats(&self) -> CoreResult<BookingStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed, \
             COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled, \
             COUNT(*) FILTER (WHERE booking_type = 'train') AS train, \
             COUNT(*) FILTER (WHERE booking_type = 'flight') AS flight, \
             COUNT(*) FILTER (WHERE travel_class = 'economy') AS economy, \
             COUNT(*) FILTER (WHERE travel_class = 'business') AS business, \
             COUNT(*) FILTER (WHERE travel_class = 'first') AS first \
             FROM bookings",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        let count = |name: &str| row.try_get::<i64, _>(name).map_err(storage);
        Ok(BookingStats {
            total: count("total")?,
            confirmed: count("confirmed")?,
            cancelled: count("cancelled")?,
            train: count("train")?,
            flight: count("flight")?,
            by_class: ByClass::new(count("economy")?, count("business")?, count("first")?),
        })
    }
}
