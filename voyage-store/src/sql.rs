//! Table layout per booking kind and shared row mapping for the Postgres repositories.

use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;

use voyage_core::catalog::{Location, Vehicle};
use voyage_core::schedule::{Schedule, ScheduleDetails};
use voyage_core::{BookingKind, CoreError, Fares, SeatCounts, TravelClass};

/// Physical names for one half of the catalog.
pub(crate) struct KindTables {
    pub location_table: &'static str,
    pub vehicle_table: &'static str,
    pub vehicle_number: &'static str,
    pub vehicle_name: &'static str,
    /// Column expression; trains have no aircraft type.
    pub vehicle_aircraft: &'static str,
    pub schedule_table: &'static str,
    pub vehicle_fk: &'static str,
    pub departure_fk: &'static str,
    pub arrival_fk: &'static str,
}

const TRAIN_TABLES: KindTables = KindTables {
    location_table: "stations",
    vehicle_table: "trains",
    vehicle_number: "number",
    vehicle_name: "name",
    vehicle_aircraft: "NULL::VARCHAR",
    schedule_table: "train_schedules",
    vehicle_fk: "train_id",
    departure_fk: "departure_station_id",
    arrival_fk: "arrival_station_id",
};

const FLIGHT_TABLES: KindTables = KindTables {
    location_table: "airports",
    vehicle_table: "flights",
    vehicle_number: "flight_number",
    vehicle_name: "airline",
    vehicle_aircraft: "aircraft_type",
    schedule_table: "flight_schedules",
    vehicle_fk: "flight_id",
    departure_fk: "departure_airport_id",
    arrival_fk: "arrival_airport_id",
};

pub(crate) fn tables(kind: BookingKind) -> &'static KindTables {
    match kind {
        BookingKind::Train => &TRAIN_TABLES,
        BookingKind::Flight => &FLIGHT_TABLES,
    }
}

pub(crate) fn available_column(class: TravelClass) -> &'static str {
    match class {
        TravelClass::Economy => "available_seats_economy",
        TravelClass::Business => "available_seats_business",
        TravelClass::First => "available_seats_first",
    }
}

pub(crate) fn price_column(class: TravelClass) -> &'static str {
    match class {
        TravelClass::Economy => "economy_price",
        TravelClass::Business => "business_price",
        TravelClass::First => "first_price",
    }
}

// ============================================================================
// Errors
// ============================================================================

pub(crate) fn storage(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.to_string())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}

/// Stored enum text that no longer parses is a storage fault, not bad input.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, CoreError>
where
    T: FromStr<Err = CoreError>,
{
    value
        .parse()
        .map_err(|e: CoreError| CoreError::Storage(format!("corrupt column value: {}", e)))
}

// ============================================================================
// SELECT lists
// ============================================================================

pub(crate) fn location_columns(prefix: &str, alias: &str) -> String {
    format!(
        "{a}.id AS {p}id, {a}.code AS {p}code, {a}.name AS {p}name, {a}.city AS {p}city, \
         {a}.state AS {p}state, {a}.country AS {p}country",
        a = alias,
        p = prefix
    )
}

pub(crate) fn vehicle_columns(kind: BookingKind, prefix: &str, alias: &str) -> String {
    let t = tables(kind);
    let aircraft = if t.vehicle_aircraft.starts_with("NULL") {
        t.vehicle_aircraft.to_string()
    } else {
        format!("{}.{}", alias, t.vehicle_aircraft)
    };
    format!(
        "{a}.id AS {p}id, {a}.{num} AS {p}number, {a}.{name} AS {p}name, {air} AS {p}aircraft_type, \
         {a}.total_seats_economy AS {p}total_seats_economy, \
         {a}.total_seats_business AS {p}total_seats_business, \
         {a}.total_seats_first AS {p}total_seats_first",
        a = alias,
        p = prefix,
        num = t.vehicle_number,
        name = t.vehicle_name,
        air = aircraft
    )
}

pub(crate) fn schedule_columns(kind: BookingKind, alias: &str) -> String {
    let t = tables(kind);
    format!(
        "{a}.id, {a}.{vfk} AS vehicle_id, {a}.{dfk} AS departure_location_id, \
         {a}.{afk} AS arrival_location_id, {a}.departure_time, {a}.arrival_time, \
         {a}.economy_price, {a}.business_price, {a}.first_price, \
         {a}.available_seats_economy, {a}.available_seats_business, {a}.available_seats_first",
        a = alias,
        vfk = t.vehicle_fk,
        dfk = t.departure_fk,
        afk = t.arrival_fk
    )
}

/// Schedule joined with its vehicle and both locations. Callers append WHERE/ORDER BY.
pub(crate) fn schedule_details_select(kind: BookingKind) -> String {
    let t = tables(kind);
    format!(
        "SELECT {s}, {v}, {d}, {r} \
         FROM {st} s \
         JOIN {vt} v ON v.id = s.{vfk} \
         JOIN {lt} d ON d.id = s.{dfk} \
         JOIN {lt} a ON a.id = s.{afk}",
        s = schedule_columns(kind, "s"),
        v = vehicle_columns(kind, "v_", "v"),
        d = location_columns("d_", "d"),
        r = location_columns("a_", "a"),
        st = t.schedule_table,
        vt = t.vehicle_table,
        lt = t.location_table,
        vfk = t.vehicle_fk,
        dfk = t.departure_fk,
        afk = t.arrival_fk
    )
}

// ============================================================================
// Row mapping
// ============================================================================

pub(crate) fn location_from_row(kind: BookingKind, row: &PgRow, prefix: &str) -> Result<Location, sqlx::Error> {
    Ok(Location {
        id: row.try_get(format!("{}id", prefix).as_str())?,
        kind,
        code: row.try_get(format!("{}code", prefix).as_str())?,
        name: row.try_get(format!("{}name", prefix).as_str())?,
        city: row.try_get(format!("{}city", prefix).as_str())?,
        state: row.try_get(format!("{}state", prefix).as_str())?,
        country: row.try_get(format!("{}country", prefix).as_str())?,
    })
}

pub(crate) fn vehicle_from_row(kind: BookingKind, row: &PgRow, prefix: &str) -> Result<Vehicle, sqlx::Error> {
    let col = |name: &str| format!("{}{}", prefix, name);
    Ok(Vehicle {
        id: row.try_get(col("id").as_str())?,
        kind,
        number: row.try_get(col("number").as_str())?,
        name: row.try_get(col("name").as_str())?,
        aircraft_type: row.try_get(col("aircraft_type").as_str())?,
        capacity: SeatCounts::new(
            row.try_get(col("total_seats_economy").as_str())?,
            row.try_get(col("total_seats_business").as_str())?,
            row.try_get(col("total_seats_first").as_str())?,
        ),
    })
}

pub(crate) fn schedule_from_row(kind: BookingKind, row: &PgRow) -> Result<Schedule, sqlx::Error> {
    Ok(Schedule {
        id: row.try_get("id")?,
        kind,
        vehicle_id: row.try_get("vehicle_id")?,
        departure_location_id: row.try_get("departure_location_id")?,
        arrival_location_id: row.try_get("arrival_location_id")?,
        departure_time: row.try_get("departure_time")?,
        arrival_time: row.try_get("arrival_time")?,
        fares: Fares::new(
            row.try_get("economy_price")?,
            row.try_get("business_price")?,
            row.try_get("first_price")?,
        ),
        available_seats: SeatCounts::new(
            row.try_get("available_seats_economy")?,
            row.try_get("available_seats_business")?,
            row.try_get("available_seats_first")?,
        ),
    })
}

pub(crate) fn schedule_details_from_row(kind: BookingKind, row: &PgRow) -> Result<ScheduleDetails, sqlx::Error> {
    Ok(ScheduleDetails {
        schedule: schedule_from_row(kind, row)?,
        vehicle: vehicle_from_row(kind, row, "v_")?,
        departure: location_from_row(kind, row, "d_")?,
        arrival: location_from_row(kind, row, "a_")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_vehicle_columns_alias_airline() {
        let cols = vehicle_columns(BookingKind::Flight, "v_", "v");
        assert!(cols.contains("v.flight_number AS v_number"));
        assert!(cols.contains("v.airline AS v_name"));
        assert!(cols.contains("v.aircraft_type AS v_aircraft_type"));
    }

    #[test]
    fn test_train_vehicle_has_null_aircraft() {
        let cols = vehicle_columns(BookingKind::Train, "", "trains");
        assert!(cols.contains("NULL::VARCHAR AS aircraft_type"));
        assert!(cols.contains("trains.number AS number"));
    }

    #[test]
    fn test_details_select_joins_kind_tables() {
        let sql = schedule_details_select(BookingKind::Train);
        assert!(sql.contains("FROM train_schedules s"));
        assert!(sql.contains("JOIN stations d ON d.id = s.departure_station_id"));
        assert!(sql.contains("JOIN trains v ON v.id = s.train_id"));
    }
}
