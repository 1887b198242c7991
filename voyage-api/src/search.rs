use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use voyage_booking::ScheduleOption;
use voyage_catalog::FareQuote;
use voyage_core::search::SearchQuery;
use voyage_core::{Actor, BookingKind, ScheduleRef, TravelClass};

use crate::extract::{ValidatedPath, ValidatedQuery};
use crate::{error::AppError, state::AppState};

/// Raw query string. Enums and the date are parsed in `into_query`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub booking_kind: String,
    pub source: String,
    pub destination: String,
    pub date: String,
    pub travel_class: Option<String>,
    pub passengers: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub travel_class: Option<String>,
    pub passengers: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/search", get(search_schedules))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/v1/schedules/{kind}/{id}/quote", get(quote_schedule))
}

fn parse_class(raw: Option<&str>) -> Result<TravelClass, AppError> {
    match raw {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(TravelClass::default()),
    }
}

impl SearchParams {
    fn into_query(self) -> Result<SearchQuery, AppError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|_| {
            AppError::ValidationError(format!("date '{}' is not in YYYY-MM-DD form", self.date))
        })?;
        Ok(SearchQuery {
            booking_kind: self.booking_kind.parse()?,
            travel_class: parse_class(self.travel_class.as_deref())?,
            passengers: self.passengers.unwrap_or(1),
            source: self.source,
            destination: self.destination,
            date,
        })
    }
}

async fn search_schedules(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<SearchParams>,
) -> Result<Json<Vec<ScheduleOption>>, AppError> {
    let query = params.into_query()?;
    let results = state.engine.search(&query).await?;
    Ok(Json(results))
}

async fn quote_schedule(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedPath((kind, id)): ValidatedPath<(String, i64)>,
    ValidatedQuery(params): ValidatedQuery<QuoteParams>,
) -> Result<Json<FareQuote>, AppError> {
    let kind: BookingKind = kind.parse()?;
    let quote = state
        .engine
        .quote(
            &actor,
            ScheduleRef::new(kind, id),
            parse_class(params.travel_class.as_deref())?,
            params.passengers.unwrap_or(1),
        )
        .await?;
    Ok(Json(quote))
}
