use axum::{
    extract::{Path, Query, State},
    Json,
};
use meter_client::domain::BUSINESS_OFFSET;
use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

use crate::{
    aggregate::{latest_total, total_for},
    api::{ApiError, AppState},
    auth::Caller,
    delta::{delta, Delta},
    series::series,
    window::{resolve, ResolvedWindow, WindowRequest},
};

const CHART_TIMESTAMP: &[FormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start_iso: Option<String>,
    pub end_iso: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartParams {
    pub table_name: String,
    pub start_iso: String,
    pub end_iso: String,
}

#[derive(Debug, Serialize)]
pub struct WattHoursResponse {
    pub kilo_watt_hours: f64,
    pub anomalous: bool,
}

#[derive(Debug, Serialize)]
pub struct DailyTotalResponse {
    pub total_kwh: f64,
    pub gaps: Vec<String>,
    pub anomalies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LatestTotalResponse {
    pub total_kwh: f64,
}

#[derive(Debug, Serialize)]
pub struct ChartPoint {
    pub timestamp: String,
    pub watt: f64,
    pub total_watt_hours: f64,
    pub pf: f64,
}

#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub data: Vec<ChartPoint>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn count_request(endpoint: &'static str) {
    metrics::counter!("http_query_requests_total", "endpoint" => endpoint).increment(1);
}

/// Consumption of one stream over a named window (`custom`, `day_shift`,
/// `night_shift`, `since_morning`, `since_business_open`).
pub async fn get_watt_hours(
    State(state): State<AppState>,
    caller: Caller,
    Path((kind, table_name)): Path<(String, String)>,
    Query(params): Query<RangeParams>,
) -> Result<Json<WattHoursResponse>, ApiError> {
    count_request("get_watt_hours");

    let stream = state.registry.resolve(&table_name)?;
    let request = WindowRequest::from_parts(&kind, params.start_iso.as_deref(), params.end_iso.as_deref())?;

    let Some(window) = resolve(&request, OffsetDateTime::now_utc())?.active() else {
        return Ok(Json(WattHoursResponse {
            kilo_watt_hours: 0.0,
            anomalous: false,
        }));
    };

    match delta(state.store.as_ref(), &caller, stream, &window).await? {
        Delta::Measured(d) => Ok(Json(WattHoursResponse {
            kilo_watt_hours: d.watt_hours,
            anomalous: d.anomalous,
        })),
        Delta::Absent => Err(ApiError::NotFound(
            "No data found in the requested time range".to_string(),
        )),
    }
}

/// Fleet consumption since 08:00 today.
pub async fn get_total_daily_kwh(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<DailyTotalResponse>, ApiError> {
    count_request("get_total_daily_kwh");

    let window = resolve(&WindowRequest::SinceBusinessOpen, OffsetDateTime::now_utc())?;
    if window == ResolvedWindow::NotYetOpen {
        tracing::debug!(caller = %caller, "business day not open yet");
    }

    let total = total_for(state.store.as_ref(), &caller, state.registry.handles(), &window).await?;

    Ok(Json(DailyTotalResponse {
        total_kwh: total.watt_hours,
        gaps: total.gaps,
        anomalies: total.anomalies,
    }))
}

/// Sum of every registered stream's latest counter value.
pub async fn get_total_latest_kwh(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<LatestTotalResponse>, ApiError> {
    count_request("get_total_latest_kwh");

    let total_kwh = latest_total(state.store.as_ref(), &caller, state.registry.handles()).await?;
    Ok(Json(LatestTotalResponse { total_kwh }))
}

/// Raw table names from the database catalog. Not filtered by the registry
/// and never used for aggregation.
pub async fn get_tables(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<String>>, ApiError> {
    count_request("get_tables");
    tracing::debug!(caller = %caller, "listing storage tables");

    let tables = state
        .store
        .list_tables()
        .await
        .map_err(crate::error::CoreError::StorageUnavailable)?;
    Ok(Json(tables))
}

/// Chart series for one stream; values rounded to two decimals.
pub async fn get_chart_data(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ChartParams>,
) -> Result<Json<ChartResponse>, ApiError> {
    count_request("get_chart_data");

    let stream = state.registry.resolve(&params.table_name)?;
    let request = WindowRequest::Custom {
        start: params.start_iso,
        end: params.end_iso,
    };
    let window = resolve(&request, OffsetDateTime::now_utc())?
        .active()
        .ok_or_else(|| ApiError::Internal("custom window resolved as not open".to_string()))?;

    let points = series(state.store.as_ref(), &caller, stream, &window).await?;

    let data = points
        .into_iter()
        .map(|p| {
            let timestamp = p
                .timestamp
                .to_offset(BUSINESS_OFFSET)
                .format(CHART_TIMESTAMP)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(ChartPoint {
                timestamp,
                watt: round2(p.watt),
                total_watt_hours: round2(p.cumulative_watt_hours),
                pf: round2(p.power_factor),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(ChartResponse { data }))
}

pub async fn protected(caller: Caller) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("Hello, user {caller}! You are authenticated."),
    })
}
