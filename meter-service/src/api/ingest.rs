use axum::{extract::State, Json};
use meter_client::domain::Reading;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{api::AppState, api::ApiError, ingest::ingest};

/// Device upload body. Field names are fixed by the deployed firmware.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub table_name: String,
    pub voltage: f64,
    pub current: f64,
    pub frequency: f64,
    pub pf: f64,
    pub watt: f64,
    pub total_watt_hours: f64,
}

impl From<&UploadRequest> for Reading {
    fn from(u: &UploadRequest) -> Self {
        Reading {
            voltage: u.voltage,
            current: u.current,
            frequency: u.frequency,
            power_factor: u.pf,
            watt: u.watt,
            cumulative_watt_hours: u.total_watt_hours,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
}

/// Device-facing upload. Devices hold no user token, so this route is not
/// behind the bearer check.
pub async fn upload_data(
    State(state): State<AppState>,
    Json(body): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let reading = Reading::from(&body);
    let ack = ingest(
        state.store.as_ref(),
        &state.registry,
        &body.table_name,
        &reading,
        OffsetDateTime::now_utc(),
    )
    .await?;

    Ok(Json(UploadResponse {
        message: format!("Data successfully inserted into {}", ack.stream_id),
    }))
}
