use meter_client::domain::Sample;
use time::OffsetDateTime;

use crate::{auth::Caller, error::CoreError, registry::StreamHandle, store::SampleStore, window::Window};

/// One chart point. `cumulative_watt_hours` is relative to the first sample
/// of the window.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: OffsetDateTime,
    pub watt: f64,
    pub cumulative_watt_hours: f64,
    pub power_factor: f64,
}

/// Re-base cumulative readings on the first sample.
///
/// A null base counts as 0.0, a null row reading yields 0.0, and missing
/// watt / power factor read as 0.0. Counter resets show up as a drop.
pub fn project(samples: &[Sample]) -> Vec<SeriesPoint> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    let base = first.cumulative_watt_hours.unwrap_or(0.0);

    samples
        .iter()
        .map(|s| SeriesPoint {
            timestamp: s.timestamp,
            watt: s.watt.unwrap_or(0.0),
            cumulative_watt_hours: s.cumulative_watt_hours.map_or(0.0, |v| v - base),
            power_factor: s.power_factor.unwrap_or(0.0),
        })
        .collect()
}

/// Ordered chart series of one stream over `[window.start, window.end]`.
pub async fn series<S>(
    store: &S,
    caller: &Caller,
    stream: &StreamHandle,
    window: &Window,
) -> Result<Vec<SeriesPoint>, CoreError>
where
    S: SampleStore + ?Sized,
{
    let samples = store
        .range(stream, window.start, window.end)
        .await
        .map_err(CoreError::StorageUnavailable)?;

    tracing::debug!(caller = %caller, stream = stream.id(), rows = samples.len(), "chart series");
    Ok(project(&samples))
}
