use time::OffsetDateTime;

use crate::{auth::Caller, error::CoreError, registry::StreamHandle, store::SampleStore, window::Window};

/// Consumption between the two boundary samples of a window.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionDelta {
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
    pub start_watt_hours: f64,
    pub end_watt_hours: f64,
    pub watt_hours: f64,
    /// The counter went backwards between the boundaries (meter reset or
    /// replacement). The value is reported unclamped.
    pub anomalous: bool,
}

impl ConsumptionDelta {
    fn between(start_at: OffsetDateTime, start: f64, end_at: OffsetDateTime, end: f64) -> Self {
        let watt_hours = end - start;
        Self {
            start_at,
            end_at,
            start_watt_hours: start,
            end_watt_hours: end,
            watt_hours,
            anomalous: watt_hours < 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Measured(ConsumptionDelta),
    /// No usable boundary sample in the window.
    Absent,
}

impl Delta {
    pub fn measured(&self) -> Option<&ConsumptionDelta> {
        match self {
            Delta::Measured(d) => Some(d),
            Delta::Absent => None,
        }
    }
}

/// Consumption of one stream over a window.
///
/// Only the first sample at/after `window.start` and the last sample at/before
/// `window.end` (or the most recent sample for an open window) are read;
/// interior samples never affect the result.
pub async fn delta<S>(store: &S, caller: &Caller, stream: &StreamHandle, window: &Window) -> Result<Delta, CoreError>
where
    S: SampleStore + ?Sized,
{
    let first = store
        .first_at_or_after(stream, window.start)
        .await
        .map_err(CoreError::StorageUnavailable)?;

    let Some(first) = first else {
        tracing::debug!(caller = %caller, stream = stream.id(), "no sample at or after window start");
        return Ok(Delta::Absent);
    };

    // The first sample after start lies past the window: nothing inside it.
    if window.end.is_some_and(|end| first.timestamp > end) {
        tracing::debug!(caller = %caller, stream = stream.id(), "no sample inside window");
        return Ok(Delta::Absent);
    }

    let last = match window.end {
        Some(end) => store.last_at_or_before(stream, end).await,
        None => store.latest(stream).await,
    }
    .map_err(CoreError::StorageUnavailable)?;

    let Some(last) = last else {
        tracing::debug!(caller = %caller, stream = stream.id(), "no sample at or before window end");
        return Ok(Delta::Absent);
    };

    let (Some(start_wh), Some(end_wh)) = (first.cumulative_watt_hours, last.cumulative_watt_hours) else {
        tracing::debug!(caller = %caller, stream = stream.id(), "boundary sample without cumulative reading");
        return Ok(Delta::Absent);
    };

    let d = ConsumptionDelta::between(first.timestamp, start_wh, last.timestamp, end_wh);
    if d.anomalous {
        metrics::counter!("delta_anomalous_total", "stream" => stream.id().to_string()).increment(1);
        tracing::warn!(
            caller = %caller,
            stream = stream.id(),
            start_watt_hours = start_wh,
            end_watt_hours = end_wh,
            "cumulative counter decreased inside window"
        );
    }

    Ok(Delta::Measured(d))
}
