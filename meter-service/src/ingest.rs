use meter_client::domain::{Reading, BUSINESS_OFFSET};
use time::OffsetDateTime;

use crate::{error::CoreError, registry::StreamRegistry, store::SampleStore};

/// Acknowledgement of a committed sample.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestAck {
    pub stream_id: String,
    pub timestamp: OffsetDateTime,
}

/// Pure validation of a device reading.
///
/// Rules:
/// - every field must be a finite number.
/// - the cumulative counter must be non-negative (a reset brings it near zero,
///   never below).
pub fn validate_reading(reading: &Reading) -> Result<(), CoreError> {
    let fields = [
        ("voltage", reading.voltage),
        ("current", reading.current),
        ("frequency", reading.frequency),
        ("pf", reading.power_factor),
        ("watt", reading.watt),
        ("total_watt_hours", reading.cumulative_watt_hours),
    ];

    if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(CoreError::InvalidReading(format!("{name} must be a finite number")));
    }

    if reading.cumulative_watt_hours < 0.0 {
        return Err(CoreError::InvalidReading(
            "total_watt_hours must be non-negative".to_string(),
        ));
    }

    Ok(())
}

/// Validate and append one reading to a registered stream.
///
/// The sample is stamped with `now` in business time; device clocks are not
/// trusted. A store failure is returned as-is, with nothing written.
pub async fn ingest<S>(
    store: &S,
    registry: &StreamRegistry,
    stream_id: &str,
    reading: &Reading,
    now: OffsetDateTime,
) -> Result<IngestAck, CoreError>
where
    S: SampleStore + ?Sized,
{
    let stream = match registry.resolve(stream_id) {
        Ok(stream) => stream,
        Err(e) => {
            metrics::counter!("ingest_rejected_total", "reason" => "invalid_stream").increment(1);
            return Err(e);
        }
    };

    if let Err(e) = validate_reading(reading) {
        metrics::counter!("ingest_rejected_total", "reason" => "invalid_reading").increment(1);
        return Err(e);
    }

    let timestamp = now.to_offset(BUSINESS_OFFSET);

    if let Err(e) = store.append(stream, reading, timestamp).await {
        tracing::error!(stream = stream.id(), error = %format!("{e:#}"), "failed to write sample");
        metrics::counter!("ingest_failed_total").increment(1);
        return Err(CoreError::StorageUnavailable(e));
    }

    metrics::counter!("ingest_samples_total", "stream" => stream.id().to_string()).increment(1);

    Ok(IngestAck {
        stream_id: stream.id().to_string(),
        timestamp,
    })
}
