use time::{macros::offset, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Offset of the business calendar (Asia/Taipei, no DST). Shift and day
/// boundaries are computed in this offset and stored timestamps carry it
/// implicitly.
pub const BUSINESS_OFFSET: UtcOffset = offset!(+8);

/// One telemetry reading as uploaded by a device. The server assigns the
/// timestamp when the reading is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub voltage: f64,
    pub current: f64,
    pub frequency: f64,
    pub power_factor: f64,
    pub watt: f64,
    pub cumulative_watt_hours: f64,
}

/// A stored sample. Every measurement column is nullable in the per-stream
/// tables, so reads surface them as `Option`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: OffsetDateTime,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub frequency: Option<f64>,
    pub power_factor: Option<f64>,
    pub watt: Option<f64>,
    pub cumulative_watt_hours: Option<f64>,
}

impl Sample {
    pub fn from_reading(reading: &Reading, timestamp: OffsetDateTime) -> Self {
        Self {
            timestamp: timestamp.to_offset(BUSINESS_OFFSET),
            voltage: Some(reading.voltage),
            current: Some(reading.current),
            frequency: Some(reading.frequency),
            power_factor: Some(reading.power_factor),
            watt: Some(reading.watt),
            cumulative_watt_hours: Some(reading.cumulative_watt_hours),
        }
    }
}

/// Row layout of a per-stream table. `timestamp` is business-local wall
/// time without an offset.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SampleRow {
    pub timestamp: PrimitiveDateTime,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub frequency: Option<f64>,
    pub pf: Option<f64>,
    pub watt: Option<f64>,
    pub total_watt_hours: Option<f64>,
}

impl From<SampleRow> for Sample {
    fn from(row: SampleRow) -> Self {
        Sample {
            timestamp: row.timestamp.assume_offset(BUSINESS_OFFSET),
            voltage: row.voltage,
            current: row.current,
            frequency: row.frequency,
            power_factor: row.pf,
            watt: row.watt,
            cumulative_watt_hours: row.total_watt_hours,
        }
    }
}

/// Business-local wall time of an instant, as stored in the tables.
pub fn to_business_local(ts: OffsetDateTime) -> PrimitiveDateTime {
    let local = ts.to_offset(BUSINESS_OFFSET);
    PrimitiveDateTime::new(local.date(), local.time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn utc_instant_maps_to_taipei_wall_time() {
        let local = to_business_local(datetime!(2024-03-01 23:30:00 UTC));
        assert_eq!(local, datetime!(2024-03-02 07:30:00));
    }

    #[test]
    fn row_timestamp_is_read_back_in_business_offset() {
        let row = SampleRow {
            timestamp: datetime!(2024-03-02 07:30:00),
            voltage: Some(220.0),
            current: None,
            frequency: Some(60.0),
            pf: Some(0.9),
            watt: None,
            total_watt_hours: Some(1234.5),
        };

        let sample = Sample::from(row);
        assert_eq!(sample.timestamp, datetime!(2024-03-01 23:30:00 UTC));
        assert_eq!(sample.timestamp.offset(), BUSINESS_OFFSET);
        assert_eq!(sample.power_factor, Some(0.9));
        assert_eq!(sample.cumulative_watt_hours, Some(1234.5));
        assert!(sample.watt.is_none());
    }

    #[test]
    fn sample_from_reading_fills_every_column() {
        let reading = Reading {
            voltage: 110.2,
            current: 3.1,
            frequency: 59.9,
            power_factor: 0.87,
            watt: 297.0,
            cumulative_watt_hours: 42.0,
        };
        let sample = Sample::from_reading(&reading, datetime!(2024-01-01 00:00:00 UTC));
        assert_eq!(sample.timestamp, datetime!(2024-01-01 08:00:00 +8));
        assert_eq!(sample.cumulative_watt_hours, Some(42.0));
        assert_eq!(sample.watt, Some(297.0));
    }
}
