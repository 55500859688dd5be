use futures::future::try_join_all;

use crate::{
    auth::Caller,
    delta::{delta, Delta},
    error::CoreError,
    registry::StreamHandle,
    store::SampleStore,
    window::ResolvedWindow,
};

/// Fleet-wide consumption over a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetTotal {
    pub watt_hours: f64,
    /// Streams with no usable data in the window; they contribute 0.
    pub gaps: Vec<String>,
    /// Streams whose counter went backwards; excluded from the sum.
    pub anomalies: Vec<String>,
}

/// Sum per-stream deltas over `streams`, in the order given.
///
/// Absent and anomalous streams contribute nothing. Any storage failure
/// fails the whole total. A window that is not yet open is zero without
/// touching storage.
pub async fn total_for<'a, S, I>(
    store: &S,
    caller: &Caller,
    streams: I,
    window: &ResolvedWindow,
) -> Result<FleetTotal, CoreError>
where
    S: SampleStore + ?Sized,
    I: IntoIterator<Item = &'a StreamHandle>,
{
    let window = match window {
        ResolvedWindow::Active(w) => w,
        ResolvedWindow::NotYetOpen => return Ok(FleetTotal::default()),
    };

    let streams: Vec<&StreamHandle> = streams.into_iter().collect();
    let deltas = try_join_all(streams.iter().map(|s| delta(store, caller, s, window))).await?;

    let mut total = FleetTotal::default();
    for (stream, d) in streams.iter().zip(deltas) {
        match d {
            Delta::Measured(d) if d.anomalous => {
                tracing::warn!(
                    stream = stream.id(),
                    start_watt_hours = d.start_watt_hours,
                    end_watt_hours = d.end_watt_hours,
                    "latest reading below window start; excluded from fleet total"
                );
                metrics::counter!("aggregate_anomalies_excluded_total").increment(1);
                total.anomalies.push(stream.id().to_string());
            }
            Delta::Measured(d) => total.watt_hours += d.watt_hours,
            Delta::Absent => {
                tracing::info!(stream = stream.id(), "not enough data in window for fleet total");
                metrics::counter!("aggregate_gaps_total").increment(1);
                total.gaps.push(stream.id().to_string());
            }
        }
    }

    Ok(total)
}

/// Fleet sum of each stream's most recent cumulative reading.
///
/// Streams without data (or with a null counter) contribute 0; a storage
/// failure fails the call.
pub async fn latest_total<'a, S, I>(store: &S, caller: &Caller, streams: I) -> Result<f64, CoreError>
where
    S: SampleStore + ?Sized,
    I: IntoIterator<Item = &'a StreamHandle>,
{
    let latest = try_join_all(streams.into_iter().map(|s| store.latest(s)))
        .await
        .map_err(CoreError::StorageUnavailable)?;

    let sum: f64 = latest
        .iter()
        .filter_map(|s| s.as_ref().and_then(|s| s.cumulative_watt_hours))
        .sum();

    tracing::debug!(caller = %caller, total_watt_hours = sum, "fleet latest total");
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        delta::test_support::sample,
        registry::StreamRegistry,
        store::MemoryStore,
        window::{resolve, Window, WindowRequest},
    };
    use time::macros::datetime;

    fn today() -> ResolvedWindow {
        ResolvedWindow::Active(Window {
            start: datetime!(2024-06-12 08:00:00 +8),
            end: None,
        })
    }

    async fn fleet() -> (MemoryStore, StreamRegistry) {
        let store = MemoryStore::new();
        // ok: +50
        store.insert("ok", sample(datetime!(2024-06-12 08:05:00 +8), Some(1000.0))).await;
        store.insert("ok", sample(datetime!(2024-06-12 11:00:00 +8), Some(1050.0))).await;
        // reset: latest below start
        store.insert("reset", sample(datetime!(2024-06-12 08:01:00 +8), Some(900.0))).await;
        store.insert("reset", sample(datetime!(2024-06-12 10:00:00 +8), Some(3.0))).await;
        // also ok: +7.5
        store.insert("ok2", sample(datetime!(2024-06-12 09:00:00 +8), Some(10.0))).await;
        store.insert("ok2", sample(datetime!(2024-06-12 09:30:00 +8), Some(17.5))).await;
        // "idle" has only yesterday's data, "empty" has none at all
        store.insert("idle", sample(datetime!(2024-06-11 12:00:00 +8), Some(5.0))).await;

        let registry = StreamRegistry::from_ids(["ok", "reset", "idle", "ok2", "empty"]).unwrap();
        (store, registry)
    }

    #[tokio::test]
    async fn sums_measured_and_skips_gaps_and_anomalies() {
        let (store, registry) = fleet().await;

        let total = total_for(&store, &Caller::new("1"), registry.handles(), &today()).await.unwrap();

        assert_eq!(total.watt_hours, 57.5);
        assert_eq!(total.anomalies, vec!["reset".to_string()]);
        assert_eq!(total.gaps, vec!["idle".to_string(), "empty".to_string()]);
    }

    #[tokio::test]
    async fn stream_silent_during_closed_window_is_a_gap() {
        let store = MemoryStore::new();
        store.insert("offline", sample(datetime!(2024-06-11 07:00:00 +8), Some(500.0))).await;
        store.insert("offline", sample(datetime!(2024-06-11 18:00:00 +8), Some(520.0))).await;
        store.insert("press", sample(datetime!(2024-06-11 09:00:00 +8), Some(40.0))).await;
        store.insert("press", sample(datetime!(2024-06-11 16:00:00 +8), Some(64.0))).await;
        let registry = StreamRegistry::from_ids(["offline", "press"]).unwrap();
        let window = ResolvedWindow::Active(Window {
            start: datetime!(2024-06-11 08:00:00 +8),
            end: Some(datetime!(2024-06-11 17:00:00 +8)),
        });

        let total = total_for(&store, &Caller::new("1"), registry.handles(), &window).await.unwrap();

        assert_eq!(total.watt_hours, 24.0);
        assert_eq!(total.gaps, vec!["offline".to_string()]);
        assert!(total.anomalies.is_empty());
    }

    #[tokio::test]
    async fn one_failing_stream_fails_the_total() {
        let (store, registry) = fleet().await;
        store.fail_table("ok2").await;

        let res = total_for(&store, &Caller::new("1"), registry.handles(), &today()).await;

        assert!(matches!(res, Err(CoreError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn before_business_open_is_zero_without_queries() {
        let (store, registry) = fleet().await;
        let window = resolve(&WindowRequest::SinceBusinessOpen, datetime!(2024-06-12 07:15:00 +8)).unwrap();

        let total = total_for(&store, &Caller::new("1"), registry.handles(), &window).await.unwrap();

        assert_eq!(total, FleetTotal::default());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn latest_total_sums_most_recent_counters() {
        let (store, registry) = fleet().await;

        let sum = latest_total(&store, &Caller::new("1"), registry.handles()).await.unwrap();

        assert_eq!(sum, 1050.0 + 3.0 + 5.0 + 17.5);
    }
}
