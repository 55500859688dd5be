use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{bail, Result};
use meter_client::domain::{Reading, Sample};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{registry::StreamHandle, store::SampleStore};

/// In-process `SampleStore` keyed by table name, for unit tests.
///
/// Counts every store call and can be told to fail for particular tables to
/// stand in for an outage.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Sample>>>,
    failing: RwLock<HashSet<String>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sample directly, bypassing the call counter.
    pub async fn insert(&self, table: &str, sample: Sample) {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        let idx = rows.partition_point(|s| s.timestamp <= sample.timestamp);
        rows.insert(idx, sample);
    }

    /// Make every subsequent call touching `table` fail.
    pub async fn fail_table(&self, table: &str) {
        self.failing.write().await.insert(table.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn samples(&self, table: &str) -> Vec<Sample> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    async fn check(&self, stream: &StreamHandle) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().await.contains(stream.table().name()) {
            bail!("connection refused while reading '{}'", stream.table().name());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SampleStore for MemoryStore {
    async fn append(&self, stream: &StreamHandle, reading: &Reading, at: OffsetDateTime) -> Result<()> {
        self.check(stream).await?;
        self.insert(stream.table().name(), Sample::from_reading(reading, at)).await;
        Ok(())
    }

    async fn first_at_or_after(&self, stream: &StreamHandle, at: OffsetDateTime) -> Result<Option<Sample>> {
        self.check(stream).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(stream.table().name())
            .and_then(|rows| rows.iter().find(|s| s.timestamp >= at))
            .cloned())
    }

    async fn last_at_or_before(&self, stream: &StreamHandle, at: OffsetDateTime) -> Result<Option<Sample>> {
        self.check(stream).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(stream.table().name())
            .and_then(|rows| rows.iter().rev().find(|s| s.timestamp <= at))
            .cloned())
    }

    async fn latest(&self, stream: &StreamHandle) -> Result<Option<Sample>> {
        self.check(stream).await?;
        let tables = self.tables.read().await;
        Ok(tables.get(stream.table().name()).and_then(|rows| rows.last()).cloned())
    }

    async fn range(
        &self,
        stream: &StreamHandle,
        start: OffsetDateTime,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<Sample>> {
        self.check(stream).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(stream.table().name())
            .map(|rows| {
                rows.iter()
                    .filter(|s| s.timestamp >= start && end.map_or(true, |end| s.timestamp <= end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
