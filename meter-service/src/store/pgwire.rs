use anyhow::{Context, Result};
use meter_client::{
    db::sample_queries,
    domain::{Reading, Sample},
};
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{registry::StreamHandle, store::SampleStore};

/// `SampleStore` over a shared sqlx pool. Each call checks a connection out
/// of the pool for the duration of one statement.
#[derive(Clone)]
pub struct PgSampleStore {
    pool: PgPool,
}

impl PgSampleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SampleStore for PgSampleStore {
    async fn append(&self, stream: &StreamHandle, reading: &Reading, at: OffsetDateTime) -> Result<()> {
        sample_queries::insert_sample(&self.pool, stream.table(), reading, at)
            .await
            .with_context(|| format!("insert into '{}'", stream.id()))
    }

    async fn first_at_or_after(&self, stream: &StreamHandle, at: OffsetDateTime) -> Result<Option<Sample>> {
        sample_queries::first_at_or_after(&self.pool, stream.table(), at)
            .await
            .with_context(|| format!("first sample of '{}' at or after {at}", stream.id()))
    }

    async fn last_at_or_before(&self, stream: &StreamHandle, at: OffsetDateTime) -> Result<Option<Sample>> {
        sample_queries::last_at_or_before(&self.pool, stream.table(), at)
            .await
            .with_context(|| format!("last sample of '{}' at or before {at}", stream.id()))
    }

    async fn latest(&self, stream: &StreamHandle) -> Result<Option<Sample>> {
        sample_queries::latest(&self.pool, stream.table())
            .await
            .with_context(|| format!("latest sample of '{}'", stream.id()))
    }

    async fn range(
        &self,
        stream: &StreamHandle,
        start: OffsetDateTime,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<Sample>> {
        sample_queries::samples_between(&self.pool, stream.table(), start, end)
            .await
            .with_context(|| format!("samples of '{}' from {start}", stream.id()))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        sample_queries::list_tables(&self.pool).await.context("list tables")
    }
}
