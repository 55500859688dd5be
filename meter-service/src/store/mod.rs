use anyhow::Result;
use meter_client::domain::{Reading, Sample};
use time::OffsetDateTime;

use crate::registry::StreamHandle;

#[cfg(test)]
pub mod memory;
pub mod pgwire;

#[cfg(test)]
pub use memory::MemoryStore;
pub use pgwire::PgSampleStore;

/// Time-series storage addressed per stream.
///
/// Implementations must treat `[lower, upper]` bounds as inclusive and
/// return samples ordered by timestamp. Every method is a single round trip;
/// callers never retry.
#[async_trait::async_trait]
pub trait SampleStore: Send + Sync {
    async fn append(&self, stream: &StreamHandle, reading: &Reading, at: OffsetDateTime) -> Result<()>;

    async fn first_at_or_after(&self, stream: &StreamHandle, at: OffsetDateTime) -> Result<Option<Sample>>;

    async fn last_at_or_before(&self, stream: &StreamHandle, at: OffsetDateTime) -> Result<Option<Sample>>;

    async fn latest(&self, stream: &StreamHandle) -> Result<Option<Sample>>;

    async fn range(
        &self,
        stream: &StreamHandle,
        start: OffsetDateTime,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<Sample>>;

    /// Raw table listing from the backing schema, unrelated to the registry.
    async fn list_tables(&self) -> Result<Vec<String>>;
}
