/// Failures of the ingest and query operations.
///
/// The first four variants are caller input errors and are raised before any
/// storage access. `StorageUnavailable` carries the store failure unchanged;
/// nothing in the service retries it.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Invalid table name: {0}")]
    InvalidStream(String),
    #[error("invalid reading: {0}")]
    InvalidReading(String),
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("Invalid shift type: {0}")]
    UnknownWindowKind(String),
    #[error("storage unavailable: {0:#}")]
    StorageUnavailable(anyhow::Error),
}

impl CoreError {
    pub fn is_input_error(&self) -> bool {
        !matches!(self, CoreError::StorageUnavailable(_))
    }
}
