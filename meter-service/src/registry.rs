use std::collections::HashSet;

use meter_client::domain::{TableIdent, TableIdentError};

use crate::error::CoreError;

/// Machines of the plant deployment, in dashboard order.
pub const DEFAULT_STREAM_IDS: [&str; 8] = [
    "120型",
    "sensor_data1",
    "sensor_data2",
    "冰水機",
    "空壓機",
    "破碎機(220V)",
    "雕刻機",
    "攪拌機A",
];

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("stream '{0}' is declared more than once")]
    Duplicate(String),
    #[error("stream '{id}' has an invalid table name: {source}")]
    Table {
        id: String,
        #[source]
        source: TableIdentError,
    },
}

/// A registered stream and the storage table it lives in.
///
/// Handles are only handed out by [`StreamRegistry`], so holding one means the
/// identifier has already been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    id: String,
    table: TableIdent,
}

impl StreamHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &TableIdent {
        &self.table
    }
}

/// Fixed allow-list of known streams, built from configuration at startup.
#[derive(Debug, Clone)]
pub struct StreamRegistry {
    streams: Vec<StreamHandle>,
}

impl StreamRegistry {
    /// Build from `(id, table)` pairs; a missing table name means the table is
    /// named after the stream.
    pub fn new<I, S>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (S, Option<S>)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut streams = Vec::new();

        for (id, table) in entries {
            let id: String = id.into();
            if !seen.insert(id.clone()) {
                return Err(RegistryError::Duplicate(id));
            }
            let table_name = table.map(Into::into).unwrap_or_else(|| id.clone());
            let table = TableIdent::new(table_name).map_err(|source| RegistryError::Table {
                id: id.clone(),
                source,
            })?;
            streams.push(StreamHandle { id, table });
        }

        Ok(Self { streams })
    }

    pub fn from_ids<I, S>(ids: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(|id| (id, None)))
    }

    pub fn is_valid(&self, id: &str) -> bool {
        self.streams.iter().any(|s| s.id == id)
    }

    pub fn all_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.streams.iter().map(|s| s.id.as_str())
    }

    pub fn handles(&self) -> &[StreamHandle] {
        &self.streams
    }

    pub fn resolve(&self, id: &str) -> Result<&StreamHandle, CoreError> {
        self.streams
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::InvalidStream(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ids_keep_declared_order() {
        let registry = StreamRegistry::from_ids(DEFAULT_STREAM_IDS).unwrap();
        let ids: Vec<&str> = registry.all_ids().collect();
        assert_eq!(ids, DEFAULT_STREAM_IDS.to_vec());
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let registry = StreamRegistry::from_ids(DEFAULT_STREAM_IDS).unwrap();
        assert!(registry.is_valid("冰水機"));
        assert!(!registry.is_valid("employees"));
        assert!(matches!(
            registry.resolve("sensor_data1; DROP TABLE employees"),
            Err(CoreError::InvalidStream(_))
        ));
    }

    #[test]
    fn table_defaults_to_stream_id() {
        let registry = StreamRegistry::new(vec![("chiller", Some("chiller_v2")), ("press", None)]).unwrap();
        assert_eq!(registry.resolve("chiller").unwrap().table().name(), "chiller_v2");
        assert_eq!(registry.resolve("press").unwrap().table().quoted(), "\"press\"");
    }

    #[test]
    fn duplicate_ids_are_a_configuration_error() {
        let err = StreamRegistry::from_ids(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(id) if id == "a"));
    }
}
