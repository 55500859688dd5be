use serde::Deserialize;
use std::fs;

use crate::registry::{StreamRegistry, DEFAULT_STREAM_IDS};

const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
    #[serde(default = "default_cors_origins")]
    pub cors_allow_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    pub id: String,
    /// Storage table; defaults to `id`.
    pub table: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "default_streams")]
    pub streams: Vec<StreamConfig>,
    pub metrics: Option<MetricsConfig>,
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_streams() -> Vec<StreamConfig> {
    DEFAULT_STREAM_IDS
        .iter()
        .map(|id| StreamConfig {
            id: id.to_string(),
            table: None,
        })
        .collect()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("METER_CONFIG").unwrap_or_else(|_| "meter-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    /// Signing secret for bearer tokens: `auth.jwt_secret`, else the
    /// `JWT_SECRET_KEY` environment variable. Startup fails without one.
    pub fn jwt_secret(&self) -> anyhow::Result<String> {
        if let Some(secret) = self.auth.jwt_secret.as_ref().filter(|s| !s.is_empty()) {
            return Ok(secret.clone());
        }
        match std::env::var(JWT_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => Ok(secret),
            _ => anyhow::bail!("{JWT_SECRET_ENV} is not set and auth.jwt_secret is missing"),
        }
    }

    pub fn registry(&self) -> anyhow::Result<StreamRegistry> {
        let registry = StreamRegistry::new(
            self.streams
                .iter()
                .map(|s| (s.id.clone(), s.table.clone())),
        )?;
        Ok(registry)
    }
}
