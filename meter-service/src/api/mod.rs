use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{auth::JwtVerifier, registry::StreamRegistry, store::SampleStore};

pub mod error;
pub mod ingest;
pub mod query;

pub use error::ApiError;

/// Shared handles injected into every request. Created once at startup.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<dyn SampleStore>,
    pub registry: Arc<StreamRegistry>,
    pub verifier: Arc<JwtVerifier>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload_data", post(ingest::upload_data))
        .route("/api/get_tables", get(query::get_tables))
        .route("/api/get_total_daily_kwh", get(query::get_total_daily_kwh))
        .route("/api/get_total_latest_kwh", get(query::get_total_latest_kwh))
        .route("/api/get_watt_hours/:kind/:table_name", get(query::get_watt_hours))
        .route("/api/get_chart_data", get(query::get_chart_data))
        .route("/api/protected", get(query::protected))
        .with_state(state)
}

/// CORS policy from configured origins. `*` allows any origin; credentials
/// are never allowed since auth travels in the `Authorization` header.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(allowed)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{auth::issue_test_token, store::MemoryStore};

    pub const SECRET: &str = "test-secret";

    pub fn state(store: Arc<MemoryStore>, ids: &[&str]) -> AppState {
        AppState {
            store,
            registry: Arc::new(StreamRegistry::from_ids(ids.iter().copied()).unwrap()),
            verifier: Arc::new(JwtVerifier::new(SECRET)),
        }
    }

    pub fn bearer() -> String {
        format!("Bearer {}", issue_test_token(SECRET, "42"))
    }

    pub async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
