//! Route table and shared handler state.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::health;
use crate::metrics::{MetricsSource, Sampler};
use crate::page;
use crate::request::Request;
use crate::router::Router;

/// Immutable state shared by every handler for the life of the process.
pub struct AppState<M> {
    pub config: AppConfig,
    pub sampler: Sampler<M>,
}

impl<M: MetricsSource> AppState<M> {
    pub fn new(config: AppConfig, metrics: M) -> Self {
        let sampler = Sampler::new(metrics, config.disk_mount.clone(), config.metrics_timeout());
        Self { config, sampler }
    }
}

/// Builds the full route table:
///
/// | Path | Handler |
/// |---|---|
/// | `/` | [`page::index`] |
/// | `/healthz` | [`health::legacy`] |
/// | `/healthz/live` | [`health::liveness`] |
/// | `/healthz/ready` | [`health::readiness`] |
pub fn router<M: MetricsSource>(state: AppState<M>) -> Router {
    let state = Arc::new(state);

    let index = {
        let state = Arc::clone(&state);
        move |_req: Request| {
            let state = Arc::clone(&state);
            async move { page::index(&state.config).await }
        }
    };
    let ready = {
        let state = Arc::clone(&state);
        move |_req: Request| health::readiness(Arc::clone(&state))
    };
    let legacy = move |_req: Request| health::legacy(Arc::clone(&state));

    Router::new()
        .get("/", index)
        .get("/healthz", legacy)
        .get("/healthz/live", health::liveness)
        .get("/healthz/ready", ready)
}
