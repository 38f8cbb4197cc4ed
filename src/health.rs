//! Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz/live` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/healthz/ready` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//! | **Legacy** | `/healthz` | Same answer as readiness, for older probe configs. |
//!
//! Readiness body:
//!
//! ```json
//! {"status":"ready","checks":{"memory":"ok: 41.3%","disk":"warning: 84.0%","flask":"ok"}}
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::app::AppState;
use crate::metrics::MetricsSource;
use crate::readiness::{self, Label, ReadinessVerdict};
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};

/// Key under `checks` reporting the HTTP layer itself. Always `"ok"`: if this
/// body was produced, the layer works. Existing dashboards read this name.
pub const SERVER_CHECK: &str = "flask";

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
    check: &'static str,
}

/// Liveness probe. Always `200` with `{"status":"ok","check":"liveness"}`;
/// never looks at system metrics.
pub async fn liveness(_req: Request) -> Response {
    Json(Liveness { status: "ok", check: "liveness" }).into_response()
}

/// Readiness probe. Samples memory and disk, evaluates, answers `200` or `503`.
pub async fn readiness<M: MetricsSource>(state: Arc<AppState<M>>) -> Response {
    let sample = state.sampler.sample().await;

    let verdict = readiness::evaluate(sample.memory, sample.disk);

    for check in verdict.checks.iter().filter(|c| c.label == Label::Error) {
        warn!(check = check.name, detail = %check.detail, "metric read failed");
    }
    if !verdict.is_ready() {
        warn!(status = verdict.status_code.as_u16(), "not ready");
    }

    verdict_response(&verdict)
}

/// Legacy combined probe: the readiness answer, unchanged.
pub async fn legacy<M: MetricsSource>(state: Arc<AppState<M>>) -> Response {
    readiness(state).await
}

/// Maps a verdict to its wire form and status code.
pub fn verdict_response(verdict: &ReadinessVerdict) -> Response {
    let mut checks = Map::new();
    for check in &verdict.checks {
        checks.insert(check.name.to_owned(), Value::from(check.detail.as_str()));
    }
    checks.insert(SERVER_CHECK.to_owned(), Value::from("ok"));

    let body = serde_json::json!({
        "status": verdict.overall.as_str(),
        "checks": checks,
    });
    (verdict.status_code, Json(body)).into_response()
}
