//! # probe-demo
//!
//! A small demonstration web server: one landing page and the three
//! Kubernetes probe endpoints.
//!
//! | Path | Answer |
//! |---|---|
//! | `GET /` | HTML page with the app name and version |
//! | `GET /healthz/live` | always `200 {"status":"ok","check":"liveness"}` |
//! | `GET /healthz/ready` | `200` or `503` from the memory/disk [`readiness`] policy |
//! | `GET /healthz` | same as `/healthz/ready` |
//! | anything else | `404 {"error":"Not found","status":404}` |
//!
//! ## Layout
//!
//! - [`readiness`]: the policy. Pure: two readings in, one verdict out.
//! - [`metrics`]: where readings come from, with a deadline on each read.
//! - [`health`], [`page`], [`app`]: handlers and the route table.
//! - [`Router`], [`Server`], [`Request`], [`Response`]: a thin layer over
//!   hyper with radix-tree routing via [`matchit`] and graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use probe_demo::{AppConfig, AppState, Server, SystemMetrics, app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), probe_demo::Error> {
//!     let config = AppConfig::from_env()?;
//!     let addr = config.bind_addr();
//!     let router = app::router(AppState::new(config, SystemMetrics));
//!     Server::bind(&addr)?.serve(router).await
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod config;
pub mod health;
pub mod metrics;
pub mod page;
pub mod readiness;

pub use app::AppState;
pub use config::AppConfig;
pub use error::Error;
pub use handler::Handler;
pub use metrics::{MetricReadError, MetricsSource, SystemMetrics};
pub use request::Request;
pub use response::{IntoResponse, Json, Response};
pub use router::Router;
pub use server::Server;
