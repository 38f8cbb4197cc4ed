//! Process configuration, read once from the environment at startup.
//!
//! Nothing in the handler layer reads environment variables. `main` builds an
//! [`AppConfig`] and hands it to [`app::router`](crate::app::router), which
//! shares it with every handler behind an `Arc`.

use std::path::PathBuf;
use std::time::Duration;

use envconfig::Envconfig;

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq, Envconfig)]
pub struct AppConfig {
    /// Display name shown on the landing page.
    #[envconfig(from = "APP_NAME", default = "Demo Flask App")]
    pub app_name: String,

    /// Display version shown on the landing page.
    #[envconfig(from = "APP_VERSION", default = "v2.0.1")]
    pub app_version: String,

    #[envconfig(from = "HTTP_HOST", default = "0.0.0.0")]
    pub http_host: String,

    #[envconfig(from = "HTTP_PORT", default = "5000")]
    pub http_port: u16,

    /// Mount point sampled by the disk readiness check.
    #[envconfig(from = "DISK_MOUNT", default = "/")]
    pub disk_mount: PathBuf,

    /// Deadline for a single metric read, in milliseconds.
    #[envconfig(from = "METRICS_TIMEOUT_MS", default = "2000")]
    pub metrics_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::init_from_env()?)
    }

    /// `host:port` string accepted by [`Server::bind`](crate::Server::bind).
    ///
    /// IPv6 hosts are bracketed so the result still parses as a socket address.
    pub fn bind_addr(&self) -> String {
        if self.http_host.contains(':') {
            format!("[{}]:{}", self.http_host, self.http_port)
        } else {
            format!("{}:{}", self.http_host, self.http_port)
        }
    }

    pub fn metrics_timeout(&self) -> Duration {
        Duration::from_millis(self.metrics_timeout_ms)
    }
}

/// Same values as an empty environment. Used by tests and embedders that
/// do not want to touch process env.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Demo Flask App".to_owned(),
            app_version: "v2.0.1".to_owned(),
            http_host: "0.0.0.0".to_owned(),
            http_port: 5000,
            disk_mount: PathBuf::from("/"),
            metrics_timeout_ms: 2000,
        }
    }
}
