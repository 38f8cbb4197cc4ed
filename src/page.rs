//! Landing page.

use http::StatusCode;
use tera::{Context, Tera};
use tracing::error;

use crate::config::AppConfig;
use crate::response::Response;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>{{ app_name }}</title>
    <style>
        body {
            font-family: Arial, sans-serif;
            max-width: 800px;
            margin: 50px auto;
            padding: 20px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
        }
        .container {
            background: rgba(255, 255, 255, 0.1);
            padding: 40px;
            border-radius: 10px;
            box-shadow: 0 8px 32px 0 rgba(31, 38, 135, 0.37);
            backdrop-filter: blur(4px);
            border: 1px solid rgba(255, 255, 255, 0.18);
        }
        h1 { margin-top: 0; }
        .version { font-size: 24px; font-weight: bold; color: #ffd700; }
        .info { margin-top: 20px; font-size: 14px; opacity: 0.8; }
    </style>
</head>
<body>
    <div class="container">
        <h1>🚀 {{ app_name }}</h1>
        <p>Current Version: <span class="version">{{ version }}</span></p>
        <div class="info">
            <p>✓ GitOps-managed deployment</p>
            <p>✓ CI/CD with GitHub Actions</p>
            <p>✓ ArgoCD synchronization</p>
        </div>
    </div>
</body>
</html>
"#;

/// Renders the page with name and version HTML-escaped.
pub fn render(config: &AppConfig) -> Result<String, tera::Error> {
    let mut ctx = Context::new();
    ctx.insert("app_name", &config.app_name);
    ctx.insert("version", &config.app_version);
    Tera::one_off(TEMPLATE, &ctx, true)
}

/// `GET /`
pub async fn index(config: &AppConfig) -> Response {
    match render(config) {
        Ok(html) => Response::html(html),
        Err(e) => {
            error!("failed to render landing page: {e}");
            Response::error(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shows_name_and_version() {
        let html = render(&AppConfig::default()).unwrap();

        assert!(html.contains("<title>Demo Flask App</title>"));
        assert!(html.contains("Current Version:"));
        assert!(html.contains(r#"<span class="version">v2.0.1</span>"#));
    }

    #[test]
    fn escapes_markup_in_config() {
        let config = AppConfig {
            app_name: "<script>alert(1)</script>".to_owned(),
            ..AppConfig::default()
        };
        let html = render(&config).unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn index_is_html() {
        let response = index(&AppConfig::default()).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
    }
}
