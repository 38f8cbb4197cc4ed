//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. Unmatched requests get
//! the JSON 404 envelope; a handler that panics gets the JSON 500 envelope
//! and takes nothing else down with it.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Paths are matched exactly.
    ///
    /// # Panics
    ///
    /// Panics if `path` conflicts with an already registered route or is not
    /// valid `matchit` syntax. Routes are static, so this fires at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Option<BoxedHandler> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        Some(Arc::clone(matched.value))
    }

    /// Routes one request and produces one response. Never fails: misses
    /// become 404, handler panics become 500.
    pub async fn handle(&self, req: Request) -> Response {
        let Some(handler) = self.lookup(req.method(), req.path()) else {
            return Response::error(StatusCode::NOT_FOUND);
        };

        let path = req.path().to_owned();
        match tokio::spawn(handler.call(req)).await {
            Ok(response) => response,
            Err(e) => {
                error!(%path, "handler failed: {e}");
                Response::error(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
