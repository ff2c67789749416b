//! Route dispatch: reserved admin paths first, everything else to the matcher.

use crate::admin_api::handlers;
use crate::admin_api::types::text_response;
use crate::config::AdminConfig;
use crate::expectation::Registry;
use crate::server::Shutdown;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

/// Where a request path is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Register an expectation
    Expect,
    /// Verify and reset
    Check,
    /// Stop the server
    Shutdown,
    /// Match against the registry
    Mock,
}

impl Route {
    fn resolve(path: &str, admin: &AdminConfig) -> Self {
        if path == admin.shutdown_path {
            Route::Shutdown
        } else if path == admin.check_path {
            Route::Check
        } else if path == admin.expect_path {
            Route::Expect
        } else {
            Route::Mock
        }
    }
}

/// Routes every request received by the server. Owns the registry for the
/// server's lifetime.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    shutdown: Arc<Shutdown>,
    admin: AdminConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, shutdown: Arc<Shutdown>, admin: AdminConfig) -> Self {
        Self {
            registry,
            shutdown,
            admin,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Main request router
    pub async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Display,
    {
        let route = Route::resolve(req.uri().path(), &self.admin);
        debug!("{} {} -> {:?}", req.method(), req.uri().path(), route);

        // Nothing is matched once shutdown has been acknowledged
        if route != Route::Shutdown && self.shutdown.is_requested() {
            return text_response(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down");
        }

        match route {
            Route::Expect => handlers::handle_expect(req, &self.registry, &self.admin).await,
            Route::Check => handlers::handle_check(&self.registry),
            Route::Shutdown => handlers::handle_shutdown(&self.shutdown),
            Route::Mock => handlers::handle_mock(req, &self.registry, &self.shutdown).await,
        }
    }
}
