// Core traits for the Trellis framework

use crate::{Container, Error, HttpRequest, HttpResponse, InitParams};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Trait for types that can be provided by the DI container
pub trait Provider: Send + Sync + 'static {}

/// Continuation handed to a filter; invokes the rest of the chain and
/// finally the matched servlet.
pub type Next = Box<
    dyn FnOnce(HttpRequest) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
        + Send,
>;

/// Trait for request-handling servlets.
///
/// A servlet is constructed once at bind time and shared across all of its
/// registered URL patterns; `config` carries the init-parameters declared
/// at registration.
#[async_trait]
pub trait Servlet: Send + Sync + 'static {
    async fn handle(
        &self,
        request: HttpRequest,
        config: &InitParams,
    ) -> Result<HttpResponse, Error>;
}

/// Trait for filters wrapped around servlet dispatch.
///
/// Filters run in registration order; each decides whether to call `next`.
#[async_trait]
pub trait Filter: Send + Sync + 'static {
    async fn handle(
        &self,
        request: HttpRequest,
        config: &InitParams,
        next: Next,
    ) -> Result<HttpResponse, Error>;
}

/// Trait for configuration modules installed at bootstrap.
///
/// A module registers providers with the DI container and may contribute
/// filter bindings of its own. Construction of scanned modules is the only
/// fallible step; a constructed module configures infallibly.
pub trait BootModule: Send + Sync + 'static {
    /// Human-readable module name used in bootstrap logs.
    fn name(&self) -> &str;

    /// Register providers with the container.
    fn configure(&self, container: &Container);

    /// Filter bindings contributed by this module, mounted after
    /// `configure` runs.
    fn filters(&self) -> Vec<(String, Arc<dyn Filter>)> {
        Vec::new()
    }
}
