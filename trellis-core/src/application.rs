// Application bootstrapper and HTTP server

use crate::binding::InitParams;
use crate::scanning::{AutoScanModule, ScanReport};
use crate::{BootModule, Container, Error, HttpRequest, HttpResponse, Router};
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use trellis_log::{debug, error, info};

/// Declarative description of an application: its name, the package roots
/// to scan, and any modules installed explicitly before scanning.
pub struct AppDescriptor {
    name: String,
    packages: Vec<String>,
    modules: Vec<Box<dyn BootModule>>,
}

impl AppDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Add a package root to scan.
    pub fn scan(mut self, package: impl Into<String>) -> Self {
        self.packages.push(package.into());
        self
    }

    /// Install a module before scanning runs (e.g. a persistence unit).
    pub fn module<M: BootModule>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Application name, normalized to a leading slash.
    pub fn name(&self) -> String {
        if self.name.starts_with('/') {
            self.name.clone()
        } else {
            format!("/{}", self.name)
        }
    }
}

/// A bootstrapped application: the DI container, the router holding every
/// binding, and the diagnostic scan report.
pub struct Application {
    container: Container,
    router: Arc<Router>,
    report: ScanReport,
    name: String,
}

impl Application {
    /// Run the bootstrap sequence: install explicit modules, then scan and
    /// bind modules, filters, and servlets. All-or-nothing; a fatal error
    /// leaves no partially constructed application behind.
    pub fn bootstrap(descriptor: AppDescriptor) -> Result<Self, Error> {
        let name = descriptor.name();
        info!("Bootstrapping application '{}'", name);

        let container = Container::new();
        let mut router = Router::new();

        for module in &descriptor.modules {
            debug!("Installing module '{}'", module.name());
            module.configure(&container);
            for (pattern, filter) in module.filters() {
                router.filter(&pattern, filter, InitParams::new());
            }
        }

        let scan = AutoScanModule::from_packages(descriptor.packages)?;
        let report = scan.configure(&container, &mut router)?;

        info!("Application '{}' bootstrap complete", name);

        Ok(Self {
            container,
            router: Arc::new(router),
            report,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a reference to the DI container
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Diagnostic summary of the bootstrap scan.
    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    /// Start the HTTP server on the specified port
    pub async fn listen(self, port: u16) -> Result<(), Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;

        info!("Application '{}' listening on http://{}", self.name, addr);

        let router = self.router.clone();

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = router.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let router = router.clone();
                    async move { handle_request(req, router).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    let method = req.method().to_string();
    let path = req.uri().path_and_query().map_or_else(
        || req.uri().path().to_string(),
        |pq| pq.as_str().to_string(),
    );

    let mut request = HttpRequest::new(method, path);

    for (name, value) in req.headers() {
        if let Ok(value_str) = value.to_str() {
            request
                .headers
                .insert(name.to_string(), value_str.to_string());
        }
    }

    let body_bytes = req.collect().await?.to_bytes();
    request.body = body_bytes.to_vec();

    let response = match router.dispatch(request).await {
        Ok(resp) => resp,
        Err(err) => {
            let status = err.status_code();
            let body = serde_json::json!({
                "error": err.to_string(),
                "status": status,
            });
            HttpResponse::new(status)
                .with_json(&body)
                .unwrap_or_else(|_| HttpResponse::internal_server_error())
        }
    };

    let mut builder = Response::builder().status(response.status);

    for (key, value) in response.headers {
        builder = builder.header(key, value);
    }

    let body = Full::new(bytes::Bytes::from(response.body));
    Ok(builder.body(body).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_name_normalization() {
        assert_eq!(AppDescriptor::new("shop").name(), "/shop");
        assert_eq!(AppDescriptor::new("/shop").name(), "/shop");
    }

    #[test]
    fn test_bootstrap_requires_scan_packages() {
        let result = Application::bootstrap(AppDescriptor::new("empty"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_bootstrap_with_unpopulated_package_completes() {
        let app =
            Application::bootstrap(AppDescriptor::new("bare").scan("no::such::package")).unwrap();
        assert_eq!(app.name(), "/bare");
        assert!(app.report().servlets.is_empty());
    }

    #[test]
    fn test_explicit_module_installed_before_scan() {
        struct Settings {
            greeting: &'static str,
        }
        impl crate::Provider for Settings {}

        struct SettingsModule;
        impl BootModule for SettingsModule {
            fn name(&self) -> &str {
                "SettingsModule"
            }

            fn configure(&self, container: &Container) {
                container.register(Settings { greeting: "hello" });
            }
        }

        let app = Application::bootstrap(
            AppDescriptor::new("greeter")
                .scan("no::such::package")
                .module(SettingsModule),
        )
        .unwrap();

        let settings = app.container().resolve::<Settings>().unwrap();
        assert_eq!(settings.greeting, "hello");
    }
}
