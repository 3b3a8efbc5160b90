//! Auto-scanning bootstrap module.
//!
//! Runs the scan → classify → extract → bind pipeline over the registry:
//! modules first, then filters, then servlets. Module installation
//! failures are isolated per class; a misconfigured filter or servlet
//! (zero URL patterns) is a build-time error and halts bootstrap before
//! any later phase runs.

use crate::binding::{Binder, BindingRecord};
use crate::registry::{PackageScanSpec, RegistryScanner, ScanEntry, is_filter, is_module, is_servlet};
use crate::{Container, Error, Router};
use trellis_log::info;

/// Diagnostic summary of one bootstrap scan. Counts and names only; no
/// behavioral effect.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Module entries found under the scan roots.
    pub modules: Vec<&'static str>,
    /// Modules that were actually constructed and installed.
    pub installed_modules: Vec<&'static str>,
    /// Binding records produced for filters, in binding order.
    pub filters: Vec<BindingRecord>,
    /// Binding records produced for servlets, in binding order.
    pub servlets: Vec<BindingRecord>,
}

/// Scans the registry under a package spec and binds everything it finds.
pub struct AutoScanModule {
    scanner: RegistryScanner,
}

impl AutoScanModule {
    pub fn new(spec: PackageScanSpec) -> Self {
        Self {
            scanner: RegistryScanner::new(spec),
        }
    }

    /// Convenience constructor from raw package roots.
    pub fn from_packages<I, S>(packages: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(PackageScanSpec::new(packages)?))
    }

    /// Run the three scan phases. Fatal on the first misconfigured filter
    /// or servlet; module failures are skipped with a warning.
    pub fn configure(
        &self,
        container: &Container,
        router: &mut Router,
    ) -> Result<ScanReport, Error> {
        info!(
            "Scanning for servlet, filter and module classes in packages:\n  {}",
            self.scanner.spec().packages().join("\n  ")
        );

        let mut report = ScanReport::default();
        let mut binder = Binder::new(container, router);

        // Phase 1: modules. Per-class failures are recoverable.
        let modules = self.scanner.find_by(is_module);
        for entry in &modules {
            if let Some(name) = binder.install_module(entry) {
                report.installed_modules.push(name);
            }
        }
        report.modules = type_names(&modules);
        log_found("Module", &report.modules);

        // Phase 2: filters. A zero-pattern filter halts bootstrap here,
        // before any servlet is bound.
        let filters = self.scanner.find_by(is_filter);
        for entry in &filters {
            report.filters.push(binder.bind_filter(entry)?);
        }
        log_found("Filter", &type_names(&filters));

        // Phase 3: servlets.
        let servlets = self.scanner.find_by(is_servlet);
        for entry in &servlets {
            report.servlets.push(binder.bind_servlet(entry)?);
        }
        log_found("Servlet", &type_names(&servlets));

        Ok(report)
    }
}

fn type_names(entries: &[&'static ScanEntry]) -> Vec<&'static str> {
    entries.iter().map(|e| e.type_name).collect()
}

fn log_found(category: &str, names: &[&'static str]) {
    if names.is_empty() {
        info!("No {} classes found", category.to_lowercase());
    } else {
        info!("{} classes found:\n  {}", category, names.join("\n  "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpRequest;

    // Fixture hierarchy scanned by the tests below. Each scenario gets its
    // own package root so scans stay isolated.

    mod app {
        pub mod servlets {
            use crate::{Error, HttpRequest, HttpResponse, InitParams};
            use async_trait::async_trait;

            #[derive(Default)]
            pub struct ApiServlet;

            #[async_trait]
            impl crate::Servlet for ApiServlet {
                async fn handle(
                    &self,
                    _request: HttpRequest,
                    config: &InitParams,
                ) -> Result<HttpResponse, Error> {
                    let mode = config.get("mode").unwrap_or("unknown").to_string();
                    Ok(HttpResponse::ok().with_text(&mode))
                }
            }

            crate::register_servlet!(ApiServlet, ["/api/*"], [("mode", "prod")]);
        }

        pub mod filters {
            use crate::{Error, HttpRequest, HttpResponse, InitParams, Next};
            use async_trait::async_trait;

            #[derive(Default)]
            pub struct HeaderFilter;

            #[async_trait]
            impl crate::Filter for HeaderFilter {
                async fn handle(
                    &self,
                    request: HttpRequest,
                    _config: &InitParams,
                    next: Next,
                ) -> Result<HttpResponse, Error> {
                    let response = next(request).await?;
                    Ok(response.with_header("X-Filtered".to_string(), "1".to_string()))
                }
            }

            crate::register_filter!(HeaderFilter, ["/*"]);
        }

        pub mod modules {
            use crate::Container;

            pub struct AuditService {
                pub enabled: bool,
            }

            impl crate::Provider for AuditService {}

            #[derive(Default)]
            pub struct AuditModule;

            impl crate::BootModule for AuditModule {
                fn name(&self) -> &str {
                    "AuditModule"
                }

                fn configure(&self, container: &Container) {
                    container.register(AuditService { enabled: true });
                }
            }

            crate::register_module!(AuditModule);
        }
    }

    mod broken {
        pub mod modules {
            use crate::Error;

            pub struct LockedModule;

            impl crate::BootModule for LockedModule {
                fn name(&self) -> &str {
                    "LockedModule"
                }

                fn configure(&self, _container: &crate::Container) {}
            }

            crate::register_module!(LockedModule, || Err(Error::Instantiation(
                "constructor is not accessible".to_string()
            )));
        }

        pub mod filters {
            use crate::{Error, HttpRequest, HttpResponse, InitParams, Next};
            use async_trait::async_trait;

            #[derive(Default)]
            pub struct PatternlessFilter;

            #[async_trait]
            impl crate::Filter for PatternlessFilter {
                async fn handle(
                    &self,
                    request: HttpRequest,
                    _config: &InitParams,
                    next: Next,
                ) -> Result<HttpResponse, Error> {
                    next(request).await
                }
            }

            crate::register_filter!(PatternlessFilter, []);
        }

        pub mod servlets {
            use crate::{Error, HttpRequest, HttpResponse, InitParams};
            use async_trait::async_trait;

            #[derive(Default)]
            pub struct OrphanServlet;

            #[async_trait]
            impl crate::Servlet for OrphanServlet {
                async fn handle(
                    &self,
                    _request: HttpRequest,
                    _config: &InitParams,
                ) -> Result<HttpResponse, Error> {
                    Ok(HttpResponse::ok())
                }
            }

            crate::register_servlet!(OrphanServlet, ["/orphan"]);
        }
    }

    const APP_ROOT: &str = "trellis_core::scanning::tests::app";
    const BROKEN_MODULES: &str = "trellis_core::scanning::tests::broken::modules";
    const BROKEN_FILTERS: &str = "trellis_core::scanning::tests::broken::filters";
    const BROKEN_SERVLETS: &str = "trellis_core::scanning::tests::broken::servlets";

    #[test]
    fn test_scan_binds_all_categories() {
        let container = Container::new();
        let mut router = Router::new();
        let scan = AutoScanModule::from_packages([APP_ROOT]).unwrap();

        let report = scan.configure(&container, &mut router).unwrap();

        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.installed_modules.len(), 1);
        assert_eq!(report.filters.len(), 1);
        assert_eq!(report.servlets.len(), 1);

        assert!(container.has::<app::modules::AuditService>());
        assert_eq!(router.servlet_count(), 1);
        assert_eq!(router.filter_count(), 1);
    }

    #[test]
    fn test_scan_produces_expected_record() {
        let container = Container::new();
        let mut router = Router::new();
        let scan = AutoScanModule::from_packages([APP_ROOT]).unwrap();

        let report = scan.configure(&container, &mut router).unwrap();

        let record = &report.servlets[0];
        assert!(record.type_name.ends_with("ApiServlet"));
        assert_eq!(record.primary_pattern(), "/api/*");
        assert_eq!(record.init_params.get("mode"), Some("prod"));
    }

    #[test]
    fn test_broken_module_is_skipped() {
        let container = Container::new();
        let mut router = Router::new();
        let scan = AutoScanModule::from_packages([BROKEN_MODULES]).unwrap();

        let report = scan.configure(&container, &mut router).unwrap();

        assert_eq!(report.modules.len(), 1);
        assert!(report.installed_modules.is_empty());
        assert!(container.is_empty());
    }

    #[test]
    fn test_zero_pattern_filter_halts_before_servlets() {
        let container = Container::new();
        let mut router = Router::new();
        // Both the patternless filter and a perfectly fine servlet are in
        // scope; the filter phase must abort before the servlet binds.
        let scan = AutoScanModule::from_packages([BROKEN_FILTERS, BROKEN_SERVLETS]).unwrap();

        let result = scan.configure(&container, &mut router);

        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(router.servlet_count(), 0);
    }

    #[test]
    fn test_empty_scan_is_not_an_error() {
        let container = Container::new();
        let mut router = Router::new();
        let scan = AutoScanModule::from_packages(["no::such::package"]).unwrap();

        let report = scan.configure(&container, &mut router).unwrap();

        assert!(report.modules.is_empty());
        assert!(report.filters.is_empty());
        assert!(report.servlets.is_empty());
    }

    #[test]
    fn test_dispatch_through_scanned_bindings() {
        let container = Container::new();
        let mut router = Router::new();
        let scan = AutoScanModule::from_packages([APP_ROOT]).unwrap();
        scan.configure(&container, &mut router).unwrap();

        let response = tokio_test::block_on(
            router.dispatch(HttpRequest::new("GET", "/api/users")),
        )
        .unwrap();

        assert_eq!(response.body, b"prod".to_vec());
        assert_eq!(response.headers.get("X-Filtered"), Some(&"1".to_string()));
    }
}
