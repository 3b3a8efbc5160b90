//! Compile-time scan registry.
//!
//! Servlet, filter, and module types announce themselves through the
//! registration macros, which submit a [`ScanEntry`] to a global registry
//! collected with `inventory`. At bootstrap a [`RegistryScanner`] walks the
//! registry restricted to the application's declared package roots, so only
//! types under those roots are eligible for binding.
//!
//! ```rust
//! use trellis_core::{register_servlet, HttpRequest, HttpResponse, InitParams, Servlet};
//! use async_trait::async_trait;
//!
//! #[derive(Default)]
//! struct StatusServlet;
//!
//! #[async_trait]
//! impl Servlet for StatusServlet {
//!     async fn handle(
//!         &self,
//!         _request: HttpRequest,
//!         _config: &InitParams,
//!     ) -> Result<HttpResponse, trellis_core::Error> {
//!         Ok(HttpResponse::ok())
//!     }
//! }
//!
//! register_servlet!(StatusServlet, ["/status"], [("mode", "prod")]);
//! ```

use crate::{BootModule, Error, Filter, Servlet};
use std::sync::Arc;

// Re-exported so the registration macros work without a direct
// inventory dependency in the calling crate.
pub use inventory;

/// Capability marker declared by a registered type.
///
/// Each entry carries exactly one capability; a type that should serve in
/// two roles must be registered as two types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Module,
    Filter,
    Servlet,
}

/// Constructor for a registered type.
///
/// Servlet and filter construction is infallible; module construction may
/// fail and the failure is recoverable (the module is skipped).
#[derive(Clone, Copy)]
pub enum EntryConstructor {
    Servlet(fn() -> Arc<dyn Servlet>),
    Filter(fn() -> Arc<dyn Filter>),
    Module(fn() -> Result<Box<dyn BootModule>, Error>),
}

/// A discovered type descriptor, submitted at registration time and never
/// mutated afterwards.
pub struct ScanEntry {
    /// Fully qualified type path, captured via `module_path!`.
    pub type_name: &'static str,
    /// Declared URL patterns, in declaration order. First is primary.
    pub url_patterns: &'static [&'static str],
    /// Declared init-parameters, in declaration order.
    pub init_params: &'static [(&'static str, &'static str)],
    /// Constructor; also determines the entry's capability.
    pub constructor: EntryConstructor,
}

inventory::collect!(ScanEntry);

impl ScanEntry {
    /// Create a servlet entry.
    pub const fn servlet(
        type_name: &'static str,
        url_patterns: &'static [&'static str],
        init_params: &'static [(&'static str, &'static str)],
        constructor: fn() -> Arc<dyn Servlet>,
    ) -> Self {
        Self {
            type_name,
            url_patterns,
            init_params,
            constructor: EntryConstructor::Servlet(constructor),
        }
    }

    /// Create a filter entry.
    pub const fn filter(
        type_name: &'static str,
        url_patterns: &'static [&'static str],
        init_params: &'static [(&'static str, &'static str)],
        constructor: fn() -> Arc<dyn Filter>,
    ) -> Self {
        Self {
            type_name,
            url_patterns,
            init_params,
            constructor: EntryConstructor::Filter(constructor),
        }
    }

    /// Create a module entry.
    pub const fn module(
        type_name: &'static str,
        constructor: fn() -> Result<Box<dyn BootModule>, Error>,
    ) -> Self {
        Self {
            type_name,
            url_patterns: &[],
            init_params: &[],
            constructor: EntryConstructor::Module(constructor),
        }
    }

    /// The capability this entry was registered with.
    pub fn capability(&self) -> Capability {
        match self.constructor {
            EntryConstructor::Servlet(_) => Capability::Servlet,
            EntryConstructor::Filter(_) => Capability::Filter,
            EntryConstructor::Module(_) => Capability::Module,
        }
    }
}

impl std::fmt::Debug for ScanEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEntry")
            .field("type_name", &self.type_name)
            .field("capability", &self.capability())
            .field("url_patterns", &self.url_patterns)
            .field("init_params", &self.init_params)
            .finish()
    }
}

/// True if the entry is a configuration module.
pub fn is_module(entry: &ScanEntry) -> bool {
    entry.capability() == Capability::Module
}

/// True if the entry is a request-handling servlet.
pub fn is_servlet(entry: &ScanEntry) -> bool {
    entry.capability() == Capability::Servlet
}

/// True if the entry is a filter.
pub fn is_filter(entry: &ScanEntry) -> bool {
    entry.capability() == Capability::Filter
}

/// The package roots an application scans under. Immutable once built;
/// an empty root list is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageScanSpec {
    packages: Vec<String>,
}

impl PackageScanSpec {
    pub fn new<I, S>(packages: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if packages.is_empty() {
            return Err(Error::Configuration(
                "no packages declared for scanning".to_string(),
            ));
        }
        Ok(Self { packages })
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Whether a fully qualified type name falls under one of the roots.
    /// Matching respects path-segment boundaries: root `app::servlets`
    /// covers `app::servlets::Status` but not `app::servlets_extra::X`.
    pub fn covers(&self, type_name: &str) -> bool {
        self.packages.iter().any(|root| {
            type_name == root
                || (type_name.starts_with(root.as_str())
                    && type_name[root.len()..].starts_with("::"))
        })
    }
}

/// Scans the global registry restricted to a package spec.
pub struct RegistryScanner {
    spec: PackageScanSpec,
}

impl RegistryScanner {
    pub fn new(spec: PackageScanSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &PackageScanSpec {
        &self.spec
    }

    /// All registered entries under the scan roots matching `predicate`,
    /// sorted by type name so binding order and logs are deterministic.
    /// Idempotent; no side effects.
    pub fn find_by<P>(&self, predicate: P) -> Vec<&'static ScanEntry>
    where
        P: Fn(&ScanEntry) -> bool,
    {
        let mut found: Vec<&'static ScanEntry> = inventory::iter::<ScanEntry>
            .into_iter()
            .filter(|entry: &&'static ScanEntry| self.spec.covers(entry.type_name) && predicate(entry))
            .collect();
        found.sort_by_key(|entry| entry.type_name);
        found
    }
}

/// Register a servlet type with the scan registry.
///
/// The type must implement `Servlet` and `Default`; it is constructed once
/// at bind time and shared across all of its URL patterns.
#[macro_export]
macro_rules! register_servlet {
    ($ty:ty, [$($pattern:expr),* $(,)?]) => {
        $crate::register_servlet!($ty, [$($pattern),*], []);
    };
    ($ty:ty, [$($pattern:expr),* $(,)?], [$(($name:expr, $value:expr)),* $(,)?]) => {
        $crate::registry::inventory::submit! {
            $crate::registry::ScanEntry::servlet(
                concat!(module_path!(), "::", stringify!($ty)),
                &[$($pattern),*],
                &[$(($name, $value)),*],
                || std::sync::Arc::new(<$ty>::default()) as std::sync::Arc<dyn $crate::Servlet>,
            )
        }
    };
}

/// Register a filter type with the scan registry.
#[macro_export]
macro_rules! register_filter {
    ($ty:ty, [$($pattern:expr),* $(,)?]) => {
        $crate::register_filter!($ty, [$($pattern),*], []);
    };
    ($ty:ty, [$($pattern:expr),* $(,)?], [$(($name:expr, $value:expr)),* $(,)?]) => {
        $crate::registry::inventory::submit! {
            $crate::registry::ScanEntry::filter(
                concat!(module_path!(), "::", stringify!($ty)),
                &[$($pattern),*],
                &[$(($name, $value)),*],
                || std::sync::Arc::new(<$ty>::default()) as std::sync::Arc<dyn $crate::Filter>,
            )
        }
    };
}

/// Register a configuration module with the scan registry.
///
/// With one argument the type is constructed via `Default`; the two-argument
/// form supplies a fallible factory, for modules whose construction can be
/// refused at runtime.
#[macro_export]
macro_rules! register_module {
    ($ty:ty) => {
        $crate::register_module!($ty, || Ok(
            Box::new(<$ty>::default()) as Box<dyn $crate::BootModule>
        ));
    };
    ($ty:ty, $factory:expr) => {
        $crate::registry::inventory::submit! {
            $crate::registry::ScanEntry::module(
                concat!(module_path!(), "::", stringify!($ty)),
                $factory,
            )
        }
    };
}
