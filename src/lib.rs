// Trellis - a dependency-injection-driven web application framework
//
// Applications declare servlet, filter, and module types in a compile-time
// registry; bootstrap scans the registry under the declared package roots
// and wires everything into a DI container and a router.

// Re-export core functionality
pub use trellis_core::*;

// Re-export the logging facade
pub use trellis_log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use trellis_config;

#[cfg(feature = "persist")]
pub use trellis_persist;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AppDescriptor,
        Application,
        AutoScanModule,
        BindingRecord,
        BootModule,
        Container,
        Error,
        Filter,
        HttpRequest,
        HttpResponse,
        InitParams,
        Json,
        Next,
        PackageScanSpec,
        Provider,
        Router,
        ScanReport,
        Servlet,
    };
    pub use trellis_core::{register_filter, register_module, register_servlet};

    #[cfg(feature = "config")]
    pub use trellis_config::{Configuration, DatabaseConfig};

    #[cfg(feature = "persist")]
    pub use trellis_persist::{PersistModule, PersistenceUnit};
}
