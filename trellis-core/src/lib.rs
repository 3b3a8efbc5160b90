// Core library for the Trellis framework
// Contains the DI container, the scan registry, binding, routing, and the
// application bootstrapper

pub mod application;
pub mod binding;
pub mod container;
pub mod error;
pub mod http;
pub mod registry;
pub mod routing;
pub mod scanning;
pub mod traits;

// Re-export commonly used types
pub use application::{AppDescriptor, Application};
pub use binding::{Binder, BindingRecord, InitParams, init_params, url_patterns};
pub use container::Container;
pub use error::Error;
pub use http::{HttpRequest, HttpResponse, Json};
pub use registry::{
    Capability, PackageScanSpec, RegistryScanner, ScanEntry, is_filter, is_module, is_servlet,
};
pub use routing::{FilterBinding, Router, ServletBinding};
pub use scanning::{AutoScanModule, ScanReport};
pub use traits::{BootModule, Filter, Next, Provider, Servlet};
