//! Persistence unit integration for the Trellis framework.
//!
//! A persistence unit is a named scope of connection properties bound to a
//! database. Installing a [`PersistModule`] registers the unit as a
//! provider and wraps every request in a unit of work via a filter mounted
//! at `/*`.
//!
//! The module is constructed *before* bootstrap, so a missing database
//! configuration fails the application before any scanning starts:
//!
//! ```rust,ignore
//! use trellis_config::Configuration;
//! use trellis_core::{AppDescriptor, Application};
//! use trellis_persist::PersistModule;
//!
//! let config = Configuration::load("app.toml")?;
//! let persist = PersistModule::from_configuration("orders", &config)?;
//!
//! let app = Application::bootstrap(
//!     AppDescriptor::new("shop").scan("shop::web").module(persist),
//! )?;
//! ```
//!
//! Connection handling itself belongs to the persistence backend; the
//! registered [`PersistenceUnit`] exposes the unit name and the flattened
//! connection properties a backend integration consumes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use trellis_config::{Configuration, DatabaseConfig};
use trellis_core::{
    BootModule, Container, Error, Filter, HttpRequest, HttpResponse, InitParams, Next, Provider,
};
use trellis_log::{debug, trace};

/// A named persistence unit: connection properties plus unit-of-work
/// bookkeeping. Cheap to clone; clones share the same unit-of-work state.
#[derive(Debug, Clone)]
pub struct PersistenceUnit {
    name: String,
    properties: HashMap<String, String>,
    active: Arc<AtomicUsize>,
}

impl Provider for PersistenceUnit {}

impl PersistenceUnit {
    pub fn new(name: impl Into<String>, properties: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            properties,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Unit name, as declared by the application.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection properties handed through from the database
    /// configuration (`db.driver`, `db.url`, ...).
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Open a unit of work.
    pub fn begin(&self) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("Opened unit of work on '{}' ({} active)", self.name, active);
    }

    /// Close a unit of work.
    pub fn end(&self) {
        let active = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        trace!("Closed unit of work on '{}' ({} active)", self.name, active);
    }

    /// Number of currently open units of work.
    pub fn active_units(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Filter that wraps every request in a unit of work.
pub struct PersistFilter {
    unit: PersistenceUnit,
}

impl PersistFilter {
    pub fn new(unit: PersistenceUnit) -> Self {
        Self { unit }
    }
}

#[async_trait]
impl Filter for PersistFilter {
    async fn handle(
        &self,
        request: HttpRequest,
        _config: &InitParams,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        self.unit.begin();
        let result = next(request).await;
        self.unit.end();
        result
    }
}

/// Bootstrap module installing a persistence unit.
pub struct PersistModule {
    label: String,
    unit: PersistenceUnit,
}

impl PersistModule {
    /// Create a persistence unit from an explicit database configuration.
    ///
    /// Requires a non-empty unit name and a present database section; both
    /// are fatal configuration errors otherwise.
    pub fn new(unit: impl Into<String>, database: Option<DatabaseConfig>) -> Result<Self, Error> {
        let name = unit.into();
        if name.is_empty() {
            return Err(Error::Configuration(
                "persistence unit name must not be empty".to_string(),
            ));
        }
        let database = database.ok_or_else(|| {
            Error::Configuration(format!(
                "no database configuration found for persistence unit '{}'",
                name
            ))
        })?;

        debug!("Creating persistence unit '{}'", name);
        Ok(Self {
            label: format!("PersistModule({})", name),
            unit: PersistenceUnit::new(name, database.to_properties()),
        })
    }

    /// Create a persistence unit from the application configuration.
    pub fn from_configuration(unit: impl Into<String>, config: &Configuration) -> Result<Self, Error> {
        Self::new(unit, config.database.clone())
    }

    /// The unit this module installs.
    pub fn unit(&self) -> &PersistenceUnit {
        &self.unit
    }
}

impl BootModule for PersistModule {
    fn name(&self) -> &str {
        &self.label
    }

    fn configure(&self, container: &Container) {
        container.register(self.unit.clone());
    }

    fn filters(&self) -> Vec<(String, Arc<dyn Filter>)> {
        vec![(
            "/*".to_string(),
            Arc::new(PersistFilter::new(self.unit.clone())) as Arc<dyn Filter>,
        )]
    }
}
