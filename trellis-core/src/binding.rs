//! Binding of scanned entries to the container and router.
//!
//! The binder turns a classified [`ScanEntry`] into a live registration:
//! servlets and filters get their URL patterns and init-parameters
//! extracted and are mounted on the router; modules are constructed and
//! installed into the DI container. Each successful servlet or filter
//! binding is summarized as a [`BindingRecord`].

use crate::registry::{EntryConstructor, ScanEntry};
use crate::{Container, Error, Router};
use std::collections::HashMap;
use trellis_log::{trace, warn};

/// String-keyed init-parameter mapping passed through verbatim to servlets
/// and filters. Duplicate keys resolve last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitParams {
    params: HashMap<String, String>,
}

impl InitParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from declared (name, value) pairs, preserving the last
    /// declaration for a repeated name.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut params = HashMap::new();
        for (name, value) in pairs {
            params.insert((*name).to_string(), (*value).to_string());
        }
        Self { params }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The result of binding one servlet or filter entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRecord {
    /// Fully qualified type name of the bound handler.
    pub type_name: &'static str,
    /// Resolved URL patterns, non-empty. The first is the primary
    /// registration; the rest are additional mounts of the same instance.
    pub url_patterns: Vec<String>,
    /// Resolved init-parameter mapping, keys unique.
    pub init_params: InitParams,
}

impl BindingRecord {
    pub fn primary_pattern(&self) -> &str {
        &self.url_patterns[0]
    }

    pub fn additional_patterns(&self) -> &[String] {
        &self.url_patterns[1..]
    }
}

/// Extract the declared URL patterns of a servlet or filter entry,
/// preserving declaration order. A servlet or filter must declare at least
/// one pattern; an empty declaration is a fatal configuration error.
pub fn url_patterns(entry: &ScanEntry) -> Result<Vec<String>, Error> {
    if entry.url_patterns.is_empty() {
        return Err(Error::Configuration(format!(
            "no url patterns declared for '{}'",
            entry.type_name
        )));
    }
    Ok(entry.url_patterns.iter().map(|p| (*p).to_string()).collect())
}

/// Extract the declared init-parameters of an entry.
pub fn init_params(entry: &ScanEntry) -> InitParams {
    InitParams::from_pairs(entry.init_params)
}

/// Registers classified entries with the container and router.
pub struct Binder<'a> {
    container: &'a Container,
    router: &'a mut Router,
}

impl<'a> Binder<'a> {
    pub fn new(container: &'a Container, router: &'a mut Router) -> Self {
        Self { container, router }
    }

    /// Bind a servlet entry: one instance, mounted at every declared
    /// pattern, primary first.
    pub fn bind_servlet(&mut self, entry: &ScanEntry) -> Result<BindingRecord, Error> {
        let EntryConstructor::Servlet(constructor) = entry.constructor else {
            return Err(Error::Internal(format!(
                "'{}' is not a servlet entry",
                entry.type_name
            )));
        };

        let patterns = url_patterns(entry)?;
        let params = init_params(entry);
        let servlet = constructor();

        for pattern in &patterns {
            self.router.serve(pattern, servlet.clone(), params.clone());
        }
        trace!("Bound servlet '{}' at {:?}", entry.type_name, patterns);

        Ok(BindingRecord {
            type_name: entry.type_name,
            url_patterns: patterns,
            init_params: params,
        })
    }

    /// Bind a filter entry: one instance, mounted at every declared
    /// pattern, primary first.
    pub fn bind_filter(&mut self, entry: &ScanEntry) -> Result<BindingRecord, Error> {
        let EntryConstructor::Filter(constructor) = entry.constructor else {
            return Err(Error::Internal(format!(
                "'{}' is not a filter entry",
                entry.type_name
            )));
        };

        let patterns = url_patterns(entry)?;
        let params = init_params(entry);
        let filter = constructor();

        for pattern in &patterns {
            self.router.filter(pattern, filter.clone(), params.clone());
        }
        trace!("Bound filter '{}' at {:?}", entry.type_name, patterns);

        Ok(BindingRecord {
            type_name: entry.type_name,
            url_patterns: patterns,
            init_params: params,
        })
    }

    /// Construct and install a module entry. Construction failure is
    /// recoverable: the module is skipped with a warning so one broken
    /// module does not abort startup.
    pub fn install_module(&mut self, entry: &ScanEntry) -> Option<&'static str> {
        let EntryConstructor::Module(constructor) = entry.constructor else {
            warn!("'{}' is not a module entry", entry.type_name);
            return None;
        };

        match constructor() {
            Ok(module) => {
                module.configure(self.container);
                for (pattern, filter) in module.filters() {
                    self.router.filter(&pattern, filter, InitParams::new());
                }
                trace!("Installed module '{}'", entry.type_name);
                Some(entry.type_name)
            }
            Err(e) => {
                warn!("Can not instantiate module '{}': {}", entry.type_name, e);
                None
            }
        }
    }
}
