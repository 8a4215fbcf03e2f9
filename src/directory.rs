//! Service directory: logical service name to backend address.
//!
//! Loaded once at startup from a TOML file and read-only afterwards.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_ENTRY_POINT: &str = "/run";

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    services: Vec<ServiceEntry>,
}

/// One backend service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    /// `host:port`, or a full `http(s)://` base URL.
    pub address: String,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Payload field that must hold a non-empty string.
    #[serde(default)]
    pub required_field: Option<String>,
}

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

impl ServiceEntry {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            entry_point: default_entry_point(),
            required_field: None,
        }
    }

    pub fn required_field(mut self, field: impl Into<String>) -> Self {
        self.required_field = Some(field.into());
        self
    }

    pub fn entry_point(mut self, path: impl Into<String>) -> Self {
        self.entry_point = path.into();
        self
    }
}

/// Immutable registry of backend services, indexed by name.
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    services: BTreeMap<String, ServiceEntry>,
}

impl ServiceDirectory {
    /// Build a directory from entries, rejecting duplicates and blanks.
    pub fn from_entries(entries: impl IntoIterator<Item = ServiceEntry>) -> Result<Self> {
        let mut services = BTreeMap::new();
        for entry in entries {
            if entry.name.trim().is_empty() {
                return Err(Error::Config("service with empty name".to_string()));
            }
            if entry.address.trim().is_empty() {
                return Err(Error::Config(format!(
                    "service {} has an empty address",
                    entry.name
                )));
            }
            if services.contains_key(&entry.name) {
                return Err(Error::Config(format!("duplicate service {}", entry.name)));
            }
            services.insert(entry.name.clone(), entry);
        }
        Ok(Self { services })
    }

    /// Parse a directory from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: DirectoryFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad service directory: {e}")))?;
        Self::from_entries(file.services)
    }

    /// Load a directory from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read service directory {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Look up a service by name.
    pub fn resolve(&self, name: &str) -> Option<&ServiceEntry> {
        self.services.get(name)
    }

    /// All services, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
