//! # OpenAPI Configuration Module
//!
//! Immutable configuration snapshot for one deployment's document supplier.
//! Loaded once (YAML or JSON file, then environment overrides) and shared
//! read-only across concurrent document requests.
//!
//! ## Example Configuration
//!
//! ```yaml
//! enabled: true
//! scan_lib: false
//! scan:
//!   classes: [com.example.PetResource]
//!   packages: [com.example.api]
//!   exclude_classes: [com.example.api.Internal]
//!   exclude_packages: [com.example.api.admin]
//! model_reader: petstore
//! filter: hide-internal
//! static_file: META-INF/openapi.yaml
//! servers: [https://api.example.com]
//! path_servers:
//!   /pets: [https://pets.example.com]
//! operation_servers:
//!   listPets: [https://list.example.com]
//! schemas:
//!   Pet: { type: object }
//! extensions:
//!   x-team: platform
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `OAS_ENABLED` | `enabled` |
//! | `OAS_SCAN_LIB` | `scan_lib` |
//! | `OAS_SCAN_DISABLE` | `scan_disable` |
//! | `OAS_STATIC_FILE` | `static_file` |
//! | `OAS_MODEL_READER` | `model_reader` |
//! | `OAS_FILTER` | `filter` |
//! | `OAS_SERVERS` | `servers` (comma separated) |

use crate::catalog::TypeRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Include/exclude rules applied to the application's types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRules {
    pub classes: BTreeSet<String>,
    pub packages: BTreeSet<String>,
    pub exclude_classes: BTreeSet<String>,
    pub exclude_packages: BTreeSet<String>,
}

/// Configuration snapshot for a document supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiConfig {
    /// Initial state of the supplier's enabled flag.
    pub enabled: bool,
    /// Also introspect bundled library archives.
    pub scan_lib: bool,
    /// Skip application introspection entirely.
    pub scan_disable: bool,
    pub scan: ScanRules,
    /// Name of a registered model reader.
    pub model_reader: Option<String>,
    /// Name of a registered document filter.
    pub filter: Option<String>,
    /// Static document location on the filesystem.
    pub static_file: Option<PathBuf>,
    pub servers: Vec<String>,
    pub path_servers: BTreeMap<String, Vec<String>>,
    pub operation_servers: BTreeMap<String, Vec<String>>,
    pub schemas: BTreeMap<String, Value>,
    pub extensions: BTreeMap<String, Value>,
    pub title: Option<String>,
    pub version: Option<String>,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_lib: false,
            scan_disable: false,
            scan: ScanRules::default(),
            model_reader: None,
            filter: None,
            static_file: None,
            servers: Vec::new(),
            path_servers: BTreeMap::new(),
            operation_servers: BTreeMap::new(),
            schemas: BTreeMap::new(),
            extensions: BTreeMap::new(),
            title: None,
            version: None,
        }
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Does `name` live in `package` or one of its sub-packages?
fn in_package(name: &str, package: &str) -> bool {
    name.strip_prefix(package)
        .map(|rest| rest.starts_with('.'))
        .unwrap_or(false)
}

impl OpenApiConfig {
    /// Load from a YAML or JSON file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Result<Self, String> = if path
            .extension()
            .map(|s| s == "json")
            .unwrap_or(false)
        {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        let mut config = parsed.map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `OAS_*` environment overrides in place.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_bool("OAS_ENABLED") {
            self.enabled = v;
        }
        if let Some(v) = env_bool("OAS_SCAN_LIB") {
            self.scan_lib = v;
        }
        if let Some(v) = env_bool("OAS_SCAN_DISABLE") {
            self.scan_disable = v;
        }
        if let Some(v) = env_string("OAS_STATIC_FILE") {
            self.static_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env_string("OAS_MODEL_READER") {
            self.model_reader = Some(v);
        }
        if let Some(v) = env_string("OAS_FILTER") {
            self.filter = Some(v);
        }
        if let Some(v) = env_string("OAS_SERVERS") {
            self.servers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Apply the include/exclude rules to a set of types.
    ///
    /// With no includes configured every type is a candidate; excludes always
    /// win over includes.
    pub fn valid_classes(&self, types: BTreeSet<TypeRef>) -> BTreeSet<TypeRef> {
        let rules = &self.scan;
        let restrict = !rules.classes.is_empty() || !rules.packages.is_empty();
        types
            .into_iter()
            .filter(|t| {
                !restrict
                    || rules.classes.contains(t.name())
                    || rules.packages.iter().any(|p| in_package(t.name(), p))
            })
            .filter(|t| {
                !rules.exclude_classes.contains(t.name())
                    && !rules
                        .exclude_packages
                        .iter()
                        .any(|p| in_package(t.name(), p))
            })
            .collect()
    }
}
