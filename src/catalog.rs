//! # Type Catalog Module
//!
//! The type catalog is the queryable graph of type metadata visible to a
//! deployment. The crate treats the catalog engine as an external
//! collaborator behind the [`TypeCatalog`] trait; [`InMemoryTypeCatalog`] is
//! the reference implementation, loadable from YAML or JSON.
//!
//! ## Catalog File Format
//!
//! ```yaml
//! types:
//!   - name: com.example.PetResource
//!     path: /pets
//!     tags: [pets]
//!     operations:
//!       - method: GET
//!         name: listPets
//!         produces: [application/json]
//!       - method: GET
//!         path: "{id}"
//!         name: getPet
//!         parameters:
//!           - { name: id, in: path, required: true }
//!   - name: com.example.Helper
//! ```

use crate::archive::DeployableArchive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Opaque handle to one class-like type, identified by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }

    /// Fully qualified name, `.` separated.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Package part of the qualified name, empty for the default package.
    pub fn package(&self) -> &str {
        self.0.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a declared parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterIn {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterIn::Path => "path",
            ParameterIn::Query => "query",
            ParameterIn::Header => "header",
            ParameterIn::Cookie => "cookie",
        }
    }
}

/// A parameter declared on a resource method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterIn,
    #[serde(default)]
    pub required: bool,
    /// JSON schema type name (`string`, `integer`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
}

/// A resource method on a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationInfo {
    /// HTTP method, upper case.
    pub method: String,
    /// Sub-path relative to the type's resource path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Method name in the application.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default)]
    pub deprecated: bool,
}

impl OperationInfo {
    pub fn new(method: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: None,
            name: name.into(),
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            produces: Vec::new(),
            consumes: Vec::new(),
            parameters: Vec::new(),
            deprecated: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Metadata for one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    /// Root resource path; types without one are not REST resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OperationInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            tags: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn resource(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new(name)
        }
    }

    pub fn with_operation(mut self, op: OperationInfo) -> Self {
        self.operations.push(op);
        self
    }
}

/// Queryable graph of type metadata. Read-only; shared across builds.
pub trait TypeCatalog: Send + Sync {
    /// Resolve a qualified name, `None` when the catalog does not know it.
    fn resolve(&self, qualified_name: &str) -> Option<TypeRef>;

    /// Every type in the graph.
    fn all_types(&self) -> Vec<TypeRef>;

    /// Metadata for a resolved type.
    fn type_info(&self, type_ref: &TypeRef) -> Option<&TypeInfo>;
}

/// Produces the type catalog for a deployable unit.
pub trait TypeCatalogProvider: Send + Sync {
    fn catalog_for(
        &self,
        application_id: &str,
        archive: &dyn DeployableArchive,
    ) -> anyhow::Result<Arc<dyn TypeCatalog>>;
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    types: Vec<TypeInfo>,
}

/// Catalog backed by a map of qualified name to metadata.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTypeCatalog {
    types: BTreeMap<String, TypeInfo>,
}

impl InMemoryTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, info: TypeInfo) -> Self {
        self.insert(info);
        self
    }

    pub fn insert(&mut self, info: TypeInfo) {
        self.types.insert(info.name.clone(), info);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Load a catalog description from a YAML or JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: CatalogFile = if path
            .extension()
            .map(|s| s == "yaml" || s == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        let mut catalog = Self::new();
        for info in file.types {
            catalog.insert(info);
        }
        Ok(catalog)
    }
}

impl TypeCatalog for InMemoryTypeCatalog {
    fn resolve(&self, qualified_name: &str) -> Option<TypeRef> {
        self.types
            .contains_key(qualified_name)
            .then(|| TypeRef::new(qualified_name))
    }

    fn all_types(&self) -> Vec<TypeRef> {
        self.types.keys().map(TypeRef::new).collect()
    }

    fn type_info(&self, type_ref: &TypeRef) -> Option<&TypeInfo> {
        self.types.get(type_ref.name())
    }
}

/// Provider that hands out the same pre-built catalog for every deployment.
#[derive(Clone)]
pub struct StaticCatalogProvider {
    catalog: Arc<dyn TypeCatalog>,
}

impl StaticCatalogProvider {
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        Self { catalog }
    }
}

impl TypeCatalogProvider for StaticCatalogProvider {
    fn catalog_for(
        &self,
        _application_id: &str,
        _archive: &dyn DeployableArchive,
    ) -> anyhow::Result<Arc<dyn TypeCatalog>> {
        Ok(Arc::clone(&self.catalog))
    }
}
