//! # Document Module
//!
//! [`Document`] is the accumulator the processor pipeline builds. Each stage
//! receives it by exclusive borrow; once the pipeline finishes the supplier
//! wraps it in an `Arc` and it is never mutated again.
//!
//! The document keeps the top-level OpenAPI sections typed (info, servers,
//! paths, component schemas) and everything below them as JSON values, so
//! stages can merge fragments at whatever granularity they carry without the
//! document interpreting schema semantics. [`Document::to_spec`] gives the
//! strongly typed [`oas3::OpenApiV3Spec`] view of the finished document.
//!
//! Alongside the OpenAPI model the document carries the derived endpoint
//! list: context root mapped to the full endpoint paths the application
//! serves.

use oas3::OpenApiV3Spec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// OpenAPI version written when no stage supplied one.
pub const OPENAPI_VERSION: &str = "3.1.0";

/// HTTP methods that may appear as operations in a path item.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A path item: operations keyed by lower-case method plus path-level
/// fields (`servers`, `parameters`, `summary`, ...).
pub type PathItem = Map<String, Value>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("OpenAPI document root must be an object")]
    NotAnObject,
    #[error("invalid `{section}` section: {reason}")]
    InvalidSection {
        section: &'static str,
        reason: String,
    },
}

/// A server entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
            extra: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// In-progress or finalized OpenAPI document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    openapi: Option<String>,
    info: Map<String, Value>,
    servers: Vec<Server>,
    paths: BTreeMap<String, PathItem>,
    schemas: BTreeMap<String, Value>,
    /// Remaining root members (`tags`, `security`, `x-*`, non-schema
    /// components under `components`).
    extra: Map<String, Value>,
    endpoints: BTreeMap<String, BTreeSet<String>>,
}

/// Merge `src` into `target`; `src` wins wherever both hold a non-object.
pub fn merge_override(target: &mut Value, src: Value) {
    match (target, src) {
        (Value::Object(t), Value::Object(s)) => {
            for (k, v) in s {
                match t.get_mut(&k) {
                    Some(existing) => merge_override(existing, v),
                    None => {
                        t.insert(k, v);
                    }
                }
            }
        }
        (t, s) => *t = s,
    }
}

/// Merge `src` into `target`, only filling members `target` lacks.
pub fn merge_missing(target: &mut Value, src: Value) {
    if let (Value::Object(t), Value::Object(s)) = (target, src) {
        for (k, v) in s {
            match t.get_mut(&k) {
                Some(existing) => merge_missing(existing, v),
                None => {
                    t.insert(k, v);
                }
            }
        }
    }
}

fn merge_map_override(target: &mut Map<String, Value>, src: Map<String, Value>) {
    for (k, v) in src {
        match target.get_mut(&k) {
            Some(existing) => merge_override(existing, v),
            None => {
                target.insert(k, v);
            }
        }
    }
}

fn section<T: serde::de::DeserializeOwned>(
    name: &'static str,
    value: Value,
) -> Result<T, DocumentError> {
    serde_json::from_value(value).map_err(|e| DocumentError::InvalidSection {
        section: name,
        reason: e.to_string(),
    })
}

/// Build a JSON server list from URLs.
pub fn servers_value(urls: &[String]) -> Value {
    Value::Array(
        urls.iter()
            .map(|u| {
                let mut m = Map::new();
                m.insert("url".to_string(), Value::String(u.clone()));
                Value::Object(m)
            })
            .collect(),
    )
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a JSON OpenAPI tree into a document.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(mut root) = value else {
            return Err(DocumentError::NotAnObject);
        };
        let mut doc = Document::new();
        if let Some(v) = root.remove("openapi") {
            doc.openapi = Some(section("openapi", v)?);
        }
        if let Some(v) = root.remove("info") {
            doc.info = section("info", v)?;
        }
        if let Some(v) = root.remove("servers") {
            doc.servers = section("servers", v)?;
        }
        if let Some(v) = root.remove("paths") {
            doc.paths = section("paths", v)?;
        }
        if let Some(Value::Object(mut components)) = root.remove("components") {
            if let Some(v) = components.remove("schemas") {
                doc.schemas = section("components.schemas", v)?;
            }
            if !components.is_empty() {
                doc.extra
                    .insert("components".to_string(), Value::Object(components));
            }
        }
        doc.extra.extend(root);
        Ok(doc)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        Ok(Self::from_value(value)?)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Ok(Self::from_value(value)?)
    }

    /// The document as a JSON OpenAPI tree.
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        if let Some(v) = &self.openapi {
            root.insert("openapi".to_string(), Value::String(v.clone()));
        }
        if !self.info.is_empty() {
            root.insert("info".to_string(), Value::Object(self.info.clone()));
        }
        if !self.servers.is_empty() {
            root.insert(
                "servers".to_string(),
                serde_json::to_value(&self.servers).unwrap_or(Value::Null),
            );
        }
        let paths: Map<String, Value> = self
            .paths
            .iter()
            .map(|(k, v)| (k.clone(), Value::Object(v.clone())))
            .collect();
        root.insert("paths".to_string(), Value::Object(paths));

        let mut extra = self.extra.clone();
        if !self.schemas.is_empty() {
            let mut components = match extra.remove("components") {
                Some(Value::Object(m)) => m,
                _ => Map::new(),
            };
            let schemas: Map<String, Value> = self
                .schemas
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            components.insert("schemas".to_string(), Value::Object(schemas));
            root.insert("components".to_string(), Value::Object(components));
        }
        root.extend(extra);
        Value::Object(root)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_value())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_value())
    }

    /// Strongly typed view of the document.
    pub fn to_spec(&self) -> serde_json::Result<OpenApiV3Spec> {
        serde_json::from_value(self.to_value())
    }

    /// Merge another document into this one; `other` wins on conflicts.
    pub fn merge_override(&mut self, other: Document) {
        if other.openapi.is_some() {
            self.openapi = other.openapi;
        }
        merge_map_override(&mut self.info, other.info);
        if !other.servers.is_empty() {
            self.servers = other.servers;
        }
        for (path, item) in other.paths {
            let target = self.paths.entry(path).or_default();
            merge_map_override(target, item);
        }
        for (name, schema) in other.schemas {
            self.schemas.insert(name, schema);
        }
        merge_map_override(&mut self.extra, other.extra);
        for (root, paths) in other.endpoints {
            self.endpoints.entry(root).or_default().extend(paths);
        }
    }

    pub fn openapi_version(&self) -> Option<&str> {
        self.openapi.as_deref()
    }

    pub fn set_openapi_version(&mut self, version: impl Into<String>) {
        self.openapi = Some(version.into());
    }

    fn info_str(&self, key: &str) -> Option<&str> {
        self.info
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.info_str("title")
    }

    pub fn version(&self) -> Option<&str> {
        self.info_str("version")
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.info
            .insert("title".to_string(), Value::String(title.into()));
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.info
            .insert("version".to_string(), Value::String(version.into()));
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn set_servers(&mut self, servers: Vec<Server>) {
        self.servers = servers;
    }

    pub fn add_server(&mut self, server: Server) {
        self.servers.push(server);
    }

    pub fn has_paths(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn paths(&self) -> &BTreeMap<String, PathItem> {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> &mut BTreeMap<String, PathItem> {
        &mut self.paths
    }

    pub fn path_keys(&self) -> Vec<String> {
        self.paths.keys().cloned().collect()
    }

    pub fn path_item(&self, path: &str) -> Option<&PathItem> {
        self.paths.get(path)
    }

    pub fn path_item_mut(&mut self, path: &str) -> Option<&mut PathItem> {
        self.paths.get_mut(path)
    }

    /// The path item for `path`, created empty when absent.
    pub fn path_item_entry(&mut self, path: &str) -> &mut PathItem {
        self.paths.entry(path.to_string()).or_default()
    }

    pub fn remove_path(&mut self, path: &str) -> Option<PathItem> {
        self.paths.remove(path)
    }

    pub fn set_paths(&mut self, paths: BTreeMap<String, PathItem>) {
        self.paths = paths;
    }

    /// Operation `method` (lower-case) on `path`.
    pub fn operation(&self, path: &str, method: &str) -> Option<&Map<String, Value>> {
        self.paths.get(path)?.get(method)?.as_object()
    }

    /// Visit every operation as `(path, method, operation)`.
    pub fn operations_mut(&mut self) -> impl Iterator<Item = (&str, &str, &mut Map<String, Value>)> {
        self.paths.iter_mut().flat_map(|(path, item)| {
            item.iter_mut().filter_map(move |(method, op)| {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    return None;
                }
                op.as_object_mut()
                    .map(|op| (path.as_str(), method.as_str(), op))
            })
        })
    }

    pub fn schemas(&self) -> &BTreeMap<String, Value> {
        &self.schemas
    }

    pub fn set_schema(&mut self, name: impl Into<String>, schema: Value) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn set_schemas(&mut self, schemas: BTreeMap<String, Value>) {
        self.schemas = schemas;
    }

    /// Root `x-` extension; the prefix is added when missing.
    pub fn set_extension(&mut self, key: &str, value: Value) {
        let key = if key.starts_with("x-") {
            key.to_string()
        } else {
            format!("x-{key}")
        };
        self.extra.insert(key, value);
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn endpoints(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.endpoints
    }

    pub fn set_endpoints(&mut self, endpoints: BTreeMap<String, BTreeSet<String>>) {
        self.endpoints = endpoints;
    }
}

/// Join a context root and a path template into one endpoint path.
pub fn join_paths(base: &str, path: &str) -> String {
    let mut out = String::from("/");
    for segment in base
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
    {
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Endpoint list for a context root: each path template prefixed by it.
pub fn build_endpoints<I, S>(context_root: &str, paths: I) -> BTreeMap<String, BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let root = join_paths(context_root, "");
    let endpoints: BTreeSet<String> = paths
        .into_iter()
        .map(|p| join_paths(&root, p.as_ref()))
        .collect();
    let mut map = BTreeMap::new();
    map.insert(root, endpoints);
    map
}
