//! # Document Processor Module
//!
//! The ordered transformation stages that assemble a document. Every stage
//! implements [`DocumentProcessor`]: it receives the in-progress
//! [`Document`] by exclusive borrow, together with the configuration, and
//! merges its contribution into it.
//!
//! ## Pipeline Order
//!
//! 1. [`ConfigPropertyProcessor`] - configuration overrides
//! 2. [`ModelReaderProcessor`] - programmatic model from a registered reader
//! 3. [`FileProcessor`] - static OpenAPI file
//! 4. [`ApplicationProcessor`] - introspected application types
//! 5. [`OperationServersProcessor`] - configured servers per operation id
//! 6. [`BaseProcessor`] - version, info defaults and server base URLs
//! 7. [`FilterProcessor`] - registered document filter
//!
//! Stages 1-3 override already-populated fields; stage 4 only fills what
//! is missing so that explicit documentation wins over discovery.
//!
//! ## Extension Points
//!
//! Readers and filters are looked up by name in a [`ModelRegistry`] owned by
//! the caller; the configuration only names them.

mod application;
mod base;
mod config_property;
mod file;
mod filter;
mod model_reader;

pub use application::ApplicationProcessor;
pub use base::{BaseProcessor, DEFAULT_SERVER_DESCRIPTION, DEFAULT_TITLE, DEFAULT_VERSION};
pub use config_property::{ConfigPropertyProcessor, OperationServersProcessor};
pub use file::{FileProcessor, STATIC_FILE_CANDIDATES};
pub use filter::FilterProcessor;
pub use model_reader::ModelReaderProcessor;

use crate::config::OpenApiConfig;
use crate::document::{Document, PathItem};
use crate::type_filter::TypeFilterError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Failure inside one pipeline stage.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("model reader `{name}` failed: {source}")]
    Reader {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("document filter `{name}` failed: {source}")]
    Filter {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to read static file {path}: {source}")]
    StaticFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse static file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error(transparent)]
    TypeFilter(#[from] TypeFilterError),
    #[error("invalid model contribution: {0}")]
    Model(String),
}

/// One pipeline stage.
pub trait DocumentProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(&self, doc: &mut Document, config: &OpenApiConfig) -> Result<(), ProcessorError>;
}

/// Supplies a programmatic document model.
pub trait ModelReader: Send + Sync {
    fn build_model(&self) -> anyhow::Result<Document>;
}

/// Final say over the document: may rewrite or drop parts of it.
///
/// Returning `None` from an element hook removes that element.
pub trait DocumentFilter: Send + Sync {
    fn filter_path_item(&self, _path: &str, item: PathItem) -> Option<PathItem> {
        Some(item)
    }

    fn filter_operation(
        &self,
        _path: &str,
        _method: &str,
        operation: Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        Some(operation)
    }

    fn filter_schema(&self, _name: &str, schema: Value) -> Option<Value> {
        Some(schema)
    }

    fn filter_openapi(&self, _doc: &mut Document) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Named readers and filters available to a deployment.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    readers: BTreeMap<String, Arc<dyn ModelReader>>,
    filters: BTreeMap<String, Arc<dyn DocumentFilter>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reader(mut self, name: impl Into<String>, reader: Arc<dyn ModelReader>) -> Self {
        self.readers.insert(name.into(), reader);
        self
    }

    pub fn with_filter(mut self, name: impl Into<String>, filter: Arc<dyn DocumentFilter>) -> Self {
        self.filters.insert(name.into(), filter);
        self
    }

    pub fn reader(&self, name: &str) -> Option<Arc<dyn ModelReader>> {
        self.readers.get(name).cloned()
    }

    pub fn filter(&self, name: &str) -> Option<Arc<dyn DocumentFilter>> {
        self.filters.get(name).cloned()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("readers", &self.readers.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}
