use super::{DocumentProcessor, ProcessorError};
use crate::config::OpenApiConfig;
use crate::document::{servers_value, Document, Server};
use serde_json::Value;
use tracing::debug;

/// Applies configuration-supplied overrides: document and path servers,
/// schema definitions, root extensions and info fields.
///
/// Path items named by `path_servers` are created when absent. Operation
/// servers wait for [`OperationServersProcessor`], once operations exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigPropertyProcessor;

impl ConfigPropertyProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentProcessor for ConfigPropertyProcessor {
    fn name(&self) -> &'static str {
        "config-property"
    }

    fn process(&self, doc: &mut Document, config: &OpenApiConfig) -> Result<(), ProcessorError> {
        if !config.servers.is_empty() {
            doc.set_servers(config.servers.iter().map(Server::new).collect());
        }

        for (path, urls) in &config.path_servers {
            if doc.path_item(path).is_none() {
                debug!(path = %path, "creating path item for server override");
            }
            doc.path_item_entry(path)
                .insert("servers".to_string(), servers_value(urls));
        }

        for (name, schema) in &config.schemas {
            if !schema.is_object() && !schema.is_boolean() {
                return Err(ProcessorError::Model(format!(
                    "schema `{name}` must be an object or boolean"
                )));
            }
            doc.set_schema(name.clone(), schema.clone());
        }

        for (key, value) in &config.extensions {
            doc.set_extension(key, value.clone());
        }

        if let Some(title) = &config.title {
            doc.set_title(title.clone());
        }
        if let Some(version) = &config.version {
            doc.set_version(version.clone());
        }
        Ok(())
    }
}

/// Attaches `operation_servers` to operations by operation id. Runs after
/// the application stage so discovered operations are covered too.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationServersProcessor;

impl OperationServersProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentProcessor for OperationServersProcessor {
    fn name(&self) -> &'static str {
        "operation-servers"
    }

    fn process(&self, doc: &mut Document, config: &OpenApiConfig) -> Result<(), ProcessorError> {
        if config.operation_servers.is_empty() {
            return Ok(());
        }
        for (path, method, op) in doc.operations_mut() {
            let Some(id) = op.get("operationId").and_then(Value::as_str) else {
                continue;
            };
            if let Some(urls) = config.operation_servers.get(id) {
                debug!(path, method, operation = id, "operation server override");
                op.insert("servers".to_string(), servers_value(urls));
            }
        }
        Ok(())
    }
}
