use super::{DocumentProcessor, ProcessorError};
use crate::catalog::{OperationInfo, TypeCatalog, TypeInfo, TypeRef};
use crate::config::OpenApiConfig;
use crate::document::{join_paths, merge_missing, Document, HTTP_METHODS};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Documents the application's resource types.
///
/// Discovered operations never overwrite what earlier stages wrote: an
/// existing operation only gains the members it lacks, and a declared
/// parameter is only added when no parameter with the same name and
/// location exists yet.
pub struct ApplicationProcessor {
    catalog: Arc<dyn TypeCatalog>,
    types: BTreeSet<TypeRef>,
}

impl ApplicationProcessor {
    pub fn new(catalog: Arc<dyn TypeCatalog>, types: BTreeSet<TypeRef>) -> Self {
        Self { catalog, types }
    }
}

fn parameter_key(param: &Value) -> Option<(String, String)> {
    Some((
        param.get("name")?.as_str()?.to_string(),
        param.get("in")?.as_str()?.to_string(),
    ))
}

fn operation_model(info: &TypeInfo, op: &OperationInfo) -> Value {
    let mut model = Map::new();
    let operation_id = op.operation_id.clone().unwrap_or_else(|| op.name.clone());
    model.insert("operationId".to_string(), Value::String(operation_id));
    if let Some(summary) = &op.summary {
        model.insert("summary".to_string(), Value::String(summary.clone()));
    }
    if let Some(description) = &op.description {
        model.insert("description".to_string(), Value::String(description.clone()));
    }
    let tags: BTreeSet<&String> = info.tags.iter().chain(op.tags.iter()).collect();
    if !tags.is_empty() {
        model.insert("tags".to_string(), json!(tags));
    }
    if op.deprecated {
        model.insert("deprecated".to_string(), Value::Bool(true));
    }
    if !op.consumes.is_empty() {
        let content: Map<String, Value> = op
            .consumes
            .iter()
            .map(|media| (media.clone(), json!({})))
            .collect();
        model.insert("requestBody".to_string(), json!({ "content": content }));
    }
    let mut ok = Map::new();
    ok.insert("description".to_string(), Value::String("OK".to_string()));
    if !op.produces.is_empty() {
        let content: Map<String, Value> = op
            .produces
            .iter()
            .map(|media| (media.clone(), json!({})))
            .collect();
        ok.insert("content".to_string(), Value::Object(content));
    }
    model.insert("responses".to_string(), json!({ "200": ok }));
    Value::Object(model)
}

fn parameter_model(op: &OperationInfo) -> Vec<Value> {
    op.parameters
        .iter()
        .map(|p| {
            let mut m = Map::new();
            m.insert("name".to_string(), Value::String(p.name.clone()));
            m.insert("in".to_string(), Value::String(p.location.as_str().to_string()));
            // Path parameters are always required.
            let required = p.required || p.location == crate::catalog::ParameterIn::Path;
            if required {
                m.insert("required".to_string(), Value::Bool(true));
            }
            let schema_type = p.schema_type.as_deref().unwrap_or("string");
            m.insert("schema".to_string(), json!({ "type": schema_type }));
            Value::Object(m)
        })
        .collect()
}

/// Merge one discovered operation into `existing` (created when absent).
fn merge_operation(existing: &mut Value, mut discovered: Value, parameters: Vec<Value>) {
    // documented responses are kept exactly as written
    if existing.get("responses").is_some() {
        if let Value::Object(d) = &mut discovered {
            d.remove("responses");
        }
    }
    merge_missing(existing, discovered);

    if parameters.is_empty() {
        return;
    }
    let Value::Object(op) = existing else {
        return;
    };
    let params = op
        .entry("parameters".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(list) = params else {
        return;
    };
    let mut seen: BTreeSet<(String, String)> = list.iter().filter_map(parameter_key).collect();
    for param in parameters {
        if let Some(key) = parameter_key(&param) {
            if seen.insert(key) {
                list.push(param);
            }
        }
    }
}

impl DocumentProcessor for ApplicationProcessor {
    fn name(&self) -> &'static str {
        "application"
    }

    fn process(&self, doc: &mut Document, config: &OpenApiConfig) -> Result<(), ProcessorError> {
        if config.scan_disable {
            debug!("application scanning disabled");
            return Ok(());
        }
        for type_ref in &self.types {
            let Some(info) = self.catalog.type_info(type_ref) else {
                continue;
            };
            let Some(root) = info.path.as_deref() else {
                continue;
            };
            for op in &info.operations {
                let method = op.method.to_ascii_lowercase();
                if !HTTP_METHODS.contains(&method.as_str()) {
                    warn!(
                        class = %type_ref,
                        method = %op.method,
                        "unsupported HTTP method on resource operation"
                    );
                    continue;
                }
                let path = join_paths(root, op.path.as_deref().unwrap_or(""));
                let item = doc.path_item_entry(&path);
                let slot = item
                    .entry(method.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                merge_operation(slot, operation_model(info, op), parameter_model(op));
                debug!(class = %type_ref, method = %method, path = %path, "documented operation");
            }
        }
        Ok(())
    }
}
