use super::{DocumentProcessor, ModelRegistry, ProcessorError};
use crate::config::OpenApiConfig;
use crate::document::{Document, HTTP_METHODS};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Runs the configured [`super::DocumentFilter`] over the finished document.
///
/// Operations are offered first, then the path item holding the survivors;
/// a path item left without operations is removed. Schemas are filtered
/// last, then the filter sees the whole document.
#[derive(Debug, Clone)]
pub struct FilterProcessor {
    registry: ModelRegistry,
}

impl FilterProcessor {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }
}

impl DocumentProcessor for FilterProcessor {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn process(&self, doc: &mut Document, config: &OpenApiConfig) -> Result<(), ProcessorError> {
        let Some(name) = config.filter.as_deref() else {
            return Ok(());
        };
        let Some(filter) = self.registry.filter(name) else {
            warn!(filter = %name, "document filter is not registered, skipping");
            return Ok(());
        };

        let mut paths = BTreeMap::new();
        for (path, mut item) in std::mem::take(doc.paths_mut()) {
            let had_operations = item.keys().any(|k| HTTP_METHODS.contains(&k.as_str()));
            for method in HTTP_METHODS {
                let Some(op) = item.remove(method) else {
                    continue;
                };
                let Value::Object(op) = op else {
                    item.insert(method.to_string(), op);
                    continue;
                };
                match filter.filter_operation(&path, method, op) {
                    Some(kept) => {
                        item.insert(method.to_string(), Value::Object(kept));
                    }
                    None => debug!(path = %path, method, "operation removed by filter"),
                }
            }
            let has_operations = item.keys().any(|k| HTTP_METHODS.contains(&k.as_str()));
            if had_operations && !has_operations {
                debug!(path = %path, "path left without operations, removed");
                continue;
            }
            if let Some(kept) = filter.filter_path_item(&path, item) {
                paths.insert(path, kept);
            }
        }
        doc.set_paths(paths);

        let schemas = doc
            .schemas()
            .clone()
            .into_iter()
            .filter_map(|(schema_name, schema)| {
                filter
                    .filter_schema(&schema_name, schema)
                    .map(|s| (schema_name, s))
            })
            .collect();
        doc.set_schemas(schemas);

        filter
            .filter_openapi(doc)
            .map_err(|source| ProcessorError::Filter {
                name: name.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PathItem;
    use crate::processor::DocumentFilter;
    use serde_json::{json, Map};
    use std::sync::Arc;

    struct HideInternal;

    impl DocumentFilter for HideInternal {
        fn filter_operation(
            &self,
            _path: &str,
            _method: &str,
            operation: Map<String, Value>,
        ) -> Option<Map<String, Value>> {
            let internal = operation
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| tags.iter().any(|t| t == "internal"))
                .unwrap_or(false);
            (!internal).then_some(operation)
        }

        fn filter_path_item(&self, path: &str, item: PathItem) -> Option<PathItem> {
            (path != "/secret").then_some(item)
        }

        fn filter_schema(&self, name: &str, schema: Value) -> Option<Value> {
            (!name.starts_with('_')).then_some(schema)
        }

        fn filter_openapi(&self, doc: &mut Document) -> anyhow::Result<()> {
            doc.set_extension("filtered", json!(true));
            Ok(())
        }
    }

    fn doc() -> Document {
        Document::from_value(json!({
            "paths": {
                "/pets": {
                    "get": { "operationId": "listPets" },
                    "delete": { "operationId": "purge", "tags": ["internal"] }
                },
                "/admin": { "post": { "tags": ["internal"] } },
                "/secret": { "get": {} }
            },
            "components": { "schemas": { "Pet": {}, "_Hidden": {} } }
        }))
        .unwrap()
    }

    fn run(doc: &mut Document) {
        let registry = ModelRegistry::new().with_filter("hide", Arc::new(HideInternal));
        let mut config = OpenApiConfig::default();
        config.filter = Some("hide".into());
        FilterProcessor::new(registry).process(doc, &config).unwrap();
    }

    #[test]
    fn test_filter_drops_operations_paths_and_schemas() {
        let mut doc = doc();
        run(&mut doc);
        assert!(doc.operation("/pets", "get").is_some());
        assert!(doc.operation("/pets", "delete").is_none());
        assert!(doc.path_item("/admin").is_none());
        assert!(doc.path_item("/secret").is_none());
        assert!(doc.schemas().contains_key("Pet"));
        assert!(!doc.schemas().contains_key("_Hidden"));
        assert_eq!(doc.extension("x-filtered"), Some(&json!(true)));
    }

    #[test]
    fn test_no_filter_configured_is_noop() {
        let mut doc = doc();
        let before = doc.clone();
        FilterProcessor::new(ModelRegistry::new())
            .process(&mut doc, &OpenApiConfig::default())
            .unwrap();
        assert_eq!(doc, before);
    }
}
