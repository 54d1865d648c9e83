use super::{DocumentProcessor, ModelRegistry, ProcessorError};
use crate::config::OpenApiConfig;
use crate::document::Document;
use tracing::{debug, warn};

/// Merges the model of the configured [`super::ModelReader`] into the
/// document, reader values taking precedence.
#[derive(Debug, Clone)]
pub struct ModelReaderProcessor {
    registry: ModelRegistry,
}

impl ModelReaderProcessor {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }
}

impl DocumentProcessor for ModelReaderProcessor {
    fn name(&self) -> &'static str {
        "model-reader"
    }

    fn process(&self, doc: &mut Document, config: &OpenApiConfig) -> Result<(), ProcessorError> {
        let Some(name) = config.model_reader.as_deref() else {
            return Ok(());
        };
        let Some(reader) = self.registry.reader(name) else {
            warn!(reader = %name, "model reader is not registered, skipping");
            return Ok(());
        };
        let model = reader
            .build_model()
            .map_err(|source| ProcessorError::Reader {
                name: name.to_string(),
                source,
            })?;
        debug!(reader = %name, paths = model.paths().len(), "merging reader model");
        doc.merge_override(model);
        Ok(())
    }
}
