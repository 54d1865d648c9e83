use super::{DocumentProcessor, ProcessorError};
use crate::archive::DeployableArchive;
use crate::config::OpenApiConfig;
use crate::document::{Document, HTTP_METHODS};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Archive locations searched for a static document, in order.
pub const STATIC_FILE_CANDIDATES: [&str; 6] = [
    "META-INF/openapi.yaml",
    "META-INF/openapi.yml",
    "META-INF/openapi.json",
    "WEB-INF/classes/META-INF/openapi.yaml",
    "WEB-INF/classes/META-INF/openapi.yml",
    "WEB-INF/classes/META-INF/openapi.json",
];

/// Drop path item members that are neither operations nor path-level fields.
fn strip_unknown_verbs(val: &mut Value) {
    let Some(Value::Object(paths)) = val.get_mut("paths") else {
        return;
    };
    for item in paths.values_mut() {
        if let Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if HTTP_METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

/// Merges a static OpenAPI file shipped with the application (or named by
/// configuration) into the document, file values taking precedence.
#[derive(Clone)]
pub struct FileProcessor {
    archive: Arc<dyn DeployableArchive>,
}

impl FileProcessor {
    pub fn new(archive: Arc<dyn DeployableArchive>) -> Self {
        Self { archive }
    }

    fn read_archive(&self, name: &str) -> Result<Option<Vec<u8>>, ProcessorError> {
        self.archive
            .read_entry(name)
            .map_err(|source| ProcessorError::StaticFile {
                path: PathBuf::from(name),
                source,
            })
    }

    /// Locate the static document: configured path on disk, the same path
    /// inside the archive, then the well-known archive locations.
    fn locate(&self, config: &OpenApiConfig) -> Result<Option<(PathBuf, Vec<u8>)>, ProcessorError> {
        if let Some(path) = &config.static_file {
            if path.is_file() {
                let bytes = std::fs::read(path).map_err(|source| ProcessorError::StaticFile {
                    path: path.clone(),
                    source,
                })?;
                return Ok(Some((path.clone(), bytes)));
            }
            let name = path.to_string_lossy().replace('\\', "/");
            return match self.read_archive(&name)? {
                Some(bytes) => Ok(Some((path.clone(), bytes))),
                None => Err(ProcessorError::StaticFile {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "static OpenAPI file not found",
                    ),
                }),
            };
        }
        for candidate in STATIC_FILE_CANDIDATES {
            if let Some(bytes) = self.read_archive(candidate)? {
                return Ok(Some((PathBuf::from(candidate), bytes)));
            }
        }
        Ok(None)
    }
}

fn parse(path: &Path, bytes: &[u8]) -> Result<Document, ProcessorError> {
    let parse_err = |reason: String| ProcessorError::Parse {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::str::from_utf8(bytes).map_err(|e| parse_err(e.to_string()))?;
    let mut value: Value = if path.extension().map(|s| s == "json").unwrap_or(false) {
        serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?
    } else {
        serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?
    };
    strip_unknown_verbs(&mut value);
    // fragments (e.g. only `paths`) merge without full-document validation
    if value.get("openapi").is_some() && value.get("info").is_some() {
        serde_json::from_value::<OpenApiV3Spec>(value.clone())
            .map_err(|e| parse_err(e.to_string()))?;
    }
    Document::from_value(value).map_err(|e| parse_err(e.to_string()))
}

impl DocumentProcessor for FileProcessor {
    fn name(&self) -> &'static str {
        "static-file"
    }

    fn process(&self, doc: &mut Document, config: &OpenApiConfig) -> Result<(), ProcessorError> {
        let Some((path, bytes)) = self.locate(config)? else {
            return Ok(());
        };
        let model = parse(&path, &bytes)?;
        debug!(file = %path.display(), paths = model.paths().len(), "merging static document");
        doc.merge_override(model);
        Ok(())
    }
}
