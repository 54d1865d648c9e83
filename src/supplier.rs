//! # Document Supplier Module
//!
//! [`DocumentSupplier`] owns one deployment's OpenAPI document. The document
//! is computed lazily on the first [`DocumentSupplier::get`] and memoized
//! for the lifetime of the supplier.
//!
//! ## Build Flow
//!
//! ```text
//! get()
//!  ├─ memoized?  ──────────────────────────────► Some(doc)   (lock-free)
//!  ├─ disabled?  ──────────────────────────────► None        (nothing cached)
//!  └─ build lock (one build in flight, others wait)
//!      ├─ memoized meanwhile? ─────────────────► Some(doc)
//!      ├─ type catalog for the archive           (failure: error, nothing cached)
//!      └─ pipeline on an empty document
//!          ├─ resolve base URLs
//!          ├─ config-property → model-reader → static-file
//!          ├─ type filter → application → operation-servers
//!          ├─ endpoints (only when the document has paths)
//!          └─ base → filter
//!         whatever the document holds when the pipeline stops is memoized
//! ```
//!
//! ## Failed Builds
//!
//! When a stage fails, the caller that triggered the build receives
//! [`SupplierError::Assembly`], and the partially assembled document is
//! memoized anyway. Later calls return that partial document instead of
//! re-running the failing work, so a broken deployment cannot cause a
//! rebuild on every request.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let supplier = DocumentSupplier::new(
//!     "petstore",
//!     "/petstore",
//!     archive,
//!     catalogs,
//!     ServerTopologyResolver::new(topology),
//!     OpenApiConfig::from_env(),
//! );
//! if let Some(doc) = supplier.get()? {
//!     println!("{}", doc.to_yaml()?);
//! }
//! ```

use crate::archive::DeployableArchive;
use crate::catalog::{TypeCatalog, TypeCatalogProvider};
use crate::config::OpenApiConfig;
use crate::document::{build_endpoints, Document};
use crate::processor::{
    ApplicationProcessor, BaseProcessor, ConfigPropertyProcessor, DocumentProcessor,
    FileProcessor, FilterProcessor, ModelReaderProcessor, ModelRegistry,
    OperationServersProcessor, ProcessorError,
};
use crate::topology::{ServerTopologyResolver, TopologyError};
use crate::type_filter::{filter_types, TypeFilterError};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, info_span};

/// Cause of a failed pipeline run.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: ProcessorError,
    },
}

/// Errors surfaced by [`DocumentSupplier::get`].
#[derive(Debug, Error)]
pub enum SupplierError {
    #[error("failed to build the type catalog for `{application_id}`: {source}")]
    Catalog {
        application_id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("an error occurred while creating the OpenAPI document for `{application_id}`: {source}")]
    Assembly {
        application_id: String,
        #[source]
        source: AssemblyError,
    },
}

impl SupplierError {
    /// Did the build stop because a bundled library archive could not be
    /// opened?
    pub fn is_library_failure(&self) -> bool {
        matches!(
            self,
            SupplierError::Assembly {
                source: AssemblyError::Stage {
                    source: ProcessorError::TypeFilter(TypeFilterError::LibraryArchive { .. }),
                    ..
                },
                ..
            }
        )
    }
}

/// Lazily built, memoized OpenAPI document of one deployment.
pub struct DocumentSupplier {
    application_id: String,
    context_root: String,
    config: Arc<OpenApiConfig>,
    archive: Arc<dyn DeployableArchive>,
    catalogs: Arc<dyn TypeCatalogProvider>,
    topology: ServerTopologyResolver,
    registry: ModelRegistry,
    document: ArcSwapOption<Document>,
    build_lock: Mutex<()>,
    enabled: AtomicBool,
    builds: AtomicU64,
}

impl DocumentSupplier {
    pub fn new(
        application_id: impl Into<String>,
        context_root: impl Into<String>,
        archive: Arc<dyn DeployableArchive>,
        catalogs: Arc<dyn TypeCatalogProvider>,
        topology: ServerTopologyResolver,
        config: OpenApiConfig,
    ) -> Self {
        let enabled = config.enabled;
        Self {
            application_id: application_id.into(),
            context_root: context_root.into(),
            config: Arc::new(config),
            archive,
            catalogs,
            topology,
            registry: ModelRegistry::new(),
            document: ArcSwapOption::empty(),
            build_lock: Mutex::new(()),
            enabled: AtomicBool::new(enabled),
            builds: AtomicU64::new(0),
        }
    }

    /// Readers and filters the configuration may name.
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn context_root(&self) -> &str {
        &self.context_root
    }

    pub fn config(&self) -> &OpenApiConfig {
        &self.config
    }

    /// Toggle the disabled fast path. A memoized document is kept.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Has a document (complete or partial) been memoized?
    pub fn is_built(&self) -> bool {
        self.document.load().is_some()
    }

    /// Number of pipeline runs started so far.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// The deployment's document.
    ///
    /// `Ok(None)` when the supplier is disabled and nothing was built yet.
    /// The call that runs a failing build receives the error; the partial
    /// document it produced is returned by every later call.
    pub fn get(&self) -> Result<Option<Arc<Document>>, SupplierError> {
        if let Some(doc) = self.document.load_full() {
            return Ok(Some(doc));
        }
        if !self.is_enabled() {
            return Ok(None);
        }

        let _guard = self.build_lock.lock();
        if let Some(doc) = self.document.load_full() {
            return Ok(Some(doc));
        }
        if !self.is_enabled() {
            return Ok(None);
        }

        let span = info_span!("openapi_build", application = %self.application_id);
        let _enter = span.enter();
        self.builds.fetch_add(1, Ordering::Relaxed);

        let catalog = self
            .catalogs
            .catalog_for(&self.application_id, self.archive.as_ref())
            .map_err(|source| {
                error!(error = %source, "type catalog unavailable");
                SupplierError::Catalog {
                    application_id: self.application_id.clone(),
                    source,
                }
            })?;

        let mut doc = Document::new();
        let outcome = self.assemble(&mut doc, catalog);
        let doc = Arc::new(doc);
        self.document.store(Some(Arc::clone(&doc)));

        match outcome {
            Ok(()) => {
                info!(
                    paths = doc.paths().len(),
                    servers = doc.servers().len(),
                    "OpenAPI document assembled"
                );
                Ok(Some(doc))
            }
            Err(source) => {
                error!(error = %source, "OpenAPI document assembly failed, keeping partial document");
                Err(SupplierError::Assembly {
                    application_id: self.application_id.clone(),
                    source,
                })
            }
        }
    }

    fn run_stage(
        &self,
        stage: &dyn DocumentProcessor,
        doc: &mut Document,
    ) -> Result<(), AssemblyError> {
        debug!(stage = stage.name(), "running stage");
        stage
            .process(doc, &self.config)
            .map_err(|source| AssemblyError::Stage {
                stage: stage.name(),
                source,
            })
    }

    fn assemble(
        &self,
        doc: &mut Document,
        catalog: Arc<dyn TypeCatalog>,
    ) -> Result<(), AssemblyError> {
        let base_urls = self.topology.resolve_base_urls(&self.context_root)?;
        debug!(count = base_urls.len(), "resolved base URLs");

        self.run_stage(&ConfigPropertyProcessor::new(), doc)?;
        self.run_stage(&ModelReaderProcessor::new(self.registry.clone()), doc)?;
        self.run_stage(&FileProcessor::new(Arc::clone(&self.archive)), doc)?;

        let types = filter_types(self.archive.as_ref(), Some(&self.config), catalog.as_ref())
            .map_err(|e| AssemblyError::Stage {
                stage: "application",
                source: ProcessorError::from(e),
            })?;
        debug!(types = types.len(), "selected application types");
        self.run_stage(&ApplicationProcessor::new(catalog, types), doc)?;
        self.run_stage(&OperationServersProcessor::new(), doc)?;

        if doc.has_paths() {
            doc.set_endpoints(build_endpoints(&self.context_root, doc.path_keys()));
        }

        self.run_stage(&BaseProcessor::new(base_urls), doc)?;
        self.run_stage(&FilterProcessor::new(self.registry.clone()), doc)?;
        Ok(())
    }
}

impl std::fmt::Debug for DocumentSupplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSupplier")
            .field("application_id", &self.application_id)
            .field("context_root", &self.context_root)
            .field("enabled", &self.is_enabled())
            .field("built", &self.is_built())
            .finish()
    }
}
