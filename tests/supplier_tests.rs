#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end document assembly through `DocumentSupplier`

mod common;

use common::archives::sample_war;
use common::catalogs::sample_catalog;
use common::topologies::{plain_and_secure, resolver, HOST};
use oas_assembler::archive::{DeployableArchive, InMemoryArchive, JarArchive};
use oas_assembler::catalog::{StaticCatalogProvider, TypeCatalog, TypeCatalogProvider};
use oas_assembler::config::OpenApiConfig;
use oas_assembler::document::Document;
use oas_assembler::processor::{
    DocumentFilter, ModelReader, ModelRegistry, ProcessorError, DEFAULT_TITLE,
};
use oas_assembler::supplier::{AssemblyError, DocumentSupplier, SupplierError};
use oas_assembler::topology::{
    FixedHostResolver, NetworkListener, PortResolution, RuntimeMode, ServerTopology,
    ServerTopologyResolver, TopologyError,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Hands out the sample catalog, counting calls and optionally stalling.
struct CountingProvider {
    calls: AtomicUsize,
    delay: Duration,
    fail_first: bool,
}

impl CountingProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail_first: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TypeCatalogProvider for CountingProvider {
    fn catalog_for(
        &self,
        _application_id: &str,
        _archive: &dyn DeployableArchive,
    ) -> anyhow::Result<Arc<dyn TypeCatalog>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.fail_first && call == 0 {
            anyhow::bail!("class model not ready");
        }
        Ok(Arc::new(sample_catalog()))
    }
}

fn war() -> Arc<dyn DeployableArchive> {
    Arc::new(JarArchive::from_bytes(sample_war()).unwrap())
}

fn supplier_with(
    archive: Arc<dyn DeployableArchive>,
    provider: Arc<dyn TypeCatalogProvider>,
    config: OpenApiConfig,
) -> DocumentSupplier {
    DocumentSupplier::new(
        "petstore",
        "/petstore",
        archive,
        provider,
        resolver(plain_and_secure()),
        config,
    )
}

fn supplier(config: OpenApiConfig) -> DocumentSupplier {
    supplier_with(
        war(),
        Arc::new(StaticCatalogProvider::new(Arc::new(sample_catalog()))),
        config,
    )
}

#[test]
fn test_full_pipeline_document() {
    let doc = supplier(OpenApiConfig::default()).get().unwrap().unwrap();

    assert_eq!(doc.openapi_version(), Some("3.1.0"));
    assert_eq!(doc.title(), Some(DEFAULT_TITLE));
    assert_eq!(
        doc.path_keys(),
        vec!["/pets", "/pets/{id}"]
    );
    let servers: Vec<&str> = doc.servers().iter().map(|s| s.url.as_str()).collect();
    assert_eq!(
        servers,
        vec![
            format!("http://{HOST}:8080/petstore"),
            format!("https://{HOST}:8181/petstore"),
        ]
    );
    let endpoints = &doc.endpoints()["/petstore"];
    assert!(endpoints.contains("/petstore/pets/{id}"));

    // the document converts to a valid OpenAPI model
    doc.to_spec().unwrap();
}

#[test]
fn test_concurrent_get_builds_once() {
    let provider = Arc::new(CountingProvider {
        delay: Duration::from_millis(50),
        ..CountingProvider::new()
    });
    let supplier = Arc::new(supplier_with(
        war(),
        provider.clone(),
        OpenApiConfig::default(),
    ));

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let supplier = Arc::clone(&supplier);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                supplier.get().unwrap().unwrap()
            })
        })
        .collect();
    let docs: Vec<Arc<Document>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(provider.calls(), 1);
    assert_eq!(supplier.build_count(), 1);
    assert!(docs.iter().all(|d| Arc::ptr_eq(d, &docs[0])));
}

#[test]
fn test_disabled_has_no_side_effects() {
    let provider = Arc::new(CountingProvider::new());
    let config = OpenApiConfig {
        enabled: false,
        ..OpenApiConfig::default()
    };
    let supplier = supplier_with(war(), provider.clone(), config);

    assert!(supplier.get().unwrap().is_none());
    assert!(supplier.get().unwrap().is_none());
    assert_eq!(provider.calls(), 0);
    assert!(!supplier.is_built());

    supplier.set_enabled(true);
    let first = supplier.get().unwrap().unwrap();
    let second = supplier.get().unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.calls(), 1);
}

struct FailingReader;

impl ModelReader for FailingReader {
    fn build_model(&self) -> anyhow::Result<Document> {
        anyhow::bail!("reader exploded")
    }
}

#[test]
fn test_failed_stage_memoizes_partial_document() {
    let config = OpenApiConfig {
        servers: vec!["https://api.example.com".into()],
        model_reader: Some("broken".into()),
        ..OpenApiConfig::default()
    };
    let supplier = supplier(config)
        .with_registry(ModelRegistry::new().with_reader("broken", Arc::new(FailingReader)));

    let err = supplier.get().unwrap_err();
    match &err {
        SupplierError::Assembly {
            application_id,
            source: AssemblyError::Stage { stage, source },
        } => {
            assert_eq!(application_id, "petstore");
            assert_eq!(*stage, "model-reader");
            assert!(matches!(source, ProcessorError::Reader { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_library_failure());
    assert!(supplier.is_built());

    // later calls see what the config stage produced, without a rebuild
    let doc = supplier.get().unwrap().unwrap();
    assert_eq!(doc.servers()[0].url, "https://api.example.com");
    assert!(!doc.has_paths());
    assert!(doc.openapi_version().is_none());
    assert_eq!(supplier.build_count(), 1);
}

struct LockedTopology;

impl ServerTopology for LockedTopology {
    fn network_listeners(&self) -> Result<Vec<NetworkListener>, TopologyError> {
        Err(TopologyError::Listeners("configuration locked".into()))
    }

    fn admin_listener_name(&self) -> Option<String> {
        None
    }

    fn runtime_mode(&self) -> RuntimeMode {
        RuntimeMode::Das
    }

    fn real_port(&self, _listener: &NetworkListener) -> PortResolution {
        PortResolution::Unavailable
    }
}

#[test]
fn test_topology_failure_memoizes_empty_document() {
    let supplier = DocumentSupplier::new(
        "petstore",
        "/petstore",
        war(),
        Arc::new(StaticCatalogProvider::new(Arc::new(sample_catalog()))),
        ServerTopologyResolver::with_host_resolver(
            Arc::new(LockedTopology),
            Arc::new(FixedHostResolver(HOST.to_string())),
        ),
        OpenApiConfig::default(),
    );

    match supplier.get().unwrap_err() {
        SupplierError::Assembly {
            application_id,
            source: AssemblyError::Topology(TopologyError::Listeners(reason)),
        } => {
            assert_eq!(application_id, "petstore");
            assert_eq!(reason, "configuration locked");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(supplier.is_built());

    let doc = supplier.get().unwrap().unwrap();
    assert_eq!(*doc, Document::new());
    assert_eq!(supplier.build_count(), 1);
}

#[test]
fn test_library_failure_is_distinguishable() {
    let archive = InMemoryArchive::new()
        .with_file("WEB-INF/classes/a/B.class", "x")
        .with_broken_library("WEB-INF/lib/broken.jar");
    let config = OpenApiConfig {
        scan_lib: true,
        ..OpenApiConfig::default()
    };
    let supplier = supplier_with(
        Arc::new(archive),
        Arc::new(StaticCatalogProvider::new(Arc::new(sample_catalog()))),
        config,
    );

    let err = supplier.get().unwrap_err();
    assert!(err.is_library_failure(), "{err:?}");

    let doc = supplier.get().unwrap().unwrap();
    assert!(!doc.has_paths());
}

#[test]
fn test_catalog_failure_is_not_memoized() {
    let provider = Arc::new(CountingProvider {
        fail_first: true,
        ..CountingProvider::new()
    });
    let supplier = supplier_with(war(), provider.clone(), OpenApiConfig::default());

    assert!(matches!(
        supplier.get(),
        Err(SupplierError::Catalog { .. })
    ));
    assert!(!supplier.is_built());

    let doc = supplier.get().unwrap().unwrap();
    assert!(doc.has_paths());
    assert_eq!(provider.calls(), 2);
}

#[test]
fn test_config_servers_replace_base_urls() {
    let config = OpenApiConfig {
        servers: vec!["https://api.example.com/v1".into()],
        ..OpenApiConfig::default()
    };
    let doc = supplier(config).get().unwrap().unwrap();
    let servers: Vec<&str> = doc.servers().iter().map(|s| s.url.as_str()).collect();
    assert_eq!(servers, vec!["https://api.example.com/v1"]);
}

#[test]
fn test_static_file_merges_with_introspection() {
    let static_doc = br#"
openapi: 3.1.0
info:
  title: Pet Store
  version: 2.0.0
paths:
  /pets:
    get:
      operationId: listAllPets
      summary: Documented by hand
      responses:
        '200':
          description: Every pet
  /health:
    get:
      responses:
        '204':
          description: Up
"#;
    let archive = JarArchive::from_bytes(common::archives::jar_with(&[
        ("WEB-INF/classes/a/B.class", b"x".to_vec()),
        ("META-INF/openapi.yaml", static_doc.to_vec()),
    ]))
    .unwrap();
    let supplier = supplier_with(
        Arc::new(archive),
        Arc::new(StaticCatalogProvider::new(Arc::new(sample_catalog()))),
        OpenApiConfig::default(),
    );
    let doc = supplier.get().unwrap().unwrap();

    assert_eq!(doc.title(), Some("Pet Store"));
    assert_eq!(doc.version(), Some("2.0.0"));
    let list = doc.operation("/pets", "get").unwrap();
    assert_eq!(list["operationId"], "listAllPets");
    assert_eq!(list["responses"]["200"]["description"], "Every pet");
    assert!(doc.operation("/pets/{id}", "get").is_some());
    assert!(doc.operation("/health", "get").is_some());
}

#[test]
fn test_paths_only_static_file_merges() {
    let fragment = br#"
paths:
  /health:
    get:
      responses:
        '204':
          description: Up
"#;
    let archive = JarArchive::from_bytes(common::archives::jar_with(&[
        ("WEB-INF/classes/a/B.class", b"x".to_vec()),
        ("META-INF/openapi.yaml", fragment.to_vec()),
    ]))
    .unwrap();
    let supplier = supplier_with(
        Arc::new(archive),
        Arc::new(StaticCatalogProvider::new(Arc::new(sample_catalog()))),
        OpenApiConfig::default(),
    );
    let doc = supplier.get().unwrap().unwrap();

    assert_eq!(doc.openapi_version(), Some("3.1.0"));
    assert_eq!(doc.title(), Some(DEFAULT_TITLE));
    assert!(doc.operation("/health", "get").is_some());
    assert!(doc.operation("/pets", "get").is_some());
    assert!(doc.endpoints()["/petstore"].contains("/petstore/health"));
}

#[test]
fn test_path_and_operation_servers_reach_discovered_operations() {
    let mut config = OpenApiConfig::default();
    config
        .path_servers
        .insert("/pets".into(), vec!["http://p".into()]);
    config
        .operation_servers
        .insert("getPet".into(), vec!["http://o".into()]);
    let doc = supplier(config).get().unwrap().unwrap();

    let pets = doc.path_item("/pets").unwrap();
    assert_eq!(pets["servers"][0]["url"], "http://p");
    assert_eq!(pets["get"]["operationId"], "listPets");
    assert!(pets["get"].get("servers").is_none());

    let get_pet = doc.operation("/pets/{id}", "get").unwrap();
    assert_eq!(get_pet["servers"][0]["url"], "http://o");
    // document-level servers still come from the listeners
    assert_eq!(doc.servers().len(), 2);
}

#[test]
fn test_missing_configured_static_file_fails_build() {
    let config = OpenApiConfig {
        static_file: Some("META-INF/does-not-exist.yaml".into()),
        ..OpenApiConfig::default()
    };
    let supplier = supplier(config);
    match supplier.get().unwrap_err() {
        SupplierError::Assembly {
            source: AssemblyError::Stage { stage, .. },
            ..
        } => assert_eq!(stage, "static-file"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_scan_disable_leaves_only_configured_content() {
    let config = OpenApiConfig {
        scan_disable: true,
        ..OpenApiConfig::default()
    };
    let doc = supplier(config).get().unwrap().unwrap();
    assert!(!doc.has_paths());
    assert!(doc.endpoints().is_empty());
    assert_eq!(doc.servers().len(), 2);
}

struct DropWrites;

impl DocumentFilter for DropWrites {
    fn filter_operation(
        &self,
        _path: &str,
        method: &str,
        operation: Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        (method == "get").then_some(operation)
    }

    fn filter_openapi(&self, doc: &mut Document) -> anyhow::Result<()> {
        doc.set_extension("read-only", json!(true));
        Ok(())
    }
}

#[test]
fn test_filter_runs_last() {
    let config = OpenApiConfig {
        scan_lib: true,
        filter: Some("read-only".into()),
        ..OpenApiConfig::default()
    };
    let supplier = supplier(config)
        .with_registry(ModelRegistry::new().with_filter("read-only", Arc::new(DropWrites)));
    let doc = supplier.get().unwrap().unwrap();

    // c.D only offers POST /things, so the whole path disappears
    assert!(doc.path_item("/things").is_none());
    assert!(doc.operation("/pets", "get").is_some());
    assert_eq!(doc.extension("x-read-only"), Some(&json!(true)));
    // base URLs were added before filtering
    assert_eq!(doc.servers().len(), 2);
}
