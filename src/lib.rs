//! # OAS Assembler
//!
//! **OAS Assembler** builds the [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0) document
//! of a deployed application at runtime, by combining configuration, pluggable model readers,
//! static documents shipped in the archive, introspection of the application's resource types,
//! and the server's own network topology.
//!
//! ## Architecture
//!
//! - **[`archive`]** - Read-only access to exploded deployments, war/jar files and nested libraries
//! - **[`catalog`]** - Type metadata graph of a deployment (resource paths, operations, parameters)
//! - **[`config`]** - Per-deployment OpenAPI configuration, file plus `OAS_*` environment
//! - **[`type_filter`]** - Selects the application (and optionally library) types to document
//! - **[`topology`]** - Resolves the server's externally reachable base URLs
//! - **[`document`]** - The OpenAPI document accumulator and its merge helpers
//! - **[`processor`]** - The ordered pipeline stages that fill the document
//! - **[`supplier`]** - Lazy, memoized, thread-safe document per deployment
//! - **[`phonehome`]** - Daily anonymous usage report tied to server lifecycle
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - The `oas-assemble` command line
//!
//! ### Document Assembly Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Supplier as supplier::DocumentSupplier
//!     participant Catalog as catalog::TypeCatalogProvider
//!     participant Topology as topology::ServerTopologyResolver
//!     participant Stages as processor::*
//!
//!     Caller->>Supplier: get()
//!     alt memoized
//!         Supplier-->>Caller: Some(Arc<Document>)
//!     else disabled
//!         Supplier-->>Caller: None
//!     else first call
//!         Supplier->>Catalog: catalog_for(app, archive)
//!         Supplier->>Topology: resolve_base_urls(context_root)
//!         Supplier->>Stages: config-property, model-reader, static-file
//!         Supplier->>Stages: application (filtered types), operation-servers
//!         Supplier->>Stages: base, filter
//!         Supplier->>Supplier: memoize (even when a stage failed)
//!         Supplier-->>Caller: Some(Arc<Document>) or error
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use oas_assembler::{
//!     archive::open_archive,
//!     catalog::{InMemoryTypeCatalog, StaticCatalogProvider},
//!     config::OpenApiConfig,
//!     supplier::DocumentSupplier,
//!     topology::{ServerTopologyResolver, StaticTopology},
//! };
//! use std::{path::Path, sync::Arc};
//!
//! let archive = Arc::from(open_archive(Path::new("petstore.war"))?);
//! let catalog = Arc::new(InMemoryTypeCatalog::load(Path::new("petstore-types.yaml"))?);
//! let topology = Arc::new(StaticTopology::load(Path::new("topology.yaml"))?);
//!
//! let supplier = DocumentSupplier::new(
//!     "petstore",
//!     "/petstore",
//!     archive,
//!     Arc::new(StaticCatalogProvider::new(catalog)),
//!     ServerTopologyResolver::new(topology),
//!     OpenApiConfig::from_env(),
//! );
//! if let Some(doc) = supplier.get()? {
//!     println!("{}", doc.to_yaml()?);
//! }
//! ```
//!
//! ## Logging
//!
//! All modules log through `tracing`. Binaries install a subscriber with
//! [`logging::init_logging_with_config`]; the level and format come from
//! `OAS_LOG_LEVEL`, `OAS_LOG_FORMAT`, `OAS_LOG_TARGET_FILTER` and
//! `OAS_LOG_INCLUDE_LOCATION`.

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod document;
pub mod logging;
pub mod phonehome;
pub mod processor;
pub mod supplier;
pub mod topology;
pub mod type_filter;

pub use config::OpenApiConfig;
pub use document::Document;
pub use phonehome::{Lifecycle, PhoneHomeConfig, PhoneHomeCore};
pub use supplier::{DocumentSupplier, SupplierError};
