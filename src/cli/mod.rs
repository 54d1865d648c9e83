//! # CLI Module
//!
//! Command-line front end for the document pipeline, used to inspect what
//! a deployment would publish without starting a server.
//!
//! ## Commands
//!
//! ### `assemble`
//!
//! Build the OpenAPI document of an archive:
//!
//! ```bash
//! oas-assemble assemble --archive petstore.war --catalog petstore-types.yaml \
//!     --context-root /petstore --format json --output openapi.json
//! ```
//!
//! Options:
//! - `--archive <PATH>` - exploded directory or war/jar file (required)
//! - `--catalog <FILE>` - type catalog of the archive (required)
//! - `--config <FILE>` - OpenAPI configuration; `OAS_*` env vars apply on top
//! - `--topology <FILE>` - listeners to advertise as servers
//! - `--context-root <PATH>` - deployment context root (default `/`)
//! - `--format yaml|json` - output format (default `yaml`)
//! - `--output <FILE>` - write to a file instead of stdout
//!
//! ### `list-types`
//!
//! Print the types the application stage would document:
//!
//! ```bash
//! oas-assemble list-types --archive petstore.war --catalog petstore-types.yaml
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use oas_assembler::cli::{Cli, run_cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{default_topology, run_cli, ArchiveArgs, Cli, Commands, OutputFormat};
