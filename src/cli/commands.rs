use crate::archive::{open_archive, DeployableArchive};
use crate::catalog::{InMemoryTypeCatalog, StaticCatalogProvider, TypeCatalog};
use crate::config::OpenApiConfig;
use crate::supplier::DocumentSupplier;
use crate::topology::{NetworkListener, ServerTopologyResolver, StaticTopology};
use crate::type_filter::filter_types;
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for the OpenAPI assembler
///
/// Builds the OpenAPI document of a packaged application the same way a
/// running server would, without deploying it.
#[derive(Parser)]
#[command(name = "oas-assemble")]
#[command(about = "Assemble OpenAPI documents for deployable archives", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs shared by every command
#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    /// Exploded deployment directory or war/jar file
    #[arg(short, long)]
    pub archive: PathBuf,

    /// Type catalog describing the archive's classes (YAML or JSON)
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// OpenAPI configuration file (YAML or JSON); env overrides still apply
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build the OpenAPI document and print or write it
    Assemble {
        #[command(flatten)]
        input: ArchiveArgs,

        /// Server topology file; defaults to the stock http/https listeners
        #[arg(short, long)]
        topology: Option<PathBuf>,

        /// Context root the application is deployed under
        #[arg(long, default_value = "/")]
        context_root: String,

        /// Application name (default: archive file stem)
        #[arg(long)]
        app_id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the application types that would be documented
    ListTypes {
        #[command(flatten)]
        input: ArchiveArgs,
    },
}

/// Serialization of the assembled document
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Listeners of a freshly installed server.
pub fn default_topology() -> StaticTopology {
    StaticTopology {
        listeners: vec![
            NetworkListener::new("http-listener-1", 8080, false),
            NetworkListener::new("http-listener-2", 8181, true),
            NetworkListener::new("admin-listener", 4848, false),
        ],
        admin_listener: Some("admin-listener".to_string()),
        ..StaticTopology::default()
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<OpenApiConfig> {
    match path {
        Some(path) => Ok(OpenApiConfig::load(path)?),
        None => Ok(OpenApiConfig::from_env()),
    }
}

fn load_inputs(
    input: &ArchiveArgs,
) -> anyhow::Result<(Arc<dyn DeployableArchive>, Arc<dyn TypeCatalog>, OpenApiConfig)> {
    let archive: Arc<dyn DeployableArchive> = Arc::from(
        open_archive(&input.archive)
            .with_context(|| format!("failed to open archive {}", input.archive.display()))?,
    );
    let catalog = InMemoryTypeCatalog::load(&input.catalog)
        .with_context(|| format!("failed to load catalog {}", input.catalog.display()))?;
    let config = load_config(input.config.as_deref())?;
    Ok((archive, Arc::new(catalog), config))
}

fn app_id_for(archive: &Path) -> String {
    archive
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "application".to_string())
}

/// Run a parsed command line.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Assemble {
            input,
            topology,
            context_root,
            app_id,
            format,
            output,
        } => {
            let (archive, catalog, config) = load_inputs(&input)?;
            let topology = match &topology {
                Some(path) => StaticTopology::load(path)
                    .with_context(|| format!("failed to load topology {}", path.display()))?,
                None => default_topology(),
            };
            let app_id = app_id.unwrap_or_else(|| app_id_for(&input.archive));

            let supplier = DocumentSupplier::new(
                app_id,
                context_root,
                archive,
                Arc::new(StaticCatalogProvider::new(catalog)),
                ServerTopologyResolver::new(Arc::new(topology)),
                config,
            );
            let Some(doc) = supplier.get()? else {
                info!("OpenAPI is disabled, nothing to write");
                return Ok(());
            };

            let rendered = match format {
                OutputFormat::Yaml => doc.to_yaml()?,
                OutputFormat::Json => doc.to_json()?,
            };
            match output {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(output = %path.display(), "document written");
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(rendered.as_bytes())?;
                    if !rendered.ends_with('\n') {
                        stdout.write_all(b"\n")?;
                    }
                }
            }
            Ok(())
        }
        Commands::ListTypes { input } => {
            let (archive, catalog, config) = load_inputs(&input)?;
            let types = filter_types(archive.as_ref(), Some(&config), catalog.as_ref())?;
            let mut stdout = std::io::stdout().lock();
            for type_ref in types {
                writeln!(stdout, "{type_ref}")?;
            }
            Ok(())
        }
    }
}
