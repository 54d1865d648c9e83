use clap::Parser;
use oas_assembler::cli::{run_cli, Cli};
use oas_assembler::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging_with_config(&LogConfig::from_env())?;
    run_cli(cli)
}
