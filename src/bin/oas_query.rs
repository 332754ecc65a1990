use clap::Parser;
use openapi_query::cli::{run_cli, Cli};
use openapi_query::logging::{init_logging_with_config, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging_with_config(&LogConfig::from_env().with_verbosity(cli.verbose))?;
    run_cli(cli).await
}
