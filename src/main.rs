use anyhow::Result;
use bidaf_fusion::cli::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logs go to stderr so the JSON report on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("bidaf_fusion=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    Cli::parse().run()
}
