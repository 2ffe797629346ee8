use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use cfkit::cli::Cli;
use cfkit::ui::{TerminalUi, Ui};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the developer log filter.
const LOG_ENV: &str = "CFKIT_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let ui: Arc<dyn Ui> = Arc::new(TerminalUi::stdio());

    match run(cli, ui.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui.display_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, ui: Arc<dyn Ui>) -> anyhow::Result<()> {
    let command = cli.command.name();
    cli.run(ui)
        .await
        .with_context(|| format!("{} failed", command))
}
