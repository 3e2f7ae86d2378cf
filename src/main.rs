mod ambient;
mod audio;
mod cli;
mod dialog;
mod engine;
mod gate;
mod logging;
mod model;
mod orchestrator;
mod prefs;
mod projector;
mod surface;
#[cfg(test)]
mod test_support;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    logging::init_tracing(if is_headless || cfg!(not(feature = "tui")) {
        logging::LogTarget::Stderr
    } else {
        logging::LogTarget::File
    });

    cli::run(args).await?;

    // A pending stdin prompt would otherwise keep the runtime alive on exit.
    if is_headless {
        std::process::exit(0);
    }
    Ok(())
}
