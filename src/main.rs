use clap::Parser;
use filesorter::cli::{Cli, run_cli};
use filesorter::output::OutputFormatter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    // Log to stderr so it never mixes with command output
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("FILESORTER_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run_cli(cli) {
        OutputFormatter::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
