use std::sync::Arc;

use bookbrowser::{
    Config,
    VERSION,
    cli::Cli,
    daemon,
    error::{Error, Result},
    signals::Signals,
    supervisor::SystemdNotifier,
};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("BOOKBROWSER_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    if cli.help {
        eprintln!("{}", Cli::command().render_help());
        std::process::exit(1);
    }
    init_tracing(cli.verbose, cli.quiet);

    tracing::info!("BookBrowser {VERSION}");

    match run(&cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::resolve(cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    let outcome = runtime.block_on(async move {
        let signals = Signals::from_os()?;
        daemon::run(config, Arc::new(SystemdNotifier), signals).await
    });
    // In-flight indexing and requests are abandoned.
    runtime.shutdown_background();
    outcome
}
