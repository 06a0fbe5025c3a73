//! Shopflow CLI: run checkout flow scenarios against a subscription shop
//!
//! ## Usage
//!
//! ```bash
//! shopflow list                                  # Show built-in scenarios
//! shopflow run --db-path shop.db                 # Run every scenario
//! shopflow run --scenario upfront_only --headed  # One scenario, visible browser
//! shopflow reset --db-path shop.db               # Clear orders and customers
//! ```

use clap::Parser;
use shopflow_cli::{Cli, CliConfig, CliResult, ColorChoice, Commands, FlowRunner, Verbosity};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(config.verbosity);

    let mut runner = FlowRunner::new(config);
    match cli.command {
        Commands::Run(args) => runner.run(&args).map(|_| ()),
        Commands::List(args) => runner.list(&args),
        Commands::Show(args) => runner.show(&args),
        Commands::Reset(args) => runner.reset(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

// RUST_LOG overrides the -v/-q level.
fn init_logging(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter())),
        )
        .with_target(verbosity.is_debug())
        .with_writer(std::io::stderr)
        .init();
}
