//! scim-drift - reports GitHub organization members without a SCIM identity.

use clap::Parser;
use drift_cli::args::Args;
use drift_cli::env;
use drift_cli::exit_codes::ExitHandler;
use drift_cli::run;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing based on verbosity
    let log_level = args.log_level(env::is_runner_debug());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_ansi(args.colors_enabled())
        .with_writer(std::io::stderr)
        .init();

    let exit_handler = ExitHandler::new(args.verbose > 0);
    exit_handler.handle_result(run::execute(&args).await);
}
