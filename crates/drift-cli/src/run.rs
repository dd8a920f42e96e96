//! One invocation of the tool: configure, run the engine, render.

use crate::args::Args;
use crate::exit_codes::ExitCode;
use crate::output::OutputFormatter;
use crate::summary::append_step_summary;
use anyhow::Result;
use drift_github::{DriftEngine, DriftError, EngineConfig};
use tracing::{debug, info, warn};

/// Run the drift check described by `args` and print the report.
///
/// Returns the exit code for a completed run. Configuration, authentication
/// and fetch failures are returned as errors wrapping [`DriftError`].
pub async fn execute(args: &Args) -> Result<ExitCode> {
    let config = EngineConfig::from_settings(args.settings()).map_err(DriftError::from)?;
    debug!(
        "organization {}, app {}, installation {}, API {}",
        config.organization,
        config.credentials.app_id,
        config.credentials.installation_id,
        config.api.api_url
    );

    let engine = DriftEngine::new(config).map_err(DriftError::from)?;
    let formatter = OutputFormatter::new(args.out_format, args.colors_enabled());

    let spinner = formatter.spinner(&format!(
        "Comparing members of {} with SCIM identities",
        engine.organization()
    ));
    let result = engine.run().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let report = result?;

    if report.has_drift() {
        info!(
            "{} of {} members have drifted from SCIM",
            report.drift_count(),
            report.total_members()
        );
    } else {
        info!("all {} members have a SCIM identity", report.total_members());
    }

    formatter.print_report(&report)?;

    if let Some(path) = &args.summary_file {
        if let Err(e) = append_step_summary(path, &report) {
            warn!("{:#}", e);
        }
    }

    Ok(ExitCode::for_report(&report, args.fail_on_drift))
}
