//! Main entry point for Study Helper.
//!
//! This binary supports both CLI and desktop modes:
//! - CLI mode: when arguments are provided, commands run against the
//!   configured backend and exit.
//! - Desktop mode: with no arguments, the backend supervisor is acquired,
//!   the backend's readiness is probed, the GUI window runs, and the
//!   supervisor is released on exit.

use std::time::Duration;

use anyhow::Result;
use studyhelper_core::client::ApiClient;
use studyhelper_core::supervisor::{
    BackendSupervisor, StartOutcome, SupervisorPlan, wait_for_backend,
};
use studyhelper_core::{LoggingDestination, init_logging, load_config};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    if studyhelper_cli::should_run_cli_mode() {
        // CLI mode
        studyhelper_cli::run().await.map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    // Desktop mode. Logging goes to the file; stderr is not visible here.
    if let Err(err) = init_logging(LoggingDestination::FileOnly) {
        eprintln!("Warning: failed to initialize logging: {err}");
    }

    let load = load_config();
    for warning in &load.warnings {
        warn!("{warning}");
    }

    // One supervisor handle per application run: acquired here, released
    // after the window closes (and on drop, should the GUI panic).
    let mut supervisor = SupervisorPlan::resolve(&load.config.backend).map(BackendSupervisor::new);

    if let Some(ref mut supervisor) = supervisor {
        match supervisor.start() {
            Ok(StartOutcome::Started { pid }) => {
                info!(pid, "Backend launched; probing readiness");
                match ApiClient::new(&load.config.backend.api_base_url) {
                    Ok(client) => {
                        let timeout =
                            Duration::from_secs(load.config.backend.startup_timeout_secs);
                        let interval =
                            Duration::from_millis(load.config.backend.probe_interval_ms);
                        match wait_for_backend(&client, timeout, interval).await {
                            Ok(()) => info!("Backend is ready"),
                            // Logged only: the window still opens and every
                            // API call fails uniformly until the backend is
                            // reachable.
                            Err(err) => warn!(error = %err, "Backend readiness probe failed; opening the window anyway"),
                        }
                    }
                    Err(err) => warn!(error = %err, "Cannot probe readiness with the configured base URL"),
                }
            }
            Ok(StartOutcome::MissingExecutable(_)) | Ok(StartOutcome::AlreadyRunning) => {}
            Err(err) => {
                error!(error = %err, "Failed to spawn the backend process");
            }
        }
    }

    let gui_result = studyhelper_gui::run();

    if let Some(mut supervisor) = supervisor {
        supervisor.stop();
    }

    if let Err(e) = gui_result {
        eprintln!("GUI error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
