//! Backend process supervision for the desktop shell.
//!
//! The supervisor owns the lifecycle of at most one backend child per
//! application run: resolve the packaged executable, prepare the data root,
//! spawn with the data-root environment variable the backend expects, forward
//! its output into the structured log, and terminate it on shutdown. There is
//! no restart policy: a crashed backend stays down until the application is
//! relaunched, and the UI simply sees failing requests.

use std::env;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{ApiClient, ApiError};
use crate::config::BackendSettings;

/// Environment variable carrying the data-root path to the backend. The
/// backend reads exactly this name.
pub const DATA_ROOT_ENV: &str = "STUDY_HELPER_DATA_ROOT";

/// When set, the backend is assumed to be started externally (development
/// configuration) and no child is spawned.
pub const DEV_SERVER_ENV: &str = "STUDYHELPER_DEV_SERVER";

#[cfg(windows)]
const BACKEND_EXECUTABLE: &str = "study-helper-backend.exe";
#[cfg(not(windows))]
const BACKEND_EXECUTABLE: &str = "study-helper-backend";

const RESOURCES_DIR: &str = "resources";
const BACKEND_DIR: &str = "backend";
const DATA_ROOT_DIR: &str = "study-helper";

/// Resolved locations for one supervised backend.
#[derive(Debug, Clone)]
pub struct SupervisorPlan {
    /// Backend executable to launch.
    pub executable: PathBuf,
    /// Working directory for the child (the backend's own folder).
    pub working_dir: PathBuf,
    /// Directory handed to the backend via [`DATA_ROOT_ENV`]; created before
    /// launch, never touched afterwards.
    pub data_root: PathBuf,
}

impl SupervisorPlan {
    /// Decide whether this run manages a backend child, and where from.
    ///
    /// Returns `None` in the development configuration ([`DEV_SERVER_ENV`]
    /// set, or `manage_process` disabled), where an externally started
    /// backend is assumed.
    pub fn resolve(settings: &BackendSettings) -> Option<SupervisorPlan> {
        if env::var_os(DEV_SERVER_ENV).is_some() {
            info!("Development configuration: backend is managed externally");
            return None;
        }
        if !settings.manage_process {
            info!("Backend process management disabled in configuration");
            return None;
        }

        let exe_dir = match env::current_exe() {
            Ok(path) => match path.parent() {
                Some(dir) => dir.to_path_buf(),
                None => {
                    warn!("Cannot determine the application directory; backend will not be launched");
                    return None;
                }
            },
            Err(err) => {
                warn!(error = %err, "Cannot locate the application executable; backend will not be launched");
                return None;
            }
        };

        let executable = match settings.executable_override {
            Some(ref overridden) => {
                PathBuf::from(shellexpand::tilde(overridden).into_owned())
            }
            None => exe_dir
                .join(RESOURCES_DIR)
                .join(BACKEND_DIR)
                .join(BACKEND_EXECUTABLE),
        };

        // Data root lives beside the resources directory, mirroring the
        // installed layout the backend expects.
        let data_root = match settings.data_root_override {
            Some(ref overridden) => PathBuf::from(shellexpand::tilde(overridden).into_owned()),
            None => exe_dir.join(DATA_ROOT_DIR),
        };

        let working_dir = executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| exe_dir.clone());

        Some(SupervisorPlan {
            executable,
            working_dir,
            data_root,
        })
    }
}

/// What `start` did.
#[derive(Debug)]
pub enum StartOutcome {
    Started { pid: u32 },
    /// The packaged executable is absent. Logged only; the window still
    /// opens and every API call fails uniformly.
    MissingExecutable(PathBuf),
    /// A child from this run is already being supervised.
    AlreadyRunning,
}

/// Explicitly owned handle for the backend child. Acquired once at startup,
/// released once at shutdown (`stop` is idempotent and also runs on drop).
#[derive(Debug)]
pub struct BackendSupervisor {
    plan: SupervisorPlan,
    child: Option<Child>,
}

impl BackendSupervisor {
    pub fn new(plan: SupervisorPlan) -> Self {
        Self { plan, child: None }
    }

    pub fn plan(&self) -> &SupervisorPlan {
        &self.plan
    }

    /// Launch the backend child. Missing executables are reported as an
    /// outcome rather than an error; spawn failures propagate for the caller
    /// to log. No retry in either case.
    pub fn start(&mut self) -> io::Result<StartOutcome> {
        if self.child.is_some() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        if !self.plan.executable.exists() {
            warn!(
                executable = %self.plan.executable.display(),
                "Backend executable not found; continuing without a managed backend"
            );
            return Ok(StartOutcome::MissingExecutable(self.plan.executable.clone()));
        }

        fs::create_dir_all(&self.plan.data_root)?;

        let mut child = Command::new(&self.plan.executable)
            .current_dir(&self.plan.working_dir)
            .env(DATA_ROOT_ENV, &self.plan.data_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, false);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, true);
        }

        let pid = child.id();
        info!(
            pid,
            executable = %self.plan.executable.display(),
            data_root = %self.plan.data_root.display(),
            "Backend started"
        );
        self.child = Some(child);
        Ok(StartOutcome::Started { pid })
    }

    /// Whether the supervised child is still alive. Observes (and logs) an
    /// exit if one happened since the last check.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!(%status, "Backend process exited");
                self.child = None;
                false
            }
            Err(err) => {
                warn!(error = %err, "Failed to poll backend process state");
                true
            }
        }
    }

    /// Terminate the child if one is running. Safe to call any number of
    /// times, including when nothing was ever started.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                info!(%status, "Backend had already exited");
                return;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "Failed to poll backend before stopping it");
            }
        }

        info!("Stopping backend");
        if let Err(err) = child.kill() {
            warn!(error = %err, "Failed to kill backend process");
        }
        match child.wait() {
            Ok(status) => info!(%status, "Backend stopped"),
            Err(err) => warn!(error = %err, "Failed to reap backend process"),
        }
    }
}

impl Drop for BackendSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward_output(stream: impl io::Read + Send + 'static, is_stderr: bool) {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if is_stderr {
                        warn!(target: "backend", "{line}");
                    } else {
                        info!(target: "backend", "{line}");
                    }
                }
                Err(_) => break,
            }
        }
        debug!(target: "backend", stderr = is_stderr, "Backend output stream closed");
    });
}

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("backend did not become ready within {0:?}")]
    TimedOut(Duration),
}

/// Poll the backend's status endpoint until it answers, with a bounded
/// deadline. This replaces a blind fixed post-launch sleep: the window
/// opens as soon as the backend is actually listening, and a timeout is
/// reported instead of silently hoped past.
///
/// Any HTTP answer, including an error status, counts as ready: the process
/// is up and listening, which is all the probe is for.
pub async fn wait_for_backend(
    client: &ApiClient,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ReadinessError> {
    let deadline = Instant::now() + timeout;
    loop {
        match client.system_status().await {
            Ok(_) | Err(ApiError::Server { .. }) => return Ok(()),
            Err(err) => {
                debug!(error = %err, "Backend not ready yet");
            }
        }
        if Instant::now() >= deadline {
            return Err(ReadinessError::TimedOut(timeout));
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn plan_in(dir: &Path, executable: PathBuf) -> SupervisorPlan {
        SupervisorPlan {
            working_dir: executable
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.to_path_buf()),
            executable,
            data_root: dir.join("study-helper"),
        }
    }

    #[test]
    fn missing_executable_is_an_outcome_not_an_error() {
        let dir = tempdir().unwrap();
        let plan = plan_in(dir.path(), dir.path().join("no-such-backend"));
        let mut supervisor = BackendSupervisor::new(plan);

        match supervisor.start().unwrap() {
            StartOutcome::MissingExecutable(path) => {
                assert!(path.ends_with("no-such-backend"));
            }
            other => panic!("expected MissingExecutable, got {other:?}"),
        }
        assert!(!supervisor.is_running());
        // No handle was set, so stop is a no-op.
        supervisor.stop();
        supervisor.stop();
    }

    #[test]
    fn resolve_honors_disabled_management() {
        let mut settings = BackendSettings::default();
        settings.manage_process = false;
        assert!(SupervisorPlan::resolve(&settings).is_none());
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn start_creates_data_root_and_passes_it_to_the_child() {
        let dir = tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fake-backend",
            "echo started > \"$STUDY_HELPER_DATA_ROOT/marker\"",
        );
        let plan = plan_in(dir.path(), script);
        let data_root = plan.data_root.clone();
        assert!(!data_root.exists());

        let mut supervisor = BackendSupervisor::new(plan);
        match supervisor.start().unwrap() {
            StartOutcome::Started { .. } => {}
            other => panic!("expected Started, got {other:?}"),
        }
        assert!(data_root.exists(), "data root must exist before launch");

        let marker = data_root.join("marker");
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !marker.exists() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(marker.exists(), "child should see {DATA_ROOT_ENV}");

        supervisor.stop();
        assert!(!supervisor.is_running());
    }

    #[cfg(unix)]
    #[test]
    fn stop_kills_a_live_child_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "fake-backend", "sleep 30");
        let mut supervisor = BackendSupervisor::new(plan_in(dir.path(), script));

        match supervisor.start().unwrap() {
            StartOutcome::Started { .. } => {}
            other => panic!("expected Started, got {other:?}"),
        }
        assert!(supervisor.is_running());

        supervisor.stop();
        assert!(!supervisor.is_running());
        supervisor.stop();
    }

    #[cfg(unix)]
    #[test]
    fn second_start_reports_already_running() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "fake-backend", "sleep 30");
        let mut supervisor = BackendSupervisor::new(plan_in(dir.path(), script));

        supervisor.start().unwrap();
        match supervisor.start().unwrap() {
            StartOutcome::AlreadyRunning => {}
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }
        supervisor.stop();
    }
}
