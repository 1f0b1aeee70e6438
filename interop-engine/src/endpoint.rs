//! ## interop-engine::endpoint
//! **Process endpoint adapter**
//!
//! Launches one implementation in one role as `<program> [args..] <scenario_id>
//! <port>` and observes how it ends. Stdout and stderr go straight into the
//! run's log file; they are never parsed.
//!
//! On unix every endpoint leads its own process group, and the group is killed
//! when the endpoint is terminated or dropped. Implementations started through
//! a wrapper script cannot leave a grandchild behind holding the run's port.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use interop_config::ImplementationConfig;
use interop_core::{Role, ScenarioId};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::outcome::EndpointExit;

#[derive(Debug)]
pub struct Endpoint {
    role: Role,
    name: String,
    child: Child,
    /// Process group led by the child.
    group: Option<u32>,
    started: Instant,
}

impl Endpoint {
    pub async fn spawn(
        implementation: &ImplementationConfig,
        role: Role,
        scenario: ScenarioId,
        port: u16,
        env: &[(String, String)],
        log_path: &Path,
    ) -> Result<Self, EngineError> {
        let log_error = |source: std::io::Error| EngineError::LogFile {
            path: log_path.to_path_buf(),
            source,
        };
        let stdout = tokio::fs::File::create(log_path)
            .await
            .map_err(log_error)?
            .into_std()
            .await;
        let stderr = stdout.try_clone().map_err(log_error)?;

        let mut command = Command::new(&implementation.program);
        command
            .args(&implementation.args)
            .arg(scenario.as_str())
            .arg(port.to_string())
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .envs(&implementation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);
        if let Some(dir) = &implementation.working_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| EngineError::Spawn {
            program: implementation.program.clone(),
            source,
        })?;
        debug!(
            "Started {} {} (pid {:?}) for {} on port {}",
            role,
            implementation.name,
            child.id(),
            scenario,
            port
        );

        Ok(Self {
            role,
            name: implementation.name.clone(),
            group: child.id(),
            child,
            started: Instant::now(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Waits for the process to exit. Cancel safe.
    pub async fn wait(&mut self) -> EndpointExit {
        match self.child.wait().await {
            Ok(status) => match status.code() {
                Some(code) => EndpointExit::Code(code),
                None => EndpointExit::Signal,
            },
            Err(e) => EndpointExit::Lost(format!("{} could not be awaited: {}", self.role, e)),
        }
    }

    /// Kills the process and everything it started, and reaps it.
    pub async fn terminate(&mut self) {
        self.kill_group();
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill {} {}: {}", self.role, self.name, e);
        }
    }

    /// Sends SIGKILL to the endpoint's process group. Harmless once the group
    /// is gone.
    #[cfg(unix)]
    fn kill_group(&self) {
        let Some(pgid) = self.group.and_then(|id| libc::pid_t::try_from(id).ok()) else {
            return;
        };
        // SAFETY: killpg takes no pointers; a stale group id yields ESRCH.
        let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if result != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!("Failed to kill process group of {} {}: {}", self.role, self.name, err);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.kill_group();
    }
}
