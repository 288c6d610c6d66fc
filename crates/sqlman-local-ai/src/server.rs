//! Process manager for the Python inference server.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::environment::Activation;
#[cfg(target_os = "windows")]
use crate::environment::CREATE_NO_WINDOW;
use crate::error::LocalAIError;

/// How long a terminated server gets to exit before it is killed.
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(2);

/// How [`InferenceServer::stop`] ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited after the terminate request.
    Exited,
    /// Had to be killed.
    Killed,
}

/// Manager for the inference server process.
///
/// The child is killed when the manager is dropped.
#[derive(Debug)]
pub struct InferenceServer {
    script: PathBuf,
    stop_grace: Duration,
    process: Option<Child>,
}

impl InferenceServer {
    /// Create a manager for the server entry point at `script`.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            stop_grace: DEFAULT_STOP_GRACE,
            process: None,
        }
    }

    /// Set how long to wait for a graceful exit.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Check if the server script exists.
    pub fn script_exists(&self) -> bool {
        self.script.exists()
    }

    /// PID of the owned process, if any.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(Child::id)
    }

    /// Start the server inside the activated environment.
    pub fn start(&mut self, activation: &Activation) -> Result<u32, LocalAIError> {
        if self.is_running() {
            let pid = self.pid().unwrap_or_default();
            return Err(LocalAIError::ServerAlreadyRunning(pid));
        }

        if !self.script.exists() {
            return Err(LocalAIError::ServerScriptNotFound(
                self.script.display().to_string(),
            ));
        }

        info!(
            "Starting inference server {} with {}",
            self.script.display(),
            activation.python().display()
        );

        let mut command = Command::new(activation.python());
        command
            .arg(&self.script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = self.script.parent() {
            command.current_dir(dir);
        }
        activation.apply(&mut command);
        #[cfg(target_os = "windows")]
        command.creation_flags(CREATE_NO_WINDOW);

        let child = command
            .spawn()
            .map_err(|e| LocalAIError::ServerStartFailed(e.to_string()))?;
        let pid = child.id().unwrap_or_default();

        debug!("Inference server process started with PID: {}", pid);
        self.process = Some(child);

        Ok(pid)
    }

    /// Stop the server process.
    pub async fn stop(&mut self) -> Result<StopOutcome, LocalAIError> {
        let mut child = self.process.take().ok_or(LocalAIError::ServerNotStarted)?;
        let pid = child.id();
        info!("Stopping inference server (PID: {:?})", pid);

        if let Some(pid) = pid {
            terminate(pid).await;
        }

        // Give it a moment to shut down gracefully
        sleep(self.stop_grace).await;

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Server exited with status: {:?}", status);
                Ok(StopOutcome::Exited)
            }
            Ok(None) => {
                warn!("Server didn't exit gracefully, killing...");
                child.kill().await?;
                Ok(StopOutcome::Killed)
            }
            Err(e) => {
                warn!("Error checking server status: {}", e);
                child.kill().await?;
                Ok(StopOutcome::Killed)
            }
        }
    }

    /// Check if the server process is running.
    pub fn is_running(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            match child.try_wait() {
                Ok(Some(_)) => {
                    // Process has exited
                    self.process = None;
                    false
                }
                Ok(None) => true, // Still running
                Err(_) => false,
            }
        } else {
            false
        }
    }
}

#[cfg(unix)]
async fn terminate(pid: u32) {
    // SAFETY: plain signal delivery to a PID we spawned.
    unsafe {
        libc::kill(pid as i32, libc::SIGTERM);
    }
}

/// The server spawns worker processes, so the whole tree goes.
#[cfg(target_os = "windows")]
async fn terminate(pid: u32) {
    let result = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .creation_flags(CREATE_NO_WINDOW)
        .output()
        .await;
    match result {
        Ok(output) if !output.status.success() => warn!(
            "taskkill failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => warn!("taskkill failed: {}", e),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_initially() {
        let mut server = InferenceServer::new("main.py");
        assert!(!server.is_running());
        assert_eq!(server.pid(), None);
    }

    #[test]
    fn test_missing_script() {
        let mut server = InferenceServer::new("/nonexistent/sqlman/main.py");
        let activation = Activation::for_interpreter("python3");
        assert!(matches!(
            server.start(&activation),
            Err(LocalAIError::ServerScriptNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_without_process() {
        let mut server = InferenceServer::new("main.py");
        assert!(matches!(
            server.stop().await,
            Err(LocalAIError::ServerNotStarted)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_and_stop_process() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("main.sh");
        std::fs::write(&script, "exec sleep 30\n").unwrap();

        let mut server =
            InferenceServer::new(&script).with_stop_grace(Duration::from_millis(300));
        let activation = Activation::for_interpreter("/bin/sh");

        let pid = server.start(&activation).unwrap();
        assert!(pid > 0);
        assert!(server.is_running());

        assert!(matches!(
            server.start(&activation),
            Err(LocalAIError::ServerAlreadyRunning(p)) if p == pid
        ));

        let outcome = server.stop().await.unwrap();
        assert_eq!(outcome, StopOutcome::Exited);
        assert!(!server.is_running());
    }
}
