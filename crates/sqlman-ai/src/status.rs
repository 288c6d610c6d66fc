//! Bootstrap progress as observed by the UI.

use std::fmt;

use crate::bootstrap::BootstrapError;

/// Pipeline stage. Variants up to `Failed` are declared in pipeline order;
/// `Stopped` is only reached through an explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootstrapStage {
    /// No run has started yet.
    Idle,
    CheckingRuntime,
    InstallingRuntime,
    CheckingEnvironment,
    ActivatingEnvironment,
    StartingServer,
    AwaitingReadiness,
    ConfiguringCredentials,
    FetchingCatalog,
    Ready,
    Failed,
    /// The server was stopped after a run.
    Stopped,
}

impl BootstrapStage {
    /// A run that reached this stage is over.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BootstrapStage::Ready | BootstrapStage::Failed | BootstrapStage::Stopped
        )
    }

    /// A run is in progress.
    pub fn is_running(self) -> bool {
        !self.is_terminal() && self != BootstrapStage::Idle
    }

    pub fn label(self) -> &'static str {
        match self {
            BootstrapStage::Idle => "idle",
            BootstrapStage::CheckingRuntime => "checking runtime",
            BootstrapStage::InstallingRuntime => "installing runtime",
            BootstrapStage::CheckingEnvironment => "checking environment",
            BootstrapStage::ActivatingEnvironment => "activating environment",
            BootstrapStage::StartingServer => "starting server",
            BootstrapStage::AwaitingReadiness => "awaiting readiness",
            BootstrapStage::ConfiguringCredentials => "configuring credentials",
            BootstrapStage::FetchingCatalog => "fetching catalog",
            BootstrapStage::Ready => "ready",
            BootstrapStage::Failed => "failed",
            BootstrapStage::Stopped => "stopped",
        }
    }
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current bootstrap state: stage, human-readable message and, once failed,
/// the error plus the stage it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapStatus {
    pub stage: BootstrapStage,
    pub message: String,
    pub error: Option<BootstrapError>,
    pub failed_at: Option<BootstrapStage>,
}

impl BootstrapStatus {
    pub fn idle() -> Self {
        Self::at(BootstrapStage::Idle, "Waiting to start")
    }

    pub fn at(stage: BootstrapStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            error: None,
            failed_at: None,
        }
    }

    /// Failure raised while in `stage`. The message keeps what was on
    /// screen when it happened.
    pub fn failed(stage: BootstrapStage, message: impl Into<String>, error: BootstrapError) -> Self {
        Self {
            stage: BootstrapStage::Failed,
            message: message.into(),
            error: Some(error),
            failed_at: Some(stage),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.stage == BootstrapStage::Ready
    }

    pub fn is_failed(&self) -> bool {
        self.stage == BootstrapStage::Failed
    }
}

impl Default for BootstrapStatus {
    fn default() -> Self {
        Self::idle()
    }
}
