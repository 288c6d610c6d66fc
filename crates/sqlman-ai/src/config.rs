//! Bootstrap configuration.

use std::path::PathBuf;
use std::time::Duration;

use sqlman_local_ai::{
    paths, DEFAULT_CONTROL_TIMEOUT, DEFAULT_MODEL_REPO, DEFAULT_PORT, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_INTERVAL,
    REQUIRED_PYTHON,
};

/// Configuration for the bootstrap pipeline and the AI session.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Base URL of the server's control endpoint
    pub server_url: String,
    /// Hugging Face access token handed to the server
    pub hf_token: String,
    /// Hugging Face repository holding the GGUF models
    pub model_repo: String,
    /// Virtual environment directory
    pub venv_dir: PathBuf,
    /// Server entry point
    pub server_script: PathBuf,
    /// Required Python release line (major, minor)
    pub python_version: (u32, u32),
    /// Liveness probes before the server is declared unreachable
    pub ready_attempts: u32,
    /// Pause between liveness probes
    pub ready_interval: Duration,
    /// Bound on credential and catalog requests
    pub control_timeout: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            hf_token: String::new(),
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            venv_dir: paths::venv_dir(),
            server_script: paths::server_script_path(),
            python_version: REQUIRED_PYTHON,
            ready_attempts: DEFAULT_READY_ATTEMPTS,
            ready_interval: DEFAULT_READY_INTERVAL,
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
        }
    }
}

impl BootstrapConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let server_url = std::env::var("SQLMAN_SERVER_URL").unwrap_or(defaults.server_url);

        let hf_token = std::env::var("SQLMAN_HF_TOKEN")
            .or_else(|_| std::env::var("HF_TOKEN"))
            .unwrap_or_default();

        let model_repo = std::env::var("SQLMAN_MODEL_REPO").unwrap_or(defaults.model_repo);

        // A custom data dir moves every default path with it.
        let data_dir = std::env::var("SQLMAN_DATA_DIR").map(PathBuf::from).ok();

        let venv_dir = std::env::var("SQLMAN_VENV_DIR")
            .map(PathBuf::from)
            .ok()
            .or_else(|| data_dir.as_ref().map(|d| d.join("venv")))
            .unwrap_or(defaults.venv_dir);

        let server_script = std::env::var("SQLMAN_SERVER_SCRIPT")
            .map(PathBuf::from)
            .ok()
            .or_else(|| data_dir.as_ref().map(|d| d.join("scripts").join("main.py")))
            .unwrap_or(defaults.server_script);

        let python_version = std::env::var("SQLMAN_PYTHON_VERSION")
            .ok()
            .and_then(|v| parse_release(&v))
            .unwrap_or(defaults.python_version);

        let ready_attempts = std::env::var("SQLMAN_READY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.ready_attempts);

        let ready_interval = std::env::var("SQLMAN_READY_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.ready_interval);

        let control_timeout = std::env::var("SQLMAN_CONTROL_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.control_timeout);

        Self {
            server_url,
            hf_token,
            model_repo,
            venv_dir,
            server_script,
            python_version,
            ready_attempts,
            ready_interval,
            control_timeout,
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> BootstrapConfigBuilder {
        BootstrapConfigBuilder::default()
    }
}

/// Parse a `major.minor` release line such as `3.10`.
pub fn parse_release(value: &str) -> Option<(u32, u32)> {
    let (major, minor) = value.trim().split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Builder for bootstrap configuration.
#[derive(Debug, Default)]
pub struct BootstrapConfigBuilder {
    config: BootstrapConfig,
}

impl BootstrapConfigBuilder {
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    pub fn hf_token(mut self, token: impl Into<String>) -> Self {
        self.config.hf_token = token.into();
        self
    }

    pub fn model_repo(mut self, repo: impl Into<String>) -> Self {
        self.config.model_repo = repo.into();
        self
    }

    pub fn venv_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.venv_dir = path.into();
        self
    }

    pub fn server_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.server_script = path.into();
        self
    }

    pub fn python_version(mut self, major: u32, minor: u32) -> Self {
        self.config.python_version = (major, minor);
        self
    }

    pub fn ready_attempts(mut self, attempts: u32) -> Self {
        self.config.ready_attempts = attempts;
        self
    }

    pub fn ready_interval(mut self, interval: Duration) -> Self {
        self.config.ready_interval = interval;
        self
    }

    pub fn control_timeout(mut self, timeout: Duration) -> Self {
        self.config.control_timeout = timeout;
        self
    }

    pub fn build(self) -> BootstrapConfig {
        self.config
    }
}
