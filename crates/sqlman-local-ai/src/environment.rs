//! Python runtime detection and the virtual environment the server runs in.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::LocalAIError;
use crate::paths::{venv_bin_dir, venv_python};
use crate::REQUIRED_PYTHON;

/// PyTorch wheels, installed from the CUDA index.
pub const TORCH_PACKAGES: &[&str] = &["torch", "torchvision", "torchaudio"];

/// Wheel index for [`TORCH_PACKAGES`].
pub const TORCH_INDEX_URL: &str = "https://download.pytorch.org/whl/cu124";

/// Pinned server dependencies.
pub const REQUIRED_PACKAGES: &[&str] = &[
    "aiohttp==3.10.0",
    "aiofiles==24.1.0",
    "huggingface_hub==0.24.3",
    "ctransformers==0.2.27",
    "psutil==5.9.6",
    "fastapi==0.111.1",
    "uvicorn==0.30.3",
    "pydantic==2.8.2",
    "numpy==1.26.4",
];

/// Microsoft Store package id of Python 3.10.
#[cfg(target_os = "windows")]
const PYTHON_STORE_ID: &str = "9PJPW5LDXLZ5";

#[cfg(target_os = "windows")]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Parsed `python --version` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    /// Parse output such as `Python 3.10.11`.
    pub fn parse(output: &str) -> Option<Self> {
        let version = output.split_whitespace().nth(1)?;
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        // Pre-releases report e.g. `3.13.0rc1`.
        let patch = parts
            .next()?
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok()?;
        Some(Self {
            major,
            minor,
            patch,
        })
    }

    pub fn matches(&self, (major, minor): (u32, u32)) -> bool {
        self.major == major && self.minor == minor
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What runtime detection found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeProbe {
    /// A suitable interpreter.
    Found { path: PathBuf, version: PythonVersion },
    /// An interpreter of another release line.
    WrongVersion { path: PathBuf, version: PythonVersion },
    /// No interpreter on PATH.
    NotFound,
}

/// Result of [`PythonEnvironment::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentState {
    Existing,
    Created,
}

/// Environment overlay that makes a process run inside the virtualenv.
///
/// Applied to the spawned server instead of mutating this process's
/// environment.
#[derive(Debug, Clone)]
pub struct Activation {
    python: PathBuf,
    vars: Vec<(OsString, OsString)>,
    removed: Vec<OsString>,
}

impl Activation {
    fn for_venv(venv: &Path) -> Result<Self, LocalAIError> {
        let bin = venv_bin_dir(venv);
        let mut search_path = vec![bin.clone()];
        if let Some(existing) = std::env::var_os("PATH") {
            search_path.extend(std::env::split_paths(&existing));
        }
        let path = std::env::join_paths(search_path)
            .map_err(|e| LocalAIError::EnvironmentNotFound(e.to_string()))?;

        Ok(Self {
            python: venv_python(venv),
            vars: vec![
                (OsString::from("VIRTUAL_ENV"), venv.as_os_str().to_os_string()),
                (OsString::from("PATH"), path),
            ],
            removed: vec![OsString::from("PYTHONHOME")],
        })
    }

    /// Overlay that runs `python` with an otherwise untouched environment.
    #[cfg(test)]
    pub(crate) fn for_interpreter(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            vars: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Interpreter inside the virtualenv.
    pub fn python(&self) -> &Path {
        &self.python
    }

    pub fn var(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Apply the overlay to a command about to be spawned.
    pub fn apply(&self, command: &mut Command) {
        for key in &self.removed {
            command.env_remove(key);
        }
        command.envs(self.vars.iter().map(|(k, v)| (k, v)));
    }
}

/// Manager for the Python runtime and the server's virtual environment.
#[derive(Debug)]
pub struct PythonEnvironment {
    venv_dir: PathBuf,
    required: (u32, u32),
    activation: Option<Activation>,
}

impl PythonEnvironment {
    pub fn new(venv_dir: impl Into<PathBuf>) -> Self {
        Self {
            venv_dir: venv_dir.into(),
            required: REQUIRED_PYTHON,
            activation: None,
        }
    }

    /// Require another Python release line.
    pub fn with_required_version(mut self, major: u32, minor: u32) -> Self {
        self.required = (major, minor);
        self
    }

    pub fn venv_dir(&self) -> &Path {
        &self.venv_dir
    }

    pub fn required_version(&self) -> (u32, u32) {
        self.required
    }

    pub fn exists(&self) -> bool {
        self.venv_dir.exists()
    }

    /// Find a Python interpreter on PATH.
    pub async fn locate_interpreter() -> Option<PathBuf> {
        let candidates: &[&str] = if cfg!(target_os = "windows") {
            &["python"]
        } else {
            &["python3", "python"]
        };
        let finder = if cfg!(target_os = "windows") {
            "where"
        } else {
            "which"
        };

        for candidate in candidates {
            let Ok(output) = command(finder).arg(candidate).output().await else {
                continue;
            };
            if !output.status.success() {
                continue;
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(first) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
                return Some(PathBuf::from(first));
            }
        }

        None
    }

    /// Detect the system interpreter and its version.
    pub async fn detect_runtime(&self) -> Result<RuntimeProbe, LocalAIError> {
        let Some(path) = Self::locate_interpreter().await else {
            return Ok(RuntimeProbe::NotFound);
        };

        let output = run(command(&path).arg("--version")).await?;
        // Python 2 prints its version to stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };

        let version = PythonVersion::parse(&text)
            .ok_or_else(|| LocalAIError::RuntimeCheckFailed(text.trim().to_string()))?;
        debug!("Found Python {} at {}", version, path.display());

        if version.matches(self.required) {
            Ok(RuntimeProbe::Found { path, version })
        } else {
            Ok(RuntimeProbe::WrongVersion { path, version })
        }
    }

    /// Install Python 3.10 through winget.
    #[cfg(target_os = "windows")]
    pub async fn install_runtime(&self) -> Result<String, LocalAIError> {
        info!("Starting Python 3.10 installation using winget...");
        run(command("winget").args([
            "install",
            "--id",
            PYTHON_STORE_ID,
            "--source",
            "msstore",
            "--silent",
            "--accept-package-agreements",
            "--accept-source-agreements",
        ]))
        .await?;
        Ok("Python 3.10 installation process completed.".to_string())
    }

    /// Automatic installation is only wired up for Windows.
    #[cfg(not(target_os = "windows"))]
    pub async fn install_runtime(&self) -> Result<String, LocalAIError> {
        Err(LocalAIError::Unsupported(format!(
            "automatic Python installation is only available on Windows; install Python {}.{} with your package manager",
            self.required.0, self.required.1
        )))
    }

    /// Human-readable diagnosis of the interpreter found on PATH.
    pub async fn installation_status(&self) -> String {
        match self.detect_runtime().await {
            Ok(RuntimeProbe::Found { path, version }) => {
                format!("Python {} is installed and in PATH ({})", version, path.display())
            }
            Ok(RuntimeProbe::WrongVersion { path, version }) => format!(
                "Python is installed ({} at {}), but version {}.{} is not in PATH. A system restart may be required.",
                version,
                path.display(),
                self.required.0,
                self.required.1
            ),
            Ok(RuntimeProbe::NotFound) => format!(
                "Python {}.{} installation not detected in PATH. A system restart may be required.",
                self.required.0, self.required.1
            ),
            Err(e) => format!("Could not determine Python installation: {}", e),
        }
    }

    /// Create the virtualenv and install the server dependencies, unless it
    /// already exists.
    pub async fn ensure(&self) -> Result<EnvironmentState, LocalAIError> {
        if self.exists() {
            debug!("Virtual environment {} already exists", self.venv_dir.display());
            return Ok(EnvironmentState::Existing);
        }

        let python = Self::locate_interpreter()
            .await
            .ok_or_else(|| LocalAIError::RuntimeNotFound("not found in PATH".to_string()))?;

        info!("Creating virtual environment {}", self.venv_dir.display());
        run(command(&python)
            .args(["-m", "venv"])
            .arg(&self.venv_dir))
        .await?;

        if let Err(e) = self.install_packages().await {
            // A half-provisioned venv would be reported as existing next time.
            warn!("Package installation failed, removing {}", self.venv_dir.display());
            let _ = fs::remove_dir_all(&self.venv_dir);
            return Err(e);
        }

        info!("Virtual environment {} ready", self.venv_dir.display());
        Ok(EnvironmentState::Created)
    }

    /// Re-run the dependency installation into an existing virtualenv.
    pub async fn update_requirements(&self) -> Result<(), LocalAIError> {
        if !self.exists() {
            return Err(LocalAIError::EnvironmentNotFound(
                self.venv_dir.display().to_string(),
            ));
        }
        self.install_packages().await
    }

    async fn install_packages(&self) -> Result<(), LocalAIError> {
        let python = venv_python(&self.venv_dir);

        info!("Installing {}", TORCH_PACKAGES.join(", "));
        run(command(&python)
            .args(["-m", "pip", "install"])
            .args(TORCH_PACKAGES)
            .args(["--index-url", TORCH_INDEX_URL]))
        .await?;

        info!("Installing server dependencies");
        run(command(&python)
            .args(["-m", "pip", "install"])
            .args(REQUIRED_PACKAGES))
        .await?;

        Ok(())
    }

    /// Prepare the activation overlay for the server process.
    pub fn activate(&mut self) -> Result<&Activation, LocalAIError> {
        if !venv_python(&self.venv_dir).exists() {
            return Err(LocalAIError::EnvironmentNotFound(
                self.venv_dir.display().to_string(),
            ));
        }

        let activation = Activation::for_venv(&self.venv_dir)?;
        info!("Virtual environment {} activated", self.venv_dir.display());
        Ok(self.activation.insert(activation))
    }

    pub fn activation(&self) -> Option<&Activation> {
        self.activation.as_ref()
    }

    /// Remove the virtualenv. Returns `false` when there was nothing to
    /// remove.
    pub fn delete(&mut self) -> Result<bool, LocalAIError> {
        self.activation = None;
        if !self.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&self.venv_dir)?;
        info!("Deleted virtual environment {}", self.venv_dir.display());
        Ok(true)
    }
}

/// Command without a console window on Windows.
fn command(program: impl AsRef<OsStr>) -> Command {
    #[allow(unused_mut)]
    let mut command = Command::new(program);
    #[cfg(target_os = "windows")]
    command.creation_flags(CREATE_NO_WINDOW);
    command
}

/// Run to completion, turning a non-zero exit into an error carrying stderr.
async fn run(command: &mut Command) -> Result<Output, LocalAIError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    let output = command.output().await.map_err(|e| LocalAIError::CommandFailed {
        program: program.clone(),
        stderr: e.to_string(),
    })?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(LocalAIError::CommandFailed {
            program,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
