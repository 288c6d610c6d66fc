//! Local AI backend for SQLMan.
//!
//! This crate owns everything that touches the outside world on behalf of
//! the AI features: the Python runtime and its virtual environment, the
//! inference server process, and the HTTP control endpoint that server
//! exposes (liveness, credentials, model catalog, model loading).

mod client;
mod environment;
mod error;
mod loader;
mod model;
pub mod paths;
mod readiness;
mod server;

pub use client::{ControlClient, DEFAULT_CONTROL_TIMEOUT};
pub use environment::{
    Activation, EnvironmentState, PythonEnvironment, PythonVersion, RuntimeProbe,
    REQUIRED_PACKAGES, TORCH_INDEX_URL, TORCH_PACKAGES,
};
pub use error::LocalAIError;
pub use loader::{ActiveModel, AiStatus, LoadError, ModelLoader};
pub use model::{AvailableModelSet, ModelCatalog, ModelDescriptor, MODEL_CATALOG};
pub use readiness::{Readiness, ReadinessPoller, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_INTERVAL};
pub use server::{InferenceServer, StopOutcome};

/// Port the bundled inference server listens on.
pub const DEFAULT_PORT: u16 = 8000;

/// Hugging Face repository hosting the fine-tuned GGUF models.
pub const DEFAULT_MODEL_REPO: &str = "RazorRSD/SQLManModels";

/// Python release line the server dependencies are pinned against.
pub const REQUIRED_PYTHON: (u32, u32) = (3, 10);
