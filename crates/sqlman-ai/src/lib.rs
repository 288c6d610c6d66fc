//! # SQLMan AI
//!
//! Brings the local AI backend from "nothing installed" to "models
//! available", and then serves model selection and SQL generation.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Python check │-->│  virtualenv  │-->│ start server │-->│  readiness   │
//! │ (+ install)  │   │ ensure/activ │   │   process    │   │    probe     │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                 │
//!                    ┌──────────────┐   ┌──────────────┐          │
//!                    │    Ready     │<--│ list models  │<--  token/repo
//!                    └──────────────┘   └──────────────┘
//! ```
//!
//! Any step that fails ends the run in `Failed`; nothing later executes.
//!
//! ## Usage
//!
//! ```ignore
//! use sqlman_ai::{AiSession, BootstrapConfig, PythonProvider};
//!
//! let config = BootstrapConfig::from_env();
//! let provider = PythonProvider::from_config(&config);
//! let session = AiSession::new(&config, provider, |reason: &str| ask_user(reason));
//!
//! let available = session.start().await?;
//! session.select("sqlman-finetuned.Q4_K_M.gguf").await?;
//! let sql = session.generate_sql("count users by country").await?;
//! ```

mod bootstrap;
mod config;
mod provider;
mod session;
mod status;

#[cfg(test)]
mod testing;

pub use bootstrap::{BootstrapError, Bootstrapper, FailureCategory, InstallConfirmation};
pub use config::{parse_release, BootstrapConfig, BootstrapConfigBuilder};
pub use provider::{EnvironmentProvider, ProviderError, PythonProvider, RuntimeStatus};
pub use session::{AiSession, GenerateError, SelectError};
pub use status::{BootstrapStage, BootstrapStatus};

// Re-export local AI types
pub use sqlman_local_ai::{
    paths as local_ai_paths, ActiveModel, AiStatus, AvailableModelSet, ControlClient,
    InferenceServer, LoadError, LocalAIError, ModelCatalog, ModelDescriptor, PythonEnvironment,
    RuntimeProbe, DEFAULT_MODEL_REPO, DEFAULT_PORT as DEFAULT_LOCAL_AI_PORT, MODEL_CATALOG,
    REQUIRED_PACKAGES,
};
