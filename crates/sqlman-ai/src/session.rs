//! The AI session: bootstrap output plus model selection and SQL generation.

use serde_json::Value;
use sqlman_local_ai::{
    ActiveModel, AiStatus, AvailableModelSet, LoadError, LocalAIError, ModelLoader,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::bootstrap::{BootstrapError, Bootstrapper, InstallConfirmation};
use crate::config::BootstrapConfig;
use crate::provider::EnvironmentProvider;
use crate::status::BootstrapStatus;

/// Errors from [`AiSession::select`].
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("model '{0}' is not available on the server")]
    NotAvailable(String),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors from [`AiSession::generate_sql`].
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no model is loaded")]
    ModelNotReady,
    #[error(transparent)]
    Server(#[from] LocalAIError),
}

/// Owns the bootstrapper and the model loader, sharing one control client.
pub struct AiSession<P> {
    bootstrapper: Bootstrapper<P>,
    loader: ModelLoader,
}

impl<P: EnvironmentProvider> AiSession<P> {
    pub fn new(
        config: &BootstrapConfig,
        provider: P,
        confirm: impl InstallConfirmation + 'static,
    ) -> Self {
        Self::from_bootstrapper(Bootstrapper::new(config, provider, confirm))
    }

    pub fn from_bootstrapper(bootstrapper: Bootstrapper<P>) -> Self {
        let loader = ModelLoader::new(bootstrapper.client().clone());
        Self {
            bootstrapper,
            loader,
        }
    }

    pub fn bootstrapper(&self) -> &Bootstrapper<P> {
        &self.bootstrapper
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    /// Run (or re-run) the bootstrap pipeline.
    ///
    /// A model loaded earlier stays active; the server decides whether it
    /// still has it.
    pub async fn start(&self) -> Result<AvailableModelSet, BootstrapError> {
        self.bootstrapper.run().await
    }

    pub fn bootstrap_status(&self) -> BootstrapStatus {
        self.bootstrapper.status()
    }

    pub fn subscribe_bootstrap(&self) -> watch::Receiver<BootstrapStatus> {
        self.bootstrapper.subscribe()
    }

    pub fn available_models(&self) -> AvailableModelSet {
        self.bootstrapper.available_models()
    }

    pub fn ai_status(&self) -> AiStatus {
        self.loader.status()
    }

    pub fn subscribe_ai(&self) -> watch::Receiver<AiStatus> {
        self.loader.subscribe()
    }

    /// A model is loaded and no load is in flight.
    pub fn is_ready(&self) -> bool {
        self.loader.is_ready()
    }

    /// Load a model from the current available set.
    pub async fn select(&self, storage_identifier: &str) -> Result<ActiveModel, SelectError> {
        if !self
            .bootstrapper
            .available_models()
            .contains(storage_identifier)
        {
            return Err(SelectError::NotAvailable(storage_identifier.to_string()));
        }
        Ok(self.loader.load(storage_identifier).await?)
    }

    /// Load any identifier; the server is the judge.
    pub async fn load(&self, storage_identifier: &str) -> Result<ActiveModel, LoadError> {
        self.loader.load(storage_identifier).await
    }

    pub async fn unload(&self) -> Result<String, LocalAIError> {
        self.loader.unload().await
    }

    /// Hand the database schema to the server as generation context.
    pub async fn set_schema(&self, schema: &Value) -> Result<String, LocalAIError> {
        self.bootstrapper.client().set_schema(schema).await
    }

    /// Turn a natural-language request into SQL.
    pub async fn generate_sql(&self, prompt: &str) -> Result<String, GenerateError> {
        if !self.loader.is_ready() {
            return Err(GenerateError::ModelNotReady);
        }
        Ok(self.bootstrapper.client().generate_sql(prompt).await?)
    }

    /// Stop the server. The loaded model and the available set go with it.
    pub async fn stop(&self) -> Result<String, BootstrapError> {
        let message = self.bootstrapper.stop_server().await?;
        self.loader.reset();
        info!("AI session stopped");
        Ok(message)
    }
}
