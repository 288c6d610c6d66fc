//! Model loading and the "AI ready" signal.

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::ControlClient;
use crate::error::LocalAIError;

/// The model currently loaded on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModel {
    pub storage_identifier: String,
    /// Server acknowledgement, e.g. "Model loaded with GPU support".
    pub detail: String,
}

/// Snapshot observed by the parts of the application that gate on AI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiStatus {
    pub active_model: Option<ActiveModel>,
    /// A load request is in flight.
    pub loading: bool,
}

impl AiStatus {
    /// AI-assisted generation may be offered.
    pub fn is_ready(&self) -> bool {
        self.active_model.is_some() && !self.loading
    }

    pub fn model_name(&self) -> Option<&str> {
        self.active_model
            .as_ref()
            .map(|m| m.storage_identifier.as_str())
    }
}

/// Errors from [`ModelLoader::load`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("a model load is already in progress")]
    InFlight,
    #[error("failed to load model '{model}': {source}")]
    Server {
        model: String,
        #[source]
        source: LocalAIError,
    },
}

/// Sends load requests and publishes the resulting [`AiStatus`].
///
/// Membership in the available set is not checked here; whatever the server
/// says about an identifier is what the caller gets.
pub struct ModelLoader {
    client: ControlClient,
    status: watch::Sender<AiStatus>,
}

/// Clears the `loading` flag if a load future is dropped before it settles.
struct LoadingGuard<'a> {
    status: &'a watch::Sender<AiStatus>,
    settled: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.status.send_modify(|s| s.loading = false);
        }
    }
}

impl ModelLoader {
    pub fn new(client: ControlClient) -> Self {
        let (status, _) = watch::channel(AiStatus::default());
        Self { client, status }
    }

    pub fn client(&self) -> &ControlClient {
        &self.client
    }

    pub fn subscribe(&self) -> watch::Receiver<AiStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> AiStatus {
        self.status.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.status.borrow().is_ready()
    }

    pub fn active_model(&self) -> Option<ActiveModel> {
        self.status.borrow().active_model.clone()
    }

    /// Load `storage_identifier` on the server.
    ///
    /// Only one load may be in flight. On failure no model is considered
    /// loaded, including one that was active before the attempt.
    pub async fn load(&self, storage_identifier: &str) -> Result<ActiveModel, LoadError> {
        let mut started = false;
        self.status.send_if_modified(|s| {
            if s.loading {
                false
            } else {
                s.loading = true;
                started = true;
                true
            }
        });
        if !started {
            return Err(LoadError::InFlight);
        }

        let mut guard = LoadingGuard {
            status: &self.status,
            settled: false,
        };

        info!("Loading model {}", storage_identifier);
        let result = self.client.load_model(storage_identifier).await;
        guard.settled = true;

        match result {
            Ok(detail) => {
                let model = ActiveModel {
                    storage_identifier: storage_identifier.to_string(),
                    detail,
                };
                info!("Model {} loaded: {}", storage_identifier, model.detail);
                self.status.send_replace(AiStatus {
                    active_model: Some(model.clone()),
                    loading: false,
                });
                Ok(model)
            }
            Err(source) => {
                warn!("Loading model {} failed: {}", storage_identifier, source);
                self.status.send_replace(AiStatus::default());
                Err(LoadError::Server {
                    model: storage_identifier.to_string(),
                    source,
                })
            }
        }
    }

    /// Unload whatever the server has loaded.
    pub async fn unload(&self) -> Result<String, LocalAIError> {
        let message = self.client.unload_model().await?;
        self.status.send_modify(|s| s.active_model = None);
        info!("{}", message);
        Ok(message)
    }

    /// Forget the active model without talking to the server, e.g. after the
    /// server process was stopped.
    pub fn reset(&self) {
        self.status.send_replace(AiStatus::default());
    }
}
