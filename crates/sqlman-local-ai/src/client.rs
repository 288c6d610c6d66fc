//! HTTP client for the inference server's control endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::LocalAIError;
use crate::DEFAULT_PORT;

/// Timeout applied to liveness probes.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for configuration and listing requests.
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for communicating with the local inference server.
///
/// `load_model` and `generate_sql` carry no timeout: a load may include the
/// model download. Every other control request is bounded by
/// `control_timeout`.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: reqwest::Client,
    base_url: String,
    control_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct TokenRepoRequest<'a> {
    token: &'a str,
    repo: &'a str,
}

#[derive(Debug, Serialize)]
struct LoadModelRequest<'a> {
    model_name: &'a str,
}

#[derive(Debug, Serialize)]
struct SchemaRequest<'a> {
    schema: &'a Value,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

/// `{"message": ...}` acknowledgement returned by most endpoints.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

/// `{"detail": ...}` body of a FastAPI error.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Value,
}

impl ControlClient {
    /// Create a new client with default URL (localhost:8000).
    pub fn new() -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", DEFAULT_PORT))
    }

    /// Create a new client with a custom URL.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
        }
    }

    /// Set the timeout for configuration and listing requests.
    pub fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    /// Create a new client with a custom port on localhost.
    pub fn with_port(port: u16) -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", port))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn control_timeout(&self) -> Duration {
        self.control_timeout
    }

    /// Liveness probe. Any non-2xx answer counts as "not alive".
    pub async fn ping(&self) -> Result<(), LocalAIError> {
        let url = format!("{}/ping", self.base_url);

        let response = self
            .client
            .post(&url)
            .json("ping")
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LocalAIError::Api(format!("ping returned {}", response.status())))
        }
    }

    /// Configure the Hugging Face token and repository the server downloads
    /// models from.
    pub async fn set_token_and_repo(&self, token: &str, repo: &str) -> Result<String, LocalAIError> {
        let response = self
            .client
            .post(format!("{}/set_token_and_repo", self.base_url))
            .json(&TokenRepoRequest { token, repo })
            .timeout(self.control_timeout)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let ack: MessageResponse = Self::expect_success(response).await?.json().await?;
        Ok(ack.message)
    }

    /// List the GGUF files the server can load.
    pub async fn list_models(&self) -> Result<Vec<String>, LocalAIError> {
        const ENDPOINT: &str = "/list_models";

        let response = self
            .client
            .get(format!("{}{}", self.base_url, ENDPOINT))
            .timeout(self.control_timeout)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let text = Self::expect_success(response).await?.text().await?;
        let malformed = |reason: &str| LocalAIError::MalformedResponse {
            endpoint: ENDPOINT,
            reason: reason.to_string(),
        };

        let body: Value = serde_json::from_str(&text).map_err(|e| malformed(&e.to_string()))?;
        let models = body
            .get("models")
            .ok_or_else(|| malformed("missing `models` field"))?
            .as_array()
            .ok_or_else(|| malformed("`models` is not a list"))?;

        models
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("`models` contains a non-string entry"))
            })
            .collect()
    }

    /// Ask the server to download (if needed) and load a model.
    ///
    /// Returns the server's acknowledgement, e.g. "Model loaded on CPU".
    pub async fn load_model(&self, model_name: &str) -> Result<String, LocalAIError> {
        debug!("Requesting load of model {}", model_name);

        let response = self
            .client
            .post(format!("{}/load_model", self.base_url))
            .json(&LoadModelRequest { model_name })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let ack: MessageResponse = Self::expect_success(response).await?.json().await?;
        Ok(ack.message)
    }

    /// Drop the currently loaded model on the server.
    pub async fn unload_model(&self) -> Result<String, LocalAIError> {
        let response = self
            .client
            .post(format!("{}/unload_model", self.base_url))
            .timeout(self.control_timeout)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let ack: MessageResponse = Self::expect_success(response).await?.json().await?;
        Ok(ack.message)
    }

    /// Hand the table schemas used as generation context to the server.
    pub async fn set_schema(&self, schema: &Value) -> Result<String, LocalAIError> {
        let response = self
            .client
            .post(format!("{}/set_schema", self.base_url))
            .json(&SchemaRequest { schema })
            .timeout(self.control_timeout)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let ack: MessageResponse = Self::expect_success(response).await?.json().await?;
        Ok(ack.message)
    }

    /// Generate SQL for a natural-language prompt.
    ///
    /// The model tends to keep talking after the statement, so everything
    /// from the first code fence on is discarded.
    pub async fn generate_sql(&self, prompt: &str) -> Result<String, LocalAIError> {
        let response = self
            .client
            .post(format!("{}/generate_sql", self.base_url))
            .json(&GenerateRequest { prompt })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let raw: String = Self::expect_success(response).await?.json().await?;
        let sql = raw.split("```").next().unwrap_or_default();
        Ok(sql.trim().to_string())
    }

    fn send_error(&self, e: reqwest::Error) -> LocalAIError {
        if e.is_connect() || e.is_timeout() {
            LocalAIError::ServerNotRunning(self.base_url.clone())
        } else {
            LocalAIError::Http(e)
        }
    }

    /// Pass 2xx responses through; turn anything else into an API error,
    /// preferring the server's `detail` message over the raw body.
    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, LocalAIError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(ErrorResponse {
                detail: Value::String(detail),
            }) => detail,
            Ok(ErrorResponse { detail }) => detail.to_string(),
            Err(_) => format!("{}: {}", status, text),
        };

        Err(LocalAIError::Api(message))
    }
}

impl Default for ControlClient {
    fn default() -> Self {
        Self::new()
    }
}
