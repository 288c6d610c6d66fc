//! Shared fixtures: a scripted provider and a healthy control endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::json;

use crate::config::BootstrapConfig;
use crate::provider::{EnvironmentProvider, ProviderError, RuntimeStatus};

pub(crate) type CallLog = Arc<Mutex<Vec<&'static str>>>;

pub(crate) struct FakeProvider {
    pub(crate) runtime: RuntimeStatus,
    pub(crate) fail: Option<&'static str>,
    calls: CallLog,
}

impl FakeProvider {
    pub(crate) fn healthy() -> (Self, CallLog) {
        let calls = CallLog::default();
        let provider = Self {
            runtime: RuntimeStatus::Installed {
                version: "3.10.11".to_string(),
            },
            fail: None,
            calls: calls.clone(),
        };
        (provider, calls)
    }

    pub(crate) fn missing_runtime() -> (Self, CallLog) {
        let (mut provider, calls) = Self::healthy();
        provider.runtime = RuntimeStatus::Missing {
            reason: "Python 3.10 is not installed. Would you like to install it?".to_string(),
        };
        (provider, calls)
    }

    pub(crate) fn failing_at(step: &'static str) -> (Self, CallLog) {
        let (mut provider, calls) = Self::healthy();
        provider.fail = Some(step);
        (provider, calls)
    }

    fn record(&self, step: &'static str) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(step);
        if self.fail == Some(step) {
            Err(ProviderError::Failed(format!("{step} exploded")))
        } else {
            Ok(format!("{step} ok"))
        }
    }
}

#[async_trait]
impl EnvironmentProvider for FakeProvider {
    async fn check_runtime(&mut self) -> Result<RuntimeStatus, ProviderError> {
        self.record("check_runtime")?;
        Ok(self.runtime.clone())
    }

    async fn install_runtime(&mut self) -> Result<String, ProviderError> {
        self.record("install_runtime")
    }

    async fn ensure_environment(&mut self) -> Result<String, ProviderError> {
        self.record("ensure_environment")
    }

    async fn activate_environment(&mut self) -> Result<String, ProviderError> {
        self.record("activate_environment")
    }

    async fn start_server(&mut self) -> Result<String, ProviderError> {
        self.record("start_server")
    }

    async fn stop_server(&mut self) -> Result<String, ProviderError> {
        self.record("stop_server")
    }
}

pub(crate) struct ControlMocks<'a> {
    pub(crate) ping: httpmock::Mock<'a>,
    pub(crate) credentials: httpmock::Mock<'a>,
    pub(crate) catalog: httpmock::Mock<'a>,
}

pub(crate) fn healthy_server(server: &MockServer) -> ControlMocks<'_> {
    let ping = server.mock(|when, then| {
        when.method(POST).path("/ping");
        then.status(200).json_body(json!({"message": "Pong"}));
    });
    let credentials = server.mock(|when, then| {
        when.method(POST)
            .path("/set_token_and_repo")
            .json_body(json!({"token": "hf_test", "repo": "RazorRSD/SQLManModels"}));
        then.status(200)
            .json_body(json!({"message": "Token and repo set. Repo: RazorRSD/SQLManModels"}));
    });
    let catalog = server.mock(|when, then| {
        when.method(GET).path("/list_models");
        then.status(200)
            .json_body(json!({"models": ["sqlman-finetuned.Q4_K_M.gguf"]}));
    });
    ControlMocks {
        ping,
        credentials,
        catalog,
    }
}

pub(crate) fn config(server: &MockServer) -> BootstrapConfig {
    BootstrapConfig::builder()
        .server_url(server.base_url())
        .hf_token("hf_test")
        .ready_attempts(3)
        .ready_interval(Duration::from_millis(10))
        .build()
}

pub(crate) fn accept(_: &str) -> bool {
    true
}

pub(crate) fn decline(_: &str) -> bool {
    false
}
