//! Bootstrap orchestrator - provisions Python, starts the inference server
//! and fetches the model catalog, strictly in that order.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlman_local_ai::{AvailableModelSet, ControlClient, ModelCatalog, Readiness, ReadinessPoller};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::BootstrapConfig;
use crate::provider::{EnvironmentProvider, RuntimeStatus};
use crate::status::{BootstrapStage, BootstrapStatus};

/// Errors that end a bootstrap run.
///
/// Messages are captured as text so the error can live inside the published
/// [`BootstrapStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("another bootstrap operation is already in progress")]
    Busy,
    #[error("could not check Python installation: {0}")]
    RuntimeCheck(String),
    #[error("{0} Installation was declined.")]
    InstallDeclined(String),
    #[error("error installing Python: {0}")]
    RuntimeInstall(String),
    #[error("error preparing virtual environment: {0}")]
    Environment(String),
    #[error("error activating virtual environment: {0}")]
    Activation(String),
    #[error("error starting inference server: {0}")]
    ServerStart(String),
    #[error("server did not become reachable after {attempts} attempts")]
    Unreachable { attempts: u32 },
    #[error("error setting token and repo: {0}")]
    Credentials(String),
    #[error("error fetching models: {0}")]
    Catalog(String),
    #[error("error stopping inference server: {0}")]
    ServerStop(String),
}

/// Coarse grouping of [`BootstrapError`]s for user-facing hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Rejected because another operation was running.
    Busy,
    /// Runtime, environment or process management failed.
    Provisioning,
    /// The server started but never answered.
    Reachability,
    /// The server answered, but a control request failed.
    Transport,
}

impl BootstrapError {
    pub fn category(&self) -> FailureCategory {
        match self {
            BootstrapError::Busy => FailureCategory::Busy,
            BootstrapError::RuntimeCheck(_)
            | BootstrapError::InstallDeclined(_)
            | BootstrapError::RuntimeInstall(_)
            | BootstrapError::Environment(_)
            | BootstrapError::Activation(_)
            | BootstrapError::ServerStart(_)
            | BootstrapError::ServerStop(_) => FailureCategory::Provisioning,
            BootstrapError::Unreachable { .. } => FailureCategory::Reachability,
            BootstrapError::Credentials(_) | BootstrapError::Catalog(_) => {
                FailureCategory::Transport
            }
        }
    }
}

/// Asks the user whether a missing runtime may be installed.
///
/// The run is suspended on the returned future, so observers of the status
/// keep running while the user decides.
#[async_trait]
pub trait InstallConfirmation: Send + Sync {
    async fn confirm_install(&self, reason: &str) -> bool;
}

/// Answers decided without asking anyone, e.g. from a `--yes` flag.
#[async_trait]
impl<F> InstallConfirmation for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    async fn confirm_install(&self, reason: &str) -> bool {
        self(reason)
    }
}

/// Drives an [`EnvironmentProvider`] and the control endpoint through the
/// bootstrap pipeline.
///
/// The orchestrator is the only writer of the bootstrap status and the
/// available model set; both are published through watch channels. Every
/// transition is also broadcast so observers can follow the full sequence.
pub struct Bootstrapper<P> {
    provider: Mutex<P>,
    client: ControlClient,
    poller: ReadinessPoller,
    catalog: ModelCatalog,
    hf_token: String,
    model_repo: String,
    confirm: Box<dyn InstallConfirmation>,
    status: watch::Sender<BootstrapStatus>,
    available: watch::Sender<AvailableModelSet>,
    events: broadcast::Sender<BootstrapStatus>,
    busy: AtomicBool,
}

/// Holds the single-flight flag for the duration of an operation.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, BootstrapError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(flag))
            .map_err(|_| BootstrapError::Busy)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: EnvironmentProvider> Bootstrapper<P> {
    pub fn new(
        config: &BootstrapConfig,
        provider: P,
        confirm: impl InstallConfirmation + 'static,
    ) -> Self {
        let (status, _) = watch::channel(BootstrapStatus::idle());
        let (available, _) = watch::channel(AvailableModelSet::default());
        let (events, _) = broadcast::channel(32);

        Self {
            provider: Mutex::new(provider),
            client: ControlClient::with_url(config.server_url.clone())
                .with_control_timeout(config.control_timeout),
            poller: ReadinessPoller::new(config.ready_attempts, config.ready_interval),
            catalog: ModelCatalog::builtin(),
            hf_token: config.hf_token.clone(),
            model_repo: config.model_repo.clone(),
            confirm: Box::new(confirm),
            status,
            available,
            events,
            busy: AtomicBool::new(false),
        }
    }

    /// Use a different model catalog.
    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn client(&self) -> &ControlClient {
        &self.client
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn status(&self) -> BootstrapStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BootstrapStatus> {
        self.status.subscribe()
    }

    /// Every status published from now on, in order.
    pub fn subscribe_events(&self) -> broadcast::Receiver<BootstrapStatus> {
        self.events.subscribe()
    }

    /// Models offered by the last successful catalog fetch.
    pub fn available_models(&self) -> AvailableModelSet {
        self.available.borrow().clone()
    }

    pub fn subscribe_models(&self) -> watch::Receiver<AvailableModelSet> {
        self.available.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run the whole pipeline from the runtime check.
    ///
    /// Nothing from an earlier run is trusted; every step executes again.
    /// A call made while another run (or a stop) is in progress is rejected
    /// with [`BootstrapError::Busy`] and leaves the status untouched.
    pub async fn run(&self) -> Result<AvailableModelSet, BootstrapError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut provider = self.provider.lock().await;

        info!("Starting bootstrap");
        match self.pipeline(&mut *provider).await {
            Ok(available) => {
                self.available.send_replace(available.clone());
                self.transition(
                    BootstrapStage::Ready,
                    format!("{} model(s) available", available.len()),
                );
                Ok(available)
            }
            Err(e) => {
                let current = self.status();
                warn!("Bootstrap failed while {}: {}", current.stage, e);
                self.publish(BootstrapStatus::failed(current.stage, current.message, e.clone()));
                Err(e)
            }
        }
    }

    async fn pipeline(&self, provider: &mut P) -> Result<AvailableModelSet, BootstrapError> {
        self.transition(BootstrapStage::CheckingRuntime, "Checking Python installation...");
        let runtime = provider
            .check_runtime()
            .await
            .map_err(|e| BootstrapError::RuntimeCheck(e.to_string()))?;

        match runtime {
            RuntimeStatus::Installed { version } => {
                debug!("Python {} present", version);
            }
            RuntimeStatus::Missing { reason } => {
                if !self.confirm.confirm_install(&reason).await {
                    return Err(BootstrapError::InstallDeclined(reason));
                }
                self.transition(BootstrapStage::InstallingRuntime, "Installing Python...");
                let message = provider
                    .install_runtime()
                    .await
                    .map_err(|e| BootstrapError::RuntimeInstall(e.to_string()))?;
                debug!("{}", message);
            }
        }

        self.transition(
            BootstrapStage::CheckingEnvironment,
            "Checking for virtual environment...",
        );
        let message = provider
            .ensure_environment()
            .await
            .map_err(|e| BootstrapError::Environment(e.to_string()))?;
        debug!("{}", message);

        self.transition(
            BootstrapStage::ActivatingEnvironment,
            "Activating virtual environment...",
        );
        let message = provider
            .activate_environment()
            .await
            .map_err(|e| BootstrapError::Activation(e.to_string()))?;
        debug!("{}", message);

        self.transition(BootstrapStage::StartingServer, "Loading python api...");
        let message = provider
            .start_server()
            .await
            .map_err(|e| BootstrapError::ServerStart(e.to_string()))?;
        debug!("{}", message);

        self.transition(
            BootstrapStage::AwaitingReadiness,
            "Waiting for the inference server to respond...",
        );
        match self.poller.await_server(&self.client).await {
            Readiness::Ready { .. } => {}
            Readiness::Exhausted { attempts } => {
                return Err(BootstrapError::Unreachable { attempts });
            }
        }

        self.transition(
            BootstrapStage::ConfiguringCredentials,
            "Configuring model repository...",
        );
        self.client
            .set_token_and_repo(&self.hf_token, &self.model_repo)
            .await
            .map_err(|e| BootstrapError::Credentials(e.to_string()))?;

        self.transition(BootstrapStage::FetchingCatalog, "Loading models...");
        self.catalog
            .fetch_available(&self.client)
            .await
            .map_err(|e| BootstrapError::Catalog(e.to_string()))
    }

    /// Stop the server process.
    ///
    /// Rejected while a bootstrap run is in progress. Once the server is
    /// gone the available set is emptied and the status moves to
    /// [`BootstrapStage::Stopped`].
    pub async fn stop_server(&self) -> Result<String, BootstrapError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut provider = self.provider.lock().await;

        let message = provider
            .stop_server()
            .await
            .map_err(|e| BootstrapError::ServerStop(e.to_string()))?;
        self.available.send_replace(AvailableModelSet::default());
        self.transition(BootstrapStage::Stopped, message.clone());
        Ok(message)
    }

    fn transition(&self, stage: BootstrapStage, message: impl Into<String>) {
        let status = BootstrapStatus::at(stage, message);
        info!("[{}] {}", status.stage, status.message);
        self.publish(status);
    }

    fn publish(&self, status: BootstrapStatus) {
        // Nobody listening is fine.
        let _ = self.events.send(status.clone());
        self.status.send_replace(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn drain(rx: &mut broadcast::Receiver<BootstrapStatus>) -> Vec<BootstrapStage> {
        let mut stages = Vec::new();
        while let Ok(status) = rx.try_recv() {
            stages.push(status.stage);
        }
        stages
    }

    #[tokio::test]
    async fn test_end_to_end_ready() {
        let server = MockServer::start();
        let mocks = healthy_server(&server);
        let (provider, calls) = FakeProvider::healthy();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, decline);

        let available = bootstrapper.run().await.unwrap();

        let names: Vec<_> = available.iter().map(|m| m.display_name).collect();
        assert_eq!(names, vec!["4-bit quntized Model - 03"]);
        assert!(bootstrapper.status().is_ready());
        assert_eq!(bootstrapper.available_models(), available);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "check_runtime",
                "ensure_environment",
                "activate_environment",
                "start_server"
            ]
        );
        mocks.ping.assert_calls(1);
        mocks.credentials.assert_calls(1);
        mocks.catalog.assert_calls(1);
    }

    #[tokio::test]
    async fn test_stage_order() {
        use BootstrapStage::*;

        let server = MockServer::start();
        let _mocks = healthy_server(&server);
        let (provider, _) = FakeProvider::missing_runtime();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);
        let mut events = bootstrapper.subscribe_events();

        bootstrapper.run().await.unwrap();

        assert_eq!(
            drain(&mut events),
            vec![
                CheckingRuntime,
                InstallingRuntime,
                CheckingEnvironment,
                ActivatingEnvironment,
                StartingServer,
                AwaitingReadiness,
                ConfiguringCredentials,
                FetchingCatalog,
                Ready,
            ]
        );
    }

    #[tokio::test]
    async fn test_declined_install_never_starts_server() {
        let server = MockServer::start();
        let mocks = healthy_server(&server);
        let (provider, calls) = FakeProvider::missing_runtime();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, decline);

        let err = bootstrapper.run().await.unwrap_err();

        assert!(matches!(err, BootstrapError::InstallDeclined(_)));
        let status = bootstrapper.status();
        assert!(status.is_failed());
        assert_eq!(status.failed_at, Some(BootstrapStage::CheckingRuntime));
        assert_eq!(status.error, Some(err));
        assert_eq!(*calls.lock().unwrap(), vec!["check_runtime"]);
        mocks.ping.assert_calls(0);
    }

    #[tokio::test]
    async fn test_confirmed_install_continues() {
        let server = MockServer::start();
        let _mocks = healthy_server(&server);
        let (provider, calls) = FakeProvider::missing_runtime();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        bootstrapper.run().await.unwrap();
        assert_eq!(calls.lock().unwrap()[..2], ["check_runtime", "install_runtime"]);
    }

    #[tokio::test]
    async fn test_failed_install_is_fatal() {
        let server = MockServer::start();
        let mocks = healthy_server(&server);
        let (mut provider, calls) = FakeProvider::missing_runtime();
        provider.fail = Some("install_runtime");
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        let err = bootstrapper.run().await.unwrap_err();

        assert!(matches!(err, BootstrapError::RuntimeInstall(_)));
        assert_eq!(
            bootstrapper.status().failed_at,
            Some(BootstrapStage::InstallingRuntime)
        );
        assert_eq!(*calls.lock().unwrap(), vec!["check_runtime", "install_runtime"]);
        mocks.ping.assert_calls(0);
    }

    #[tokio::test]
    async fn test_runtime_check_error_is_fatal() {
        let server = MockServer::start();
        let _mocks = healthy_server(&server);
        let (provider, calls) = FakeProvider::failing_at("check_runtime");
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        let err = bootstrapper.run().await.unwrap_err();
        assert!(matches!(err, BootstrapError::RuntimeCheck(_)));
        assert_eq!(err.category(), FailureCategory::Provisioning);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provisioning_failures_halt_pipeline() {
        let cases = [
            ("ensure_environment", BootstrapStage::CheckingEnvironment),
            ("activate_environment", BootstrapStage::ActivatingEnvironment),
            ("start_server", BootstrapStage::StartingServer),
        ];

        for (step, stage) in cases {
            let server = MockServer::start();
            let mocks = healthy_server(&server);
            let (provider, calls) = FakeProvider::failing_at(step);
            let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

            let err = bootstrapper.run().await.unwrap_err();

            assert_eq!(err.category(), FailureCategory::Provisioning, "{step}");
            assert_eq!(bootstrapper.status().failed_at, Some(stage), "{step}");
            assert_eq!(calls.lock().unwrap().last(), Some(&step));
            mocks.ping.assert_calls(0);
        }
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let server = MockServer::start();
        let ping = server.mock(|when, then| {
            when.method(POST).path("/ping");
            then.status(500);
        });
        let credentials = server.mock(|when, then| {
            when.method(POST).path("/set_token_and_repo");
            then.status(200).json_body(json!({"message": "ok"}));
        });
        let (provider, _) = FakeProvider::healthy();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        let err = bootstrapper.run().await.unwrap_err();

        assert_eq!(err, BootstrapError::Unreachable { attempts: 3 });
        assert_eq!(err.category(), FailureCategory::Reachability);
        assert_eq!(
            bootstrapper.status().failed_at,
            Some(BootstrapStage::AwaitingReadiness)
        );
        ping.assert_calls(3);
        credentials.assert_calls(0);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ping");
            then.status(200).json_body(json!({"message": "Pong"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/set_token_and_repo");
            then.status(422).json_body(json!({"detail": "field required"}));
        });
        let catalog = server.mock(|when, then| {
            when.method(GET).path("/list_models");
            then.status(200).json_body(json!({"models": []}));
        });
        let (provider, _) = FakeProvider::healthy();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        let err = bootstrapper.run().await.unwrap_err();

        assert!(matches!(err, BootstrapError::Credentials(_)));
        assert_eq!(err.category(), FailureCategory::Transport);
        catalog.assert_calls(0);
    }

    #[tokio::test]
    async fn test_malformed_catalog_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ping");
            then.status(200).json_body(json!({"message": "Pong"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/set_token_and_repo");
            then.status(200).json_body(json!({"message": "ok"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/list_models");
            then.status(200).json_body(json!({"models": {"a": 1}}));
        });
        let (provider, _) = FakeProvider::healthy();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        let err = bootstrapper.run().await.unwrap_err();

        assert!(matches!(err, BootstrapError::Catalog(_)));
        let status = bootstrapper.status();
        assert_eq!(status.failed_at, Some(BootstrapStage::FetchingCatalog));
        assert!(bootstrapper.available_models().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_re_executes_every_step() {
        let server = MockServer::start();
        let mocks = healthy_server(&server);
        let (provider, calls) = FakeProvider::healthy();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        bootstrapper.run().await.unwrap();
        let mut events = bootstrapper.subscribe_events();
        bootstrapper.run().await.unwrap();

        assert!(bootstrapper.status().is_ready());
        assert_eq!(calls.lock().unwrap().len(), 8);
        assert_eq!(drain(&mut events).first(), Some(&BootstrapStage::CheckingRuntime));
        mocks.ping.assert_calls(2);
        mocks.credentials.assert_calls(2);
        mocks.catalog.assert_calls(2);
    }

    #[tokio::test]
    async fn test_concurrent_run_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ping");
            then.status(200)
                .delay(Duration::from_millis(200))
                .json_body(json!({"message": "Pong"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/set_token_and_repo");
            then.status(200).json_body(json!({"message": "ok"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/list_models");
            then.status(200).json_body(json!({"models": []}));
        });
        let (provider, calls) = FakeProvider::healthy();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        let (first, second, stop) = tokio::join!(
            bootstrapper.run(),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                bootstrapper.run().await
            },
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                bootstrapper.stop_server().await
            }
        );

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), BootstrapError::Busy);
        assert_eq!(stop.unwrap_err(), BootstrapError::Busy);
        assert!(bootstrapper.status().is_ready());
        assert!(!calls.lock().unwrap().contains(&"stop_server"));
        assert!(!bootstrapper.is_busy());
    }

    #[tokio::test]
    async fn test_stop_server_after_ready() {
        let server = MockServer::start();
        let _mocks = healthy_server(&server);
        let (provider, calls) = FakeProvider::healthy();
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        bootstrapper.run().await.unwrap();
        assert_eq!(bootstrapper.available_models().len(), 1);
        let message = bootstrapper.stop_server().await.unwrap();

        assert_eq!(message, "stop_server ok");
        assert_eq!(calls.lock().unwrap().last(), Some(&"stop_server"));
        let status = bootstrapper.status();
        assert_eq!(status.stage, BootstrapStage::Stopped);
        assert!(!status.is_ready());
        assert!(bootstrapper.available_models().is_empty());
    }

    #[tokio::test]
    async fn test_failed_stop_keeps_status() {
        let server = MockServer::start();
        let _mocks = healthy_server(&server);
        let (provider, _) = FakeProvider::failing_at("stop_server");
        let bootstrapper = Bootstrapper::new(&config(&server), provider, accept);

        bootstrapper.run().await.unwrap();
        let err = bootstrapper.stop_server().await.unwrap_err();

        assert!(matches!(err, BootstrapError::ServerStop(_)));
        assert!(bootstrapper.status().is_ready());
        assert_eq!(bootstrapper.available_models().len(), 1);
    }

    #[tokio::test]
    async fn test_silent_catalog_fails_run() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ping");
            then.status(200).json_body(json!({"message": "Pong"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/set_token_and_repo");
            then.status(200).json_body(json!({"message": "ok"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/list_models");
            then.status(200)
                .delay(Duration::from_secs(10))
                .json_body(json!({"models": []}));
        });
        let (provider, calls) = FakeProvider::healthy();
        let config = BootstrapConfig {
            control_timeout: Duration::from_millis(200),
            ..config(&server)
        };
        let bootstrapper = Bootstrapper::new(&config, provider, accept);

        let result = tokio::time::timeout(Duration::from_secs(5), bootstrapper.run())
            .await
            .expect("run must settle");

        let err = result.unwrap_err();
        assert!(matches!(err, BootstrapError::Catalog(_)), "{err}");
        assert_eq!(
            bootstrapper.status().failed_at,
            Some(BootstrapStage::FetchingCatalog)
        );
        assert!(!bootstrapper.is_busy());

        bootstrapper.stop_server().await.unwrap();
        assert_eq!(calls.lock().unwrap().last(), Some(&"stop_server"));
    }

    /// Answers once the test releases the channel.
    struct DeferredAnswer(Mutex<Option<tokio::sync::oneshot::Receiver<bool>>>);

    #[async_trait]
    impl InstallConfirmation for DeferredAnswer {
        async fn confirm_install(&self, _reason: &str) -> bool {
            match self.0.lock().await.take() {
                Some(answer) => answer.await.unwrap_or(false),
                None => false,
            }
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_status_observable_while_awaiting_confirmation() {
        let server = MockServer::start();
        let _mocks = healthy_server(&server);
        let (provider, calls) = FakeProvider::missing_runtime();
        let (answer_tx, answer_rx) = tokio::sync::oneshot::channel();
        let bootstrapper = Bootstrapper::new(
            &config(&server),
            provider,
            DeferredAnswer(Mutex::new(Some(answer_rx))),
        );
        let mut status = bootstrapper.subscribe();

        let (result, ()) = tokio::join!(bootstrapper.run(), async {
            status
                .wait_for(|s| s.stage == BootstrapStage::CheckingRuntime)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(bootstrapper.status().stage, BootstrapStage::CheckingRuntime);
            assert!(!calls.lock().unwrap().contains(&"install_runtime"));
            answer_tx.send(true).unwrap();
        });

        assert!(result.is_ok());
        assert!(calls.lock().unwrap().contains(&"install_runtime"));
    }
}
