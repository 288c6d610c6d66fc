//! Bounded liveness polling for a freshly started server.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::ControlClient;
use crate::error::LocalAIError;

/// Default number of probes before giving up.
pub const DEFAULT_READY_ATTEMPTS: u32 = 5;

/// Default pause between two failed probes.
pub const DEFAULT_READY_INTERVAL: Duration = Duration::from_millis(1000);

/// Outcome of a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A probe succeeded on attempt number `attempts`.
    Ready { attempts: u32 },
    /// Every probe failed.
    Exhausted { attempts: u32 },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    /// Number of probes issued.
    pub fn attempts(&self) -> u32 {
        match self {
            Readiness::Ready { attempts } | Readiness::Exhausted { attempts } => *attempts,
        }
    }
}

/// Repeatedly probes a server until it answers or the attempt budget runs out.
///
/// Start-up latency of the Python server varies (interpreter start, torch
/// import) but is bounded; a server that is still silent after the budget is
/// treated as broken rather than slow.
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    max_attempts: u32,
    interval: Duration,
}

impl ReadinessPoller {
    /// Create a poller. At least one probe is always issued.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `probe` until it succeeds or `max_attempts` probes have failed.
    ///
    /// Every failure, whether a transport error or an unsuccessful status,
    /// consumes one attempt. There is no pause after the last attempt.
    pub async fn await_ready<F, Fut>(&self, mut probe: F) -> Readiness
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), LocalAIError>>,
    {
        for attempt in 1..=self.max_attempts {
            match probe().await {
                Ok(()) => {
                    info!("Server ready after {} attempt(s)", attempt);
                    return Readiness::Ready { attempts: attempt };
                }
                Err(e) => {
                    debug!("Readiness probe {}/{} failed: {}", attempt, self.max_attempts, e);
                    if attempt < self.max_attempts {
                        sleep(self.interval).await;
                    }
                }
            }
        }

        warn!("Server not ready after {} attempts", self.max_attempts);
        Readiness::Exhausted {
            attempts: self.max_attempts,
        }
    }

    /// Poll the `/ping` endpoint of `client`.
    pub async fn await_server(&self, client: &ControlClient) -> Readiness {
        self.await_ready(move || client.ping()).await
    }
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::new(DEFAULT_READY_ATTEMPTS, DEFAULT_READY_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Instant;

    fn failing() -> Result<(), LocalAIError> {
        Err(LocalAIError::Api("connection refused".to_string()))
    }

    #[test]
    fn test_defaults() {
        let poller = ReadinessPoller::default();
        assert_eq!(poller.max_attempts(), 5);
        assert_eq!(poller.interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_attempts_still_probes_once() {
        assert_eq!(ReadinessPoller::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_always_failing_probe_exhausts_budget() {
        let poller = ReadinessPoller::new(5, Duration::from_millis(10));
        let mut calls = 0;
        let started = Instant::now();

        let outcome = poller
            .await_ready(|| {
                calls += 1;
                async { failing() }
            })
            .await;

        assert_eq!(outcome, Readiness::Exhausted { attempts: 5 });
        assert_eq!(calls, 5);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_probe_succeeding_on_third_attempt() {
        let poller = ReadinessPoller::new(5, Duration::from_millis(10));
        let mut calls = 0;

        let outcome = poller
            .await_ready(|| {
                calls += 1;
                let current = calls;
                async move {
                    if current >= 3 {
                        Ok(())
                    } else {
                        failing()
                    }
                }
            })
            .await;

        assert_eq!(outcome, Readiness::Ready { attempts: 3 });
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_non_success_status_counts_as_failure() {
        let server = MockServer::start();
        let ping = server.mock(|when, then| {
            when.method(POST).path("/ping");
            then.status(500);
        });

        let client = ControlClient::with_url(server.base_url());
        let outcome = ReadinessPoller::new(3, Duration::from_millis(5))
            .await_server(&client)
            .await;

        assert_eq!(outcome, Readiness::Exhausted { attempts: 3 });
        ping.assert_calls(3);
    }

    #[tokio::test]
    async fn test_healthy_server_ready_on_first_attempt() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ping");
            then.status(200).json_body(serde_json::json!({"message": "Pong"}));
        });

        let client = ControlClient::with_url(server.base_url());
        let outcome = ReadinessPoller::default().await_server(&client).await;
        assert_eq!(outcome, Readiness::Ready { attempts: 1 });
        assert!(outcome.is_ready());
    }
}
