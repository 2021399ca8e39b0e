//! Readiness polling
//!
//! After a template sync or a cluster deletion, Omni converges in the
//! background. The poller queries the matching status resource until it
//! reaches a terminal state:
//!
//! ```text
//! Polling { attempt } ──► Ready | Gone | Failed | TimedOut | Cancelled
//! ```
//!
//! A missing cluster status during a readiness wait means "not created yet"
//! and keeps polling. A missing destroy status during a deletion wait means
//! the deletion is complete. Any other lookup error ends the wait.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::state::OmniState;

/// Log a warning every this many attempts
const WARN_EVERY_ATTEMPTS: u32 = 10;

/// Poller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Give up after this long
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay after the first unsuccessful probe
    #[serde(default = "default_initial_interval", with = "humantime_serde")]
    pub initial_interval: Duration,

    /// Upper bound of the backoff delay
    #[serde(default = "default_max_interval", with = "humantime_serde")]
    pub max_interval: Duration,

    /// Backoff growth factor, at least 1.0
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Give up after this many probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_initial_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            initial_interval: default_initial_interval(),
            max_interval: default_max_interval(),
            multiplier: default_multiplier(),
            max_attempts: None,
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ProviderError::InvalidConfig(
                "poll timeout must be greater than zero".to_string(),
            ));
        }
        if self.initial_interval > self.max_interval {
            return Err(ProviderError::InvalidConfig(format!(
                "poll initial interval ({:?}) exceeds max interval ({:?})",
                self.initial_interval, self.max_interval
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ProviderError::InvalidConfig(format!(
                "poll multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(ProviderError::InvalidConfig(
                "poll max attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay following `current`
    fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// State of a poll
#[derive(Debug)]
pub enum PollState {
    Polling { attempt: u32 },
    Ready,
    Gone,
    Failed(ProviderError),
    TimedOut { attempts: u32 },
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling { .. })
    }
}

/// Outcome of a single probe
enum Probe {
    Pending,
    Done(PollState),
}

/// Waits for clusters to become ready or disappear
#[derive(Debug, Clone, Default)]
pub struct ReadinessPoller {
    config: PollConfig,
    cancel: CancellationToken,
}

impl ReadinessPoller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Token that cancels every wait of this poller
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait until the cluster status reports ready
    pub async fn await_ready<S>(&self, state: &S, cluster: &str) -> Result<()>
    where
        S: OmniState + ?Sized,
    {
        let outcome = self
            .run("readiness", cluster, move || async move {
                match state.cluster_status(cluster).await {
                    Ok(status) if status.ready => Probe::Done(PollState::Ready),
                    Ok(status) => {
                        tracing::debug!(cluster, phase = ?status.phase, "cluster not ready yet");
                        Probe::Pending
                    }
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(cluster, "cluster status not found yet");
                        Probe::Pending
                    }
                    Err(e) => Probe::Done(PollState::Failed(e)),
                }
            })
            .await;

        self.finish("readiness", cluster, outcome)
    }

    /// Wait until the cluster destroy status is gone
    pub async fn await_deleted<S>(&self, state: &S, cluster: &str) -> Result<()>
    where
        S: OmniState + ?Sized,
    {
        let outcome = self
            .run("deletion", cluster, move || async move {
                match state.cluster_destroy_status(cluster).await {
                    Ok(status) => {
                        tracing::debug!(
                            cluster,
                            phase = %status.phase,
                            "cluster still being destroyed"
                        );
                        Probe::Pending
                    }
                    Err(e) if e.is_not_found() => Probe::Done(PollState::Gone),
                    Err(e) => Probe::Done(PollState::Failed(e)),
                }
            })
            .await;

        self.finish("deletion", cluster, outcome)
    }

    async fn run<F, Fut>(
        &self,
        operation: &str,
        cluster: &str,
        mut probe: F,
    ) -> (PollState, Duration)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Probe>,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut interval = self.config.initial_interval;
        let mut attempt = 0;

        let state = loop {
            attempt += 1;
            tracing::debug!(operation, cluster, state = ?PollState::Polling { attempt }, "probing");
            if attempt % WARN_EVERY_ATTEMPTS == 0 {
                tracing::warn!(
                    operation,
                    cluster,
                    attempt,
                    elapsed = ?started.elapsed(),
                    "still waiting"
                );
            }

            let probed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Probe::Done(PollState::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    Probe::Done(PollState::TimedOut { attempts: attempt })
                }
                probed = probe() => probed,
            };

            if let Probe::Done(terminal) = probed {
                break terminal;
            }

            if self.config.max_attempts.is_some_and(|max| attempt >= max) {
                break PollState::TimedOut { attempts: attempt };
            }

            let now = Instant::now();
            if now >= deadline {
                break PollState::TimedOut { attempts: attempt };
            }

            // Never sleep past the deadline
            let delay = interval.min(deadline - now);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PollState::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }

            interval = self.config.next_interval(interval);
        };

        (state, started.elapsed())
    }

    fn finish(&self, operation: &str, cluster: &str, outcome: (PollState, Duration)) -> Result<()> {
        let (state, elapsed) = outcome;
        tracing::debug!(operation, cluster, state = ?state, elapsed = ?elapsed, "poll finished");

        match state {
            PollState::Ready | PollState::Gone => Ok(()),
            PollState::Failed(e) => Err(e),
            PollState::TimedOut { attempts } => Err(ProviderError::Timeout {
                operation: operation.to_string(),
                cluster: cluster.to_string(),
                elapsed,
                attempts,
            }),
            PollState::Polling { attempt } => Err(ProviderError::Timeout {
                operation: operation.to_string(),
                cluster: cluster.to_string(),
                elapsed,
                attempts: attempt,
            }),
            PollState::Cancelled => Err(ProviderError::Cancelled {
                operation: operation.to_string(),
                cluster: cluster.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ClusterPhase, ClusterStatus, MockOmniState};

    fn fast_config() -> PollConfig {
        PollConfig {
            timeout: Duration::from_secs(5),
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2.0,
            max_attempts: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.initial_interval, Duration::from_secs(1));
        assert_eq!(config.max_interval, Duration::from_secs(30));
        assert_eq!(config.multiplier, 2.0);
        assert!(config.max_attempts.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let config: PollConfig =
            serde_yaml::from_str("timeout: 5m\ninitialInterval: 500ms\nmaxAttempts: 20\n").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.initial_interval, Duration::from_millis(500));
        assert_eq!(config.max_interval, Duration::from_secs(30));
        assert_eq!(config.max_attempts, Some(20));
    }

    #[test]
    fn test_config_validation() {
        let mut config = fast_config();
        config.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = fast_config();
        config.initial_interval = Duration::from_secs(60);
        assert!(config.validate().is_err());

        let mut config = fast_config();
        config.max_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = PollConfig::default();
        let mut interval = config.initial_interval;
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(interval.as_secs());
            interval = config.next_interval(interval);
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[tokio::test]
    async fn test_not_found_then_ready() {
        let state = MockOmniState::new();
        state.push_cluster_status_error("prod", ProviderError::not_found("ClusterStatus", "prod"));
        state.push_cluster_status("prod", ClusterStatus::pending(ClusterPhase::ScalingUp));
        state.push_cluster_status("prod", ClusterStatus::ready());

        let poller = ReadinessPoller::new(fast_config());
        poller.await_ready(&state, "prod").await.unwrap();
        assert_eq!(state.operation_counts().status_gets, 3);
    }

    #[tokio::test]
    async fn test_ready_fails_on_other_errors() {
        let state = MockOmniState::new();
        state.push_cluster_status_error(
            "prod",
            ProviderError::Api("permission denied".to_string()),
        );

        let poller = ReadinessPoller::new(fast_config());
        let err = poller.await_ready(&state, "prod").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
        assert_eq!(state.operation_counts().status_gets, 1);
    }

    #[tokio::test]
    async fn test_max_attempts() {
        let state = MockOmniState::new();
        let poller = ReadinessPoller::new(PollConfig {
            max_attempts: Some(3),
            ..fast_config()
        });

        let err = poller.await_ready(&state, "missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { attempts: 3, .. }));
        assert_eq!(state.operation_counts().status_gets, 3);
    }

    #[tokio::test]
    async fn test_timeout() {
        let state = MockOmniState::new();
        let poller = ReadinessPoller::new(PollConfig {
            timeout: Duration::from_millis(30),
            ..fast_config()
        });

        let err = poller.await_ready(&state, "missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let state = MockOmniState::new();
        let token = CancellationToken::new();
        let poller = ReadinessPoller::new(PollConfig {
            timeout: Duration::from_secs(60),
            initial_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(10),
            ..fast_config()
        })
        .with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = poller.await_ready(&state, "missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled { .. }));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_deleted_when_destroy_status_gone() {
        let state = MockOmniState::new();
        state.push_destroy_status("prod", "DestroyingMachines");
        state.push_destroy_status("prod", "DestroyingControlPlane");

        let poller = ReadinessPoller::new(fast_config());
        poller.await_deleted(&state, "prod").await.unwrap();
        assert_eq!(state.operation_counts().destroy_status_gets, 3);
    }

    #[tokio::test]
    async fn test_deleted_fails_on_transport_error() {
        let state = MockOmniState::new();
        state.push_destroy_status_error("prod", ProviderError::Api("connection reset".to_string()));

        let poller = ReadinessPoller::new(fast_config());
        let err = poller.await_deleted(&state, "prod").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PollState::Polling { attempt: 1 }.is_terminal());
        assert!(PollState::Ready.is_terminal());
        assert!(PollState::Gone.is_terminal());
        assert!(PollState::Cancelled.is_terminal());
        assert!(PollState::TimedOut { attempts: 2 }.is_terminal());
    }
}
