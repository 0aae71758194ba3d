//! The Supervisor runs a full scan on a fixed schedule until it is asked to
//! shut down.
//!
//! Scans never overlap: the next tick is only awaited once the current scan
//! has finished or hit its timeout. Ticks missed while a scan was running are
//! delayed rather than bunched together.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{signal, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{engine::Scanner, providers::ChainSource};

/// SupervisorError represents errors that can occur within the Supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No scanner was provided to the `SupervisorBuilder`.
    #[error("Missing scanner for Supervisor")]
    MissingScanner,

    /// A scheduling setting is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Drives scheduled scans.
pub struct Supervisor<C: ?Sized> {
    scanner: Arc<Scanner<C>>,
    polling_interval: Duration,
    scan_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl<C: ChainSource + ?Sized + 'static> Supervisor<C> {
    /// Returns a builder for the supervisor.
    pub fn builder() -> SupervisorBuilder<C> {
        SupervisorBuilder::default()
    }

    /// The token that stops the supervisor when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Installs SIGINT/SIGTERM handlers and runs the schedule until one of
    /// them fires.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();
        tokio::spawn(async move {
            let ctrl_c = signal::ctrl_c();

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to register SIGTERM handler.");
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => {},
            }
            cancellation_token.cancel();
        });

        self.run_until_cancelled().await;
        Ok(())
    }

    /// Runs the schedule until the cancellation token fires.
    pub async fn run_until_cancelled(&self) {
        let mut interval = tokio::time::interval(self.polling_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        tracing::info!(
            polling_interval = ?self.polling_interval,
            scan_timeout = ?self.scan_timeout,
            "Supervisor started."
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let healthy = tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Shutdown requested during scan.");
                    break;
                }
                outcome = tokio::time::timeout(self.scan_timeout, self.scanner.run_scan()) => {
                    match outcome {
                        Ok(report) => report.success,
                        Err(_) => {
                            tracing::error!(timeout = ?self.scan_timeout, "Scan timed out.");
                            false
                        }
                    }
                }
            };

            if healthy {
                consecutive_failures = 0;
            } else {
                consecutive_failures += 1;
                tracing::warn!(consecutive_failures, "Scheduled scan failed.");
            }
        }

        tracing::info!("Supervisor stopped.");
    }
}

/// A builder for creating a `Supervisor` instance.
pub struct SupervisorBuilder<C: ?Sized> {
    scanner: Option<Arc<Scanner<C>>>,
    polling_interval: Duration,
    scan_timeout: Duration,
    cancellation_token: Option<CancellationToken>,
}

impl<C: ?Sized> Default for SupervisorBuilder<C> {
    fn default() -> Self {
        Self {
            scanner: None,
            polling_interval: Duration::from_secs(300),
            scan_timeout: Duration::from_secs(240),
            cancellation_token: None,
        }
    }
}

impl<C: ChainSource + ?Sized + 'static> SupervisorBuilder<C> {
    /// Sets the scanner invoked on every tick.
    pub fn scanner(mut self, scanner: Arc<Scanner<C>>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Sets the time between scan starts.
    pub fn polling_interval(mut self, polling_interval: Duration) -> Self {
        self.polling_interval = polling_interval;
        self
    }

    /// Sets the upper bound on one scan.
    pub fn scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    /// Shares a cancellation token, typically the one the scanner's
    /// analyzer watches.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Validates the settings and builds the `Supervisor`.
    pub fn build(self) -> Result<Supervisor<C>, SupervisorError> {
        let scanner = self.scanner.ok_or(SupervisorError::MissingScanner)?;
        if self.polling_interval.is_zero() {
            return Err(SupervisorError::InvalidConfiguration(
                "polling interval must be positive".into(),
            ));
        }
        if self.scan_timeout.is_zero() {
            return Err(SupervisorError::InvalidConfiguration(
                "scan timeout must be positive".into(),
            ));
        }
        Ok(Supervisor {
            scanner,
            polling_interval: self.polling_interval,
            scan_timeout: self.scan_timeout,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy::{
        primitives::{Bytes, U256},
        sol_types::SolValue,
    };

    use super::*;
    use crate::{
        config::AlertPolicyKind,
        metrics::MockMetricsSink,
        notification::MockNotifier,
        providers::{RpcStats, traits::MockChainSource},
        test_helpers::test_scan_settings,
    };

    fn empty_sequencer_scanner(scans: Arc<AtomicUsize>) -> Arc<Scanner<MockChainSource>> {
        let mut chain = MockChainSource::new();
        chain.expect_stats().returning(RpcStats::default);
        chain.expect_eth_call().returning(move |_, _| {
            scans.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(U256::ZERO.abi_encode()))
        });
        chain.expect_get_latest_block_number().returning(|| Ok(100));

        let mut metrics = MockMetricsSink::new();
        metrics.expect_publish().returning(|_| Ok(()));

        Arc::new(Scanner::new(
            Arc::new(chain),
            Arc::new(MockNotifier::new()),
            Arc::new(metrics),
            test_scan_settings(AlertPolicyKind::Activity),
            CancellationToken::new(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_on_every_tick_until_cancelled() {
        let scans = Arc::new(AtomicUsize::new(0));
        let supervisor = Supervisor::builder()
            .scanner(empty_sequencer_scanner(scans.clone()))
            .polling_interval(Duration::from_secs(300))
            .scan_timeout(Duration::from_secs(60))
            .build()
            .unwrap();
        let token = supervisor.cancellation_token();

        let handle = tokio::spawn(async move { supervisor.run_until_cancelled().await });
        tokio::time::sleep(Duration::from_secs(650)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(scans.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_runs_no_scan() {
        let scans = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        token.cancel();
        let supervisor = Supervisor::builder()
            .scanner(empty_sequencer_scanner(scans.clone()))
            .cancellation_token(token)
            .build()
            .unwrap();

        supervisor.run_until_cancelled().await;
        assert_eq!(scans.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(
            Supervisor::<MockChainSource>::builder().build(),
            Err(SupervisorError::MissingScanner)
        ));

        let scanner = empty_sequencer_scanner(Arc::new(AtomicUsize::new(0)));
        let result =
            Supervisor::builder().scanner(scanner).polling_interval(Duration::ZERO).build();
        assert!(matches!(result, Err(SupervisorError::InvalidConfiguration(_))));
    }
}
