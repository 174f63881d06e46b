// Monitoring Daemon - Main orchestration

use crate::Result;
use crate::certificates::{CertificateInspector, CertificateVerdict};
use crate::error::{ChannelError, InspectError};
use crate::monitor::alerts::{AlertDispatcher, AlertMessage};
use crate::monitor::config::MonitorConfig;
use crate::monitor::report::{CheckFailure, CycleReport, DispatchFailure};
use anyhow::Context;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::time::{MissedTickBehavior, interval};

/// Main monitoring daemon
pub struct MonitorDaemon {
    config: MonitorConfig,
    inspector: CertificateInspector,
    dispatcher: Arc<AlertDispatcher>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    check_semaphore: Arc<Semaphore>,
}

impl MonitorDaemon {
    /// Create new monitoring daemon with channels built from the configuration
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let dispatcher = AlertDispatcher::from_config(&config)
            .context("Failed to set up notification channels")?;
        Self::with_dispatcher(config, dispatcher)
    }

    /// Create daemon with an already assembled dispatcher
    pub fn with_dispatcher(config: MonitorConfig, dispatcher: AlertDispatcher) -> Result<Self> {
        let inspector =
            CertificateInspector::with_timeout(Duration::from_secs(config.check.timeout_seconds))
                .context("Failed to set up TLS client")?;
        let max_concurrent = config.check.max_concurrent_checks.max(1);

        Ok(Self {
            config,
            inspector,
            dispatcher: Arc::new(dispatcher),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            check_semaphore: Arc::new(Semaphore::new(max_concurrent)),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start the polling loop. The first cycle runs immediately.
    pub async fn start(&self) -> Result<()> {
        tracing::info!("Starting certificate expiry monitor");

        self.running.store(true, Ordering::SeqCst);
        self.setup_signal_handlers();

        tracing::info!("Monitoring {} domains", self.config.domains.len());
        tracing::info!(
            "Alert threshold: {} days, interval: {}s",
            self.config.check.alert_threshold_days,
            self.config.check.interval_seconds
        );
        tracing::info!(
            "Alert channels: {}",
            self.config.enabled_channels().join(", ")
        );

        let period = Duration::from_secs(self.config.check.interval_seconds.max(1));
        let mut tick_interval = interval(period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let report = self.run_check_cycle().await;
                    tracing::info!(
                        "Check cycle finished: {} verdicts, {} check failures, {} alerts sent, {} undelivered",
                        report.verdicts.len(),
                        report.check_failures.len(),
                        report.alerts_sent,
                        report.dispatch_failures.len()
                    );
                }
                _ = self.shutdown.notified() => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Monitoring daemon stopped");
        Ok(())
    }

    /// Stop the daemon
    pub fn stop(&self) {
        tracing::info!("Stopping monitoring daemon...");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run a single check cycle.
    ///
    /// Inspections run concurrently up to `max_concurrent_checks`; alerts are
    /// then dispatched one message at a time in domain order.
    pub async fn run_check_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        if self.config.domains.is_empty() {
            tracing::warn!("No domains configured");
            return report;
        }

        tracing::info!("Checking {} domains", self.config.domains.len());

        let threshold = self.config.check.alert_threshold_days;
        let mut tasks = Vec::new();

        for domain in &self.config.domains {
            let domain = domain.clone();
            let inspector = self.inspector.clone();
            let semaphore = Arc::clone(&self.check_semaphore);

            let task = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok();
                let result = inspector.inspect(&domain, threshold).await;
                (domain, result)
            });

            tasks.push(task);
        }

        for joined in join_all(tasks).await {
            match joined {
                Ok((domain, result)) => Self::record_inspection(&mut report, domain, result),
                Err(e) => tracing::error!("Check task failed: {}", e),
            }
        }

        let messages: Vec<AlertMessage> = report
            .verdicts
            .iter()
            .filter(|v| v.requires_alert())
            .map(AlertMessage::from_verdict)
            .collect();

        for message in messages {
            match self.dispatcher.send(&message).await {
                Ok(()) => report.alerts_sent += 1,
                Err(e) => {
                    tracing::error!("Failed to send alert for {}: {}", message.domain, e);
                    report.dispatch_failures.push(DispatchFailure {
                        domain: message.domain,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn record_inspection(
        report: &mut CycleReport,
        domain: String,
        result: std::result::Result<CertificateVerdict, InspectError>,
    ) {
        match result {
            Ok(verdict) => {
                if verdict.is_expired {
                    tracing::warn!("Certificate for {} has expired", verdict.domain);
                } else if verdict.is_warning {
                    tracing::warn!(
                        "Certificate for {} expires in {} days",
                        verdict.domain,
                        verdict.days_remaining
                    );
                } else {
                    tracing::debug!(
                        "Certificate for {} valid for {} more days",
                        verdict.domain,
                        verdict.days_remaining
                    );
                }
                report.verdicts.push(verdict);
            }
            Err(e) => {
                tracing::error!("Failed to check {}: {}", domain, e);
                report.check_failures.push(CheckFailure {
                    domain,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Stop on Ctrl+C
    fn setup_signal_handlers(&self) {
        let running = Arc::clone(&self.running);
        let shutdown = Arc::clone(&self.shutdown);

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received Ctrl+C"),
                Err(e) => {
                    tracing::error!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
            }

            running.store(false, Ordering::SeqCst);
            shutdown.notify_one();
        });
    }

    /// Get daemon statistics
    pub fn stats(&self) -> DaemonStats {
        DaemonStats {
            total_domains: self.config.domains.len(),
            alert_channels: self.dispatcher.channel_count(),
            enabled_channels: self
                .dispatcher
                .enabled_channel_names()
                .into_iter()
                .map(String::from)
                .collect(),
            running: self.is_running(),
        }
    }

    /// Test all alert channels
    pub async fn test_alerts(&self) -> Vec<(String, std::result::Result<(), ChannelError>)> {
        self.dispatcher.test_channels().await
    }
}

/// Daemon statistics
#[derive(Debug, Clone)]
pub struct DaemonStats {
    pub total_domains: usize,
    pub alert_channels: usize,
    pub enabled_channels: Vec<String>,
    pub running: bool,
}
