// CLI module - Command line interface and argument parsing
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use crate::monitor::MonitorConfig;
use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::Path;
use tracing::Level;

// Sub-modules for organized CLI arguments
mod monitoring_args;
mod output_args;

// Re-export sub-structs
pub use monitoring_args::MonitoringArgs;
pub use output_args::OutputArgs;

/// CertAlert - TLS certificate expiry monitor
///
/// Checks the certificate each configured domain presents and notifies
/// DingTalk and email recipients when one is expired or about to expire.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(name = "certalert")]
#[command(about = "TLS certificate expiry monitor with DingTalk and email alerts", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub monitoring: MonitoringArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl Args {
    /// Validate CLI arguments for mutual exclusivity and logical consistency
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.monitoring.once && self.monitoring.test_alert {
            anyhow::bail!("Cannot use --once and --test-alert together. Choose one mode.");
        }

        if self.monitoring.interval == Some(0) {
            anyhow::bail!("--interval must be at least 1 second");
        }

        Ok(())
    }

    /// Log level from -v, falling back to RUST_LOG and then INFO
    pub fn log_level(&self) -> Level {
        match self.output.verbose {
            0 => std::env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse::<Level>().ok())
                .unwrap_or(Level::INFO),
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Load the configuration file (or defaults) and apply command line overrides
    pub fn load_config(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = match &self.monitoring.config {
            Some(path) => MonitorConfig::from_file(path)?,
            None => MonitorConfig::default(),
        };

        self.apply_overrides(&mut config)?;
        Ok(config)
    }

    /// Apply --domain, --domains-file, --threshold and --interval
    pub fn apply_overrides(&self, config: &mut MonitorConfig) -> anyhow::Result<()> {
        if let Some(path) = &self.monitoring.domains_file {
            config.domains.extend(read_domains_file(path)?);
        }

        config
            .domains
            .extend(self.monitoring.domains.iter().map(|d| d.trim().to_string()));

        if let Some(threshold) = self.monitoring.threshold {
            config.check.alert_threshold_days = threshold;
        }

        if let Some(interval) = self.monitoring.interval {
            config.check.interval_seconds = interval;
        }

        Ok(())
    }
}

/// Domains file: one `host[:port]` per line, blank lines and `#` comments ignored
fn read_domains_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read domains file {:?}", path))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
