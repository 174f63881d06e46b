// Certificate monitoring configuration arguments
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Args;
use std::path::PathBuf;

/// Certificate expiry monitoring options
///
/// Values given here override the corresponding fields of the
/// configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct MonitoringArgs {
    /// Configuration file (YAML, or TOML with a .toml extension)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Domain to check (host[:port]), may be repeated
    #[arg(short = 'd', long = "domain", value_name = "HOST:PORT")]
    pub domains: Vec<String>,

    /// File with domains to check (one per line, # starts a comment)
    #[arg(long = "domains-file", value_name = "FILE")]
    pub domains_file: Option<PathBuf>,

    /// Alert when this many days or fewer remain
    #[arg(short = 't', long = "threshold", value_name = "DAYS")]
    pub threshold: Option<u32>,

    /// Seconds between check cycles
    #[arg(short = 'i', long = "interval", value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Run a single check cycle and exit
    #[arg(long = "once")]
    pub once: bool,

    /// Test alert channels (send test alert to all configured channels)
    #[arg(long = "test-alert")]
    pub test_alert: bool,

    /// Write an example configuration file and exit
    #[arg(long = "config-example", value_name = "FILE")]
    pub config_example: Option<PathBuf>,
}
