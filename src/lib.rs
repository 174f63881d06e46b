// CertAlert - TLS certificate expiry monitor
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

//! CertAlert reads the leaf certificate a TLS server presents, classifies it
//! as valid, close to expiry or expired, and sends alerts through DingTalk
//! robot webhooks and SMTP email.

pub mod certificates;
pub mod cli;
pub mod error;
pub mod monitor;
pub mod utils;

// Re-export commonly used types
pub use crate::certificates::{CertificateInspector, CertificateVerdict};
pub use crate::cli::Args;
pub use crate::monitor::{AlertDispatcher, AlertMessage, MonitorConfig, MonitorDaemon};

/// Result type for CertAlert operations
pub type Result<T> = anyhow::Result<T>;

/// Error type for CertAlert operations
pub use anyhow::Error;
