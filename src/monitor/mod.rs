// Certificate Monitoring
//
// Periodically reads the certificate each configured domain presents and
// notifies the configured channels when one is expired or close to expiry.

pub mod alerts;
pub mod config;
pub mod daemon;
pub mod report;

// Re-export commonly used types
pub use alerts::{AlertChannel, AlertDispatcher, AlertMessage, DispatchMode};
pub use config::MonitorConfig;
pub use daemon::MonitorDaemon;
pub use report::CycleReport;
