// Error types for certalert
//
// Structured error types for the certificate inspector and the alert channels.
// The outer layers (config loading, daemon, CLI) wrap these in anyhow.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while inspecting a remote certificate
#[derive(Debug, Error)]
pub enum InspectError {
    /// Target string could not be parsed into host and port
    #[error("Invalid target {input}: {reason}")]
    InvalidTarget { input: String, reason: String },

    /// Target could not be reached or the TLS handshake failed
    #[error("Failed to connect to {target}: {cause}")]
    Connectivity {
        target: String,
        cause: ConnectivityCause,
    },

    /// Handshake completed but the peer presented no certificate
    #[error("No certificate presented by {target}")]
    NoCertificatePresented { target: String },

    /// Leaf certificate could not be decoded
    #[error("Failed to parse certificate from {target}: {details}")]
    CertificateParse { target: String, details: String },

    /// TLS client could not be configured
    #[error("TLS client configuration failed: {0}")]
    TlsConfig(String),
}

impl InspectError {
    /// Convenience constructor for connectivity failures
    pub fn connectivity(target: impl Into<String>, cause: ConnectivityCause) -> Self {
        InspectError::Connectivity {
            target: target.into(),
            cause,
        }
    }

    /// True when the failure happened before a certificate could be read
    pub fn is_connectivity(&self) -> bool {
        matches!(self, InspectError::Connectivity { .. })
    }
}

/// Why a connection to the inspected target failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityCause {
    Dns(String),
    Connect(String),
    Handshake(String),
    Timeout(Duration),
}

impl fmt::Display for ConnectivityCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityCause::Dns(msg) => write!(f, "DNS resolution failed: {}", msg),
            ConnectivityCause::Connect(msg) => write!(f, "TCP connect failed: {}", msg),
            ConnectivityCause::Handshake(msg) => write!(f, "TLS handshake failed: {}", msg),
            ConnectivityCause::Timeout(d) => write!(f, "timed out after {:?}", d),
        }
    }
}

/// SMTP transaction stage at which an email delivery failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpStage {
    Connect,
    Authenticate,
    MailFrom,
    RcptTo(String),
    DataOpen,
    DataWrite,
    Quit,
}

impl fmt::Display for SmtpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtpStage::Connect => write!(f, "connect"),
            SmtpStage::Authenticate => write!(f, "authenticate"),
            SmtpStage::MailFrom => write!(f, "MAIL FROM"),
            SmtpStage::RcptTo(rcpt) => write!(f, "RCPT TO <{}>", rcpt),
            SmtpStage::DataOpen => write!(f, "DATA"),
            SmtpStage::DataWrite => write!(f, "message body"),
            SmtpStage::Quit => write!(f, "QUIT"),
        }
    }
}

/// Stage tag carried by transport errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStage {
    Http,
    Smtp(SmtpStage),
}

impl fmt::Display for TransportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStage::Http => write!(f, "HTTP request"),
            TransportStage::Smtp(stage) => write!(f, "SMTP {}", stage),
        }
    }
}

/// Errors raised by a single alert channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The underlying send could not be established or completed
    #[error("{stage} failed: {details}")]
    Transport {
        stage: TransportStage,
        details: String,
    },

    /// The remote endpoint answered with a non-success status
    #[error("Remote returned status {status}: {body}")]
    Protocol { status: u16, body: String },

    /// The message could not be rendered or encoded for this channel
    #[error("Failed to build payload: {details}")]
    Payload { details: String },

    /// The background task running a blocking send panicked or was cancelled
    #[error("Delivery task failed: {details}")]
    Task { details: String },
}

impl ChannelError {
    pub fn http(details: impl Into<String>) -> Self {
        ChannelError::Transport {
            stage: TransportStage::Http,
            details: details.into(),
        }
    }

    pub fn smtp(stage: SmtpStage, details: impl Into<String>) -> Self {
        ChannelError::Transport {
            stage: TransportStage::Smtp(stage),
            details: details.into(),
        }
    }

    pub fn payload(details: impl Into<String>) -> Self {
        ChannelError::Payload {
            details: details.into(),
        }
    }

    /// SMTP stage of a transport failure, if any
    pub fn smtp_stage(&self) -> Option<&SmtpStage> {
        match self {
            ChannelError::Transport {
                stage: TransportStage::Smtp(stage),
                ..
            } => Some(stage),
            _ => None,
        }
    }
}

/// A channel failure tagged with the channel that produced it
#[derive(Debug, Error)]
#[error("Alert channel {channel} failed: {source}")]
pub struct ChannelSendError {
    pub channel: String,
    #[source]
    pub source: ChannelError,
}

/// Outcome of a failed dispatch
#[derive(Debug, Error)]
pub enum DispatchError {
    /// First failing channel; the remaining channels were not attempted
    #[error(transparent)]
    Channel(ChannelSendError),

    /// Every failing channel, collected when all channels were attempted
    #[error("{} alert channel(s) failed: {}", .0.len(), join_failures(.0))]
    Channels(Vec<ChannelSendError>),
}

impl DispatchError {
    /// All channel failures carried by this error
    pub fn failures(&self) -> Vec<&ChannelSendError> {
        match self {
            DispatchError::Channel(err) => vec![err],
            DispatchError::Channels(errs) => errs.iter().collect(),
        }
    }
}

fn join_failures(failures: &[ChannelSendError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
