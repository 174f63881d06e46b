// Certificate Inspector - Read the leaf certificate a server presents and classify its expiry

use crate::certificates::parser::{LeafCertificate, parse_leaf};
use crate::certificates::verdict::CertificateVerdict;
use crate::error::{ConnectivityCause, InspectError};
use crate::utils::network::{Target, connect_target};
use chrono::Utc;
use rustls::ClientConfig;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

/// Default bound for resolve, TCP connect and TLS handshake together
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens one TLS connection per call and reports on the leaf certificate.
///
/// Chain verification is switched off: the point is to read whatever the
/// server presents, including self-signed and broken chains.
#[derive(Clone)]
pub struct CertificateInspector {
    connector: TlsConnector,
    connect_timeout: Duration,
}

impl CertificateInspector {
    /// Create new inspector with the default 10s timeout
    pub fn new() -> Result<Self, InspectError> {
        Self::with_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_timeout(connect_timeout: Duration) -> Result<Self, InspectError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let config = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| InspectError::TlsConfig(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            connect_timeout,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Inspect `target` (`host[:port]`) and classify it against `alert_threshold_days`
    pub async fn inspect(
        &self,
        target: &str,
        alert_threshold_days: u32,
    ) -> Result<CertificateVerdict, InspectError> {
        let parsed = Target::parse(target)?;
        let leaf = self.fetch_leaf(&parsed, target).await?;
        Ok(CertificateVerdict::new(
            target.trim(),
            &leaf,
            alert_threshold_days,
            Utc::now(),
        ))
    }

    /// Handshake with `target` and decode the first certificate it presents
    pub async fn fetch_leaf(
        &self,
        target: &Target,
        label: &str,
    ) -> Result<LeafCertificate, InspectError> {
        let mut tls_stream = timeout(self.connect_timeout, self.open_tls(target))
            .await
            .map_err(|_| {
                InspectError::connectivity(label, ConnectivityCause::Timeout(self.connect_timeout))
            })?
            .map_err(|cause| InspectError::connectivity(label, cause))?;

        let leaf = {
            let (_, connection) = tls_stream.get_ref();
            leaf_der(connection.peer_certificates())
        };

        // close_notify before looking at the result so every path releases the socket
        if let Err(e) = tls_stream.shutdown().await {
            tracing::debug!("TLS shutdown with {} failed: {}", label, e);
        }
        drop(tls_stream);

        let der = leaf.ok_or_else(|| InspectError::NoCertificatePresented {
            target: label.to_string(),
        })?;

        parse_leaf(&der).map_err(|details| InspectError::CertificateParse {
            target: label.to_string(),
            details,
        })
    }

    async fn open_tls(&self, target: &Target) -> Result<TlsStream<TcpStream>, ConnectivityCause> {
        let stream = connect_target(target).await?;
        let server_name = server_name_for(target)?;

        self.connector
            .connect(server_name, stream)
            .await
            .map_err(|e| ConnectivityCause::Handshake(e.to_string()))
    }
}

/// DER bytes of the first certificate in the peer chain
fn leaf_der(peer_certs: Option<&[CertificateDer<'_>]>) -> Option<Vec<u8>> {
    peer_certs
        .and_then(|certs| certs.first())
        .map(|cert| cert.as_ref().to_vec())
}

fn server_name_for(target: &Target) -> Result<ServerName<'static>, ConnectivityCause> {
    if let Some(ip) = target.ip() {
        return Ok(ServerName::IpAddress(ip.into()));
    }

    ServerName::try_from(target.hostname.clone())
        .map_err(|_| ConnectivityCause::Handshake(format!("invalid server name: {}", target.hostname)))
}

/// Certificate verifier that trusts every chain but still checks handshake signatures
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
