// Certificate Parser - Decode the leaf certificate presented by a server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use x509_parser::prelude::*;

/// Fields of a leaf certificate that the expiry check needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCertificate {
    /// Full issuer distinguished name, e.g. `C=US, O=Let's Encrypt, CN=R11`
    pub issuer: String,
    /// Subject common name, empty when the subject carries none
    pub subject_common_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub serial_number: String,
}

/// Parse a single DER-encoded certificate
pub fn parse_leaf(der_bytes: &[u8]) -> Result<LeafCertificate, String> {
    let (_, cert) = X509Certificate::from_der(der_bytes)
        .map_err(|e| format!("invalid DER certificate: {}", e))?;

    let subject_common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string();

    let validity = cert.validity();

    Ok(LeafCertificate {
        issuer: cert.issuer().to_string(),
        subject_common_name,
        not_before: asn1_to_utc(validity.not_before)?,
        not_after: asn1_to_utc(validity.not_after)?,
        serial_number: format!("{:x}", cert.serial),
    })
}

fn asn1_to_utc(time: ASN1Time) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| format!("certificate time out of range: {}", time))
}
