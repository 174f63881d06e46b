// Certificate expiry verdict

use crate::certificates::parser::LeafCertificate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

/// Expiry classification of a certificate at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateVerdict {
    pub domain: String,
    pub days_remaining: i64,
    pub expiry_timestamp: DateTime<Utc>,
    pub issuer: String,
    pub subject_common_name: String,
    pub is_expired: bool,
    pub is_warning: bool,
}

impl CertificateVerdict {
    /// Build a verdict for `leaf` as seen at `now`
    pub fn new(
        domain: impl Into<String>,
        leaf: &LeafCertificate,
        alert_threshold_days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let days_remaining = days_remaining(leaf.not_after, now);
        let (is_expired, is_warning) = classify(days_remaining, alert_threshold_days);

        Self {
            domain: domain.into(),
            days_remaining,
            expiry_timestamp: leaf.not_after,
            issuer: leaf.issuer.clone(),
            subject_common_name: leaf.subject_common_name.clone(),
            is_expired,
            is_warning,
        }
    }

    /// Whether the verdict crosses into alert territory
    pub fn requires_alert(&self) -> bool {
        self.is_expired || self.is_warning
    }
}

/// Whole days between `now` and `not_after`, rounded down.
///
/// A sub-day remainder never counts as a day: 23h59m left is 0, and a
/// certificate that expired one second ago is already at -1.
pub fn days_remaining(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    not_after
        .signed_duration_since(now)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

/// `(is_expired, is_warning)` for a day count and threshold
pub fn classify(days_remaining: i64, alert_threshold_days: u32) -> (bool, bool) {
    let is_expired = days_remaining < 0;
    let is_warning = !is_expired && days_remaining <= i64::from(alert_threshold_days);
    (is_expired, is_warning)
}
