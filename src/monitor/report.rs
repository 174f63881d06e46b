// Check cycle report - What one pass over the configured domains produced

use crate::certificates::CertificateVerdict;
use colored::*;
use serde::Serialize;

/// A domain whose certificate could not be read
#[derive(Debug, Clone, Serialize)]
pub struct CheckFailure {
    pub domain: String,
    pub error: String,
}

/// An alert that no channel (or not every channel) delivered
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub domain: String,
    pub error: String,
}

/// Outcome of a single check cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub verdicts: Vec<CertificateVerdict>,
    pub check_failures: Vec<CheckFailure>,
    pub alerts_sent: usize,
    pub dispatch_failures: Vec<DispatchFailure>,
}

impl CycleReport {
    /// True when every domain was read and every alert went out
    pub fn is_success(&self) -> bool {
        self.check_failures.is_empty() && self.dispatch_failures.is_empty()
    }

    pub fn alerts_required(&self) -> usize {
        self.verdicts.iter().filter(|v| v.requires_alert()).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Coloured terminal rendering, one line per domain
    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();

        for verdict in &self.verdicts {
            let status = if verdict.is_expired {
                "EXPIRED".red().bold()
            } else if verdict.is_warning {
                "WARNING".yellow().bold()
            } else {
                "OK".green().bold()
            };

            lines.push(format!(
                "{:<8} {} - {} days left (expires {}, issuer: {})",
                status,
                verdict.domain.cyan(),
                verdict.days_remaining,
                verdict.expiry_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                verdict.issuer
            ));
        }

        for failure in &self.check_failures {
            lines.push(format!(
                "{:<8} {} - {}",
                "ERROR".red().bold(),
                failure.domain.cyan(),
                failure.error
            ));
        }

        for failure in &self.dispatch_failures {
            lines.push(format!(
                "{} alert for {} not delivered: {}",
                "✗".red(),
                failure.domain,
                failure.error
            ));
        }

        lines.push(format!(
            "{} checked, {} failed, {} alerts sent",
            self.verdicts.len() + self.check_failures.len(),
            self.check_failures.len(),
            self.alerts_sent
        ));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::LeafCertificate;
    use chrono::{Duration, TimeZone, Utc};

    fn verdict(domain: &str, days: i64) -> CertificateVerdict {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let leaf = LeafCertificate {
            issuer: "CN=Test CA".to_string(),
            subject_common_name: domain.to_string(),
            not_before: now - Duration::days(90),
            not_after: now + Duration::days(days),
            serial_number: "0a".to_string(),
        };
        CertificateVerdict::new(domain, &leaf, 7, now)
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = CycleReport::default();
        assert!(report.is_success());
        assert_eq!(report.alerts_required(), 0);
    }

    #[test]
    fn test_failures_make_report_unsuccessful() {
        let mut report = CycleReport::default();
        report.check_failures.push(CheckFailure {
            domain: "broken.example.com".to_string(),
            error: "connection refused".to_string(),
        });
        assert!(!report.is_success());

        let mut report = CycleReport::default();
        report.dispatch_failures.push(DispatchFailure {
            domain: "example.com".to_string(),
            error: "DingTalk: HTTP 500".to_string(),
        });
        assert!(!report.is_success());
    }

    #[test]
    fn test_render_text() {
        colored::control::set_override(false);

        let report = CycleReport {
            verdicts: vec![verdict("ok.example.com", 60), verdict("soon.example.com", 3)],
            check_failures: vec![CheckFailure {
                domain: "down.example.com".to_string(),
                error: "timed out".to_string(),
            }],
            alerts_sent: 1,
            dispatch_failures: vec![],
        };

        let text = report.render_text();
        assert!(text.contains("OK       ok.example.com - 60 days left"));
        assert!(text.contains("WARNING  soon.example.com - 3 days left"));
        assert!(text.contains("ERROR    down.example.com - timed out"));
        assert!(text.contains("3 checked, 1 failed, 1 alerts sent"));
        assert_eq!(report.alerts_required(), 1);
    }

    #[test]
    fn test_to_json() {
        let report = CycleReport {
            verdicts: vec![verdict("soon.example.com", 3)],
            ..Default::default()
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["verdicts"][0]["domain"], "soon.example.com");
        assert_eq!(json["verdicts"][0]["days_remaining"], 3);
        assert_eq!(json["verdicts"][0]["is_warning"], true);
        assert_eq!(json["alerts_sent"], 0);
    }
}
