// Certificate inspector against a local TLS server with generated certificates

mod common;

use certalert::certificates::CertificateInspector;
use certalert::error::{ConnectivityCause, InspectError};
use common::{expiring_in, spawn_tls_server};
use std::time::Duration;

#[tokio::test]
async fn test_certificate_expiring_soon_is_warning() {
    let addr = spawn_tls_server(expiring_in(3, 1)).await;
    let target = format!("127.0.0.1:{}", addr.port());

    let inspector = CertificateInspector::new().unwrap();
    let verdict = inspector.inspect(&target, 7).await.unwrap();

    assert_eq!(verdict.domain, target);
    assert_eq!(verdict.days_remaining, 3);
    assert!(verdict.is_warning);
    assert!(!verdict.is_expired);
    assert!(verdict.requires_alert());
    assert_eq!(verdict.subject_common_name, "localhost");
    assert!(verdict.issuer.contains("localhost"));
}

#[tokio::test]
async fn test_expired_certificate_is_still_read() {
    let addr = spawn_tls_server(expiring_in(-2, 0)).await;
    let target = format!("127.0.0.1:{}", addr.port());

    let inspector = CertificateInspector::new().unwrap();
    let verdict = inspector.inspect(&target, 30).await.unwrap();

    assert!(verdict.is_expired);
    assert!(!verdict.is_warning);
    assert!((-3..=-2).contains(&verdict.days_remaining));
}

#[tokio::test]
async fn test_healthy_certificate_needs_no_alert() {
    let addr = spawn_tls_server(expiring_in(90, 1)).await;
    let target = format!("127.0.0.1:{}", addr.port());

    let inspector = CertificateInspector::new().unwrap();
    let verdict = inspector.inspect(&target, 30).await.unwrap();

    assert_eq!(verdict.days_remaining, 90);
    assert!(!verdict.is_warning);
    assert!(!verdict.is_expired);
    assert!(!verdict.requires_alert());
}

#[tokio::test]
async fn test_zero_threshold_only_warns_on_last_day() {
    let addr = spawn_tls_server(expiring_in(3, 1)).await;
    let target = format!("127.0.0.1:{}", addr.port());

    let inspector = CertificateInspector::new().unwrap();
    let verdict = inspector.inspect(&target, 0).await.unwrap();

    assert!(!verdict.is_warning);

    let addr = spawn_tls_server(expiring_in(0, 5)).await;
    let verdict = inspector
        .inspect(&format!("127.0.0.1:{}", addr.port()), 0)
        .await
        .unwrap();
    assert_eq!(verdict.days_remaining, 0);
    assert!(verdict.is_warning);
}

#[tokio::test]
async fn test_silent_server_times_out() {
    // Accepts TCP but never speaks TLS
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let bound = Duration::from_millis(500);
    let inspector = CertificateInspector::with_timeout(bound).unwrap();
    let started = std::time::Instant::now();
    let err = inspector
        .inspect(&format!("127.0.0.1:{}", port), 30)
        .await
        .unwrap_err();

    // Connect and handshake share one budget
    assert!(started.elapsed() < bound * 2);

    assert!(matches!(
        err,
        InspectError::Connectivity {
            cause: ConnectivityCause::Timeout(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_concurrent_inspections_share_inspector() {
    let soon = spawn_tls_server(expiring_in(5, 1)).await;
    let later = spawn_tls_server(expiring_in(40, 1)).await;

    let inspector = CertificateInspector::new().unwrap();
    let soon_target = format!("127.0.0.1:{}", soon.port());
    let later_target = format!("127.0.0.1:{}", later.port());
    let (a, b) = tokio::join!(
        inspector.inspect(&soon_target, 30),
        inspector.inspect(&later_target, 30),
    );

    assert_eq!(a.unwrap().days_remaining, 5);
    assert_eq!(b.unwrap().days_remaining, 40);
}
