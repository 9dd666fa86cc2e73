use std::collections::BTreeSet;
use std::time::Duration;

use portsweep::config::ScanConfig;
use portsweep::probe::probe;
use portsweep::report::ScanReport;
use portsweep::scanner::{scan, scan_with_observer};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Listener that greets each client with `greeting` and keeps the socket open briefly.
async fn greeting_listener(greeting: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = sock.write_all(greeting).await;
                tokio::time::sleep(Duration::from_millis(200)).await;
            });
        }
    });
    port
}

/// A loopback port that had a listener a moment ago and now refuses connections.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn port_spec(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn without_timing(report: &ScanReport) -> Vec<(String, u16, bool, Option<String>)> {
    report
        .outcomes
        .iter()
        .map(|o| (o.host.clone(), o.port, o.open, o.banner.clone()))
        .collect()
}

#[tokio::test]
async fn closed_port_reports_closed_within_timeout() {
    let port = closed_port().await;
    let out = probe("127.0.0.1", port, Duration::from_millis(300), 128).await;
    assert!(!out.open);
    assert_eq!(out.banner, None);
    assert!(out.duration_ms < 2_000, "took {} ms", out.duration_ms);
}

#[tokio::test]
async fn silent_listener_is_open_without_banner() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _keep = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });

    let out = probe("127.0.0.1", port, Duration::from_secs(1), 64).await;
    assert!(out.open);
    assert_eq!(out.banner, None);
    // The read waits out its deadline.
    assert!(out.duration_ms >= 400, "took {} ms", out.duration_ms);
}

#[tokio::test]
async fn unresolvable_host_is_closed() {
    let out = probe("no-such-host.invalid", 80, Duration::from_millis(500), 0).await;
    assert!(!out.open);
    assert_eq!(out.host, "no-such-host.invalid");
}

#[tokio::test]
async fn every_port_yields_exactly_one_sorted_outcome() {
    let open_a = greeting_listener(b"SSH-2.0-test\r\n").await;
    let open_b = greeting_listener(b"").await;
    let closed = closed_port().await;
    let spec = format!("{},{},{},{}", open_b, closed, open_a, open_b);

    let cfg = ScanConfig::new("127.0.0.1", spec).with_dial_timeout_ms(500);
    let mut live = Vec::new();
    let report = scan_with_observer(&cfg, CancellationToken::new(), |o| live.push(o.port))
        .await
        .unwrap();

    let mut expected: Vec<u16> = vec![open_a, open_b, closed];
    expected.sort_unstable();
    let ports: Vec<u16> = report.outcomes.iter().map(|o| o.port).collect();
    assert_eq!(ports, expected);
    assert_eq!(report.scanned_total, 3);
    assert!(!report.cancelled);

    for o in &report.outcomes {
        assert_eq!(o.open, o.port != closed, "port {}", o.port);
    }
    let a = report.outcomes.iter().find(|o| o.port == open_a).unwrap();
    assert_eq!(a.banner.as_deref(), Some("SSH-2.0-test"));

    live.sort_unstable();
    let mut open_expected = vec![open_a, open_b];
    open_expected.sort_unstable();
    assert_eq!(live, open_expected);
}

#[tokio::test]
async fn concurrency_does_not_change_the_report() {
    let mut ports = Vec::new();
    for _ in 0..3 {
        ports.push(greeting_listener(b"220 ready\n").await);
    }
    for _ in 0..5 {
        ports.push(closed_port().await);
    }
    let spec = port_spec(&ports);

    let serial = ScanConfig::new("127.0.0.1", spec.clone())
        .with_concurrency(1)
        .with_dial_timeout_ms(500);
    let wide = serial.clone().with_concurrency(200);

    let a = scan(&serial).await.unwrap();
    let b = scan(&wide).await.unwrap();

    assert_eq!(without_timing(&a), without_timing(&b));
    let unique: BTreeSet<u16> = a.outcomes.iter().map(|o| o.port).collect();
    assert_eq!(unique.len(), ports.iter().collect::<BTreeSet<_>>().len());
    assert_eq!(a.open_count(), 3);
}

#[tokio::test]
async fn zero_banner_bytes_never_reports_banner() {
    let port = greeting_listener(b"HTTP/1.0 200 OK\r\n").await;
    let cfg = ScanConfig::new("127.0.0.1", port.to_string()).with_banner_read_bytes(0);
    let report = scan(&cfg).await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].open);
    assert_eq!(report.outcomes[0].banner, None);
}

#[tokio::test]
async fn cancelling_mid_scan_keeps_finished_work_only() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let first = listener.local_addr().unwrap().port();
    let last = first.saturating_add(50);

    let cancel = CancellationToken::new();
    let hook_cancel = cancel.clone();
    let cfg = ScanConfig::new("127.0.0.1", format!("{first}-{last}"))
        .with_concurrency(1)
        .with_banner_read_bytes(0);
    let report = scan_with_observer(&cfg, cancel, |_| hook_cancel.cancel())
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.scanned_total, u64::from(last - first) + 1);
    let done = report.outcomes.len() as u64;
    assert!(done > 0 && done < report.scanned_total, "{done} of {}", report.scanned_total);
    assert!(report
        .outcomes
        .windows(2)
        .all(|w| (w[0].port, &w[0].host) < (w[1].port, &w[1].host)));
    let head = report.outcomes.iter().find(|o| o.port == first).unwrap();
    assert!(head.open);
    drop(listener);
}
