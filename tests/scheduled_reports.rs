// tests/scheduled_reports.rs
mod common;

use std::sync::atomic::Ordering;

use chrono::Duration;
use common::{harness, local};
use market_pulse_bot::schedule::ReportKind;
use market_pulse_bot::TriggerMode;

#[tokio::test]
async fn every_five_minutes_for_a_day_sends_each_report_once() {
    let h = harness();
    h.stocks.set("AAPL", 214.0, 0.3);

    let start = local(0, 0);
    let mut sent = Vec::new();
    for step in 0..(24 * 12) {
        let now = start + Duration::minutes(5 * step);
        let s = h.orch.run(TriggerMode::Scheduled, now).await.unwrap();
        sent.extend(s.reports_sent);
        // a double-fire in the same slot must be a no-op
        let again = h.orch.run(TriggerMode::Scheduled, now).await.unwrap();
        assert!(again.reports_sent.is_empty(), "double fire at step {step}");
    }
    assert_eq!(
        sent,
        vec![ReportKind::Midday, ReportKind::Partner, ReportKind::Close]
    );
    let texts = h.notifier.messages();
    assert!(texts[0].starts_with("🕛 Markt-Mittagsupdate"));
    assert!(texts[0].contains("AAPL: 214.00 USD (+0.30%)"));
    assert!(texts[2].starts_with("🕕 Tagesabschluss"));
}

#[tokio::test]
async fn failed_report_is_retried_later_in_the_window() {
    let h = harness();
    h.notifier.fail.store(true, Ordering::SeqCst);
    let s = h.orch.run(TriggerMode::Scheduled, local(12, 0)).await.unwrap();
    assert!(s.reports_sent.is_empty());
    assert_eq!(s.send_failures, 1);

    h.notifier.fail.store(false, Ordering::SeqCst);
    let s = h.orch.run(TriggerMode::Scheduled, local(12, 5)).await.unwrap();
    assert_eq!(s.reports_sent, vec![ReportKind::Midday]);

    // Window closed, marker set: nothing more today.
    let s = h.orch.run(TriggerMode::Scheduled, local(12, 9)).await.unwrap();
    assert!(s.reports_sent.is_empty());
}

#[tokio::test]
async fn skipped_window_means_no_report_that_day() {
    let h = harness();
    let s = h.orch.run(TriggerMode::Scheduled, local(12, 10)).await.unwrap();
    assert!(s.reports_sent.is_empty());
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn manual_run_sends_everything_without_consuming_markers() {
    let h = harness();

    // Manual run right inside the midday window.
    let s = h.orch.run(TriggerMode::Manual, local(12, 1)).await.unwrap();
    assert_eq!(
        s.reports_sent,
        vec![ReportKind::Midday, ReportKind::Partner, ReportKind::Close]
    );
    let texts = h.notifier.messages();
    assert!(texts.last().unwrap().starts_with("🤖 Bot-Heartbeat"));
    assert!(h.orch.store().load().await.last_run_marker.is_empty());

    // The scheduled trigger a few minutes later still fires midday.
    let s = h.orch.run(TriggerMode::Scheduled, local(12, 5)).await.unwrap();
    assert_eq!(s.reports_sent, vec![ReportKind::Midday]);

    // And a manual run afterwards is not blocked by the marker.
    let s = h.orch.run(TriggerMode::Manual, local(12, 6)).await.unwrap();
    assert_eq!(s.reports_sent.len(), 3);
}

#[tokio::test]
async fn quote_outage_aborts_reports_and_keeps_marker_unset() {
    let h = harness();
    h.stocks.fail.store(true, Ordering::SeqCst);
    assert!(h.orch.run(TriggerMode::Scheduled, local(12, 0)).await.is_err());
    assert!(h.notifier.messages().is_empty());

    h.stocks.fail.store(false, Ordering::SeqCst);
    let s = h.orch.run(TriggerMode::Scheduled, local(12, 5)).await.unwrap();
    assert_eq!(s.reports_sent, vec![ReportKind::Midday]);
}
