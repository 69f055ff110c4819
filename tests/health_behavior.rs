//! Behavior-driven tests for source health tracking
//!
//! These tests verify HOW fetch outcomes drive the health state machine and
//! how transitions reach subscribers.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gridtick_core::health::NOTIFICATION_CAPACITY;
use gridtick_core::{
    EnergySource, FetchErrorKind, FetchRequest, HealthMonitor, HealthRecord, HealthStatus,
    Outcome, Provenance,
};
use support::{eia_value, orchestrator, ScriptedHttpClient, Step};

#[tokio::test]
async fn when_source_fails_three_batches_in_a_row_it_is_down_and_recovers_on_success() {
    // Given: Coal rejects three requests, then succeeds
    let http = ScriptedHttpClient::new();
    http.script(
        "COL",
        [
            Step::status(401),
            Step::status(401),
            Step::status(401),
            Step::ok(eia_value("COL", 250.0)),
        ],
    );
    let orchestrator = orchestrator(&http);
    let request = FetchRequest::new([EnergySource::Coal]).expect("non-empty");

    // When: Coal is fetched three times
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let result = orchestrator.fetch(&request).await.expect("registered");
        statuses.push(result.health);
    }

    // Then: Degraded after the first two failures, Down exactly at the third
    assert_eq!(
        statuses,
        vec![HealthStatus::Degraded, HealthStatus::Degraded, HealthStatus::Down]
    );
    let record = orchestrator.health().status_of(EnergySource::Coal);
    assert_eq!(record.consecutive_failures, 3);
    assert_eq!(record.last_error, Some(FetchErrorKind::Auth));

    // When: The next fetch succeeds
    let result = orchestrator.fetch(&request).await.expect("registered");

    // Then: Coal is immediately Healthy again
    assert_eq!(result.health, HealthStatus::Healthy);
    let record = orchestrator.health().status_of(EnergySource::Coal);
    assert_eq!(record.status, HealthStatus::Healthy);
    assert_eq!(record.consecutive_failures, 0);
    assert!(record.last_success_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn when_fetch_is_served_from_cache_health_is_not_touched() {
    // Given: Wind succeeded once and is in the cache
    let http = ScriptedHttpClient::new();
    http.script("WND", [Step::ok(eia_value("WND", 5.0))]);
    let orchestrator = orchestrator(&http);
    let request = FetchRequest::new([EnergySource::Wind]).expect("non-empty");
    orchestrator.fetch(&request).await.expect("registered");
    let after_live = orchestrator.health().status_of(EnergySource::Wind);

    // When: Wind is fetched again within its TTL
    tokio::time::advance(Duration::from_secs(10)).await;
    let result = orchestrator.fetch(&request).await.expect("registered");

    // Then: The record is unchanged; no new success was recorded
    assert_eq!(
        result.readings[0].reading().map(|reading| reading.provenance()),
        Some(Provenance::Cached)
    );
    assert_eq!(orchestrator.health().status_of(EnergySource::Wind), after_live);
}

#[tokio::test]
async fn when_health_changes_subscribers_receive_each_transition_in_order() {
    // Given: A subscriber collecting every notification
    let http = ScriptedHttpClient::new();
    http.script("NG", [Step::status(403), Step::status(403), Step::status(403)]);
    let orchestrator = orchestrator(&http);
    let seen = Arc::new(Mutex::new(Vec::<HealthRecord>::new()));
    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = orchestrator.subscribe_health({
        let seen = Arc::clone(&seen);
        move |record| {
            seen.lock().expect("seen lock is not poisoned").push(record);
            let _ = done_tx.send(());
        }
    });

    // When: Natural gas fails three times
    let request = FetchRequest::new([EnergySource::NaturalGas]).expect("non-empty");
    for _ in 0..3 {
        orchestrator.fetch(&request).await.expect("registered");
    }

    // Then: Only the two transitions were published (Degraded, then Down)
    for _ in 0..2 {
        done_rx.recv().await.expect("notification delivered");
    }
    let statuses = seen
        .lock()
        .expect("seen lock is not poisoned")
        .iter()
        .map(|record| record.status)
        .collect::<Vec<_>>();
    assert_eq!(statuses, vec![HealthStatus::Degraded, HealthStatus::Down]);
    handle.abort();
}

#[tokio::test]
async fn when_subscriber_never_reads_recording_outcomes_does_not_block() {
    // Given: A raw subscriber that is never drained
    let monitor = HealthMonitor::default();
    let mut stalled = monitor.watch();

    // When: Far more transitions than the notification buffer holds are recorded
    for _ in 0..100 {
        monitor.record_outcome(EnergySource::Solar, Outcome::Failure(FetchErrorKind::Network));
        monitor.record_outcome(EnergySource::Solar, Outcome::Success);
    }

    // Then: Recording completed and the stalled subscriber only lost the oldest events
    assert_eq!(monitor.status_of(EnergySource::Solar).status, HealthStatus::Healthy);
    assert!(matches!(
        stalled.recv().await,
        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) if skipped == 200 - NOTIFICATION_CAPACITY as u64
    ));
    let next = stalled.recv().await.expect("newest events retained");
    assert_eq!(next.source, EnergySource::Solar);
}
