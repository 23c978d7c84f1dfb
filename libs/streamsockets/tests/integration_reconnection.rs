//! Integration tests for reconnection policies and the reconnect budget

mod common;

use common::{eventually, wait_for_state, CountingHandler, MockTransport, Outcome, TypeRouter};
use std::time::Duration;
use streamsockets::{
    CappedExponential, ClientEvent, ConnectionHealth, ConnectionManager, ConnectionStatus, FixedDelay,
    FixedEscalation, ReconnectPolicy,
};

fn build(transport: &MockTransport, policy: impl ReconnectPolicy + 'static, max_attempts: u32) -> ConnectionManager {
    ConnectionManager::builder()
        .name("test")
        .url("ws://feed.test/api/v1/ws/sessions?token=t")
        .router(TypeRouter, |routing| {
            routing.handler("sessions_update".to_string(), CountingHandler::default())
        })
        .transport(transport.clone())
        .reconnect_policy(policy)
        .max_attempts(max_attempts)
        .build()
        .unwrap()
}

fn drain(manager: &ConnectionManager) -> Vec<ClientEvent> {
    std::iter::from_fn(|| manager.try_recv_event()).collect()
}

#[test]
fn test_fixed_escalation_schedule() {
    verbose_println!("Testing fixed escalation schedule...");

    let policy = FixedEscalation;
    let delays: Vec<u128> = (0..6).map(|n| policy.delay(n).as_millis()).collect();
    verbose_println!("  Delays: {:?}", delays);

    assert_eq!(delays, vec![30_000, 15_000, 15_000, 60_000, 60_000, 60_000]);
    assert_eq!(policy.delay(u32::MAX), Duration::from_secs(60));
}

#[test]
fn test_capped_exponential_sequence() {
    verbose_println!("Testing capped exponential sequence...");

    let policy = CappedExponential::with_base(Duration::from_millis(3000));

    assert_eq!(policy.delay(0), Duration::from_millis(3000));
    assert_eq!(policy.delay(1), Duration::from_millis(4500));
    assert_eq!(policy.delay(2), Duration::from_millis(6750));
    assert_eq!(policy.delay(3), Duration::from_millis(10125));
    assert_eq!(policy.delay(4), Duration::from_millis(15187));

    for n in 0..40 {
        let expected = (3000.0 * 1.5f64.powi(n as i32)).min(30_000.0).floor() as u64;
        assert_eq!(policy.delay(n), Duration::from_millis(expected), "attempt {}", n);
    }
}

#[test]
fn test_capped_exponential_never_exceeds_cap() {
    let policy = CappedExponential::default();

    assert_eq!(policy.delay(6), Duration::from_millis(30_000));
    assert_eq!(policy.delay(1_000), Duration::from_millis(30_000));
    assert_eq!(policy.delay(u32::MAX), Duration::from_millis(30_000));
}

#[test]
fn test_policies_are_deterministic() {
    let policies: Vec<Box<dyn ReconnectPolicy>> = vec![
        Box::new(FixedEscalation),
        Box::new(CappedExponential::default()),
        Box::new(FixedDelay::new(Duration::from_millis(750))),
    ];

    for policy in &policies {
        for attempt in 0..20 {
            assert_eq!(policy.delay(attempt), policy.delay(attempt), "{}", policy.name());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_budget_stops_after_max_attempts() {
    verbose_println!("Testing reconnect budget...");

    let transport = MockTransport::new(Outcome::Refuse);
    let manager = build(&transport, FixedDelay::new(Duration::from_secs(1)), 3);
    let mut states = manager.subscribe_state();

    let state = wait_for_state(&mut states, |s| s.status == ConnectionStatus::Exhausted).await;
    assert_eq!(state.attempt, 3);

    // initial connect + 3 reconnects
    assert_eq!(transport.connect_count(), 4);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(transport.connect_count(), 4, "a 4th reconnect must never be scheduled");
    assert_eq!(manager.status(), ConnectionStatus::Exhausted);
    assert_eq!(manager.health(), ConnectionHealth::Failed { attempts: 3 });

    let events = drain(&manager);
    let scheduled: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::Reconnecting { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(scheduled, vec![1, 2, 3]);
    assert!(events.contains(&ClientEvent::Exhausted { attempts: 3 }));
    assert_eq!(manager.metrics().reconnects, 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_budget_never_reconnects() {
    let transport = MockTransport::new(Outcome::Refuse);
    let manager = build(&transport, FixedDelay::new(Duration::from_secs(1)), 0);
    let mut states = manager.subscribe_state();

    wait_for_state(&mut states, |s| s.status == ConnectionStatus::Exhausted).await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(transport.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_follows_policy_delays() {
    let transport = MockTransport::new(Outcome::Refuse);
    let manager = build(&transport, FixedEscalation, 3);

    // initial connect fails immediately, reconnect 1 waits 30s
    eventually(|| transport.connect_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(29_000)).await;
    assert_eq!(transport.connect_count(), 1);

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(transport.connect_count(), 2);

    let delays: Vec<Duration> = drain(&manager)
        .into_iter()
        .filter_map(|e| match e {
            ClientEvent::Reconnecting { delay, .. } => Some(delay),
            _ => None,
        })
        .collect();
    assert_eq!(delays[0], Duration::from_secs(30));
    assert_eq!(delays[1], Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_successful_open_resets_attempts() {
    let transport = MockTransport::scripted([Outcome::Refuse, Outcome::Refuse], Outcome::Accept);
    let manager = build(&transport, FixedDelay::new(Duration::from_secs(1)), 3);
    let mut states = manager.subscribe_state();

    let state = wait_for_state(&mut states, |s| s.status == ConnectionStatus::Open).await;
    assert_eq!(state.attempt, 0);
    assert_eq!(transport.connect_count(), 3);

    // a fresh budget after the open
    transport.socket(0).close_from_server();
    wait_for_state(&mut states, |s| s.status == ConnectionStatus::Closed).await;
    let state = wait_for_state(&mut states, |s| s.status == ConnectionStatus::Open).await;
    assert_eq!(state.attempt, 0);
    assert_eq!(transport.connect_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_health_shows_attempt() {
    let transport = MockTransport::scripted([Outcome::Refuse], Outcome::Hang);
    let manager = build(&transport, FixedDelay::new(Duration::from_secs(5)), 3);
    let mut states = manager.subscribe_state();

    wait_for_state(&mut states, |s| s.status == ConnectionStatus::Closed).await;
    assert_eq!(manager.health(), ConnectionHealth::Reconnecting { attempt: 1 });
    assert_eq!(manager.health().label(), "reconnecting (attempt 1)");

    wait_for_state(&mut states, |s| s.status == ConnectionStatus::Connecting).await;
    assert_eq!(manager.health(), ConnectionHealth::Reconnecting { attempt: 1 });
    assert!(manager.state().last_error.is_some());
}
