//! Integration tests for the identity level cache and its refresh loop
//!
//! Tests cover:
//! - On-demand lookups and the unknown-tier fallback
//! - Periodic refresh sweeps (level changes, failed lookups)
//! - Stop semantics (join, idempotence, no calls after stop)
//!
//! All tests run on a paused tokio clock, so refresh intervals and registry
//! timeouts elapse instantly.

mod common;

use common::{address, settings, MockRegistry, Reply};
use futures::future::join_all;
use identity_slots_sdk::{
    AccountSlotsExtension, ExtensionState, IdentityError, IdentityExtension, IdentityLevel,
    SweepStats,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Registry answers PROFESSIONAL for A and never answers for B; A later drops to ANONYMOUS.
#[tokio::test(start_paused = true)]
async fn test_reference_scenario() {
    let a = address(0xA);
    let b = address(0xB);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(4));
    registry.set(b, Reply::Hang);

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();

    assert_eq!(extension.account_slots(a).await, 256);

    let start = Instant::now();
    assert_eq!(extension.account_slots(b).await, 16);
    assert!(start.elapsed() >= Duration::from_millis(500), "lookup should wait for the timeout");
    assert_eq!(extension.level_of(&b).await, Some(IdentityLevel::Unknown));

    registry.set(a, Reply::Level(1));
    assert_eq!(extension.account_slots(a).await, 256, "no change before the next sweep");

    sleep(Duration::from_secs(6)).await;

    assert_eq!(extension.account_slots(a).await, 32);
    assert_eq!(extension.account_slots(b).await, 16);

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_registry_gives_minimum_quota_once() {
    let a = address(1);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Fail);

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();

    assert_eq!(extension.account_slots(a).await, 16);
    assert_eq!(extension.account_slots(a).await, 16);
    assert_eq!(registry.calls_for(a), 1, "failed lookup should still be cached");

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_falls_back_to_unknown() {
    let a = address(2);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Malformed);

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();

    assert_eq!(extension.account_slots(a).await, 16);
    assert_eq!(extension.level_of(&a).await, Some(IdentityLevel::Unknown));

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_quota_is_stable_between_ticks() {
    let a = address(3);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(2));

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();

    for _ in 0..10 {
        assert_eq!(extension.account_slots(a).await, 64);
    }
    assert_eq!(registry.calls_for(a), 1);

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_seeded_addresses_resolve_on_refresh() {
    let a = address(0x10);
    let b = address(0x11);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(2));
    registry.set(b, Reply::Level(2));

    let mut cfg = settings();
    cfg.seed_addresses = vec![format!("{:?}", a), format!("{:?}", b)];
    let extension = IdentityExtension::new(&cfg, registry.clone()).unwrap();

    // Seeds are served from the cache until the first sweep.
    assert_eq!(extension.account_slots(a).await, 16);
    assert_eq!(extension.account_slots(b).await, 16);
    assert_eq!(registry.calls(), 0);

    let stats = extension.refresh_now().await;
    assert_eq!(stats.checked, 2);
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.failed, 0);

    assert_eq!(extension.account_slots(a).await, 64);
    assert_eq!(extension.account_slots(b).await, 64);

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_periodic_sweep_updates_seeded_addresses() {
    let a = address(0x20);
    let b = address(0x21);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(2));
    registry.set(b, Reply::Level(2));

    let mut cfg = settings();
    cfg.seed_addresses = vec![format!("{:?}", a), format!("{:?}", b)];
    let extension = IdentityExtension::new(&cfg, registry.clone()).unwrap();

    sleep(Duration::from_millis(5_100)).await;

    assert_eq!(extension.level_of(&a).await, Some(IdentityLevel::Registered));
    assert_eq!(extension.level_of(&b).await, Some(IdentityLevel::Registered));
    assert_eq!(extension.account_slots(a).await, 64);
    assert_eq!(extension.account_slots(b).await, 64);

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_cached_level() {
    let a = address(4);
    let b = address(5);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(3));
    registry.set(b, Reply::Level(4));

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();
    assert_eq!(extension.account_slots(a).await, 128);
    assert_eq!(extension.account_slots(b).await, 256);

    registry.set(a, Reply::Fail);
    registry.set(b, Reply::Hang);
    sleep(Duration::from_secs(6)).await;

    assert!(registry.calls_for(a) >= 2, "sweep should have retried A");
    assert_eq!(extension.account_slots(a).await, 128);
    assert_eq!(extension.account_slots(b).await, 256);

    let stats = extension.refresh_now().await;
    assert_eq!(stats.checked, 2);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.updated, 0);

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_one_failure_does_not_abort_sweep() {
    let a = address(6);
    let b = address(7);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(1));
    registry.set(b, Reply::Level(1));

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();
    extension.account_slots(a).await;
    extension.account_slots(b).await;

    registry.set(a, Reply::Fail);
    registry.set(b, Reply::Level(3));
    let stats = extension.refresh_now().await;

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.updated, 1);
    assert_eq!(extension.level_of(&a).await, Some(IdentityLevel::Anonymous));
    assert_eq!(extension.level_of(&b).await, Some(IdentityLevel::Identified));

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_registry_calls() {
    let a = address(8);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(2));

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();
    assert_eq!(extension.account_slots(a).await, 64);

    sleep(Duration::from_secs(11)).await;
    let calls_while_running = registry.calls();
    assert!(calls_while_running >= 3, "expected two sweeps, got {} calls", calls_while_running);

    assert_eq!(extension.state(), ExtensionState::Running);
    extension.stop().await;
    assert_eq!(extension.state(), ExtensionState::Stopped);

    let calls_at_stop = registry.calls();
    sleep(Duration::from_secs(60)).await;
    assert_eq!(registry.calls(), calls_at_stop);

    // The store is frozen but still readable.
    assert_eq!(extension.account_slots(a).await, 64);
    assert_eq!(registry.calls(), calls_at_stop);

    // Unseen accounts get the minimum quota without a registry call.
    let unseen = address(0x77);
    registry.set(unseen, Reply::Level(4));
    assert_eq!(extension.account_slots(unseen).await, 16);
    assert_eq!(extension.level_of(&unseen).await, None);

    // Manual sweeps are no-ops once stopped.
    registry.set(a, Reply::Level(1));
    let stats = extension.refresh_now().await;
    assert_eq!(stats, SweepStats::default());
    assert_eq!(extension.level_of(&a).await, Some(IdentityLevel::Registered));

    assert_eq!(registry.calls(), calls_at_stop, "registry called after stop");
    assert!(extension.store().is_frozen());
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let registry = Arc::new(MockRegistry::new());
    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();

    extension.stop().await;
    extension.stop().await;
    assert_eq!(extension.state(), ExtensionState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_inflight_sweep() {
    let a = address(9);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Hang);

    let mut cfg = settings();
    cfg.request_timeout_ms = 60_000;
    cfg.seed_addresses = vec![format!("{:?}", a)];
    let extension = IdentityExtension::new(&cfg, registry.clone()).unwrap();

    // The first sweep starts at 5s and blocks on A.
    sleep(Duration::from_millis(5_100)).await;
    assert_eq!(registry.calls_for(a), 1);

    let start = Instant::now();
    extension.stop().await;
    assert!(start.elapsed() < Duration::from_secs(1), "stop waited for the registry timeout");
    assert_eq!(extension.state(), ExtensionState::Stopped);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(registry.calls_for(a), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cached_lookups_not_blocked_by_pending_sweep() {
    let slow = address(0x60);
    let cached = address(0x61);
    let registry = Arc::new(MockRegistry::new());
    registry.set(slow, Reply::Hang);
    registry.set(cached, Reply::Level(2));

    let mut cfg = settings();
    cfg.request_timeout_ms = 60_000;
    cfg.seed_addresses = vec![format!("{:?}", slow)];
    let extension = IdentityExtension::new(&cfg, registry.clone()).unwrap();

    assert_eq!(extension.account_slots(cached).await, 64);

    // The first sweep starts at 5s and waits on the slow address.
    sleep(Duration::from_millis(5_100)).await;
    assert_eq!(registry.calls_for(slow), 1);

    let start = Instant::now();
    assert_eq!(extension.account_slots(cached).await, 64);
    assert_eq!(extension.account_slots(slow).await, 16);
    assert_eq!(start.elapsed(), Duration::ZERO, "foreground lookup waited on the sweep");

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_share_one_registry_call() {
    let a = address(0x30);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(4));
    let others: Vec<_> = (0x40..0x50).map(address).collect();
    for other in &others {
        registry.set(*other, Reply::Level(2));
    }

    let extension = IdentityExtension::new(&settings(), registry.clone()).unwrap();

    let same = join_all((0..8).map(|_| extension.account_slots(a))).await;
    assert!(same.iter().all(|slots| *slots == 256));
    assert_eq!(registry.calls_for(a), 1);

    let distinct = join_all(others.iter().map(|o| extension.account_slots(*o))).await;
    assert!(distinct.iter().all(|slots| *slots == 64));
    assert_eq!(extension.store().len().await, 1 + others.len());

    extension.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_extension_behind_trait_object() {
    let a = address(0x50);
    let registry = Arc::new(MockRegistry::new());
    registry.set(a, Reply::Level(3));

    let extension: Arc<dyn AccountSlotsExtension> =
        Arc::new(IdentityExtension::new(&settings(), registry.clone()).unwrap());

    assert_eq!(extension.account_slots(a).await, 128);
    let tx = ethers::types::Transaction::default();
    assert!(extension.validate_transaction(&tx, true).is_ok());
    assert!(extension.validate_transaction(&tx, false).is_ok());

    extension.stop().await;
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let registry = Arc::new(MockRegistry::new());

    let mut cfg = settings();
    cfg.profile_registry_address = "not-an-address".to_string();
    let err = IdentityExtension::new(&cfg, registry.clone()).err().expect("should fail");
    assert!(matches!(err, IdentityError::Configuration(_)));
    assert!(!err.is_registry_unavailable());

    let mut cfg = settings();
    cfg.update_interval_ms = 0;
    assert!(matches!(
        IdentityExtension::new(&cfg, registry.clone()),
        Err(IdentityError::Configuration(_))
    ));

    let mut cfg = settings();
    cfg.seed_addresses = vec!["0x1234".to_string()];
    assert!(matches!(
        IdentityExtension::new(&cfg, registry),
        Err(IdentityError::Configuration(_))
    ));
}
