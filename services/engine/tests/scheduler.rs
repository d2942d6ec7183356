//! End-to-end scheduler tests: in-memory store, wiremock upstream, and a
//! recording notifier.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{available_in_gra, unavailable_everywhere, Harness};
use stockwatch_engine::db::{DbError, User};
use stockwatch_engine::notify::Notifier;
use stockwatch_engine::scheduler::{SchedulerConfig, SchedulerWorker, SubscriptionChecker};
use stockwatch_inventory::DatacenterSet;
use tokio::sync::watch;

fn checker(h: &Harness, page_size: i64) -> SubscriptionChecker {
    let notifier: Arc<dyn Notifier> = h.notifier.clone();
    SubscriptionChecker::new(h.store.clone(), h.registry.clone(), notifier, page_size)
}

fn user(id: i64) -> User {
    User::new(id).with_username(format!("user{id}"))
}

#[tokio::test]
async fn test_single_user_notified_once_when_stock_appears() {
    let h = Harness::start().await;
    let checker = checker(&h, 100);
    let id = h
        .store
        .subscribe(&user(1), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();

    h.upstream_availability(200, &unavailable_everywhere()).await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.checked, 1);
    assert_eq!(stats.available, 0);
    assert!(h.notifier.sent().is_empty());

    let criterion = h.store.get_criterion(id).await.unwrap();
    assert!(criterion.last_check.is_some());
    assert_eq!(criterion.notifications, 0);
    assert_eq!(h.store.subscriber_count(id).await.unwrap(), 1);

    h.upstream_availability(200, &available_in_gra()).await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.available, 1);
    assert_eq!(stats.notified, 1);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        (
            1,
            "@user1 plan <code>24ska01</code> is available in <code>gra</code>".to_string()
        )
    );
    assert!(matches!(
        h.store.list_for_user(1).await,
        Err(DbError::NotFound(_))
    ));
    assert_eq!(h.store.get_criterion(id).await.unwrap().notifications, 1);

    // Nobody is left to notify on later passes.
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_shared_criterion_notifies_every_subscriber() {
    let h = Harness::start().await;
    let checker = checker(&h, 100);
    let a = h
        .store
        .subscribe(&user(1), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();
    let b = h
        .store
        .subscribe(&user(2), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();
    assert_eq!(a, b);

    h.upstream_availability(200, &available_in_gra()).await;
    checker.check_all().await.unwrap();

    assert_eq!(h.notifier.sent_to(1), 1);
    assert_eq!(h.notifier.sent_to(2), 1);
    assert_eq!(h.store.subscriber_count(a).await.unwrap(), 0);

    let criterion = h.store.get_criterion(a).await.unwrap();
    assert_eq!(criterion.notifications, 2);
}

#[tokio::test]
async fn test_failed_delivery_keeps_subscription() {
    let h = Harness::start().await;
    let checker = checker(&h, 100);
    h.notifier.fail_for(1);
    let id = h
        .store
        .subscribe(&user(1), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();
    h.store
        .subscribe(&user(2), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();

    h.upstream_availability(200, &available_in_gra()).await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.notified, 1);
    assert_eq!(stats.delivery_failures, 1);

    let remaining = h.store.list_for_user(1).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].criterion.id, id);
    assert!(h.store.list_for_user(2).await.is_err());
    assert_eq!(h.store.get_criterion(id).await.unwrap().notifications, 1);
}

#[tokio::test]
async fn test_upstream_failure_leaves_criterion_unchecked() {
    let h = Harness::start().await;
    let checker = checker(&h, 100);
    let id = h
        .store
        .subscribe(&user(1), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();

    h.upstream_availability(500, r#"{"message": "Internal server error"}"#)
        .await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.failed, 1);

    let criterion = h.store.get_criterion(id).await.unwrap();
    assert!(criterion.last_check.is_none());
    assert_eq!(h.store.subscriber_count(id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_not_found_counts_as_checked() {
    let h = Harness::start().await;
    let checker = checker(&h, 100);
    let id = h
        .store
        .subscribe(&user(1), "ovh-eu", "24ska01", &DatacenterSet::parse("gra"))
        .await
        .unwrap();

    h.upstream_availability(404, r#"{"message": "not found"}"#).await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.failed, 0);

    let criterion = h.store.get_criterion(id).await.unwrap();
    assert!(criterion.last_check.is_some());
    assert_eq!(criterion.notifications, 0);
}

#[tokio::test]
async fn test_datacenter_filter_limits_matches() {
    let h = Harness::start().await;
    let checker = checker(&h, 100);
    h.store
        .subscribe(&user(1), "ovh-eu", "24ska01", &DatacenterSet::parse("rbx"))
        .await
        .unwrap();

    // The upstream answers with stock outside the requested set.
    h.upstream_availability(200, &available_in_gra()).await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.available, 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_region_does_not_abort_scan() {
    let h = Harness::start().await;
    let checker = checker(&h, 1);
    h.store
        .subscribe(&user(1), "ovh-mars", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();
    h.store
        .subscribe(&user(2), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();

    h.upstream_availability(200, &available_in_gra()).await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.notified, 1);
    assert_eq!(h.notifier.sent_to(2), 1);
}

#[tokio::test]
async fn test_walks_every_page() {
    let h = Harness::start().await;
    let checker = checker(&h, 2);
    for i in 0..5 {
        h.store
            .subscribe(&user(i), "ovh-eu", &format!("plan-{i}"), &DatacenterSet::any())
            .await
            .unwrap();
    }

    h.upstream_availability(200, &unavailable_everywhere()).await;
    let stats = checker.check_all().await.unwrap();
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.checked, 5);
}

#[tokio::test]
async fn test_worker_stops_on_shutdown() {
    let h = Harness::start().await;
    let config = SchedulerConfig {
        check_interval: Duration::from_millis(20),
        reclaim_interval: Duration::from_millis(20),
        page_size: 10,
    };
    let worker = SchedulerWorker::new(checker(&h, 10), h.store.clone(), config);
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { worker.run(rx).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}
