use std::{sync::Arc, time::Duration};

use parcel_engine::{
    db_types::OrderId,
    DedupPolicy,
    DeliveryErrorKind,
    EngineConfig,
    MemoryDatabase,
    NotificationDispatcher,
    OrderManagement,
    SubscriptionManagement,
};

mod support;

use support::{new_sqlite_db, purchased_order, tear_down, ScriptedChannel};

const SHIPPED: &str = "🚚 Shipped to Kazakhstan";

async fn order_with_subscribers<B>(db: &B, order_id: &str, users: &[i64]) -> OrderId
where B: OrderManagement + SubscriptionManagement {
    let oid = OrderId::from(order_id);
    db.upsert_order(purchased_order(order_id, "@alice_k")).await.unwrap();
    for &user in users {
        db.subscribe(user, &oid).await.unwrap();
    }
    oid
}

async fn last_sent<B: SubscriptionManagement>(db: &B, oid: &OrderId, user: i64) -> Option<String> {
    db.fetch_subscriptions_for_order(oid)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.user_id == user)
        .and_then(|s| s.last_sent_status)
}

#[tokio::test]
async fn one_failing_subscriber_does_not_stop_the_rest() {
    let db = new_sqlite_db().await;
    let oid = order_with_subscribers(&db, "CN-1", &[1, 2, 3]).await;
    let channel = ScriptedChannel::default().failing_for(2, DeliveryErrorKind::RecipientBlocked);
    let dispatcher = NotificationDispatcher::new(db.clone(), channel.clone(), Arc::new(EngineConfig::default()));

    let report = dispatcher.notify_status_change(&oid, SHIPPED).await.unwrap();
    assert_eq!((report.attempted, report.sent, report.failed), (3, 2, 1));
    assert_eq!(report.failures[0].user_id, 2);
    assert_eq!(report.failures[0].kind, DeliveryErrorKind::RecipientBlocked);
    assert_eq!(channel.recipients(), [1, 3]);
    assert!(channel.sent()[0].1.contains("CN-1"));

    assert_eq!(last_sent(&db, &oid, 1).await.as_deref(), Some(SHIPPED));
    assert_eq!(last_sent(&db, &oid, 2).await, None);
    assert_eq!(last_sent(&db, &oid, 3).await.as_deref(), Some(SHIPPED));
    tear_down(db).await;
}

#[tokio::test]
async fn slow_sends_are_cut_off_as_timeouts() {
    let db = MemoryDatabase::new();
    let oid = order_with_subscribers(&db, "KR-1", &[1, 2]).await;
    let channel = ScriptedChannel::default().stalling_for(1, Duration::from_secs(2));
    let config = EngineConfig::default().with_timeouts(Duration::from_secs(1), Duration::from_millis(50));
    let dispatcher = NotificationDispatcher::new(db.clone(), channel.clone(), Arc::new(config));

    let report = dispatcher.notify_status_change(&oid, SHIPPED).await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, DeliveryErrorKind::Timeout);
    assert_eq!(channel.recipients(), [2]);
    assert_eq!(last_sent(&db, &oid, 1).await, None);
}

#[tokio::test]
async fn dedup_policy_skips_subscribers_already_told() {
    let db = MemoryDatabase::new();
    let oid = order_with_subscribers(&db, "CN-2", &[1, 2]).await;
    db.set_last_sent_status(1, &oid, SHIPPED).await.unwrap();

    let channel = ScriptedChannel::default();
    let config = EngineConfig::default().with_dedup(DedupPolicy::SkipAlreadySent);
    let dispatcher = NotificationDispatcher::new(db.clone(), channel.clone(), Arc::new(config));
    let report = dispatcher.notify_status_change(&oid, SHIPPED).await.unwrap();
    assert_eq!((report.attempted, report.sent, report.skipped), (1, 1, 1));
    assert_eq!(channel.recipients(), [2]);

    let channel = ScriptedChannel::default();
    let dispatcher = NotificationDispatcher::new(db.clone(), channel.clone(), Arc::new(EngineConfig::default()));
    let report = dispatcher.notify_status_change(&oid, SHIPPED).await.unwrap();
    assert_eq!((report.attempted, report.sent, report.skipped), (2, 2, 0));
}

#[tokio::test]
async fn unusable_recipient_ids_are_reported_not_sent() {
    let db = MemoryDatabase::new();
    let oid = order_with_subscribers(&db, "CN-3", &[0, 7]).await;
    let channel = ScriptedChannel::default();
    let dispatcher = NotificationDispatcher::new(db.clone(), channel.clone(), Arc::new(EngineConfig::default()));

    let report = dispatcher.notify_status_change(&oid, SHIPPED).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].user_id, 0);
    assert_eq!(report.failures[0].kind, DeliveryErrorKind::RecipientUnknown);
    assert_eq!(channel.recipients(), [7]);
}

#[tokio::test]
async fn orders_without_subscribers_send_nothing() {
    let db = MemoryDatabase::new();
    let oid = order_with_subscribers(&db, "CN-4", &[]).await;
    let channel = ScriptedChannel::default();
    let dispatcher = NotificationDispatcher::new(db, channel.clone(), Arc::new(EngineConfig::default()));
    let report = dispatcher.notify_status_change(&oid, SHIPPED).await.unwrap();
    assert_eq!(report.attempted, 0);
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn new_order_notice_sets_the_watermark() {
    let db = MemoryDatabase::new();
    let oid = order_with_subscribers(&db, "KR-5", &[4]).await;
    let order = db.fetch_order(&oid).await.unwrap().unwrap();
    let channel = ScriptedChannel::default();
    let dispatcher = NotificationDispatcher::new(db.clone(), channel.clone(), Arc::new(EngineConfig::default()));

    let report = dispatcher.notify_new_order(&order, &[4]).await;
    assert_eq!(report.sent, 1);
    assert_eq!(last_sent(&db, &oid, 4).await.as_deref(), Some("🛒 Purchased"));
}
