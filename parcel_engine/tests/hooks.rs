use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use log::*;
use parcel_engine::{
    db_types::OrderId,
    events::{EventHandlers, EventHooks, OrderCreatedEvent, OrderDeletedEvent, OrderStatusChangedEvent},
    order_objects::{NewOrderRequest, StatusChoice},
    EngineConfig,
    MemoryDatabase,
    OrderFlowApi,
};
use tokio::sync::mpsc;

mod support;

use support::ScriptedChannel;

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

fn forward<E: Send + 'static>(tx: mpsc::UnboundedSender<E>) -> impl Fn(E) -> BoxedHook + Send + Sync + 'static {
    move |event| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(event);
        }) as BoxedHook
    }
}

async fn next<E>(rx: &mut mpsc::UnboundedReceiver<E>) -> E {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for the hook")
        .expect("Hook channel closed")
}

#[tokio::test]
async fn hooks_see_every_committed_change() {
    let _ = env_logger::try_init();
    let (created_tx, mut created_rx) = mpsc::unbounded_channel::<OrderCreatedEvent>();
    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<OrderStatusChangedEvent>();
    let (deleted_tx, mut deleted_rx) = mpsc::unbounded_channel::<OrderDeletedEvent>();
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(forward(created_tx))
        .on_status_changed(forward(status_tx))
        .on_order_deleted(forward(deleted_tx));
    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = OrderFlowApi::new(
        MemoryDatabase::new(),
        ScriptedChannel::default(),
        Arc::new(EngineConfig::default()),
        producers,
    );
    let oid = OrderId::from("CN-1");
    api.create_order(NewOrderRequest::new("CN-1", "@alice_k @bob_b1")).await.unwrap();
    let created = next(&mut created_rx).await;
    info!("🪝️ {created:?}");
    assert_eq!(created.order.order_id, oid);
    assert_eq!(created.participants_added, 2);

    api.update_status(&oid, &StatusChoice::Index(6)).await.unwrap();
    let changed = next(&mut status_rx).await;
    assert_eq!(changed.order_id, oid);
    assert_eq!(changed.status, "🚚 Shipped to Kazakhstan");
    assert_eq!(changed.old_status.as_deref(), Some("🛒 Purchased"));

    api.bulk_update_status(&["CN-1", "KR-404"], &StatusChoice::Index(10)).await.unwrap();
    let changed = next(&mut status_rx).await;
    assert_eq!(changed.status, "✅ Received by the customer");
    assert!(changed.old_status.is_none());

    assert!(api.delete_order(&oid).await.unwrap());
    assert!(!api.delete_order(&oid).await.unwrap());
    assert_eq!(next(&mut deleted_rx).await.order_id, oid);

    drop(api);
    assert!(created_rx.recv().await.is_none());
    assert!(status_rx.recv().await.is_none());
    assert!(deleted_rx.recv().await.is_none());
}
