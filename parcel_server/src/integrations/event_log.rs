//! Event hooks that record order lifecycle events in the server log.
use log::*;
use parcel_engine::events::{EventHooks, OrderCreatedEvent, OrderDeletedEvent, OrderStatusChangedEvent};

pub fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev: OrderCreatedEvent| {
            Box::pin(async move {
                info!(
                    "📬️ Order [{}] created for '{}' with {} participants",
                    ev.order.order_id, ev.order.client_name, ev.participants_added
                );
            })
        })
        .on_status_changed(|ev: OrderStatusChangedEvent| {
            Box::pin(async move {
                let old = ev.old_status.as_deref().unwrap_or("unknown");
                info!("📬️ Order [{}] moved from '{old}' to '{}'", ev.order_id, ev.status);
            })
        })
        .on_order_deleted(|ev: OrderDeletedEvent| {
            Box::pin(async move {
                info!("📬️ Order [{}] deleted", ev.order_id);
            })
        });
    hooks
}
