//! # Bulk status operator
//!
//! Applies one status to a batch of orders and notifies each order's subscribers. Every order is its own unit of
//! work; the batch always completes and returns a [`BulkReport`].
use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::OrderId,
    events::{EventProducers, OrderStatusChangedEvent},
    helpers::with_deadline,
    traits::{MessagingChannel, OrderManagement, SubscriptionManagement},
    tracker_api::notifications::{DispatchReport, NotificationDispatcher},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum BulkOutcome {
    Succeeded,
    NotFound,
    StoreFailed(String),
    /// The status was changed, but the subscribers could not be notified. The change is not rolled back.
    NotificationFailed(String),
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BulkOutcome::Succeeded)
    }
}

impl Display for BulkOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BulkOutcome::Succeeded => write!(f, "ok"),
            BulkOutcome::NotFound => write!(f, "not found"),
            BulkOutcome::StoreFailed(reason) => write!(f, "storage error: {reason}"),
            BulkOutcome::NotificationFailed(reason) => write!(f, "notification error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    pub order_id: OrderId,
    #[serde(flatten)]
    pub outcome: BulkOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_ids: Vec<OrderId>,
    pub items: Vec<BulkItem>,
    /// Notification counts summed over every order in the batch.
    pub notifications: DispatchReport,
}

impl BulkReport {
    pub fn new(total: usize) -> Self {
        Self { total, items: Vec::with_capacity(total), ..Default::default() }
    }

    pub fn record(&mut self, order_id: OrderId, outcome: BulkOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failed_ids.push(order_id.clone());
        }
        self.items.push(BulkItem { order_id, outcome });
    }

    /// Short summary for the staff chat.
    pub fn to_admin_text(&self, title: &str) -> String {
        let mut lines = vec![
            title.to_string(),
            format!("Total: {}", self.total),
            format!("✅ Updated: {}", self.succeeded),
            format!("❌ Errors: {}", self.failed),
        ];
        if !self.failed_ids.is_empty() {
            let ids = self.failed_ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ");
            lines.push(format!("Failed ids: {ids}"));
        }
        if self.notifications.attempted > 0 {
            lines.push(format!(
                "📨 Notifications sent: {} of {}",
                self.notifications.sent, self.notifications.attempted
            ));
        }
        lines.join("\n")
    }
}

pub struct BulkStatusOperator<'a, B, M> {
    dispatcher: &'a NotificationDispatcher<B, M>,
    producers: &'a EventProducers,
}

impl<'a, B, M> BulkStatusOperator<'a, B, M>
where
    B: OrderManagement + SubscriptionManagement,
    M: MessagingChannel,
{
    pub fn new(dispatcher: &'a NotificationDispatcher<B, M>, producers: &'a EventProducers) -> Self {
        Self { dispatcher, producers }
    }

    /// Sets `status` on every order in `order_ids` and notifies their subscribers. `order_ids` must already be
    /// deduplicated.
    ///
    /// A set-based write is tried first. If it touched every order, the per-order writes are skipped. Otherwise each
    /// order is written on its own so that its outcome can be told apart.
    pub async fn apply(&self, order_ids: &[OrderId], status: &str) -> BulkReport {
        let mut report = BulkReport::new(order_ids.len());
        if order_ids.is_empty() {
            return report;
        }
        let db = self.dispatcher.db();
        let timeout = self.dispatcher.config().store_timeout;
        let all_written =
            match with_deadline(timeout, "bulk_update_status", db.bulk_update_status(order_ids, status)).await {
                Ok(count) if count as usize == order_ids.len() => true,
                Ok(count) => {
                    debug!("🔄️ Set-based write changed {count} of {} orders. Writing one by one.", order_ids.len());
                    false
                },
                Err(e) => {
                    warn!("🔄️ Set-based status write failed, writing one by one. {e}");
                    false
                },
            };
        for order_id in order_ids {
            let outcome = self.apply_one(order_id, status, all_written, &mut report.notifications).await;
            trace!("🔄️ [{order_id}] {outcome}");
            report.record(order_id.clone(), outcome);
        }
        info!("🔄️ Bulk status '{status}': {} of {} orders updated", report.succeeded, report.total);
        report
    }

    async fn apply_one(
        &self,
        order_id: &OrderId,
        status: &str,
        already_written: bool,
        notifications: &mut DispatchReport,
    ) -> BulkOutcome {
        if !already_written {
            let db = self.dispatcher.db();
            let timeout = self.dispatcher.config().store_timeout;
            match with_deadline(timeout, "update_order_status", db.update_order_status(order_id, status)).await {
                Ok(Some(_)) => {},
                Ok(None) => return BulkOutcome::NotFound,
                Err(e) => {
                    warn!("🔄️ Could not update [{order_id}] to '{status}'. {e}");
                    return BulkOutcome::StoreFailed(e.to_string());
                },
            }
        }
        self.producers.publish_status_changed(OrderStatusChangedEvent::new(order_id.clone(), status, None)).await;
        match self.dispatcher.notify_status_change(order_id, status).await {
            Ok(dispatched) => {
                notifications.merge(dispatched);
                BulkOutcome::Succeeded
            },
            Err(e) => BulkOutcome::NotificationFailed(e.to_string()),
        }
    }
}
