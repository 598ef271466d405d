//! # Notification dispatcher
//!
//! Fans a status change out to every subscriber of an order. Each subscriber is an isolated unit of work: a failed
//! or slow send is recorded against that subscriber and the loop moves on. A subscriber's watermark
//! (`last_sent_status`) only moves after the messaging channel has confirmed delivery.
use std::{fmt::Debug, sync::Arc};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::EngineConfig,
    db_types::{Order, OrderId},
    helpers::with_deadline,
    traits::{
        DeliveryError,
        DeliveryErrorKind,
        MessagingChannel,
        OrderManagement,
        RecipientId,
        SubscriptionManagement,
    },
    tracker_api::{errors::DispatchError, messages},
};

/// Whether a subscriber who already received a status should get it again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    #[default]
    AlwaysSend,
    SkipAlreadySent,
}

impl DedupPolicy {
    pub fn should_skip(&self, last_sent: Option<&str>, new_status: &str) -> bool {
        match self {
            DedupPolicy::AlwaysSend => false,
            DedupPolicy::SkipAlreadySent => is_redundant(last_sent, new_status),
        }
    }
}

/// True if `new_status` is exactly what the subscriber was last sent.
pub fn is_redundant(last_sent: Option<&str>, new_status: &str) -> bool {
    last_sent.map(|last| last.trim() == new_status.trim()).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub user_id: RecipientId,
    pub kind: DeliveryErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    /// Subscribers passed over by the dedup policy. Not counted in `attempted`.
    pub skipped: usize,
    /// Sends that succeeded but whose watermark could not be recorded.
    pub watermark_errors: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn record_failure(&mut self, user_id: RecipientId, error: DeliveryError) {
        self.failed += 1;
        self.failures.push(DeliveryFailure { user_id, kind: error.kind, message: error.message });
    }

    pub fn merge(&mut self, other: DispatchReport) {
        self.attempted += other.attempted;
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.watermark_errors += other.watermark_errors;
        self.failures.extend(other.failures);
    }
}

pub struct NotificationDispatcher<B, M> {
    db: B,
    channel: M,
    config: Arc<EngineConfig>,
}

impl<B, M> Debug for NotificationDispatcher<B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationDispatcher")
    }
}

impl<B, M> NotificationDispatcher<B, M> {
    pub fn new(db: B, channel: M, config: Arc<EngineConfig>) -> Self {
        Self { db, channel, config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn channel(&self) -> &M {
        &self.channel
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<B, M> NotificationDispatcher<B, M>
where M: MessagingChannel
{
    /// Sends one message, bounded by the configured send timeout. A timeout is reported as
    /// [`DeliveryErrorKind::Timeout`].
    pub async fn send_with_deadline(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        if recipient <= 0 {
            return Err(DeliveryError::new(
                DeliveryErrorKind::RecipientUnknown,
                format!("{recipient} is not a deliverable recipient id"),
            ));
        }
        let limit = self.config.send_timeout;
        match tokio::time::timeout(limit, self.channel.send(recipient, text)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::new(
                DeliveryErrorKind::Timeout,
                format!("No response from the messaging channel within {}ms", limit.as_millis()),
            )),
        }
    }
}

impl<B, M> NotificationDispatcher<B, M>
where
    B: OrderManagement + SubscriptionManagement,
    M: MessagingChannel,
{
    /// Notifies every subscriber of `order_id` that its status is now `new_status`.
    ///
    /// Only a failure to read the subscriber list is an error. Everything else ends up in the report.
    pub async fn notify_status_change(
        &self,
        order_id: &OrderId,
        new_status: &str,
    ) -> Result<DispatchReport, DispatchError> {
        let timeout = self.config.store_timeout;
        let subscriptions =
            with_deadline(timeout, "fetch_subscriptions_for_order", self.db.fetch_subscriptions_for_order(order_id))
                .await
                .map_err(|source| {
                    error!("📨️ Cannot notify subscribers of [{order_id}]: {source}");
                    DispatchError::SubscribersUnavailable { order_id: order_id.clone(), source }
                })?;
        let mut report = DispatchReport::default();
        if subscriptions.is_empty() {
            debug!("📨️ [{order_id}] has no subscribers");
            return Ok(report);
        }
        let order = match with_deadline(timeout, "fetch_order", self.db.fetch_order(order_id)).await {
            Ok(order) => order,
            Err(e) => {
                warn!("📨️ Could not load [{order_id}] for the notification text, sending a short message. {e}");
                None
            },
        };
        let status_text = self.config.registry.display(new_status);
        let text = messages::status_update(order_id, order.as_ref(), &status_text);
        for subscription in subscriptions {
            let user_id = subscription.user_id;
            if self.config.dedup.should_skip(subscription.last_sent_status.as_deref(), new_status) {
                trace!("📨️ User {user_id} already has '{new_status}' for [{order_id}]");
                report.skipped += 1;
                continue;
            }
            report.attempted += 1;
            match self.send_with_deadline(user_id, &text).await {
                Ok(()) => {
                    report.sent += 1;
                    self.advance_watermark(user_id, order_id, new_status, &mut report).await;
                },
                Err(e) => {
                    info!("📨️ Status update for [{order_id}] not delivered to {user_id}. {e}");
                    report.record_failure(user_id, e);
                },
            }
        }
        debug!(
            "📨️ [{order_id}] status notifications: {} attempted, {} sent, {} failed, {} skipped",
            report.attempted, report.sent, report.failed, report.skipped
        );
        Ok(report)
    }

    /// Tells freshly subscribed recipients about a new order. Successful sends record the order's status as the
    /// watermark.
    pub async fn notify_new_order(&self, order: &Order, recipients: &[RecipientId]) -> DispatchReport {
        let status_text = self.config.registry.display(&order.status);
        let text = messages::new_order(&order.order_id, &status_text);
        let mut report = DispatchReport::default();
        for &user_id in recipients {
            report.attempted += 1;
            match self.send_with_deadline(user_id, &text).await {
                Ok(()) => {
                    report.sent += 1;
                    self.advance_watermark(user_id, &order.order_id, &order.status, &mut report).await;
                },
                Err(e) => {
                    info!("📨️ New order notice for [{}] not delivered to {user_id}. {e}", order.order_id);
                    report.record_failure(user_id, e);
                },
            }
        }
        report
    }

    async fn advance_watermark(
        &self,
        user_id: RecipientId,
        order_id: &OrderId,
        status: &str,
        report: &mut DispatchReport,
    ) {
        let call = self.db.set_last_sent_status(user_id, order_id, status);
        match with_deadline(self.config.store_timeout, "set_last_sent_status", call).await {
            Ok(true) => {},
            Ok(false) => debug!("📨️ User {user_id} unsubscribed from [{order_id}] while we were sending"),
            Err(e) => {
                warn!("📨️ Delivered to {user_id} but could not record the watermark for [{order_id}]. {e}");
                report.watermark_errors += 1;
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn redundancy() {
        assert!(is_redundant(Some("🛒 Purchased"), "🛒 Purchased "));
        assert!(!is_redundant(None, "🛒 Purchased"));
        assert!(!is_redundant(Some("🛒 Purchased"), "✅ Received by the customer"));
        assert!(!DedupPolicy::AlwaysSend.should_skip(Some("a"), "a"));
        assert!(DedupPolicy::SkipAlreadySent.should_skip(Some("a"), "a"));
    }

    #[test]
    fn merging_reports() {
        let mut total = DispatchReport { attempted: 2, sent: 2, ..Default::default() };
        let mut other = DispatchReport { attempted: 1, ..Default::default() };
        other.record_failure(5, DeliveryError::new(DeliveryErrorKind::RecipientBlocked, "blocked"));
        total.merge(other);
        assert_eq!((total.attempted, total.sent, total.failed), (3, 2, 1));
        assert_eq!(total.failures[0].user_id, 5);
    }
}
