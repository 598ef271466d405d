//! Payment reminders for participants who have not paid.
use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::OrderId,
    helpers::with_deadline,
    traits::{
        AddressManagement,
        DeliveryErrorKind,
        MessagingChannel,
        OrderManagement,
        ParticipantManagement,
        SubscriptionManagement,
    },
    tracker_api::{errors::OrderFlowError, messages, notifications::NotificationDispatcher},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "kind", rename_all = "snake_case")]
pub enum ReminderOutcome {
    Sent,
    /// No recipient id is known for this username.
    Unresolved,
    Failed(DeliveryErrorKind),
}

impl Display for ReminderOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderOutcome::Sent => write!(f, "sent"),
            ReminderOutcome::Unresolved => write!(f, "no chat id"),
            ReminderOutcome::Failed(kind) => write!(f, "{kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEntry {
    pub username: String,
    pub outcome: ReminderOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderReport {
    pub order_id: OrderId,
    pub sent: usize,
    pub failed: usize,
    pub entries: Vec<ReminderEntry>,
}

impl ReminderReport {
    fn new(order_id: OrderId) -> Self {
        Self { order_id, sent: 0, failed: 0, entries: vec![] }
    }

    fn record(&mut self, username: String, outcome: ReminderOutcome) {
        if outcome == ReminderOutcome::Sent {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push(ReminderEntry { username, outcome });
    }

    pub fn to_admin_text(&self) -> String {
        if self.entries.is_empty() {
            return format!("🎉 Nobody owes anything on order {}.", self.order_id);
        }
        let mut lines = vec![format!("📩 Reminders for order {}", self.order_id)];
        for entry in &self.entries {
            match entry.outcome {
                ReminderOutcome::Sent => lines.push(format!("• ✅ @{}", entry.username)),
                _ => lines.push(format!("• ❌ @{} ({})", entry.username, entry.outcome)),
            }
        }
        lines.push(format!("Total: ✅ {}  ❌ {}", self.sent, self.failed));
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub orders: usize,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub reports: Vec<ReminderReport>,
}

impl BroadcastReport {
    pub fn to_admin_text(&self) -> String {
        format!(
            "📣 Payment reminders sent across {} orders\nTotal: {}\n✅ Sent: {}\n❌ Failed: {}",
            self.orders, self.total, self.sent, self.failed
        )
    }
}

pub struct ReminderApi<'a, B, M> {
    dispatcher: &'a NotificationDispatcher<B, M>,
}

impl<'a, B, M> ReminderApi<'a, B, M>
where
    B: OrderManagement + ParticipantManagement + SubscriptionManagement + AddressManagement,
    M: MessagingChannel,
{
    pub fn new(dispatcher: &'a NotificationDispatcher<B, M>) -> Self {
        Self { dispatcher }
    }

    /// Reminds every unpaid participant of one order. Each reachable participant is also subscribed to the order.
    /// Fails with `OrderNotFound` when the order is unknown.
    pub async fn remind_unpaid(
        &self,
        order_id: &OrderId,
        body: Option<&str>,
    ) -> Result<ReminderReport, OrderFlowError> {
        let db = self.dispatcher.db();
        let timeout = self.dispatcher.config().store_timeout;
        let usernames = with_deadline(timeout, "fetch_unpaid_usernames", db.fetch_unpaid_usernames(order_id)).await?;
        if usernames.is_empty() {
            let order = with_deadline(timeout, "fetch_order", db.fetch_order(order_id)).await?;
            return match order {
                Some(_) => Ok(ReminderReport::new(order_id.clone())),
                None => Err(OrderFlowError::OrderNotFound(order_id.clone())),
            };
        }
        self.remind_usernames(order_id, usernames, body).await
    }

    /// Runs [`Self::remind_unpaid`] for every order with unpaid participants.
    pub async fn broadcast_unpaid(&self, body: Option<&str>) -> Result<BroadcastReport, OrderFlowError> {
        let db = self.dispatcher.db();
        let timeout = self.dispatcher.config().store_timeout;
        let grouped = with_deadline(timeout, "fetch_unpaid_by_order", db.fetch_unpaid_by_order()).await?;
        let mut result = BroadcastReport { orders: grouped.len(), ..Default::default() };
        for (order_id, usernames) in grouped {
            let report = self.remind_usernames(&order_id, usernames, body).await?;
            result.total += report.entries.len();
            result.sent += report.sent;
            result.failed += report.failed;
            result.reports.push(report);
        }
        info!("🔄️ Payment reminder broadcast: {} of {} delivered", result.sent, result.total);
        Ok(result)
    }

    async fn remind_usernames(
        &self,
        order_id: &OrderId,
        usernames: Vec<String>,
        body: Option<&str>,
    ) -> Result<ReminderReport, OrderFlowError> {
        let db = self.dispatcher.db();
        let timeout = self.dispatcher.config().store_timeout;
        let resolved = with_deadline(timeout, "resolve_usernames", db.resolve_usernames(&usernames)).await?;
        let text = messages::unpaid_reminder(order_id, body);
        let mut report = ReminderReport::new(order_id.clone());
        for username in usernames {
            let Some(recipient) = resolved.iter().find(|r| r.username == username) else {
                report.record(username, ReminderOutcome::Unresolved);
                continue;
            };
            let user_id = recipient.user_id;
            if let Err(e) = with_deadline(timeout, "subscribe", db.subscribe(user_id, order_id)).await {
                warn!("🔄️ Could not subscribe {user_id} to [{order_id}] while reminding. {e}");
            }
            let outcome = match self.dispatcher.send_with_deadline(user_id, &text).await {
                Ok(()) => ReminderOutcome::Sent,
                Err(e) => {
                    info!("📨️ Reminder for [{order_id}] not delivered to @{username}. {e}");
                    ReminderOutcome::Failed(e.kind)
                },
            };
            report.record(username, outcome);
        }
        Ok(report)
    }
}
