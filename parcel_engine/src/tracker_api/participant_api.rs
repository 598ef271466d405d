//! Participant and payment-flag bookkeeping.
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{OrderId, Participant},
    helpers::{normalize_username, with_deadline, ValidationError},
    traits::{OrderManagement, ParticipantManagement, ParticipantPage, ParticipantQuery},
    tracker_api::errors::OrderFlowError,
};

pub struct ParticipantApi<B> {
    db: B,
    config: Arc<EngineConfig>,
}

impl<B: Debug> Debug for ParticipantApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParticipantApi ({:?})", self.db)
    }
}

impl<B> ParticipantApi<B>
where B: ParticipantManagement + OrderManagement
{
    pub fn new(db: B, config: Arc<EngineConfig>) -> Self {
        Self { db, config }
    }

    /// Attaches usernames to an existing order. Blank names are dropped; if none are left the request is rejected.
    /// Returns how many participants were new.
    pub async fn ensure(&self, order_id: &OrderId, usernames: &[String]) -> Result<u64, OrderFlowError> {
        let usernames: Vec<String> = usernames.iter().filter_map(|u| normalize_username(u)).collect();
        if usernames.is_empty() {
            return Err(ValidationError::NoUsernames.into());
        }
        self.require_order(order_id).await?;
        let added = with_deadline(
            self.config.store_timeout,
            "ensure_participants",
            self.db.ensure_participants(order_id, &usernames),
        )
        .await?;
        debug!("🔄️ {added} of {} participants were new on [{order_id}]", usernames.len());
        Ok(added)
    }

    pub async fn list(&self, order_id: &OrderId) -> Result<Vec<Participant>, OrderFlowError> {
        let participants =
            with_deadline(self.config.store_timeout, "fetch_participants", self.db.fetch_participants(order_id))
                .await?;
        Ok(participants)
    }

    pub async fn toggle_paid(&self, order_id: &OrderId, username: &str) -> Result<Participant, OrderFlowError> {
        if normalize_username(username).is_none() {
            return Err(ValidationError::EmptyField("username").into());
        }
        let participant =
            with_deadline(self.config.store_timeout, "toggle_paid", self.db.toggle_paid(order_id, username)).await?;
        let state = if participant.paid { "paid" } else { "unpaid" };
        info!("🔄️ @{} on [{order_id}] is now {state}", participant.username);
        Ok(participant)
    }

    pub async fn unpaid_usernames(&self, order_id: &OrderId) -> Result<Vec<String>, OrderFlowError> {
        let call = self.db.fetch_unpaid_usernames(order_id);
        Ok(with_deadline(self.config.store_timeout, "fetch_unpaid_usernames", call).await?)
    }

    pub async fn unpaid_by_order(&self) -> Result<BTreeMap<OrderId, Vec<String>>, OrderFlowError> {
        let call = self.db.fetch_unpaid_by_order();
        Ok(with_deadline(self.config.store_timeout, "fetch_unpaid_by_order", call).await?)
    }

    pub async fn search(&self, query: ParticipantQuery) -> Result<ParticipantPage, OrderFlowError> {
        let call = self.db.search_participants(query);
        Ok(with_deadline(self.config.store_timeout, "search_participants", call).await?)
    }

    async fn require_order(&self, order_id: &OrderId) -> Result<(), OrderFlowError> {
        match with_deadline(self.config.store_timeout, "fetch_order", self.db.fetch_order(order_id)).await? {
            Some(_) => Ok(()),
            None => Err(OrderFlowError::OrderNotFound(order_id.clone())),
        }
    }
}

/// Renders the unpaid overview for staff, one line per order.
pub fn render_unpaid_report(grouped: &BTreeMap<OrderId, Vec<String>>) -> String {
    if grouped.is_empty() {
        return "🎉 Nobody owes anything.".to_string();
    }
    let mut lines = vec![format!("📋 Unpaid participants ({} orders):", grouped.len())];
    for (order_id, usernames) in grouped {
        let names = usernames.iter().map(|u| format!("@{u}")).collect::<Vec<_>>().join(", ");
        lines.push(format!("• {order_id}: {names}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unpaid_report_text() {
        let mut grouped = BTreeMap::new();
        grouped.insert(OrderId::from("KR-2"), vec!["bob_b1".to_string()]);
        grouped.insert(OrderId::from("CN-1"), vec!["alice_k".to_string(), "carol".to_string()]);
        assert_eq!(
            render_unpaid_report(&grouped),
            "📋 Unpaid participants (2 orders):\n• CN-1: @alice_k, @carol\n• KR-2: @bob_b1"
        );
        assert_eq!(render_unpaid_report(&BTreeMap::new()), "🎉 Nobody owes anything.");
    }
}
