use std::{fmt::Debug, str::FromStr, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{NewOrder, Order, OrderId},
    events::{EventProducers, OrderCreatedEvent, OrderDeletedEvent, OrderStatusChangedEvent},
    helpers::{
        country_for_order,
        extract_order_ids,
        extract_usernames,
        normalize_phone,
        split_tokens,
        with_deadline,
        ValidationError,
    },
    traits::{MessagingChannel, OrderUpdate, TrackerDatabase},
    tracker_api::{
        bulk_operator::{BulkOutcome, BulkReport, BulkStatusOperator},
        errors::OrderFlowError,
        import::{ImportReport, ImportRow},
        notifications::{DispatchReport, NotificationDispatcher},
        order_objects::{CreateOrderResult, NewOrderRequest, StatusChangeResult, StatusChoice},
        reminders::ReminderApi,
    },
};

/// `OrderFlowApi` is the primary API for staff actions that change orders.
///
/// Every write path that takes user input validates it here, before anything reaches storage. Status changes are
/// followed by a notification fan-out through the [`NotificationDispatcher`], whose failures are reported but never
/// undo the change.
pub struct OrderFlowApi<B, M> {
    dispatcher: NotificationDispatcher<B, M>,
    producers: EventProducers,
}

impl<B, M> Debug for OrderFlowApi<B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, M> OrderFlowApi<B, M> {
    pub fn new(db: B, channel: M, config: Arc<EngineConfig>, producers: EventProducers) -> Self {
        Self { dispatcher: NotificationDispatcher::new(db, channel, config), producers }
    }

    pub fn db(&self) -> &B {
        self.dispatcher.db()
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher<B, M> {
        &self.dispatcher
    }

    pub fn config(&self) -> &EngineConfig {
        self.dispatcher.config()
    }
}

impl<B, M> OrderFlowApi<B, M>
where
    B: TrackerDatabase,
    M: MessagingChannel,
{
    /// Creates (or overwrites) an order from a staff request.
    ///
    /// The order id prefix must be an allowed country code. `@username`s in the client label become participants, and
    /// unless the request opts out, those with a known recipient id are subscribed and sent a "new order" notice.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<CreateOrderResult, OrderFlowError> {
        let config = self.config();
        let order_id = OrderId::from_str(&request.order_id)?;
        let derived_country = country_for_order(&order_id, &config.allowed_prefixes)?;
        let country = request
            .country
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or(derived_country);
        let status = match &request.status {
            Some(choice) => choice.resolve(&config.registry)?,
            None => config.registry.initial(),
        };
        let mut new_order =
            NewOrder::new(order_id.clone(), request.client_name.trim(), status.label).with_country(country);
        if let Some(phone) = non_blank(request.phone.as_deref()) {
            new_order = new_order.with_phone(normalize_phone(phone)?);
        }
        if let Some(origin) = non_blank(request.origin.as_deref()) {
            new_order = new_order.with_origin(origin);
        }
        if let Some(note) = non_blank(request.note.as_deref()) {
            new_order = new_order.with_note(note);
        }
        let db = self.db();
        let timeout = config.store_timeout;
        let order = with_deadline(timeout, "upsert_order", db.upsert_order(new_order)).await?;
        let usernames = extract_usernames(&order.client_name);
        let participants_added = if usernames.is_empty() {
            0
        } else {
            with_deadline(timeout, "ensure_participants", db.ensure_participants(&order_id, &usernames)).await?
        };
        let mut result = CreateOrderResult {
            order: order.clone(),
            participants_added,
            subscribed: 0,
            unresolved: vec![],
            notifications: DispatchReport::default(),
        };
        if request.notify_participants && !usernames.is_empty() {
            self.announce_new_order(&order, &usernames, &mut result).await;
        }
        info!(
            "🔄️ Order [{order_id}] saved with {participants_added} new participants. {} of {} notices delivered",
            result.notifications.sent, result.notifications.attempted
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(order, participants_added)).await;
        Ok(result)
    }

    async fn announce_new_order(&self, order: &Order, usernames: &[String], result: &mut CreateOrderResult) {
        let db = self.db();
        let timeout = self.config().store_timeout;
        let resolved = match with_deadline(timeout, "resolve_usernames", db.resolve_usernames(usernames)).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("🔄️ Could not resolve the participants of [{}]. Nobody was notified. {e}", order.order_id);
                vec![]
            },
        };
        result.unresolved =
            usernames.iter().filter(|u| !resolved.iter().any(|r| &r.username == *u)).cloned().collect();
        let mut recipients = Vec::with_capacity(resolved.len());
        for recipient in resolved {
            match with_deadline(timeout, "subscribe", db.subscribe(recipient.user_id, &order.order_id)).await {
                Ok(_) => {
                    result.subscribed += 1;
                    recipients.push(recipient.user_id);
                },
                Err(e) => warn!("🔄️ Could not subscribe @{} to [{}]. {e}", recipient.username, order.order_id),
            }
        }
        result.notifications = self.dispatcher.notify_new_order(order, &recipients).await;
    }

    /// Moves an order to the chosen status and notifies its subscribers.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        status: &StatusChoice,
    ) -> Result<StatusChangeResult, OrderFlowError> {
        let status = status.resolve(&self.config().registry)?;
        self.change_status(order_id, &status.label).await
    }

    /// An admin override: clears the delivery watermark of every subscriber first, so the new status reaches all of
    /// them whatever they were sent before.
    pub async fn force_status(
        &self,
        order_id: &OrderId,
        status: &StatusChoice,
    ) -> Result<StatusChangeResult, OrderFlowError> {
        let status = status.resolve(&self.config().registry)?;
        let timeout = self.config().store_timeout;
        if with_deadline(timeout, "fetch_order", self.db().fetch_order(order_id)).await?.is_none() {
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        let reset =
            with_deadline(timeout, "reset_last_sent_for_order", self.db().reset_last_sent_for_order(order_id)).await?;
        debug!("🔄️ Forced status on [{order_id}]: {reset} watermarks cleared");
        self.change_status(order_id, &status.label).await
    }

    async fn change_status(&self, order_id: &OrderId, label: &str) -> Result<StatusChangeResult, OrderFlowError> {
        let db = self.db();
        let timeout = self.config().store_timeout;
        let old_status = with_deadline(timeout, "fetch_order", db.fetch_order(order_id)).await?.map(|o| o.status);
        let order = with_deadline(timeout, "update_order_status", db.update_order_status(order_id, label))
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        info!("🔄️ [{order_id}] status is now '{label}'");
        Ok(self.after_status_change(order, old_status).await)
    }

    async fn after_status_change(&self, order: Order, old_status: Option<String>) -> StatusChangeResult {
        let event = OrderStatusChangedEvent::new(order.order_id.clone(), order.status.clone(), old_status);
        self.producers.publish_status_changed(event).await;
        match self.dispatcher.notify_status_change(&order.order_id, &order.status).await {
            Ok(report) => StatusChangeResult { order, notifications: Some(report), notification_error: None },
            Err(e) => StatusChangeResult { order, notifications: None, notification_error: Some(e.to_string()) },
        }
    }

    /// Edits the allow-listed fields of an order. Subscribers are notified only if the status actually changed.
    pub async fn update_fields(
        &self,
        order_id: &OrderId,
        update: OrderUpdate,
    ) -> Result<StatusChangeResult, OrderFlowError> {
        let mut update = update;
        if let Some(status) = update.status.take() {
            update.status = Some(self.config().registry.parse(&status)?.label);
        }
        if let Some(country) = update.country.take() {
            update.country = Some(country.trim().to_uppercase());
        }
        if let Some(client_name) = update.client_name.take() {
            update.client_name = Some(client_name.trim().to_string());
        }
        let db = self.db();
        let timeout = self.config().store_timeout;
        let old = with_deadline(timeout, "fetch_order", db.fetch_order(order_id))
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let order = with_deadline(timeout, "update_order_fields", db.update_order_fields(order_id, update))
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if order.client_name != old.client_name {
            let usernames = extract_usernames(&order.client_name);
            if !usernames.is_empty() {
                with_deadline(timeout, "ensure_participants", db.ensure_participants(order_id, &usernames)).await?;
            }
        }
        if order.status == old.status {
            debug!("🔄️ [{order_id}] edited, status unchanged");
            return Ok(StatusChangeResult { order, notifications: None, notification_error: None });
        }
        Ok(self.after_status_change(order, Some(old.status)).await)
    }

    /// Deletes an order together with its participants and subscriptions. Returns `false` if there was no such order.
    pub async fn delete_order(&self, order_id: &OrderId) -> Result<bool, OrderFlowError> {
        let timeout = self.config().store_timeout;
        let deleted = with_deadline(timeout, "delete_order", self.db().delete_order(order_id)).await?;
        if deleted {
            info!("🔄️ Order [{order_id}] deleted");
            self.producers.publish_order_deleted(OrderDeletedEvent::new(order_id.clone())).await;
        }
        Ok(deleted)
    }

    /// Deletes every order id found in `tokens`, each on its own.
    pub async fn bulk_delete<S: AsRef<str>>(&self, tokens: &[S]) -> BulkReport {
        let order_ids = extract_order_ids(tokens);
        let mut report = BulkReport::new(order_ids.len());
        for order_id in order_ids {
            let outcome = match self.delete_order(&order_id).await {
                Ok(true) => BulkOutcome::Succeeded,
                Ok(false) => BulkOutcome::NotFound,
                Err(e) => BulkOutcome::StoreFailed(e.to_string()),
            };
            report.record(order_id, outcome);
        }
        report
    }

    /// Sets the chosen status on every order id that can be found in `tokens`. Unparseable tokens are ignored and
    /// duplicate ids are only processed once, in the order they first appear.
    pub async fn bulk_update_status<S: AsRef<str>>(
        &self,
        tokens: &[S],
        status: &StatusChoice,
    ) -> Result<BulkReport, OrderFlowError> {
        let status = status.resolve(&self.config().registry)?;
        let order_ids = extract_order_ids(tokens);
        debug!("🔄️ Bulk status {status:?} for {} orders", order_ids.len());
        let operator = BulkStatusOperator::new(&self.dispatcher, &self.producers);
        Ok(operator.apply(&order_ids, &status.label).await)
    }

    /// The staff chat command: a free-text blob of order ids and a status menu index.
    pub async fn bulk_update_status_from_text(
        &self,
        blob: &str,
        status_index: usize,
    ) -> Result<BulkReport, OrderFlowError> {
        let tokens = split_tokens(blob);
        self.bulk_update_status(&tokens, &StatusChoice::Index(status_index)).await
    }

    /// Imports rows as orders, without notifying anyone. Each row succeeds or fails on its own.
    pub async fn import_orders(&self, rows: Vec<ImportRow>) -> ImportReport {
        let mut report = ImportReport::new(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let raw_id = row.order_id.clone();
            match self.import_row(row).await {
                Ok(order_id) => report.record_success(order_id),
                Err(e) => {
                    debug!("🔄️ Import row {} ({raw_id}) rejected. {e}", index + 2);
                    report.record_error(index, &raw_id, e.to_string());
                },
            }
        }
        info!("🔄️ Import finished: {} of {} rows imported", report.succeeded, report.total);
        report
    }

    async fn import_row(&self, row: ImportRow) -> Result<OrderId, OrderFlowError> {
        let config = self.config();
        let order_id = OrderId::from_str(&row.order_id)?;
        let status = config.registry.parse(&row.status)?;
        let country = match row.country.trim() {
            "" => order_id.prefix().map(str::to_uppercase).ok_or_else(|| ValidationError::EmptyField("country"))?,
            country => country.to_uppercase(),
        };
        let mut new_order = NewOrder::new(order_id.clone(), row.client_name.trim(), status.label).with_country(country);
        if let Some(phone) = non_blank(row.phone.as_deref()) {
            new_order = new_order.with_phone(normalize_phone(phone)?);
        }
        if let Some(note) = non_blank(row.note.as_deref()) {
            new_order = new_order.with_note(note);
        }
        let db = self.db();
        let timeout = config.store_timeout;
        let order = with_deadline(timeout, "upsert_order", db.upsert_order(new_order)).await?;
        let usernames = extract_usernames(&order.client_name);
        if !usernames.is_empty() {
            with_deadline(timeout, "ensure_participants", db.ensure_participants(&order_id, &usernames)).await?;
        }
        Ok(order_id)
    }

    pub fn reminders(&self) -> ReminderApi<'_, B, M> {
        ReminderApi::new(&self.dispatcher)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
