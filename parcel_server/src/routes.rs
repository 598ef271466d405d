//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into the engine. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every storage and messaging call in the engine is async, and each
//! one is bounded by the configured timeouts, so a stalled database or Bot API cannot hang a worker.
//!
//! Routes registered with `where requires admin` are wrapped in the [`AdminMiddlewareFactory`] and only answer callers
//! whose `parcel_admin_id` header is on the admin allowlist.
//!
//! [`AdminMiddlewareFactory`]: crate::middleware::AdminMiddlewareFactory
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use parcel_engine::{
    db_types::{NewAddress, OrderId},
    order_objects::NewOrderRequest,
    traits::{AddressManagement, OrderManagement, OrderUpdate, ParticipantQuery},
    tracker_api::participant_api::render_unpaid_report,
    AddressApi,
    EngineConfig,
    ImportRow,
    MessagingChannel,
    OrderApi,
    OrderFlowApi,
    ParticipantApi,
    SubscriptionApi,
    TrackerDatabase,
};

use crate::{
    data_objects::{
        BulkOrdersRequest,
        BulkStatusRequest,
        JsonResponse,
        NoteSearchParams,
        ParticipantSearchParams,
        ParticipantsRequest,
        RecentOrdersParams,
        ReminderRequest,
        StatusFilterParams,
        StatusListEntry,
        StatusUpdateRequest,
        SubscriptionRequest,
        SummarizedReport,
        UnpaidReport,
    },
    errors::ServerError,
};

const DEFAULT_RECENT_ORDERS: u32 = 10;
const MAX_RECENT_ORDERS: u32 = 100;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires admin) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AdminMiddlewareFactory::new());
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires admin) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AdminMiddlewareFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn order_id_from_path(raw: &str) -> Result<OrderId, ServerError> {
    let order_id = OrderId::normalize(raw);
    if order_id.as_str().is_empty() {
        return Err(ServerError::InvalidRequestPath("The order id is empty".into()));
    }
    Ok(order_id)
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Client status  ----------------------------------------------------
route!(client_status => Get "/status/{order_id}" impl OrderManagement);
/// The client-facing "where is my order" query. Anyone may ask.
///
/// The order id is normalised leniently, so `cn 1001`, `#CN-1001` and `cn-1001` are the same order. An unknown order is
/// not an error: the response has `found: false` and the "not found" text.
pub async fn client_status<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let raw = path.into_inner();
    debug!("💻️ GET status for '{raw}'");
    let status = api.client_status(&raw).await?;
    Ok(HttpResponse::Ok().json(status))
}

//----------------------------------------------   Statuses  ----------------------------------------------------
route!(statuses => Get "/statuses" requires admin);
/// The status menu: every status in the registry with its index.
pub async fn statuses(config: web::Data<EngineConfig>) -> Result<HttpResponse, ServerError> {
    let entries = config
        .registry
        .labels()
        .iter()
        .enumerate()
        .map(|(index, label)| StatusListEntry { index, label: label.clone() })
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(entries))
}

//----------------------------------------------   Order queries  ----------------------------------------------------
route!(recent_orders => Get "/orders/recent" impl OrderManagement where requires admin);
pub async fn recent_orders<B: OrderManagement>(
    params: web::Query<RecentOrdersParams>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_ORDERS).clamp(1, MAX_RECENT_ORDERS);
    debug!("💻️ GET {limit} recent orders");
    let orders = api.recent_orders(limit).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(orders_by_status => Get "/orders/by_status" impl OrderManagement where requires admin);
/// Orders whose status is exactly one of the `|`-separated statuses in the `status` query parameter.
pub async fn orders_by_status<B: OrderManagement>(
    params: web::Query<StatusFilterParams>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let statuses = params.statuses();
    if statuses.is_empty() {
        return Err(ServerError::InvalidRequestBody("At least one status is required".into()));
    }
    debug!("💻️ GET orders with status in {statuses:?}");
    let orders = api.orders_by_status(&statuses).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(search_orders => Get "/orders/search" impl OrderManagement where requires admin);
pub async fn search_orders<B: OrderManagement>(
    params: web::Query<NoteSearchParams>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders with a note containing '{}'", params.q);
    let orders = api.search_by_note(&params.q).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_view => Get "/orders/{order_id}" impl TrackerDatabase where requires admin);
/// The order, its interpreted status and its participants.
pub async fn order_view<B: TrackerDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    debug!("💻️ GET order [{order_id}]");
    let view = api.order_view(&order_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    Ok(HttpResponse::Ok().json(view))
}

//----------------------------------------------   Order changes  ----------------------------------------------------
route!(create_order => Post "/orders" impl TrackerDatabase, MessagingChannel where requires admin);
/// Creates (or overwrites) an order. The `@username`s in the client name become participants and, unless
/// `notify_participants` is false, are subscribed and sent a "new order" notice.
pub async fn create_order<B: TrackerDatabase, M: MessagingChannel>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST new order '{}'", request.order_id);
    let result = api.create_order(request).await?;
    Ok(HttpResponse::Created().json(result))
}

route!(update_order => Patch "/orders/{order_id}" impl TrackerDatabase, MessagingChannel where requires admin);
/// Edits the client name, country, note or status. Subscribers are only notified when the status actually changes.
pub async fn update_order<B: TrackerDatabase, M: MessagingChannel>(
    path: web::Path<String>,
    body: web::Json<OrderUpdate>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    debug!("💻️ PATCH order [{order_id}]");
    let result = api.update_fields(&order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(update_status => Post "/orders/{order_id}/status" impl TrackerDatabase, MessagingChannel where requires admin);
pub async fn update_status<B: TrackerDatabase, M: MessagingChannel>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    let StatusUpdateRequest { status, force } = body.into_inner();
    debug!("💻️ POST status {status} for [{order_id}] (force: {force})");
    let result = if force {
        api.force_status(&order_id, &status).await?
    } else {
        api.update_status(&order_id, &status).await?
    };
    Ok(HttpResponse::Ok().json(result))
}

route!(delete_order => Delete "/orders/{order_id}" impl TrackerDatabase, MessagingChannel where requires admin);
pub async fn delete_order<B: TrackerDatabase, M: MessagingChannel>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    debug!("💻️ DELETE order [{order_id}]");
    if api.delete_order(&order_id).await? {
        Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {order_id} deleted"))))
    } else {
        Err(ServerError::NoRecordFound(format!("Order {order_id}")))
    }
}

route!(bulk_status => Post "/orders/bulk/status" impl TrackerDatabase, MessagingChannel where requires admin);
/// Sets one status on many orders. Ids that do not parse are dropped; every other id gets its own outcome in the
/// report, so this always answers 200 once the status itself is valid.
pub async fn bulk_status<B: TrackerDatabase, M: MessagingChannel>(
    body: web::Json<BulkStatusRequest>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    let tokens = request.orders.tokens();
    debug!("💻️ POST bulk status {} for {} tokens", request.status, tokens.len());
    let report = api.bulk_update_status(&tokens, &request.status).await?;
    let summary = report.to_admin_text("📦 Bulk status update");
    Ok(HttpResponse::Ok().json(SummarizedReport::new(report, summary)))
}

route!(bulk_delete => Post "/orders/bulk/delete" impl TrackerDatabase, MessagingChannel where requires admin);
pub async fn bulk_delete<B: TrackerDatabase, M: MessagingChannel>(
    body: web::Json<BulkOrdersRequest>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let tokens = body.into_inner().tokens();
    debug!("💻️ POST bulk delete for {} tokens", tokens.len());
    let report = api.bulk_delete(&tokens).await;
    let summary = report.to_admin_text("🗑️ Bulk delete");
    Ok(HttpResponse::Ok().json(SummarizedReport::new(report, summary)))
}

route!(import_orders => Post "/orders/import" impl TrackerDatabase, MessagingChannel where requires admin);
/// Imports a JSON array of rows. Bad rows are reported by spreadsheet row number and do not stop the import.
pub async fn import_orders<B: TrackerDatabase, M: MessagingChannel>(
    body: web::Json<Vec<ImportRow>>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let rows = body.into_inner();
    debug!("💻️ POST import of {} rows", rows.len());
    let report = api.import_orders(rows).await;
    let summary = report.to_admin_text();
    Ok(HttpResponse::Ok().json(SummarizedReport::new(report, summary)))
}

//----------------------------------------------   Participants  ----------------------------------------------------
route!(list_participants => Get "/orders/{order_id}/participants" impl TrackerDatabase where requires admin);
pub async fn list_participants<B: TrackerDatabase>(
    path: web::Path<String>,
    api: web::Data<ParticipantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    let participants = api.list(&order_id).await?;
    Ok(HttpResponse::Ok().json(participants))
}

route!(add_participants => Post "/orders/{order_id}/participants" impl TrackerDatabase where requires admin);
pub async fn add_participants<B: TrackerDatabase>(
    path: web::Path<String>,
    body: web::Json<ParticipantsRequest>,
    api: web::Data<ParticipantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    let added = api.ensure(&order_id, &body.usernames).await?;
    debug!("💻️ {added} participants added to [{order_id}]");
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{added} participants added to {order_id}"))))
}

route!(toggle_paid => Post "/orders/{order_id}/participants/{username}/paid" impl TrackerDatabase where requires admin);
pub async fn toggle_paid<B: TrackerDatabase>(
    path: web::Path<(String, String)>,
    api: web::Data<ParticipantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (raw_id, username) = path.into_inner();
    let order_id = order_id_from_path(&raw_id)?;
    let participant = api.toggle_paid(&order_id, &username).await?;
    let state = if participant.paid { "paid" } else { "unpaid" };
    info!("💻️ @{} on [{order_id}] is now {state}", participant.username);
    Ok(HttpResponse::Ok().json(participant))
}

route!(unpaid_for_order => Get "/orders/{order_id}/unpaid" impl TrackerDatabase where requires admin);
pub async fn unpaid_for_order<B: TrackerDatabase>(
    path: web::Path<String>,
    api: web::Data<ParticipantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    let usernames = api.unpaid_usernames(&order_id).await?;
    Ok(HttpResponse::Ok().json(usernames))
}

route!(search_participants => Get "/participants" impl TrackerDatabase where requires admin);
/// A filtered page of participants. Filters: `order_id`, `paid`, `search` (part of a username), `limit`, `offset`.
pub async fn search_participants<B: TrackerDatabase>(
    params: web::Query<ParticipantSearchParams>,
    api: web::Data<ParticipantApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = ParticipantQuery::from(params.into_inner());
    debug!("💻️ GET {query}");
    let page = api.search(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(unpaid_report => Get "/participants/unpaid" impl TrackerDatabase where requires admin);
/// Every unpaid participant, grouped by order, with the same text report the staff chat shows.
pub async fn unpaid_report<B: TrackerDatabase>(api: web::Data<ParticipantApi<B>>) -> Result<HttpResponse, ServerError> {
    let orders = api.unpaid_by_order().await?;
    let summary = render_unpaid_report(&orders);
    Ok(HttpResponse::Ok().json(UnpaidReport { orders, summary }))
}

route!(participant_orders => Get "/participants/{username}/orders" impl OrderManagement where requires admin);
pub async fn participant_orders<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let username = path.into_inner();
    let orders = api.orders_for_participant(&username).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Reminders  ----------------------------------------------------
route!(remind_unpaid => Post "/orders/{order_id}/remind" impl TrackerDatabase, MessagingChannel where requires admin);
/// Sends a payment reminder to every unpaid participant of the order.
pub async fn remind_unpaid<B: TrackerDatabase, M: MessagingChannel>(
    path: web::Path<String>,
    body: Option<web::Json<ReminderRequest>>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    debug!("💻️ POST payment reminders for [{order_id}]");
    let report = api.reminders().remind_unpaid(&order_id, request.message.as_deref()).await?;
    let summary = report.to_admin_text();
    Ok(HttpResponse::Ok().json(SummarizedReport::new(report, summary)))
}

route!(broadcast_reminders => Post "/reminders/broadcast" impl TrackerDatabase, MessagingChannel where requires admin);
/// Sends payment reminders for every order that has unpaid participants.
pub async fn broadcast_reminders<B: TrackerDatabase, M: MessagingChannel>(
    body: Option<web::Json<ReminderRequest>>,
    api: web::Data<OrderFlowApi<B, M>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    debug!("💻️ POST payment reminder broadcast");
    let report = api.reminders().broadcast_unpaid(request.message.as_deref()).await?;
    let summary = report.to_admin_text();
    Ok(HttpResponse::Ok().json(SummarizedReport::new(report, summary)))
}

//----------------------------------------------   Subscriptions  ----------------------------------------------------
route!(subscribe => Post "/subscriptions" impl TrackerDatabase where requires admin);
pub async fn subscribe<B: TrackerDatabase>(
    body: web::Json<SubscriptionRequest>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = body.order_id();
    let created = api.subscribe(body.user_id, &order_id).await?;
    let message = if created {
        format!("User {} subscribed to {order_id}", body.user_id)
    } else {
        format!("User {} was already subscribed to {order_id}", body.user_id)
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

route!(unsubscribe => Delete "/subscriptions" impl TrackerDatabase where requires admin);
pub async fn unsubscribe<B: TrackerDatabase>(
    body: web::Json<SubscriptionRequest>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = body.order_id();
    if api.unsubscribe(body.user_id, &order_id).await? {
        let message = format!("User {} unsubscribed from {order_id}", body.user_id);
        Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
    } else {
        Err(ServerError::NoRecordFound(format!("Subscription of {} to {order_id}", body.user_id)))
    }
}

route!(reset_watermark => Post "/subscriptions/reset" impl TrackerDatabase where requires admin);
/// Forgets which status the subscriber was last sent, so that the next change reaches them even with dedup on.
pub async fn reset_watermark<B: TrackerDatabase>(
    body: web::Json<SubscriptionRequest>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = body.order_id();
    if api.reset_watermark(body.user_id, &order_id).await? {
        let message = format!("Watermark reset for {} on {order_id}", body.user_id);
        Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
    } else {
        Err(ServerError::NoRecordFound(format!("Subscription of {} to {order_id}", body.user_id)))
    }
}

route!(user_subscriptions => Get "/subscriptions/user/{user_id}" impl TrackerDatabase where requires admin);
pub async fn user_subscriptions<B: TrackerDatabase>(
    path: web::Path<i64>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let subscriptions = api.for_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(subscriptions))
}

route!(order_subscriptions => Get "/orders/{order_id}/subscriptions" impl TrackerDatabase where requires admin);
pub async fn order_subscriptions<B: TrackerDatabase>(
    path: web::Path<String>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = order_id_from_path(&path.into_inner())?;
    let subscriptions = api.for_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(subscriptions))
}

//----------------------------------------------   Addresses  ----------------------------------------------------
route!(save_address => Put "/addresses" impl AddressManagement where requires admin);
/// Creates or replaces a client's delivery address. The phone number and postcode are validated first.
pub async fn save_address<B: AddressManagement>(
    body: web::Json<NewAddress>,
    api: web::Data<AddressApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let address = api.save(body.into_inner()).await?;
    debug!("💻️ Address saved for user {}", address.user_id);
    Ok(HttpResponse::Ok().json(address))
}

route!(fetch_address => Get "/addresses/{user_id}" impl AddressManagement where requires admin);
pub async fn fetch_address<B: AddressManagement>(
    path: web::Path<i64>,
    api: web::Data<AddressApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    let address = api.fetch(user_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Address of {user_id}")))?;
    Ok(HttpResponse::Ok().json(address))
}

route!(delete_address => Delete "/addresses/{user_id}" impl AddressManagement where requires admin);
pub async fn delete_address<B: AddressManagement>(
    path: web::Path<i64>,
    api: web::Data<AddressApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    if api.delete(user_id).await? {
        Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Address of {user_id} deleted"))))
    } else {
        Err(ServerError::NoRecordFound(format!("Address of {user_id}")))
    }
}
