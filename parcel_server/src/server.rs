use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use parcel_engine::{
    events::{EventHandlers, EventProducers},
    AddressApi,
    EngineConfig,
    MemoryDatabase,
    OrderApi,
    OrderFlowApi,
    ParticipantApi,
    SqliteDatabase,
    SubscriptionApi,
    TrackerDatabase,
};
use telegram_tools::TelegramApi;

use crate::{
    config::{ServerConfig, StorageBackend},
    errors::ServerError,
    integrations::{event_log::logging_hooks, LogOnlyChannel, ServerChannel, TelegramChannel},
    routes::{
        health,
        AddParticipantsRoute,
        BroadcastRemindersRoute,
        BulkDeleteRoute,
        BulkStatusRoute,
        ClientStatusRoute,
        CreateOrderRoute,
        DeleteAddressRoute,
        DeleteOrderRoute,
        FetchAddressRoute,
        ImportOrdersRoute,
        ListParticipantsRoute,
        OrderSubscriptionsRoute,
        OrderViewRoute,
        OrdersByStatusRoute,
        ParticipantOrdersRoute,
        RecentOrdersRoute,
        RemindUnpaidRoute,
        ResetWatermarkRoute,
        SaveAddressRoute,
        SearchOrdersRoute,
        SearchParticipantsRoute,
        StatusesRoute,
        SubscribeRoute,
        TogglePaidRoute,
        UnpaidForOrderRoute,
        UnpaidReportRoute,
        UnsubscribeRoute,
        UpdateOrderRoute,
        UpdateStatusRoute,
        UserSubscriptionsRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let engine_config = Arc::new(config.engine_config()?);
    let status_count = engine_config.registry.len();
    info!("💻️ {status_count} statuses loaded. Allowed order prefixes: {:?}", config.allowed_prefixes);
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let channel = create_channel(&config).await?;
    let srv = match config.storage {
        StorageBackend::Sqlite => {
            let db = SqliteDatabase::new_with_options(&config.database_url, &config.db_options)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
            create_server_instance(config, engine_config, db, channel, producers)?
        },
        StorageBackend::Memory => {
            warn!("💻️ Using in-memory storage. Nothing will survive a restart.");
            create_server_instance(config, engine_config, MemoryDatabase::new(), channel, producers)?
        },
    };
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

async fn create_channel(config: &ServerConfig) -> Result<ServerChannel, ServerError> {
    if config.dry_run {
        warn!("📨️ Dry run mode. Notifications will be logged, not sent.");
        return Ok(ServerChannel::LogOnly(LogOnlyChannel));
    }
    let api = TelegramApi::new(config.telegram.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    api.get_me().await.map_err(|e| ServerError::InitializeError(format!("The bot token was rejected. {e}")))?;
    Ok(ServerChannel::Telegram(TelegramChannel::new(api)))
}

pub fn create_server_instance<B>(
    config: ServerConfig,
    engine_config: Arc<EngineConfig>,
    db: B,
    channel: ServerChannel,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: TrackerDatabase + Clone + Send + 'static,
{
    let admins = web::Data::new(config.admin_ids.clone());
    let srv = HttpServer::new(move || {
        let orders_api = OrderApi::new(db.clone(), engine_config.clone());
        let participants_api = ParticipantApi::new(db.clone(), engine_config.clone());
        let subscriptions_api = SubscriptionApi::new(db.clone(), engine_config.clone());
        let addresses_api = AddressApi::new(db.clone(), engine_config.clone());
        let flow_api = OrderFlowApi::new(db.clone(), channel.clone(), engine_config.clone(), producers.clone());
        let api_scope = web::scope("/api")
            .service(StatusesRoute::new())
            .service(RecentOrdersRoute::<B>::new())
            .service(OrdersByStatusRoute::<B>::new())
            .service(SearchOrdersRoute::<B>::new())
            .service(ImportOrdersRoute::<B, ServerChannel>::new())
            .service(BulkStatusRoute::<B, ServerChannel>::new())
            .service(BulkDeleteRoute::<B, ServerChannel>::new())
            .service(CreateOrderRoute::<B, ServerChannel>::new())
            .service(OrderViewRoute::<B>::new())
            .service(UpdateOrderRoute::<B, ServerChannel>::new())
            .service(DeleteOrderRoute::<B, ServerChannel>::new())
            .service(UpdateStatusRoute::<B, ServerChannel>::new())
            .service(ListParticipantsRoute::<B>::new())
            .service(AddParticipantsRoute::<B>::new())
            .service(TogglePaidRoute::<B>::new())
            .service(UnpaidForOrderRoute::<B>::new())
            .service(RemindUnpaidRoute::<B, ServerChannel>::new())
            .service(OrderSubscriptionsRoute::<B>::new())
            .service(UnpaidReportRoute::<B>::new())
            .service(SearchParticipantsRoute::<B>::new())
            .service(ParticipantOrdersRoute::<B>::new())
            .service(BroadcastRemindersRoute::<B, ServerChannel>::new())
            .service(SubscribeRoute::<B>::new())
            .service(UnsubscribeRoute::<B>::new())
            .service(ResetWatermarkRoute::<B>::new())
            .service(UserSubscriptionsRoute::<B>::new())
            .service(SaveAddressRoute::<B>::new())
            .service(FetchAddressRoute::<B>::new())
            .service(DeleteAddressRoute::<B>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("parcel::access_log"))
            .app_data(json_config())
            .app_data(web::Data::from(engine_config.clone()))
            .app_data(admins.clone())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(participants_api))
            .app_data(web::Data::new(subscriptions_api))
            .app_data(web::Data::new(addresses_api))
            .app_data(web::Data::new(flow_api))
            .service(health)
            .service(ClientStatusRoute::<B>::new())
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Parcel server listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Malformed JSON bodies are answered in the same `{"error": ...}` shape as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}
