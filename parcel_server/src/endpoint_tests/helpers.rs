use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use parcel_engine::{
    db_types::{Order, OrderId},
    EngineConfig,
};

use crate::{config::AdminAllowlist, middleware::ADMIN_ID_HEADER, server::json_config};

pub const ADMIN_ID: i64 = 1001;
pub const STRANGER_ID: i64 = 666;

pub fn engine_config() -> Arc<EngineConfig> {
    Arc::new(EngineConfig::default())
}

/// Sends `req` to an app set up by `configure`, as the given caller. Returns the status and the body text.
pub async fn send_request<F>(req: TestRequest, caller: Option<i64>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = match caller {
        Some(id) => req.insert_header((ADMIN_ID_HEADER, id.to_string())),
        None => req,
    };
    let app = App::new()
        .app_data(json_config())
        .app_data(web::Data::new(AdminAllowlist::new(vec![ADMIN_ID])))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    (status, body)
}

pub fn order(order_id: &str, client_name: &str, status: &str) -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    Order {
        id: 1,
        order_id: OrderId::from(order_id),
        client_name: client_name.to_string(),
        phone: None,
        origin: Some("Seoul".to_string()),
        status: status.to_string(),
        note: None,
        country: order_id.split('-').next().map(String::from),
        created_at: ts,
        updated_at: ts,
    }
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
