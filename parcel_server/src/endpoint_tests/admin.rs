use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use parcel_engine::OrderApi;

use super::{
    helpers::{engine_config, json, order, send_request, ADMIN_ID, STRANGER_ID},
    mocks::MockTrackerDb,
};
use crate::routes::{health, RecentOrdersRoute, StatusesRoute};

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockTrackerDb::new();
    db.expect_fetch_recent_orders().returning(|limit| {
        Ok((1..=limit.min(2)).map(|i| order(&format!("CN-{i}"), "@alice_k", "🛒 Purchased")).collect())
    });
    let config = engine_config();
    cfg.app_data(web::Data::from(config.clone()))
        .app_data(web::Data::new(OrderApi::new(db, config)))
        .service(health)
        .service(web::scope("/api").service(StatusesRoute::new()).service(RecentOrdersRoute::<MockTrackerDb>::new()));
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/health"), None, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn admin_routes_need_the_header() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/api/orders/recent"), None, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. The parcel_admin_id header is missing.");
}

#[actix_web::test]
async fn strangers_are_turned_away() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/api/statuses"), Some(STRANGER_ID), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "Authentication Error. User 666 is not an administrator.");
}

#[actix_web::test]
async fn garbage_admin_ids_are_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/statuses").insert_header(("parcel_admin_id", "root"));
    let (status, _) = send_request(req, None, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admins_get_through() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/api/statuses"), Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::OK);
    let statuses = json(&body);
    assert_eq!(statuses.as_array().unwrap().len(), 11);
    assert_eq!(statuses[3]["index"], 3);
    assert_eq!(statuses[3]["label"], "📬 Arrived at the warehouse (Korea)");

    let uri = "/api/orders/recent?limit=5";
    let (status, body) = send_request(TestRequest::get().uri(uri), Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body);
    assert_eq!(orders.as_array().unwrap().len(), 2);
    assert_eq!(orders[1]["order_id"], "CN-2");
}
