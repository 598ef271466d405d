use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use parcel_engine::{
    db_types::{OrderId, Subscription},
    events::EventProducers,
    traits::{DeliveryError, DeliveryErrorKind},
    OrderApi,
    OrderFlowApi,
};
use serde_json::json;

use super::{
    helpers::{engine_config, json, order, send_request, ADMIN_ID},
    mocks::{MockChannel, MockTrackerDb},
};
use crate::routes::{
    BulkStatusRoute,
    ClientStatusRoute,
    CreateOrderRoute,
    DeleteOrderRoute,
    OrderViewRoute,
    UpdateStatusRoute,
};

const WAREHOUSE_KR: &str = "📬 Arrived at the warehouse (Korea)";

fn configure_with(db: MockTrackerDb, channel: MockChannel) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let config = engine_config();
        let flow_api = OrderFlowApi::new(db, channel, config.clone(), EventProducers::default());
        cfg.app_data(web::Data::new(flow_api)).service(
            web::scope("/api")
                .service(BulkStatusRoute::<MockTrackerDb, MockChannel>::new())
                .service(CreateOrderRoute::<MockTrackerDb, MockChannel>::new())
                .service(DeleteOrderRoute::<MockTrackerDb, MockChannel>::new())
                .service(UpdateStatusRoute::<MockTrackerDb, MockChannel>::new()),
        );
    }
}

fn configure_reads(db: MockTrackerDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderApi::new(db, engine_config())))
            .service(ClientStatusRoute::<MockTrackerDb>::new())
            .service(web::scope("/api").service(OrderViewRoute::<MockTrackerDb>::new()));
    }
}

fn subscription(user_id: i64, order_id: &str) -> Subscription {
    let ts = Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap();
    Subscription {
        user_id,
        order_id: OrderId::from(order_id),
        last_sent_status: None,
        created_at: ts,
        updated_at: ts,
    }
}

#[actix_web::test]
async fn client_status_for_known_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_order()
        .withf(|id| id.as_str() == "CN-1001")
        .returning(|_| Ok(Some(order("CN-1001", "@alice_k", WAREHOUSE_KR))));
    let (status, body) = send_request(TestRequest::get().uri("/status/cn-1001"), None, configure_reads(db)).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["order_id"], "CN-1001");
    assert_eq!(result["found"], true);
    assert_eq!(result["text"], format!("📦 Order *CN-1001*\nStatus: *{WAREHOUSE_KR}*\nCountry/origin: Seoul"));
}

#[actix_web::test]
async fn client_status_for_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    let (status, body) = send_request(TestRequest::get().uri("/status/KR-404"), None, configure_reads(db)).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["found"], false);
    assert_eq!(result["text"], "🙈 No such order was found. Check the number or try again later.");
}

#[actix_web::test]
async fn order_view_not_found() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    db.expect_fetch_participants().never();
    let req = TestRequest::get().uri("/api/orders/cn-77");
    let (status, body) = send_request(req, Some(ADMIN_ID), configure_reads(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "The data was not found. Order CN-77");
}

#[actix_web::test]
async fn create_order_rejects_foreign_prefix() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_upsert_order().never();
    let req = TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({ "order_id": "JP-12", "client_name": "@alice_k" }));
    let (status, body) = send_request(req, Some(ADMIN_ID), configure_with(db, MockChannel::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("JP"));
}

#[actix_web::test]
async fn create_order_without_participants() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_upsert_order()
        .withf(|o| o.order_id.as_str() == "KR-12" && o.country.as_deref() == Some("KR") && o.status == "🛒 Purchased")
        .times(1)
        .returning(|o| Ok(order(o.order_id.as_str(), &o.client_name, &o.status)));
    db.expect_ensure_participants().never();
    let mut channel = MockChannel::new();
    channel.expect_send().never();
    let req = TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({ "order_id": "kr 12", "client_name": "Walk-in customer" }));
    let (status, body) = send_request(req, Some(ADMIN_ID), configure_with(db, channel)).await;
    assert_eq!(status, StatusCode::CREATED);
    let result = json(&body);
    assert_eq!(result["order"]["order_id"], "KR-12");
    assert_eq!(result["participants_added"], 0);
}

#[actix_web::test]
async fn malformed_body_is_a_json_error() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/api/orders")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"order_id\": ");
    let configure = configure_with(MockTrackerDb::new(), MockChannel::new());
    let (status, body) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn status_index_out_of_range() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_update_order_status().never();
    let req = TestRequest::post().uri("/api/orders/CN-1/status").set_json(json!({ "status": { "index": 11 } }));
    let (status, _) = send_request(req, Some(ADMIN_ID), configure_with(db, MockChannel::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn status_change_notifies_subscribers() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order("CN-1001", "@alice_k @bob_s", "🛒 Purchased"))));
    db.expect_update_order_status()
        .withf(|id, status| id.as_str() == "CN-1001" && status == WAREHOUSE_KR)
        .times(1)
        .returning(|id, status| Ok(Some(order(id.as_str(), "@alice_k @bob_s", status))));
    db.expect_fetch_subscriptions_for_order()
        .returning(|id| Ok(vec![subscription(42, id.as_str()), subscription(43, id.as_str())]));
    db.expect_set_last_sent_status()
        .withf(|user_id, _, status| *user_id == 42 && status == WAREHOUSE_KR)
        .times(1)
        .returning(|_, _, _| Ok(true));
    let mut channel = MockChannel::new();
    channel
        .expect_send()
        .withf(|recipient, text| *recipient == 42 && text.contains("*CN-1001*") && text.contains(WAREHOUSE_KR))
        .times(1)
        .returning(|_, _| Ok(()));
    channel
        .expect_send()
        .withf(|recipient, _| *recipient == 43)
        .times(1)
        .returning(|_, _| Err(DeliveryError::new(DeliveryErrorKind::RecipientBlocked, "Forbidden: bot was blocked")));

    let req = TestRequest::post().uri("/api/orders/cn-1001/status").set_json(json!({ "status": { "index": 3 } }));
    let (status, body) = send_request(req, Some(ADMIN_ID), configure_with(db, channel)).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["order"]["status"], WAREHOUSE_KR);
    let report = &result["notifications"];
    assert_eq!(report["attempted"], 2);
    assert_eq!(report["sent"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["failures"][0]["user_id"], 43);
    assert_eq!(report["failures"][0]["kind"], "recipient_blocked");
}

#[actix_web::test]
async fn forced_status_clears_watermarks_first() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order("KR-5", "@dana_d", WAREHOUSE_KR))));
    db.expect_reset_last_sent_for_order().times(1).returning(|_| Ok(3));
    db.expect_update_order_status().times(1).returning(|id, status| Ok(Some(order(id.as_str(), "@dana_d", status))));
    db.expect_fetch_subscriptions_for_order().returning(|_| Ok(vec![]));
    let req = TestRequest::post()
        .uri("/api/orders/KR-5/status")
        .set_json(json!({ "status": { "label": WAREHOUSE_KR }, "force": true }));
    let (status, body) = send_request(req, Some(ADMIN_ID), configure_with(db, MockChannel::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["notifications"]["attempted"], 0);
}

#[actix_web::test]
async fn delete_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_delete_order().withf(|id| id.as_str() == "CN-9").times(1).returning(|_| Ok(false));
    let req = TestRequest::delete().uri("/api/orders/cn-9");
    let (status, _) = send_request(req, Some(ADMIN_ID), configure_with(db, MockChannel::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn bulk_status_reports_each_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_bulk_update_status().returning(|_, _| Ok(1));
    db.expect_fetch_order().returning(|id| match id.as_str() {
        "CN-1" => Ok(Some(order("CN-1", "", "🛒 Purchased"))),
        _ => Ok(None),
    });
    db.expect_update_order_status().returning(|id, status| match id.as_str() {
        "CN-1" => Ok(Some(order("CN-1", "", status))),
        _ => Ok(None),
    });
    db.expect_fetch_subscriptions_for_order().returning(|_| Ok(vec![]));
    let req = TestRequest::post()
        .uri("/api/orders/bulk/status")
        .set_json(json!({ "text": "cn-1, garbage CN-1\nkr-9", "status": { "index": 6 } }));
    let (status, body) = send_request(req, Some(ADMIN_ID), configure_with(db, MockChannel::new())).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["report"]["total"], 2);
    assert_eq!(result["report"]["succeeded"], 1);
    assert_eq!(result["report"]["failed_ids"], json!(["KR-9"]));
    assert!(result["summary"].as_str().unwrap().contains("Failed ids: KR-9"));
}
