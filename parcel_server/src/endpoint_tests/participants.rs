use std::collections::BTreeMap;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use parcel_engine::{
    db_types::{Address, OrderId, Participant},
    traits::{ParticipantPage, StoreError},
    AddressApi,
    ParticipantApi,
    SubscriptionApi,
};
use serde_json::json;

use super::{
    helpers::{engine_config, json, order, send_request, ADMIN_ID},
    mocks::MockTrackerDb,
};
use crate::routes::{
    FetchAddressRoute,
    SaveAddressRoute,
    SearchParticipantsRoute,
    SubscribeRoute,
    TogglePaidRoute,
    UnpaidReportRoute,
    UnsubscribeRoute,
};

// Each API gets its own mock, so expectations are set per store.
fn configure(
    participants: MockTrackerDb,
    subscriptions: MockTrackerDb,
    addresses: MockTrackerDb,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let config = engine_config();
        cfg.app_data(web::Data::new(ParticipantApi::new(participants, config.clone())))
            .app_data(web::Data::new(SubscriptionApi::new(subscriptions, config.clone())))
            .app_data(web::Data::new(AddressApi::new(addresses, config)))
            .service(
                web::scope("/api")
                    .service(UnpaidReportRoute::<MockTrackerDb>::new())
                    .service(SearchParticipantsRoute::<MockTrackerDb>::new())
                    .service(TogglePaidRoute::<MockTrackerDb>::new())
                    .service(SubscribeRoute::<MockTrackerDb>::new())
                    .service(UnsubscribeRoute::<MockTrackerDb>::new())
                    .service(SaveAddressRoute::<MockTrackerDb>::new())
                    .service(FetchAddressRoute::<MockTrackerDb>::new()),
            );
    }
}

fn participant(order_id: &str, username: &str, paid: bool) -> Participant {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let order_id = OrderId::from(order_id);
    Participant { order_id, username: username.to_string(), paid, created_at: ts, updated_at: ts }
}

#[actix_web::test]
async fn search_participants_maps_the_query() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_search_participants()
        .withf(|q| {
            q.order_id == Some(OrderId::from("CN-7")) &&
                q.paid == Some(false) &&
                q.search.as_deref() == Some("ali") &&
                q.limit == 2 &&
                q.offset == 0
        })
        .times(1)
        .returning(|q| Ok(ParticipantPage::new(vec![participant("CN-7", "alice_k", false)], 3, q.offset)));
    let req = TestRequest::get().uri("/api/participants?order_id=cn-7&paid=false&search=ali&limit=2");
    let configure = configure(db, MockTrackerDb::new(), MockTrackerDb::new());
    let (status, body) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::OK);
    let page = json(&body);
    assert_eq!(page["total"], 3);
    assert_eq!(page["has_more"], true);
    assert_eq!(page["items"][0]["username"], "alice_k");
}

#[actix_web::test]
async fn toggle_paid_flips_the_flag() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_toggle_paid()
        .withf(|id, username| id.as_str() == "KR-3" && username == "bob_s")
        .times(1)
        .returning(|id, username| Ok(participant(id.as_str(), username, true)));
    let req = TestRequest::post().uri("/api/orders/kr-3/participants/bob_s/paid");
    let configure = configure(db, MockTrackerDb::new(), MockTrackerDb::new());
    let (status, body) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["paid"], true);
}

#[actix_web::test]
async fn toggle_paid_for_a_stranger() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_toggle_paid().returning(|id, username| {
        Err(StoreError::ParticipantNotFound { order_id: id.clone(), username: username.to_string() })
    });
    let req = TestRequest::post().uri("/api/orders/KR-3/participants/mallory/paid");
    let configure = configure(db, MockTrackerDb::new(), MockTrackerDb::new());
    let (status, body) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "The data was not found. mallory is not a participant of order KR-3");
}

#[actix_web::test]
async fn unpaid_report_is_grouped_by_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_unpaid_by_order().times(1).returning(|| {
        let mut grouped = BTreeMap::new();
        grouped.insert(OrderId::from("KR-2"), vec!["bob_b1".to_string()]);
        grouped.insert(OrderId::from("CN-1"), vec!["alice_k".to_string(), "carol".to_string()]);
        Ok(grouped)
    });
    let configure = configure(db, MockTrackerDb::new(), MockTrackerDb::new());
    let req = TestRequest::get().uri("/api/participants/unpaid");
    let (status, body) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["orders"]["CN-1"], json!(["alice_k", "carol"]));
    assert_eq!(result["summary"], "📋 Unpaid participants (2 orders):\n• CN-1: @alice_k, @carol\n• KR-2: @bob_b1");
}

#[actix_web::test]
async fn subscribe_and_unsubscribe() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_order()
        .withf(|id| id.as_str() == "CN-1001")
        .returning(|_| Ok(Some(order("CN-1001", "@alice_k", "🛒 Purchased"))));
    db.expect_subscribe().withf(|user_id, id| *user_id == 42 && id.as_str() == "CN-1001").returning(|_, _| Ok(true));
    let req = TestRequest::post().uri("/api/subscriptions").set_json(json!({ "user_id": 42, "order_id": "cn 1001" }));
    let configure_subscribe = configure(MockTrackerDb::new(), db, MockTrackerDb::new());
    let (status, body) = send_request(req, Some(ADMIN_ID), configure_subscribe).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "User 42 subscribed to CN-1001");

    let mut db = MockTrackerDb::new();
    db.expect_unsubscribe().times(1).returning(|_, _| Ok(false));
    let req = TestRequest::delete().uri("/api/subscriptions").set_json(json!({ "user_id": 42, "order_id": "CN-1001" }));
    let configure = configure(MockTrackerDb::new(), db, MockTrackerDb::new());
    let (status, _) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn subscribing_to_a_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(None));
    db.expect_subscribe().never();
    let req = TestRequest::post().uri("/api/subscriptions").set_json(json!({ "user_id": 42, "order_id": "KR-404" }));
    let configure = configure(MockTrackerDb::new(), db, MockTrackerDb::new());
    let (status, body) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "The data was not found. The requested order KR-404 does not exist");
}

#[actix_web::test]
async fn addresses_are_validated_before_saving() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_upsert_address().never();
    let req = TestRequest::put().uri("/api/addresses").set_json(json!({
        "user_id": 42,
        "full_name": "Alice Kim",
        "phone": "12345",
        "city": "Almaty",
        "address": "Abay ave 10",
        "postcode": "050000"
    }));
    let configure = configure(MockTrackerDb::new(), MockTrackerDb::new(), db);
    let (status, _) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn saved_address_is_normalised() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_upsert_address()
        .withf(|a| a.phone == "87011234567" && a.username.as_deref() == Some("alice_k"))
        .returning(|a| {
            let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
            Ok(Address {
                user_id: a.user_id,
                username: a.username,
                full_name: a.full_name,
                phone: a.phone,
                city: a.city,
                address: a.address,
                postcode: a.postcode,
                created_at: ts,
                updated_at: ts,
            })
        });
    let req = TestRequest::put().uri("/api/addresses").set_json(json!({
        "user_id": 42,
        "username": "@Alice_K",
        "full_name": "Alice Kim",
        "phone": "+7 701 123-45-67",
        "city": "Almaty",
        "address": "Abay ave 10",
        "postcode": "050000"
    }));
    let configure = configure(MockTrackerDb::new(), MockTrackerDb::new(), db);
    let (status, body) = send_request(req, Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["phone"], "87011234567");
}

#[actix_web::test]
async fn missing_address() {
    let _ = env_logger::try_init().ok();
    let mut db = MockTrackerDb::new();
    db.expect_fetch_address().withf(|user_id| *user_id == 7).returning(|_| Ok(None));
    let configure = configure(MockTrackerDb::new(), MockTrackerDb::new(), db);
    let (status, body) = send_request(TestRequest::get().uri("/api/addresses/7"), Some(ADMIN_ID), configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "The data was not found. Address of 7");
}
