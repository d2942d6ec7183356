//! Service facade tests.

mod common;

use common::{available_in_gra, unavailable_everywhere, Harness};
use stockwatch_engine::db::{DbError, User};
use stockwatch_engine::service::ServiceError;
use stockwatch_inventory::{DatacenterSet, InventoryError, CATALOG_PATH};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_subscribe_proceeds_when_not_available() {
    let h = Harness::start().await;
    let service = h.service();
    h.upstream_availability(404, r#"{"message": "not found"}"#).await;

    let user = User::new(1);
    let id = service
        .subscribe(&user, "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();

    let subs = service.list_for_user(1).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].criterion.id, id);
}

#[tokio::test]
async fn test_subscribe_blocked_by_upstream_failure() {
    let h = Harness::start().await;
    let service = h.service();
    h.upstream_availability(502, "bad gateway").await;

    let err = service
        .subscribe(&User::new(1), "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Inventory(InventoryError::Upstream(_))
    ));
    assert!(!err.is_expected());

    assert!(matches!(
        service.list_for_user(1).await,
        Err(ServiceError::Store(DbError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_subscribe_twice_is_expected_conflict() {
    let h = Harness::start().await;
    let service = h.service();
    h.upstream_availability(200, &unavailable_everywhere()).await;

    let user = User::new(1);
    let gra = DatacenterSet::parse("gra");
    service.subscribe(&user, "ovh-eu", "24ska01", &gra).await.unwrap();
    let err = service
        .subscribe(&user, "ovh-eu", "24ska01", &gra)
        .await
        .unwrap_err();

    assert!(err.is_expected());
    assert!(matches!(
        err,
        ServiceError::Store(DbError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn test_subscribe_unknown_region() {
    let h = Harness::start().await;
    let err = h
        .service()
        .subscribe(&User::new(1), "ovh-mars", "24ska01", &DatacenterSet::any())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Inventory(InventoryError::UnknownRegion(_))
    ));
}

#[tokio::test]
async fn test_check_availability() {
    let h = Harness::start().await;
    let service = h.service();

    h.upstream_availability(200, &available_in_gra()).await;
    let available = service
        .check_availability("ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();
    assert_eq!(available, ["gra"]);

    h.upstream_availability(200, &unavailable_everywhere()).await;
    let err = service
        .check_availability("ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap_err();
    assert!(err.is_expected());
}

#[tokio::test]
async fn test_unsubscribe_flows() {
    let h = Harness::start().await;
    let service = h.service();
    h.upstream_availability(200, &unavailable_everywhere()).await;

    let user = User::new(1);
    let a = service
        .subscribe(&user, "ovh-eu", "24ska01", &DatacenterSet::any())
        .await
        .unwrap();
    service
        .subscribe(&user, "ovh-eu", "24sk50", &DatacenterSet::any())
        .await
        .unwrap();

    service.unsubscribe(1, a).await.unwrap();
    assert!(service.unsubscribe(1, a).await.unwrap_err().is_expected());
    assert_eq!(service.unsubscribe_all(1).await.unwrap(), 1);
    assert!(service.unsubscribe_all(1).await.unwrap_err().is_expected());
}

#[tokio::test]
async fn test_list_plans_by_category() {
    let h = Harness::start().await;
    let catalog = serde_json::json!({
        "catalogId": 1,
        "locale": {"currencyCode": "EUR", "subsidiary": "FR"},
        "plans": [
            {
                "planCode": "expensive",
                "invoiceName": "KS-LE",
                "pricings": [{"phase": 1, "price": 4_000_000_000_i64, "mode": "default"}],
                "blobs": {"commercial": {"range": "kimsufi"}}
            },
            {
                "planCode": "cheap",
                "invoiceName": "KS-1",
                "pricings": [{"phase": 1, "price": 500_000_000, "mode": "default"}],
                "blobs": {"commercial": {"range": "kimsufi"}}
            },
            {
                "planCode": "rise-1",
                "invoiceName": "RISE-1",
                "pricings": [{"phase": 1, "price": 100_000_000, "mode": "default"}],
                "blobs": {"commercial": {"range": "rise"}}
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("ovhSubsidiary", "FR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog))
        .mount(&h.server)
        .await;

    let service = h.service();
    let kimsufi = service
        .list_plans("ovh-eu", "fr", Some("kimsufi"))
        .await
        .unwrap();
    let codes: Vec<_> = kimsufi.iter().map(|p| p.plan_code.as_str()).collect();
    assert_eq!(codes, ["cheap", "expensive"]);

    let all = service.list_plans("ovh-eu", "FR", None).await.unwrap();
    let codes: Vec<_> = all.iter().map(|p| p.plan_code.as_str()).collect();
    assert_eq!(codes, ["rise-1", "cheap", "expensive"]);
}

#[tokio::test]
async fn test_list_catalog_rejects_country_outside_region() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "catalogId": 1,
            "locale": {"currencyCode": "USD", "subsidiary": "US"},
            "plans": []
        })))
        .mount(&h.server)
        .await;

    let err = h
        .service()
        .list_plans("ovh-eu", "US", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Inventory(InventoryError::UnsupportedCountry { ref country, .. }) if country == "US"
    ));
    assert!(h.server.received_requests().await.unwrap().is_empty());
}
