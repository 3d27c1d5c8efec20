//! Charge initiation and re-read against a mock provider.

mod common;

use checkout_gateway::{CheckoutClient, Config, CustomerInfo};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> CheckoutClient {
    CheckoutClient::new(Config {
        base_url: server.uri(),
        api_key: "pk-test-123".to_string(),
        success_redirect_url: "https://backoffice/payments".to_string(),
        error_redirect_url: "https://backoffice/payments".to_string(),
        ..Config::default()
    })
}

#[tokio::test]
async fn initiate_payment_creates_charge_and_persists_refs() {
    let (store, settlement) = common::seeded_store().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pay/v1/charges"))
        .and(header("X-API-Key", "pk-test-123"))
        .and(body_partial_json(json!({
            "amount": 102000,
            "currency": "XOF",
            "country": "SN",
            "paymentReference": format!("BWPAY_{}", settlement.id),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ch-00042",
            "opToken": "op-secret-1",
            "link": "https://checkout.example/pay/ch-00042",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server)
        .initiate_payment(
            &store,
            settlement.id,
            &CustomerInfo {
                name: "Awa Diop".to_string(),
                phone: "771234567".to_string(),
                email: "awa@example.sn".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(url, "https://checkout.example/pay/ch-00042");

    let updated = store.get(settlement.id).await.unwrap();
    assert_eq!(updated.transaction_reference, "ch-00042");
    assert_eq!(updated.op_token, "op-secret-1");
    assert!(updated.is_pending());
}

#[tokio::test]
async fn nested_checkout_link_object_shape_is_accepted() {
    let (store, settlement) = common::seeded_store().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pay/v1/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chargeId": "ch-00043",
            "checkoutLinkObject": {
                "link": "https://checkout.example/pay/ch-00043",
                "opToken": "op-secret-2",
            },
        })))
        .mount(&server)
        .await;

    let url = client(&server)
        .initiate_payment(&store, settlement.id, &CustomerInfo::default())
        .await
        .unwrap();
    assert_eq!(url, "https://checkout.example/pay/ch-00043");

    let updated = store.get(settlement.id).await.unwrap();
    assert_eq!(updated.transaction_reference, "ch-00043");
    assert_eq!(updated.op_token, "op-secret-2");
}

#[tokio::test]
async fn provider_refusal_is_a_soft_failure() {
    let (store, settlement) = common::seeded_store().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pay/v1/charges"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
        .mount(&server)
        .await;

    let url = client(&server)
        .initiate_payment(&store, settlement.id, &CustomerInfo::default())
        .await;
    assert!(url.is_none());
    // nothing persisted
    let unchanged = store.get(settlement.id).await.unwrap();
    assert!(unchanged.transaction_reference.is_empty());
}

#[tokio::test]
async fn response_without_payment_url_is_a_soft_failure() {
    let (store, settlement) = common::seeded_store().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pay/v1/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ch-1"})))
        .mount(&server)
        .await;

    let url = client(&server)
        .initiate_payment(&store, settlement.id, &CustomerInfo::default())
        .await;
    assert!(url.is_none());
}

#[tokio::test]
async fn unconfigured_key_short_circuits() {
    let (store, settlement) = common::seeded_store().await;
    let server = MockServer::start().await;

    let bare = CheckoutClient::new(Config {
        base_url: server.uri(),
        api_key: String::new(),
        ..Config::default()
    });
    assert!(bare
        .initiate_payment(&store, settlement.id, &CustomerInfo::default())
        .await
        .is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_settlement_is_a_soft_failure() {
    let (store, _) = common::seeded_store().await;
    let server = MockServer::start().await;
    assert!(client(&server)
        .initiate_payment(&store, 999, &CustomerInfo::default())
        .await
        .is_none());
}

#[tokio::test]
async fn fetch_charge_sends_op_token() {
    let (store, settlement) = common::seeded_store().await;
    let server = MockServer::start().await;

    // seed gateway refs as initiate_payment would
    {
        let mut guard = store.lock_row(settlement.id).await.unwrap();
        guard.set_gateway_refs(Some("ch-00042"), Some("op-secret-1"));
    }

    Mock::given(method("GET"))
        .and(path("/pay/v1/charges/ch-00042"))
        .and(header("X-API-Key", "pk-test-123"))
        .and(header("Op-Token", "op-secret-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ch-00042",
            "status": "succeeded",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = store.get(settlement.id).await.unwrap();
    let charge = client(&server).fetch_charge(&snapshot).await.unwrap();
    assert_eq!(charge["status"], "succeeded");
}

#[tokio::test]
async fn fetch_charge_without_refs_is_a_soft_failure() {
    let (store, settlement) = common::seeded_store().await;
    let server = MockServer::start().await;
    let snapshot = store.get(settlement.id).await.unwrap();
    assert!(client(&server).fetch_charge(&snapshot).await.is_none());
}
