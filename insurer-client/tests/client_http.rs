//! HTTP-level behavior of the insurer client against a mock provider:
//! retry policy, error classification, issuance idempotency and
//! recovery.

use std::time::Duration;

use chrono::{Datelike, Utc};
use insurer_client::{Config, Error, GuaranteeFlags, InsurerClient, IssueContractRequest, VehicleRating};
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{json, Map};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        app_client: "TESTAPP".to_string(),
        pv_code: "PV001".to_string(),
        br_code: "BR001".to_string(),
        timeout_secs: 1,
        issuance_timeout_secs: 1,
        probe_timeout_secs: 1,
        max_retries: 2,
        recovery_attempts: 3,
        recovery_pause_secs: 0,
    }
}

fn client(server: &MockServer) -> InsurerClient {
    InsurerClient::new(test_config(server)).unwrap()
}

fn vehicle() -> VehicleRating {
    VehicleRating {
        category: "510".to_string(),
        sub_category: None,
        fuel: "E00001".to_string(),
        fiscal_power: 8,
        seat_count: 5,
        new_value: Decimal::ZERO,
        market_value: Decimal::ZERO,
        payload_kg: None,
        guarantees: GuaranteeFlags::default(),
    }
}

fn issue_request(capture_id: Option<&str>) -> IssueContractRequest {
    IssueContractRequest {
        client_code: "C00042".to_string(),
        vehicle: vehicle(),
        plate: "DK-0001-BB".to_string(),
        make_code: "M00001".to_string(),
        model: "COROLLA".to_string(),
        body_type: None,
        effective_date: "2099-01-01".to_string(),
        duration_months: 12,
        capture_id: capture_id.map(str::to_string),
    }
}

#[tokio::test]
async fn timeout_twice_then_success_returns_result() {
    let server = MockServer::start().await;

    // First two requests exceed the client timeout, third answers.
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "OK"}))
                .set_delay(Duration::from_secs(5)),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "n": 3})))
        .mount(&server)
        .await;

    let client = client(&server);
    let result = client
        .request_json(Method::GET, "ping", Map::new(), Duration::from_millis(300), 2)
        .await
        .unwrap();
    assert_eq!(result["n"], 3);
}

#[tokio::test]
async fn timeout_past_max_retries_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .request_json(Method::GET, "ping", Map::new(), Duration::from_millis(200), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }), "{err}");
}

#[tokio::test]
async fn server_errors_are_retried_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .request_json(Method::GET, "ping", Map::new(), Duration::from_secs(1), 2)
        .await
        .unwrap_err();
    match err {
        Error::Http { status, body_preview } => {
            assert_eq!(status, 503);
            assert_eq!(body_preview, "maintenance");
        }
        other => panic!("expected Http error, got {other}"),
    }
}

#[tokio::test]
async fn business_error_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "KO", "message": "Contrat en cours de validité"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .request_json(Method::GET, "ping", Map::new(), Duration::from_secs(1), 2)
        .await
        .unwrap_err();
    match err {
        Error::Business { message } => assert_eq!(message, "Contrat en cours de validité"),
        other => panic!("expected Business error, got {other}"),
    }
}

#[tokio::test]
async fn non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .request_json(Method::GET, "ping", Map::new(), Duration::from_secs(1), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResponse { .. }), "{err}");
}

#[tokio::test]
async fn null_params_are_stripped_from_the_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(query_param("kept", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut params = Map::new();
    params.insert("kept".to_string(), json!(1));
    params.insert("dropped".to_string(), serde_json::Value::Null);
    let result = client
        .request_json(Method::GET, "ping", params, Duration::from_secs(1), 0)
        .await
        .unwrap();
    assert_eq!(result["ok"], true);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or("").contains("dropped"));
}

#[tokio::test]
async fn simulation_parses_the_premium_split() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/srwb/automobile"))
        .and(query_param("cat", "510"))
        .and(query_param("dure", "12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "primenette": "100000",
            "accessoire": 5000,
            "fga": "2500",
            "taxe": "17500",
            "primettc": "125000",
            "commission": "23000",
            "idSaisie": "SIM123",
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let quote = client.get_simulation_auto(&vehicle(), 12).await.unwrap();
    assert_eq!(quote.net_premium, Decimal::new(100000, 0));
    assert_eq!(quote.accessories, Decimal::new(5000, 0));
    assert_eq!(quote.gross_premium, Decimal::new(125000, 0));
    assert_eq!(quote.capture_id, "SIM123");
}

#[tokio::test]
async fn preexisting_contract_short_circuits_issuance() {
    let server = MockServer::start().await;
    let year = Utc::now().year();

    Mock::given(method("GET"))
        .and(path("/quittance/getfacture"))
        .and(query_param("numeroFacture", format!("{year}CAPT1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numeroPolice": "POL-EXISTING",
            "numeroFacture": format!("{year}CAPT1"),
            "primettc": "125000",
            "lien": {"linkAttestation": "https://docs/att.pdf"},
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/srwbauto/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let issued = client.create_contract(&issue_request(Some("CAPT1"))).await.unwrap();
    assert!(issued.was_existing);
    assert!(!issued.recovered_after_error);
    assert_eq!(issued.policy_number, "POL-EXISTING");
    assert_eq!(issued.documents.attestation, "https://docs/att.pdf");
}

#[tokio::test]
async fn failed_issuance_recovers_via_existence_probe() {
    let server = MockServer::start().await;
    let year = Utc::now().year();

    // Pre-flight probes (both candidate invoice numbers) miss.
    Mock::given(method("GET"))
        .and(path("/quittance/getfacture"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    // The create call itself dies server-side.
    Mock::given(method("GET"))
        .and(path("/srwbauto/create"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    // Recovery probe finds the contract the provider issued anyway.
    Mock::given(method("GET"))
        .and(path("/quittance/getfacture"))
        .and(query_param("numeroFacture", format!("{year}CAPT1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numeroPolice": "POL-RECOVERED",
            "numeroFacture": format!("{year}CAPT1"),
            "primettc": "125000",
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let issued = client.create_contract(&issue_request(Some("CAPT1"))).await.unwrap();
    assert!(issued.recovered_after_error);
    assert!(!issued.was_existing);
    assert_eq!(issued.policy_number, "POL-RECOVERED");
}

#[tokio::test]
async fn issuance_without_capture_id_propagates_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/srwbauto/create"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.create_contract(&issue_request(None)).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 500, .. }), "{err}");
}

#[tokio::test]
async fn issuance_missing_identifiers_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/srwbauto/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numeroPolice": "POL-1",
            "message": "facture en attente",
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.create_contract(&issue_request(None)).await.unwrap_err();
    match err {
        Error::IssuanceFailed { message } => assert_eq!(message, "facture en attente"),
        other => panic!("expected IssuanceFailed, got {other}"),
    }
}

#[tokio::test]
async fn referential_failure_degrades_to_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/referentiel/categories"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;

    let client = client(&server);
    let categories = client.get_categories().await;
    assert!(categories.iter().any(|(code, _)| code == "510"));
}

#[tokio::test]
async fn referential_success_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/referentiel/marques"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"code": "M00001", "libelle": "TOYOTA"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let first = client.get_makes().await;
    let second = client.get_makes().await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn document_links_tolerate_missing_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quittance/getfacture"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numeroPolice": "POL-1",
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let links = client.get_invoice_documents("2026F001").await.unwrap();
    assert!(links.attestation.is_empty());
    assert!(links.brown_card.is_empty());
}
