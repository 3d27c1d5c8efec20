//! Webhook server: the process composition root.
//!
//! Builds every client and store exactly once from the environment and
//! injects them; nothing in the library crates reaches for globals.

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use checkout_gateway::{CheckoutClient, CustomerInfo, WebhookProcessor};
use serde::Deserialize;
use serde_json::json;
use settlement::SettlementStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct AppState {
    processor: Arc<WebhookProcessor>,
    checkout: CheckoutClient,
    store: Arc<SettlementStore>,
}

async fn checkout_webhook(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    // Header lookup is case-insensitive at this layer.
    let api_key = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());
    let outcome = state.processor.handle(&body, api_key).await;
    HttpResponse::new(
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    )
}

#[derive(Debug, Deserialize, Default)]
struct PayRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
}

/// Start a hosted checkout for a pending settlement.
async fn initiate_payment(
    path: web::Path<u64>,
    body: web::Json<PayRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let customer = CustomerInfo {
        name: body.name.clone(),
        phone: body.phone.clone(),
        email: body.email.clone(),
    };
    match state
        .checkout
        .initiate_payment(&state.store, *path, &customer)
        .await
    {
        Some(url) => HttpResponse::Ok().json(json!({ "paymentUrl": url })),
        None => HttpResponse::ServiceUnavailable()
            .json(json!({ "error": "could not initiate payment, retry later" })),
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let checkout_config = checkout_gateway::Config::from_env();
    let store = Arc::new(SettlementStore::new(settlement::Config::default()));
    let state = web::Data::new(AppState {
        processor: Arc::new(WebhookProcessor::new(checkout_config.clone(), store.clone())),
        checkout: CheckoutClient::new(checkout_config),
        store,
    });

    let listen_addr =
        std::env::var("WEBHOOK_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8089".to_string());
    info!(addr = %listen_addr, "starting checkout webhook server");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/webhooks/checkout", web::post().to(checkout_webhook))
            .route("/settlements/{id}/checkout", web::post().to(initiate_payment))
            .route("/health", web::get().to(health))
    })
    .bind(listen_addr)?
    .run()
    .await?;

    Ok(())
}
