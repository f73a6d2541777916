// ============================================================
// routes: HTTP handlers for the payment gateway
// ============================================================

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::metrics::Metrics;
use crate::policy::{intent, refund, CustomerResolver, Resolution};
use crate::provider::{PaymentMethod, PaymentProvider, Refund, RefundReason};

pub const DEFAULT_EMAIL: &str = "client@example.com";

const BANNER: &str =
    "Serveur de paiement Global Deliver opérationnel! API prête pour les paiements.";

// ── Application State ─────────────────────────────────────────

pub struct AppState {
    pub provider:        Arc<dyn PaymentProvider>,
    pub publishable_key: String,
    pub metrics:         Metrics,
}

// ── Request / Response Types ──────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetachRequest {
    payment_method_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetupIntentRequest {
    customer_id: Option<String>,
    email:       Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentIntentRequest {
    amount:         Option<Value>,
    email:          Option<String>,
    #[serde(rename = "payment_method")]
    payment_method: Option<String>,
    customer_id:    Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundRequest {
    payment_intent_id: Option<String>,
    amount:            Option<Value>,
    reason:            Option<RefundReason>,
    /// Audit tag, logged only.
    reservation_id:    Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupIntentResponse {
    setup_intent:    Option<String>,
    ephemeral_key:   String,
    customer:        String,
    publishable_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentIntentResponse {
    payment_intent:  Option<String>,
    ephemeral_key:   String,
    customer:        String,
    publishable_key: String,
}

#[derive(Debug, Serialize)]
struct RefundSummary {
    id:       String,
    amount:   i64,
    currency: String,
    status:   Option<String>,
    reason:   Option<String>,
    created:  i64,
}

impl From<&Refund> for RefundSummary {
    fn from(refund: &Refund) -> Self {
        RefundSummary {
            id:       refund.id.clone(),
            amount:   refund.amount,
            currency: refund.currency.clone(),
            status:   refund.status.clone(),
            reason:   refund.reason.clone(),
            created:  refund.created,
        }
    }
}

#[derive(Debug, Serialize)]
struct RefundResponse {
    success: bool,
    refund:  RefundSummary,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundStatusResponse {
    #[serde(flatten)]
    refund:         RefundSummary,
    payment_intent: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetachResponse {
    success:        bool,
    payment_method: PaymentMethod,
}

/// Empty strings count as absent, as the mobile clients send both.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, message: &str) -> Result<String, GatewayError> {
    present(value).ok_or_else(|| GatewayError::InvalidInput(message.to_string()))
}

/// Decode a JSON body whose fields are all optional; an empty body is `{}`.
fn json_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::InvalidInput(e.to_string()))
}

fn track_created(state: &AppState, resolution: &Resolution) {
    if resolution.created() {
        state.metrics.customers_created.inc();
    }
}

// ── Handlers ──────────────────────────────────────────────────

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(BANNER)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "payment-gateway",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.render() {
        Ok(buffer) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buffer),
        Err(e) => {
            error!("[metrics] Encoding failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn list_payment_methods(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
    let customer_id = required(Some(path.into_inner()), "ID client requis")?;
    info!("[payment-methods] Listing payment methods for customer {customer_id}");

    // Unknown customers get an empty listing rather than an error.
    match state.provider.retrieve_customer(&customer_id).await {
        Ok(customer) if !customer.deleted => {}
        Ok(_) => {
            warn!("[payment-methods] Customer {customer_id} was deleted");
            return Ok(HttpResponse::Ok().json(json!({ "data": [] })));
        }
        Err(e) => {
            warn!("[payment-methods] Customer {customer_id} not found: {e}");
            return Ok(HttpResponse::Ok().json(json!({ "data": [] })));
        }
    }

    match state.provider.list_card_payment_methods(&customer_id).await {
        Ok(methods) => {
            info!("[payment-methods] Found {} payment methods", methods.len());
            Ok(HttpResponse::Ok().json(methods))
        }
        Err(e) => {
            error!("[payment-methods] Listing failed: {e}");
            Ok(HttpResponse::Ok().json(json!({ "data": [], "error": e.to_string() })))
        }
    }
}

async fn missing_customer_id() -> Result<HttpResponse, GatewayError> {
    Err(GatewayError::InvalidInput("ID client requis".to_string()))
}

async fn detach_payment_method(
    state: web::Data<AppState>,
    body: web::Json<DetachRequest>,
) -> Result<HttpResponse, GatewayError> {
    let id = required(
        body.into_inner().payment_method_id,
        "ID méthode de paiement requis",
    )?;

    let payment_method = state
        .provider
        .detach_payment_method(&id)
        .await
        .inspect_err(|e| error!("[detach] Detaching {id} failed: {e}"))?;
    info!("[detach] Detached payment method {id}");

    Ok(HttpResponse::Ok().json(DetachResponse {
        success: true,
        payment_method,
    }))
}

async fn create_setup_intent(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let body: SetupIntentRequest = json_or_default(&body)?;
    let email = present(body.email).unwrap_or_else(|| DEFAULT_EMAIL.to_string());
    let provider = state.provider.as_ref();

    let resolution = CustomerResolver::new(provider)
        .resolve(present(body.customer_id).as_deref(), None, &email)
        .await
        .inspect_err(|e| error!("[setup-intent] Customer creation failed: {e}"))?;
    track_created(&state, &resolution);
    let customer = resolution.customer_id();

    let ephemeral_key = provider
        .create_ephemeral_key(customer)
        .await
        .inspect_err(|e| error!("[setup-intent] Ephemeral key failed: {e}"))?;
    let setup_intent = provider
        .create_setup_intent(customer)
        .await
        .inspect_err(|e| error!("[setup-intent] Creation failed: {e}"))?;
    state.metrics.setup_intents.inc();
    info!("[setup-intent] Created {} for customer {customer}", setup_intent.id);

    Ok(HttpResponse::Ok().json(SetupIntentResponse {
        setup_intent:    setup_intent.client_secret,
        ephemeral_key:   ephemeral_key.secret,
        customer:        customer.to_string(),
        publishable_key: state.publishable_key.clone(),
    }))
}

async fn create_payment_intent(
    state: web::Data<AppState>,
    body: web::Json<PaymentIntentRequest>,
) -> Result<HttpResponse, GatewayError> {
    let body = body.into_inner();
    log::debug!("[payment-intent] Request received: {body:?}");

    let amount = intent::parse_amount(body.amount.as_ref())?;
    let email = present(body.email).unwrap_or_else(|| DEFAULT_EMAIL.to_string());
    let payment_method = present(body.payment_method);
    info!("[payment-intent] Creating payment intent of {amount} for {email}");

    let provider = state.provider.as_ref();
    let resolution = CustomerResolver::new(provider)
        .resolve(
            present(body.customer_id).as_deref(),
            payment_method.as_deref(),
            &email,
        )
        .await
        .inspect_err(|e| error!("[payment-intent] Customer creation failed: {e}"))?;
    track_created(&state, &resolution);
    let customer = resolution.customer_id();

    let ephemeral_key = provider
        .create_ephemeral_key(customer)
        .await
        .inspect_err(|e| error!("[payment-intent] Ephemeral key failed: {e}"))?;

    let params = intent::build(amount, customer, payment_method.as_deref());
    let payment_intent = provider
        .create_payment_intent(&params)
        .await
        .inspect_err(|e| error!("[payment-intent] Creation failed: {e}"))?;
    state.metrics.payment_intents.inc();
    info!("[payment-intent] Created payment intent {}", payment_intent.id);

    Ok(HttpResponse::Ok().json(PaymentIntentResponse {
        payment_intent:  payment_intent.client_secret,
        ephemeral_key:   ephemeral_key.secret,
        customer:        customer.to_string(),
        publishable_key: state.publishable_key.clone(),
    }))
}

async fn refund_payment(
    state: web::Data<AppState>,
    body: web::Json<RefundRequest>,
) -> Result<HttpResponse, GatewayError> {
    let body = body.into_inner();
    info!("[refund] Refund requested: {body:?}");

    let payment_intent = required(body.payment_intent_id, "Payment Intent ID requis")?;
    let requested_amount = intent::refund_amount(body.amount.as_ref())?;
    let reason = body.reason.unwrap_or_default();

    let params = refund::authorize_refund(
        state.provider.as_ref(),
        &payment_intent,
        requested_amount,
        reason,
    )
    .await?;

    let refund = state.provider.create_refund(&params).await.map_err(|e| {
        error!("[refund] Refund of {payment_intent} failed: {e}");
        GatewayError::RefundFailed(e)
    })?;
    state.metrics.refunds.inc();
    info!(
        "[refund] Created refund {} amount {} status {:?}",
        refund.id, refund.amount, refund.status
    );

    if let Some(reservation) = present(body.reservation_id) {
        info!("[refund] Refund for reservation {reservation}: {}", refund.id);
    }

    Ok(HttpResponse::Ok().json(RefundResponse {
        success: true,
        refund:  RefundSummary::from(&refund),
        message: "Remboursement effectué avec succès",
    }))
}

async fn refund_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
    let refund_id = required(Some(path.into_inner()), "Refund ID requis")?;

    let refund = state
        .provider
        .retrieve_refund(&refund_id)
        .await
        .map_err(|e| {
            error!("[refund-status] Lookup of {refund_id} failed: {e}");
            if e.is_not_found() {
                GatewayError::NotFound("Remboursement non trouvé".to_string())
            } else {
                GatewayError::Provider(e)
            }
        })?;

    Ok(HttpResponse::Ok().json(RefundStatusResponse {
        refund:         RefundSummary::from(&refund),
        payment_intent: refund.payment_intent.clone(),
    }))
}

async fn missing_refund_id() -> Result<HttpResponse, GatewayError> {
    Err(GatewayError::InvalidInput("Refund ID requis".to_string()))
}

// ── Wiring ────────────────────────────────────────────────────

/// JSON extractor settings: malformed bodies get the gateway's 400 shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| GatewayError::InvalidInput(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        // Platform routes
        .route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler))
        // Saved cards
        .route("/payment-methods", web::get().to(missing_customer_id))
        .route("/payment-methods/", web::get().to(missing_customer_id))
        .route(
            "/payment-methods/{customer_id}",
            web::get().to(list_payment_methods),
        )
        .route("/detach-payment-method", web::post().to(detach_payment_method))
        // Charges
        .route("/create-setup-intent", web::post().to(create_setup_intent))
        .route("/create-payment-intent", web::post().to(create_payment_intent))
        // Refunds
        .route("/refund-payment", web::post().to(refund_payment))
        .route("/refund-status", web::get().to(missing_refund_id))
        .route("/refund-status/", web::get().to(missing_refund_id))
        .route("/refund-status/{refund_id}", web::get().to(refund_status));
}
