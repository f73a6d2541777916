// ============================================================
// provider: the payment provider port
// ============================================================
// Every remote call the gateway makes goes through `PaymentProvider`.
// Production wires in `StripeClient`; tests wire in an in-memory fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;

pub mod stripe;

#[cfg(test)]
pub mod fake;

pub use self::stripe::StripeClient;

// ── Provider Records ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id:      String,
    #[serde(default)]
    pub email:   Option<String>,
    /// Stripe answers lookups of removed customers with a tombstone.
    #[serde(default)]
    pub deleted: bool,
}

/// A saved payment method. Fields the gateway does not inspect are kept
/// as-is so listings and detach responses mirror the provider's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id:       String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(flatten)]
    pub details:  Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id:              String,
    pub amount:          i64,
    #[serde(default)]
    pub amount_received: i64,
    pub status:          String,
    #[serde(default)]
    pub client_secret:   Option<String>,
    #[serde(default)]
    pub customer:        Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupIntent {
    pub id:            String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralKey {
    pub id:     String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id:             String,
    pub amount:         i64,
    pub currency:       String,
    #[serde(default)]
    pub status:         Option<String>,
    #[serde(default)]
    pub reason:         Option<String>,
    pub created:        i64,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

// ── Outbound Parameters ───────────────────────────────────────

/// Parameters for a charge authorization, assembled by `policy::intent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentParams {
    pub amount:                    u64,
    pub currency:                  &'static str,
    pub customer:                  String,
    pub payment_method:            Option<String>,
    pub automatic_methods_enabled: bool,
    pub save_for_future_use:       bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    #[default]
    RequestedByCustomer,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::Duplicate => "duplicate",
            RefundReason::Fraudulent => "fraudulent",
            RefundReason::RequestedByCustomer => "requested_by_customer",
        }
    }
}

/// Refund parameters cleared by `policy::refund`. `amount: None` asks the
/// provider to refund whatever balance remains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundParams {
    pub payment_intent: String,
    pub amount:         Option<u64>,
    pub reason:         RefundReason,
}

// ── Port ──────────────────────────────────────────────────────

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn retrieve_customer(&self, id: &str) -> Result<Customer, ProviderError>;

    async fn create_customer(&self, email: &str) -> Result<Customer, ProviderError>;

    async fn retrieve_payment_method(&self, id: &str) -> Result<PaymentMethod, ProviderError>;

    /// Card payment methods saved on `customer`.
    async fn list_card_payment_methods(
        &self,
        customer: &str,
    ) -> Result<Vec<PaymentMethod>, ProviderError>;

    async fn detach_payment_method(&self, id: &str) -> Result<PaymentMethod, ProviderError>;

    async fn create_ephemeral_key(&self, customer: &str) -> Result<EphemeralKey, ProviderError>;

    async fn create_setup_intent(&self, customer: &str) -> Result<SetupIntent, ProviderError>;

    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, ProviderError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProviderError>;

    async fn create_refund(&self, params: &RefundParams) -> Result<Refund, ProviderError>;

    async fn retrieve_refund(&self, id: &str) -> Result<Refund, ProviderError>;
}
