// ============================================================
// provider/stripe: PaymentProvider over the Stripe REST API
// ============================================================
// Stripe takes form-encoded bodies and answers JSON. Errors come back as
// `{"error": {"type", "code", "message"}}` with a non-2xx status.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    Customer, EphemeralKey, PaymentIntent, PaymentIntentParams, PaymentMethod, PaymentProvider,
    Refund, RefundParams, SetupIntent,
};
use crate::error::{ProviderError, ProviderErrorKind};

/// API version pinned for ephemeral keys, matching the mobile SDK.
pub const EPHEMERAL_KEY_API_VERSION: &str = "2025-02-24.acacia";

type Form = Vec<(&'static str, String)>;

pub struct StripeClient {
    http:       Client,
    api_base:   Url,
    secret_key: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type", default)]
    kind:    Option<String>,
    #[serde(default)]
    code:    Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct List<T> {
    data: Vec<T>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: Url) -> Self {
        StripeClient {
            http: Client::new(),
            api_base,
            secret_key: secret_key.into(),
        }
    }

    /// `<base>/v1/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ProviderError> {
        self.send(self.http.get(self.endpoint(segments))).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: &Form,
    ) -> Result<T, ProviderError> {
        self.send(self.http.post(self.endpoint(segments)).form(form))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("[stripe] {status} {body}");
        Err(api_error(status.as_u16(), &body))
    }
}

fn api_error(status: u16, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let (kind, code, message) = match detail {
        Some(detail) => (detail.kind, detail.code, detail.message),
        None => (None, None, None),
    };

    let kind = match kind.as_deref() {
        Some("card_error") => ProviderErrorKind::Card,
        Some("invalid_request_error") => ProviderErrorKind::InvalidRequest,
        _ => ProviderErrorKind::Api,
    };

    ProviderError::Api {
        kind,
        status,
        code,
        message: message.unwrap_or_else(|| format!("Stripe responded with HTTP {status}")),
    }
}

pub(crate) fn payment_intent_form(params: &PaymentIntentParams) -> Form {
    let mut form: Form = vec![
        ("amount", params.amount.to_string()),
        ("currency", params.currency.to_string()),
        ("customer", params.customer.clone()),
        (
            "automatic_payment_methods[enabled]",
            params.automatic_methods_enabled.to_string(),
        ),
    ];
    if params.save_for_future_use {
        form.push(("setup_future_usage", "off_session".to_string()));
    }
    if let Some(payment_method) = &params.payment_method {
        // Attach only: confirming off-session here would skip 3DS challenges.
        form.push(("payment_method", payment_method.clone()));
    }
    form
}

pub(crate) fn refund_form(params: &RefundParams) -> Form {
    let mut form: Form = vec![
        ("payment_intent", params.payment_intent.clone()),
        ("reason", params.reason.as_str().to_string()),
    ];
    if let Some(amount) = params.amount {
        form.push(("amount", amount.to_string()));
    }
    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn retrieve_customer(&self, id: &str) -> Result<Customer, ProviderError> {
        self.get(&["customers", id]).await
    }

    async fn create_customer(&self, email: &str) -> Result<Customer, ProviderError> {
        self.post(&["customers"], &vec![("email", email.to_string())])
            .await
    }

    async fn retrieve_payment_method(&self, id: &str) -> Result<PaymentMethod, ProviderError> {
        self.get(&["payment_methods", id]).await
    }

    async fn list_card_payment_methods(
        &self,
        customer: &str,
    ) -> Result<Vec<PaymentMethod>, ProviderError> {
        let request = self
            .http
            .get(self.endpoint(&["payment_methods"]))
            .query(&[("customer", customer), ("type", "card")]);
        let list: List<PaymentMethod> = self.send(request).await?;
        Ok(list.data)
    }

    async fn detach_payment_method(&self, id: &str) -> Result<PaymentMethod, ProviderError> {
        self.post(&["payment_methods", id, "detach"], &Vec::new())
            .await
    }

    async fn create_ephemeral_key(&self, customer: &str) -> Result<EphemeralKey, ProviderError> {
        let request = self
            .http
            .post(self.endpoint(&["ephemeral_keys"]))
            .header("Stripe-Version", EPHEMERAL_KEY_API_VERSION)
            .form(&[("customer", customer)]);
        self.send(request).await
    }

    async fn create_setup_intent(&self, customer: &str) -> Result<SetupIntent, ProviderError> {
        let form: Form = vec![
            ("customer", customer.to_string()),
            ("payment_method_types[0]", "card".to_string()),
        ];
        self.post(&["setup_intents"], &form).await
    }

    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, ProviderError> {
        self.post(&["payment_intents"], &payment_intent_form(params))
            .await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProviderError> {
        self.get(&["payment_intents", id]).await
    }

    async fn create_refund(&self, params: &RefundParams) -> Result<Refund, ProviderError> {
        self.post(&["refunds"], &refund_form(params)).await
    }

    async fn retrieve_refund(&self, id: &str) -> Result<Refund, ProviderError> {
        self.get(&["refunds", id]).await
    }
}
