// In-memory PaymentProvider for tests. Records every call so tests can
// assert which remote operations a flow performed.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Map;

use super::{
    Customer, EphemeralKey, PaymentIntent, PaymentIntentParams, PaymentMethod, PaymentProvider,
    Refund, RefundParams, SetupIntent,
};
use crate::error::{ProviderError, ProviderErrorKind};

#[derive(Default)]
struct State {
    next_id:               u64,
    customers:             HashMap<String, Customer>,
    payment_methods:       HashMap<String, PaymentMethod>,
    payment_intents:       HashMap<String, PaymentIntent>,
    refunds:               HashMap<String, Refund>,
    intent_params:         Vec<PaymentIntentParams>,
    refund_params:         Vec<RefundParams>,
    calls:                 Vec<String>,
    fail_customer_lookups: bool,
    fail_listings:         bool,
}

#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<State>,
}

pub fn missing(what: &str, id: &str) -> ProviderError {
    ProviderError::Api {
        kind:    ProviderErrorKind::InvalidRequest,
        status:  404,
        code:    Some("resource_missing".to_string()),
        message: format!("No such {what}: '{id}'"),
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_customer(&self, id: &str, email: &str) {
        self.with(|s| {
            s.customers.insert(
                id.to_string(),
                Customer {
                    id:      id.to_string(),
                    email:   Some(email.to_string()),
                    deleted: false,
                },
            );
        });
    }

    pub fn delete_customer(&self, id: &str) {
        self.with(|s| {
            if let Some(customer) = s.customers.get_mut(id) {
                customer.deleted = true;
            }
        });
    }

    pub fn add_payment_method(&self, id: &str, customer: Option<&str>) {
        self.with(|s| {
            let mut details = Map::new();
            details.insert("type".to_string(), "card".into());
            s.payment_methods.insert(
                id.to_string(),
                PaymentMethod {
                    id: id.to_string(),
                    customer: customer.map(str::to_string),
                    details,
                },
            );
        });
    }

    pub fn add_payment_intent(&self, id: &str, status: &str, amount: i64, amount_received: i64) {
        self.with(|s| {
            s.payment_intents.insert(
                id.to_string(),
                PaymentIntent {
                    id: id.to_string(),
                    amount,
                    amount_received,
                    status: status.to_string(),
                    client_secret: Some(format!("{id}_secret")),
                    customer: None,
                },
            );
        });
    }

    /// Make every customer lookup fail as a network error would.
    pub fn fail_customer_lookups(&self) {
        self.with(|s| s.fail_customer_lookups = true);
    }

    /// Make payment method listings fail with a provider outage.
    pub fn fail_listings(&self) {
        self.with(|s| s.fail_listings = true);
    }

    pub fn customer_email(&self, id: &str) -> Option<String> {
        self.with(|s| s.customers.get(id).and_then(|c| c.email.clone()))
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    pub fn customers_created(&self) -> usize {
        self.with(|s| s.calls.iter().filter(|c| *c == "create_customer").count())
    }

    pub fn intent_params(&self) -> Vec<PaymentIntentParams> {
        self.with(|s| s.intent_params.clone())
    }

    pub fn refund_params(&self) -> Vec<RefundParams> {
        self.with(|s| s.refund_params.clone())
    }

    fn record(&self, call: &str) -> u64 {
        self.with(|s| {
            s.calls.push(call.to_string());
            s.next_id += 1;
            s.next_id
        })
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn retrieve_customer(&self, id: &str) -> Result<Customer, ProviderError> {
        self.record("retrieve_customer");
        self.with(|s| -> Result<Customer, ProviderError> {
            if s.fail_customer_lookups {
                return Err(ProviderError::Api {
                    kind:    ProviderErrorKind::Api,
                    status:  503,
                    code:    None,
                    message: "connection reset".to_string(),
                });
            }
            s.customers.get(id).cloned().ok_or_else(|| missing("customer", id))
        })
    }

    async fn create_customer(&self, email: &str) -> Result<Customer, ProviderError> {
        let n = self.record("create_customer");
        let customer = Customer {
            id:      format!("cus_fake{n}"),
            email:   Some(email.to_string()),
            deleted: false,
        };
        self.with(|s| s.customers.insert(customer.id.clone(), customer.clone()));
        Ok(customer)
    }

    async fn retrieve_payment_method(&self, id: &str) -> Result<PaymentMethod, ProviderError> {
        self.record("retrieve_payment_method");
        self.with(|s| s.payment_methods.get(id).cloned())
            .ok_or_else(|| missing("payment_method", id))
    }

    async fn list_card_payment_methods(
        &self,
        customer: &str,
    ) -> Result<Vec<PaymentMethod>, ProviderError> {
        self.record("list_card_payment_methods");
        self.with(|s| -> Result<Vec<PaymentMethod>, ProviderError> {
            if s.fail_listings {
                return Err(ProviderError::Api {
                    kind:    ProviderErrorKind::Api,
                    status:  500,
                    code:    None,
                    message: "An unknown error occurred".to_string(),
                });
            }
            Ok(s.payment_methods
                .values()
                .filter(|pm| pm.customer.as_deref() == Some(customer))
                .cloned()
                .collect())
        })
    }

    async fn detach_payment_method(&self, id: &str) -> Result<PaymentMethod, ProviderError> {
        self.record("detach_payment_method");
        self.with(|s| -> Result<PaymentMethod, ProviderError> {
            let pm = s
                .payment_methods
                .get_mut(id)
                .ok_or_else(|| missing("payment_method", id))?;
            pm.customer = None;
            Ok(pm.clone())
        })
    }

    async fn create_ephemeral_key(&self, customer: &str) -> Result<EphemeralKey, ProviderError> {
        let n = self.record("create_ephemeral_key");
        Ok(EphemeralKey {
            id:     format!("ephkey_{n}"),
            secret: format!("ek_test_{customer}"),
        })
    }

    async fn create_setup_intent(&self, customer: &str) -> Result<SetupIntent, ProviderError> {
        let n = self.record("create_setup_intent");
        Ok(SetupIntent {
            id:            format!("seti_{n}"),
            client_secret: Some(format!("seti_{n}_secret_{customer}")),
        })
    }

    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, ProviderError> {
        let n = self.record("create_payment_intent");
        let intent = PaymentIntent {
            id:              format!("pi_{n}"),
            amount:          params.amount as i64,
            amount_received: 0,
            status:          "requires_payment_method".to_string(),
            client_secret:   Some(format!("pi_{n}_secret")),
            customer:        Some(params.customer.clone()),
        };
        self.with(|s| {
            s.intent_params.push(params.clone());
            s.payment_intents.insert(intent.id.clone(), intent.clone());
        });
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProviderError> {
        self.record("retrieve_payment_intent");
        self.with(|s| s.payment_intents.get(id).cloned())
            .ok_or_else(|| missing("payment_intent", id))
    }

    async fn create_refund(&self, params: &RefundParams) -> Result<Refund, ProviderError> {
        let n = self.record("create_refund");
        self.with(|s| -> Result<Refund, ProviderError> {
            let intent = s
                .payment_intents
                .get_mut(&params.payment_intent)
                .ok_or_else(|| missing("payment_intent", &params.payment_intent))?;
            let amount = params
                .amount
                .map(|a| a as i64)
                .unwrap_or(intent.amount_received);
            intent.amount_received -= amount;

            let refund = Refund {
                id:             format!("re_{n}"),
                amount,
                currency:       "mad".to_string(),
                status:         Some("succeeded".to_string()),
                reason:         Some(params.reason.as_str().to_string()),
                created:        1_700_000_000,
                payment_intent: Some(params.payment_intent.clone()),
            };
            s.refund_params.push(params.clone());
            s.refunds.insert(refund.id.clone(), refund.clone());
            Ok(refund)
        })
    }

    async fn retrieve_refund(&self, id: &str) -> Result<Refund, ProviderError> {
        self.record("retrieve_refund");
        self.with(|s| s.refunds.get(id).cloned())
            .ok_or_else(|| missing("refund", id))
    }
}
