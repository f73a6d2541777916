// ============================================================
// policy/customer: which upstream customer a flow charges
// ============================================================
// Lookups never fail the request: a failed or empty lookup falls through to
// creating a fresh customer with the caller's email. Only that creation call
// can return an error.

use log::{info, warn};

use crate::error::ProviderError;
use crate::provider::{Customer, PaymentProvider};

/// Outcome of the first step of resolution.
pub enum Lookup<T> {
    Found(T),
    Missing(FallbackReason),
}

/// Why resolution ended up creating a new customer.
#[derive(Debug)]
pub enum FallbackReason {
    /// Caller supplied neither a customer nor a payment method.
    NoReference,
    /// Customer lookup failed. The error is kept so callers can tell a
    /// missing id from a transient failure; both currently fall back.
    CustomerLookupFailed(ProviderError),
    CustomerDeleted,
    PaymentMethodLookupFailed(ProviderError),
    PaymentMethodUnattached,
}

#[derive(Debug)]
pub enum Resolution {
    Existing(Customer),
    /// Customer id taken from the saved payment method, without a fetch.
    FromPaymentMethod(String),
    Created {
        customer: Customer,
        reason:   FallbackReason,
    },
}

impl Resolution {
    pub fn customer_id(&self) -> &str {
        match self {
            Resolution::Existing(customer) => &customer.id,
            Resolution::FromPaymentMethod(id) => id,
            Resolution::Created { customer, .. } => &customer.id,
        }
    }

    pub fn created(&self) -> bool {
        matches!(self, Resolution::Created { .. })
    }
}

pub struct CustomerResolver<'a> {
    provider: &'a dyn PaymentProvider,
}

impl<'a> CustomerResolver<'a> {
    pub fn new(provider: &'a dyn PaymentProvider) -> Self {
        CustomerResolver { provider }
    }

    /// Resolve the customer for a charge or card-setup flow.
    ///
    /// Priority: explicit `customer_ref`, then the owner of
    /// `payment_method_ref`, then a new customer for `email`.
    pub async fn resolve(
        &self,
        customer_ref: Option<&str>,
        payment_method_ref: Option<&str>,
        email: &str,
    ) -> Result<Resolution, ProviderError> {
        let lookup = match (customer_ref, payment_method_ref) {
            (Some(id), _) => self.lookup_customer(id).await.map(Resolution::Existing),
            (None, Some(pm)) => self
                .lookup_payment_method_owner(pm)
                .await
                .map(Resolution::FromPaymentMethod),
            (None, None) => Lookup::Missing(FallbackReason::NoReference),
        };

        match lookup {
            Lookup::Found(resolution) => {
                info!("[customer] Using existing customer {}", resolution.customer_id());
                Ok(resolution)
            }
            Lookup::Missing(reason) => self.create(email, reason).await,
        }
    }

    pub async fn lookup_customer(&self, id: &str) -> Lookup<Customer> {
        match self.provider.retrieve_customer(id).await {
            Ok(customer) if customer.deleted => {
                warn!("[customer] Customer {id} was deleted");
                Lookup::Missing(FallbackReason::CustomerDeleted)
            }
            Ok(customer) => Lookup::Found(customer),
            Err(err) => {
                warn!("[customer] Lookup of {id} failed: {err}");
                Lookup::Missing(FallbackReason::CustomerLookupFailed(err))
            }
        }
    }

    /// Customer id attached to a saved payment method, if any.
    pub async fn lookup_payment_method_owner(&self, id: &str) -> Lookup<String> {
        match self.provider.retrieve_payment_method(id).await {
            Ok(pm) => match pm.customer {
                Some(customer) => Lookup::Found(customer),
                None => Lookup::Missing(FallbackReason::PaymentMethodUnattached),
            },
            Err(err) => {
                warn!("[customer] Payment method {id} lookup failed: {err}");
                Lookup::Missing(FallbackReason::PaymentMethodLookupFailed(err))
            }
        }
    }

    async fn create(&self, email: &str, reason: FallbackReason) -> Result<Resolution, ProviderError> {
        let customer = self.provider.create_customer(email).await?;
        info!("[customer] Created customer {} ({reason:?})", customer.id);
        Ok(Resolution::Created { customer, reason })
    }
}

impl<T> Lookup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Missing(reason) => Lookup::Missing(reason),
        }
    }
}
