// ============================================================
// policy/refund: preconditions before refunding a payment
// ============================================================
// Only a succeeded payment with money still received is refundable. Partial
// amounts are not checked against the remaining balance here; the provider
// rejects over-refunds itself.

use log::{info, warn};

use crate::error::GatewayError;
use crate::provider::{PaymentIntent, PaymentProvider, RefundParams, RefundReason};

pub const INTENT_NOT_FOUND: &str = "Payment Intent non trouvé ou invalide";

const SUCCEEDED: &str = "succeeded";

/// Fetch the payment intent and clear a refund against it.
pub async fn authorize_refund(
    provider: &dyn PaymentProvider,
    payment_intent: &str,
    requested_amount: Option<u64>,
    reason: RefundReason,
) -> Result<RefundParams, GatewayError> {
    let intent = match provider.retrieve_payment_intent(payment_intent).await {
        Ok(intent) => intent,
        Err(err) => {
            warn!("[refund] Payment intent {payment_intent} not found: {err}");
            return Err(GatewayError::NotFound(INTENT_NOT_FOUND.to_string()));
        }
    };
    info!(
        "[refund] Payment intent {} amount {} status {}",
        intent.id, intent.amount, intent.status
    );

    check(&intent, requested_amount, reason)
}

/// Apply the refund preconditions to a fetched payment intent snapshot.
pub fn check(
    intent: &PaymentIntent,
    requested_amount: Option<u64>,
    reason: RefundReason,
) -> Result<RefundParams, GatewayError> {
    if intent.status != SUCCEEDED {
        return Err(GatewayError::InvalidState(intent.status.clone()));
    }
    if intent.amount_received == 0 {
        return Err(GatewayError::AlreadyRefunded);
    }

    let amount = requested_amount.filter(|a| *a > 0);
    match amount {
        Some(a) => info!("[refund] Partial refund requested: {a}"),
        None => info!("[refund] Full refund requested"),
    }

    Ok(RefundParams {
        payment_intent: intent.id.clone(),
        amount,
        reason,
    })
}
