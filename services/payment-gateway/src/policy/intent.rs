// ============================================================
// policy/intent: payment intent parameters
// ============================================================

use serde_json::Value;

use crate::error::GatewayError;
use crate::provider::PaymentIntentParams;

/// Settlement currency for this deployment (Moroccan dirham).
pub const CURRENCY: &str = "mad";

pub const INVALID_AMOUNT: &str = "Montant invalide. Veuillez fournir un montant positif.";

/// Positive integer amount in minor units, or `None`.
///
/// Accepts JSON integers, integral floats and numeric strings, as the
/// mobile clients send all three.
pub fn positive_amount(raw: Option<&Value>) -> Option<u64> {
    let amount = match raw? {
        Value::Number(n) => match n.as_u64() {
            Some(v) => Some(v),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f < u64::MAX as f64)
                .map(|f| f as u64),
        },
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    amount.filter(|v| *v > 0)
}

/// Validate a charge amount before any remote call is made.
pub fn parse_amount(raw: Option<&Value>) -> Result<u64, GatewayError> {
    positive_amount(raw).ok_or_else(|| GatewayError::InvalidInput(INVALID_AMOUNT.to_string()))
}

pub const INVALID_REFUND_AMOUNT: &str =
    "Montant de remboursement invalide. Veuillez fournir un entier positif.";

/// Requested refund amount.
///
/// Absent, null, non-numeric or non-positive values ask for a full refund
/// (`Ok(None)`). A positive number that is not a usable integer amount is
/// rejected rather than widened into a full refund.
pub fn refund_amount(raw: Option<&Value>) -> Result<Option<u64>, GatewayError> {
    let numeric = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match numeric {
        Some(v) if v > 0.0 => positive_amount(raw)
            .map(Some)
            .ok_or_else(|| GatewayError::InvalidInput(INVALID_REFUND_AMOUNT.to_string())),
        _ => Ok(None),
    }
}

/// Assemble the parameters for a charge authorization.
///
/// The card is always saved for later reuse. Automatic method selection is
/// only enabled when no saved method is supplied; a supplied method is
/// attached but never confirmed off-session, so 3DS challenges still reach
/// the cardholder.
pub fn build(amount: u64, customer: &str, payment_method: Option<&str>) -> PaymentIntentParams {
    PaymentIntentParams {
        amount,
        currency: CURRENCY,
        customer: customer.to_string(),
        payment_method: payment_method.map(str::to_string),
        automatic_methods_enabled: payment_method.is_none(),
        save_for_future_use: true,
    }
}
