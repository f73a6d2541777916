// ============================================================
// error: provider failures and the gateway's HTTP error taxonomy
// ============================================================

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Classification of a provider failure, following Stripe's error `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// `card_error`: the card was declined or could not be charged.
    Card,
    /// `invalid_request_error`: bad parameters, unknown ids, auth problems.
    InvalidRequest,
    /// Everything else, including network failures.
    Api,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{message}")]
    Api {
        kind:    ProviderErrorKind,
        status:  u16,
        code:    Option<String>,
        message: String,
    },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::Api { kind, .. } => *kind,
            ProviderError::Transport(_) => ProviderErrorKind::Api,
        }
    }

    /// True when the provider says the referenced object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ProviderError::Api { status, code, .. } => {
                *status == 404 || code.as_deref() == Some("resource_missing")
            }
            ProviderError::Transport(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Impossible de rembourser: statut du paiement = {0}")]
    InvalidState(String),
    #[error("Ce paiement a déjà été entièrement remboursé")]
    AlreadyRefunded,
    #[error("{0}")]
    Provider(#[from] ProviderError),
    /// Provider failure while issuing a refund; the message names the class.
    #[error("{}", refund_failure_message(.0))]
    RefundFailed(ProviderError),
}

fn refund_failure_message(err: &ProviderError) -> String {
    match err.kind() {
        ProviderErrorKind::Card => format!("Erreur carte: {err}"),
        ProviderErrorKind::InvalidRequest => format!("Requête invalide: {err}"),
        ProviderErrorKind::Api => format!("Erreur serveur: {err}"),
    }
}

impl GatewayError {
    /// Stable machine-readable code sent next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidInput(_) => "invalid_input",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::InvalidState(_) => "invalid_state",
            GatewayError::AlreadyRefunded => "already_refunded",
            GatewayError::Provider(err) | GatewayError::RefundFailed(err) => match err.kind() {
                ProviderErrorKind::Card => "card_error",
                ProviderErrorKind::InvalidRequest => "invalid_request",
                ProviderErrorKind::Api => "provider_error",
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code:  &'a str,
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_)
            | GatewayError::InvalidState(_)
            | GatewayError::AlreadyRefunded => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Provider(err) | GatewayError::RefundFailed(err) => match err.kind() {
                ProviderErrorKind::Card | ProviderErrorKind::InvalidRequest => {
                    StatusCode::BAD_REQUEST
                }
                ProviderErrorKind::Api => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            code:  self.code(),
        })
    }
}
