//! HTTP gateway in front of Stripe: payment intents, setup intents, saved
//! cards and refunds for the Global Deliver mobile apps.
//!
//! The handlers in [`routes`] stay thin. Decisions live in [`policy`], and
//! every remote call goes through the [`provider::PaymentProvider`] port.

pub mod config;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod provider;
pub mod routes;

pub use config::Config;
pub use error::{GatewayError, ProviderError};
pub use routes::{configure, AppState};
