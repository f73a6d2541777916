//! Request policy shared by the HTTP handlers: customer resolution, payment
//! intent construction and the refund guard.

pub mod customer;
pub mod intent;
pub mod refund;

pub use customer::{CustomerResolver, FallbackReason, Lookup, Resolution};
