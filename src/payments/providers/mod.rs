//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait.

pub mod wspay;

pub use wspay::WsPayProvider;
