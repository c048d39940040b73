//! Payment provider integration module
//!
//! WSPay hosted-form payments: request signing, the outbound form, callback
//! verification and the order workflow that follows a verified payment.

pub mod form;
pub mod modifier;
pub mod providers;
pub mod signature;
pub mod traits;
pub mod types;
pub mod workflow;

/// URL namespace and payment method identifier of the WSPay provider.
pub const PAYMENT_NAMESPACE: &str = "wspay";
