//! Payment provider trait definitions
//!
//! Defines the interface the HTTP layer drives for a redirect-based payment
//! provider.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::commerce::Order;
use crate::error::AppResult;
use crate::payments::types::{CallbackOutcome, PaymentChoice, PaymentRequest, PaymentView};

/// Trait for hosted-form payment providers
///
/// The customer is handed to the provider's page with a signed form and comes
/// back through one of the return, error or cancel callbacks.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// URL namespace and payment method identifier
    fn namespace(&self) -> &'static str;

    /// How this provider appears in the cart's payment method selection
    async fn payment_choice(&self, cart_id: i64) -> AppResult<PaymentChoice>;

    /// Select this provider as the cart's payment method and save the cart
    async fn select_payment(&self, cart_id: i64) -> AppResult<PaymentChoice>;

    /// Build whatever starts the payment from the checkout page
    ///
    /// # Arguments
    /// * `cart_id` - Cart being checked out
    /// * `locale` - Customer's locale, used for the gateway language
    async fn payment_request(&self, cart_id: i64, locale: &str) -> AppResult<PaymentRequest>;

    /// Optional confirmation page shown before leaving for the gateway
    async fn payment_view(&self, cart_id: Option<i64>, locale: &str) -> AppResult<PaymentView>;

    /// Verify the gateway's return callback and settle the cart
    ///
    /// # Arguments
    /// * `query` - Raw query parameters of the return URL
    ///
    /// # Returns
    /// * `CallbackOutcome` - Redirect on success, failure page otherwise
    async fn handle_return(&self, query: &HashMap<String, String>) -> AppResult<CallbackOutcome>;

    /// Transaction error reported by the gateway
    async fn handle_error(&self, cart_id: Option<i64>) -> AppResult<CallbackOutcome>;

    /// Customer cancelled on the gateway page
    async fn handle_cancel(&self, cart_id: Option<i64>) -> AppResult<CallbackOutcome>;

    /// Confirm a paid order once it is fully paid
    async fn acknowledge_payment(&self, order_id: Uuid) -> AppResult<Order>;
}
