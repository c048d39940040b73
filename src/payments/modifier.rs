//! WSPay payment modifier
//!
//! Offers WSPay as a payment choice and optionally adds a handling fee row to
//! carts that selected it.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::commerce::{Cart, ExtraCartRow};
use crate::payments::PAYMENT_NAMESPACE;

#[derive(Debug, Clone)]
pub struct WsPayModifier {
    commission_percentage: Option<Decimal>,
    choice_text: String,
}

impl WsPayModifier {
    pub fn new(commission_percentage: Option<Decimal>, choice_text: impl Into<String>) -> Self {
        Self {
            commission_percentage,
            choice_text: choice_text.into(),
        }
    }

    pub fn identifier(&self) -> &'static str {
        PAYMENT_NAMESPACE
    }

    /// `(identifier, label)` pair shown in the payment method selection.
    pub fn choice(&self) -> (&'static str, &str) {
        (self.identifier(), &self.choice_text)
    }

    pub fn is_disabled(&self, cart: &Cart) -> bool {
        cart.total.is_zero()
    }

    pub fn is_active(&self, cart: &Cart) -> bool {
        cart.payment_modifier.as_deref() == Some(self.identifier())
    }

    pub fn add_extra_cart_row(&self, cart: &mut Cart) {
        let Some(percentage) = self.commission_percentage else {
            return;
        };
        if !self.is_active(cart) || percentage.is_zero() {
            return;
        }

        let amount = (cart.total * percentage / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        let row = ExtraCartRow {
            label: format!("+ {}% handling fee", percentage.normalize()),
            amount,
        };
        cart.extra_rows.insert(self.identifier().to_string(), row);
        cart.total += amount;
    }

    /// Recalculate the cart and apply this modifier.
    pub fn update_cart(&self, cart: &mut Cart) {
        cart.recalculate();
        self.add_extra_cart_row(cart);
    }
}
