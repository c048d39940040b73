//! WSPay request and callback types
//!
//! Field names on the wire follow the gateway's CamelCase convention; the
//! Rust side keeps snake_case and converts at the edges.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commerce::Cart;
use crate::error::{AppError, AppResult};
use crate::payments::form::WsPayForm;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount '{0}' is not a number")]
    NotANumber(String),
    #[error("amount '{0}' is negative")]
    Negative(String),
}

/// A total normalized to the gateway's two-decimal representation.
///
/// `display` is what goes into the `TotalAmount` form field (`1234,50`),
/// `signed_digits` is what goes into the signature (`123450`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalAmount {
    value: Decimal,
    integer_part: String,
    fraction_part: String,
}

impl TotalAmount {
    pub fn from_decimal(amount: Decimal) -> Result<Self, AmountError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AmountError::Negative(amount.to_string()));
        }
        let value = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        let formatted = format!("{:.2}", value);
        let (integer_part, fraction_part) = formatted
            .rsplit_once('.')
            .map(|(int, frac)| (int.to_string(), frac.to_string()))
            .unwrap_or_else(|| (formatted.clone(), "00".to_string()));

        Ok(Self {
            value,
            integer_part,
            fraction_part,
        })
    }

    /// Parse a locale-formatted amount.
    ///
    /// The last `.` or `,` followed by one or two digits is the decimal
    /// separator, every other `.` and `,` is a thousands separator.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        Self::from_decimal(parse_decimal(input)?)
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    /// `<integer_part>,<two_decimal_digits>`
    pub fn display(&self) -> String {
        format!("{},{}", self.integer_part, self.fraction_part)
    }

    /// Digits only, as hashed into the request signature.
    pub fn signed_digits(&self) -> String {
        format!("{}{}", self.integer_part, self.fraction_part)
    }
}

pub(crate) fn parse_decimal(input: &str) -> Result<Decimal, AmountError> {
    let trimmed: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let decimal_at = trimmed.rfind(|c: char| c == '.' || c == ',').filter(|&idx| {
        let tail = &trimmed[idx + 1..];
        (1..=2).contains(&tail.len()) && tail.chars().all(|c| c.is_ascii_digit())
    });

    let integer_part = &trimmed[..decimal_at.unwrap_or(trimmed.len())];
    if !grouping_is_valid(integer_part) {
        return Err(AmountError::NotANumber(input.to_string()));
    }

    let mut normalized = String::with_capacity(trimmed.len());
    for (idx, c) in trimmed.char_indices() {
        match c {
            '.' | ',' if Some(idx) == decimal_at => normalized.push('.'),
            '.' | ',' => {}
            _ => normalized.push(c),
        }
    }

    let value = Decimal::from_str(&normalized)
        .map_err(|_| AmountError::NotANumber(input.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative(input.to_string()));
    }
    Ok(value)
}

/// Thousands groups: a leading group of one to three digits, then groups of exactly three.
fn grouping_is_valid(integer_part: &str) -> bool {
    let unsigned = integer_part.trim_start_matches(['-', '+']);
    if !unsigned.contains(['.', ',']) {
        return true;
    }

    let mut groups = unsigned.split(['.', ',']);
    let leading_ok = groups
        .next()
        .is_some_and(|first| (1..=3).contains(&first.len()) && !first.starts_with('0'));
    leading_ok && groups.all(|group| group.len() == 3)
}

/// Fields signed into an outbound payment request.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub shop_id: String,
    pub shopping_cart_id: String,
    pub total_amount: TotalAmount,
}

/// Query parameters delivered by the gateway on the return URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub shopping_cart_id: i64,
    pub success: i64,
    pub approval_code: String,
    pub signature: String,
    pub amount_paid: Decimal,
}

impl CallbackPayload {
    /// Parse and validate the raw return query.
    ///
    /// Every field must be present and well-formed before any signature is
    /// computed over it.
    pub fn from_query(query: &HashMap<String, String>) -> AppResult<Self> {
        let field = |name: &str| {
            query
                .get(name)
                .ok_or_else(|| AppError::malformed_callback(format!("missing {}", name)))
        };
        let integer = |name: &str| -> AppResult<i64> {
            field(name)?
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::malformed_callback(format!("{} is not an integer", name)))
        };

        let shopping_cart_id = integer("ShoppingCartID")?;
        let success = integer("Success")?;
        let approval_code = field("ApprovalCode")?.clone();
        let signature = field("Signature")?.clone();
        let amount_paid = parse_decimal(field("Amount")?)
            .map_err(|e| AppError::malformed_callback(format!("Amount: {}", e)))?;

        Ok(Self {
            shopping_cart_id,
            success,
            approval_code,
            signature,
            amount_paid,
        })
    }

    /// The gateway's own verdict, before the signature is checked.
    pub fn reports_success(&self) -> bool {
        self.success == 1 && !self.approval_code.is_empty()
    }
}

/// What the checkout page should do to start a WSPay payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequest {
    /// Script to evaluate in the customer's browser.
    Script(String),
    /// The cart cannot be paid with WSPay; send the customer here instead.
    Redirect(String),
}

#[derive(Debug, Clone)]
pub enum PaymentView {
    Render { cart: Cart, form: WsPayForm },
    Redirect(String),
}

/// WSPay as listed in the shop's payment method selection for one cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentChoice {
    pub identifier: String,
    pub label: String,
    pub disabled: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Failed,
    Error,
    Cancel,
}

/// Result of handling one gateway redirect back to the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Redirect {
        location: String,
        message: Option<String>,
    },
    Render {
        page: Page,
        message: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_amount_pads_to_two_decimals() {
        let amount = TotalAmount::parse("1234.5").unwrap();
        assert_eq!(amount.signed_digits(), "123450");
        assert_eq!(amount.display(), "1234,50");
    }

    #[test]
    fn test_amount_strips_thousands_separators() {
        assert_eq!(TotalAmount::parse("1,234.50").unwrap().signed_digits(), "123450");
        assert_eq!(TotalAmount::parse("1.234,50").unwrap().signed_digits(), "123450");
        assert_eq!(TotalAmount::parse("1 234,50").unwrap().signed_digits(), "123450");
        assert_eq!(TotalAmount::parse("1,234").unwrap().signed_digits(), "123400");
        assert_eq!(TotalAmount::parse("1,234,567.8").unwrap().display(), "1234567,80");
    }

    #[test]
    fn test_amount_rejects_malformed_grouping() {
        for input in ["0.001", "0,125", "1.2345", "12,34,567", "1,,234", "1234,567"] {
            assert!(
                matches!(TotalAmount::parse(input), Err(AmountError::NotANumber(_))),
                "{} should be rejected",
                input
            );
        }
        assert_eq!(TotalAmount::parse("10.005").unwrap().display(), "10005,00");
        assert!(matches!(
            TotalAmount::parse("-1,234"),
            Err(AmountError::Negative(_))
        ));
    }

    #[test]
    fn test_amount_from_decimal() {
        let amount = TotalAmount::from_decimal(Decimal::new(1000, 2)).unwrap();
        assert_eq!(amount.signed_digits(), "1000");
        assert_eq!(amount.display(), "10,00");

        let whole = TotalAmount::from_decimal(Decimal::from(7)).unwrap();
        assert_eq!(whole.display(), "7,00");
    }

    #[test]
    fn test_amount_rounds_half_to_even() {
        let down = TotalAmount::from_decimal(Decimal::new(125, 3)).unwrap();
        assert_eq!(down.display(), "0,12");
        let up = TotalAmount::from_decimal(Decimal::new(135, 3)).unwrap();
        assert_eq!(up.display(), "0,14");
    }

    #[test]
    fn test_amount_rejects_garbage() {
        assert_eq!(TotalAmount::parse(""), Err(AmountError::Empty));
        assert!(matches!(
            TotalAmount::parse("ten"),
            Err(AmountError::NotANumber(_))
        ));
        assert!(matches!(
            TotalAmount::parse("-5.00"),
            Err(AmountError::Negative(_))
        ));
    }

    #[test]
    fn test_callback_payload_parses_all_fields() {
        let payload = CallbackPayload::from_query(&query(&[
            ("ShoppingCartID", "42"),
            ("Success", "1"),
            ("ApprovalCode", "AB12"),
            ("Signature", "d912047e4db4cda524733a6373bb4de5"),
            ("Amount", "10,00"),
        ]))
        .unwrap();

        assert_eq!(payload.shopping_cart_id, 42);
        assert_eq!(payload.success, 1);
        assert_eq!(payload.amount_paid, Decimal::new(1000, 2));
        assert!(payload.reports_success());
    }

    #[test]
    fn test_callback_payload_rejects_missing_and_malformed() {
        let missing = CallbackPayload::from_query(&query(&[
            ("ShoppingCartID", "42"),
            ("Success", "1"),
            ("Signature", "abc"),
            ("Amount", "10,00"),
        ]));
        assert!(matches!(missing, Err(AppError::MalformedCallback { .. })));

        let not_int = CallbackPayload::from_query(&query(&[
            ("ShoppingCartID", "forty-two"),
            ("Success", "1"),
            ("ApprovalCode", "AB12"),
            ("Signature", "abc"),
            ("Amount", "10,00"),
        ]));
        assert!(matches!(not_int, Err(AppError::MalformedCallback { .. })));
    }

    #[test]
    fn test_empty_approval_code_is_not_success() {
        let payload = CallbackPayload {
            shopping_cart_id: 42,
            success: 1,
            approval_code: String::new(),
            signature: String::new(),
            amount_paid: Decimal::ZERO,
        };
        assert!(!payload.reports_success());
    }
}
