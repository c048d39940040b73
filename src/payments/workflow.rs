//! Callback verdicts and order status transitions
//!
//! Both are explicit state enums; every transition is guarded and an illegal
//! one is reported as a [`TransitionError`].

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::commerce::{Order, OrderPayment};
use crate::error::{AppError, AppResult};
use crate::payments::signature;
use crate::payments::types::CallbackPayload;
use crate::payments::PAYMENT_NAMESPACE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot {transition} an order in status '{from}'")]
    IllegalOrderTransition {
        transition: &'static str,
        from: OrderStatus,
    },

    #[error("Order {order_id} is not fully paid")]
    NotFullyPaid { order_id: Uuid },

    #[error("Callback already verified as {0:?}")]
    CallbackAlreadyVerified(CallbackState),

    #[error("Unknown order status '{0}'")]
    UnknownStatus(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    #[serde(rename = "paid_with_wspay")]
    PaidWithWsPay,
    PaymentConfirmed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PaidWithWsPay => "paid_with_wspay",
            Self::PaymentConfirmed => "payment_confirmed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::PaidWithWsPay => "Paid using WSPay",
            Self::PaymentConfirmed => "Payment confirmed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "paid_with_wspay" => Ok(Self::PaidWithWsPay),
            "payment_confirmed" => Ok(Self::PaymentConfirmed),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }
}

impl Order {
    /// `created -> paid_with_wspay`: record the gateway payment on the order.
    pub fn add_wspay_payment(
        &mut self,
        transaction_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> AppResult<&OrderPayment> {
        if self.status != OrderStatus::Created {
            return Err(TransitionError::IllegalOrderTransition {
                transition: "add WSPay payment to",
                from: self.status,
            }
            .into());
        }
        if self.currency != currency {
            return Err(AppError::currency_mismatch(currency, self.currency.clone()));
        }

        self.payments.push(OrderPayment {
            id: Uuid::new_v4(),
            amount,
            transaction_id: transaction_id.to_string(),
            payment_method: PAYMENT_NAMESPACE.to_string(),
            created_at: Utc::now(),
        });
        self.status = OrderStatus::PaidWithWsPay;
        Ok(&self.payments[self.payments.len() - 1])
    }

    /// `paid_with_wspay -> payment_confirmed`, only once fully paid.
    pub fn acknowledge_wspay_payment(&mut self) -> Result<(), TransitionError> {
        if self.status != OrderStatus::PaidWithWsPay {
            return Err(TransitionError::IllegalOrderTransition {
                transition: "acknowledge WSPay payment of",
                from: self.status,
            });
        }
        if !self.is_fully_paid() {
            return Err(TransitionError::NotFullyPaid { order_id: self.id });
        }
        self.status = OrderStatus::PaymentConfirmed;
        Ok(())
    }
}

/// Verdict on a single gateway return callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackState {
    Pending,
    VerifiedSuccess,
    VerifiedFailure,
}

impl CallbackState {
    /// `pending -> verified_success | verified_failure`.
    ///
    /// Success needs `Success == 1`, a non-empty approval code and a matching
    /// signature; anything else is a failure.
    pub fn verify(
        self,
        payload: &CallbackPayload,
        shop_id: &str,
        secret_key: &str,
    ) -> Result<Self, TransitionError> {
        if self != Self::Pending {
            return Err(TransitionError::CallbackAlreadyVerified(self));
        }

        let expected = signature::callback_signature(
            shop_id,
            secret_key,
            payload.shopping_cart_id,
            payload.success,
            &payload.approval_code,
        );
        let signature_ok = signature::signatures_match(&expected, &payload.signature);

        if payload.reports_success() && signature_ok {
            Ok(Self::VerifiedSuccess)
        } else {
            Ok(Self::VerifiedFailure)
        }
    }
}
