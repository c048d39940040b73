//! Cart and order model
//!
//! The shop's cart and order records, and the storage seam the payment
//! provider works through. Persistence lives behind [`CommerceStore`] so the
//! same checkout flow runs against Postgres or the in-memory store.

pub mod countries;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::payments::workflow::OrderStatus;

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub name: String,
    pub address1: String,
    pub city: String,
    pub zip_code: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
}

impl BillingAddress {
    /// Split the full name into first and last name on the first whitespace.
    pub fn split_name(&self) -> (String, String) {
        let mut bits = self.name.split_whitespace();
        let first = bits.next().unwrap_or_default().to_string();
        let last = bits.collect::<Vec<_>>().join(" ");
        (first, last)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_code: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Surcharge or discount row attached by a cart modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraCartRow {
    pub label: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub customer: Customer,
    pub billing_address: Option<BillingAddress>,
    pub items: Vec<CartItem>,
    pub currency: String,
    /// Identifier of the payment modifier the customer selected.
    pub payment_modifier: Option<String>,
    #[serde(default)]
    pub extra_rows: BTreeMap<String, ExtraCartRow>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub total: Decimal,
}

impl Cart {
    pub fn new(id: i64, customer: Customer, currency: impl Into<String>) -> Self {
        Self {
            id,
            customer,
            billing_address: None,
            items: Vec::new(),
            currency: currency.into(),
            payment_modifier: None,
            extra_rows: BTreeMap::new(),
            subtotal: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Recompute subtotal and total from the items, before any modifier runs.
    pub fn recalculate(&mut self) {
        self.extra_rows.clear();
        self.subtotal = self.items.iter().map(CartItem::line_total).sum();
        self.total = self.subtotal;
    }

    pub fn empty(&mut self) {
        self.items.clear();
        self.recalculate();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_code: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayment {
    pub id: Uuid,
    pub amount: Decimal,
    pub transaction_id: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub cart_id: i64,
    pub customer_email: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub extra: BTreeMap<String, String>,
    pub payments: Vec<OrderPayment>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Freeze the cart's current contents into a new order.
    pub fn from_cart(cart: &Cart) -> Self {
        let items = cart
            .items
            .iter()
            .map(|item| OrderItem {
                product_code: item.product_code.clone(),
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            cart_id: cart.id,
            customer_email: cart.customer.email.clone(),
            currency: cart.currency.clone(),
            subtotal: cart.subtotal,
            total: cart.total,
            status: OrderStatus::Created,
            items,
            extra: BTreeMap::new(),
            payments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn amount_paid(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn is_fully_paid(&self) -> bool {
        self.amount_paid() >= self.total
    }
}

/// Storage for carts and orders.
///
/// `checkout` must be atomic: the order with its payments is persisted and the
/// cart deleted together, or nothing changes.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    /// Check the backend can serve requests.
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_cart(&self, cart_id: i64) -> AppResult<Option<Cart>>;

    async fn save_cart(&self, cart: &Cart) -> AppResult<()>;

    /// Remove every item from the cart; returns false when the cart is unknown.
    async fn empty_cart(&self, cart_id: i64) -> AppResult<bool>;

    async fn checkout(&self, cart: &Cart, order: &Order) -> AppResult<Order>;

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>>;

    async fn update_order_status(&self, order: &Order) -> AppResult<()>;
}
