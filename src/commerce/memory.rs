//! In-memory commerce store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::commerce::{Cart, CommerceStore, Order};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct Inner {
    carts: HashMap<i64, Cart>,
    orders: HashMap<Uuid, Order>,
}

/// Carts and orders held in process memory.
///
/// Both maps sit behind one lock so checkout is a single critical section.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_cart(&self, cart: Cart) {
        self.inner.write().await.carts.insert(cart.id, cart);
    }

    pub async fn cart_count(&self) -> usize {
        self.inner.read().await.carts.len()
    }

    pub async fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.inner.read().await.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_cart(&self, cart_id: i64) -> AppResult<Option<Cart>> {
        Ok(self.inner.read().await.carts.get(&cart_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> AppResult<()> {
        self.inner.write().await.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn empty_cart(&self, cart_id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.carts.get_mut(&cart_id) {
            Some(cart) => {
                cart.empty();
                debug!(cart_id, "Cart emptied");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn checkout(&self, cart: &Cart, order: &Order) -> AppResult<Order> {
        let mut inner = self.inner.write().await;
        if inner.carts.remove(&cart.id).is_none() {
            return Err(AppError::not_found("Cart", cart.id));
        }
        inner.orders.insert(order.id, order.clone());
        debug!(cart_id = cart.id, order_id = %order.id, "Cart converted to order");
        Ok(order.clone())
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&order_id).cloned())
    }

    async fn update_order_status(&self, order: &Order) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        match inner.orders.get_mut(&order.id) {
            Some(stored) => {
                stored.status = order.status;
                stored.extra = order.extra.clone();
                Ok(())
            }
            None => Err(AppError::not_found("Order", order.id)),
        }
    }
}
