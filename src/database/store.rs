use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::commerce::{Cart, CommerceStore, Order};
use crate::database::cart_repository::CartRepository;
use crate::database::order_repository::OrderRepository;
use crate::database::health_check;
use crate::database::transaction::DatabaseTransaction;
use crate::error::AppResult;

/// Postgres-backed [`CommerceStore`]
#[derive(Clone)]
pub struct PgCommerceStore {
    pool: PgPool,
    carts: CartRepository,
    orders: OrderRepository,
}

impl PgCommerceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CommerceStore for PgCommerceStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn find_cart(&self, cart_id: i64) -> AppResult<Option<Cart>> {
        Ok(self.carts.find_by_id(cart_id).await?)
    }

    async fn save_cart(&self, cart: &Cart) -> AppResult<()> {
        Ok(self.carts.save(cart).await?)
    }

    async fn empty_cart(&self, cart_id: i64) -> AppResult<bool> {
        Ok(self.carts.empty(cart_id).await?)
    }

    async fn checkout(&self, cart: &Cart, order: &Order) -> AppResult<Order> {
        let mut tx = DatabaseTransaction::begin(&self.pool).await?;

        OrderRepository::insert(tx.conn()?, order).await?;
        CartRepository::delete(tx.conn()?, cart.id).await?;

        tx.commit().await?;

        info!(order_id = %order.id, cart_id = cart.id, "Order created from cart");
        Ok(order.clone())
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.orders.find_by_id(order_id).await?)
    }

    async fn update_order_status(&self, order: &Order) -> AppResult<()> {
        Ok(self.orders.update_status(order).await?)
    }
}
