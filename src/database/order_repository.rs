use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::commerce::{Order, OrderItem, OrderPayment};
use crate::database::error::{DatabaseError, DbResult};
use crate::database::transaction::DatabaseTransaction;
use crate::payments::workflow::OrderStatus;

/// Order row; items and extra data are stored as JSONB
#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: Uuid,
    cart_id: i64,
    customer_email: String,
    currency: String,
    subtotal: Decimal,
    total: Decimal,
    status: String,
    items: Json<Vec<OrderItem>>,
    extra: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct OrderPaymentRow {
    id: Uuid,
    amount: Decimal,
    transaction_id: String,
    payment_method: String,
    created_at: DateTime<Utc>,
}

impl From<OrderPaymentRow> for OrderPayment {
    fn from(row: OrderPaymentRow) -> Self {
        Self {
            id: row.id,
            amount: row.amount,
            transaction_id: row.transaction_id,
            payment_method: row.payment_method,
            created_at: row.created_at,
        }
    }
}

impl OrderRow {
    fn into_order(self, payments: Vec<OrderPayment>) -> DbResult<Order> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| DatabaseError::corrupt_row("orders", e))?;

        Ok(Order {
            id: self.id,
            cart_id: self.cart_id,
            customer_email: self.customer_email,
            currency: self.currency,
            subtotal: self.subtotal,
            total: self.total,
            status,
            items: self.items.0,
            extra: self.extra.0,
            payments,
            created_at: self.created_at,
        })
    }
}

/// Repository for orders and their payments
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, order_id: Uuid) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, cart_id, customer_email, currency, subtotal, total, status, items, extra, created_at
             FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payments = sqlx::query_as::<_, OrderPaymentRow>(
            "SELECT id, amount, transaction_id, payment_method, created_at
             FROM order_payments WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .into_iter()
        .map(OrderPayment::from)
        .collect();

        row.into_order(payments).map(Some)
    }

    /// Insert the order and its payments inside a caller's transaction
    pub async fn insert(conn: &mut PgConnection, order: &Order) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO orders (id, cart_id, customer_email, currency, subtotal, total, status, items, extra, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(order.id)
        .bind(order.cart_id)
        .bind(&order.customer_email)
        .bind(&order.currency)
        .bind(order.subtotal)
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(Json(&order.items))
        .bind(Json(&order.extra))
        .bind(order.created_at)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        for payment in &order.payments {
            sqlx::query(
                "INSERT INTO order_payments (id, order_id, amount, transaction_id, payment_method, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(payment.id)
            .bind(order.id)
            .bind(payment.amount)
            .bind(&payment.transaction_id)
            .bind(&payment.payment_method)
            .bind(payment.created_at)
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        }

        Ok(())
    }

    /// Persist a status change and the order's extra data
    pub async fn update_status(&self, order: &Order) -> DbResult<()> {
        let mut tx = DatabaseTransaction::begin(&self.pool).await?;

        let result = sqlx::query(
            "UPDATE orders SET status = $2, extra = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(Json(&order.extra))
        .execute(tx.conn()?)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Order", order.id));
        }

        tx.commit().await
    }
}
