use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::commerce::{BillingAddress, Cart, CartItem, Customer};
use crate::database::error::{DatabaseError, DbResult};
use crate::database::transaction::DatabaseTransaction;

/// Cart header row
#[derive(Debug, Clone, FromRow)]
struct CartRow {
    id: i64,
    customer_email: String,
    customer_phone: String,
    billing_address: Option<Json<BillingAddress>>,
    currency: String,
    payment_modifier: Option<String>,
}

/// Cart line row
#[derive(Debug, Clone, FromRow)]
struct CartItemRow {
    product_code: String,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl CartItemRow {
    fn into_item(self) -> DbResult<CartItem> {
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| DatabaseError::corrupt_row("cart_items", "negative quantity"))?;
        Ok(CartItem {
            product_code: self.product_code,
            product_name: self.product_name,
            quantity,
            unit_price: self.unit_price,
        })
    }
}

/// Repository for carts and their items
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load a cart with its items; totals are recomputed from the items
    pub async fn find_by_id(&self, cart_id: i64) -> DbResult<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, customer_email, customer_phone, billing_address, currency, payment_modifier
             FROM carts WHERE id = $1",
        )
        .bind(cart_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, CartItemRow>(
            "SELECT product_code, product_name, quantity, unit_price
             FROM cart_items WHERE cart_id = $1 ORDER BY id ASC",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .into_iter()
        .map(CartItemRow::into_item)
        .collect::<DbResult<Vec<_>>>()?;

        let mut cart = Cart::new(
            row.id,
            Customer {
                email: row.customer_email,
                phone_number: row.customer_phone,
            },
            row.currency,
        );
        cart.billing_address = row.billing_address.map(|Json(address)| address);
        cart.payment_modifier = row.payment_modifier;
        cart.items = items;
        cart.recalculate();
        Ok(Some(cart))
    }

    /// Upsert the cart header and replace its items
    pub async fn save(&self, cart: &Cart) -> DbResult<()> {
        let mut tx = DatabaseTransaction::begin(&self.pool).await?;

        sqlx::query(
            "INSERT INTO carts (id, customer_email, customer_phone, billing_address, currency, payment_modifier, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             ON CONFLICT (id) DO UPDATE
             SET customer_email = EXCLUDED.customer_email,
                 customer_phone = EXCLUDED.customer_phone,
                 billing_address = EXCLUDED.billing_address,
                 currency = EXCLUDED.currency,
                 payment_modifier = EXCLUDED.payment_modifier,
                 updated_at = NOW()",
        )
        .bind(cart.id)
        .bind(&cart.customer.email)
        .bind(&cart.customer.phone_number)
        .bind(cart.billing_address.as_ref().map(Json))
        .bind(&cart.currency)
        .bind(&cart.payment_modifier)
        .execute(tx.conn()?)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Self::clear_items(tx.conn()?, cart.id).await?;

        for item in &cart.items {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| DatabaseError::corrupt_row("cart_items", "quantity out of range"))?;
            sqlx::query(
                "INSERT INTO cart_items (cart_id, product_code, product_name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(cart.id)
            .bind(&item.product_code)
            .bind(&item.product_name)
            .bind(quantity)
            .bind(item.unit_price)
            .execute(tx.conn()?)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        }

        tx.commit().await
    }

    /// Remove all items; false when the cart does not exist
    pub async fn empty(&self, cart_id: i64) -> DbResult<bool> {
        let mut tx = DatabaseTransaction::begin(&self.pool).await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM carts WHERE id = $1)")
            .bind(cart_id)
            .fetch_one(tx.conn()?)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        if exists {
            Self::clear_items(tx.conn()?, cart_id).await?;
        }
        tx.commit().await?;
        Ok(exists)
    }

    /// Delete the cart inside a caller's transaction
    pub async fn delete(conn: &mut PgConnection, cart_id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id)
            .execute(conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Cart", cart_id));
        }
        Ok(())
    }

    async fn clear_items(conn: &mut PgConnection, cart_id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }
}
