//! # Product Repository
//!
//! Product lookups plus the two atomic stock statements the ledger is built on.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                        │
//! │     SET stock = stock - :qty                                            │
//! │   WHERE id = :id AND stock >= :qty                                      │
//! │  RETURNING stock                                                        │
//! │                                                                         │
//! │  1 row  → reserved, RETURNING gives the new level (qty_after)          │
//! │  0 rows → not enough stock; nothing changed                            │
//! │                                                                         │
//! │  Check and write happen in one statement, so two requests racing for   │
//! │  the last unit can never both succeed.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock statements take a `&mut SqliteConnection` so the caller decides
//! whether they run inside a transaction or as autocommit statements.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tavola_core::{Product, ProductOption};

const PRODUCT_COLUMNS: &str =
    "id, branch_id, name, price, stock, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets every product whose id is in `ids`. Missing ids are simply absent.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Lists products, optionally limited to one branch.
    pub async fn list(&self, branch_id: Option<&str>) -> DbResult<Vec<Product>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        if let Some(branch_id) = branch_id {
            qb.push(" WHERE branch_id = ").push_bind(branch_id);
        }
        qb.push(" ORDER BY name");

        Ok(qb.build_query_as::<Product>().fetch_all(&self.pool).await?)
    }

    /// Loads the priced options of the given products.
    pub async fn options_for(&self, product_ids: &[String]) -> DbResult<Vec<ProductOption>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, product_id, attribute_name, option_name, price_modifier
             FROM product_options WHERE product_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in product_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY product_id, attribute_name, option_name");

        Ok(qb
            .build_query_as::<ProductOption>()
            .fetch_all(&self.pool)
            .await?)
    }

    // =========================================================================
    // Writes (catalog)
    // =========================================================================

    /// Inserts a product. Catalog management is external; this serves the
    /// seed binary and tests.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            "INSERT INTO products (id, branch_id, name, price, stock, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&product.id)
        .bind(&product.branch_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_option(&self, option: &ProductOption) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO product_options (id, product_id, attribute_name, option_name, price_modifier)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&option.id)
        .bind(&option.product_id)
        .bind(&option.attribute_name)
        .bind(&option.option_name)
        .bind(option.price_modifier)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Changes the catalog price. Existing orders keep their snapshot.
    pub async fn update_price(&self, id: &str, price: tavola_core::Money) -> DbResult<bool> {
        let result = sqlx::query("UPDATE products SET price = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(price)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE products SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(is_active)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Current stock level through the pool.
    pub async fn stock_of(&self, id: &str) -> DbResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        Self::current_stock(&mut conn, id).await
    }

    // =========================================================================
    // Stock statements
    // =========================================================================

    /// Decrements stock iff at least `qty` units remain.
    ///
    /// ## Returns
    /// * `Some(new_stock)` - reserved
    /// * `None` - refused (insufficient stock or unknown product)
    pub async fn try_decrement_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        qty: i64,
    ) -> DbResult<Option<i64>> {
        debug!(product_id = %product_id, qty, "Conditional stock decrement");

        let new_stock: Option<i64> = sqlx::query_scalar(
            "UPDATE products
             SET stock = stock - ?1, updated_at = ?2
             WHERE id = ?3 AND stock >= ?1
             RETURNING stock",
        )
        .bind(qty)
        .bind(Utc::now())
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(new_stock)
    }

    /// Unconditionally adds `qty` units back.
    ///
    /// ## Returns
    /// * `Some(new_stock)` - restored
    /// * `None` - the product no longer exists
    pub async fn increment_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        qty: i64,
    ) -> DbResult<Option<i64>> {
        debug!(product_id = %product_id, qty, "Stock increment");

        let new_stock: Option<i64> = sqlx::query_scalar(
            "UPDATE products
             SET stock = stock + ?1, updated_at = ?2
             WHERE id = ?3
             RETURNING stock",
        )
        .bind(qty)
        .bind(Utc::now())
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(new_stock)
    }

    /// Point-in-time stock level. Used for error messages, never for decisions.
    pub async fn current_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(stock)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
