//! `products` entity set.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use crate::data::context::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

/// Input for [`ProductSet::insert`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
}

/// Queries over the `products` table.
#[derive(Debug)]
pub struct ProductSet<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductSet<'a> {
    pub(crate) fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn all(&self) -> Result<Vec<Product>, DataError> {
        let products = sqlx::query_as::<_, Product>("SELECT id, name, price FROM products ORDER BY id")
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Product>, DataError> {
        let product =
            sqlx::query_as::<_, Product>("SELECT id, name, price FROM products WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(product)
    }

    pub async fn insert(&self, product: &NewProduct) -> Result<Product, DataError> {
        let result = sqlx::query("INSERT INTO products (name, price) VALUES (?, ?)")
            .bind(&product.name)
            .bind(product.price)
            .execute(self.pool)
            .await?;

        Ok(Product {
            id: result.last_insert_rowid(),
            name: product.name.clone(),
            price: product.price,
        })
    }

    pub async fn count(&self) -> Result<i64, DataError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
