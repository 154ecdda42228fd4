//! Authoritative per-product stock counter.
//!
//! Reads that precede a write go through [`lock_product`], which takes a
//! row-level `FOR UPDATE` lock so concurrent decrements on the same product
//! serialize; the loser re-reads post-lock stock and may legitimately fail
//! with `InsufficientStock` even if it passed an earlier advisory check.

use diesel::prelude::*;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::product::Product;
use crate::schema::products;

pub fn get_stock(conn: &mut PgConnection, product_id: Uuid) -> Result<i32, AppError> {
    products::table
        .find(product_id)
        .select(products::quantity)
        .first(conn)
        .optional()?
        .ok_or(AppError::ProductNotFound)
}

pub fn set_stock(conn: &mut PgConnection, product_id: Uuid, quantity: i32) -> Result<(), AppError> {
    if quantity < 0 {
        return Err(AppError::InvalidQuantity);
    }
    let updated = diesel::update(products::table.find(product_id))
        .set(products::quantity.eq(quantity))
        .execute(conn)?;
    if updated == 0 {
        return Err(AppError::ProductNotFound);
    }
    Ok(())
}

/// Read the product row under a `FOR UPDATE` lock. Callers must already be
/// inside a transaction; the lock is held until that transaction ends.
pub fn lock_product(conn: &mut PgConnection, product_id: Uuid) -> Result<Product, AppError> {
    products::table
        .find(product_id)
        .for_update()
        .first::<Product>(conn)
        .optional()?
        .ok_or(AppError::ProductNotFound)
}

/// Decrement stock by `amount`, failing without a write if the post-lock
/// stock is smaller. Returns the remaining quantity.
pub fn decrement(conn: &mut PgConnection, product_id: Uuid, amount: i32) -> Result<i32, AppError> {
    let product = lock_product(conn, product_id)?;
    let remaining = product.quantity - amount;
    if remaining < 0 {
        return Err(AppError::InsufficientStock { product_id });
    }
    diesel::update(products::table.find(product_id))
        .set(products::quantity.eq(remaining))
        .execute(conn)?;
    Ok(remaining)
}
