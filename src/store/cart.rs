//! Per-user basket of (product, quantity) lines with cached line totals.
//!
//! Stock checks here are advisory snapshots: they reserve nothing, so an
//! add that succeeds today does not guarantee checkout succeeds tomorrow.
//! Cached `total_price` is recomputed from the *current* unit price on every
//! mutation of a line, so repeated additions can silently change the
//! effective unit price a line was priced at.

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cart::{Cart, CartItem, NewCart, NewCartItem};
use crate::models::product::{stock_status, Product};
use crate::pricing;
use crate::schema::{cart_items, carts, products};

/// One cart line joined with the live product row for display.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub cart_item_id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub stock: i32,
    pub stock_status: &'static str,
    pub image_path: Option<String>,
    pub quantity: i32,
    pub total_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    /// Sum of the cached per-line totals, not a live re-price.
    pub total: BigDecimal,
}

/// A cart line re-validated as belonging to the caller, paired with the live
/// product row it points at.
#[derive(Debug, Clone)]
pub struct SelectedLine {
    pub item: CartItem,
    pub product: Product,
}

fn find_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Cart>, AppError> {
    Ok(carts::table
        .filter(carts::user_id.eq(user_id))
        .first::<Cart>(conn)
        .optional()?)
}

fn find_or_create_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Cart, AppError> {
    if let Some(cart) = find_cart(conn, user_id)? {
        return Ok(cart);
    }
    let new_cart = NewCart {
        id: Uuid::new_v4(),
        user_id,
    };
    Ok(diesel::insert_into(carts::table)
        .values(&new_cart)
        .get_result::<Cart>(conn)?)
}

/// Add `quantity` of a product to the user's cart, creating the cart lazily.
///
/// The stock check compares the *incremental* quantity against live stock;
/// an existing line's quantity is not counted against stock again.
pub fn add_item(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    if quantity <= 0 {
        return Err(AppError::InvalidQuantity);
    }

    conn.transaction(|conn| {
        let product = products::table
            .find(product_id)
            .first::<Product>(conn)
            .optional()?
            .ok_or(AppError::ProductNotFound)?;
        if product.quantity < quantity {
            return Err(AppError::InsufficientStock { product_id });
        }

        let cart = find_or_create_cart(conn, user_id)?;

        let existing = cart_items::table
            .filter(cart_items::cart_id.eq(cart.id))
            .filter(cart_items::product_id.eq(product_id))
            .first::<CartItem>(conn)
            .optional()?;

        match existing {
            Some(item) => {
                let new_quantity = item.quantity + quantity;
                let new_total = pricing::line_total(&product.price, new_quantity);
                diesel::update(cart_items::table.find(item.id))
                    .set((
                        cart_items::quantity.eq(new_quantity),
                        cart_items::total_price.eq(new_total),
                    ))
                    .execute(conn)?;
            }
            None => {
                diesel::insert_into(cart_items::table)
                    .values(&NewCartItem {
                        id: Uuid::new_v4(),
                        cart_id: cart.id,
                        product_id,
                        quantity,
                        total_price: pricing::line_total(&product.price, quantity),
                    })
                    .execute(conn)?;
            }
        }
        Ok(())
    })
}

pub fn update_quantity(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    new_quantity: i32,
) -> Result<(), AppError> {
    if new_quantity <= 0 {
        return Err(AppError::InvalidQuantity);
    }

    conn.transaction(|conn| {
        let cart = find_cart(conn, user_id)?.ok_or(AppError::CartNotFound)?;

        let item = cart_items::table
            .filter(cart_items::cart_id.eq(cart.id))
            .filter(cart_items::product_id.eq(product_id))
            .first::<CartItem>(conn)
            .optional()?
            .ok_or(AppError::ItemNotFound)?;

        let product = products::table
            .find(product_id)
            .first::<Product>(conn)
            .optional()?
            .ok_or(AppError::ProductNotFound)?;
        if new_quantity > product.quantity {
            return Err(AppError::InsufficientStock { product_id });
        }

        diesel::update(cart_items::table.find(item.id))
            .set((
                cart_items::quantity.eq(new_quantity),
                cart_items::total_price.eq(pricing::line_total(&product.price, new_quantity)),
            ))
            .execute(conn)?;
        Ok(())
    })
}

/// Remove a product's line from the cart. Not idempotent: a missing line is
/// `ItemNotFound`, never a silent no-op.
pub fn remove_item(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<(), AppError> {
    let cart = find_cart(conn, user_id)?.ok_or(AppError::CartNotFound)?;

    let deleted = diesel::delete(
        cart_items::table
            .filter(cart_items::cart_id.eq(cart.id))
            .filter(cart_items::product_id.eq(product_id)),
    )
    .execute(conn)?;

    if deleted == 0 {
        return Err(AppError::ItemNotFound);
    }
    Ok(())
}

/// All of the user's cart lines joined with live product data, plus the
/// grand total over the cached line totals.
pub fn view_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<CartView, AppError> {
    let rows: Vec<(CartItem, String, BigDecimal, i32, Option<String>)> = cart_items::table
        .inner_join(carts::table)
        .inner_join(products::table)
        .filter(carts::user_id.eq(user_id))
        .select((
            CartItem::as_select(),
            products::name,
            products::price,
            products::quantity,
            products::image_path,
        ))
        .load(conn)?;

    if rows.is_empty() {
        return Err(AppError::CartEmpty);
    }

    let mut total = BigDecimal::from(0);
    let items = rows
        .into_iter()
        .map(|(item, name, price, stock, image_path)| {
            total += &item.total_price;
            CartLineView {
                cart_item_id: item.id,
                cart_id: item.cart_id,
                product_id: item.product_id,
                product_name: name,
                unit_price: price,
                stock,
                stock_status: stock_status(stock),
                image_path,
                quantity: item.quantity,
                total_price: item.total_price,
            }
        })
        .collect();

    Ok(CartView { items, total })
}

/// Re-validate that every id in `line_ids` names a cart line of `user_id`,
/// then price the selection from *current* product prices and cached
/// quantities. Read-only; the cached line totals are deliberately ignored.
pub fn price_selected_lines(
    conn: &mut PgConnection,
    user_id: Uuid,
    line_ids: &[Uuid],
) -> Result<(BigDecimal, Vec<SelectedLine>), AppError> {
    if line_ids.is_empty() {
        return Err(AppError::InvalidSelection {
            invalid_ids: vec![],
        });
    }

    let rows: Vec<(CartItem, Product)> = cart_items::table
        .inner_join(carts::table)
        .inner_join(products::table)
        .filter(carts::user_id.eq(user_id))
        .filter(cart_items::id.eq_any(line_ids))
        .select((CartItem::as_select(), Product::as_select()))
        .load(conn)?;

    let invalid_ids: Vec<Uuid> = line_ids
        .iter()
        .filter(|id| !rows.iter().any(|(item, _)| item.id == **id))
        .copied()
        .collect();
    if !invalid_ids.is_empty() {
        return Err(AppError::InvalidSelection { invalid_ids });
    }

    let total = pricing::order_subtotal(rows.iter().map(|(item, p)| (&p.price, item.quantity)));
    let lines = rows
        .into_iter()
        .map(|(item, product)| SelectedLine { item, product })
        .collect();
    Ok((total, lines))
}
