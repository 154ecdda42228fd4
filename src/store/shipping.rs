//! Attaches a shipping destination to an order and commits the inventory
//! decrement — the only point in the pipeline where stock actually drops.
//!
//! Address resolution, the order update and every per-item decrement run in
//! one transaction; a failed decrement rolls back the address link too, so
//! two linkages racing on the same product serialize on its row lock and
//! the loser leaves no trace.

use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::OrderItem;
use crate::models::outbox::EVENT_ORDER_SHIPPED;
use crate::models::shipping::{NewShippingAddress, ShippingAddress, ShippingData};
use crate::schema::{order_items, orders, shipping_addresses};
use crate::store::{inventory, record_order_event};

#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub shipping_id: Uuid,
    /// Whether an identical address already existed and was reused.
    pub existing: bool,
}

/// Resolve the user's address by exact field match, inserting only when no
/// identical row exists.
fn resolve_address(
    conn: &mut PgConnection,
    user_id: Uuid,
    data: &ShippingData,
) -> Result<(Uuid, bool), AppError> {
    let existing: Option<Uuid> = shipping_addresses::table
        .filter(shipping_addresses::user_id.eq(user_id))
        .filter(shipping_addresses::full_name.eq(&data.full_name))
        .filter(shipping_addresses::address_line.eq(&data.address_line))
        .filter(shipping_addresses::city.eq(&data.city))
        .filter(shipping_addresses::state.eq(&data.state))
        .filter(shipping_addresses::zip_code.eq(&data.zip_code))
        .filter(shipping_addresses::country.eq(&data.country))
        .filter(shipping_addresses::mobile_number.eq(&data.mobile_number))
        .filter(shipping_addresses::email.eq(&data.email))
        .select(shipping_addresses::id)
        .first(conn)
        .optional()?;

    if let Some(id) = existing {
        return Ok((id, true));
    }

    let id = Uuid::new_v4();
    diesel::insert_into(shipping_addresses::table)
        .values(&NewShippingAddress {
            id,
            user_id,
            full_name: data.full_name.clone(),
            address_line: data.address_line.clone(),
            city: data.city.clone(),
            state: data.state.clone(),
            zip_code: data.zip_code.clone(),
            country: data.country.clone(),
            mobile_number: data.mobile_number.clone(),
            email: data.email.clone(),
        })
        .execute(conn)?;
    Ok((id, false))
}

pub fn attach_shipping(
    conn: &mut PgConnection,
    user_id: Uuid,
    order_id: Uuid,
    data: &ShippingData,
) -> Result<AttachOutcome, AppError> {
    conn.transaction(|conn| {
        let (shipping_id, existing) = resolve_address(conn, user_id, data)?;

        let updated = diesel::update(orders::table.find(order_id))
            .set((
                orders::shipping_id.eq(shipping_id),
                orders::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::OrderNotFound);
        }

        let items: Vec<OrderItem> = order_items::table
            .filter(order_items::order_id.eq(order_id))
            .load(conn)?;
        if items.is_empty() {
            return Err(AppError::OrderNotFound);
        }

        // Decrement commits the inventory for the whole order; any shortfall
        // rolls back the address link and every prior decrement.
        for item in &items {
            inventory::decrement(conn, item.product_id, item.quantity)?;
        }

        record_order_event(
            conn,
            order_id,
            EVENT_ORDER_SHIPPED,
            json!({
                "order_id": order_id,
                "user_id": user_id,
                "shipping_id": shipping_id,
                "items": items
                    .iter()
                    .map(|i| json!({ "product_id": i.product_id, "quantity": i.quantity }))
                    .collect::<Vec<_>>(),
            }),
        )?;

        log::info!("order {order_id} linked to shipping {shipping_id}, stock committed");

        Ok(AttachOutcome {
            shipping_id,
            existing,
        })
    })
}

pub fn list_addresses(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<ShippingAddress>, AppError> {
    Ok(shipping_addresses::table
        .filter(shipping_addresses::user_id.eq(user_id))
        .order(shipping_addresses::created_at.asc())
        .load(conn)?)
}

pub fn delete_address(conn: &mut PgConnection, shipping_id: Uuid) -> Result<(), AppError> {
    let deleted = diesel::delete(shipping_addresses::table.find(shipping_id)).execute(conn)?;
    if deleted == 0 {
        return Err(AppError::ShippingNotFound);
    }
    Ok(())
}
