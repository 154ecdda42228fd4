//! Post-creation order mutations and the admin-facing order queries.
//!
//! Status and payment method are free-form labels with no transition graph;
//! any string may follow any other. Mutations report `OrderNotFound` when no
//! row is affected instead of leaning on affected-row counts at the caller.

use diesel::prelude::*;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::{Order, OrderItem};
use crate::models::product::Product;
use crate::models::shipping::ShippingAddress;
use crate::schema::{order_items, orders, products, shipping_addresses};

#[derive(Debug, Clone)]
pub struct OrderDetailItem {
    pub item: OrderItem,
    /// Live product row; price and stock are read at display time, the order
    /// item itself carries no price snapshot.
    pub product: Product,
}

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub address: ShippingAddress,
    pub items: Vec<OrderDetailItem>,
}

pub fn set_status(conn: &mut PgConnection, order_id: Uuid, status: &str) -> Result<(), AppError> {
    let updated = diesel::update(orders::table.find(order_id))
        .set((
            orders::status.eq(status),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(AppError::OrderNotFound);
    }
    Ok(())
}

pub fn set_payment_method(
    conn: &mut PgConnection,
    order_id: Uuid,
    payment_method: &str,
) -> Result<(), AppError> {
    let updated = diesel::update(orders::table.find(order_id))
        .set((
            orders::payment_method.eq(payment_method),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(AppError::OrderNotFound);
    }
    Ok(())
}

/// Full joined detail for one order. Keeps the storefront's inner-join
/// shape: an order with no shipping linkage yet, or with no items, reports
/// `OrderNotFound` rather than a partial view.
pub fn order_details(conn: &mut PgConnection, order_id: Uuid) -> Result<OrderDetails, AppError> {
    let order: Order = orders::table
        .find(order_id)
        .first(conn)
        .optional()?
        .ok_or(AppError::OrderNotFound)?;

    let shipping_id = order.shipping_id.ok_or(AppError::OrderNotFound)?;
    let address: ShippingAddress = shipping_addresses::table.find(shipping_id).first(conn)?;

    let rows: Vec<(OrderItem, Product)> = order_items::table
        .inner_join(products::table)
        .filter(order_items::order_id.eq(order_id))
        .select((OrderItem::as_select(), Product::as_select()))
        .load(conn)?;
    if rows.is_empty() {
        return Err(AppError::OrderNotFound);
    }

    Ok(OrderDetails {
        order,
        address,
        items: rows
            .into_iter()
            .map(|(item, product)| OrderDetailItem { item, product })
            .collect(),
    })
}

/// Ids of orders whose shipping linkage is complete, oldest first.
pub fn shipped_order_ids(conn: &mut PgConnection) -> Result<Vec<Uuid>, AppError> {
    Ok(orders::table
        .filter(orders::shipping_id.is_not_null())
        .order(orders::created_at.asc())
        .select(orders::id)
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::*;
    use crate::models::shipping::ShippingData;
    use crate::store::checkout::buy_now;
    use crate::store::shipping::attach_shipping;
    use crate::store::testing::{seed_product, setup_db};

    fn sample_address() -> ShippingData {
        ShippingData {
            full_name: "Kasun Silva".to_string(),
            address_line: "7 Hill Street".to_string(),
            city: "Kandy".to_string(),
            state: "Central".to_string(),
            zip_code: "20000".to_string(),
            country: "Sri Lanka".to_string(),
            mobile_number: "+94719876543".to_string(),
            email: "kasun@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn set_status_updates_row_and_is_idempotent() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Hall table", "110.00", 5);
        let placed = buy_now(&mut conn, user_id, product_id, 1, None).expect("buy now");

        set_status(&mut conn, placed.order_id, "Shipped").expect("set status");
        set_status(&mut conn, placed.order_id, "Shipped").expect("set status again");

        let order: Order = orders::table
            .find(placed.order_id)
            .first(&mut conn)
            .expect("order row");
        assert_eq!(order.status, "Shipped");
    }

    #[tokio::test]
    async fn set_status_fails_for_unknown_order() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");

        let err = set_status(&mut conn, Uuid::new_v4(), "Pending").unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound));
    }

    #[tokio::test]
    async fn set_payment_method_updates_label() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Shoe rack", "55.00", 5);
        let placed = buy_now(&mut conn, user_id, product_id, 1, None).expect("buy now");

        set_payment_method(&mut conn, placed.order_id, "Bank Transfer").expect("set method");

        let order: Order = orders::table
            .find(placed.order_id)
            .first(&mut conn)
            .expect("order row");
        assert_eq!(order.payment_method, "Bank Transfer");
    }

    #[tokio::test]
    async fn order_details_joins_shipping_items_and_live_products() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Writing desk", "220.00", 5);
        let placed = buy_now(&mut conn, user_id, product_id, 2, None).expect("buy now");
        attach_shipping(&mut conn, user_id, placed.order_id, &sample_address()).expect("attach");

        let details = order_details(&mut conn, placed.order_id).expect("details");

        assert_eq!(details.order.id, placed.order_id);
        assert_eq!(details.address.city, "Kandy");
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].item.quantity, 2);
        assert_eq!(details.items[0].product.name, "Writing desk");
        // Stock shown is live, post-decrement.
        assert_eq!(details.items[0].product.quantity, 3);
    }

    #[tokio::test]
    async fn order_details_hides_orders_without_shipping_linkage() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Plant stand", "35.00", 5);
        let placed = buy_now(&mut conn, user_id, product_id, 1, None).expect("buy now");

        let err = order_details(&mut conn, placed.order_id).unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound));
    }

    #[tokio::test]
    async fn shipped_order_ids_lists_only_linked_orders() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Bean bag", "70.00", 10);

        let shipped = buy_now(&mut conn, user_id, product_id, 1, None).expect("buy now");
        let _pending = buy_now(&mut conn, user_id, product_id, 1, None).expect("buy now");
        attach_shipping(&mut conn, user_id, shipped.order_id, &sample_address()).expect("attach");

        let ids = shipped_order_ids(&mut conn).expect("ids");
        assert_eq!(ids, vec![shipped.order_id]);
    }
}
