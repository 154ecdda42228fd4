//! Converts a direct buy or a selection of cart lines into a durable
//! Order + OrderItems, atomically or not at all.
//!
//! Stock is only *checked* here, under row locks; the decrement itself
//! happens at shipping linkage. An order can therefore sit `"Pending"`
//! without holding any reservation on stock. Cart lines are not cleared by
//! checkout.

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::{NewOrder, NewOrderItem, DEFAULT_PAYMENT_METHOD, STATUS_PENDING};
use crate::models::outbox::EVENT_ORDER_PLACED;
use crate::pricing;
use crate::schema::{order_items, orders};
use crate::store::{cart, inventory, record_order_event};

#[derive(Debug, Clone)]
pub struct PlacedItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub subtotal: BigDecimal,
    pub total_amount: BigDecimal,
    pub items: Vec<PlacedItem>,
}

fn insert_order(
    conn: &mut PgConnection,
    user_id: Uuid,
    total_quantity: i32,
    subtotal: &BigDecimal,
    total_amount: &BigDecimal,
    payment_method: Option<String>,
) -> Result<Uuid, AppError> {
    let order_id = Uuid::new_v4();
    diesel::insert_into(orders::table)
        .values(&NewOrder {
            id: order_id,
            user_id,
            status: STATUS_PENDING.to_string(),
            total_quantity,
            subtotal: subtotal.clone(),
            total_amount: total_amount.clone(),
            payment_method: payment_method.unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            shipping_id: None,
        })
        .execute(conn)?;
    Ok(order_id)
}

/// Direct buy of a single product with an explicit quantity. The order's
/// `total_quantity` is fixed at 1: one product type per direct buy.
pub fn buy_now(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    payment_method: Option<String>,
) -> Result<PlacedOrder, AppError> {
    if quantity <= 0 {
        return Err(AppError::InvalidQuantity);
    }

    conn.transaction(|conn| {
        let product = inventory::lock_product(conn, product_id)?;
        if product.quantity < quantity {
            return Err(AppError::InsufficientStock { product_id });
        }

        let subtotal = pricing::line_total(&product.price, quantity);
        let total_amount = pricing::order_total(&subtotal);
        let order_id = insert_order(conn, user_id, 1, &subtotal, &total_amount, payment_method)?;

        diesel::insert_into(order_items::table)
            .values(&NewOrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id,
                quantity,
            })
            .execute(conn)?;

        record_order_event(
            conn,
            order_id,
            EVENT_ORDER_PLACED,
            json!({
                "order_id": order_id,
                "user_id": user_id,
                "subtotal": subtotal.to_string(),
                "total_amount": total_amount.to_string(),
                "items": [{ "product_id": product_id, "quantity": quantity }],
            }),
        )?;

        log::info!("order {order_id} placed (buy-now) by user {user_id}");

        Ok(PlacedOrder {
            order_id,
            subtotal,
            total_amount,
            items: vec![PlacedItem {
                product_id,
                product_name: product.name,
                quantity,
            }],
        })
    })
}

/// Checkout of an explicit selection of the user's cart lines.
///
/// Ownership re-validation, the per-product stock re-check (under row
/// locks) and all inserts run in one transaction: if any line would drive
/// stock negative the whole checkout rolls back and no order exists.
pub fn checkout_cart(
    conn: &mut PgConnection,
    user_id: Uuid,
    line_ids: &[Uuid],
    payment_method: Option<String>,
) -> Result<PlacedOrder, AppError> {
    conn.transaction(|conn| {
        let (subtotal, lines) = cart::price_selected_lines(conn, user_id, line_ids)?;

        for line in &lines {
            let locked = inventory::lock_product(conn, line.product.id)?;
            if locked.quantity - line.item.quantity < 0 {
                return Err(AppError::InsufficientStock {
                    product_id: line.product.id,
                });
            }
        }

        let total_amount = pricing::order_total(&subtotal);
        let total_quantity: i32 = lines.iter().map(|l| l.item.quantity).sum();
        let order_id = insert_order(
            conn,
            user_id,
            total_quantity,
            &subtotal,
            &total_amount,
            payment_method,
        )?;

        let new_items: Vec<NewOrderItem> = lines
            .iter()
            .map(|l| NewOrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: l.product.id,
                quantity: l.item.quantity,
            })
            .collect();
        diesel::insert_into(order_items::table)
            .values(&new_items)
            .execute(conn)?;

        let item_payloads: Vec<serde_json::Value> = lines
            .iter()
            .map(|l| json!({ "product_id": l.product.id, "quantity": l.item.quantity }))
            .collect();
        record_order_event(
            conn,
            order_id,
            EVENT_ORDER_PLACED,
            json!({
                "order_id": order_id,
                "user_id": user_id,
                "subtotal": subtotal.to_string(),
                "total_amount": total_amount.to_string(),
                "items": item_payloads,
            }),
        )?;

        log::info!(
            "order {order_id} placed (checkout, {} lines) by user {user_id}",
            lines.len()
        );

        Ok(PlacedOrder {
            order_id,
            subtotal,
            total_amount,
            items: lines
                .into_iter()
                .map(|l| PlacedItem {
                    product_id: l.product.id,
                    product_name: l.product.name,
                    quantity: l.item.quantity,
                })
                .collect(),
        })
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::*;
    use crate::models::order::Order;
    use crate::models::outbox::NotificationEvent;
    use crate::schema::{notification_outbox, products};
    use crate::store::cart::{add_item, view_cart};
    use crate::store::inventory::get_stock;
    use crate::store::testing::{seed_product, setup_db};

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn order_count(conn: &mut PgConnection) -> i64 {
        orders::table.count().get_result(conn).expect("count")
    }

    fn item_count(conn: &mut PgConnection) -> i64 {
        order_items::table.count().get_result(conn).expect("count")
    }

    #[tokio::test]
    async fn buy_now_creates_pending_order_with_shipping_fee() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Oak table", "100.00", 5);

        let placed = buy_now(&mut conn, user_id, product_id, 2, None).expect("buy now");

        assert_eq!(placed.subtotal, dec("200.00"));
        assert_eq!(placed.total_amount, dec("2200.00"));
        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].product_name, "Oak table");

        let order: Order = orders::table
            .find(placed.order_id)
            .first(&mut conn)
            .expect("order row");
        assert_eq!(order.status, "Pending");
        assert_eq!(order.payment_method, "Credit Card");
        assert_eq!(order.total_quantity, 1);
        assert!(order.shipping_id.is_none());

        // Checkout reserves nothing; stock is untouched until shipping.
        assert_eq!(get_stock(&mut conn, product_id).expect("stock"), 5);
    }

    #[tokio::test]
    async fn buy_now_honours_caller_payment_method() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let product_id = seed_product(&mut conn, "Nightstand", "60.00", 5);

        let placed = buy_now(
            &mut conn,
            Uuid::new_v4(),
            product_id,
            1,
            Some("Cash on Delivery".to_string()),
        )
        .expect("buy now");

        let order: Order = orders::table
            .find(placed.order_id)
            .first(&mut conn)
            .expect("order row");
        assert_eq!(order.payment_method, "Cash on Delivery");
    }

    #[tokio::test]
    async fn buy_now_with_insufficient_stock_creates_no_order() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let product_id = seed_product(&mut conn, "Recliner", "800.00", 1);

        let err = buy_now(&mut conn, Uuid::new_v4(), product_id, 2, None).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(order_count(&mut conn), 0);
        assert_eq!(item_count(&mut conn), 0);
    }

    #[tokio::test]
    async fn buy_now_rejects_invalid_quantity_and_unknown_product() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let product_id = seed_product(&mut conn, "Shelf", "40.00", 5);

        let err = buy_now(&mut conn, Uuid::new_v4(), product_id, 0, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity));

        let err = buy_now(&mut conn, Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound));
    }

    #[tokio::test]
    async fn checkout_totals_match_live_prices_plus_fee() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let p1 = seed_product(&mut conn, "Coffee table", "100.00", 10);
        let p2 = seed_product(&mut conn, "Floor lamp", "500.00", 10);

        add_item(&mut conn, user_id, p1, 2).expect("add p1");
        add_item(&mut conn, user_id, p2, 1).expect("add p2");
        let line_ids: Vec<Uuid> = view_cart(&mut conn, user_id)
            .expect("view")
            .items
            .iter()
            .map(|l| l.cart_item_id)
            .collect();

        let placed = checkout_cart(&mut conn, user_id, &line_ids, None).expect("checkout");

        assert_eq!(placed.subtotal, dec("700.00"));
        assert_eq!(placed.total_amount, dec("2700.00"));
        assert_eq!(placed.items.len(), 2);

        let order: Order = orders::table
            .find(placed.order_id)
            .first(&mut conn)
            .expect("order row");
        assert_eq!(order.total_quantity, 3);
        assert_eq!(order.status, "Pending");
    }

    #[tokio::test]
    async fn checkout_leaves_cart_lines_in_place() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Ottoman", "90.00", 5);

        add_item(&mut conn, user_id, product_id, 2).expect("add");
        let line_ids: Vec<Uuid> = view_cart(&mut conn, user_id)
            .expect("view")
            .items
            .iter()
            .map(|l| l.cart_item_id)
            .collect();

        checkout_cart(&mut conn, user_id, &line_ids, None).expect("checkout");

        let cart = view_cart(&mut conn, user_id).expect("cart survives checkout");
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn checkout_is_atomic_when_one_line_lacks_stock() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let user_id = Uuid::new_v4();
        let p1 = seed_product(&mut conn, "Bar stool", "30.00", 10);
        let p2 = seed_product(&mut conn, "Bar table", "200.00", 10);
        let p3 = seed_product(&mut conn, "Bar shelf", "120.00", 10);

        add_item(&mut conn, user_id, p1, 2).expect("add p1");
        add_item(&mut conn, user_id, p2, 4).expect("add p2");
        add_item(&mut conn, user_id, p3, 1).expect("add p3");
        let line_ids: Vec<Uuid> = view_cart(&mut conn, user_id)
            .expect("view")
            .items
            .iter()
            .map(|l| l.cart_item_id)
            .collect();

        // Stock of p2 drops below the cart quantity between add and checkout.
        diesel::update(products::table.find(p2))
            .set(products::quantity.eq(3))
            .execute(&mut conn)
            .expect("stock update");

        let err = checkout_cart(&mut conn, user_id, &line_ids, None).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { product_id } if product_id == p2
        ));

        // Nothing persisted for any of the three lines.
        assert_eq!(order_count(&mut conn), 0);
        assert_eq!(item_count(&mut conn), 0);
        let events: i64 = notification_outbox::table
            .count()
            .get_result(&mut conn)
            .expect("count");
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn checkout_rejects_foreign_line_ids_without_mutation() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let product_id = seed_product(&mut conn, "Dresser", "300.00", 5);

        add_item(&mut conn, owner, product_id, 1).expect("add");
        let owned_id = view_cart(&mut conn, owner).expect("view").items[0].cart_item_id;

        let err = checkout_cart(&mut conn, intruder, &[owned_id], None).unwrap_err();
        match err {
            AppError::InvalidSelection { invalid_ids } => {
                assert_eq!(invalid_ids, vec![owned_id]);
            }
            other => panic!("expected InvalidSelection, got {other:?}"),
        }
        assert_eq!(order_count(&mut conn), 0);
    }

    #[tokio::test]
    async fn placing_an_order_queues_a_notification_event() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("conn");
        let product_id = seed_product(&mut conn, "Console table", "150.00", 5);

        let placed = buy_now(&mut conn, Uuid::new_v4(), product_id, 1, None).expect("buy now");

        let events: Vec<NotificationEvent> = notification_outbox::table
            .filter(notification_outbox::aggregate_id.eq(placed.order_id.to_string()))
            .load(&mut conn)
            .expect("load events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "OrderPlaced");
        assert_eq!(events[0].aggregate_type, "Order");
    }
}
