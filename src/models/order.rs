use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{order_items, orders};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    /// Item-count summary: number of product types for buy-now, summed line
    /// quantities for cart checkout.
    pub total_quantity: i32,
    pub subtotal: BigDecimal,
    pub total_amount: BigDecimal,
    pub payment_method: String,
    pub shipping_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_quantity: i32,
    pub subtotal: BigDecimal,
    pub total_amount: BigDecimal,
    pub payment_method: String,
    pub shipping_id: Option<Uuid>,
}

/// Quantity snapshot only; price is re-derived from the live product row
/// whenever details are displayed.
#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations,
)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(Order, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

pub const STATUS_PENDING: &str = "Pending";
pub const DEFAULT_PAYMENT_METHOD: &str = "Credit Card";
