use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::products;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub quantity: i32,
    pub category_id: Option<Uuid>,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub quantity: i32,
    pub category_id: Option<Uuid>,
    pub image_path: Option<String>,
}

/// Storefront label derived from live stock; the catalog never stores it.
pub fn stock_status(quantity: i32) -> &'static str {
    if quantity > 0 {
        "In Stock"
    } else {
        "Out of Stock"
    }
}

#[cfg(test)]
mod tests {
    use super::stock_status;

    #[test]
    fn positive_stock_is_in_stock() {
        assert_eq!(stock_status(1), "In Stock");
    }

    #[test]
    fn zero_stock_is_out_of_stock() {
        assert_eq!(stock_status(0), "Out of Stock");
    }
}
