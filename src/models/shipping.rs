use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::shipping_addresses;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = shipping_addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShippingAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub mobile_number: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shipping_addresses)]
pub struct NewShippingAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub mobile_number: String,
    pub email: String,
}

/// Postal/contact fields as supplied by the caller. Identical field sets for
/// the same user resolve to the existing address row instead of a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingData {
    pub full_name: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub mobile_number: String,
    pub email: String,
}
