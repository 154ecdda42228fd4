use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::notification_outbox;

/// Message content handed to the notification collaborator. Rows are written
/// in the same transaction as the state change they describe; delivery is
/// someone else's job.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = notification_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notification_outbox)]
pub struct NewNotificationEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

pub const AGGREGATE_ORDER: &str = "Order";
pub const EVENT_ORDER_PLACED: &str = "OrderPlaced";
pub const EVENT_ORDER_SHIPPED: &str = "OrderShipped";
