use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UserId;

/// Record of an organizer publishing an event.
///
/// `quantity` and `unit_price` are snapshots taken when the event was created;
/// later edits to the event do not touch them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct EventCreation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub creator: UserId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}
