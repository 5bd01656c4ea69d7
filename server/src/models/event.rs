use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub time_start: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: Uuid,
    pub price: Decimal,
    pub total_tickets: i32,
    pub remaining_tickets: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organizer-supplied fields for a new event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    pub time_start: DateTime<Utc>,
    pub category_id: Uuid,
    pub price: Decimal,
    pub total_tickets: i32,
}

/// Partial organizer edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub time_start: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub total_tickets: Option<i32>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.time_start.is_none()
            && self.category_id.is_none()
            && self.price.is_none()
            && self.total_tickets.is_none()
    }
}
