//! Persistence for categories, events, purchases and event creations.
//!
//! [`TicketStore`] is the seam between the services and a storage backend.
//! Both backends apply each inventory transition (count change plus
//! purchase record change) as a single atomic unit.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Category, CategorySummary, Event, EventCreation, EventUpdate, NewCategory, NewEvent, Purchase,
    Quantity, UserId,
};

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which published events a listing should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Category(Uuid),
    /// Case-insensitive substring of the title.
    TitleContains(String),
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>>;

    /// All categories in creation order, each with its published event count.
    async fn list_categories(&self) -> StoreResult<Vec<CategorySummary>>;

    /// Fails with [`StoreError::CategoryInUse`] while any event references it.
    async fn delete_category(&self, slug: &str) -> StoreResult<()>;

    /// Inserts the event (unpublished, remaining = total) together with the
    /// organizer's [`EventCreation`] record.
    async fn create_event(
        &self,
        organizer: UserId,
        event: NewEvent,
    ) -> StoreResult<(Event, EventCreation)>;

    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>>;

    async fn event_by_slug(&self, slug: &str) -> StoreResult<Option<Event>>;

    async fn creator_of(&self, event_id: Uuid) -> StoreResult<Option<UserId>>;

    /// Applies an organizer edit. A `total_tickets` change moves the remaining
    /// count by the same delta and fails if that would make it negative.
    async fn update_event(&self, id: Uuid, update: EventUpdate) -> StoreResult<Event>;

    async fn set_published(&self, id: Uuid, published: bool) -> StoreResult<Event>;

    /// Published events matching `filter`, ordered by start time.
    async fn list_published(&self, filter: EventFilter) -> StoreResult<Vec<Event>>;

    /// Decrements the event's remaining count and records the purchase.
    async fn purchase(
        &self,
        event_id: Uuid,
        buyer: UserId,
        quantity: Quantity,
    ) -> StoreResult<Purchase>;

    /// Returns the purchased tickets to the event and deletes the purchase.
    /// Only the buyer may cancel. Returns the deleted record.
    async fn cancel(&self, purchase_id: Uuid, requester: UserId) -> StoreResult<Purchase>;

    async fn purchase_by_id(&self, id: Uuid) -> StoreResult<Option<Purchase>>;

    /// The buyer's purchases, newest first.
    async fn purchases_for(
        &self,
        buyer: UserId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Purchase>>;

    async fn count_purchases_for(&self, buyer: UserId) -> StoreResult<i64>;

    /// The organizer's created events, newest first.
    async fn creations_for(
        &self,
        organizer: UserId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<EventCreation>>;

    async fn count_creations_for(&self, organizer: UserId) -> StoreResult<i64>;
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_query() {
        assert_eq!(like_pattern("jazz"), "%jazz%");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%_off\\"), "%100\\%\\_off\\\\%");
    }
}
