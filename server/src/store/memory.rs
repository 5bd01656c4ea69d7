use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventFilter, StoreError, StoreResult, TicketStore};
use crate::models::{
    Category, CategorySummary, Event, EventCreation, EventUpdate, NewCategory, NewEvent, Purchase,
    Quantity, UserId,
};

#[derive(Debug, Default)]
struct State {
    categories: Vec<Category>,
    events: HashMap<Uuid, Event>,
    // Insertion order doubles as the tie-breaker for equal timestamps.
    purchases: Vec<Purchase>,
    creations: Vec<EventCreation>,
}

/// Process-local store.
///
/// Every operation runs under one lock guard, so a purchase or cancellation is
/// never observed half applied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Moves `event.remaining_tickets` by `delta`, refusing to go below zero.
fn adjust_remaining(event: &mut Event, delta: i32) -> StoreResult<()> {
    match event.remaining_tickets.checked_add(delta) {
        Some(next) if next >= 0 => {
            event.remaining_tickets = next;
            event.updated_at = Utc::now();
            Ok(())
        }
        Some(_) => Err(StoreError::InsufficientInventory {
            requested: -i64::from(delta),
            remaining: event.remaining_tickets,
        }),
        None => Err(StoreError::Validation(
            "ticket count out of range".to_string(),
        )),
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.skip(offset).take(limit).collect()
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut state = self.state.write().await;
        if state.categories.iter().any(|c| c.slug == category.slug) {
            return Err(StoreError::SlugTaken(category.slug));
        }

        let created = Category {
            id: Uuid::new_v4(),
            name: category.name,
            slug: category.slug,
            created_at: Utc::now(),
        };
        state.categories.push(created.clone());
        Ok(created)
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategorySummary>> {
        let state = self.state.read().await;
        let summaries = state
            .categories
            .iter()
            .map(|c| CategorySummary {
                id: c.id,
                name: c.name.clone(),
                slug: c.slug.clone(),
                event_count: state
                    .events
                    .values()
                    .filter(|e| e.category_id == c.id && e.is_published)
                    .count() as i64,
            })
            .collect();
        Ok(summaries)
    }

    async fn delete_category(&self, slug: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let position = state
            .categories
            .iter()
            .position(|c| c.slug == slug)
            .ok_or(StoreError::CategoryNotFound)?;

        let id = state.categories[position].id;
        if state.events.values().any(|e| e.category_id == id) {
            return Err(StoreError::CategoryInUse(slug.to_string()));
        }

        state.categories.remove(position);
        Ok(())
    }

    async fn create_event(
        &self,
        organizer: UserId,
        event: NewEvent,
    ) -> StoreResult<(Event, EventCreation)> {
        let mut state = self.state.write().await;
        if !state.categories.iter().any(|c| c.id == event.category_id) {
            return Err(StoreError::CategoryNotFound);
        }
        if state.events.values().any(|e| e.slug == event.slug) {
            return Err(StoreError::SlugTaken(event.slug));
        }

        let now = Utc::now();
        let created = Event {
            id: Uuid::new_v4(),
            title: event.title,
            slug: event.slug,
            content: event.content,
            time_start: event.time_start,
            is_published: false,
            category_id: event.category_id,
            price: event.price,
            total_tickets: event.total_tickets,
            remaining_tickets: event.total_tickets,
            created_at: now,
            updated_at: now,
        };
        let creation = EventCreation {
            id: Uuid::new_v4(),
            event_id: created.id,
            creator: organizer,
            quantity: created.total_tickets,
            unit_price: created.price,
            created_at: now,
        };

        state.events.insert(created.id, created.clone());
        state.creations.push(creation.clone());
        Ok((created, creation))
    }

    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn event_by_slug(&self, slug: &str) -> StoreResult<Option<Event>> {
        let state = self.state.read().await;
        Ok(state.events.values().find(|e| e.slug == slug).cloned())
    }

    async fn creator_of(&self, event_id: Uuid) -> StoreResult<Option<UserId>> {
        let state = self.state.read().await;
        Ok(state
            .creations
            .iter()
            .find(|c| c.event_id == event_id)
            .map(|c| c.creator))
    }

    async fn update_event(&self, id: Uuid, update: EventUpdate) -> StoreResult<Event> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if let Some(category_id) = update.category_id {
            if !state.categories.iter().any(|c| c.id == category_id) {
                return Err(StoreError::CategoryNotFound);
            }
        }

        let current = state.events.get(&id).ok_or(StoreError::EventNotFound)?;

        // Work on a copy so a rejected ticket change leaves the stored event untouched.
        let mut event = current.clone();
        if let Some(total) = update.total_tickets {
            let delta = total - event.total_tickets;
            adjust_remaining(&mut event, delta)?;
            event.total_tickets = total;
        }
        if let Some(title) = update.title {
            event.title = title;
        }
        if let Some(content) = update.content {
            event.content = content;
        }
        if let Some(time_start) = update.time_start {
            event.time_start = time_start;
        }
        if let Some(category_id) = update.category_id {
            event.category_id = category_id;
        }
        if let Some(price) = update.price {
            event.price = price;
        }
        event.updated_at = Utc::now();

        state.events.insert(id, event.clone());
        Ok(event)
    }

    async fn set_published(&self, id: Uuid, published: bool) -> StoreResult<Event> {
        let mut state = self.state.write().await;
        let event = state.events.get_mut(&id).ok_or(StoreError::EventNotFound)?;
        event.is_published = published;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn list_published(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        let needle = match &filter {
            EventFilter::TitleContains(query) => Some(query.to_lowercase()),
            _ => None,
        };

        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.is_published)
            .filter(|e| match &filter {
                EventFilter::All => true,
                EventFilter::Category(category_id) => e.category_id == *category_id,
                EventFilter::TitleContains(_) => needle
                    .as_deref()
                    .is_some_and(|n| e.title.to_lowercase().contains(n)),
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| a.time_start.cmp(&b.time_start).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn purchase(
        &self,
        event_id: Uuid,
        buyer: UserId,
        quantity: Quantity,
    ) -> StoreResult<Purchase> {
        let mut state = self.state.write().await;
        let event = state
            .events
            .get_mut(&event_id)
            .ok_or(StoreError::EventNotFound)?;

        let total_price = quantity.total(event.price)?;
        adjust_remaining(event, -quantity.get())?;

        let purchase = Purchase {
            id: Uuid::new_v4(),
            event_id,
            buyer,
            purchased_at: Utc::now(),
            quantity: quantity.get(),
            total_price,
        };
        state.purchases.push(purchase.clone());
        Ok(purchase)
    }

    async fn cancel(&self, purchase_id: Uuid, requester: UserId) -> StoreResult<Purchase> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let position = state
            .purchases
            .iter()
            .position(|p| p.id == purchase_id)
            .ok_or(StoreError::PurchaseNotFound)?;

        let purchase = &state.purchases[position];
        if purchase.buyer != requester {
            return Err(StoreError::PermissionDenied);
        }

        let event = state
            .events
            .get_mut(&purchase.event_id)
            .ok_or(StoreError::EventNotFound)?;
        adjust_remaining(event, purchase.quantity)?;

        Ok(state.purchases.remove(position))
    }

    async fn purchase_by_id(&self, id: Uuid) -> StoreResult<Option<Purchase>> {
        let state = self.state.read().await;
        Ok(state.purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn purchases_for(
        &self,
        buyer: UserId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Purchase>> {
        let state = self.state.read().await;
        let mut mine: Vec<&Purchase> = state
            .purchases
            .iter()
            .rev()
            .filter(|p| p.buyer == buyer)
            .collect();
        mine.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(page(mine.into_iter().cloned(), limit, offset))
    }

    async fn count_purchases_for(&self, buyer: UserId) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state.purchases.iter().filter(|p| p.buyer == buyer).count() as i64)
    }

    async fn creations_for(
        &self,
        organizer: UserId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<EventCreation>> {
        let state = self.state.read().await;
        let mut mine: Vec<&EventCreation> = state
            .creations
            .iter()
            .rev()
            .filter(|c| c.creator == organizer)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(mine.into_iter().cloned(), limit, offset))
    }

    async fn count_creations_for(&self, organizer: UserId) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .creations
            .iter()
            .filter(|c| c.creator == organizer)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    async fn seeded(total: i32) -> (MemoryStore, Event) {
        let store = MemoryStore::new();
        let category = store
            .create_category(NewCategory {
                name: "Concerts".to_string(),
                slug: "concerts".to_string(),
            })
            .await
            .unwrap();
        let (event, _) = store
            .create_event(
                UserId::new(),
                NewEvent {
                    title: "Night Jazz".to_string(),
                    slug: "night-jazz".to_string(),
                    content: String::new(),
                    time_start: Utc.with_ymd_and_hms(2030, 5, 1, 20, 0, 0).unwrap(),
                    category_id: category.id,
                    price: Decimal::new(100, 1),
                    total_tickets: total,
                },
            )
            .await
            .unwrap();
        (store, event)
    }

    async fn remaining(store: &MemoryStore, id: Uuid) -> i32 {
        store
            .event_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .remaining_tickets
    }

    #[tokio::test]
    async fn test_create_event_starts_unpublished_with_full_inventory() {
        let (store, event) = seeded(5).await;
        assert!(!event.is_published);
        assert_eq!(event.remaining_tickets, 5);
        assert!(store
            .list_published(EventFilter::All)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_event_slug_rejected() {
        let (store, event) = seeded(5).await;
        let err = store
            .create_event(
                UserId::new(),
                NewEvent {
                    title: "Copy".to_string(),
                    slug: event.slug.clone(),
                    content: String::new(),
                    time_start: event.time_start,
                    category_id: event.category_id,
                    price: Decimal::ZERO,
                    total_tickets: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SlugTaken(slug) if slug == "night-jazz"));
    }

    #[tokio::test]
    async fn test_purchase_decrements_and_records() {
        let (store, event) = seeded(5).await;
        let buyer = UserId::new();

        let purchase = store
            .purchase(event.id, buyer, Quantity::new(3).unwrap())
            .await
            .unwrap();

        assert_eq!(purchase.total_price, Decimal::new(300, 1));
        assert_eq!(remaining(&store, event.id).await, 2);
        assert_eq!(store.count_purchases_for(buyer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_oversell_leaves_state_untouched() {
        let (store, event) = seeded(2).await;
        let buyer = UserId::new();

        let err = store
            .purchase(event.id, buyer, Quantity::new(3).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::InsufficientInventory {
                requested: 3,
                remaining: 2
            }
        ));
        assert_eq!(remaining(&store, event.id).await, 2);
        assert_eq!(store.count_purchases_for(buyer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_total_overflow_leaves_state_untouched() {
        let (store, event) = seeded(5).await;
        let buyer = UserId::new();
        let update = EventUpdate {
            price: Some(Decimal::MAX),
            ..Default::default()
        };
        store.update_event(event.id, update).await.unwrap();

        let err = store
            .purchase(event.id, buyer, Quantity::new(2).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(remaining(&store, event.id).await, 5);
        assert_eq!(store.count_purchases_for(buyer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purchase_unknown_event() {
        let store = MemoryStore::new();
        let err = store
            .purchase(Uuid::new_v4(), UserId::new(), Quantity::new(1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EventNotFound));
    }

    #[tokio::test]
    async fn test_cancel_by_stranger_is_denied() {
        let (store, event) = seeded(5).await;
        let buyer = UserId::new();
        let purchase = store
            .purchase(event.id, buyer, Quantity::new(2).unwrap())
            .await
            .unwrap();

        let err = store.cancel(purchase.id, UserId::new()).await.unwrap_err();

        assert!(matches!(err, StoreError::PermissionDenied));
        assert_eq!(remaining(&store, event.id).await, 3);
        assert!(store.purchase_by_id(purchase.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_twice_fails_not_found() {
        let (store, event) = seeded(5).await;
        let buyer = UserId::new();
        let purchase = store
            .purchase(event.id, buyer, Quantity::new(2).unwrap())
            .await
            .unwrap();

        store.cancel(purchase.id, buyer).await.unwrap();
        assert_eq!(remaining(&store, event.id).await, 5);

        let err = store.cancel(purchase.id, buyer).await.unwrap_err();
        assert!(matches!(err, StoreError::PurchaseNotFound));
        assert_eq!(remaining(&store, event.id).await, 5);
    }

    #[tokio::test]
    async fn test_shrinking_inventory_below_sold_is_rejected() {
        let (store, event) = seeded(5).await;
        store
            .purchase(event.id, UserId::new(), Quantity::new(4).unwrap())
            .await
            .unwrap();

        let err = store
            .update_event(
                event.id,
                EventUpdate {
                    total_tickets: Some(3),
                    title: Some("Renamed".to_string()),
                    ..EventUpdate::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::InsufficientInventory {
                requested: 2,
                remaining: 1
            }
        ));
        let stored = store.event_by_id(event.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Night Jazz");
        assert_eq!(stored.total_tickets, 5);
        assert_eq!(stored.remaining_tickets, 1);
    }

    #[tokio::test]
    async fn test_growing_inventory_adds_to_remaining() {
        let (store, event) = seeded(5).await;
        store
            .purchase(event.id, UserId::new(), Quantity::new(4).unwrap())
            .await
            .unwrap();

        let updated = store
            .update_event(
                event.id,
                EventUpdate {
                    total_tickets: Some(10),
                    ..EventUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.total_tickets, 10);
        assert_eq!(updated.remaining_tickets, 6);
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let (store, _) = seeded(1).await;
        let err = store.delete_category("concerts").await.unwrap_err();
        assert!(matches!(err, StoreError::CategoryInUse(_)));
        assert!(store.category_by_slug("concerts").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_category_counts_only_published() {
        let (store, event) = seeded(1).await;
        assert_eq!(store.list_categories().await.unwrap()[0].event_count, 0);

        store.set_published(event.id, true).await.unwrap();
        assert_eq!(store.list_categories().await.unwrap()[0].event_count, 1);
    }

    #[tokio::test]
    async fn test_title_filter_is_case_insensitive() {
        let (store, event) = seeded(1).await;
        store.set_published(event.id, true).await.unwrap();

        let hits = store
            .list_published(EventFilter::TitleContains("JAZZ".to_string()))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .list_published(EventFilter::TitleContains("opera".to_string()))
            .await
            .unwrap();
        assert!(misses.is_empty());
    }
}
