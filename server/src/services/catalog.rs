use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::{
    Category, CategorySummary, Event, EventCreation, EventUpdate, NewCategory, NewEvent, UserId,
};
use crate::store::{EventFilter, StoreError, StoreResult, TicketStore};

const MAX_TITLE_CHARS: usize = 200;
const MAX_CATEGORY_NAME_CHARS: usize = 100;
const MAX_SLUG_CHARS: usize = 255;
// Keeps quantity times price well inside `Decimal` range.
const MAX_TICKET_PRICE: i64 = 1_000_000;
// Path segments under /events that would shadow an event slug.
const RESERVED_EVENT_SLUGS: &[&str] = &["search"];

/// Read-through cache for the category navigation list.
///
/// Stale entries are harmless; a zero TTL disables caching.
pub struct CategoryCache {
    ttl: Duration,
    entry: RwLock<Option<(Instant, Vec<CategorySummary>)>>,
}

impl CategoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Option<Vec<CategorySummary>> {
        let entry = self.entry.read().await;
        match entry.as_ref() {
            Some((stored_at, categories)) if stored_at.elapsed() < self.ttl => {
                Some(categories.clone())
            }
            _ => None,
        }
    }

    pub async fn put(&self, categories: Vec<CategorySummary>) {
        if self.ttl.is_zero() {
            return;
        }
        *self.entry.write().await = Some((Instant::now(), categories));
    }

    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

/// Event and category catalog: organizer writes, public listings.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn TicketStore>,
    categories: Arc<CategoryCache>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn TicketStore>, category_cache_ttl: Duration) -> Self {
        Self {
            store,
            categories: Arc::new(CategoryCache::new(category_cache_ttl)),
        }
    }

    pub async fn categories(&self) -> StoreResult<Vec<CategorySummary>> {
        if let Some(cached) = self.categories.get().await {
            return Ok(cached);
        }
        let fresh = self.store.list_categories().await?;
        debug!(count = fresh.len(), "Category cache refreshed");
        self.categories.put(fresh.clone()).await;
        Ok(fresh)
    }

    pub async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let category = NewCategory {
            name: category.name.trim().to_string(),
            slug: category.slug.trim().to_string(),
        };
        validate_text("name", &category.name, MAX_CATEGORY_NAME_CHARS)?;
        validate_slug(&category.slug)?;

        let created = self.store.create_category(category).await?;
        self.categories.invalidate().await;
        info!(category_id = %created.id, slug = %created.slug, "Category created");
        Ok(created)
    }

    pub async fn delete_category(&self, slug: &str) -> StoreResult<()> {
        self.store.delete_category(slug).await?;
        self.categories.invalidate().await;
        info!(%slug, "Category deleted");
        Ok(())
    }

    /// Creates an unpublished event owned by `organizer`.
    pub async fn create_event(
        &self,
        organizer: UserId,
        event: NewEvent,
    ) -> StoreResult<(Event, EventCreation)> {
        let event = NewEvent {
            title: event.title.trim().to_string(),
            slug: event.slug.trim().to_string(),
            ..event
        };
        validate_text("title", &event.title, MAX_TITLE_CHARS)?;
        validate_slug(&event.slug)?;
        if RESERVED_EVENT_SLUGS.contains(&event.slug.as_str()) {
            return Err(StoreError::Validation(format!(
                "slug '{}' is reserved",
                event.slug
            )));
        }
        validate_price(event.price)?;
        validate_ticket_total(event.total_tickets)?;

        let (created, creation) = self.store.create_event(organizer, event).await?;
        info!(
            event_id = %created.id,
            slug = %created.slug,
            %organizer,
            total_tickets = created.total_tickets,
            "Event created"
        );
        Ok((created, creation))
    }

    pub async fn event_by_slug(&self, slug: &str) -> StoreResult<Event> {
        self.store
            .event_by_slug(slug)
            .await?
            .ok_or(StoreError::EventNotFound)
    }

    pub async fn event_by_id(&self, id: uuid::Uuid) -> StoreResult<Event> {
        self.store
            .event_by_id(id)
            .await?
            .ok_or(StoreError::EventNotFound)
    }

    pub async fn list_published(&self) -> StoreResult<Vec<Event>> {
        self.store.list_published(EventFilter::All).await
    }

    /// Published events in the category named by `slug`.
    ///
    /// An unknown slug is `CategoryNotFound`; a known category with no
    /// published events is an empty list.
    pub async fn list_in_category(&self, slug: &str) -> StoreResult<(Category, Vec<Event>)> {
        let category = self
            .store
            .category_by_slug(slug)
            .await?
            .ok_or(StoreError::CategoryNotFound)?;
        let events = self
            .store
            .list_published(EventFilter::Category(category.id))
            .await?;
        Ok((category, events))
    }

    pub async fn search(&self, query: &str) -> StoreResult<Vec<Event>> {
        let query = query.trim();
        let filter = if query.is_empty() {
            EventFilter::All
        } else {
            EventFilter::TitleContains(query.to_string())
        };
        self.store.list_published(filter).await
    }

    /// Applies an organizer edit. Only the event's creator may edit it.
    pub async fn update_event(
        &self,
        editor: UserId,
        slug: &str,
        update: EventUpdate,
    ) -> StoreResult<Event> {
        let event = self.event_by_slug(slug).await?;
        if self.store.creator_of(event.id).await? != Some(editor) {
            return Err(StoreError::PermissionDenied);
        }
        if update.is_empty() {
            return Ok(event);
        }

        let update = EventUpdate {
            title: update.title.map(|t| t.trim().to_string()),
            ..update
        };
        if let Some(title) = &update.title {
            validate_text("title", title, MAX_TITLE_CHARS)?;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(total) = update.total_tickets {
            validate_ticket_total(total)?;
        }

        let updated = self.store.update_event(event.id, update).await?;
        if updated.category_id != event.category_id {
            self.categories.invalidate().await;
        }
        info!(event_id = %updated.id, %editor, "Event updated");
        Ok(updated)
    }

    /// Administrative publication toggle.
    pub async fn set_published(&self, slug: &str, published: bool) -> StoreResult<Event> {
        let event = self.event_by_slug(slug).await?;
        let updated = self.store.set_published(event.id, published).await?;
        self.categories.invalidate().await;
        info!(event_id = %updated.id, published, "Event publication changed");
        Ok(updated)
    }
}

fn validate_text(field: &str, value: &str, max_chars: usize) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_chars {
        return Err(StoreError::Validation(format!(
            "{field} exceeds {max_chars} characters"
        )));
    }
    Ok(())
}

/// Slugs are URL path segments: ASCII letters, digits, `-` and `_`.
pub fn validate_slug(slug: &str) -> StoreResult<()> {
    if slug.is_empty() || slug.len() > MAX_SLUG_CHARS {
        return Err(StoreError::Validation(format!(
            "slug must be 1 to {MAX_SLUG_CHARS} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::Validation(format!(
            "slug '{slug}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> StoreResult<()> {
    if price < Decimal::ZERO {
        return Err(StoreError::Validation(
            "price must not be negative".to_string(),
        ));
    }
    if price > Decimal::from(MAX_TICKET_PRICE) {
        return Err(StoreError::Validation(format!(
            "price must not exceed {MAX_TICKET_PRICE}"
        )));
    }
    Ok(())
}

fn validate_ticket_total(total: i32) -> StoreResult<()> {
    if total < 0 {
        return Err(StoreError::Validation(
            "total_tickets must not be negative".to_string(),
        ));
    }
    Ok(())
}
