use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::models::{EventCreation, Purchase, UserId};
use crate::store::{StoreResult, TicketStore};

pub const DEFAULT_PAGE_SIZE: i64 = 2;
pub const MAX_PAGE_SIZE: i64 = 100;

/// One page of a newest-first history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Resolves a user-supplied page number against the result size.
///
/// Missing or non-numeric input gives page 1; anything outside `1..=total_pages`
/// gives the last page. There is always at least one (possibly empty) page.
pub fn resolve_page(requested: Option<&str>, total_items: i64, page_size: i64) -> (i64, i64) {
    let total_pages = ((total_items + page_size - 1) / page_size).max(1);
    let number = match requested.map(|raw| raw.trim().parse::<i64>()) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) if (1..=total_pages).contains(&n) => n,
        Some(Ok(_)) => total_pages,
    };
    (number, total_pages)
}

/// Read-only purchase and organizer histories.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn TicketStore>,
    page_size: i64,
}

impl ProfileService {
    pub fn new(store: Arc<dyn TicketStore>, page_size: i64) -> Self {
        Self {
            store,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub async fn purchases(
        &self,
        buyer: UserId,
        requested_page: Option<&str>,
    ) -> StoreResult<Page<Purchase>> {
        let total = self.store.count_purchases_for(buyer).await?;
        self.paginate(total, requested_page, |limit, offset| {
            self.store.purchases_for(buyer, limit, offset)
        })
        .await
    }

    pub async fn created_events(
        &self,
        organizer: UserId,
        requested_page: Option<&str>,
    ) -> StoreResult<Page<EventCreation>> {
        let total = self.store.count_creations_for(organizer).await?;
        self.paginate(total, requested_page, |limit, offset| {
            self.store.creations_for(organizer, limit, offset)
        })
        .await
    }

    async fn paginate<T, F, Fut>(
        &self,
        total_items: i64,
        requested_page: Option<&str>,
        fetch: F,
    ) -> StoreResult<Page<T>>
    where
        F: FnOnce(i64, i64) -> Fut,
        Fut: Future<Output = StoreResult<Vec<T>>>,
    {
        let (number, total_pages) = resolve_page(requested_page, total_items, self.page_size);
        let items = fetch(self.page_size, (number - 1) * self.page_size).await?;
        Ok(Page {
            items,
            number,
            page_size: self.page_size,
            total_items,
            total_pages,
            has_next: number < total_pages,
            has_previous: number > 1,
        })
    }
}
