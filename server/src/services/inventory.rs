//! Ticket inventory core: purchase and cancellation.
//!
//! Both transitions are delegated to the store as single atomic units; this
//! layer validates input, resolves slugs, and logs the outcome.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Event, Purchase, Quantity, UserId};
use crate::store::{StoreError, StoreResult, TicketStore};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn TicketStore>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    pub async fn get_event(&self, event_id: Uuid) -> StoreResult<Event> {
        self.store
            .event_by_id(event_id)
            .await?
            .ok_or(StoreError::EventNotFound)
    }

    /// Buys `quantity` tickets for `event_id` on behalf of `buyer`.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for a non-positive quantity, `EventNotFound`, or
    /// `InsufficientInventory` when fewer tickets remain than requested. No
    /// state changes on any error.
    pub async fn purchase(
        &self,
        event_id: Uuid,
        buyer: UserId,
        quantity: i64,
    ) -> StoreResult<Purchase> {
        let quantity = Quantity::new(quantity)?;
        self.purchase_checked(event_id, buyer, quantity).await
    }

    /// Same as [`purchase`](Self::purchase), addressing the event by slug.
    pub async fn purchase_by_slug(
        &self,
        slug: &str,
        buyer: UserId,
        quantity: i64,
    ) -> StoreResult<Purchase> {
        let quantity = Quantity::new(quantity)?;
        let event = self
            .store
            .event_by_slug(slug)
            .await?
            .ok_or(StoreError::EventNotFound)?;
        self.purchase_checked(event.id, buyer, quantity).await
    }

    async fn purchase_checked(
        &self,
        event_id: Uuid,
        buyer: UserId,
        quantity: Quantity,
    ) -> StoreResult<Purchase> {
        match self.store.purchase(event_id, buyer, quantity).await {
            Ok(purchase) => {
                info!(
                    purchase_id = %purchase.id,
                    %event_id,
                    %buyer,
                    quantity = purchase.quantity,
                    total_price = %purchase.total_price,
                    "Tickets purchased"
                );
                Ok(purchase)
            }
            Err(StoreError::InsufficientInventory {
                requested,
                remaining,
            }) => {
                warn!(%event_id, %buyer, requested, remaining, "Purchase rejected: insufficient inventory");
                Err(StoreError::InsufficientInventory {
                    requested,
                    remaining,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Cancels a purchase and returns its tickets to the event.
    ///
    /// # Errors
    ///
    /// `PurchaseNotFound` (including a second cancel of the same purchase) or
    /// `PermissionDenied` when `requester` is not the buyer.
    pub async fn cancel(&self, purchase_id: Uuid, requester: UserId) -> StoreResult<Purchase> {
        match self.store.cancel(purchase_id, requester).await {
            Ok(purchase) => {
                info!(
                    %purchase_id,
                    event_id = %purchase.event_id,
                    buyer = %purchase.buyer,
                    quantity = purchase.quantity,
                    "Purchase cancelled"
                );
                Ok(purchase)
            }
            Err(StoreError::PermissionDenied) => {
                warn!(%purchase_id, %requester, "Cancellation denied: requester is not the buyer");
                Err(StoreError::PermissionDenied)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCategory, NewEvent};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use rust_decimal::Decimal;

    async fn setup(total: i32, price: Decimal) -> (InventoryService, Arc<dyn TicketStore>, Event) {
        let store: Arc<dyn TicketStore> = Arc::new(MemoryStore::new());
        let category = store
            .create_category(NewCategory {
                name: "Theatre".to_string(),
                slug: "theatre".to_string(),
            })
            .await
            .unwrap();
        let (event, _) = store
            .create_event(
                UserId::new(),
                NewEvent {
                    title: "Hamlet".to_string(),
                    slug: "hamlet".to_string(),
                    content: String::new(),
                    time_start: Utc::now(),
                    category_id: category.id,
                    price,
                    total_tickets: total,
                },
            )
            .await
            .unwrap();
        (InventoryService::new(store.clone()), store, event)
    }

    async fn remaining(service: &InventoryService, event_id: Uuid) -> i32 {
        service.get_event(event_id).await.unwrap().remaining_tickets
    }

    #[tokio::test]
    async fn test_buy_buy_cancel_scenario() {
        let (service, _, event) = setup(5, Decimal::new(100, 1)).await;
        let buyer = UserId::new();

        let first = service.purchase(event.id, buyer, 3).await.unwrap();
        assert_eq!(first.total_price, Decimal::new(300, 1));
        assert_eq!(remaining(&service, event.id).await, 2);

        let err = service.purchase(event.id, buyer, 3).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientInventory {
                requested: 3,
                remaining: 2
            }
        ));
        assert_eq!(remaining(&service, event.id).await, 2);

        service.cancel(first.id, buyer).await.unwrap();
        assert_eq!(remaining(&service, event.id).await, 5);
    }

    #[tokio::test]
    async fn test_exact_remaining_can_be_bought() {
        let (service, _, event) = setup(4, Decimal::new(25, 0)).await;
        let purchase = service.purchase(event.id, UserId::new(), 4).await.unwrap();
        assert_eq!(purchase.total_price, Decimal::new(100, 0));
        assert_eq!(remaining(&service, event.id).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_quantity_never_reaches_store() {
        let (service, store, event) = setup(5, Decimal::ONE).await;
        let buyer = UserId::new();

        for quantity in [0, -1, i64::MAX] {
            let err = service.purchase(event.id, buyer, quantity).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidQuantity(q) if q == quantity));
        }
        assert_eq!(remaining(&service, event.id).await, 5);
        assert_eq!(store.count_purchases_for(buyer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purchase_by_unknown_slug() {
        let (service, _, _) = setup(5, Decimal::ONE).await;
        let err = service
            .purchase_by_slug("no-such-event", UserId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EventNotFound));
    }

    #[tokio::test]
    async fn test_purchase_by_slug_uses_snapshot_price() {
        let (service, store, event) = setup(5, Decimal::new(10, 0)).await;
        let buyer = UserId::new();
        let purchase = service.purchase_by_slug("hamlet", buyer, 2).await.unwrap();

        store
            .update_event(
                event.id,
                crate::models::EventUpdate {
                    price: Some(Decimal::new(99, 0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = store.purchase_by_id(purchase.id).await.unwrap().unwrap();
        assert_eq!(stored.total_price, Decimal::new(20, 0));
    }

    #[tokio::test]
    async fn test_only_buyer_may_cancel() {
        let (service, store, event) = setup(5, Decimal::ONE).await;
        let buyer = UserId::new();
        let purchase = service.purchase(event.id, buyer, 2).await.unwrap();

        let err = service.cancel(purchase.id, UserId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied));
        assert_eq!(remaining(&service, event.id).await, 3);
        assert!(store.purchase_by_id(purchase.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_single_ticket_purchases_never_oversell() {
        const STOCK: i32 = 7;
        const ATTEMPTS: usize = 50;

        let (service, _, event) = setup(STOCK, Decimal::ONE).await;

        let handles: Vec<_> = (0..ATTEMPTS)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.purchase(event.id, UserId::new(), 1).await })
            })
            .collect();

        let results = futures::future::join_all(handles).await;
        let mut successes = 0;
        let mut sold_out = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::InsufficientInventory { .. }) => sold_out += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, STOCK as usize);
        assert_eq!(sold_out, ATTEMPTS - STOCK as usize);
        assert_eq!(remaining(&service, event.id).await, 0);
    }
}
