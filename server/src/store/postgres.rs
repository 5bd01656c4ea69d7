use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{like_pattern, EventFilter, StoreError, StoreResult, TicketStore};
use crate::models::{
    Category, CategorySummary, Event, EventCreation, EventUpdate, NewCategory, NewEvent, Purchase,
    Quantity, UserId,
};

const EVENT_COLUMNS: &str = "id, title, slug, content, time_start, is_published, category_id, \
     price, total_tickets, remaining_tickets, created_at, updated_at";

const PURCHASE_COLUMNS: &str = "id, event_id, buyer, purchased_at, quantity, total_price";

const CREATION_COLUMNS: &str = "id, event_id, creator, quantity, unit_price, created_at";

/// PostgreSQL-backed store.
///
/// Inventory transitions run inside a transaction and change the remaining
/// count with a conditional `UPDATE`, so concurrent purchases on one event
/// serialize on its row lock instead of racing on a stale read.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

        Ok(Self::new(pool))
    }
}

/// Moves an event's remaining count by `delta` as part of the caller's
/// transaction. Returns the event's unit price.
///
/// The guard `remaining_tickets + delta >= 0` makes the check and the write a
/// single statement.
async fn adjust_remaining(
    conn: &mut PgConnection,
    event_id: Uuid,
    delta: i32,
) -> StoreResult<Decimal> {
    let price: Option<Decimal> = sqlx::query_scalar(
        "UPDATE events
         SET remaining_tickets = remaining_tickets + $2, updated_at = $3
         WHERE id = $1 AND remaining_tickets + $2 >= 0
         RETURNING price",
    )
    .bind(event_id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(price) = price {
        return Ok(price);
    }

    let remaining: Option<i32> =
        sqlx::query_scalar("SELECT remaining_tickets FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await?;

    match remaining {
        None => Err(StoreError::EventNotFound),
        Some(remaining) => Err(StoreError::InsufficientInventory {
            requested: -i64::from(delta),
            remaining,
        }),
    }
}

async fn lock_category(conn: &mut PgConnection, category_id: Uuid) -> StoreResult<()> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1 FOR SHARE")
        .bind(category_id)
        .fetch_optional(&mut *conn)
        .await?;
    found.map(|_| ()).ok_or(StoreError::CategoryNotFound)
}

fn slug_conflict(err: sqlx::Error, slug: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::SlugTaken(slug.to_string());
        }
    }
    StoreError::Database(err)
}

fn category_in_use(err: sqlx::Error, slug: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return StoreError::CategoryInUse(slug.to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl TicketStore for PgStore {
    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, slug, created_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, slug, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| slug_conflict(e, &category.slug))
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategorySummary>> {
        let categories = sqlx::query_as::<_, CategorySummary>(
            "SELECT c.id, c.name, c.slug,
                    COUNT(e.id) FILTER (WHERE e.is_published) AS event_count
             FROM categories c
             LEFT JOIN events e ON e.category_id = c.id
             GROUP BY c.id
             ORDER BY c.created_at, c.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn delete_category(&self, slug: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| category_in_use(e, slug))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CategoryNotFound);
        }
        Ok(())
    }

    async fn create_event(
        &self,
        organizer: UserId,
        event: NewEvent,
    ) -> StoreResult<(Event, EventCreation)> {
        let mut tx = self.pool.begin().await?;
        lock_category(&mut tx, event.category_id).await?;

        let now = Utc::now();
        let created = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (id, title, slug, content, time_start, is_published, category_id,
                                 price, total_tickets, remaining_tickets, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7, $8, $8, $9, $9)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&event.title)
        .bind(&event.slug)
        .bind(&event.content)
        .bind(event.time_start)
        .bind(event.category_id)
        .bind(event.price)
        .bind(event.total_tickets)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| slug_conflict(e, &event.slug))?;

        let creation = sqlx::query_as::<_, EventCreation>(&format!(
            "INSERT INTO event_creations (id, event_id, creator, quantity, unit_price, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {CREATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(created.id)
        .bind(organizer)
        .bind(created.total_tickets)
        .bind(created.price)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, creation))
    }

    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event =
            sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(event)
    }

    async fn event_by_slug(&self, slug: &str) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn creator_of(&self, event_id: Uuid) -> StoreResult<Option<UserId>> {
        let creator = sqlx::query_scalar::<_, UserId>(
            "SELECT creator FROM event_creations WHERE event_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(creator)
    }

    async fn update_event(&self, id: Uuid, update: EventUpdate) -> StoreResult<Event> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::EventNotFound)?;

        if let Some(category_id) = update.category_id {
            lock_category(&mut tx, category_id).await?;
        }

        if let Some(total) = update.total_tickets {
            let delta = total - current.total_tickets;
            if delta != 0 {
                adjust_remaining(&mut tx, id, delta).await?;
            }
        }

        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events
             SET title = COALESCE($2, title),
                 content = COALESCE($3, content),
                 time_start = COALESCE($4, time_start),
                 category_id = COALESCE($5, category_id),
                 price = COALESCE($6, price),
                 total_tickets = COALESCE($7, total_tickets),
                 updated_at = $8
             WHERE id = $1
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title)
        .bind(update.content)
        .bind(update.time_start)
        .bind(update.category_id)
        .bind(update.price)
        .bind(update.total_tickets)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn set_published(&self, id: Uuid, published: bool) -> StoreResult<Event> {
        sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET is_published = $2, updated_at = $3
             WHERE id = $1
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(published)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::EventNotFound)
    }

    async fn list_published(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let events = match filter {
            EventFilter::All => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE is_published
                     ORDER BY time_start, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            EventFilter::Category(category_id) => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE is_published AND category_id = $1
                     ORDER BY time_start, id"
                ))
                .bind(category_id)
                .fetch_all(&self.pool)
                .await?
            }
            EventFilter::TitleContains(query) => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE is_published AND title ILIKE $1
                     ORDER BY time_start, id"
                ))
                .bind(like_pattern(&query))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(events)
    }

    async fn purchase(
        &self,
        event_id: Uuid,
        buyer: UserId,
        quantity: Quantity,
    ) -> StoreResult<Purchase> {
        let mut tx = self.pool.begin().await?;

        let price = adjust_remaining(&mut tx, event_id, -quantity.get()).await?;
        let total_price = quantity.total(price)?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "INSERT INTO purchases (id, event_id, buyer, purchased_at, quantity, total_price)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PURCHASE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(buyer)
        .bind(Utc::now())
        .bind(quantity.get())
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(purchase_id = %purchase.id, %event_id, "purchase committed");
        Ok(purchase)
    }

    async fn cancel(&self, purchase_id: Uuid, requester: UserId) -> StoreResult<Purchase> {
        let mut tx = self.pool.begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1 FOR UPDATE"
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::PurchaseNotFound)?;

        if purchase.buyer != requester {
            tx.rollback().await?;
            return Err(StoreError::PermissionDenied);
        }

        adjust_remaining(&mut tx, purchase.event_id, purchase.quantity).await?;

        sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(%purchase_id, event_id = %purchase.event_id, "cancellation committed");
        Ok(purchase)
    }

    async fn purchase_by_id(&self, id: Uuid) -> StoreResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(purchase)
    }

    async fn purchases_for(
        &self,
        buyer: UserId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases
             WHERE buyer = $1
             ORDER BY purchased_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(buyer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    async fn count_purchases_for(&self, buyer: UserId) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE buyer = $1")
            .bind(buyer)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn creations_for(
        &self,
        organizer: UserId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<EventCreation>> {
        let creations = sqlx::query_as::<_, EventCreation>(&format!(
            "SELECT {CREATION_COLUMNS} FROM event_creations
             WHERE creator = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(organizer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(creations)
    }

    async fn count_creations_for(&self, organizer: UserId) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM event_creations WHERE creator = $1")
            .bind(organizer)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
