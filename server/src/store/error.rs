use thiserror::Error;

/// Failures surfaced by the catalog and inventory operations.
///
/// Every variant except `Database` is a caller-recoverable outcome; none of
/// them leave a partially applied mutation behind.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event not found")]
    EventNotFound,

    #[error("purchase not found")]
    PurchaseNotFound,

    #[error("category not found")]
    CategoryNotFound,

    #[error("requested {requested} tickets but only {remaining} remain")]
    InsufficientInventory { requested: i64, remaining: i32 },

    #[error("permission denied")]
    PermissionDenied,

    #[error("invalid ticket quantity: {0}")]
    InvalidQuantity(i64),

    #[error("slug '{0}' is already taken")]
    SlugTaken(String),

    #[error("category '{0}' is still referenced by events")]
    CategoryInUse(String),

    #[error("{0}")]
    Validation(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
