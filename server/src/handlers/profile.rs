use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::handlers::extract::CurrentUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// `page` stays a raw string: unparsable values fall back to page 1.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub async fn my_purchases(
    State(state): State<AppState>,
    CurrentUser(buyer): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let page = state
        .profile
        .purchases(buyer, query.page.as_deref())
        .await?;
    Ok(success(page, "Purchase history retrieved"))
}

pub async fn my_events(
    State(state): State<AppState>,
    CurrentUser(organizer): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let page = state
        .profile
        .created_events(organizer, query.page.as_deref())
        .await?;
    Ok(success(page, "Created events retrieved"))
}
