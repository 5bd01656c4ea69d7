use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::handlers::extract::AdminAccess;
use crate::models::{Category, Event, NewCategory};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Serialize)]
struct CategoryEvents {
    category: Category,
    events: Vec<Event>,
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Response, AppError> {
    let categories = state.catalog.categories().await?;
    Ok(success(categories, "Categories retrieved"))
}

pub async fn category_events(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let (category, events) = state.catalog.list_in_category(&slug).await?;
    let message = format!("Events in category '{}'", category.name);
    Ok(success(CategoryEvents { category, events }, message))
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminAccess,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(category) = payload?;
    let category = state.catalog.create_category(category).await?;
    Ok(created(category, "Category created"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    state.catalog.delete_category(&slug).await?;
    Ok(empty_success("Category deleted"))
}
