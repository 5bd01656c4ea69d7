use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::handlers::extract::{AdminAccess, CurrentUser};
use crate::models::{Event, EventCreation, EventUpdate, NewEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct PublicationRequest {
    pub is_published: bool,
}

#[derive(Serialize)]
struct CreatedEvent {
    event: Event,
    creation: EventCreation,
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.catalog.list_published().await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn search_events(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let events = state.catalog.search(&query.q).await?;
    Ok(success(events, format!("Search results for '{}'", query.q.trim())))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let event = state.catalog.event_by_slug(&slug).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(organizer): CurrentUser,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(event) = payload?;
    let (event, creation) = state.catalog.create_event(organizer, event).await?;
    Ok(created(CreatedEvent { event, creation }, "Event created"))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(editor): CurrentUser,
    Path(slug): Path<String>,
    payload: Result<Json<EventUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(update) = payload?;
    let event = state.catalog.update_event(editor, &slug, update).await?;
    Ok(success(event, "Event updated"))
}

pub async fn set_publication(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(slug): Path<String>,
    payload: Result<Json<PublicationRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let event = state
        .catalog
        .set_published(&slug, request.is_published)
        .await?;
    let message = if event.is_published {
        "Event published"
    } else {
        "Event unpublished"
    };
    Ok(success(event, message))
}
