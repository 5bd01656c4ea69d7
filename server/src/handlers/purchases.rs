use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::extract::CurrentUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success};

/// Quantity is taken as a signed integer so that zero and negative values
/// reach validation and come back as `INVALID_QUANTITY`; fractional or
/// non-numeric values are rejected by the JSON extractor.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub quantity: i64,
}

pub async fn purchase_tickets(
    State(state): State<AppState>,
    CurrentUser(buyer): CurrentUser,
    Path(slug): Path<String>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let purchase = state
        .inventory
        .purchase_by_slug(&slug, buyer, request.quantity)
        .await?;
    Ok(created(purchase, "Tickets purchased"))
}

pub async fn cancel_purchase(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    purchase_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(purchase_id) = purchase_id?;
    state.inventory.cancel(purchase_id, requester).await?;
    Ok(empty_success("Purchase cancelled"))
}
