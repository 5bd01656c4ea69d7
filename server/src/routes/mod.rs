use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{categories, events, health_check, profile, purchases};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/:slug", delete(categories::delete_category))
        .route("/categories/:slug/events", get(categories::category_events))
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/search", get(events::search_events))
        .route(
            "/events/:slug",
            get(events::get_event).patch(events::update_event),
        )
        .route("/events/:slug/publication", put(events::set_publication))
        .route("/events/:slug/purchases", post(purchases::purchase_tickets))
        .route("/purchases/:id", delete(purchases::cancel_purchase))
        .route("/profile/purchases", get(profile::my_purchases))
        .route("/profile/events", get(profile::my_events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
}
