//! # Route Table
//!
//! ```text
//! /api/v1
//!  ├── POST   /login, /logout
//!  ├── PUT    /users/{id}/password
//!  ├── reads ──────────────────────────────── no broadcast
//!  │     GET  /items, /items/{id}, /sellers/{id}/items, /sellers/{id}/summary
//!  │     GET  /users, /users/{id}, /categories, /categories/counts
//!  │     GET  /categories/sales-overview
//!  │     GET  /sales, /sales/{id}, /sales/items/{id}, /cashiers/{id}/sales
//!  │     GET  /sold-items, /multiply-sold-items
//!  ├── mutations ──── broadcast_on_success ─► Broadcaster: "update"
//!  │     PUT/DELETE /items/{id}, POST /items/frozen, /items/hidden
//!  │     POST /sellers/{id}/items, POST /sales, DELETE /sales/{id}
//!  ├── GET /websocket                         subscribe
//!  └── GET /health
//! ```

pub mod categories;
pub mod health;
pub mod items;
pub mod sales;
pub mod session;
pub mod users;

use axum::{
    http::{Request, Response},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::notify::broadcast_on_success;
use crate::state::AppState;

/// Prefix of every route.
pub const API_PREFIX: &str = "/api/v1";

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/users/{id}/password", put(users::update_password))
        .merge(reads())
        .merge(mutations(state.clone()))
        .merge(bazaar_live::hub::routes())
        .route("/health", get(health::health));

    Router::new()
        .nest(API_PREFIX, api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    if status.is_server_error() {
                        tracing::error!(%status, ?latency, "response");
                    } else {
                        tracing::info!(%status, ?latency, "response");
                    }
                }),
        )
}

fn reads() -> Router<AppState> {
    Router::new()
        .route("/items", get(items::list_items))
        .route("/items/{id}", get(items::get_item))
        .route("/sellers/{id}/items", get(items::list_seller_items))
        .route("/sellers/{id}/summary", get(items::seller_summary))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/categories", get(categories::list_categories))
        .route("/categories/counts", get(categories::category_counts))
        .route("/categories/sales-overview", get(categories::sales_overview))
        .route("/sales", get(sales::list_sales))
        .route("/sales/{id}", get(sales::get_sale))
        .route("/sales/items/{id}", get(sales::sale_item_info))
        .route("/cashiers/{id}/sales", get(sales::cashier_sales))
        .route("/sold-items", get(sales::sold_items))
        .route("/multiply-sold-items", get(sales::multiply_sold_items))
}

/// Every route here notifies subscribers once its handler succeeded.
fn mutations(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/items/{id}", put(items::update_item).delete(items::remove_item))
        .route("/items/frozen", post(items::set_frozen))
        .route("/items/hidden", post(items::set_hidden))
        .route("/sellers/{id}/items", post(items::create_item))
        .route("/sales", post(sales::add_sale))
        .route("/sales/{id}", axum::routing::delete(sales::remove_sale))
        .route_layer(middleware::from_fn_with_state(state, broadcast_on_success))
}

#[cfg(test)]
mod tests;
