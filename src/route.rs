//! Route definitions for the link shortener
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::database::AppState;
use crate::handler::{
    count_links, count_my_links, create_link, list_my_links, missing_slug, not_found_page,
    redirect_link, resolve_link, sum_my_visits, toggle_link,
};
use crate::middleware::identity_middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /{slug}` - Redirects to the destination (public)
/// - `GET /404` - Not-found page (public)
/// - `GET /api/link/{slug}` - Resolves a slug as JSON (public)
/// - `GET /api/link/` - 400, the slug is missing
/// - `GET /api/links/count` - Counts all links (public)
/// - `POST /api/links` - Creates a link
/// - `POST /api/links/{slug}/toggle` - Enables/disables a link
/// - `GET /api/me/links` - Lists the caller's links
/// - `GET /api/me/links/count` - Counts the caller's links
/// - `GET /api/me/visits` - Sums visits over the caller's links
///
/// # Example Usage
///
/// ```no_run
/// # use clipsnip::config::Settings;
/// # use clipsnip::database::{init_db, AppState};
/// # use clipsnip::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::new(db, Settings::default());
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/link/", get(missing_slug))
        .route("/link/{slug}", get(resolve_link))
        .route("/links/count", get(count_links));

    // Routes below need an identity forwarded by the gateway
    let owner_api = Router::new()
        .route("/links", post(create_link))
        .route("/links/{slug}/toggle", post(toggle_link))
        .route("/me/links", get(list_my_links))
        .route("/me/links/count", get(count_my_links))
        .route("/me/visits", get(sum_my_visits))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    Router::new()
        .route("/404", get(not_found_page))
        .route("/{slug}", get(redirect_link))
        .nest("/api", public_api.merge(owner_api))
        .with_state(state)
}
