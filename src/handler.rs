//! HTTP request handlers for the link shortener
//!
//! This module maps requests onto [`LinkStore`](crate::store::LinkStore):
//! - Redirecting slugs and recording visits
//! - Resolving slugs as JSON for edge middleware
//! - Creating and toggling links for the authenticated owner
//! - Per-owner listing and statistics

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::database::AppState;
use crate::error::AppError;
use crate::middleware::Identity;
use crate::model::{CreateLinkRequest, CreateLinkResponse, ListParams, ResolvedLink};
use crate::store::LinkStore;

/// Recorded when the visitor's country is missing or malformed
pub const UNKNOWN_COUNTRY: &str = "XX";

/// Lets shared caches keep a resolution for a long time and refresh it in the background
pub const RESOLVE_CACHE_CONTROL: &str = "s-maxage=1000000, stale-while-revalidate";

/// Reads the visitor's country code from the configured header
///
/// Anything that is not a two-letter code is reported as [`UNKNOWN_COUNTRY`].
pub fn visitor_country(headers: &HeaderMap, header_name: &str) -> String {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_uppercase())
        .filter(|code| code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
}

/// Runs a store operation on tokio's blocking pool
///
/// redb transactions block, and commits wait for fsync.
async fn with_store<T, F>(store: &LinkStore, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&LinkStore) -> Result<T, AppError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|err| AppError::Internal(format!("store task failed: {}", err)))?
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Redirects a slug to its destination
///
/// When a visitor opens `http://localhost:8080/abc123`, this handler
/// resolves "abc123", counts the visit and answers with a 302.
/// Missing and disabled links both send the visitor to the not-found page.
///
/// # Response
///
/// - **302 Found** - `Location` is the destination, or the not-found page
pub async fn redirect_link(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let country = visitor_country(&headers, &state.settings.country_header);
    let today = Utc::now().date_naive();
    let visited = slug.clone();

    let resolved = with_store(&state.store, move |store| {
        store.resolve(&visited, &country, today)
    })
    .await;

    match resolved {
        Ok(record) if !record.disabled => Ok(found(&record.long_url)),
        Ok(_) => {
            debug!(slug = %slug, "redirecting disabled link to not-found page");
            Ok(found(&state.settings.not_found_path))
        }
        Err(AppError::NotFound(_)) => Ok(found(&state.settings.not_found_path)),
        Err(err) => Err(err),
    }
}

/// Generic not-found page visitors land on
pub async fn not_found_page() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html("<!doctype html><title>Link not found</title><h1>404</h1><p>This link does not exist or has been disabled.</p>"),
    )
}

/// Resolves a slug as JSON
///
/// Counts the visit exactly like the redirect path does. A disabled link
/// still answers 200 with `disabled: true` so the caller can tell it apart
/// from a missing one.
///
/// # Response
///
/// - **200 OK** - `{"destinationUrl": "...", "disabled": false}`
/// - **404 Not Found** - Slug does not exist
pub async fn resolve_link(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let country = visitor_country(&headers, &state.settings.country_header);
    let today = Utc::now().date_naive();
    let record = with_store(&state.store, move |store| {
        store.resolve(&slug, &country, today)
    })
    .await?;

    Ok((
        [(header::CACHE_CONTROL, RESOLVE_CACHE_CONTROL)],
        Json(ResolvedLink::from(&record)),
    )
        .into_response())
}

/// `GET /api/link/` with the slug left out
pub async fn missing_slug() -> AppError {
    AppError::Validation("Missing slug".to_string())
}

/// Counts every link in the service (public)
pub async fn count_links(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let count = with_store(&state.store, |store| store.count_all()).await?;
    Ok(Json(json!({ "count": count })))
}

/// Creates a link owned by the caller
///
/// # Request Body
///
/// ```json
/// {
///   "link": "https://example.com/very/long/url",
///   "slug": "my-link",   // Optional
///   "enabled": true      // Optional
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - `{"slug": "...", "shortUrl": "..."}`
/// - **400 Bad Request** - Invalid link, description or slug
/// - **409 Conflict** - Slug already exists
pub async fn create_link(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let new_link = payload.into_new_link(&identity.user_id)?;

    let record = with_store(&state.store, move |store| store.create(new_link)).await?;
    let response = CreateLinkResponse {
        short_url: state.settings.short_url(&record.short_slug),
        slug: record.short_slug,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Enables or disables one of the caller's links
///
/// # Response
///
/// - **200 OK** - The updated link record
/// - **204 No Content** - No link of the caller has this slug; nothing changed
pub async fn toggle_link(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, AppError> {
    let toggled = with_store(&state.store, move |store| {
        store.toggle_disabled(&identity.user_id, &slug)
    })
    .await?;

    match toggled {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Lists the caller's links with pagination
///
/// # Example Request
///
/// `GET /api/me/links?page=2&limit=20`
///
/// # Response
///
/// ```json
/// {
///   "page": 2,
///   "limit": 20,
///   "totalFetched": 15,
///   "data": [...]
/// }
/// ```
pub async fn list_my_links(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit) = params.normalized();
    let offset = (page - 1).saturating_mul(limit);

    let records = with_store(&state.store, move |store| {
        store.list_for_owner(&identity.user_id, offset, limit)
    })
    .await?;

    Ok(Json(json!({
        "page": page,
        "limit": limit,
        "totalFetched": records.len(),
        "data": records
    })))
}

/// Number of links the caller owns
pub async fn count_my_links(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let stats = with_store(&state.store, move |store| store.owner_stats(&identity.user_id)).await?;
    Ok(Json(json!({ "count": stats.links })))
}

/// Visits across all of the caller's links
pub async fn sum_my_visits(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let stats = with_store(&state.store, move |store| store.owner_stats(&identity.user_id)).await?;
    Ok(Json(json!({ "visits": stats.visits })))
}
