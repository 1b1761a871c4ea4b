use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::database::AppState;
use crate::error::AppError;

/// Header in which the identity gateway forwards the verified user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller of a request
///
/// Inserted into the request extensions by [`identity_middleware`] and
/// handed to handlers as `Extension<Identity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Middleware that turns gateway headers into an [`Identity`]
///
/// When a gateway secret is configured the request must carry it in the
/// `Authorization` header. The user id is then taken from `x-user-id`.
/// Requests failing either check are rejected with 401 before any handler runs.
pub async fn identity_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(secret) = &state.settings.gateway_secret {
        let presented = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok());
        let matches = presented
            .map(|p| bool::from(p.as_bytes().ct_eq(secret.as_bytes())))
            .unwrap_or(false);
        if !matches {
            return Err(AppError::Unauthorized);
        }
    }

    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(Identity {
        user_id: user_id.to_string(),
    });

    Ok(next.run(request).await)
}
