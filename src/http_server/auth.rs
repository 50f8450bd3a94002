use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::entities;
use crate::http_server::error::ApiError;
use crate::http_server::state::AppState;
use crate::services::user::UserService;

/// The user owning the token in the `Authorization` header.
///
/// Accepts `Token <token>` and `Bearer <token>`. Handlers taking this extractor
/// reject anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub entities::user::Model);

/// The token in an `Authorization` header value.
///
/// `Ok(None)` means the header uses another scheme and the request is anonymous.
fn token_from_header(value: &str) -> Result<Option<&str>, ApiError> {
    let mut parts = value.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    match (parts.next(), parts.next()) {
        (None, _) => Err(ApiError::Unauthenticated(
            "Invalid token header. No credentials provided.",
        )),
        (Some(_), Some(_)) => Err(ApiError::Unauthenticated(
            "Invalid token header. Token string should not contain spaces.",
        )),
        (Some(token), None) => Ok(Some(token)),
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let Some(header) = parts.headers.get(header::AUTHORIZATION) else {
            return Err(ApiError::not_provided());
        };
        let header = header.to_str().map_err(|_| {
            ApiError::Unauthenticated(
                "Invalid token header. Token string should not contain invalid characters.",
            )
        })?;
        let token = token_from_header(header)?.ok_or_else(ApiError::not_provided)?;

        let user = UserService::new(state.db.clone())
            .find_by_token(token)
            .await?
            .ok_or_else(|| {
                tracing::warn!(uri = %parts.uri, "Rejected request with unknown token");
                ApiError::invalid_token()
            })?;

        let user = CurrentUser(user);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
