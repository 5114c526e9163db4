//! Authentication Middleware
//!
//! Protects the REST routes. Extracts and verifies the bearer token
//! from the Authorization header and attaches the caller's identity to
//! request extensions for handlers to pick up via [`AuthUser`].

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::backend::auth::sessions::verify_token;
use crate::backend::server::state::AppState;
use uuid::Uuid;

/// Authenticated caller identity extracted from the bearer token.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Authentication middleware
///
/// 1. Extracts the token from the Authorization header
/// 2. Verifies it
/// 3. Attaches [`AuthenticatedUser`] to request extensions
///
/// Returns 401 Unauthorized if the token is missing or invalid.
pub async fn auth_middleware(
    State(_app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Authorization header");
            StatusCode::UNAUTHORIZED
        })?;

    // Format: "Bearer <token>"
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid Authorization header format");
        StatusCode::UNAUTHORIZED
    })?;

    let user_id = verify_token(token).map_err(|e| {
        tracing::warn!("Invalid token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

/// Axum extractor for the authenticated user set by [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl axum::extract::FromRequestParts<AppState> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("AuthenticatedUser not found in request extensions");
                StatusCode::UNAUTHORIZED
            })?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_authenticated_user_lives_in_extensions() {
        let mut request = Request::builder()
            .uri("http://example.com")
            .body(())
            .unwrap();

        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };
        request.extensions_mut().insert(user.clone());

        let found = request.extensions().get::<AuthenticatedUser>().unwrap();
        assert_eq!(found.user_id, user.user_id);
    }
}
