//! Middleware for authentication and other cross-cutting concerns

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use huddle_auth::AuthError;
use huddle_database::User;
use serde::Deserialize;
use tracing::debug;

use crate::error::GatewayError;
use crate::state::GatewayState;

/// The caller resolved by [`identity_middleware`], `None` when anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(parts.extensions.get::<User>().cloned()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer header first, then `?token=` (browsers cannot set headers on a
/// WebSocket upgrade).
fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
}

/// Resolve the session token, if any, and attach the user to the request.
///
/// Missing or stale tokens leave the request anonymous; handlers decide
/// whether that is acceptable.
pub async fn identity_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if let Some(token) = extract_token(request.headers(), request.uri()) {
        match state.authenticator.authenticate_token(&token).await {
            Ok((user, _session)) => {
                request.extensions_mut().insert(user);
            }
            Err(
                err @ (AuthError::SessionNotFound
                | AuthError::SessionExpired
                | AuthError::InvalidSession
                | AuthError::UserNotFound(_)),
            ) => {
                debug!(error = %err, "request treated as anonymous");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(next.run(request).await)
}

/// Logging middleware for request/response logging
pub async fn logging_middleware(request: Request, next: Next) -> impl IntoResponse {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}
