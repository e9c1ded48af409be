//! Pass-through proxy to the backend API.
//!
//! `/api/{*path}` is forwarded to the backend's `/api/{*path}` with the
//! query string, body and the request's credentials. The storefront's own
//! session cookie is never forwarded; a session token is sent as a bearer
//! header instead. Backend responses, including error statuses, are relayed
//! as they are.
//!
//! A successful mutation through the proxy evicts the cached responses it
//! may have changed, the same as the typed client's own mutations.

use axum::{
    body::{Body, to_bytes},
    extract::{Path, Request, State},
    http::{HeaderMap, HeaderName, Method, header},
    response::Response,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::endpoints::{CARTS, LOGIN, LOGOUT, PRODUCTS};
use crate::api::{ApiError, CacheTag};
use crate::error::{AppError, Result};
use crate::middleware::{REQUEST_ID_HEADER, RequestId, resolve_authorization};
use crate::state::AppState;

/// Largest request body the proxy buffers.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Request headers copied to the backend.
const FORWARDED_REQUEST_HEADERS: &[HeaderName] = &[
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::CONTENT_TYPE,
    header::USER_AGENT,
];

/// Response headers copied back to the client.
const FORWARDED_RESPONSE_HEADERS: &[HeaderName] = &[
    header::CACHE_CONTROL,
    header::CONTENT_TYPE,
    header::LOCATION,
    header::RETRY_AFTER,
    header::SET_COOKIE,
];

fn copy_headers(from: &HeaderMap, to: &mut HeaderMap, names: &[HeaderName]) {
    for name in names {
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

/// The cache tag a successful proxied request to `path` leaves stale.
fn affected_tag(method: &Method, path: &str) -> Option<CacheTag> {
    let under = |prefix: &str| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    };

    if under(LOGOUT) {
        return Some(CacheTag::Cart);
    }
    if method.is_safe() {
        return None;
    }
    if under(CARTS) || under(LOGIN) {
        Some(CacheTag::Cart)
    } else if under(PRODUCTS) {
        Some(CacheTag::Product)
    } else {
        None
    }
}

/// Forward a request to the backend.
#[instrument(skip_all, fields(method = %request.method(), path = %path))]
pub async fn forward(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let session = parts.extensions.get::<Session>().cloned();

    let backend_path = format!("/api/{path}");
    let mut url = state.api().endpoint(&backend_path)?;
    url.set_query(parts.uri.query());

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("Request body too large".to_string()))?;

    let mut headers = HeaderMap::new();
    copy_headers(&parts.headers, &mut headers, FORWARDED_REQUEST_HEADERS);

    let mut outbound = state
        .api()
        .http()
        .request(parts.method.clone(), url)
        .headers(headers)
        .header(REQUEST_ID_HEADER, request_id.as_str())
        .body(body);

    if let Some(auth) = resolve_authorization(&parts, session.as_ref()).await {
        outbound = auth.apply(outbound);
    }

    let upstream = outbound.send().await.map_err(|e| {
        tracing::warn!(error = %e, "Proxy request failed");
        AppError::Api(ApiError::from_transport(e))
    })?;

    tracing::debug!(status = %upstream.status(), "Proxied");

    let affected = affected_tag(&parts.method, &backend_path);
    if let Some(tag) = affected.filter(|_| upstream.status().is_success()) {
        state.api().invalidate(tag);
    }

    let mut response = Response::builder().status(upstream.status());
    if let Some(response_headers) = response.headers_mut() {
        copy_headers(
            upstream.headers(),
            response_headers,
            FORWARDED_RESPONSE_HEADERS,
        );
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| AppError::Internal(format!("failed to build proxy response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_mutations_stale_carts() {
        assert_eq!(
            affected_tag(&Method::POST, "/api/v1/cart/add-item"),
            Some(CacheTag::Cart)
        );
        assert_eq!(
            affected_tag(&Method::DELETE, "/api/v1/cart/7"),
            Some(CacheTag::Cart)
        );
        assert_eq!(affected_tag(&Method::GET, "/api/v1/cart"), None);
    }

    #[test]
    fn test_product_mutations_stale_products() {
        assert_eq!(
            affected_tag(&Method::PUT, "/api/v1/product/3"),
            Some(CacheTag::Product)
        );
        assert_eq!(affected_tag(&Method::HEAD, "/api/v1/product"), None);
    }

    #[test]
    fn test_session_changes_stale_carts() {
        assert_eq!(
            affected_tag(&Method::POST, "/api/v1/users/login"),
            Some(CacheTag::Cart)
        );
        assert_eq!(
            affected_tag(&Method::GET, "/api/v1/users/logout"),
            Some(CacheTag::Cart)
        );
        assert_eq!(affected_tag(&Method::POST, "/api/v1/users/register"), None);
    }

    #[test]
    fn test_prefix_match_is_per_segment() {
        assert_eq!(affected_tag(&Method::POST, "/api/v1/cartography"), None);
    }
}
