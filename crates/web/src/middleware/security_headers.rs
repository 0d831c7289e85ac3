//! Security headers for console pages.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Build the console's Content-Security-Policy.
///
/// Scripts and styles come from the console itself (inline styles carry
/// chart bar widths). Images may also come from the API origin, which
/// serves evidence photos.
#[must_use]
pub fn content_security_policy(api_origin: &str) -> String {
    format!(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; \
         img-src 'self' data: {api_origin}; form-action 'self'; frame-ancestors 'none'; \
         base-uri 'self'"
    )
}

/// Browser features the console may use. Location is limited to the console's
/// own pages, for the seizure form's "Use current location" button.
pub const PERMISSIONS_POLICY: &str = "geolocation=(self), camera=(), microphone=(), \
                                      payment=(), usb=(), interest-cohort=()";

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: same-origin`
/// - `Content-Security-Policy` from [`content_security_policy`]
/// - `Permissions-Policy` from [`PERMISSIONS_POLICY`]
/// - `Cache-Control: no-store` unless a handler set its own
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));
    headers.insert(CONTENT_SECURITY_POLICY, state.csp().clone());
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_allows_api_images_only() {
        let policy = content_security_policy("https://api.cms.local");
        assert!(policy.contains("img-src 'self' data: https://api.cms.local;"));
        assert!(policy.contains("script-src 'self';"));
        assert!(HeaderValue::from_str(&policy).is_ok());
    }

    #[test]
    fn test_location_is_granted_to_the_console_only() {
        assert!(PERMISSIONS_POLICY.starts_with("geolocation=(self),"));
        assert!(PERMISSIONS_POLICY.contains("camera=()"));
        assert!(HeaderValue::from_str(PERMISSIONS_POLICY).is_ok());
    }
}
