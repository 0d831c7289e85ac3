//! Application state shared across handlers.

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::client::{ApiClient, ClientError};
use crate::config::WebConfig;
use crate::middleware::security_headers::content_security_policy;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    api: ApiClient,
    csp: HeaderValue,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the HTTP client cannot be built.
    pub fn new(config: WebConfig) -> Result<Self, ClientError> {
        let api = ApiClient::new(config.api_url.clone())?;
        let csp = HeaderValue::from_str(&content_security_policy(&config.api_origin()))
            .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"));

        Ok(Self {
            inner: Arc::new(AppStateInner { config, api, csp }),
        })
    }

    /// Get a reference to the console configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the REST API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// The Content-Security-Policy header value.
    #[must_use]
    pub fn csp(&self) -> &HeaderValue {
        &self.inner.csp
    }
}
