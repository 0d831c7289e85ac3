//! Health check endpoint.

/// Liveness health check endpoint.
///
/// Returns "ok" if the console is running. The API is not consulted.
pub async fn health() -> &'static str {
    "ok"
}
