//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with the
//! boundary timeouts applied. Timeout enforcement lives here, at the
//! collaborator edge — the orchestration pipeline itself never times out.

use std::time::Duration;

/// Connect timeout for synthesis backend calls.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall request deadline, covering the full response body read. Generous
/// enough for a streamed completion at the configured max-tokens budget.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Build a `reqwest::Client` for synthesis backend calls.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .expect("failed to build reqwest client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let _client = build_http_client();
    }
}
