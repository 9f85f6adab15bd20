use std::time::Duration;

use crate::{ApiError, Result};

/// Path requested by [`ApiClient::health_check`](crate::ApiClient::health_check)
/// and host discovery.
pub const DEFAULT_HEALTH_PATH: &str = "/debug/test";

/// Configures timeouts, retry budget and client identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout for regular calls, in milliseconds.
    pub timeout_ms: u64,
    /// Timeout for [`ApiClient::health_check`](crate::ApiClient::health_check).
    pub health_timeout_ms: u64,
    /// Timeout for each host check during discovery.
    pub discovery_timeout_ms: u64,
    /// Total attempts per host, the first one included.
    pub max_attempts: usize,
    /// Backoff unit in milliseconds (linear strategy: `attempt * unit`).
    pub retry_backoff_ms: u64,
    /// Value sent as `User-Agent`.
    pub user_agent: String,
    /// Diagnostic path used for health checks and discovery.
    pub health_path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            health_timeout_ms: 8_000,
            discovery_timeout_ms: 3_000,
            max_attempts: 3,
            retry_backoff_ms: 1_000,
            user_agent: format!("estate-client/{}", env!("CARGO_PKG_VERSION")),
            health_path: DEFAULT_HEALTH_PATH.to_owned(),
        }
    }
}

impl ClientOptions {
    /// Defaults overlaid with optional environment overrides:
    /// - `ESTATE_API_TIMEOUT_MS`
    /// - `ESTATE_API_MAX_ATTEMPTS`
    /// - `ESTATE_API_RETRY_BACKOFF_MS`
    ///
    /// Unset variables keep their defaults; unparseable ones are an error.
    ///
    /// **Not available on `wasm32` targets.**
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        let mut opts = Self::default();
        if let Some(value) = env_number("ESTATE_API_TIMEOUT_MS")? {
            opts.timeout_ms = value;
        }
        if let Some(value) = env_number("ESTATE_API_MAX_ATTEMPTS")? {
            opts.max_attempts = usize::try_from(value).unwrap_or(usize::MAX).max(1);
        }
        if let Some(value) = env_number("ESTATE_API_RETRY_BACKOFF_MS")? {
            opts.retry_backoff_ms = value;
        }
        Ok(opts)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for_attempt(&self, attempt: usize) -> Duration {
        let factor = u64::try_from(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::Config(format!("{name} must be a non-negative integer, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ClientOptions;

    #[test]
    fn defaults_match_mobile_client() {
        let opts = ClientOptions::default();
        assert_eq!(opts.timeout_ms, 10_000);
        assert_eq!(opts.health_timeout_ms, 8_000);
        assert_eq!(opts.discovery_timeout_ms, 3_000);
        assert_eq!(opts.max_attempts, 3);
        assert_eq!(opts.health_path, "/debug/test");
        assert!(opts.user_agent.starts_with("estate-client/"));
    }

    #[test]
    fn backoff_is_linear() {
        let opts = ClientOptions::default();
        assert_eq!(opts.backoff_for_attempt(1), Duration::from_millis(1_000));
        assert_eq!(opts.backoff_for_attempt(2), Duration::from_millis(2_000));
        assert_eq!(opts.backoff_for_attempt(3), Duration::from_millis(3_000));
    }
}
