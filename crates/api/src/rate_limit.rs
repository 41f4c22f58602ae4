//! Per-IP rate limiting (GCRA via tower_governor)
//!
//! Requires the service to be served with
//! `into_make_service_with_connect_info::<SocketAddr>()` so the peer
//! address is available to the key extractor.

use governor::middleware::StateInformationMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::settings::SettingsError;

/// Governor config keyed by peer IP, emitting `X-RateLimit-*` headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds between quota replenishments
    pub per_second: u64,
    /// Requests allowed immediately
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // 10 requests per minute
        Self {
            per_second: 6,
            burst_size: 10,
        }
    }
}

/// Build the governor config, rejecting zero periods or bursts
pub fn create_governor_config(
    config: &RateLimitConfig,
) -> Result<Arc<DefaultGovernorConfig>, SettingsError> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or_else(|| {
            SettingsError::Invalid(format!(
                "rate limit needs a positive period and burst (per_second={}, burst_size={})",
                config.per_second, config.burst_size
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ten_per_minute() {
        let config = RateLimitConfig::default();
        assert_eq!(config.burst_size, 10);
        assert_eq!(60 / config.per_second, 10);
    }

    #[test]
    fn test_create_governor_config() {
        assert!(create_governor_config(&RateLimitConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_burst_rejected() {
        let config = RateLimitConfig {
            per_second: 1,
            burst_size: 0,
        };
        assert!(matches!(
            create_governor_config(&config),
            Err(SettingsError::Invalid(_))
        ));
    }
}
