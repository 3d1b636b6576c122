//! Runtime configuration for the server binary

use crate::liveness::{
    LivenessPolicy, DEFAULT_CHECK_INTERVAL, DEFAULT_UDP_TIMEOUT, DEFAULT_WS_TIMEOUT,
};
use shared::{DEFAULT_UDP_PORT, DEFAULT_WS_PORT};
use std::time::Duration;
use thiserror::Error;

/// Which transport adapters to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportMode {
    Udp,
    Ws,
    Both,
}

impl TransportMode {
    pub fn udp_enabled(self) -> bool {
        matches!(self, TransportMode::Udp | TransportMode::Both)
    }

    pub fn ws_enabled(self) -> bool {
        matches!(self, TransportMode::Ws | TransportMode::Both)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Check interval must be greater than zero")]
    ZeroCheckInterval,
    #[error("Check interval {interval:?} exceeds half of the {timeout:?} timeout")]
    CheckIntervalTooLong { interval: Duration, timeout: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub udp_port: u16,
    pub ws_port: u16,
    pub transport: TransportMode,
    pub udp_timeout: Duration,
    pub ws_timeout: Duration,
    pub check_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            udp_port: DEFAULT_UDP_PORT,
            ws_port: DEFAULT_WS_PORT,
            transport: TransportMode::Both,
            udp_timeout: DEFAULT_UDP_TIMEOUT,
            ws_timeout: DEFAULT_WS_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn udp_addr(&self) -> String {
        format!("{}:{}", self.host, self.udp_port)
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    /// Checks that a silent participant is noticed within roughly one
    /// timeout: the interval may be at most half the shortest enabled one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval.is_zero() {
            return Err(ConfigError::ZeroCheckInterval);
        }

        let timeouts = [
            (self.transport.udp_enabled(), self.udp_timeout),
            (self.transport.ws_enabled(), self.ws_timeout),
        ];
        let shortest = timeouts
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, timeout)| *timeout)
            .min();

        match shortest {
            Some(timeout) if self.check_interval * 2 > timeout => {
                Err(ConfigError::CheckIntervalTooLong {
                    interval: self.check_interval,
                    timeout,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn policy(&self) -> LivenessPolicy {
        LivenessPolicy {
            udp_timeout: self.udp_timeout,
            ws_timeout: self.ws_timeout,
            check_interval: self.check_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.udp_addr(), "127.0.0.1:7777");
        assert_eq!(config.ws_addr(), "127.0.0.1:8080");
        assert_eq!(config.policy(), LivenessPolicy::default());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ServerConfig {
            check_interval: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCheckInterval));
    }

    #[test]
    fn test_interval_checked_against_enabled_transports_only() {
        let mut config = ServerConfig {
            check_interval: Duration::from_secs(8),
            ..ServerConfig::default()
        };

        // 8s is more than half of the 10s UDP timeout
        assert_eq!(
            config.validate(),
            Err(ConfigError::CheckIntervalTooLong {
                interval: Duration::from_secs(8),
                timeout: Duration::from_secs(10),
            })
        );

        // but fine against the 30s WebSocket timeout alone
        config.transport = TransportMode::Ws;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_transport_mode() {
        assert!(TransportMode::Both.udp_enabled() && TransportMode::Both.ws_enabled());
        assert!(TransportMode::Udp.udp_enabled() && !TransportMode::Udp.ws_enabled());
        assert!(!TransportMode::Ws.udp_enabled() && TransportMode::Ws.ws_enabled());
    }
}
