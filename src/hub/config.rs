//! Hub configuration

use std::time::Duration;

/// Default time a single member send may wait for queue space
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-connection queue depth
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// Hub configuration options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Upper bound for one member's send during a broadcast.
    /// A member that cannot accept the message in time is dropped.
    pub send_timeout: Duration,

    /// Queue depth for each connection created through the hub
    pub connection_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }
}

impl HubConfig {
    /// Set the per-member send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the per-connection queue depth (minimum 1)
    pub fn connection_buffer(mut self, size: usize) -> Self {
        self.connection_buffer = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.send_timeout, DEFAULT_SEND_TIMEOUT);
        assert_eq!(config.connection_buffer, DEFAULT_CONNECTION_BUFFER);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .send_timeout(Duration::from_millis(250))
            .connection_buffer(0);

        assert_eq!(config.send_timeout, Duration::from_millis(250));
        assert_eq!(config.connection_buffer, 1);
    }
}
