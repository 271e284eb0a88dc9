//! Realtime delivery configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Realtime delivery configuration
///
/// Controls the per-user broadcast channels that carry live message hints.
/// The capacity bounds how many undelivered events a slow subscriber can
/// queue before it starts seeing gaps and falls back to a history resync.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Buffered events per user channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl RealtimeConfig {
    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_config_defaults() {
        let config = RealtimeConfig::default();
        assert_eq!(config.channel_capacity, 256);
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let config = RealtimeConfig {
            channel_capacity: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(RealtimeConfig::default().validate().is_ok());
    }
}
