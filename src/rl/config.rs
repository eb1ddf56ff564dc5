//! PPO hyperparameter configuration

use serde::{Deserialize, Serialize};

/// Hyperparameters of the clipped-surrogate PPO update.
///
/// Defaults are the values the agent was tuned with on the two-paddle game.
///
/// # Example
///
/// ```rust
/// use ml_pong::rl::PpoConfig;
///
/// let config = PpoConfig {
///     gamma: 0.98,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpoConfig {
    /// Learning rate for the Adam optimizer
    ///
    /// Default: 1e-3
    pub learning_rate: f64,

    /// Discount factor for future rewards within a round
    ///
    /// Default: 0.99
    pub gamma: f32,

    /// Clipping parameter bounding how far a single update may trust an
    /// importance ratio
    ///
    /// Default: 0.1
    pub clip_epsilon: f32,

    /// Number of optimization passes per episode update
    ///
    /// Default: 5
    pub k_epochs: usize,

    /// Upper bound on the mini-batch size; the effective batch is the
    /// smaller of this and the buffer length
    ///
    /// Default: 24576
    pub batch_cap: usize,

    /// Seed for the agent's sampling and shuffling RNG
    ///
    /// Default: 0
    pub seed: u64,
}

impl PpoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that all hyperparameters are in valid ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1], got {}", self.gamma));
        }

        if self.clip_epsilon <= 0.0 || self.clip_epsilon > 1.0 {
            return Err(format!(
                "clip_epsilon must be in (0, 1], got {}",
                self.clip_epsilon
            ));
        }

        if self.k_epochs == 0 {
            return Err("k_epochs must be at least 1".to_string());
        }

        if self.batch_cap == 0 {
            return Err("batch_cap must be at least 1".to_string());
        }

        Ok(())
    }
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.99,
            clip_epsilon: 0.1,
            k_epochs: 5,
            batch_cap: 24576,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PpoConfig::default();
        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.clip_epsilon, 0.1);
        assert_eq!(config.k_epochs, 5);
        assert_eq!(config.batch_cap, 24576);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PpoConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_negative_learning_rate() {
        let config = PpoConfig {
            learning_rate: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_gamma_out_of_range() {
        let mut config = PpoConfig::default();
        config.gamma = 1.5;
        assert!(config.validate().is_err());

        config.gamma = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_clip_epsilon_invalid() {
        let mut config = PpoConfig::default();
        config.clip_epsilon = 0.0;
        assert!(config.validate().is_err());

        config.clip_epsilon = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_epochs_and_batch() {
        let mut config = PpoConfig::default();
        config.k_epochs = 0;
        assert!(config.validate().is_err());

        config.k_epochs = 5;
        config.batch_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = PpoConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PpoConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gamma, config.gamma);
        assert_eq!(back.batch_cap, config.batch_cap);
    }
}
