//! Training mode
//!
//! Drives episodes against a caller-supplied [`Environment`], feeds outcomes
//! back into the agent, and handles progress logging and periodic
//! checkpoints. The loop itself is thin; everything algorithmic lives in
//! [`crate::rl`].

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use std::path::{Path, PathBuf};

use crate::metrics::TrainingStats;
use crate::rl::{
    save_model, Environment, EpisodeOutcome, PolicyConfig, PongAgent, PpoConfig, PreprocessConfig,
};

/// Configuration for training mode.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of episodes to train
    pub num_episodes: usize,

    /// Path to save the final trained model
    pub save_path: PathBuf,

    /// Save a checkpoint every N episodes
    pub checkpoint_frequency: usize,

    /// Log training progress every N episodes
    pub log_frequency: usize,

    /// Attempt to resume from `save_path` before training; a missing
    /// checkpoint is tolerated
    pub resume: bool,

    /// Frame preprocessing parameters (must match the environment's frames)
    pub preprocess_config: PreprocessConfig,

    /// PPO hyperparameters
    pub ppo_config: PpoConfig,
}

impl TrainConfig {
    /// Create a training configuration with defaults.
    pub fn new(num_episodes: usize, save_path: PathBuf) -> Self {
        Self {
            num_episodes,
            save_path,
            checkpoint_frequency: 100,
            log_frequency: 20,
            resume: false,
            preprocess_config: PreprocessConfig::default(),
            ppo_config: PpoConfig::default(),
        }
    }
}

/// Training loop over a pixel-frame environment.
pub struct TrainMode<B: AutodiffBackend, E: Environment> {
    /// Agent being trained
    agent: PongAgent<B>,

    /// External game environment
    env: E,

    /// Rolling statistics for progress reporting
    stats: TrainingStats,

    /// Training configuration
    config: TrainConfig,

    /// Current episode number
    current_episode: usize,
}

impl<B: AutodiffBackend, E: Environment> TrainMode<B, E> {
    /// Create a new training mode around an environment.
    pub fn new(config: TrainConfig, env: E, device: B::Device) -> Self {
        let policy_config = PolicyConfig::new(config.preprocess_config.output_len());
        let policy = policy_config.init::<B>(&device);

        let agent = PongAgent::new(
            policy,
            policy_config,
            config.ppo_config.clone(),
            config.preprocess_config.clone(),
            device,
        );

        let stats = TrainingStats::new(100);

        Self {
            agent,
            env,
            stats,
            config,
            current_episode: 0,
        }
    }

    /// Run the training loop.
    pub fn run(&mut self) -> Result<()> {
        if self.config.resume {
            self.agent.load_weights(&self.config.save_path)?;
        }

        self.print_header();

        for episode in 0..self.config.num_episodes {
            self.current_episode = episode;

            let outcome = self.run_episode();
            let won = outcome.total_reward > 0.0;
            self.stats
                .record_episode(outcome.total_reward, outcome.step_rewards.len(), won);
            self.stats.record_update(outcome.mean_loss);

            if (episode + 1) % self.config.log_frequency == 0 {
                println!(
                    "[Episode {}/{}] {}",
                    episode + 1,
                    self.config.num_episodes,
                    self.stats.format_summary()
                );
            }

            if (episode + 1) % self.config.checkpoint_frequency == 0 {
                self.save_checkpoint()?;
            }
        }

        save_model(&self.agent, &self.config.save_path).with_context(|| {
            format!("failed to save final model to {:?}", self.config.save_path)
        })?;

        println!("\nTraining complete!");
        println!("Final model saved to: {:?}", self.config.save_path);
        println!("{}", self.stats.format_summary());

        Ok(())
    }

    /// Collect one full episode and run the end-of-episode update.
    fn run_episode(&mut self) -> EpisodeOutcome {
        self.agent.reset();
        let mut observation = self.env.reset();
        let mut done = false;

        while !done {
            let (action, action_prob) = self.agent.get_action(&observation, false);
            let (next_observation, reward, terminated) =
                self.env.step(self.agent.env_action(action));

            self.agent.store_outcome(action, action_prob, reward);

            observation = next_observation;
            done = terminated;
        }

        self.agent.episode_finished()
    }

    /// Access the accumulated statistics.
    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Access the agent (for evaluation after training).
    pub fn agent(&self) -> &PongAgent<B> {
        &self.agent
    }

    fn save_checkpoint(&self) -> Result<()> {
        let checkpoint_path = self
            .config
            .save_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("checkpoint_ep{}", self.current_episode + 1));

        save_model(&self.agent, &checkpoint_path)
            .with_context(|| format!("failed to save checkpoint to {:?}", checkpoint_path))?;

        println!("  Checkpoint saved: {:?}", checkpoint_path);

        Ok(())
    }

    fn print_header(&self) {
        println!("{}", "=".repeat(70));
        println!("PPO Training - ml_pong");
        println!("{}", "=".repeat(70));
        println!("Episodes: {}", self.config.num_episodes);
        println!(
            "Frames: {}x{} (stride {}, {} features)",
            self.config.preprocess_config.frame_width,
            self.config.preprocess_config.frame_height,
            self.config.preprocess_config.stride,
            self.config.preprocess_config.output_len()
        );
        println!("PPO Config:");
        println!("  Learning rate: {}", self.config.ppo_config.learning_rate);
        println!("  Gamma: {}", self.config.ppo_config.gamma);
        println!("  Clip epsilon: {}", self.config.ppo_config.clip_epsilon);
        println!("  Passes per episode: {}", self.config.ppo_config.k_epochs);
        println!("  Batch cap: {}", self.config.ppo_config.batch_cap);
        println!(
            "Checkpoints: every {} episodes",
            self.config.checkpoint_frequency
        );
        println!("Save path: {:?}", self.config.save_path);
        println!("{}", "=".repeat(70));
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::environment::testing::ScriptedRally;
    use crate::rl::{default_device, TrainingBackend};
    use tempfile::TempDir;

    fn test_config(num_episodes: usize, save_path: PathBuf) -> TrainConfig {
        let mut config = TrainConfig::new(num_episodes, save_path);
        config.preprocess_config = PreprocessConfig::new(20, 20);
        config.checkpoint_frequency = 1000;
        config.log_frequency = 1000;
        config
    }

    #[test]
    fn test_train_config_defaults() {
        let config = TrainConfig::new(1000, PathBuf::from("model"));
        assert_eq!(config.num_episodes, 1000);
        assert_eq!(config.checkpoint_frequency, 100);
        assert!(!config.resume);
    }

    #[test]
    fn test_run_trains_and_saves_final_model() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("model");

        let env = ScriptedRally::new(20, 20, 4, 2);
        let device = default_device();
        let mut mode =
            TrainMode::<TrainingBackend, _>::new(test_config(2, save_path.clone()), env, device);

        mode.run().unwrap();

        assert_eq!(mode.stats().total_episodes(), 2);
        assert_eq!(mode.stats().total_steps(), 16);
        assert!(save_path.with_extension("meta.json").exists());
    }

    #[test]
    fn test_resume_with_missing_checkpoint_continues() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("model");

        let env = ScriptedRally::new(20, 20, 4, 1);
        let mut config = test_config(1, save_path);
        config.resume = true;

        let device = default_device();
        let mut mode = TrainMode::<TrainingBackend, _>::new(config, env, device);

        // Missing checkpoint is reported, not fatal.
        mode.run().unwrap();
        assert_eq!(mode.stats().total_episodes(), 1);
    }

    #[test]
    fn test_episode_drains_agent_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("model");

        let env = ScriptedRally::new(20, 20, 3, 2);
        let device = default_device();
        let mut mode =
            TrainMode::<TrainingBackend, _>::new(test_config(1, save_path), env, device);

        let outcome = mode.run_episode();
        assert_eq!(outcome.step_rewards.len(), 6);
        assert_eq!(mode.agent().steps_collected(), 0);
    }
}
