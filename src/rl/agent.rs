//! PPO agent facade for the two-paddle game
//!
//! Composes the preprocessor, policy network, trajectory buffer and return
//! estimator behind the three calls the episode loop needs: `get_action`,
//! `store_outcome` and `episode_finished`. The policy parameters are the
//! only state that survives across episodes; everything else is reset or
//! drained at episode boundaries.

use std::path::Path;

use anyhow::{ensure, Result};
use burn::{
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion, Int, Tensor, TensorData},
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use super::buffer::TrajectoryBuffer;
use super::config::PpoConfig;
use super::environment::Frame;
use super::persistence;
use super::policy::{PolicyConfig, PolicyNet};
use super::preprocess::{FramePreprocessor, PreprocessConfig};
use super::returns::{discount_rewards, normalize_advantages};

/// Summary of one finished episode, returned by
/// [`PongAgent::episode_finished`].
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    /// Sum of all step rewards
    pub total_reward: f32,

    /// Raw per-step reward sequence, for metrics and plotting collaborators
    pub step_rewards: Vec<f32>,

    /// Surrogate loss averaged over the update passes
    pub mean_loss: f32,
}

/// On-policy PPO agent operating on raw pixel frames.
///
/// # Type Parameters
///
/// * `B` - Autodiff backend for gradient computation
pub struct PongAgent<B: AutodiffBackend> {
    /// Policy network (the only cross-episode state)
    policy: PolicyNet<B>,

    /// Adam optimizer for the policy parameters
    optim: OptimizerAdaptor<Adam, PolicyNet<B>, B>,

    /// Network layout, kept for persistence and action remapping
    policy_config: PolicyConfig,

    /// PPO hyperparameters
    config: PpoConfig,

    /// Frame-to-feature pipeline, reset at every episode start
    preprocessor: FramePreprocessor,

    /// Aligned per-step records of the running episode
    buffer: TrajectoryBuffer,

    /// Feature produced by the most recent `get_action` call
    last_feature: Option<Vec<f32>>,

    /// Seeded RNG driving action sampling and mini-batch shuffling
    rng: StdRng,

    /// Episode counter
    episodes_trained: usize,

    /// Device for tensor operations
    device: B::Device,
}

impl<B: AutodiffBackend> PongAgent<B> {
    /// Create a new agent.
    ///
    /// # Panics
    ///
    /// Panics if either configuration is invalid or the preprocessor's
    /// output length does not match the policy's input width. Shape
    /// mismatches are configuration errors and must not survive into a
    /// training run.
    pub fn new(
        policy: PolicyNet<B>,
        policy_config: PolicyConfig,
        config: PpoConfig,
        preprocess_config: PreprocessConfig,
        device: B::Device,
    ) -> Self {
        config.validate().expect("invalid PPO configuration");
        policy_config.validate().expect("invalid policy configuration");
        assert_eq!(
            preprocess_config.output_len(),
            policy_config.input_dim,
            "preprocessor output length {} does not match policy input width {}",
            preprocess_config.output_len(),
            policy_config.input_dim
        );

        let optim = AdamConfig::new().init();
        let buffer = TrajectoryBuffer::new(policy_config.input_dim);
        let preprocessor = FramePreprocessor::new(preprocess_config);
        let rng = StdRng::seed_from_u64(config.seed);

        Self {
            policy,
            optim,
            policy_config,
            config,
            preprocessor,
            buffer,
            last_feature: None,
            rng,
            episodes_trained: 0,
            device,
        }
    }

    /// Prepare for a new episode.
    ///
    /// # Panics
    ///
    /// Panics if the previous episode's trajectory was never consumed by
    /// [`episode_finished`](Self::episode_finished); stale records would
    /// corrupt the next return computation.
    pub fn reset(&mut self) {
        assert!(
            self.buffer.is_empty(),
            "trajectory buffer not drained before reset; call episode_finished first"
        );
        self.preprocessor.reset();
        self.last_feature = None;
    }

    /// Select an action for the current raw observation.
    ///
    /// Preprocesses the frame against the stored motion trail, then runs
    /// the policy in no-grad mode. Returns the native action index and its
    /// probability; use [`env_action`](Self::env_action) to obtain the id
    /// to hand to the environment. With `evaluation` set, the action is the
    /// argmax and the probability is reported as 1.0.
    pub fn get_action(&mut self, observation: &Frame, evaluation: bool) -> (usize, f32) {
        let feature = self.preprocessor.process(observation);
        let feature_tensor: Tensor<B::InnerBackend, 2> = Tensor::from_data(
            TensorData::new(feature.clone(), [1, feature.len()]),
            &self.device,
        );

        let policy = self.policy.clone().valid();
        let (action, action_prob) = policy.act(feature_tensor, evaluation, &mut self.rng);

        self.last_feature = Some(feature);
        (action, action_prob)
    }

    /// Remap a native action index to the environment's action id.
    pub fn env_action(&self, action: usize) -> usize {
        self.policy_config.env_action(action)
    }

    /// Record the outcome of the most recent action.
    ///
    /// # Panics
    ///
    /// Panics if called before [`get_action`](Self::get_action) produced a
    /// feature for this step.
    pub fn store_outcome(&mut self, action: usize, action_prob: f32, reward: f32) {
        let feature = self
            .last_feature
            .take()
            .expect("store_outcome called without a preceding get_action");
        self.buffer.push(feature, action, action_prob, reward);
    }

    /// Compute returns and run the PPO update for the finished episode.
    ///
    /// Discounted returns respect intra-episode round boundaries, are
    /// normalized (with a zero-variance guard), and serve as advantage
    /// weights for `k_epochs` clipped-surrogate passes, each over a fresh
    /// mini-batch sampled without replacement. The trajectory buffer is
    /// cleared afterwards.
    ///
    /// # Panics
    ///
    /// Panics if no transitions were collected; updating from zero samples
    /// is a precondition violation, not a no-op.
    pub fn episode_finished(&mut self) -> EpisodeOutcome {
        assert!(
            !self.buffer.is_empty(),
            "episode_finished called with no transitions collected"
        );

        let step_rewards = self.buffer.rewards().to_vec();
        let total_reward = step_rewards.iter().sum();

        let mut advantages = discount_rewards(&step_rewards, self.config.gamma);
        normalize_advantages(&mut advantages);

        let mean_loss = self.update_policy(&advantages);

        self.buffer.clear();
        self.last_feature = None;
        self.episodes_trained += 1;

        EpisodeOutcome {
            total_reward,
            step_rewards,
            mean_loss,
        }
    }

    /// Run the configured number of optimization passes over the buffer.
    fn update_policy(&mut self, advantages: &[f32]) -> f32 {
        let mut total_loss = 0.0;

        for _ in 0..self.config.k_epochs {
            let indices = self.buffer.sample_indices(self.config.batch_cap, &mut self.rng);
            let (features_data, actions_data, probs_data, advantages_data) =
                self.buffer.get_batch(&indices, advantages);

            let features: Tensor<B, 2> = Tensor::from_data(features_data, &self.device);
            let actions: Tensor<B, 1, Int> = Tensor::from_data(actions_data, &self.device);
            let old_probs: Tensor<B, 1> = Tensor::from_data(probs_data, &self.device);
            let advantages_t: Tensor<B, 1> = Tensor::from_data(advantages_data, &self.device);

            let loss = self.policy.ppo_loss(
                features,
                actions,
                old_probs,
                advantages_t,
                self.config.clip_epsilon,
            );

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.policy);
            self.policy = self
                .optim
                .step(self.config.learning_rate, self.policy.clone(), grads);

            total_loss += loss.into_scalar().elem::<f32>();
        }

        total_loss / self.config.k_epochs as f32
    }

    /// Replace the policy weights from a checkpoint, if one exists.
    ///
    /// A missing file is a recoverable condition: the agent keeps its
    /// freshly initialized weights, a warning is logged, and `Ok(false)` is
    /// returned. A present-but-incompatible checkpoint is an error.
    pub fn load_weights(&mut self, path: &Path) -> Result<bool> {
        match persistence::load_network_if_exists::<B>(path, &self.device)? {
            Some((network, metadata)) => {
                ensure!(
                    metadata.policy_config.input_dim == self.policy_config.input_dim
                        && metadata.policy_config.num_actions == self.policy_config.num_actions,
                    "checkpoint network layout {:?} does not match configured {:?}",
                    metadata.policy_config,
                    self.policy_config
                );
                self.policy = network;
                self.episodes_trained = metadata.episodes_trained;
                info!(
                    path = %path.display(),
                    episodes = metadata.episodes_trained,
                    "loaded policy checkpoint"
                );
                Ok(true)
            }
            None => {
                warn!(
                    path = %path.display(),
                    "checkpoint not found, continuing with freshly initialized weights"
                );
                Ok(false)
            }
        }
    }

    /// Number of steps collected in the running episode.
    pub fn steps_collected(&self) -> usize {
        self.buffer.len()
    }

    /// Get a reference to the policy network.
    pub fn network(&self) -> &PolicyNet<B> {
        &self.policy
    }

    /// Get a reference to the PPO configuration.
    pub fn config(&self) -> &PpoConfig {
        &self.config
    }

    /// Get a reference to the network layout configuration.
    pub fn policy_config(&self) -> &PolicyConfig {
        &self.policy_config
    }

    /// Get a reference to the preprocessing configuration.
    pub fn preprocess_config(&self) -> &PreprocessConfig {
        self.preprocessor.config()
    }

    /// Number of episodes trained so far.
    pub fn episodes_trained(&self) -> usize {
        self.episodes_trained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::environment::FRAME_CHANNELS;
    use crate::rl::TrainingBackend;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::tensor::backend::Backend;

    fn small_preprocess_config() -> PreprocessConfig {
        // 20x20 frames at stride 5 give a 4x4 = 16 element feature.
        PreprocessConfig::new(20, 20)
    }

    fn create_test_agent(seed: u64) -> PongAgent<TrainingBackend> {
        let device = NdArrayDevice::default();
        let preprocess_config = small_preprocess_config();
        let policy_config = PolicyConfig::new(preprocess_config.output_len());

        TrainingBackend::seed(seed);
        let policy = policy_config.init::<TrainingBackend>(&device);
        // Burn materializes parameters lazily on first use; run a dummy
        // forward so the weights are drawn from the RNG state seeded above.
        let _ = policy.forward(Tensor::zeros(
            [1, preprocess_config.output_len()],
            &device,
        ));

        let ppo_config = PpoConfig {
            seed,
            ..Default::default()
        };

        PongAgent::new(policy, policy_config, ppo_config, preprocess_config, device)
    }

    fn test_frame(step: usize) -> Frame {
        let mut pixels = vec![0u8; 20 * 20 * FRAME_CHANNELS];
        let y = step % 20;
        let x = (step * 5) % 20;
        let base = (y * 20 + x) * FRAME_CHANNELS;
        for c in 0..FRAME_CHANNELS {
            pixels[base + c] = 255;
        }
        Frame::new(20, 20, pixels)
    }

    /// Drive one episode with the given reward tape.
    fn run_episode(agent: &mut PongAgent<TrainingBackend>, rewards: &[f32]) -> EpisodeOutcome {
        agent.reset();
        for (step, &reward) in rewards.iter().enumerate() {
            let (action, prob) = agent.get_action(&test_frame(step), false);
            agent.store_outcome(action, prob, reward);
        }
        agent.episode_finished()
    }

    /// Logits for a fixed probe feature, to detect parameter changes.
    fn probe_logits(agent: &PongAgent<TrainingBackend>) -> Vec<f32> {
        let device = NdArrayDevice::default();
        let probe = Tensor::ones([1, 16], &device);
        agent
            .network()
            .clone()
            .valid()
            .forward(probe)
            .into_data()
            .to_vec()
            .unwrap()
    }

    #[test]
    fn test_agent_creation() {
        let agent = create_test_agent(0);
        assert_eq!(agent.episodes_trained(), 0);
        assert_eq!(agent.steps_collected(), 0);
    }

    #[test]
    #[should_panic(expected = "does not match policy input width")]
    fn test_feature_width_mismatch_is_fatal() {
        let device = NdArrayDevice::default();
        let preprocess_config = small_preprocess_config(); // output 16
        let policy_config = PolicyConfig::new(32); // wrong width
        let policy = policy_config.init::<TrainingBackend>(&device);

        let _ = PongAgent::new(
            policy,
            policy_config,
            PpoConfig::default(),
            preprocess_config,
            device,
        );
    }

    #[test]
    fn test_get_action_probability_bounds() {
        let mut agent = create_test_agent(1);
        agent.reset();

        for step in 0..10 {
            let (action, prob) = agent.get_action(&test_frame(step), false);
            assert!(action < 2);
            assert!(prob > 0.0 && prob <= 1.0);
            agent.store_outcome(action, prob, 0.0);
        }
        assert_eq!(agent.steps_collected(), 10);

        // Drain so later tests of this agent instance could reset cleanly.
        agent.episode_finished();
    }

    #[test]
    #[should_panic(expected = "without a preceding get_action")]
    fn test_store_outcome_requires_get_action() {
        let mut agent = create_test_agent(0);
        agent.reset();
        agent.store_outcome(0, 0.5, 0.0);
    }

    #[test]
    #[should_panic(expected = "no transitions collected")]
    fn test_update_with_empty_trajectory_is_fatal() {
        let mut agent = create_test_agent(0);
        agent.reset();
        agent.episode_finished();
    }

    #[test]
    #[should_panic(expected = "not drained before reset")]
    fn test_reset_with_pending_trajectory_is_fatal() {
        let mut agent = create_test_agent(0);
        agent.reset();
        let (action, prob) = agent.get_action(&test_frame(0), false);
        agent.store_outcome(action, prob, 0.0);
        agent.reset();
    }

    #[test]
    fn test_episode_finished_updates_parameters_and_drains() {
        let mut agent = create_test_agent(2);
        let before = probe_logits(&agent);

        let outcome = run_episode(&mut agent, &[0.0, 0.0, 1.0, 0.0, 0.0, -1.0]);

        assert_eq!(outcome.total_reward, 0.0);
        assert_eq!(outcome.step_rewards.len(), 6);
        assert!(outcome.mean_loss.is_finite());
        assert_eq!(agent.steps_collected(), 0);
        assert_eq!(agent.episodes_trained(), 1);

        let after = probe_logits(&agent);
        assert_ne!(before, after, "update should change policy parameters");
    }

    #[test]
    fn test_identical_seeds_give_identical_updates() {
        let rewards = [0.0, 0.0, 1.0];

        let mut agent_a = create_test_agent(42);
        let mut agent_b = create_test_agent(42);
        assert_eq!(probe_logits(&agent_a), probe_logits(&agent_b));

        run_episode(&mut agent_a, &rewards);
        run_episode(&mut agent_b, &rewards);

        assert_eq!(
            probe_logits(&agent_a),
            probe_logits(&agent_b),
            "same seed and same data must produce identical parameters"
        );
    }

    #[test]
    fn test_all_equal_rewards_update_stays_finite() {
        let mut agent = create_test_agent(3);
        let outcome = run_episode(&mut agent, &[5.0, 5.0, 5.0, 5.0]);
        assert!(outcome.mean_loss.is_finite());
    }

    #[test]
    fn test_evaluation_mode_reports_unit_probability() {
        let mut agent = create_test_agent(4);
        agent.reset();
        let (_, prob) = agent.get_action(&test_frame(0), true);
        assert_eq!(prob, 1.0);
    }

    #[test]
    fn test_env_action_remapping() {
        let agent = create_test_agent(0);
        assert_eq!(agent.env_action(0), 1);
        assert_eq!(agent.env_action(1), 2);
    }

    #[test]
    fn test_load_weights_missing_file_is_recoverable() {
        let mut agent = create_test_agent(5);
        let before = probe_logits(&agent);

        let loaded = agent
            .load_weights(Path::new("/nonexistent/model.mpk"))
            .unwrap();

        assert!(!loaded);
        assert_eq!(probe_logits(&agent), before);
    }
}
