//! Dense policy network and clipped-surrogate loss
//!
//! The policy maps a flattened motion-trail feature vector through two dense
//! layers to logits over a small discrete action set. Inference normalizes
//! the logits into a categorical distribution and either samples from it
//! (training rollouts) or takes the argmax (evaluation). Training
//! reconstructs the probability of each taken action from current
//! parameters and forms the PPO clipped importance-ratio objective against
//! the probability recorded at sampling time.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{
        activation::{relu, softmax},
        backend::Backend,
        ElementConversion, Int, Tensor,
    },
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for the policy network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Feature vector width; must equal the preprocessor's output length
    pub input_dim: usize,

    /// Hidden layer width (default: 512)
    pub hidden_dim: usize,

    /// Number of native actions the network outputs (default: 2, up/down)
    pub num_actions: usize,

    /// Fixed offset added to native action indices to obtain the
    /// environment's action ids (default: 1, skipping the stay action)
    pub action_offset: usize,
}

impl PolicyConfig {
    /// Configuration for a given feature width with default layer sizes.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            hidden_dim: 512,
            num_actions: 2,
            action_offset: 1,
        }
    }

    /// Remap a native action index to the environment's action id.
    pub fn env_action(&self, action: usize) -> usize {
        action + self.action_offset
    }

    /// Check that the parameters describe a usable network.
    pub fn validate(&self) -> Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be positive".to_string());
        }
        if self.hidden_dim == 0 {
            return Err("hidden_dim must be positive".to_string());
        }
        if self.num_actions < 2 {
            return Err(format!(
                "num_actions must be at least 2, got {}",
                self.num_actions
            ));
        }
        Ok(())
    }

    /// Initialize the policy network from this configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNet<B> {
        PolicyNet {
            fc1: LinearConfig::new(self.input_dim, self.hidden_dim).init(device),
            fc2: LinearConfig::new(self.hidden_dim, self.num_actions).init(device),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        // 200x200 frames at stride 5 flatten to 1600 features.
        Self::new(1600)
    }
}

/// Two-layer dense policy network.
///
/// Generic over the Burn backend so the same module runs plain for
/// inference and wrapped in `Autodiff` for training.
#[derive(Module, Debug)]
pub struct PolicyNet<B: Backend> {
    /// Feature vector to hidden representation
    fc1: Linear<B>,
    /// Hidden representation to action logits
    fc2: Linear<B>,
}

impl<B: Backend> PolicyNet<B> {
    /// Raw action logits for a batch of feature vectors.
    ///
    /// Input `[batch, input_dim]`, output `[batch, num_actions]`. A feature
    /// width that does not match the configured input layer is a
    /// configuration error and fails inside the matmul.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fc1.forward(features);
        let x = relu(x);
        self.fc2.forward(x)
    }

    /// Select an action for a single feature vector.
    ///
    /// In stochastic mode, samples from the softmax distribution and
    /// returns the sampled action's own probability, which is what the
    /// update later forms its importance ratio against. In deterministic
    /// mode (evaluation), returns the argmax action with probability 1.0.
    ///
    /// The returned probability is always in (0, 1]: softmax output is
    /// strictly positive.
    pub fn act<R: Rng>(
        &self,
        feature: Tensor<B, 2>,
        deterministic: bool,
        rng: &mut R,
    ) -> (usize, f32) {
        let logits = self.forward(feature); // [1, num_actions]
        let probs = softmax(logits, 1);

        if deterministic {
            let action = probs
                .argmax(1)
                .squeeze::<1>(1)
                .into_scalar()
                .elem::<i64>() as usize;
            (action, 1.0)
        } else {
            let probs_vec: Vec<f32> = probs
                .into_data()
                .to_vec()
                .expect("failed to read action probabilities");
            let action = sample_categorical(&probs_vec, rng);
            (action, probs_vec[action])
        }
    }

    /// Clipped-surrogate PPO loss over one mini-batch.
    ///
    /// Reconstructs the probability of each taken action from current
    /// parameters, forms `ratio = current / old`, and averages
    /// `-min(ratio * A, clip(ratio, 1 - eps, 1 + eps) * A)`. Outside the
    /// clip band on the advantage's side the gradient contribution is
    /// exactly zero, bounding how much one batch can move the policy.
    ///
    /// # Panics
    ///
    /// Panics on an empty batch; silently returning zero would hide a
    /// broken rollout.
    pub fn ppo_loss(
        &self,
        features: Tensor<B, 2>,
        actions: Tensor<B, 1, Int>,
        old_probs: Tensor<B, 1>,
        advantages: Tensor<B, 1>,
        clip_epsilon: f32,
    ) -> Tensor<B, 1> {
        let [batch, _] = features.dims();
        assert!(batch > 0, "PPO loss requires a non-empty batch");

        let logits = self.forward(features);
        let probs = softmax(logits, 1);
        let taken: Tensor<B, 1> = probs.gather(1, actions.unsqueeze_dim(1)).squeeze(1);

        let ratio = taken / old_probs;
        let surr1 = ratio.clone() * advantages.clone();
        let surr2 = ratio.clamp(1.0 - clip_epsilon, 1.0 + clip_epsilon) * advantages;

        surr1.min_pair(surr2).neg().mean()
    }
}

/// Sample an index proportionally to a probability vector.
fn sample_categorical<R: Rng>(probs: &[f32], rng: &mut R) -> usize {
    let random_val: f32 = rng.sample(rand::distributions::Standard);
    let mut cumsum = 0.0;

    for (idx, &prob) in probs.iter().enumerate() {
        cumsum += prob;
        if random_val < cumsum {
            return idx;
        }
    }

    // Rounding left the cumulative sum just under 1.0.
    probs.len() - 1
}
