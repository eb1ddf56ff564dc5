//! Trajectory buffer for on-policy rollout data
//!
//! Accumulates the aligned per-step records of one episode: preprocessed
//! features, native action indices, the probability the policy assigned to
//! each sampled action, and the raw rewards. The buffer is drained by the
//! agent after every policy update; stale cross-episode data would corrupt
//! the return computation.

use burn::tensor::TensorData;
use rand::seq::SliceRandom;
use rand::Rng;

/// Aligned per-step storage for one episode of experience.
///
/// Unlike a fixed-size rollout buffer there is no capacity bound: a single
/// episode naturally limits growth to a few thousand steps.
pub struct TrajectoryBuffer {
    /// Flattened feature vectors, one row per step
    features: Vec<Vec<f32>>,

    /// Native (model-side) action indices
    actions: Vec<usize>,

    /// Probability of each sampled action at sampling time, in (0, 1]
    action_probs: Vec<f32>,

    /// Raw rewards; non-zero marks a round boundary
    rewards: Vec<f32>,

    /// Expected feature width, checked on every push
    feature_len: usize,
}

impl TrajectoryBuffer {
    pub fn new(feature_len: usize) -> Self {
        Self {
            features: Vec::new(),
            actions: Vec::new(),
            action_probs: Vec::new(),
            rewards: Vec::new(),
            feature_len,
        }
    }

    /// Append one aligned record.
    ///
    /// # Panics
    ///
    /// Panics on a feature-width mismatch (configuration error) or an
    /// action probability outside (0, 1], which would make the importance
    /// ratio undefined later.
    pub fn push(&mut self, feature: Vec<f32>, action: usize, action_prob: f32, reward: f32) {
        assert_eq!(
            feature.len(),
            self.feature_len,
            "feature width {} does not match expected {}",
            feature.len(),
            self.feature_len
        );
        assert!(
            action_prob > 0.0 && action_prob <= 1.0,
            "action probability must be in (0, 1], got {}",
            action_prob
        );

        self.features.push(feature);
        self.actions.push(action);
        self.action_probs.push(action_prob);
        self.rewards.push(reward);
    }

    /// Number of stored steps.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Raw per-step reward sequence of the episode so far.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Sample a mini-batch of indices without replacement.
    ///
    /// Shuffle-and-slice with an injected RNG so tests can pin the seed.
    /// The batch size is the smaller of `batch_cap` and the buffer length.
    pub fn sample_indices<R: Rng>(&self, batch_cap: usize, rng: &mut R) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        indices.truncate(batch_cap.min(self.len()));
        indices
    }

    /// Assemble tensors for one training batch.
    ///
    /// `advantages` must be index-aligned with the buffer (one value per
    /// stored step). Returns `(features, actions, action_probs, advantages)`
    /// as backend-agnostic [`TensorData`].
    ///
    /// # Panics
    ///
    /// Panics on an empty index set or a misaligned advantage array.
    pub fn get_batch(
        &self,
        indices: &[usize],
        advantages: &[f32],
    ) -> (TensorData, TensorData, TensorData, TensorData) {
        assert!(!indices.is_empty(), "cannot build a batch from zero samples");
        assert_eq!(
            advantages.len(),
            self.len(),
            "advantage array length {} does not match buffer length {}",
            advantages.len(),
            self.len()
        );

        let batch = indices.len();

        let mut feature_data = Vec::with_capacity(batch * self.feature_len);
        for &i in indices {
            feature_data.extend_from_slice(&self.features[i]);
        }

        let action_data: Vec<i32> = indices.iter().map(|&i| self.actions[i] as i32).collect();
        let prob_data: Vec<f32> = indices.iter().map(|&i| self.action_probs[i]).collect();
        let advantage_data: Vec<f32> = indices.iter().map(|&i| advantages[i]).collect();

        (
            TensorData::new(feature_data, [batch, self.feature_len]),
            TensorData::new(action_data, [batch]),
            TensorData::new(prob_data, [batch]),
            TensorData::new(advantage_data, [batch]),
        )
    }

    /// Drop all stored records ahead of the next episode.
    pub fn clear(&mut self) {
        self.features.clear();
        self.actions.clear();
        self.action_probs.clear();
        self.rewards.clear();
    }
}
