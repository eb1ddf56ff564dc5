//! Discounted return computation and advantage normalization
//!
//! Pong-style games are scored in rounds: the environment pays a non-zero
//! reward exactly when a point ends. Credit from a future round must not
//! bleed backward into a round that is already decided, so the running
//! discounted sum is reset whenever a non-zero reward is encountered during
//! the backward sweep. This is a softer boundary than episode termination;
//! the episode keeps going, only the discounting restarts.

use tracing::warn;

/// Per-step discounted return-to-go over one episode's reward sequence.
///
/// Traverses rewards from last to first with a running accumulator. A
/// non-zero reward resets the accumulator before being incorporated, so each
/// scoring round is credited independently.
pub fn discount_rewards(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = 0.0;
    for t in (0..rewards.len()).rev() {
        if rewards[t] != 0.0 {
            // Round boundary: the point is decided here.
            running = 0.0;
        }
        running = rewards[t] + gamma * running;
        returns[t] = running;
    }
    returns
}

/// Normalize to zero mean and unit standard deviation, in place.
///
/// A degenerate all-equal batch has zero variance; dividing would produce
/// NaN, so the division is skipped (the centered values are already all
/// zero) and a diagnostic is emitted instead.
pub fn normalize_advantages(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt();

    for v in values.iter_mut() {
        *v -= mean;
    }

    if std > f32::EPSILON {
        for v in values.iter_mut() {
            *v /= std;
        }
    } else {
        warn!(
            batch_len = values.len(),
            "zero-variance advantage batch, skipping normalization"
        );
    }
}
