//! Environment boundary for two-paddle pixel games
//!
//! The game itself lives outside this crate. Training only requires that the
//! environment hands back raw RGB frames and scalar rewards through the
//! [`Environment`] trait. Rewards follow the usual pong convention: zero on
//! ordinary steps, non-zero when a point is scored. The return estimator in
//! [`crate::rl::returns`] depends on that convention.

/// Number of color channels in a raw frame.
pub const FRAME_CHANNELS: usize = 3;

/// A raw RGB observation as produced by the game each step.
///
/// Pixels are stored row-major, channels interleaved
/// (`[y * width * 3 + x * 3 + c]`). The frame is read-only input to the
/// agent; all per-episode state lives in the preprocessor.
#[derive(Debug, Clone)]
pub struct Frame {
    height: usize,
    width: usize,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a raw pixel buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer length does not match `height * width * 3`.
    pub fn new(height: usize, width: usize, pixels: Vec<u8>) -> Self {
        assert_eq!(
            pixels.len(),
            height * width * FRAME_CHANNELS,
            "frame buffer length {} does not match {}x{}x{}",
            pixels.len(),
            height,
            width,
            FRAME_CHANNELS
        );
        Self {
            height,
            width,
            pixels,
        }
    }

    /// Frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Mean intensity over the color channels at `(y, x)`.
    pub fn intensity(&self, y: usize, x: usize) -> f32 {
        let base = (y * self.width + x) * FRAME_CHANNELS;
        let sum: u32 = self.pixels[base..base + FRAME_CHANNELS]
            .iter()
            .map(|&p| p as u32)
            .sum();
        sum as f32 / FRAME_CHANNELS as f32
    }

    /// Raw pixel buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Interface the game must provide to drive training.
///
/// Actions are environment action ids (after the policy's offset remapping,
/// see [`crate::rl::PolicyConfig::env_action`]).
pub trait Environment {
    /// Start a new episode and return the initial observation.
    fn reset(&mut self) -> Frame;

    /// Advance one step. Returns `(observation, reward, done)`; a non-zero
    /// reward marks a scoring event.
    fn step(&mut self, action: usize) -> (Frame, f32, bool);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic stand-in for the real game, used by unit tests.
    ///
    /// Draws a single bright "ball" pixel that sweeps across the frame and
    /// pays a point reward at the end of each rally, regardless of the
    /// action taken.
    pub struct ScriptedRally {
        height: usize,
        width: usize,
        steps_per_rally: usize,
        rallies_per_episode: usize,
        step_count: usize,
        rallies_done: usize,
    }

    impl ScriptedRally {
        pub fn new(
            height: usize,
            width: usize,
            steps_per_rally: usize,
            rallies_per_episode: usize,
        ) -> Self {
            Self {
                height,
                width,
                steps_per_rally,
                rallies_per_episode,
                step_count: 0,
                rallies_done: 0,
            }
        }

        fn frame(&self) -> Frame {
            let mut pixels = vec![0u8; self.height * self.width * FRAME_CHANNELS];
            let y = self.step_count % self.height;
            let x = (self.step_count * 3) % self.width;
            let base = (y * self.width + x) * FRAME_CHANNELS;
            for c in 0..FRAME_CHANNELS {
                pixels[base + c] = 255;
            }
            Frame::new(self.height, self.width, pixels)
        }
    }

    impl Environment for ScriptedRally {
        fn reset(&mut self) -> Frame {
            self.step_count = 0;
            self.rallies_done = 0;
            self.frame()
        }

        fn step(&mut self, _action: usize) -> (Frame, f32, bool) {
            self.step_count += 1;
            let mut reward = 0.0;
            if self.step_count % self.steps_per_rally == 0 {
                self.rallies_done += 1;
                // Alternate won and lost points so rewards are not all-equal.
                reward = if self.rallies_done % 2 == 1 { 1.0 } else { -1.0 };
            }
            let done = self.rallies_done >= self.rallies_per_episode;
            (self.frame(), reward, done)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedRally;
    use super::*;

    #[test]
    fn test_frame_dimensions() {
        let frame = Frame::new(4, 6, vec![0; 4 * 6 * 3]);
        assert_eq!(frame.height(), 4);
        assert_eq!(frame.width(), 6);
    }

    #[test]
    #[should_panic(expected = "frame buffer length")]
    fn test_frame_rejects_short_buffer() {
        let _ = Frame::new(4, 6, vec![0; 10]);
    }

    #[test]
    fn test_frame_intensity_averages_channels() {
        let mut pixels = vec![0u8; 2 * 2 * 3];
        // Pixel (1, 0): channels 30, 60, 90 -> mean 60.
        let base = (2 + 0) * 3;
        pixels[base] = 30;
        pixels[base + 1] = 60;
        pixels[base + 2] = 90;
        let frame = Frame::new(2, 2, pixels);

        assert_eq!(frame.intensity(1, 0), 60.0);
        assert_eq!(frame.intensity(0, 0), 0.0);
    }

    #[test]
    fn test_scripted_rally_rewards_at_rally_end() {
        let mut env = ScriptedRally::new(10, 10, 4, 2);
        env.reset();

        let mut rewards = Vec::new();
        let mut done = false;
        while !done {
            let (_, reward, terminated) = env.step(0);
            rewards.push(reward);
            done = terminated;
        }

        assert_eq!(rewards.len(), 8);
        assert_eq!(rewards[3], 1.0);
        assert_eq!(rewards[7], -1.0);
        assert!(rewards[..3].iter().all(|&r| r == 0.0));
    }
}
