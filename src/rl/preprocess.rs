//! Frame preprocessing into a stationary feature signal
//!
//! Raw frames are subsampled, collapsed to a single intensity channel,
//! binarized, and superposed onto a decaying trail of the previous processed
//! frame. The trail encodes ball and paddle motion, which a single still
//! frame cannot, so the dense policy sees a (nearly) Markov observation.

use serde::{Deserialize, Serialize};

use super::environment::Frame;

/// Parameters of the preprocessing pipeline.
///
/// The defaults match a 200x200 game frame subsampled with stride 5,
/// giving a 40x40 = 1600 element feature vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Expected raw frame height in pixels
    pub frame_height: usize,

    /// Expected raw frame width in pixels
    pub frame_width: usize,

    /// Subsampling stride (every Nth row and column is kept)
    pub stride: usize,

    /// Intensities above this are treated as foreground
    pub brightness_threshold: f32,

    /// Value assigned to foreground pixels after binarization
    pub active_value: f32,

    /// Trail pixels at or above this still carry motion history
    pub trail_floor: f32,

    /// Amount subtracted from trail pixels each step (the fade rate)
    pub trail_decay: f32,
}

impl PreprocessConfig {
    /// Configuration for a given raw frame size with default thresholds.
    pub fn new(frame_height: usize, frame_width: usize) -> Self {
        Self {
            frame_height,
            frame_width,
            stride: 5,
            brightness_threshold: 50.0,
            active_value: 240.0,
            trail_floor: 80.0,
            trail_decay: 80.0,
        }
    }

    /// Number of rows in the subsampled grid.
    pub fn rows(&self) -> usize {
        self.frame_height.div_ceil(self.stride)
    }

    /// Number of columns in the subsampled grid.
    pub fn cols(&self) -> usize {
        self.frame_width.div_ceil(self.stride)
    }

    /// Length of the flattened feature vector.
    ///
    /// Must equal the policy's input width; the agent validates this at
    /// construction time.
    pub fn output_len(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Check that the parameters describe a usable pipeline.
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_height == 0 || self.frame_width == 0 {
            return Err(format!(
                "frame dimensions must be positive, got {}x{}",
                self.frame_height, self.frame_width
            ));
        }
        if self.stride == 0 {
            return Err("stride must be at least 1".to_string());
        }
        if self.stride > self.frame_height || self.stride > self.frame_width {
            return Err(format!(
                "stride {} exceeds frame dimensions {}x{}",
                self.stride, self.frame_height, self.frame_width
            ));
        }
        if self.trail_decay > self.trail_floor {
            return Err(format!(
                "trail_decay ({}) must not exceed trail_floor ({}), or trail pixels would go negative",
                self.trail_decay, self.trail_floor
            ));
        }
        Ok(())
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::new(200, 200)
    }
}

/// Stateful frame preprocessor.
///
/// Holds the previous processed frame between steps so consecutive frames
/// can be superposed into a motion trail. Call [`reset`](Self::reset) at
/// every episode start; the first `process` call after a reset returns the
/// binarized frame as-is.
pub struct FramePreprocessor {
    config: PreprocessConfig,
    trail: Option<Vec<f32>>,
}

impl FramePreprocessor {
    /// Create a preprocessor from a validated configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn new(config: PreprocessConfig) -> Self {
        config.validate().expect("invalid preprocess configuration");
        Self {
            config,
            trail: None,
        }
    }

    /// Access the configuration.
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Forget the previous frame at episode start.
    pub fn reset(&mut self) {
        self.trail = None;
    }

    /// Convert a raw frame into the flattened feature vector.
    ///
    /// Subsamples with the configured stride, averages the color channels,
    /// binarizes against `brightness_threshold`, then fades the stored trail
    /// by `trail_decay` and adds the new frame on top. The updated trail is
    /// what gets returned, so the output always has length
    /// [`PreprocessConfig::output_len`].
    ///
    /// # Panics
    ///
    /// Panics if the frame dimensions do not match the configuration; that
    /// is a configuration error, not a runtime-recoverable one.
    pub fn process(&mut self, frame: &Frame) -> Vec<f32> {
        assert_eq!(
            (frame.height(), frame.width()),
            (self.config.frame_height, self.config.frame_width),
            "frame size {}x{} does not match configured {}x{}",
            frame.height(),
            frame.width(),
            self.config.frame_height,
            self.config.frame_width,
        );

        let mut current = Vec::with_capacity(self.config.output_len());
        for y in (0..frame.height()).step_by(self.config.stride) {
            for x in (0..frame.width()).step_by(self.config.stride) {
                let value = if frame.intensity(y, x) > self.config.brightness_threshold {
                    self.config.active_value
                } else {
                    0.0
                };
                current.push(value);
            }
        }

        match &mut self.trail {
            None => self.trail = Some(current),
            Some(trail) => {
                for (t, c) in trail.iter_mut().zip(current) {
                    if *t >= self.config.trail_floor {
                        *t -= self.config.trail_decay;
                    }
                    *t += c;
                }
            }
        }

        self.trail.clone().expect("trail populated above")
    }
}
