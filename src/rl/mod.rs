//! On-policy reinforcement learning for two-paddle pixel games
//!
//! Provides:
//! - Frame preprocessing into motion-trail feature vectors
//! - Dense categorical policy network with PPO clipped-surrogate training
//! - Trajectory collection and round-aware discounted returns
//! - Agent facade wiring the pieces into the episode loop
//! - Checkpoint persistence via Burn records

pub mod agent;
pub mod backend;
pub mod buffer;
pub mod config;
pub mod environment;
pub mod persistence;
pub mod policy;
pub mod preprocess;
pub mod returns;

pub use agent::{EpisodeOutcome, PongAgent};
pub use backend::{default_device, InferenceBackend, TrainingBackend};
pub use buffer::TrajectoryBuffer;
pub use config::PpoConfig;
pub use environment::{Environment, Frame, FRAME_CHANNELS};
pub use persistence::{load_network, load_network_if_exists, save_model, ModelMetadata};
pub use policy::{PolicyConfig, PolicyNet};
pub use preprocess::{FramePreprocessor, PreprocessConfig};
pub use returns::{discount_rewards, normalize_advantages};
