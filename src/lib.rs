//! ml_pong - PPO agent for two-paddle pixel games
//!
//! This library provides:
//! - On-policy RL core: preprocessing, policy, returns, PPO update (rl module)
//! - Training statistics (metrics module)
//! - The episode-driving training loop (modes module)
//!
//! The game environment itself is an external collaborator; implement
//! [`rl::Environment`] to plug one in.

pub mod metrics;
pub mod modes;
pub mod rl;
