//! Training statistics tracking
//!
//! Rolling-window tracker for episode rewards, lengths, point wins, and the
//! surrogate loss. The raw per-step reward sequence of each episode is
//! available from [`crate::rl::EpisodeOutcome`]; this module only keeps the
//! aggregates a progress line needs.

use std::collections::VecDeque;

/// Rolling training statistics.
///
/// # Example
///
/// ```rust
/// use ml_pong::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
/// stats.record_episode(10.0, 412, true);
/// stats.record_update(0.02);
///
/// assert_eq!(stats.total_episodes(), 1);
/// println!("{}", stats.format_summary());
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    /// Episode total rewards (rolling window)
    episode_rewards: VecDeque<f32>,

    /// Episode lengths in steps (rolling window)
    episode_lengths: VecDeque<usize>,

    /// Whether each episode ended with a won point (rolling window)
    episode_wins: VecDeque<bool>,

    /// Mean surrogate loss per update (rolling window)
    losses: VecDeque<f32>,

    /// Total episodes completed
    total_episodes: usize,

    /// Total environment steps taken
    total_steps: usize,

    /// Total episodes won
    total_wins: usize,

    /// Window size for rolling averages
    window_size: usize,
}

impl TrainingStats {
    /// Create a tracker keeping the last `window_size` entries.
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            episode_wins: VecDeque::with_capacity(window_size),
            losses: VecDeque::with_capacity(window_size),
            total_episodes: 0,
            total_steps: 0,
            total_wins: 0,
            window_size,
        }
    }

    /// Record a finished episode.
    pub fn record_episode(&mut self, reward: f32, length: usize, won: bool) {
        Self::push_window(&mut self.episode_rewards, reward, self.window_size);
        Self::push_window(&mut self.episode_lengths, length, self.window_size);
        Self::push_window(&mut self.episode_wins, won, self.window_size);
        self.total_episodes += 1;
        self.total_steps += length;
        if won {
            self.total_wins += 1;
        }
    }

    /// Record the loss of one policy update.
    pub fn record_update(&mut self, loss: f32) {
        Self::push_window(&mut self.losses, loss, self.window_size);
    }

    /// Mean episode reward over the window.
    pub fn mean_episode_reward(&self) -> f32 {
        Self::mean_f32(&self.episode_rewards)
    }

    /// Mean episode length over the window.
    pub fn mean_episode_length(&self) -> f32 {
        if self.episode_lengths.is_empty() {
            return 0.0;
        }
        self.episode_lengths.iter().sum::<usize>() as f32 / self.episode_lengths.len() as f32
    }

    /// Fraction of episodes won over the window.
    pub fn win_rate(&self) -> f32 {
        if self.episode_wins.is_empty() {
            return 0.0;
        }
        self.episode_wins.iter().filter(|&&w| w).count() as f32 / self.episode_wins.len() as f32
    }

    /// Fraction of episodes won since the start of training.
    pub fn overall_win_rate(&self) -> f32 {
        if self.total_episodes == 0 {
            return 0.0;
        }
        self.total_wins as f32 / self.total_episodes as f32
    }

    /// Mean surrogate loss over the window.
    pub fn mean_loss(&self) -> f32 {
        Self::mean_f32(&self.losses)
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// One-line summary for progress logging.
    pub fn format_summary(&self) -> String {
        format!(
            "WR: {:.3} | AVG reward: {:.3} | AVG length: {:.1} | AVG loss: {:.4}",
            self.win_rate(),
            self.mean_episode_reward(),
            self.mean_episode_length(),
            self.mean_loss(),
        )
    }

    fn push_window<T>(window: &mut VecDeque<T>, value: T, size: usize) {
        if window.len() >= size {
            window.pop_front();
        }
        window.push_back(value);
    }

    fn mean_f32(window: &VecDeque<f32>) -> f32 {
        if window.is_empty() {
            return 0.0;
        }
        window.iter().sum::<f32>() / window.len() as f32
    }
}
