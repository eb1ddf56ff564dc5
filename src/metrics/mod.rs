//! Training progress metrics

pub mod training_stats;

pub use training_stats::TrainingStats;
