//! Training metrics and logging backends.

use std::collections::VecDeque;
use std::time::Instant;

/// Completed-episode returns kept for reporting.
const MAX_RECENT_RETURNS: usize = 1000;
/// Window used for the running mean.
const MEAN_WINDOW: usize = 100;

/// Rolling record of completed-episode returns.
#[derive(Debug, Default)]
pub struct RecentReturns {
    returns: VecDeque<f32>,
    episodes: usize,
}

impl RecentReturns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, episode_return: f32) {
        if self.returns.len() >= MAX_RECENT_RETURNS {
            self.returns.pop_front();
        }
        self.returns.push_back(episode_return);
        self.episodes += 1;
    }

    /// Total episodes completed so far.
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Mean of the last 100 completed episodes (0.0 before any complete).
    pub fn mean(&self) -> f32 {
        if self.returns.is_empty() {
            return 0.0;
        }
        let window: Vec<f32> = self.returns.iter().rev().take(MEAN_WINDOW).copied().collect();
        window.iter().sum::<f32>() / window.len() as f32
    }
}

/// One metrics record, emitted after an update.
#[derive(Debug, Clone)]
pub struct TrainingSnapshot {
    /// Environment frames consumed.
    pub frame: u64,
    /// Updates applied so far.
    pub updates: u64,
    /// Completed episodes so far.
    pub episodes: usize,
    /// Mean return of recent completed episodes.
    pub avg_return: f32,
    /// Actor loss of the latest update.
    pub actor_loss: f32,
    /// Critic loss of the latest update.
    pub critic_loss: f32,
    /// Mean policy entropy of the latest update.
    pub entropy: f32,
    /// Entropy coefficient in effect at the update.
    pub entropy_coef: f32,
}

impl TrainingSnapshot {
    pub fn new(frame: u64, updates: u64, episodes: usize, avg_return: f32) -> Self {
        Self {
            frame,
            updates,
            episodes,
            avg_return,
            actor_loss: 0.0,
            critic_loss: 0.0,
            entropy: 0.0,
            entropy_coef: 0.0,
        }
    }

    /// Set loss values.
    pub fn with_losses(mut self, actor_loss: f32, critic_loss: f32, entropy: f32) -> Self {
        self.actor_loss = actor_loss;
        self.critic_loss = critic_loss;
        self.entropy = entropy;
        self
    }

    /// Set the entropy coefficient in effect.
    pub fn with_entropy_coef(mut self, coef: f32) -> Self {
        self.entropy_coef = coef;
        self
    }
}

/// Logger trait for different metrics backends.
pub trait MetricsLogger: Send {
    /// Log a training snapshot.
    fn log(&mut self, snapshot: &TrainingSnapshot);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Console logger with fixed-width table output.
///
/// Prints one row per snapshot received; the emission cadence is decided
/// by the caller (the training loop follows `meta.log_frequency`).
pub struct ConsoleLogger {
    start_time: Instant,
    show_header: bool,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            show_header: true,
        }
    }

    fn print_header(&self) {
        println!(
            "{:>10} {:>8} {:>9} {:>10} {:>10} {:>10} {:>9} {:>8} {:>8}",
            "Frame", "Updates", "Episodes", "Return", "Actor", "Critic", "Entropy", "Coef", "FPS"
        );
        println!("{}", "-".repeat(90));
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, snapshot: &TrainingSnapshot) {
        if self.show_header {
            self.print_header();
            self.show_header = false;
        }

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let fps = if elapsed > 0.0 {
            snapshot.frame as f32 / elapsed
        } else {
            0.0
        };

        println!(
            "{:>10} {:>8} {:>9} {:>10.2} {:>10.4} {:>10.4} {:>9.4} {:>8.4} {:>8.0}",
            snapshot.frame,
            snapshot.updates,
            snapshot.episodes,
            snapshot.avg_return,
            snapshot.actor_loss,
            snapshot.critic_loss,
            snapshot.entropy,
            snapshot.entropy_coef,
            fps
        );
    }

    fn flush(&mut self) {
        // stdout is line-buffered, nothing to do
    }
}

/// Logger that discards everything. Useful in tests and benchmarks.
#[derive(Debug, Default)]
pub struct NullLogger;

impl MetricsLogger for NullLogger {
    fn log(&mut self, _snapshot: &TrainingSnapshot) {}
    fn flush(&mut self) {}
}
