use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::{Error, Result};

/// Dynamic programming over an explicit model
pub mod dp;
/// Monte Carlo control over complete episodes
pub mod mc;
/// Explicit transition/reward model extracted from a model-based environment
pub mod mdp;
/// Off-policy Q-learning
pub mod q_learning;
pub mod q_table;
/// Temporal-difference prediction and on-policy control
pub mod td;

pub use mdp::{Backup, MdpModel, StochasticPolicy};
pub use q_table::QTable;

/// Snapshot passed to a training progress callback
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// Completion percentage in `[0, 100]`
    pub percent: f64,
    /// Named metric values at this point of training
    pub metrics: &'a [(&'static str, f64)],
}

impl Progress<'_> {
    /// Look up a metric by name
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(key, _)| *key == name)
            .map(|&(_, value)| value)
    }
}

/// Shared flag for cooperative cancellation of a training run
///
/// Solvers check it between sweeps and between episodes, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the run currently using this flag
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear a previous request
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Progress reporting and cancellation plumbing threaded through a solver
pub struct Monitor<'a> {
    progress: &'a mut dyn FnMut(&Progress<'_>),
    cancel: CancelFlag,
}

impl<'a> Monitor<'a> {
    pub fn new(progress: &'a mut dyn FnMut(&Progress<'_>), cancel: CancelFlag) -> Self {
        Self { progress, cancel }
    }

    /// Invoke the progress callback
    pub fn report(&mut self, percent: f64, metrics: &[(&'static str, f64)]) {
        (self.progress)(&Progress {
            percent: percent.clamp(0.0, 100.0),
            metrics,
        });
    }

    /// Fails with [`Error::Cancelled`] if cancellation was requested
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::info!("Training cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Convergence record of a sweep-based solver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepStats {
    pub iterations: usize,
    pub deltas: Vec<f64>,
    pub converged: bool,
}

/// Per-episode record of an episodic solver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeStats {
    pub rewards: Vec<f64>,
    pub lengths: Vec<usize>,
}

impl EpisodeStats {
    pub fn with_capacity(episodes: usize) -> Self {
        Self {
            rewards: Vec::with_capacity(episodes),
            lengths: Vec::with_capacity(episodes),
        }
    }

    pub fn push(&mut self, reward: f64, length: usize) {
        self.rewards.push(reward);
        self.lengths.push(length);
    }
}

/// Result of an episodic control solver
#[derive(Debug, Clone, PartialEq)]
pub struct ControlOutcome {
    pub q: QTable,
    /// Greedy action per state after the last episode
    pub policy: Vec<usize>,
    pub stats: EpisodeStats,
}

/// Reports episodic progress every 1% of the episode budget
pub(crate) struct EpisodeReporter {
    episodes: usize,
    interval: usize,
}

impl EpisodeReporter {
    pub fn new(episodes: usize) -> Self {
        Self {
            episodes,
            interval: (episodes / 100).max(1),
        }
    }

    /// Call after finishing episode `episode` (zero-based)
    pub fn finished(
        &self,
        monitor: &mut Monitor<'_>,
        episode: usize,
        reward: f64,
        length: usize,
        epsilon: f64,
    ) {
        let done = episode + 1;
        if done % self.interval == 0 || done == self.episodes {
            log::debug!("Episode {done}/{}: reward {reward:.3}, length {length}", self.episodes);
            monitor.report(
                100.0 * done as f64 / self.episodes as f64,
                &[
                    ("episode", done as f64),
                    ("reward", reward),
                    ("length", length as f64),
                    ("epsilon", epsilon),
                ],
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Run `f` with a monitor that discards progress and never cancels
    pub fn silent<T>(f: impl FnOnce(&mut Monitor<'_>) -> T) -> T {
        let mut sink = |_: &Progress<'_>| {};
        let mut monitor = Monitor::new(&mut sink, CancelFlag::new());
        f(&mut monitor)
    }

    #[test]
    fn monitor_reports_and_cancels() {
        let mut seen = Vec::new();
        let mut record = |p: &Progress<'_>| seen.push((p.percent, p.metric("delta")));
        let cancel = CancelFlag::new();
        let mut monitor = Monitor::new(&mut record, cancel.clone());

        monitor.report(150.0, &[("delta", 0.5)]);
        assert!(monitor.checkpoint().is_ok());
        cancel.cancel();
        assert_eq!(monitor.checkpoint(), Err(Error::Cancelled));
        drop(monitor);

        assert_eq!(seen, vec![(100.0, Some(0.5))], "Percent is clamped");
    }

    #[test]
    fn episode_reporter_cadence() {
        let mut count = 0;
        let mut tick = |_: &Progress<'_>| count += 1;
        let mut monitor = Monitor::new(&mut tick, CancelFlag::new());
        let reporter = EpisodeReporter::new(250);
        for episode in 0..250 {
            reporter.finished(&mut monitor, episode, 0.0, 1, 0.1);
        }
        drop(monitor);
        assert_eq!(count, 125, "Every second episode is 1% of 250");
    }
}
