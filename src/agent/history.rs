use std::time::Duration;

use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::algo::SweepStats;

/// Number of trailing episodes averaged into [`EpisodicHistory::average_reward`]
pub const AVERAGE_WINDOW: usize = 100;

/// Record of a finished training run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrainingHistory {
    Episodic(EpisodicHistory),
    Planning(PlanningHistory),
}

impl TrainingHistory {
    pub fn as_episodic(&self) -> Option<&EpisodicHistory> {
        match self {
            Self::Episodic(history) => Some(history),
            Self::Planning(_) => None,
        }
    }

    pub fn as_planning(&self) -> Option<&PlanningHistory> {
        match self {
            Self::Planning(history) => Some(history),
            Self::Episodic(_) => None,
        }
    }
}

/// Per-episode record of an episodic agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodicHistory {
    pub episodes: usize,
    pub episode_rewards: Vec<f64>,
    pub episode_lengths: Vec<usize>,
    /// Mean reward of the last [`AVERAGE_WINDOW`] episodes
    pub average_reward: f64,
    /// Percentage of episodes whose reward reached the 75th percentile of all rewards
    ///
    /// A rough proxy for "solved" episodes. It is `50` when rewards barely vary and `0` with
    /// fewer than two episodes.
    pub success_rate: f64,
    /// Seconds
    pub training_time: f64,
}

impl EpisodicHistory {
    pub fn new(elapsed: Duration, rewards: Vec<f64>, lengths: Vec<usize>) -> Self {
        let tail = &rewards[rewards.len().saturating_sub(AVERAGE_WINDOW)..];
        let average_reward = if tail.is_empty() {
            0.0
        } else {
            tail.iter().copied().mean()
        };

        Self {
            episodes: rewards.len(),
            success_rate: success_rate(&rewards),
            average_reward,
            episode_rewards: rewards,
            episode_lengths: lengths,
            training_time: elapsed.as_secs_f64(),
        }
    }
}

fn success_rate(rewards: &[f64]) -> f64 {
    if rewards.len() < 2 {
        return 0.0;
    }
    if rewards.iter().copied().population_std_dev() < 1e-6 {
        return 50.0;
    }

    let threshold = Data::new(rewards.to_vec()).percentile(75);
    let successes = rewards.iter().filter(|&&r| r >= threshold).count();
    100.0 * successes as f64 / rewards.len() as f64
}

/// Convergence record of a planning agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningHistory {
    pub iterations: usize,
    /// Largest change per sweep (policy iteration: per improvement round)
    pub deltas: Vec<f64>,
    pub converged: bool,
    /// Seconds
    pub training_time: f64,
}

impl PlanningHistory {
    pub fn new(elapsed: Duration, stats: &SweepStats) -> Self {
        Self {
            iterations: stats.iterations,
            deltas: stats.deltas.clone(),
            converged: stats.converged,
            training_time: elapsed.as_secs_f64(),
        }
    }
}
