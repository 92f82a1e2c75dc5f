use std::time::{Duration, Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    algo::{CancelFlag, Monitor, Progress, QTable},
    config::ExplorationConfig,
    error::{Error, Result},
    exploration::{act_with, EpsilonGreedy},
};

/// Construct agents by algorithm
pub mod factory;
mod history;
mod monte_carlo;
mod planning;
mod q_learning;
mod temporal_difference;

pub use factory::{create_agent, create_agent_by_name, Algorithm, AlgorithmFamily, TabularAgent};
pub use history::{EpisodicHistory, PlanningHistory, TrainingHistory, AVERAGE_WINDOW};
pub use monte_carlo::MonteCarloAgent;
pub use planning::{PlanningAgent, PlanningMethod};
pub use q_learning::QLearningAgent;
pub use temporal_difference::{TdAgent, TdMethod};

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Constructed,
    Training,
    Trained,
}

/// Uniform interface over every tabular algorithm
pub trait Agent {
    /// Train from scratch, discarding any previous tables
    fn train(&mut self) -> Result<TrainingHistory> {
        self.train_with_progress(&mut |_: &Progress<'_>| {})
    }

    /// Train from scratch, reporting progress through `progress`
    ///
    /// Planning agents report once per sweep (or improvement round), episodic agents every 1% of
    /// the episode budget. Cancelling through [`Agent::cancel_handle`] makes this return
    /// [`Error::Cancelled`].
    fn train_with_progress(
        &mut self,
        progress: &mut dyn FnMut(&Progress<'_>),
    ) -> Result<TrainingHistory>;

    /// Action for `state`
    ///
    /// With `explore`, episodic agents act epsilon-greedily using the exploration rate of their
    /// last training episode. Planning agents always act greedily.
    fn get_action(&mut self, state: usize, explore: bool) -> Result<usize>;

    /// Drop the learned tables and return to [`AgentStatus::Constructed`]
    fn reset(&mut self);

    fn status(&self) -> AgentStatus;

    /// Handle for cancelling a training run from another thread or from the progress callback
    fn cancel_handle(&self) -> CancelFlag;

    /// Discount factor in use
    fn gamma(&self) -> f64;

    /// Learned state values, if the algorithm produces them
    fn values(&self) -> Option<&[f64]>;

    /// Learned action values, if the algorithm produces them
    fn q_table(&self) -> Option<&QTable>;

    /// Action per state after training
    fn policy(&self) -> Option<&[usize]>;
}

/// Tables produced by a finished training run
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tables {
    pub values: Option<Vec<f64>>,
    pub q: Option<QTable>,
    pub policy: Vec<usize>,
    pub n_actions: usize,
    /// Exploration rate for `get_action(_, true)`; `None` always acts greedily
    pub epsilon: Option<f64>,
}

impl Tables {
    fn action<R: Rng + ?Sized>(&self, state: usize, explore: bool, rng: &mut R) -> Result<usize> {
        if state >= self.policy.len() {
            return Err(Error::invalid_argument(format!(
                "State {state} is outside the state space of size {}",
                self.policy.len()
            )));
        }

        match (explore, self.epsilon) {
            (true, Some(epsilon)) => Ok(act_with(epsilon, self.n_actions, rng, || {
                self.q
                    .as_ref()
                    .map_or(self.policy[state], |q| q.greedy_action(state))
            })),
            _ => Ok(self.policy[state]),
        }
    }
}

/// Environment, random source and lifecycle shared by every agent
#[derive(Debug)]
pub(crate) struct AgentCore<E> {
    pub env: E,
    rng: StdRng,
    seed: Option<u64>,
    cancel: CancelFlag,
    status: AgentStatus,
    tables: Option<Tables>,
}

impl<E> AgentCore<E> {
    pub fn new(env: E, seed: Option<u64>) -> Self {
        Self {
            env,
            rng: seeded_rng(seed),
            seed,
            cancel: CancelFlag::new(),
            status: AgentStatus::Constructed,
            tables: None,
        }
    }

    /// Run `solve` as a fresh training run
    ///
    /// Reseeds the random source when a seed is configured and clears a stale cancellation
    /// request. The tables are dropped up front and only replaced if `solve` succeeds.
    pub fn run<T>(
        &mut self,
        progress: &mut dyn FnMut(&Progress<'_>),
        solve: impl FnOnce(&mut E, &mut StdRng, &mut Monitor<'_>) -> Result<(Tables, T)>,
    ) -> Result<(T, Duration)> {
        if let Some(seed) = self.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.cancel.clear();
        self.tables = None;
        self.status = AgentStatus::Training;

        let start = Instant::now();
        let mut monitor = Monitor::new(progress, self.cancel.clone());
        match solve(&mut self.env, &mut self.rng, &mut monitor) {
            Ok((tables, output)) => {
                self.tables = Some(tables);
                self.status = AgentStatus::Trained;
                Ok((output, start.elapsed()))
            }
            Err(err) => {
                log::warn!("Training failed: {err}");
                self.status = AgentStatus::Constructed;
                Err(err)
            }
        }
    }

    pub fn get_action(&mut self, state: usize, explore: bool) -> Result<usize> {
        let tables = self.tables.as_ref().ok_or(Error::NotTrained)?;
        tables.action(state, explore, &mut self.rng)
    }

    pub fn reset(&mut self) {
        self.tables = None;
        self.status = AgentStatus::Constructed;
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn values(&self) -> Option<&[f64]> {
        self.tables.as_ref()?.values.as_deref()
    }

    pub fn q_table(&self) -> Option<&QTable> {
        self.tables.as_ref()?.q.as_ref()
    }

    pub fn policy(&self) -> Option<&[usize]> {
        self.tables.as_ref().map(|t| t.policy.as_slice())
    }
}

/// Exploration rate of the last training episode, used by `get_action(_, true)`
pub(crate) fn final_epsilon(exploration: &ExplorationConfig, episodes: usize) -> f64 {
    let last = episodes.saturating_sub(1) as u32;
    EpsilonGreedy::new(exploration.epsilon.clone()).epsilon(last)
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Implements the lifecycle methods of [`Agent`] by delegating to an `AgentCore` field named `core`
macro_rules! delegate_to_core {
    () => {
        fn get_action(&mut self, state: usize, explore: bool) -> $crate::error::Result<usize> {
            self.core.get_action(state, explore)
        }

        fn reset(&mut self) {
            self.core.reset()
        }

        fn status(&self) -> $crate::agent::AgentStatus {
            self.core.status()
        }

        fn cancel_handle(&self) -> $crate::algo::CancelFlag {
            self.core.cancel_handle()
        }

        fn values(&self) -> Option<&[f64]> {
            self.core.values()
        }

        fn q_table(&self) -> Option<&$crate::algo::QTable> {
            self.core.q_table()
        }

        fn policy(&self) -> Option<&[usize]> {
            self.core.policy()
        }
    };
}
pub(crate) use delegate_to_core;

/// Accessors for the environment owned by an agent with an `AgentCore` field named `core`
macro_rules! env_accessors {
    () => {
        pub fn env(&self) -> &E {
            &self.core.env
        }

        pub fn env_mut(&mut self) -> &mut E {
            &mut self.core.env
        }

        /// Give the environment back, consuming the agent
        pub fn into_env(self) -> E {
            self.core.env
        }
    };
}
pub(crate) use env_accessors;
