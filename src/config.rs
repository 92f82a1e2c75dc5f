use serde::{Deserialize, Serialize};

use crate::{
    decay::Schedule,
    ensure_interval,
    error::{Error, Result},
};

/// Default safety bound on the length of a single episode
pub const DEFAULT_MAX_STEPS: usize = 1000;

fn ensure_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid_configuration(format!(
            "`{name}` must be positive"
        )));
    }
    Ok(())
}

/// Configuration for the dynamic programming agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpConfig {
    /// Discount factor
    ///
    /// **Default**: `0.99`
    pub gamma: f64,
    /// Convergence threshold on the largest value change in a sweep
    ///
    /// **Default**: `1e-3`
    pub theta: f64,
    /// Cap on sweeps (value iteration, policy evaluation) or improvement rounds (policy iteration)
    ///
    /// **Default**: `1000`
    pub max_iterations: usize,
    /// Seed for the initial random policy of policy iteration
    pub seed: Option<u64>,
}

impl Default for DpConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            theta: 1e-3,
            max_iterations: 1000,
            seed: None,
        }
    }
}

impl DpConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_interval!(self.gamma, 0.0, 1.0);
        if !(self.theta > 0.0) {
            return Err(Error::invalid_configuration("`theta` must be positive"));
        }
        ensure_positive("max_iterations", self.max_iterations)
    }
}

/// Exploration settings for the episodic agents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Epsilon as a function of the episode index
    ///
    /// **Default**: `0.1` decaying by a factor of `0.995` per episode to a floor of `0.01`
    pub epsilon: Schedule,
}

impl ExplorationConfig {
    /// A fixed epsilon
    pub fn constant(epsilon: f64) -> Self {
        Self {
            epsilon: Schedule::Constant(crate::decay::Constant::new(epsilon)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.epsilon.validate()?;
        let (start, end) = self.epsilon.bounds();
        ensure_interval!(start, 0.0, 1.0);
        ensure_interval!(end, 0.0, 1.0);
        Ok(())
    }
}

/// Which occurrences of a state-action pair in an episode update its estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitMode {
    #[default]
    FirstVisit,
    EveryVisit,
}

/// Configuration for the [`MonteCarloAgent`](crate::agent::MonteCarloAgent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// **Default**: `0.99`
    pub gamma: f64,
    /// **Default**: `1000`
    pub episodes: usize,
    pub exploration: ExplorationConfig,
    /// **Default**: [`VisitMode::FirstVisit`]
    pub visit: VisitMode,
    /// Constant step size α; `None` averages returns instead
    ///
    /// **Default**: `None`
    pub step_size: Option<f64>,
    /// **Default**: [`DEFAULT_MAX_STEPS`]
    pub max_steps: usize,
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            episodes: 1000,
            exploration: ExplorationConfig::default(),
            visit: VisitMode::FirstVisit,
            step_size: None,
            max_steps: DEFAULT_MAX_STEPS,
            seed: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_interval!(self.gamma, 0.0, 1.0);
        ensure_positive("episodes", self.episodes)?;
        ensure_positive("max_steps", self.max_steps)?;
        if let Some(alpha) = self.step_size {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(Error::invalid_configuration(format!(
                    "Invalid value for `step_size`: {alpha}. Must be in the interval (0, 1]."
                )));
            }
        }
        self.exploration.validate()
    }
}

/// Configuration for the temporal-difference agents and Q-learning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdConfig {
    /// **Default**: `0.99`
    pub gamma: f64,
    /// Learning rate
    ///
    /// **Default**: `0.1`
    pub alpha: f64,
    /// **Default**: `1000`
    pub episodes: usize,
    pub exploration: ExplorationConfig,
    /// Width of the n-step window; `None` uses one-step updates
    ///
    /// Ignored by Q-learning. **Default**: `None`
    pub n_steps: Option<usize>,
    /// **Default**: [`DEFAULT_MAX_STEPS`]
    pub max_steps: usize,
    pub seed: Option<u64>,
}

impl Default for TdConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            alpha: 0.1,
            episodes: 1000,
            exploration: ExplorationConfig::default(),
            n_steps: None,
            max_steps: DEFAULT_MAX_STEPS,
            seed: None,
        }
    }
}

impl TdConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_interval!(self.gamma, 0.0, 1.0);
        ensure_interval!(self.alpha, 0.0, 1.0);
        ensure_positive("episodes", self.episodes)?;
        ensure_positive("max_steps", self.max_steps)?;
        if let Some(n) = self.n_steps {
            ensure_positive("n_steps", n)?;
        }
        self.exploration.validate()
    }
}

/// Configuration of any algorithm family, as accepted by the [factory](crate::agent::factory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum AgentConfig {
    Dp(DpConfig),
    MonteCarlo(MonteCarloConfig),
    Td(TdConfig),
}

impl From<DpConfig> for AgentConfig {
    fn from(config: DpConfig) -> Self {
        Self::Dp(config)
    }
}

impl From<MonteCarloConfig> for AgentConfig {
    fn from(config: MonteCarloConfig) -> Self {
        Self::MonteCarlo(config)
    }
}

impl From<TdConfig> for AgentConfig {
    fn from(config: TdConfig) -> Self {
        Self::Td(config)
    }
}
