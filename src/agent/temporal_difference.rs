use super::{
    delegate_to_core, env_accessors, final_epsilon, Agent, AgentCore, Algorithm,
    EpisodicHistory, Tables, TrainingHistory,
};
use crate::{
    algo::{
        td::{td, TdTable},
        Progress,
    },
    config::TdConfig,
    env::Environment,
    error::Result,
};

/// Window width used by [`TdMethod::NStepTd`] when the config leaves `n_steps` unset
pub const DEFAULT_N_STEPS: usize = 3;

/// Variant of temporal-difference learning run by a [`TdAgent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TdMethod {
    /// One-step state-value prediction; `n_steps` is ignored
    Td0,
    /// n-step state-value prediction
    NStepTd,
    /// On-policy control over action values, n-step when `n_steps` is set
    Sarsa,
}

impl TdMethod {
    fn q_based(self) -> bool {
        self == Self::Sarsa
    }

    fn n_steps(self, configured: Option<usize>) -> Option<usize> {
        match self {
            Self::Td0 => None,
            Self::NStepTd => Some(configured.unwrap_or(DEFAULT_N_STEPS)),
            Self::Sarsa => configured,
        }
    }
}

impl From<TdMethod> for Algorithm {
    fn from(method: TdMethod) -> Self {
        match method {
            TdMethod::Td0 => Algorithm::Td0,
            TdMethod::NStepTd => Algorithm::NStepTd,
            TdMethod::Sarsa => Algorithm::Sarsa,
        }
    }
}

/// Temporal-difference agent
///
/// The prediction variants learn state values only. Their `policy` is the random placeholder
/// drawn after the last episode, since V alone does not pick actions without a model. SARSA
/// learns Q and acts greedily on it.
#[derive(Debug)]
pub struct TdAgent<E> {
    core: AgentCore<E>,
    method: TdMethod,
    config: TdConfig,
}

impl<E: Environment> TdAgent<E> {
    /// **Fails** with [`InvalidConfiguration`](crate::error::Error::InvalidConfiguration) if
    /// `config` does not validate
    pub fn new(env: E, method: TdMethod, mut config: TdConfig) -> Result<Self> {
        config.n_steps = method.n_steps(config.n_steps);
        config.validate()?;
        Ok(Self {
            core: AgentCore::new(env, config.seed),
            method,
            config,
        })
    }

    pub fn method(&self) -> TdMethod {
        self.method
    }

    /// Effective configuration, with `n_steps` resolved for the method
    pub fn config(&self) -> &TdConfig {
        &self.config
    }

    env_accessors!();
}

impl<E: Environment> Agent for TdAgent<E> {
    fn train_with_progress(
        &mut self,
        progress: &mut dyn FnMut(&Progress<'_>),
    ) -> Result<TrainingHistory> {
        let (method, config) = (self.method, &self.config);
        log::info!(
            "Training {} agent for {} episodes",
            Algorithm::from(method),
            config.episodes
        );

        let (stats, elapsed) = self.core.run(progress, |env, rng, monitor| {
            let n_actions = env.action_space_size();
            let outcome = td(env, config, method.q_based(), rng, monitor)?;
            let (values, q) = match outcome.table {
                TdTable::Values(values) => (Some(values), None),
                TdTable::ActionValues(q) => (None, Some(q)),
            };
            let tables = Tables {
                values,
                q,
                policy: outcome.policy,
                n_actions,
                epsilon: Some(final_epsilon(&config.exploration, config.episodes)),
            };
            Ok((tables, outcome.stats))
        })?;

        Ok(TrainingHistory::Episodic(EpisodicHistory::new(
            elapsed,
            stats.rewards,
            stats.lengths,
        )))
    }

    fn gamma(&self) -> f64 {
        self.config.gamma
    }

    delegate_to_core!();
}
