use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantArray};

use super::{
    Agent, AgentStatus, MonteCarloAgent, PlanningAgent, PlanningMethod, QLearningAgent, TdAgent,
    TdMethod, TrainingHistory,
};
use crate::{
    algo::{CancelFlag, Progress, QTable},
    config::{AgentConfig, DpConfig, MonteCarloConfig, TdConfig},
    env::Environment,
    error::{Error, Result},
};

/// Every algorithm the engine provides
///
/// Parses from and displays as the user-facing name (`"Value Iteration"`, `"TD(0)"`, ...).
/// The snake_case variant name is accepted as well.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    VariantArray,
)]
#[strum(ascii_case_insensitive)]
pub enum Algorithm {
    #[strum(to_string = "Value Iteration", serialize = "value_iteration")]
    ValueIteration,
    #[strum(to_string = "Policy Iteration", serialize = "policy_iteration")]
    PolicyIteration,
    #[strum(to_string = "Policy Evaluation", serialize = "policy_evaluation")]
    PolicyEvaluation,
    #[strum(to_string = "Monte Carlo", serialize = "monte_carlo")]
    MonteCarlo,
    #[strum(to_string = "Q-Learning", serialize = "q_learning")]
    QLearning,
    #[strum(to_string = "TD(0)", serialize = "td0")]
    Td0,
    #[strum(to_string = "SARSA", serialize = "sarsa")]
    Sarsa,
    #[strum(to_string = "n-step TD", serialize = "n_step_td")]
    NStepTd,
}

/// Grouping of algorithms by how they learn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AlgorithmFamily {
    #[strum(to_string = "dynamic programming")]
    DynamicProgramming,
    #[strum(to_string = "Monte Carlo")]
    MonteCarlo,
    #[strum(to_string = "temporal difference")]
    TemporalDifference,
    #[strum(to_string = "model-free control")]
    ModelFreeControl,
}

impl Algorithm {
    pub fn family(self) -> AlgorithmFamily {
        match self {
            Self::ValueIteration | Self::PolicyIteration | Self::PolicyEvaluation => {
                AlgorithmFamily::DynamicProgramming
            }
            Self::MonteCarlo => AlgorithmFamily::MonteCarlo,
            Self::Td0 | Self::NStepTd => AlgorithmFamily::TemporalDifference,
            Self::QLearning | Self::Sarsa => AlgorithmFamily::ModelFreeControl,
        }
    }

    /// Whether training needs the environment's transition model
    pub fn requires_model(self) -> bool {
        self.family() == AlgorithmFamily::DynamicProgramming
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ValueIteration => {
                "Repeated Bellman optimality backups over a known model until the values converge"
            }
            Self::PolicyIteration => {
                "Alternates policy evaluation and greedy improvement until the policy is stable"
            }
            Self::PolicyEvaluation => {
                "Computes the values of the uniform random policy and acts greedily on them"
            }
            Self::MonteCarlo => "Averages complete-episode returns per state-action pair",
            Self::QLearning => "Off-policy control bootstrapping from the best next action",
            Self::Td0 => "One-step bootstrapped prediction of state values",
            Self::Sarsa => "On-policy control bootstrapping from the next action actually taken",
            Self::NStepTd => "State-value prediction from n-step returns",
        }
    }

    /// Default hyperparameters of the config family this algorithm expects
    pub fn default_config(self) -> AgentConfig {
        match self.family() {
            AlgorithmFamily::DynamicProgramming => DpConfig::default().into(),
            AlgorithmFamily::MonteCarlo => MonteCarloConfig::default().into(),
            AlgorithmFamily::TemporalDifference | AlgorithmFamily::ModelFreeControl => {
                TdConfig::default().into()
            }
        }
    }
}

/// Agent for any [`Algorithm`], as built by [`create_agent`]
#[derive(Debug)]
pub enum TabularAgent<E> {
    Planning(PlanningAgent<E>),
    MonteCarlo(MonteCarloAgent<E>),
    Td(TdAgent<E>),
    QLearning(QLearningAgent<E>),
}

macro_rules! dispatch {
    ($self:expr, $agent:ident => $body:expr) => {
        match $self {
            TabularAgent::Planning($agent) => $body,
            TabularAgent::MonteCarlo($agent) => $body,
            TabularAgent::Td($agent) => $body,
            TabularAgent::QLearning($agent) => $body,
        }
    };
}

impl<E: Environment> TabularAgent<E> {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Planning(agent) => agent.method().into(),
            Self::MonteCarlo(_) => Algorithm::MonteCarlo,
            Self::Td(agent) => agent.method().into(),
            Self::QLearning(_) => Algorithm::QLearning,
        }
    }

    pub fn env(&self) -> &E {
        dispatch!(self, agent => agent.env())
    }

    pub fn env_mut(&mut self) -> &mut E {
        dispatch!(self, agent => agent.env_mut())
    }

    /// Give the environment back, consuming the agent
    pub fn into_env(self) -> E {
        dispatch!(self, agent => agent.into_env())
    }
}

impl<E: Environment> Agent for TabularAgent<E> {
    fn train_with_progress(
        &mut self,
        progress: &mut dyn FnMut(&Progress<'_>),
    ) -> Result<TrainingHistory> {
        dispatch!(self, agent => agent.train_with_progress(progress))
    }

    fn get_action(&mut self, state: usize, explore: bool) -> Result<usize> {
        dispatch!(self, agent => agent.get_action(state, explore))
    }

    fn reset(&mut self) {
        dispatch!(self, agent => agent.reset())
    }

    fn status(&self) -> AgentStatus {
        dispatch!(self, agent => agent.status())
    }

    fn cancel_handle(&self) -> CancelFlag {
        dispatch!(self, agent => agent.cancel_handle())
    }

    fn gamma(&self) -> f64 {
        dispatch!(self, agent => agent.gamma())
    }

    fn values(&self) -> Option<&[f64]> {
        dispatch!(self, agent => agent.values())
    }

    fn q_table(&self) -> Option<&QTable> {
        dispatch!(self, agent => agent.q_table())
    }

    fn policy(&self) -> Option<&[usize]> {
        dispatch!(self, agent => agent.policy())
    }
}

/// Build an agent for `algorithm`, taking ownership of `env`
///
/// **Fails** with [`Error::InvalidConfiguration`] if `config` does not validate and with
/// [`Error::InvalidArgument`] if `config` belongs to a different family than `algorithm`.
pub fn create_agent<E: Environment>(
    algorithm: Algorithm,
    env: E,
    config: AgentConfig,
) -> Result<TabularAgent<E>> {
    log::debug!("Creating {algorithm} agent");
    let agent = match (algorithm, config) {
        (Algorithm::ValueIteration, AgentConfig::Dp(config)) => TabularAgent::Planning(
            PlanningAgent::new(env, PlanningMethod::ValueIteration, config)?,
        ),
        (Algorithm::PolicyIteration, AgentConfig::Dp(config)) => TabularAgent::Planning(
            PlanningAgent::new(env, PlanningMethod::PolicyIteration, config)?,
        ),
        (Algorithm::PolicyEvaluation, AgentConfig::Dp(config)) => TabularAgent::Planning(
            PlanningAgent::new(env, PlanningMethod::PolicyEvaluation, config)?,
        ),
        (Algorithm::MonteCarlo, AgentConfig::MonteCarlo(config)) => {
            TabularAgent::MonteCarlo(MonteCarloAgent::new(env, config)?)
        }
        (Algorithm::QLearning, AgentConfig::Td(config)) => {
            TabularAgent::QLearning(QLearningAgent::new(env, config)?)
        }
        (Algorithm::Td0, AgentConfig::Td(config)) => {
            TabularAgent::Td(TdAgent::new(env, TdMethod::Td0, config)?)
        }
        (Algorithm::Sarsa, AgentConfig::Td(config)) => {
            TabularAgent::Td(TdAgent::new(env, TdMethod::Sarsa, config)?)
        }
        (Algorithm::NStepTd, AgentConfig::Td(config)) => {
            TabularAgent::Td(TdAgent::new(env, TdMethod::NStepTd, config)?)
        }
        (algorithm, config) => {
            return Err(Error::invalid_argument(format!(
                "{algorithm} cannot be configured with a {} config",
                config_family(&config)
            )));
        }
    };
    Ok(agent)
}

/// [`create_agent`] with the algorithm given by name
///
/// **Fails** with [`Error::InvalidArgument`] if `name` is not a known algorithm.
pub fn create_agent_by_name<E: Environment>(
    name: &str,
    env: E,
    config: AgentConfig,
) -> Result<TabularAgent<E>> {
    let algorithm = Algorithm::from_str(name.trim())
        .map_err(|_| Error::invalid_argument(format!("Unknown algorithm: {name:?}")))?;
    create_agent(algorithm, env, config)
}

fn config_family(config: &AgentConfig) -> &'static str {
    match config {
        AgentConfig::Dp(_) => "dynamic programming",
        AgentConfig::MonteCarlo(_) => "Monte Carlo",
        AgentConfig::Td(_) => "temporal difference",
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::env::tests::{corridor, two_state};

    #[test]
    fn names_round_trip() {
        for algorithm in Algorithm::iter() {
            let name = algorithm.to_string();
            assert_eq!(name.parse::<Algorithm>(), Ok(algorithm), "{name}");
        }
        assert_eq!(Algorithm::VARIANTS.len(), 8);
        assert_eq!(Algorithm::Td0.to_string(), "TD(0)");
        assert_eq!("q_learning".parse::<Algorithm>(), Ok(Algorithm::QLearning));
        assert_eq!("value iteration".parse::<Algorithm>(), Ok(Algorithm::ValueIteration));
    }

    #[test]
    fn metadata() {
        let model_based: Vec<_> = Algorithm::iter().filter(|a| a.requires_model()).collect();
        assert_eq!(
            model_based,
            [
                Algorithm::ValueIteration,
                Algorithm::PolicyIteration,
                Algorithm::PolicyEvaluation
            ]
        );
        assert_eq!(Algorithm::QLearning.family(), AlgorithmFamily::ModelFreeControl);
        assert_eq!(Algorithm::Sarsa.family(), AlgorithmFamily::ModelFreeControl);
        assert_eq!(Algorithm::NStepTd.family(), AlgorithmFamily::TemporalDifference);
        assert!(Algorithm::iter().all(|a| !a.description().is_empty()));
    }

    #[test]
    fn default_configs_build_every_agent() {
        for algorithm in Algorithm::iter() {
            let agent = create_agent(algorithm, corridor(3), algorithm.default_config()).unwrap();
            assert_eq!(agent.algorithm(), algorithm);
            assert_eq!(agent.status(), AgentStatus::Constructed);
        }
    }

    #[test]
    fn rejects_mismatched_family() {
        let result = create_agent(Algorithm::Sarsa, two_state(), DpConfig::default().into());
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn rejects_unknown_name() {
        let result = create_agent_by_name("Deep Q", two_state(), DpConfig::default().into());
        let Err(Error::InvalidArgument { message }) = result else {
            panic!("expected an invalid argument error");
        };
        assert!(message.contains("Deep Q"));
    }
}
