use super::{
    delegate_to_core, env_accessors, final_epsilon, Agent, AgentCore, EpisodicHistory, Tables,
    TrainingHistory,
};
use crate::{
    algo::{mc::monte_carlo, Progress},
    config::MonteCarloConfig,
    env::Environment,
    error::Result,
};

/// Monte Carlo control agent
///
/// Learns Q from complete episodes. After training `q_table` and `policy` are available;
/// `values` is not.
#[derive(Debug)]
pub struct MonteCarloAgent<E> {
    core: AgentCore<E>,
    config: MonteCarloConfig,
}

impl<E: Environment> MonteCarloAgent<E> {
    /// **Fails** with [`InvalidConfiguration`](crate::error::Error::InvalidConfiguration) if
    /// `config` does not validate
    pub fn new(env: E, config: MonteCarloConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: AgentCore::new(env, config.seed),
            config,
        })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    env_accessors!();
}

impl<E: Environment> Agent for MonteCarloAgent<E> {
    fn train_with_progress(
        &mut self,
        progress: &mut dyn FnMut(&Progress<'_>),
    ) -> Result<TrainingHistory> {
        let config = &self.config;
        log::info!(
            "Training Monte Carlo agent for {} episodes ({:?})",
            config.episodes,
            config.visit
        );

        let (stats, elapsed) = self.core.run(progress, |env, rng, monitor| {
            let n_actions = env.action_space_size();
            let outcome = monte_carlo(env, config, rng, monitor)?;
            let tables = Tables {
                values: None,
                q: Some(outcome.q),
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
