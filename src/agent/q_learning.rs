use super::{
    delegate_to_core, env_accessors, final_epsilon, Agent, AgentCore, EpisodicHistory, Tables,
    TrainingHistory,
};
use crate::{
    algo::{q_learning::q_learning, Progress},
    config::TdConfig,
    env::Environment,
    error::Result,
};

/// Off-policy Q-learning agent
///
/// `n_steps` in the config is ignored.
#[derive(Debug)]
pub struct QLearningAgent<E> {
    core: AgentCore<E>,
    config: TdConfig,
}

impl<E: Environment> QLearningAgent<E> {
    /// **Fails** with [`InvalidConfiguration`](crate::error::Error::InvalidConfiguration) if
    /// `config` does not validate
    pub fn new(env: E, config: TdConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: AgentCore::new(env, config.seed),
            config,
        })
    }

    pub fn config(&self) -> &TdConfig {
        &self.config
    }

    env_accessors!();
}

impl<E: Environment> Agent for QLearningAgent<E> {
    fn train_with_progress(
        &mut self,
        progress: &mut dyn FnMut(&Progress<'_>),
    ) -> Result<TrainingHistory> {
        let config = &self.config;
        log::info!("Training Q-learning agent for {} episodes", config.episodes);

        let (stats, elapsed) = self.core.run(progress, |env, rng, monitor| {
            let n_actions = env.action_space_size();
            let outcome = q_learning(env, config, rng, monitor)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ExplorationConfig, decay, env::tests::cliff};

    #[test]
    fn explores_with_final_epsilon() {
        let config = TdConfig {
            gamma: 1.0,
            alpha: 0.5,
            episodes: 400,
            // Decays to zero well before the last episode
            exploration: ExplorationConfig {
                epsilon: decay::Schedule::Linear(decay::Linear::new(0.01, 1.0, 0.0).unwrap()),
            },
            max_steps: 200,
            seed: Some(2),
            ..Default::default()
        };
        let mut agent = QLearningAgent::new(cliff(3, 4), config).unwrap();
        let history = agent.train().unwrap();
        assert_eq!(history.as_episodic().map(|h| h.episodes), Some(400));

        let greedy = agent.get_action(8, false).unwrap();
        for _ in 0..20 {
            assert_eq!(agent.get_action(8, true), Ok(greedy), "Epsilon is zero at the end");
        }
        assert_eq!(agent.env().action_space_size(), 4);
    }
}
