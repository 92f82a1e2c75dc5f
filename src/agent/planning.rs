use super::{
    delegate_to_core, env_accessors, Agent, AgentCore, Algorithm, PlanningHistory, Tables,
    TrainingHistory,
};
use crate::{
    algo::{
        dp::{greedy_tables, policy_evaluation, policy_iteration, value_iteration},
        MdpModel, Progress, StochasticPolicy,
    },
    config::DpConfig,
    env::Environment,
    error::Result,
};

/// Dynamic programming procedure run by a [`PlanningAgent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningMethod {
    ValueIteration,
    PolicyIteration,
    /// Evaluate the uniform random policy, then act greedily on its values
    PolicyEvaluation,
}

impl From<PlanningMethod> for Algorithm {
    fn from(method: PlanningMethod) -> Self {
        match method {
            PlanningMethod::ValueIteration => Algorithm::ValueIteration,
            PlanningMethod::PolicyIteration => Algorithm::PolicyIteration,
            PlanningMethod::PolicyEvaluation => Algorithm::PolicyEvaluation,
        }
    }
}

/// Agent that plans over the environment's transition model
///
/// Training extracts an [`MdpModel`] from the environment and fails with
/// [`Error::ModelRequired`](crate::error::Error::ModelRequired) if the environment does not
/// expose one. After training, `values`, `q_table` and `policy` are all available and
/// [`Agent::get_action`] is always greedy.
#[derive(Debug)]
pub struct PlanningAgent<E> {
    core: AgentCore<E>,
    method: PlanningMethod,
    config: DpConfig,
}

impl<E: Environment> PlanningAgent<E> {
    /// **Fails** with [`InvalidConfiguration`](crate::error::Error::InvalidConfiguration) if
    /// `config` does not validate
    pub fn new(env: E, method: PlanningMethod, config: DpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: AgentCore::new(env, config.seed),
            method,
            config,
        })
    }

    pub fn method(&self) -> PlanningMethod {
        self.method
    }

    pub fn config(&self) -> &DpConfig {
        &self.config
    }

    env_accessors!();
}

impl<E: Environment> Agent for PlanningAgent<E> {
    fn train_with_progress(
        &mut self,
        progress: &mut dyn FnMut(&Progress<'_>),
    ) -> Result<TrainingHistory> {
        let (method, config) = (self.method, &self.config);
        let name = Algorithm::from(method).to_string();
        log::info!("Training {name} agent");

        let (stats, elapsed) = self.core.run(progress, |env, rng, monitor| {
            let model = MdpModel::from_env(&*env, &name)?;
            let (values, stats) = match method {
                PlanningMethod::ValueIteration => value_iteration(&model, config, monitor)?,
                PlanningMethod::PolicyEvaluation => {
                    let policy = StochasticPolicy::uniform(&model);
                    policy_evaluation(&model, &policy, config, monitor)?
                }
                PlanningMethod::PolicyIteration => {
                    let (values, _, stats) = policy_iteration(&model, config, rng, monitor)?;
                    (values, stats)
                }
            };

            let (policy, q) = greedy_tables(&model, &values, config.gamma)?;
            let tables = Tables {
                values: Some(values),
                q: Some(q),
                policy,
                n_actions: model.n_actions(),
                epsilon: None,
            };
            Ok((tables, stats))
        })?;

        Ok(TrainingHistory::Planning(PlanningHistory::new(elapsed, &stats)))
    }

    fn gamma(&self) -> f64 {
        self.config.gamma
    }

    delegate_to_core!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::AgentStatus,
        env::tests::{corridor, two_state},
        error::Error,
    };

    fn config() -> DpConfig {
        DpConfig {
            gamma: 0.9,
            theta: 1e-4,
            seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn value_iteration_on_two_states() {
        let mut agent =
            PlanningAgent::new(two_state(), PlanningMethod::ValueIteration, config()).unwrap();
        let mut seen = Vec::new();
        let history = agent
            .train_with_progress(&mut |p: &Progress<'_>| seen.push(p.metric("iteration")))
            .unwrap();

        let history = history.as_planning().unwrap();
        assert!(history.converged);
        assert!(history.iterations <= 2);
        assert_eq!(seen.len(), history.iterations);
        assert_eq!(agent.values(), Some(&[1.0, 0.0][..]));
        assert_eq!(agent.get_action(0, true), Ok(1), "Planning agents ignore explore");
        assert_eq!(agent.status(), AgentStatus::Trained);
    }

    #[test]
    fn model_free_environment_is_rejected() {
        let env = two_state().model_free();
        let mut agent = PlanningAgent::new(env, PlanningMethod::PolicyIteration, config()).unwrap();
        assert_eq!(
            agent.train(),
            Err(Error::ModelRequired {
                algorithm: "Policy Iteration".to_string()
            })
        );
        assert_eq!(agent.status(), AgentStatus::Constructed);
        assert!(agent.values().is_none() && agent.q_table().is_none());
        assert_eq!(agent.get_action(0, false), Err(Error::NotTrained));
    }

    #[test]
    fn methods_agree_on_corridor() {
        let train = |method| {
            let mut agent = PlanningAgent::new(corridor(5), method, config()).unwrap();
            agent.train().unwrap();
            agent.policy().map(<[usize]>::to_vec)
        };
        let vi = train(PlanningMethod::ValueIteration);
        assert_eq!(vi.as_deref().map(|p| &p[..4]), Some(&[1, 1, 1, 1][..]));
        assert_eq!(train(PlanningMethod::PolicyIteration), vi);
        // Even the uniform random policy's values point toward the goal
        assert_eq!(train(PlanningMethod::PolicyEvaluation), vi);
    }

    #[test]
    fn reset_returns_to_constructed() {
        let mut agent =
            PlanningAgent::new(two_state(), PlanningMethod::ValueIteration, config()).unwrap();
        agent.train().unwrap();
        agent.reset();
        assert_eq!(agent.status(), AgentStatus::Constructed);
        assert!(agent.policy().is_none());
        assert_eq!(agent.into_env().reset(), 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = DpConfig {
            theta: -1.0,
            ..Default::default()
        };
        let result = PlanningAgent::new(two_state(), PlanningMethod::ValueIteration, config);
        assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));
    }
}
