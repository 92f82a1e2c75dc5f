use rand::Rng;

use super::{ControlOutcome, EpisodeReporter, EpisodeStats, Monitor, QTable};
use crate::{
    config::TdConfig,
    env::Environment,
    error::Result,
    exploration::{act_with, EpsilonGreedy},
};

/// Q-learning target for one observed step
///
/// Bootstraps from the best action in `next_state` unless the step ended the episode.
pub fn target(q: &QTable, reward: f64, next_state: usize, done: bool, gamma: f64) -> f64 {
    if done {
        reward
    } else {
        reward + gamma * q.max_value(next_state)
    }
}

/// Tabular Q-learning with epsilon-greedy behavior over the live Q table
///
/// `n_steps` is ignored.
pub fn q_learning<E, R>(
    env: &mut E,
    config: &TdConfig,
    rng: &mut R,
    monitor: &mut Monitor<'_>,
) -> Result<ControlOutcome>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let (n_states, n_actions) = (env.state_space_size(), env.action_space_size());
    let exploration = EpsilonGreedy::new(config.exploration.epsilon.clone());
    let mut q = QTable::new(n_states, n_actions);
    let mut stats = EpisodeStats::with_capacity(config.episodes);
    let reporter = EpisodeReporter::new(config.episodes);

    for episode in 0..config.episodes {
        monitor.checkpoint()?;
        let epsilon = exploration.epsilon(episode as u32);
        let mut state = env.reset();
        let (mut total, mut steps) = (0.0, 0);

        while steps < config.max_steps {
            let action = act_with(epsilon, n_actions, rng, || q.greedy_action(state));
            let (next_state, reward, done) = env.step(action);
            total += reward;
            steps += 1;

            let y = target(&q, reward, next_state, done, config.gamma);
            q.update(state, action, y, config.alpha);
            if done {
                break;
            }
            state = next_state;
        }

        stats.push(total, steps);
        reporter.finished(monitor, episode, total, steps, epsilon);
    }

    log::info!("Q-learning finished {} episodes", config.episodes);
    let policy = q.greedy_policy();
    Ok(ControlOutcome { q, policy, stats })
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        algo::{
            td::{td, TdTable},
            tests::silent,
        },
        config::ExplorationConfig,
        env::tests::cliff,
    };

    fn cliff_config() -> TdConfig {
        TdConfig {
            gamma: 1.0,
            alpha: 0.5,
            episodes: 500,
            exploration: ExplorationConfig::constant(0.1),
            max_steps: 200,
            ..Default::default()
        }
    }

    #[test]
    fn target_bootstraps_from_best_action() {
        let mut q = QTable::new(2, 2);
        q.set(1, 0, 1.0);
        q.set(1, 1, 5.0);
        assert_eq!(target(&q, 1.0, 1, false, 0.5), 3.5);
        assert_eq!(target(&q, 1.0, 1, true, 0.5), 1.0, "No bootstrap at termination");
    }

    #[test]
    fn learns_the_cliff_edge_path() {
        let mut env = cliff(3, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = silent(|m| q_learning(&mut env, &cliff_config(), &mut rng, m)).unwrap();

        // Start (8) goes up, the middle row runs right along the cliff, and 7 drops into the goal
        assert_eq!(outcome.policy[8], 0);
        assert_eq!(outcome.policy[4], 1);
        assert_eq!(outcome.policy[5], 1);
        assert_eq!(outcome.policy[6], 1);
        assert_eq!(outcome.policy[7], 2);
        assert!((outcome.q.get(8, 0) + 5.0).abs() < 1e-3, "Five steps from start to goal");
    }

    #[test]
    fn differs_from_sarsa_under_exploration() {
        let config = cliff_config();

        let mut env = cliff(3, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let off_policy = silent(|m| q_learning(&mut env, &config, &mut rng, m)).unwrap();

        let mut env = cliff(3, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let on_policy = silent(|m| td(&mut env, &config, true, &mut rng, m)).unwrap();
        let TdTable::ActionValues(sarsa_q) = on_policy.table else {
            panic!("expected action values");
        };

        assert_ne!(off_policy.q, sarsa_q, "Max and sampled targets learn different tables");
    }
}
