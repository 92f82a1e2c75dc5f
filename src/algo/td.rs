use rand::Rng;

use super::{EpisodeReporter, EpisodeStats, Monitor, QTable};
use crate::{
    config::TdConfig,
    ds::RingBuffer,
    env::Environment,
    error::{Error, Result},
    exploration::{act_with, EpsilonGreedy},
};

/// Table learned by the TD solver
#[derive(Debug, Clone, PartialEq)]
pub enum TdTable {
    /// State values
    Values(Vec<f64>),
    /// Action values
    ActionValues(QTable),
}

impl TdTable {
    fn new(n_states: usize, n_actions: usize, q_based: bool) -> Self {
        if q_based {
            Self::ActionValues(QTable::new(n_states, n_actions))
        } else {
            Self::Values(vec![0.0; n_states])
        }
    }

    /// Bootstrap estimate for `state`
    ///
    /// The action is ignored for state values and required for action values.
    pub fn estimate(&self, state: usize, action: Option<usize>) -> Result<f64> {
        match (self, action) {
            (Self::Values(v), _) => Ok(v[state]),
            (Self::ActionValues(q), Some(action)) => Ok(q.get(state, action)),
            (Self::ActionValues(_), None) => Err(Error::invalid_argument(format!(
                "Action-value estimate for state {state} requires an action"
            ))),
        }
    }

    /// Move the estimate for `(state, action)` toward `target`
    pub fn update(&mut self, state: usize, action: usize, target: f64, alpha: f64) {
        match self {
            Self::Values(v) => v[state] += alpha * (target - v[state]),
            Self::ActionValues(q) => q.update(state, action, target, alpha),
        }
    }
}

/// Result of a TD run
#[derive(Debug, Clone, PartialEq)]
pub struct TdOutcome {
    pub table: TdTable,
    pub policy: Vec<usize>,
    pub stats: EpisodeStats,
}

/// Shared per-run state threaded through the episode loops
struct Learner<'c> {
    config: &'c TdConfig,
    table: TdTable,
    policy: Vec<usize>,
    n_actions: usize,
}

impl Learner<'_> {
    fn act<R: Rng + ?Sized>(&self, state: usize, epsilon: f64, rng: &mut R) -> usize {
        act_with(epsilon, self.n_actions, rng, || self.policy[state])
    }

    /// One-step episode; returns the total reward and the number of steps taken
    fn one_step_episode<E, R>(
        &mut self,
        env: &mut E,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<(f64, usize)>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        let (gamma, alpha) = (self.config.gamma, self.config.alpha);
        let mut state = env.reset();
        let mut action = self.act(state, epsilon, rng);
        let (mut total, mut steps) = (0.0, 0);

        loop {
            let (next_state, reward, done) = env.step(action);
            total += reward;
            steps += 1;
            if done {
                self.table.update(state, action, reward, alpha);
                break;
            }

            let next_action = self.act(next_state, epsilon, rng);
            let target = reward + gamma * self.table.estimate(next_state, Some(next_action))?;
            self.table.update(state, action, target, alpha);
            if steps >= self.config.max_steps {
                break;
            }
            state = next_state;
            action = next_action;
        }

        Ok((total, steps))
    }

    /// n-step episode over a window of `n + 1` steps
    fn n_step_episode<E, R>(
        &mut self,
        env: &mut E,
        n: usize,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<(f64, usize)>
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        let (gamma, alpha) = (self.config.gamma, self.config.alpha);
        let mut states = RingBuffer::<usize>::new(n + 1);
        let mut actions = RingBuffer::<usize>::new(n + 1);
        let mut rewards = RingBuffer::<f64>::new(n + 1);

        let start = env.reset();
        states.store(0, start);
        actions.store(0, self.act(start, epsilon, rng));

        // Episode end time; `terminal` distinguishes a real end from truncation
        let mut end = usize::MAX;
        let mut terminal = false;
        let mut total = 0.0;
        let mut t = 0;

        loop {
            if t < end {
                let (next_state, reward, done) = env.step(actions[t]);
                total += reward;
                states.store(t + 1, next_state);
                rewards.store(t + 1, reward);
                if done {
                    end = t + 1;
                    terminal = true;
                } else {
                    actions.store(t + 1, self.act(next_state, epsilon, rng));
                    if t + 1 >= self.config.max_steps {
                        end = t + 1;
                    }
                }
            }

            if t + 1 >= n {
                let tau = t + 1 - n;
                let horizon = (tau + n).min(end);
                let mut g: f64 = (tau + 1..=horizon)
                    .map(|i| gamma.powi((i - tau - 1) as i32) * rewards[i])
                    .sum();
                let bootstrap = if tau + n < end {
                    Some(tau + n)
                } else {
                    (!terminal).then_some(end)
                };
                if let Some(i) = bootstrap {
                    let estimate = self.table.estimate(states[i], Some(actions[i]))?;
                    g += gamma.powi((i - tau) as i32) * estimate;
                }
                self.table.update(states[tau], actions[tau], g, alpha);

                if tau + 1 == end {
                    break;
                }
            }
            t += 1;
        }

        Ok((total, end))
    }
}

/// Temporal-difference learning
///
/// Behavior is epsilon-greedy over the policy table, which starts random and stays fixed for the
/// whole episode. The next action is chosen right after each non-terminal step and is the one
/// executed next. Episodes cut by `max_steps` still bootstrap from their final state.
///
/// After each episode a value-based run re-randomizes its policy, since state values alone do
/// not determine one. An action-value-based run takes the argmax over Q.
pub fn td<E, R>(
    env: &mut E,
    config: &TdConfig,
    q_based: bool,
    rng: &mut R,
    monitor: &mut Monitor<'_>,
) -> Result<TdOutcome>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let (n_states, n_actions) = (env.state_space_size(), env.action_space_size());
    let exploration = EpsilonGreedy::new(config.exploration.epsilon.clone());
    let mut learner = Learner {
        config,
        table: TdTable::new(n_states, n_actions, q_based),
        policy: random_policy(n_states, n_actions, rng),
        n_actions,
    };
    let mut stats = EpisodeStats::with_capacity(config.episodes);
    let reporter = EpisodeReporter::new(config.episodes);

    for episode in 0..config.episodes {
        monitor.checkpoint()?;
        let epsilon = exploration.epsilon(episode as u32);
        let (reward, length) = match config.n_steps {
            Some(n) => learner.n_step_episode(env, n, epsilon, rng)?,
            None => learner.one_step_episode(env, epsilon, rng)?,
        };
        stats.push(reward, length);

        learner.policy = match &learner.table {
            TdTable::Values(_) => random_policy(n_states, n_actions, rng),
            TdTable::ActionValues(q) => q.greedy_policy(),
        };
        reporter.finished(monitor, episode, reward, length, epsilon);
    }

    log::info!(
        "TD finished {} episodes ({}, {})",
        config.episodes,
        if q_based { "action values" } else { "state values" },
        config.n_steps.map_or("one-step".to_string(), |n| format!("{n}-step")),
    );
    Ok(TdOutcome {
        table: learner.table,
        policy: learner.policy,
        stats,
    })
}

fn random_policy<R: Rng + ?Sized>(n_states: usize, n_actions: usize, rng: &mut R) -> Vec<usize> {
    (0..n_states).map(|_| rng.gen_range(0..n_actions)).collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        algo::tests::silent,
        config::ExplorationConfig,
        env::{
            tests::{chain, corridor, TableEnv},
            Outcome,
        },
    };

    fn config(n_steps: Option<usize>) -> TdConfig {
        TdConfig {
            gamma: 0.9,
            alpha: 0.2,
            episodes: 50,
            exploration: ExplorationConfig::constant(0.2),
            n_steps,
            max_steps: 30,
            seed: None,
        }
    }

    fn run(n_steps: Option<usize>, q_based: bool) -> TdOutcome {
        let mut env = corridor(5);
        let mut rng = StdRng::seed_from_u64(11);
        silent(|m| td(&mut env, &config(n_steps), q_based, &mut rng, m)).unwrap()
    }

    #[test]
    fn one_step_window_matches_one_step_path() {
        for q_based in [false, true] {
            let one_step = run(None, q_based);
            let windowed = run(Some(1), q_based);
            assert_eq!(one_step, windowed, "q_based = {q_based}");
        }
    }

    #[test]
    fn action_value_estimate_needs_an_action() {
        let q = TdTable::new(2, 2, true);
        assert!(matches!(q.estimate(0, None), Err(Error::InvalidArgument { .. })));
        assert_eq!(q.estimate(0, Some(1)), Ok(0.0));
        assert_eq!(TdTable::new(2, 2, false).estimate(1, None), Ok(0.0));
    }

    #[test]
    fn terminal_target_is_the_reward() {
        // Single action: 0 -> 1 (reward 0 or 1), 1 -> 2 (reward 2), 2 terminal
        let mut env = chain();
        let config = TdConfig {
            gamma: 1.0,
            alpha: 1.0,
            episodes: 1,
            exploration: ExplorationConfig::constant(0.0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = silent(|m| td(&mut env, &config, false, &mut rng, m)).unwrap();
        let TdTable::Values(v) = outcome.table else {
            panic!("expected state values");
        };
        assert_eq!(v[1], 2.0, "Last step targets only its reward");
        assert_eq!(v[2], 0.0, "Terminal state is never updated");
    }

    #[test]
    fn n_step_returns_reach_back() {
        // Deterministic line 0 -> 1 -> 2 -> 3 with reward 1 on the last step only
        let line = |next: usize, reward: f64| vec![vec![Outcome::new(next, 1.0, reward)]];
        let mut env = TableEnv::new(
            vec![line(1, 0.0), line(2, 0.0), line(3, 1.0), vec![vec![]]],
            1,
            0,
        );
        let config = TdConfig {
            gamma: 0.5,
            alpha: 1.0,
            episodes: 1,
            exploration: ExplorationConfig::constant(0.0),
            n_steps: Some(3),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = silent(|m| td(&mut env, &config, false, &mut rng, m)).unwrap();
        assert_eq!(outcome.table, TdTable::Values(vec![0.25, 0.5, 1.0, 0.0]));
        assert_eq!(outcome.stats.lengths, vec![3]);
    }

    #[test]
    fn episode_follows_the_policy_it_started_with() {
        let config = TdConfig {
            gamma: 0.9,
            alpha: 0.5,
            episodes: 1,
            exploration: ExplorationConfig::constant(0.0),
            max_steps: 50,
            ..Default::default()
        };
        for seed in 0..6 {
            let mut rng = StdRng::seed_from_u64(seed);
            let initial = random_policy(5, 2, &mut rng.clone());

            // Walk the corridor under the initial policy
            let (mut state, mut expected) = (0, 0);
            while state != 4 && expected < config.max_steps {
                state = if initial[state] == 1 { state + 1 } else { state.saturating_sub(1) };
                expected += 1;
            }

            let mut env = corridor(5);
            let outcome = silent(|m| td(&mut env, &config, true, &mut rng, m)).unwrap();
            assert_eq!(outcome.stats.lengths, vec![expected], "seed {seed}: {initial:?}");
        }
    }

    #[test]
    fn n_step_action_values_reach_back() {
        // Same line as above, learned as action values with a 2-step window
        let line = |next: usize, reward: f64| vec![vec![Outcome::new(next, 1.0, reward)]];
        let mut env = TableEnv::new(
            vec![line(1, 0.0), line(2, 0.0), line(3, 1.0), vec![vec![]]],
            1,
            0,
        );
        let config = TdConfig {
            gamma: 0.5,
            alpha: 1.0,
            episodes: 2,
            exploration: ExplorationConfig::constant(0.0),
            n_steps: Some(2),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = silent(|m| td(&mut env, &config, true, &mut rng, m)).unwrap();
        let TdTable::ActionValues(q) = outcome.table else {
            panic!("expected action values");
        };
        // The first episode leaves Q(0) at 0: it bootstraps from Q(2) before Q(2) is learned
        let values: Vec<f64> = (0..4).map(|s| q.get(s, 0)).collect();
        assert_eq!(values, [0.25, 0.5, 1.0, 0.0]);
        assert_eq!(outcome.stats.lengths, vec![3, 3]);
    }

    #[test]
    fn truncated_episodes_bootstrap_from_last_state() {
        // Two states stepping back and forth forever with reward 1
        let mut env = TableEnv::new(
            vec![
                vec![vec![Outcome::new(1, 1.0, 1.0)]],
                vec![vec![Outcome::new(0, 1.0, 1.0)]],
            ],
            1,
            0,
        );
        let config = |n_steps| TdConfig {
            gamma: 0.5,
            alpha: 1.0,
            episodes: 1,
            exploration: ExplorationConfig::constant(0.0),
            n_steps,
            max_steps: 2,
            seed: None,
        };
        let mut rng = StdRng::seed_from_u64(0);

        // 0 -> 1 -> 0 is cut after two steps; V(1) bootstraps from the updated V(0)
        let windowed = silent(|m| td(&mut env, &config(Some(3)), false, &mut rng, m)).unwrap();
        assert_eq!(windowed.table, TdTable::Values(vec![1.5, 1.75]));
        assert_eq!(windowed.stats.lengths, vec![2]);

        let one_step = silent(|m| td(&mut env, &config(None), false, &mut rng, m)).unwrap();
        assert_eq!(one_step.table, TdTable::Values(vec![1.0, 1.5]));
    }

    #[test]
    fn truncated_episodes_respect_step_cap() {
        let outcome = run(Some(3), true);
        assert_eq!(outcome.stats.lengths.len(), 50);
        assert!(outcome.stats.lengths.iter().all(|&l| l <= 30));
    }

    #[test]
    fn sarsa_learns_corridor() {
        let mut env = corridor(5);
        let config = TdConfig {
            gamma: 0.9,
            alpha: 0.5,
            episodes: 300,
            exploration: ExplorationConfig::constant(0.1),
            max_steps: 100,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = silent(|m| td(&mut env, &config, true, &mut rng, m)).unwrap();
        assert_eq!(outcome.policy[..4], [1, 1, 1, 1]);
    }
}
