use rand::Rng;

use super::{ControlOutcome, EpisodeReporter, EpisodeStats, Monitor, QTable};
use crate::{
    config::{MonteCarloConfig, VisitMode},
    env::{Environment, Transition},
    error::Result,
    exploration::{act_with, EpsilonGreedy},
};

/// Running return estimates per state-action pair
///
/// Averages returns when no step size is given, otherwise moves each estimate toward the
/// return by a constant step size.
#[derive(Debug, Clone)]
pub struct ReturnEstimator {
    q: QTable,
    sums: Vec<f64>,
    counts: Vec<u32>,
    gamma: f64,
    visit: VisitMode,
    step_size: Option<f64>,
}

impl ReturnEstimator {
    pub fn new(
        n_states: usize,
        n_actions: usize,
        gamma: f64,
        visit: VisitMode,
        step_size: Option<f64>,
    ) -> Self {
        Self {
            q: QTable::new(n_states, n_actions),
            sums: vec![0.0; n_states * n_actions],
            counts: vec![0; n_states * n_actions],
            gamma,
            visit,
            step_size,
        }
    }

    pub fn q(&self) -> &QTable {
        &self.q
    }

    pub fn into_q(self) -> QTable {
        self.q
    }

    /// Fold one finished episode into the estimates
    ///
    /// Returns are accumulated backward from the end of the episode. In first-visit mode only the
    /// earliest occurrence of each pair contributes.
    pub fn update(&mut self, episode: &[Transition]) {
        let n_actions = self.q.n_actions();
        let key = |t: &Transition| t.state * n_actions + t.action;

        let mut first_visit = vec![usize::MAX; self.counts.len()];
        if self.visit == VisitMode::FirstVisit {
            for (t, transition) in episode.iter().enumerate() {
                let k = key(transition);
                if first_visit[k] == usize::MAX {
                    first_visit[k] = t;
                }
            }
        }

        let mut g = 0.0;
        for (t, transition) in episode.iter().enumerate().rev() {
            g = transition.reward + self.gamma * g;
            let k = key(transition);
            if self.visit == VisitMode::FirstVisit && first_visit[k] != t {
                continue;
            }

            let (state, action) = (transition.state, transition.action);
            match self.step_size {
                Some(alpha) => self.q.update(state, action, g, alpha),
                None => {
                    self.sums[k] += g;
                    self.counts[k] += 1;
                    self.q.set(state, action, self.sums[k] / self.counts[k] as f64);
                }
            }
        }
    }
}

/// Run one episode following `policy`, with epsilon-greedy deviations, for at most `max_steps`
pub fn generate_episode<E, R>(
    env: &mut E,
    policy: &[usize],
    epsilon: f64,
    max_steps: usize,
    rng: &mut R,
) -> Vec<Transition>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let n_actions = env.action_space_size();
    let mut episode = Vec::new();
    let mut state = env.reset();

    while episode.len() < max_steps {
        let action = act_with(epsilon, n_actions, rng, || policy[state]);
        let (next_state, reward, done) = env.step(action);
        episode.push(Transition {
            state,
            action,
            reward,
            next_state,
            done,
        });
        if done {
            return episode;
        }
        state = next_state;
    }

    log::debug!("Episode truncated at {max_steps} steps");
    episode
}

/// Monte Carlo control
///
/// Starts from a uniformly random policy. Each episode follows the current greedy policy
/// (deviating with the configured epsilon), updates the return estimates, then re-derives the
/// policy as the argmax over Q for every state. An epsilon of zero gives the purely greedy
/// variant.
pub fn monte_carlo<E, R>(
    env: &mut E,
    config: &MonteCarloConfig,
    rng: &mut R,
    monitor: &mut Monitor<'_>,
) -> Result<ControlOutcome>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let (n_states, n_actions) = (env.state_space_size(), env.action_space_size());
    let exploration = EpsilonGreedy::new(config.exploration.epsilon.clone());
    let mut estimator =
        ReturnEstimator::new(n_states, n_actions, config.gamma, config.visit, config.step_size);
    let mut policy: Vec<usize> = (0..n_states).map(|_| rng.gen_range(0..n_actions)).collect();
    let mut stats = EpisodeStats::with_capacity(config.episodes);
    let reporter = EpisodeReporter::new(config.episodes);

    for episode_idx in 0..config.episodes {
        monitor.checkpoint()?;
        let epsilon = exploration.epsilon(episode_idx as u32);
        let episode = generate_episode(env, &policy, epsilon, config.max_steps, rng);
        let reward: f64 = episode.iter().map(|t| t.reward).sum();
        stats.push(reward, episode.len());

        estimator.update(&episode);
        policy = estimator.q().greedy_policy();
        reporter.finished(monitor, episode_idx, reward, episode.len(), epsilon);
    }

    log::info!("Monte Carlo finished {} episodes", config.episodes);
    let q = estimator.into_q();
    Ok(ControlOutcome { q, policy, stats })
}
