use rand::{seq::SliceRandom, Rng};

use crate::{
    env::{Environment, Outcome},
    error::{Error, Result},
    util::max_value,
};

/// Probabilities of a non-empty outcome list must sum to 1 within this tolerance
const PROB_TOLERANCE: f64 = 1e-6;

/// Transition and reward model of a finite MDP
///
/// Outcomes are stored per `(state, action)`. An action is available in a state exactly when its
/// outcome list is non-empty; a state without available actions is terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct MdpModel {
    n_states: usize,
    n_actions: usize,
    outcomes: Vec<Vec<Outcome>>,
    available: Vec<Vec<usize>>,
}

/// Which Bellman backup to compute for a state
#[derive(Debug, Clone, Copy)]
pub enum Backup<'a> {
    /// Maximum expected action value over available actions (value iteration)
    Best,
    /// Expected action value weighted by a policy's action probabilities (policy evaluation)
    Policy(&'a StochasticPolicy),
    /// Expected value of one action (greedy extraction, Q recovery)
    Single(Option<usize>),
}

impl MdpModel {
    /// Query `env.transition_prob` for every `(state, action)` pair
    ///
    /// Fails with [`Error::ModelRequired`] as soon as the environment reports it has no model,
    /// and with [`Error::InvalidModel`] on out-of-range next states or probabilities that do not
    /// sum to 1.
    pub fn from_env<E: Environment + ?Sized>(env: &E, algorithm: &str) -> Result<Self> {
        let n_states = env.state_space_size();
        let n_actions = env.action_space_size();
        let mut table = Vec::with_capacity(n_states * n_actions);
        for state in 0..n_states {
            for action in 0..n_actions {
                let outcomes = env
                    .transition_prob(state, action)
                    .ok_or_else(|| Error::ModelRequired {
                        algorithm: algorithm.to_string(),
                    })?;
                table.push(outcomes);
            }
        }
        Self::from_table(n_states, n_actions, table)
    }

    /// Build a model from outcome lists laid out row-major by `(state, action)`
    pub fn from_table(
        n_states: usize,
        n_actions: usize,
        outcomes: Vec<Vec<Outcome>>,
    ) -> Result<Self> {
        if outcomes.len() != n_states * n_actions {
            return Err(Error::invalid_argument(format!(
                "expected {} outcome lists, got {}",
                n_states * n_actions,
                outcomes.len()
            )));
        }

        let mut available = vec![Vec::new(); n_states];
        for (i, list) in outcomes.iter().enumerate() {
            if list.is_empty() {
                continue;
            }
            let (state, action) = (i / n_actions, i % n_actions);
            let invalid = |message: String| Error::InvalidModel {
                state,
                action,
                message,
            };
            if let Some(o) = list.iter().find(|o| o.next_state >= n_states) {
                return Err(invalid(format!("next state {} out of range", o.next_state)));
            }
            if let Some(o) = list.iter().find(|o| !(0.0..=1.0).contains(&o.prob)) {
                return Err(invalid(format!("probability {} out of range", o.prob)));
            }
            let total: f64 = list.iter().map(|o| o.prob).sum();
            if (total - 1.0).abs() > PROB_TOLERANCE {
                return Err(invalid(format!("probabilities sum to {total}")));
            }
            available[state].push(action);
        }

        log::debug!(
            "Extracted MDP model: {n_states} states, {n_actions} actions, {} terminal states",
            available.iter().filter(|a| a.is_empty()).count()
        );

        Ok(Self {
            n_states,
            n_actions,
            outcomes,
            available,
        })
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Actions with a non-empty transition distribution in `state`, in increasing order
    pub fn available_actions(&self, state: usize) -> &[usize] {
        &self.available[state]
    }

    pub fn is_terminal(&self, state: usize) -> bool {
        self.available[state].is_empty()
    }

    pub fn outcomes(&self, state: usize, action: usize) -> &[Outcome] {
        &self.outcomes[state * self.n_actions + action]
    }

    /// `Σ P(next|s,a) * (R(s,a,next) + γ·V(next))`, which is 0 for an unavailable action
    pub fn action_value(&self, values: &[f64], gamma: f64, state: usize, action: usize) -> f64 {
        self.outcomes(state, action)
            .iter()
            .map(|o| o.prob * (o.reward + gamma * values[o.next_state]))
            .sum()
    }

    /// Bellman backup of `state` under the given mode
    ///
    /// States absent from the model back up to 0 in every mode.
    pub fn backup(&self, values: &[f64], gamma: f64, state: usize, mode: Backup<'_>) -> Result<f64> {
        if state >= self.n_states {
            return match mode {
                Backup::Single(None) => Err(Error::invalid_argument(
                    "single-action backup requires an action",
                )),
                _ => Ok(0.0),
            };
        }
        let value = match mode {
            Backup::Best => max_value(
                self.available_actions(state)
                    .iter()
                    .map(|&a| self.action_value(values, gamma, state, a)),
            )
            .unwrap_or(0.0),
            Backup::Policy(policy) => policy
                .distribution(state)
                .iter()
                .filter(|&&(a, _)| a < self.n_actions)
                .map(|&(a, p)| p * self.action_value(values, gamma, state, a))
                .sum(),
            Backup::Single(Some(action)) if action < self.n_actions => {
                self.action_value(values, gamma, state, action)
            }
            Backup::Single(Some(_)) => 0.0,
            Backup::Single(None) => {
                return Err(Error::invalid_argument(
                    "single-action backup requires an action",
                ))
            }
        };
        Ok(value)
    }

    /// Greedy action of `state` over its available actions, ties going to the first one seen
    ///
    /// **Returns** `None` for terminal states, otherwise `(action, value)`
    pub fn greedy(&self, values: &[f64], gamma: f64, state: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for &action in self.available_actions(state) {
            let value = self.action_value(values, gamma, state, action);
            if best.map_or(true, |(_, v)| value > v) {
                best = Some((action, value));
            }
        }
        best
    }
}

/// Per-state sparse action distribution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StochasticPolicy {
    distributions: Vec<Vec<(usize, f64)>>,
}

impl StochasticPolicy {
    pub fn new(distributions: Vec<Vec<(usize, f64)>>) -> Self {
        Self { distributions }
    }

    /// Equal probability for every available action of every state
    pub fn uniform(model: &MdpModel) -> Self {
        let distributions = (0..model.n_states())
            .map(|s| {
                let actions = model.available_actions(s);
                let p = 1.0 / actions.len() as f64;
                actions.iter().map(|&a| (a, p)).collect()
            })
            .collect();
        Self { distributions }
    }

    /// One uniformly random available action per state, chosen with probability 1
    pub fn random_deterministic<R: Rng + ?Sized>(model: &MdpModel, rng: &mut R) -> Self {
        let distributions = (0..model.n_states())
            .map(|s| {
                model
                    .available_actions(s)
                    .choose(rng)
                    .map(|&a| vec![(a, 1.0)])
                    .unwrap_or_default()
            })
            .collect();
        Self { distributions }
    }

    /// Action distribution of `state`; empty if the state has no entry
    pub fn distribution(&self, state: usize) -> &[(usize, f64)] {
        self.distributions
            .get(state)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Most probable action of `state`, ties going to the first listed
    pub fn action(&self, state: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &(a, p) in self.distribution(state) {
            if best.map_or(true, |(_, bp)| p > bp) {
                best = Some((a, p));
            }
        }
        best.map(|(a, _)| a)
    }

    pub fn set_action(&mut self, state: usize, action: usize) {
        if state >= self.distributions.len() {
            self.distributions.resize(state + 1, Vec::new());
        }
        self.distributions[state] = vec![(action, 1.0)];
    }
}
