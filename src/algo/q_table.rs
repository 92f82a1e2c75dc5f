use serde::Serialize;

use crate::util::{argmax, max_value};

/// Dense table of action values, one row per state
///
/// Entries start at `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QTable {
    n_states: usize,
    n_actions: usize,
    values: Vec<f64>,
}

impl QTable {
    pub fn new(n_states: usize, n_actions: usize) -> Self {
        Self {
            n_states,
            n_actions,
            values: vec![0.0; n_states * n_actions],
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[state * self.n_actions + action]
    }

    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        self.values[state * self.n_actions + action] = value;
    }

    /// Move `Q(state, action)` toward `target` by step size `alpha`
    pub fn update(&mut self, state: usize, action: usize, target: f64, alpha: f64) {
        let q = &mut self.values[state * self.n_actions + action];
        *q += alpha * (target - *q);
    }

    /// Action values of one state
    pub fn row(&self, state: usize) -> &[f64] {
        let start = state * self.n_actions;
        &self.values[start..start + self.n_actions]
    }

    /// Highest-valued action, ties going to the lowest index
    pub fn greedy_action(&self, state: usize) -> usize {
        argmax(self.row(state))
    }

    /// Largest action value of a state
    pub fn max_value(&self, state: usize) -> f64 {
        max_value(self.row(state).iter().copied()).unwrap_or(0.0)
    }

    /// Greedy action of every state
    pub fn greedy_policy(&self) -> Vec<usize> {
        (0..self.n_states).map(|s| self.greedy_action(s)).collect()
    }
}
