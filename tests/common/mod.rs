use tabular_rl::{Environment, Outcome};

/// Deterministic corridor: actions 0 = left and 1 = right, the last cell is the terminal goal
///
/// Reaching the goal pays 1, every other step costs 0.01.
pub struct Corridor {
    len: usize,
    state: usize,
    model: bool,
}

impl Corridor {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            state: 0,
            model: true,
        }
    }

    /// Same dynamics, but the transition model is hidden from agents
    pub fn without_model(len: usize) -> Self {
        Self {
            model: false,
            ..Self::new(len)
        }
    }

    fn goal(&self) -> usize {
        self.len - 1
    }

    fn outcome(&self, state: usize, action: usize) -> Outcome {
        let next = match action {
            0 => state.saturating_sub(1),
            _ => (state + 1).min(self.goal()),
        };
        let reward = if next == self.goal() { 1.0 } else { -0.01 };
        Outcome::new(next, 1.0, reward)
    }
}

impl Environment for Corridor {
    fn state_space_size(&self) -> usize {
        self.len
    }

    fn action_space_size(&self) -> usize {
        2
    }

    fn reset(&mut self) -> usize {
        self.state = 0;
        self.state
    }

    fn step(&mut self, action: usize) -> (usize, f64, bool) {
        let outcome = self.outcome(self.state, action);
        self.state = outcome.next_state;
        (outcome.next_state, outcome.reward, outcome.next_state == self.goal())
    }

    fn transition_prob(&self, state: usize, action: usize) -> Option<Vec<Outcome>> {
        if !self.model {
            return None;
        }
        if state == self.goal() {
            return Some(vec![]);
        }
        Some(vec![self.outcome(state, action)])
    }
}
