/// One entry of a transition distribution: landing in `next_state` with probability `prob`
/// and receiving `reward`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub next_state: usize,
    pub prob: f64,
    pub reward: f64,
}

impl Outcome {
    pub fn new(next_state: usize, prob: f64, reward: f64) -> Self {
        Self {
            next_state,
            prob,
            reward,
        }
    }
}

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// States and actions are dense integer indices in `[0, state_space_size())` and
/// `[0, action_space_size())`. Both sizes must stay fixed for the lifetime of the environment.
pub trait Environment {
    /// Number of states
    fn state_space_size(&self) -> usize;

    /// Number of actions
    fn action_space_size(&self) -> usize;

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> usize;

    /// Update the environment in response to an action taken by an agent
    ///
    /// **Returns** `(next_state, reward, done)`
    fn step(&mut self, action: usize) -> (usize, f64, bool);

    /// Transition distribution for taking `action` in `state`
    ///
    /// Model-free environments keep the default, which returns `None`. A model-based environment
    /// returns `Some`, with an empty list for terminal states and unavailable actions.
    fn transition_prob(&self, _state: usize, _action: usize) -> Option<Vec<Outcome>> {
        None
    }
}

/// Represents a single transition in the environment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// The state of the environment before taking the action
    pub state: usize,
    /// The action taken in the given state
    pub action: usize,
    /// The reward received after taking the action
    pub reward: f64,
    /// The state of the environment after the action is taken
    pub next_state: usize,
    /// Whether `next_state` is terminal
    pub done: bool,
}
