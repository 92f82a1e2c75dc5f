/// Agents wrapping each algorithm behind one train / act lifecycle
pub mod agent;

/// Tabular solvers: dynamic programming, Monte Carlo, temporal difference, Q-learning
pub mod algo;

/// Hyperparameter configuration
pub mod config;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Data structures
pub mod ds;

/// Environment
pub mod env;

/// Error types
pub mod error;

/// Exploration policies
pub mod exploration;

mod util;

pub use agent::{create_agent, create_agent_by_name, Agent, AgentStatus, Algorithm, TabularAgent};
pub use config::AgentConfig;
pub use env::{Environment, Outcome};
pub use error::{Error, Result};
