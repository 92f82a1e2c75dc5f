use rand::Rng;

use super::{Backup, MdpModel, Monitor, StochasticPolicy, SweepStats};
use crate::{config::DpConfig, error::Result};

/// One in-place sweep over all states; returns the largest absolute change
fn sweep(model: &MdpModel, values: &mut [f64], gamma: f64, mode: Backup<'_>) -> Result<f64> {
    let mut delta: f64 = 0.0;
    for state in 0..model.n_states() {
        let new = model.backup(values, gamma, state, mode)?;
        delta = delta.max((values[state] - new).abs());
        values[state] = new;
    }
    Ok(delta)
}

/// Value iteration
///
/// Starts from `V = 0` and repeats [`Backup::Best`] sweeps until the largest change in a sweep
/// drops below `theta`, or until `max_iterations` sweeps have run.
pub fn value_iteration(
    model: &MdpModel,
    config: &DpConfig,
    monitor: &mut Monitor<'_>,
) -> Result<(Vec<f64>, SweepStats)> {
    let mut values = vec![0.0; model.n_states()];
    let mut stats = SweepStats::default();

    while stats.iterations < config.max_iterations {
        monitor.checkpoint()?;
        let delta = sweep(model, &mut values, config.gamma, Backup::Best)?;
        stats.iterations += 1;
        stats.deltas.push(delta);
        log::debug!("Value iteration sweep {}: delta {delta:.3e}", stats.iterations);
        monitor.report(
            100.0 * stats.iterations as f64 / config.max_iterations as f64,
            &[("iteration", stats.iterations as f64), ("delta", delta)],
        );

        if delta < config.theta {
            stats.converged = true;
            break;
        }
    }

    if stats.converged {
        log::info!("Value iteration converged after {} sweeps", stats.iterations);
    } else {
        log::warn!(
            "Value iteration stopped after {} sweeps without reaching theta = {}",
            stats.iterations,
            config.theta
        );
    }
    Ok((values, stats))
}

/// Evaluate `policy` in place, starting from the given `values`
fn evaluate_in_place(
    model: &MdpModel,
    policy: &StochasticPolicy,
    values: &mut [f64],
    config: &DpConfig,
    monitor: &mut Monitor<'_>,
    report: bool,
) -> Result<SweepStats> {
    let mut stats = SweepStats::default();
    while stats.iterations < config.max_iterations {
        monitor.checkpoint()?;
        let delta = sweep(model, values, config.gamma, Backup::Policy(policy))?;
        stats.iterations += 1;
        stats.deltas.push(delta);
        if report {
            monitor.report(
                100.0 * stats.iterations as f64 / config.max_iterations as f64,
                &[("iteration", stats.iterations as f64), ("delta", delta)],
            );
        }
        if delta < config.theta {
            stats.converged = true;
            break;
        }
    }
    if !stats.converged {
        log::warn!(
            "Policy evaluation stopped after {} sweeps without reaching theta = {}",
            stats.iterations,
            config.theta
        );
    }
    Ok(stats)
}

/// Iterative policy evaluation
///
/// Starts from `V = 0` and repeats [`Backup::Policy`] sweeps until the largest change in a sweep
/// drops below `theta`, or until `max_iterations` sweeps have run.
pub fn policy_evaluation(
    model: &MdpModel,
    policy: &StochasticPolicy,
    config: &DpConfig,
    monitor: &mut Monitor<'_>,
) -> Result<(Vec<f64>, SweepStats)> {
    let mut values = vec![0.0; model.n_states()];
    let stats = evaluate_in_place(model, policy, &mut values, config, monitor, true)?;
    log::info!("Policy evaluation finished after {} sweeps", stats.iterations);
    Ok((values, stats))
}

/// Outcome of one greedy improvement step
#[derive(Debug, Clone, PartialEq)]
pub struct Improvement {
    /// Whether no state changed its action
    pub stable: bool,
    /// Largest gap between the best action value and the old action's value
    pub max_delta: f64,
}

/// Make `policy` greedy with respect to `values`
///
/// Every non-terminal state takes its best available action, ties going to the first action
/// seen. Terminal states are left untouched.
pub fn improve_policy(
    model: &MdpModel,
    values: &[f64],
    gamma: f64,
    policy: &mut StochasticPolicy,
) -> Result<Improvement> {
    let mut improvement = Improvement {
        stable: true,
        max_delta: 0.0,
    };

    for state in 0..model.n_states() {
        let Some((best_action, best_value)) = model.greedy(values, gamma, state) else {
            continue;
        };
        let old_action = policy.action(state);
        let old_value = match old_action {
            Some(_) => model.backup(values, gamma, state, Backup::Single(old_action))?,
            None => best_value,
        };
        improvement.max_delta = improvement.max_delta.max((best_value - old_value).abs());

        if old_action != Some(best_action) {
            improvement.stable = false;
        }
        policy.set_action(state, best_action);
    }

    Ok(improvement)
}

/// Policy iteration
///
/// Starts from one uniformly random available action per state and alternates policy
/// evaluation (warm-started from the previous values) with greedy improvement until no state
/// changes its action, or until `max_iterations` rounds have run. `deltas` records each
/// round's [`Improvement::max_delta`].
pub fn policy_iteration<R: Rng + ?Sized>(
    model: &MdpModel,
    config: &DpConfig,
    rng: &mut R,
    monitor: &mut Monitor<'_>,
) -> Result<(Vec<f64>, StochasticPolicy, SweepStats)> {
    let mut policy = StochasticPolicy::random_deterministic(model, rng);
    let mut values = vec![0.0; model.n_states()];
    let mut stats = SweepStats::default();

    while stats.iterations < config.max_iterations {
        monitor.checkpoint()?;
        let evaluation = evaluate_in_place(model, &policy, &mut values, config, monitor, false)?;
        let improvement = improve_policy(model, &values, config.gamma, &mut policy)?;
        stats.iterations += 1;
        stats.deltas.push(improvement.max_delta);
        log::debug!(
            "Policy iteration round {}: {} evaluation sweeps, max delta {:.3e}",
            stats.iterations,
            evaluation.iterations,
            improvement.max_delta
        );
        monitor.report(
            100.0 * stats.iterations as f64 / config.max_iterations as f64,
            &[
                ("iteration", stats.iterations as f64),
                ("delta", improvement.max_delta),
            ],
        );

        if improvement.stable {
            stats.converged = true;
            break;
        }
    }

    if stats.converged {
        log::info!("Policy iteration stable after {} rounds", stats.iterations);
    } else {
        log::warn!(
            "Policy iteration stopped after {} rounds without a stable policy",
            stats.iterations
        );
    }
    Ok((values, policy, stats))
}

/// Greedy policy and action values derived from `values`
///
/// Unavailable actions get `-inf` in the returned table; terminal states map to action 0.
pub fn greedy_tables(
    model: &MdpModel,
    values: &[f64],
    gamma: f64,
) -> Result<(Vec<usize>, super::QTable)> {
    let mut q = super::QTable::new(model.n_states(), model.n_actions());
    let mut policy = vec![0; model.n_states()];
    for state in 0..model.n_states() {
        if model.is_terminal(state) {
            continue;
        }
        for action in 0..model.n_actions() {
            q.set(state, action, f64::NEG_INFINITY);
        }
        for &action in model.available_actions(state) {
            let value = model.backup(values, gamma, state, Backup::Single(Some(action)))?;
            q.set(state, action, value);
        }
        policy[state] = q.greedy_action(state);
    }
    Ok((policy, q))
}
