use rand::Rng;

use crate::decay::Decay;

/// Exploration policy result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Explore,
    Exploit,
}

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// Epsilon threshold for the given episode
    pub fn epsilon(&self, episode: u32) -> f64 {
        self.epsilon.evaluate(episode as f64)
    }

    /// Invoke epsilon greedy policy for current episode
    pub fn choose<R: Rng + ?Sized>(&self, episode: u32, rng: &mut R) -> Choice {
        choose_with(self.epsilon(episode), rng)
    }

    /// Pick an action: uniformly random over `n_actions` when exploring, `greedy()` otherwise
    pub fn act<R, F>(&self, episode: u32, n_actions: usize, rng: &mut R, greedy: F) -> usize
    where
        R: Rng + ?Sized,
        F: FnOnce() -> usize,
    {
        act_with(self.epsilon(episode), n_actions, rng, greedy)
    }
}

/// Epsilon-greedy decision for a fixed threshold
pub fn choose_with<R: Rng + ?Sized>(epsilon: f64, rng: &mut R) -> Choice {
    if rng.gen::<f64>() < epsilon {
        Choice::Explore
    } else {
        Choice::Exploit
    }
}

/// Epsilon-greedy action for a fixed threshold
pub fn act_with<R, F>(epsilon: f64, n_actions: usize, rng: &mut R, greedy: F) -> usize
where
    R: Rng + ?Sized,
    F: FnOnce() -> usize,
{
    match choose_with(epsilon, rng) {
        Choice::Explore => rng.gen_range(0..n_actions),
        Choice::Exploit => greedy(),
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::decay::Constant;

    #[test]
    fn never_explores_at_zero() {
        let policy = EpsilonGreedy::new(Constant::new(0.0));
        let mut rng = StdRng::seed_from_u64(0);
        for episode in 0..100 {
            assert_eq!(policy.choose(episode, &mut rng), Choice::Exploit);
            assert_eq!(policy.act(episode, 4, &mut rng, || 3), 3);
        }
    }

    #[test]
    fn always_explores_at_one() {
        let policy = EpsilonGreedy::new(Constant::new(1.0));
        let mut rng = StdRng::seed_from_u64(0);
        let actions = (0..200)
            .map(|e| policy.act(e, 3, &mut rng, || unreachable!()))
            .collect::<Vec<_>>();
        assert!(actions.iter().all(|&a| a < 3));
        assert!((0..3).all(|a| actions.contains(&a)), "Every action is sampled");
    }

    #[test]
    fn same_seed_same_choices() {
        let policy = EpsilonGreedy::new(Constant::new(0.5));
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for episode in 0..50 {
            assert_eq!(policy.act(episode, 5, &mut a, || 0), policy.act(episode, 5, &mut b, || 0));
        }
    }
}
