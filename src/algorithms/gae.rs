//! Advantage estimation over collected rollouts.
//!
//! Two estimators are provided, selected once at construction and never
//! combined:
//!
//! - Generalized Advantage Estimation, a family of policy gradient
//!   estimators parameterized by λ:
//!   - λ = 0: one-step TD (low variance, high bias)
//!   - λ = 1: Monte Carlo (high variance, low bias)
//!   - λ ∈ (0, 1): interpolation
//! - Fixed-horizon n-step bootstrapped returns with advantage
//!   `R_t − V(s_t)`.
//!
//! Both truncate bootstrapping at episode boundaries via the done mask:
//! no value estimate ever leaks across a terminal transition.
//!
//! ## GAE formula
//!
//! A_t = Σ_{l=0}^{∞} (γλ)^l δ_{t+l}
//! where δ_t = r_t + γ V(s_{t+1}) - V(s_t)
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

use crate::config::AlgorithmConfig;

/// Advantages and returns for one rollout, same layout as the inputs.
#[derive(Debug, Clone)]
pub struct AdvantageSet {
    pub advantages: Vec<f32>,
    pub returns: Vec<f32>,
}

/// Rollout advantage estimator. Exactly one mode is active per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdvantageEstimator {
    Gae { gamma: f32, lam: f32 },
    NStep { gamma: f32, n: usize },
}

impl AdvantageEstimator {
    /// Select the estimator from the algorithm group: `num_step_returns`
    /// present chooses the fixed-horizon mode (`lam` is ignored), absent
    /// chooses GAE.
    pub fn from_config(config: &AlgorithmConfig) -> Self {
        match config.num_step_returns {
            Some(n) => AdvantageEstimator::NStep {
                gamma: config.gamma,
                n,
            },
            None => AdvantageEstimator::Gae {
                gamma: config.gamma,
                lam: config.lam,
            },
        }
    }

    /// Compute advantages and returns over a time-major interleaved
    /// rollout: index `t * num_envs + i` addresses tick `t` of slot `i`.
    ///
    /// `last_values` are the bootstrap value estimates for each slot's
    /// successor observation, one per slot.
    pub fn estimate(
        &self,
        rewards: &[f32],
        values: &[f32],
        dones: &[bool],
        last_values: &[f32],
        num_envs: usize,
    ) -> AdvantageSet {
        let total = rewards.len();
        assert_eq!(values.len(), total);
        assert_eq!(dones.len(), total);
        assert_eq!(last_values.len(), num_envs);
        assert!(num_envs > 0 && total % num_envs == 0);

        let num_ticks = total / num_envs;
        let mut advantages = vec![0.0f32; total];
        let mut returns = vec![0.0f32; total];

        for env in 0..num_envs {
            let env_rewards: Vec<f32> = (0..num_ticks)
                .map(|t| rewards[t * num_envs + env])
                .collect();
            let env_values: Vec<f32> = (0..num_ticks)
                .map(|t| values[t * num_envs + env])
                .collect();
            let env_dones: Vec<bool> = (0..num_ticks)
                .map(|t| dones[t * num_envs + env])
                .collect();

            let (env_adv, env_ret) = match *self {
                AdvantageEstimator::Gae { gamma, lam } => {
                    compute_gae(&env_rewards, &env_values, &env_dones, last_values[env], gamma, lam)
                }
                AdvantageEstimator::NStep { gamma, n } => {
                    compute_n_step(&env_rewards, &env_values, &env_dones, last_values[env], gamma, n)
                }
            };

            for t in 0..num_ticks {
                advantages[t * num_envs + env] = env_adv[t];
                returns[t * num_envs + env] = env_ret[t];
            }
        }

        AdvantageSet {
            advantages,
            returns,
        }
    }
}

/// GAE over a single slot's trajectory.
///
/// Reverse recursion:
/// `δ_t = r_t + γ·V(s_{t+1})·mask_t − V(s_t)`,
/// `A_t = δ_t + γλ·mask_t·A_{t+1}`, `R_t = A_t + V(s_t)`,
/// where `mask_t = 0` when `dones[t]`.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    lam: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    assert_eq!(values.len(), n);
    assert_eq!(dones.len(), n);

    let mut advantages = vec![0.0f32; n];
    let mut returns = vec![0.0f32; n];

    let mut gae = 0.0f32;
    let mut next_value = last_value;

    for t in (0..n).rev() {
        let not_done = if dones[t] { 0.0 } else { 1.0 };

        let delta = rewards[t] + gamma * next_value * not_done - values[t];
        gae = delta + gamma * lam * not_done * gae;

        advantages[t] = gae;
        returns[t] = gae + values[t];

        next_value = values[t];
    }

    (advantages, returns)
}

/// Fixed-horizon n-step returns over a single slot's trajectory.
///
/// `R_t = Σ_{l=0}^{k-1} γ^l r_{t+l} + γ^k V(s_{t+k})`, where the sum stops
/// early (`k < n`, no bootstrap) when a done flag is hit, and the bootstrap
/// value past the rollout end is `last_value`. Advantage is `R_t − V(s_t)`.
pub fn compute_n_step(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    n: usize,
) -> (Vec<f32>, Vec<f32>) {
    let len = rewards.len();
    assert_eq!(values.len(), len);
    assert_eq!(dones.len(), len);
    assert!(n > 0, "n-step horizon must be positive");

    let mut advantages = vec![0.0f32; len];
    let mut returns = vec![0.0f32; len];

    for t in 0..len {
        let mut ret = 0.0f32;
        let mut discount = 1.0f32;
        let mut terminated = false;
        let mut next = t;

        for l in 0..n {
            let idx = t + l;
            if idx >= len {
                break;
            }
            ret += discount * rewards[idx];
            discount *= gamma;
            next = idx + 1;
            if dones[idx] {
                terminated = true;
                break;
            }
        }

        if !terminated {
            let bootstrap = if next < len { values[next] } else { last_value };
            ret += discount * bootstrap;
        }

        returns[t] = ret;
        advantages[t] = ret - values[t];
    }

    (advantages, returns)
}
