//! Environment abstraction and vectorized stepping.
//!
//! The engine never sees concrete environment physics; it composes N
//! instances of the per-slot [`Environment`] contract into an
//! [`EnvVectorPool`] that steps them in lockstep. A slot whose episode ends
//! is reset independently and its fresh observation replaces the
//! done-flagged entry in the same batch position, leaving the other slots
//! untouched.

use std::fmt;

/// Error raised by an environment instance.
///
/// Environment faults are fatal to the whole run: mid-episode state cannot
/// be discarded without corrupting the on-policy rollout, so there is no
/// retry path.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvError {
    /// Index of the faulting slot within the pool.
    pub slot: usize,
    /// Fault description.
    pub message: String,
}

impl EnvError {
    pub fn new(slot: usize, message: impl Into<String>) -> Self {
        Self {
            slot,
            message: message.into(),
        }
    }
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "environment slot {}: {}", self.slot, self.message)
    }
}

impl std::error::Error for EnvError {}

/// Result of a single environment step.
#[derive(Debug, Clone)]
pub struct EnvStep {
    /// Next raw observation.
    pub observation: Vec<f32>,
    /// Reward received for the transition.
    pub reward: f32,
    /// Whether the episode ended on this step.
    pub done: bool,
}

/// Per-slot environment contract.
pub trait Environment {
    /// Size of the raw observation vector.
    fn obs_size(&self) -> usize;

    /// Number of discrete actions.
    fn n_actions(&self) -> usize;

    /// Reset the episode and return the initial observation.
    fn reset(&mut self) -> Result<Vec<f32>, EnvError>;

    /// Advance one step with the given discrete action.
    fn step(&mut self, action: u32) -> Result<EnvStep, EnvError>;
}

/// Total environment frames consumed across all slots.
///
/// Owned by the training loop and passed by reference into the pool,
/// never a process-wide global. Monotonically increasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingClock {
    frames: u64,
}

impl TrainingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames consumed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance the clock by `n` frames.
    pub fn advance(&mut self, n: u64) {
        self.frames += n;
    }

    /// Whether the frame budget is exhausted.
    pub fn is_exhausted(&self, max_frame: u64) -> bool {
        self.frames >= max_frame
    }
}

/// Result of stepping the whole pool for one tick.
#[derive(Debug, Clone)]
pub struct StepBatch {
    /// Next raw observations, one per slot. For a done slot this is the
    /// fresh post-reset observation.
    pub observations: Vec<Vec<f32>>,
    /// Rewards received, one per slot.
    pub rewards: Vec<f32>,
    /// Episode-end flags, one per slot (true termination or `max_t`
    /// truncation).
    pub dones: Vec<bool>,
    /// Cumulative returns of episodes that finished on this tick.
    pub finished_returns: Vec<f32>,
}

struct EnvSlot {
    env: Box<dyn Environment>,
    episode_steps: u32,
    episode_return: f32,
}

/// N independent environment instances stepped in lockstep.
pub struct EnvVectorPool {
    slots: Vec<EnvSlot>,
    obs_size: usize,
    n_actions: usize,
    max_t: Option<u32>,
}

impl EnvVectorPool {
    /// Build a pool over the given instances.
    ///
    /// # Panics
    ///
    /// Panics if `envs` is empty or the instances disagree on their
    /// observation/action dimensions.
    pub fn new(envs: Vec<Box<dyn Environment>>, max_t: Option<u32>) -> Self {
        assert!(
            !envs.is_empty(),
            "EnvVectorPool requires at least one environment"
        );
        let obs_size = envs[0].obs_size();
        let n_actions = envs[0].n_actions();
        for (i, env) in envs.iter().enumerate() {
            assert_eq!(
                env.obs_size(),
                obs_size,
                "slot {} observation size mismatch",
                i
            );
            assert_eq!(env.n_actions(), n_actions, "slot {} action count mismatch", i);
        }

        let slots = envs
            .into_iter()
            .map(|env| EnvSlot {
                env,
                episode_steps: 0,
                episode_return: 0.0,
            })
            .collect();

        Self {
            slots,
            obs_size,
            n_actions,
            max_t,
        }
    }

    /// Number of parallel slots.
    pub fn num_envs(&self) -> usize {
        self.slots.len()
    }

    /// Raw observation size of one slot.
    pub fn obs_size(&self) -> usize {
        self.obs_size
    }

    /// Number of discrete actions.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Reset every slot and return the batch of initial observations.
    pub fn reset(&mut self) -> Result<Vec<Vec<f32>>, EnvError> {
        let mut observations = Vec::with_capacity(self.slots.len());
        for slot in &mut self.slots {
            slot.episode_steps = 0;
            slot.episode_return = 0.0;
            observations.push(slot.env.reset()?);
        }
        Ok(observations)
    }

    /// Step all slots with one action each and advance the clock by N.
    ///
    /// A slot reporting done (or hitting the `max_t` episode cap) is reset
    /// within the same call; its position in the returned batch carries the
    /// fresh observation while `dones` still flags the boundary.
    ///
    /// # Panics
    ///
    /// Panics if `actions.len()` differs from the pool width.
    pub fn step(
        &mut self,
        actions: &[u32],
        clock: &mut TrainingClock,
    ) -> Result<StepBatch, EnvError> {
        assert_eq!(
            actions.len(),
            self.slots.len(),
            "action batch width must equal pool width"
        );

        let n = self.slots.len();
        let mut observations = Vec::with_capacity(n);
        let mut rewards = Vec::with_capacity(n);
        let mut dones = Vec::with_capacity(n);
        let mut finished_returns = Vec::new();

        for (i, slot) in self.slots.iter_mut().enumerate() {
            let step = slot.env.step(actions[i])?;
            slot.episode_steps += 1;
            slot.episode_return += step.reward;

            let truncated = self
                .max_t
                .map(|cap| slot.episode_steps >= cap)
                .unwrap_or(false);
            let done = step.done || truncated;

            rewards.push(step.reward);
            dones.push(done);

            if done {
                finished_returns.push(slot.episode_return);
                slot.episode_steps = 0;
                slot.episode_return = 0.0;
                observations.push(slot.env.reset()?);
            } else {
                observations.push(step.observation);
            }
        }

        clock.advance(n as u64);

        Ok(StepBatch {
            observations,
            rewards,
            dones,
            finished_returns,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic scripted environment: reward follows a fixed cycle,
    /// the observation encodes the in-episode step count, and the episode
    /// ends every `episode_len` steps.
    pub struct ScriptedEnv {
        pub rewards: Vec<f32>,
        pub episode_len: u32,
        pub step_count: u32,
        pub total_steps: u64,
        pub fail_on_step: Option<u64>,
    }

    impl ScriptedEnv {
        pub fn new(rewards: Vec<f32>, episode_len: u32) -> Self {
            Self {
                rewards,
                episode_len,
                step_count: 0,
                total_steps: 0,
                fail_on_step: None,
            }
        }

        fn observation(&self) -> Vec<f32> {
            let t = self.step_count as f32;
            vec![t, t * 0.5, 1.0]
        }
    }

    impl Environment for ScriptedEnv {
        fn obs_size(&self) -> usize {
            3
        }

        fn n_actions(&self) -> usize {
            2
        }

        fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
            self.step_count = 0;
            Ok(self.observation())
        }

        fn step(&mut self, _action: u32) -> Result<EnvStep, EnvError> {
            if let Some(fail_at) = self.fail_on_step {
                if self.total_steps >= fail_at {
                    return Err(EnvError::new(0, "scripted fault"));
                }
            }
            let reward = self.rewards[(self.total_steps as usize) % self.rewards.len()];
            self.step_count += 1;
            self.total_steps += 1;
            let done = self.step_count >= self.episode_len;
            Ok(EnvStep {
                observation: self.observation(),
                reward,
                done,
            })
        }
    }
}
