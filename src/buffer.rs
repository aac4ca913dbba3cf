//! On-policy rollout accumulation.
//!
//! The buffer holds exactly one rollout: `training_frequency` ticks of N
//! environment transitions each. It is drained once per update and never
//! reused across updates, which is what keeps the data on-policy.

/// One environment transition as recorded during collection.
#[derive(Debug, Clone)]
pub struct TrajectoryStep {
    /// Stacked observation the action was computed from.
    pub observation: Vec<f32>,
    /// Sampled discrete action.
    pub action: u32,
    /// Log-probability of the sampled action under the collecting policy.
    pub log_prob: f32,
    /// Critic value estimate for `observation`.
    pub value: f32,
    /// Reward received for the transition.
    pub reward: f32,
    /// Episode-end flag.
    pub done: bool,
}

/// A drained rollout in time-major interleaved layout.
///
/// Index `t * num_envs + i` addresses tick `t` of slot `i`:
/// `[t0·env0 … t0·envN-1, t1·env0 …]`. All vectors have length
/// `num_ticks * num_envs`; `observations` is additionally flattened by
/// `obs_size`.
#[derive(Debug, Clone)]
pub struct RolloutBatch {
    pub observations: Vec<f32>,
    pub actions: Vec<u32>,
    pub log_probs: Vec<f32>,
    pub values: Vec<f32>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub num_envs: usize,
    pub num_ticks: usize,
    pub obs_size: usize,
}

impl RolloutBatch {
    /// Total number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.num_ticks * self.num_envs
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed-capacity accumulator for one on-policy rollout.
///
/// Capacity is `training_frequency * num_envs`, fixed at construction.
/// Recording into a full buffer and draining a non-ready buffer are
/// contract violations and panic; they indicate a broken collection loop,
/// not a runtime condition.
pub struct OnPolicyBuffer {
    steps: Vec<TrajectoryStep>,
    num_envs: usize,
    num_ticks: usize,
    obs_size: usize,
}

impl OnPolicyBuffer {
    /// # Panics
    ///
    /// Panics if any dimension is zero.
    pub fn new(training_frequency: usize, num_envs: usize, obs_size: usize) -> Self {
        assert!(training_frequency > 0, "training_frequency must be positive");
        assert!(num_envs > 0, "num_envs must be positive");
        assert!(obs_size > 0, "obs_size must be positive");
        let num_ticks = training_frequency;
        Self {
            steps: Vec::with_capacity(num_ticks * num_envs),
            num_envs,
            num_ticks,
            obs_size,
        }
    }

    /// Capacity in transitions.
    pub fn capacity(&self) -> usize {
        self.num_ticks * self.num_envs
    }

    /// Transitions recorded so far in the current rollout.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether a full rollout has been accumulated.
    pub fn is_ready(&self) -> bool {
        self.steps.len() == self.capacity()
    }

    /// Record one tick: exactly one transition per environment slot, in
    /// slot order.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is already full, the tick width differs from
    /// the pool width, or an observation has the wrong size.
    pub fn record(&mut self, tick: Vec<TrajectoryStep>) {
        assert!(!self.is_ready(), "record into a full rollout buffer");
        assert_eq!(tick.len(), self.num_envs, "tick width must equal pool width");
        for step in &tick {
            assert_eq!(
                step.observation.len(),
                self.obs_size,
                "observation size mismatch"
            );
        }
        self.steps.extend(tick);
    }

    /// Drain the completed rollout, leaving the buffer empty.
    ///
    /// # Panics
    ///
    /// Panics if the rollout is incomplete.
    pub fn drain(&mut self) -> RolloutBatch {
        assert!(self.is_ready(), "drain of an incomplete rollout buffer");

        let count = self.steps.len();
        let mut observations = Vec::with_capacity(count * self.obs_size);
        let mut actions = Vec::with_capacity(count);
        let mut log_probs = Vec::with_capacity(count);
        let mut values = Vec::with_capacity(count);
        let mut rewards = Vec::with_capacity(count);
        let mut dones = Vec::with_capacity(count);

        for step in self.steps.drain(..) {
            observations.extend_from_slice(&step.observation);
            actions.push(step.action);
            log_probs.push(step.log_prob);
            values.push(step.value);
            rewards.push(step.reward);
            dones.push(step.done);
        }

        RolloutBatch {
            observations,
            actions,
            log_probs,
            values,
            rewards,
            dones,
            num_envs: self.num_envs,
            num_ticks: self.num_ticks,
            obs_size: self.obs_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(n: usize, base: f32) -> Vec<TrajectoryStep> {
        (0..n)
            .map(|i| TrajectoryStep {
                observation: vec![base + i as f32],
                action: i as u32,
                log_prob: -0.5,
                value: 0.1,
                reward: base,
                done: false,
            })
            .collect()
    }

    #[test]
    fn ready_exactly_at_capacity() {
        let mut buffer = OnPolicyBuffer::new(3, 2, 1);
        for t in 0..3 {
            assert!(!buffer.is_ready());
            buffer.record(tick(2, t as f32));
        }
        assert!(buffer.is_ready());
    }

    #[test]
    fn drain_is_time_major_interleaved() {
        let mut buffer = OnPolicyBuffer::new(2, 2, 1);
        buffer.record(tick(2, 10.0));
        buffer.record(tick(2, 20.0));

        let batch = buffer.drain();
        // [t0·env0, t0·env1, t1·env0, t1·env1]
        assert_eq!(batch.observations, vec![10.0, 11.0, 20.0, 21.0]);
        assert_eq!(batch.rewards, vec![10.0, 10.0, 20.0, 20.0]);
        assert_eq!(batch.len(), 4);
        assert!(buffer.is_empty());
    }

    #[test]
    #[should_panic(expected = "full rollout buffer")]
    fn record_into_full_buffer_panics() {
        let mut buffer = OnPolicyBuffer::new(1, 1, 1);
        buffer.record(tick(1, 0.0));
        buffer.record(tick(1, 1.0));
    }

    #[test]
    #[should_panic(expected = "incomplete rollout buffer")]
    fn drain_of_incomplete_buffer_panics() {
        let mut buffer = OnPolicyBuffer::new(2, 1, 1);
        buffer.record(tick(1, 0.0));
        buffer.drain();
    }

    #[test]
    fn buffer_is_reusable_after_drain() {
        let mut buffer = OnPolicyBuffer::new(1, 1, 1);
        buffer.record(tick(1, 1.0));
        let first = buffer.drain();
        buffer.record(tick(1, 2.0));
        let second = buffer.drain();
        assert_eq!(first.observations, vec![1.0]);
        assert_eq!(second.observations, vec![2.0]);
    }
}
