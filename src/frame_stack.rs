//! Per-slot observation frame stacking.
//!
//! Maintains a rolling window of the last K raw observations for each
//! environment slot and exposes the concatenated window as the network
//! input. With `frame_op` disabled the stacker degenerates to a window of
//! length one (identity).

use std::collections::VecDeque;

use crate::config::FrameOp;

/// Rolling observation windows, one per environment slot.
///
/// The only supported combine operator is concatenation: the stacked
/// observation is `obs[t-K+1] ++ … ++ obs[t]`, oldest first. At episode
/// start the window is cold: it is filled by replicating the first raw
/// observation K times, so the stacked size is constant from the first
/// frame.
pub struct FrameStacker {
    windows: Vec<VecDeque<Vec<f32>>>,
    obs_size: usize,
    stack_len: usize,
}

impl FrameStacker {
    /// Build a stacker for `num_envs` slots with window length `stack_len`.
    ///
    /// `op` is validated upstream; it is accepted here to keep the closed
    /// enum on the construction path.
    ///
    /// # Panics
    ///
    /// Panics if `num_envs`, `obs_size`, or `stack_len` is zero.
    pub fn new(_op: FrameOp, num_envs: usize, obs_size: usize, stack_len: usize) -> Self {
        assert!(num_envs > 0, "FrameStacker requires at least one slot");
        assert!(obs_size > 0, "observation size must be positive");
        assert!(stack_len > 0, "stack length must be positive");
        Self {
            windows: vec![VecDeque::with_capacity(stack_len); num_envs],
            obs_size,
            stack_len,
        }
    }

    /// Stacked observation size (`obs_size * stack_len`).
    pub fn stacked_size(&self) -> usize {
        self.obs_size * self.stack_len
    }

    /// Reset one slot's window with the episode's first observation,
    /// replicated across the whole window.
    ///
    /// # Panics
    ///
    /// Panics on slot index or observation size mismatch.
    pub fn reset_slot(&mut self, slot: usize, observation: &[f32]) {
        assert_eq!(observation.len(), self.obs_size, "observation size mismatch");
        let window = &mut self.windows[slot];
        window.clear();
        for _ in 0..self.stack_len {
            window.push_back(observation.to_vec());
        }
    }

    /// Reset every slot from a batch of initial observations.
    pub fn reset_all(&mut self, observations: &[Vec<f32>]) {
        assert_eq!(observations.len(), self.windows.len(), "batch width mismatch");
        for (slot, obs) in observations.iter().enumerate() {
            self.reset_slot(slot, obs);
        }
    }

    /// Push a new raw observation into one slot's window, evicting the
    /// oldest frame.
    pub fn push(&mut self, slot: usize, observation: &[f32]) {
        assert_eq!(observation.len(), self.obs_size, "observation size mismatch");
        let window = &mut self.windows[slot];
        debug_assert_eq!(window.len(), self.stack_len, "window used before reset");
        window.pop_front();
        window.push_back(observation.to_vec());
    }

    /// Concatenated window for one slot, oldest frame first.
    pub fn stacked(&self, slot: usize) -> Vec<f32> {
        let window = &self.windows[slot];
        let mut out = Vec::with_capacity(self.stacked_size());
        for frame in window {
            out.extend_from_slice(frame);
        }
        out
    }

    /// Concatenated windows for all slots, flattened `[n_envs * stacked]`.
    pub fn stacked_batch(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.windows.len() * self.stacked_size());
        for slot in 0..self.windows.len() {
            out.extend(self.stacked(slot));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_replicates_first_observation() {
        let mut stacker = FrameStacker::new(FrameOp::Concat, 1, 2, 3);
        stacker.reset_slot(0, &[1.0, 2.0]);
        assert_eq!(stacker.stacked(0), vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn push_evicts_oldest_frame() {
        let mut stacker = FrameStacker::new(FrameOp::Concat, 1, 1, 3);
        stacker.reset_slot(0, &[0.0]);
        stacker.push(0, &[1.0]);
        stacker.push(0, &[2.0]);
        assert_eq!(stacker.stacked(0), vec![0.0, 1.0, 2.0]);
        stacker.push(0, &[3.0]);
        assert_eq!(stacker.stacked(0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn slots_are_independent() {
        let mut stacker = FrameStacker::new(FrameOp::Concat, 2, 1, 2);
        stacker.reset_all(&[vec![1.0], vec![9.0]]);
        stacker.push(0, &[2.0]);
        assert_eq!(stacker.stacked(0), vec![1.0, 2.0]);
        assert_eq!(stacker.stacked(1), vec![9.0, 9.0]);
        // Episode boundary on slot 1 only.
        stacker.reset_slot(1, &[5.0]);
        assert_eq!(stacker.stacked(0), vec![1.0, 2.0]);
        assert_eq!(stacker.stacked(1), vec![5.0, 5.0]);
    }

    #[test]
    fn batch_layout_is_slot_major() {
        let mut stacker = FrameStacker::new(FrameOp::Concat, 2, 1, 2);
        stacker.reset_all(&[vec![1.0], vec![2.0]]);
        assert_eq!(stacker.stacked_batch(), vec![1.0, 1.0, 2.0, 2.0]);
    }
}
