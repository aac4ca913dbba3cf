//! Categorical policy head.
//!
//! The actor trunk produces unnormalized logits over the discrete action
//! set. This module turns those logits into:
//! - sampled actions with scalar log-probs (rollout collection, detached)
//! - tensor log-probs and entropy (training, gradient flow)

use burn::tensor::backend::Backend;
use burn::tensor::{activation::softmax, Int, Tensor};

/// Actor head output for one batch of observations.
#[derive(Clone)]
pub struct CategoricalOutput<B: Backend> {
    /// Unnormalized log probabilities: [batch, n_actions]
    pub logits: Tensor<B, 2>,
}

impl<B: Backend> CategoricalOutput<B> {
    pub fn new(logits: Tensor<B, 2>) -> Self {
        Self { logits }
    }

    /// Probabilities (softmax of logits).
    pub fn probs(&self) -> Tensor<B, 2> {
        softmax(self.logits.clone(), 1)
    }

    pub fn n_actions(&self) -> usize {
        self.logits.dims()[1]
    }

    pub fn batch_size(&self) -> usize {
        self.logits.dims()[0]
    }

    /// Sample one action per batch item with its log-probability.
    ///
    /// Categorical sampling via cumulative sum; the last action is the
    /// fallback when floating-point error keeps the probabilities from
    /// summing to exactly 1.0.
    pub fn sample(&self) -> (Vec<u32>, Vec<f32>) {
        let probs = self.probs();
        let probs_data = probs.to_data();
        let probs_slice: &[f32] = probs_data.as_slice().expect("contiguous probs buffer");

        let batch_size = self.batch_size();
        let n_actions = self.n_actions();

        let mut actions = Vec::with_capacity(batch_size);
        let mut log_probs = Vec::with_capacity(batch_size);

        for i in 0..batch_size {
            let rand_val = fastrand::f32();
            let mut cumsum = 0.0;
            let mut selected = (n_actions - 1) as u32;

            for a in 0..n_actions {
                cumsum += probs_slice[i * n_actions + a];
                if rand_val < cumsum || a == n_actions - 1 {
                    selected = a as u32;
                    break;
                }
            }

            let prob = probs_slice[i * n_actions + selected as usize];
            actions.push(selected);
            log_probs.push((prob + 1e-8).ln());
        }

        (actions, log_probs)
    }

    /// Log probabilities of the given actions, with gradient flow.
    pub fn log_prob(&self, actions: &[u32], device: &B::Device) -> Tensor<B, 1> {
        let batch_size = actions.len();
        let probs = self.probs();

        let action_indices: Vec<i32> = actions.iter().map(|&a| a as i32).collect();
        let actions_tensor: Tensor<B, 1, Int> =
            Tensor::from_ints(action_indices.as_slice(), device);
        let actions_2d: Tensor<B, 2, Int> = actions_tensor.reshape([batch_size, 1]);

        let selected_probs = probs.gather(1, actions_2d);
        let selected_probs_1d: Tensor<B, 1> = selected_probs.flatten(0, 1);

        // Numerical stability before the log.
        (selected_probs_1d + 1e-8).log()
    }

    /// Per-item entropy `H = −Σ p log p`, with gradient flow.
    pub fn entropy(&self) -> Tensor<B, 1> {
        let probs = self.probs();
        let log_probs = (probs.clone() + 1e-8).log();
        let neg_entropy: Tensor<B, 2> = (probs * log_probs).sum_dim(1);
        -neg_entropy.flatten(0, 1)
    }
}
