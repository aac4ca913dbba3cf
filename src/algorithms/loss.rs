//! Actor-critic loss assembly.
//!
//! Loss shapes:
//! - actor: `−mean(log π(a|s) · A) − coef · mean(H)`; advantages enter
//!   detached so no gradient flows from the actor loss into the critic.
//! - critic: `mean((R − V)²) · val_loss_coef`.
//!
//! The tensor functions return single-element 1D tensors for
//! backpropagation; [`extract_scalar`] pulls the value out for logging and
//! the non-finite check.

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{backend::Backend, Tensor};

/// Policy gradient loss with entropy bonus.
///
/// `advantages` must already be detached from the autodiff graph.
pub fn actor_loss<B: AutodiffBackend>(
    log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    entropy: Tensor<B, 1>,
    entropy_coef: f32,
) -> Tensor<B, 1> {
    let policy_term = -(log_probs * advantages).mean();
    policy_term - entropy.mean().mul_scalar(entropy_coef)
}

/// Mean-squared value error scaled by the critic-loss weight.
pub fn critic_loss<B: AutodiffBackend>(
    values: Tensor<B, 1>,
    returns: Tensor<B, 1>,
    val_loss_coef: f32,
) -> Tensor<B, 1> {
    (values - returns).powf_scalar(2.0).mean().mul_scalar(val_loss_coef)
}

/// Scalar value of a single-element loss tensor.
pub fn extract_scalar<B: Backend>(loss: &Tensor<B, 1>) -> f32 {
    loss.clone().into_data().as_slice::<f32>().map(|s| s[0]).unwrap_or(f32::NAN)
}

/// Scalar loss components of one update, for logging and the
/// non-finite check.
#[derive(Debug, Clone, Copy)]
pub struct LossComponents {
    pub actor_loss: f32,
    pub critic_loss: f32,
    pub entropy: f32,
}

impl LossComponents {
    /// False when either loss has gone NaN/Inf; the run must abort rather
    /// than keep training on corrupted parameters.
    pub fn is_finite(&self) -> bool {
        self.actor_loss.is_finite() && self.critic_loss.is_finite()
    }
}
