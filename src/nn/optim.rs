//! Per-head optimizer construction.
//!
//! Each head's optimizer is built from its `OptimSpec` wire form, with
//! gradient-norm clipping installed at construction via
//! `GradientClippingConfig::Norm` when `clip_grad_val` is set. The
//! learning rate travels with the optimizer so a step only needs the
//! module and its gradients.

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{
    Adam, AdamConfig, GradientsParams, Optimizer, RmsProp, RmsPropConfig, Sgd, SgdConfig,
};
use burn::tensor::backend::AutodiffBackend;

use crate::config::OptimSpec;

/// Concrete optimizer for one parameter component (actor or critic).
pub enum HeadOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    Adam {
        inner: OptimizerAdaptor<Adam, M, B>,
        lr: f64,
    },
    RmsProp {
        inner: OptimizerAdaptor<RmsProp, M, B>,
        lr: f64,
    },
    Sgd {
        inner: OptimizerAdaptor<Sgd<B::InnerBackend>, M, B>,
        lr: f64,
    },
}

impl<M, B> HeadOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    /// Build the optimizer named by the spec, with clipping installed.
    pub fn new(spec: &OptimSpec, clip_grad_val: Option<f32>) -> Self {
        let clipping = clip_grad_val.map(GradientClippingConfig::Norm);
        match *spec {
            OptimSpec::Adam { lr } => HeadOptimizer::Adam {
                inner: AdamConfig::new()
                    .with_epsilon(1e-5)
                    .with_grad_clipping(clipping)
                    .init(),
                lr,
            },
            OptimSpec::Rmsprop { lr } => HeadOptimizer::RmsProp {
                inner: RmsPropConfig::new().with_grad_clipping(clipping).init(),
                lr,
            },
            OptimSpec::Sgd { lr } => HeadOptimizer::Sgd {
                inner: SgdConfig::new().with_gradient_clipping(clipping).init(),
                lr,
            },
        }
    }

    /// Configured learning rate.
    pub fn lr(&self) -> f64 {
        match self {
            HeadOptimizer::Adam { lr, .. }
            | HeadOptimizer::RmsProp { lr, .. }
            | HeadOptimizer::Sgd { lr, .. } => *lr,
        }
    }

    /// Apply one optimization step and return the updated module.
    pub fn step(&mut self, module: M, grads: GradientsParams) -> M {
        match self {
            HeadOptimizer::Adam { inner, lr } => inner.step(*lr, module, grads),
            HeadOptimizer::RmsProp { inner, lr } => inner.step(*lr, module, grads),
            HeadOptimizer::Sgd { inner, lr } => inner.step(*lr, module, grads),
        }
    }
}
