//! Network components: dense trunks, initialization, and optimizer
//! construction.
//!
//! # Modules
//!
//! - [`init`]: orthogonal (Gram-Schmidt) and Xavier-uniform weight
//!   initialization with activation-derived gains
//! - [`optim`]: per-head optimizer construction with gradient-norm clipping

pub mod init;
pub mod optim;

use burn::module::{Ignored, Module, Param};
use burn::nn::{BatchNorm, BatchNormConfig};
use burn::prelude::*;
use burn::tensor::activation;

use crate::algorithms::policy::CategoricalOutput;
use crate::config::{Activation, NetConfig};

pub use init::{gain_for, generate_orthogonal_weights, generate_xavier_uniform, init_weight};
pub use optim::HeadOptimizer;

/// One dense layer: `y = xWᵀ + b`, with optional batch normalization and
/// activation. The output layer of a trunk carries neither.
#[derive(Module, Debug)]
pub struct DenseLayer<B: Backend> {
    /// Weight matrix of shape [d_output, d_input].
    weight: Param<Tensor<B, 2>>,
    /// Bias of shape [d_output], zero-initialized.
    bias: Param<Tensor<B, 1>>,
    norm: Option<BatchNorm<B, 0>>,
    activation: Option<Ignored<Activation>>,
}

impl<B: Backend> DenseLayer<B> {
    fn new(
        d_input: usize,
        d_output: usize,
        config: &NetConfig,
        hidden: bool,
        device: &B::Device,
    ) -> Self {
        let weight = init_weight::<B>(
            config.init_fn,
            config.hid_layers_activation,
            d_output,
            d_input,
            device,
        );
        let norm = if hidden && config.batch_norm {
            Some(BatchNormConfig::new(d_output).init(device))
        } else {
            None
        };
        let activation = if hidden {
            Some(Ignored(config.hid_layers_activation))
        } else {
            None
        };
        Self {
            weight: Param::from_tensor(weight),
            bias: Param::from_tensor(Tensor::zeros([d_output], device)),
            norm,
            activation,
        }
    }

    /// Forward pass for [batch, d_input] input: linear, then normalization,
    /// then activation.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input.matmul(self.weight.val().transpose()) + self.bias.val().unsqueeze_dim(0);
        if let Some(norm) = &self.norm {
            x = norm.forward(x);
        }
        if let Some(act) = &self.activation {
            x = match act.0 {
                Activation::Relu => activation::relu(x),
                Activation::Tanh => activation::tanh(x),
                Activation::Sigmoid => activation::sigmoid(x),
            };
        }
        x
    }
}

/// Multi-layer perceptron trunk built from the net group's `hid_layers`.
#[derive(Module, Debug)]
pub struct MlpNet<B: Backend> {
    layers: Vec<DenseLayer<B>>,
}

impl<B: Backend> MlpNet<B> {
    /// Build a trunk mapping `in_dim` to `out_dim` through the configured
    /// hidden widths. Hidden layers get normalization and activation; the
    /// output layer gets neither.
    pub fn new(in_dim: usize, out_dim: usize, config: &NetConfig, device: &B::Device) -> Self {
        let mut layers = Vec::with_capacity(config.hid_layers.len() + 1);
        let mut prev = in_dim;
        for &width in &config.hid_layers {
            layers.push(DenseLayer::new(prev, width, config, true, device));
            prev = width;
        }
        layers.push(DenseLayer::new(prev, out_dim, config, false, device));
        Self { layers }
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.layers {
            x = layer.forward(x);
        }
        x
    }
}

/// Actor and critic trunks as one module.
///
/// The two trunks are always independent parameter components; the
/// `shared` flag in the net group only decides whether one optimizer
/// updates both (through the summed loss) or each head has its own.
#[derive(Module, Debug)]
pub struct ActorCriticNet<B: Backend> {
    pub actor: MlpNet<B>,
    pub critic: MlpNet<B>,
}

impl<B: Backend> ActorCriticNet<B> {
    /// Build both trunks for stacked observations of size `obs_size` and a
    /// discrete action set of size `n_actions`.
    pub fn new(
        config: &NetConfig,
        obs_size: usize,
        n_actions: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            actor: MlpNet::new(obs_size, n_actions, config, device),
            critic: MlpNet::new(obs_size, 1, config, device),
        }
    }

    /// Actor head: logits over the action set.
    pub fn forward_actor(&self, observations: Tensor<B, 2>) -> CategoricalOutput<B> {
        CategoricalOutput::new(self.actor.forward(observations))
    }

    /// Critic head: one value estimate per batch item.
    pub fn forward_critic(&self, observations: Tensor<B, 2>) -> Tensor<B, 1> {
        self.critic.forward(observations).flatten(0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InitFn, OptimSpec};
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn net_config() -> NetConfig {
        NetConfig {
            shared: false,
            hid_layers: vec![16, 8],
            hid_layers_activation: Activation::Tanh,
            init_fn: InitFn::Orthogonal,
            batch_norm: false,
            clip_grad_val: Some(0.5),
            actor_optim_spec: OptimSpec::Adam { lr: 3e-4 },
            critic_optim_spec: Some(OptimSpec::Adam { lr: 1e-3 }),
        }
    }

    #[test]
    fn trunk_output_shapes() {
        let device = Default::default();
        let net = ActorCriticNet::<TestBackend>::new(&net_config(), 6, 3, &device);

        let obs = Tensor::zeros([4, 6], &device);
        let logits = net.forward_actor(obs.clone());
        assert_eq!(logits.logits.dims(), [4, 3]);

        let values = net.forward_critic(obs);
        assert_eq!(values.dims(), [4]);
    }

    #[test]
    fn batch_norm_sits_on_hidden_layers_only() {
        let device = Default::default();
        let mut config = net_config();
        config.batch_norm = true;
        let net = MlpNet::<TestBackend>::new(5, 2, &config, &device);

        // Shapes still line up end to end with normalization enabled.
        let out = net.forward(Tensor::random(
            [3, 5],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        ));
        assert_eq!(out.dims(), [3, 2]);
    }

    #[test]
    fn actor_and_critic_parameters_are_disjoint() {
        let device = Default::default();
        let net = ActorCriticNet::<TestBackend>::new(&net_config(), 4, 2, &device);

        // Perturbing the actor must leave critic outputs untouched.
        let obs: Tensor<TestBackend, 2> = Tensor::ones([2, 4], &device);
        let values_before = net.forward_critic(obs.clone()).into_data();

        let mut perturbed = net;
        perturbed.actor = MlpNet::new(4, 2, &net_config(), &device);
        let values_after = perturbed.forward_critic(obs).into_data();

        assert_eq!(
            values_before.as_slice::<f32>().unwrap(),
            values_after.as_slice::<f32>().unwrap()
        );
    }
}
