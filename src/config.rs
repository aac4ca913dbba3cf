//! Configuration wire format for the training engine.
//!
//! The engine is constructed from a nested configuration document with four
//! groups: `algorithm`, `net`, `env`, and `meta`. The document is
//! deserialized once at construction and never mutated afterwards.
//!
//! All "kind" strings from the source format (`MLPNet`, `Adam`, `no_decay`,
//! `concat`) are modeled as closed tagged enums selected at construction,
//! not dynamic name lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration validation error.
///
/// Returned when configuration parameters are invalid or inconsistent.
/// Validation happens before any environment interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter (num_envs, training_frequency, etc.) must be positive.
    InvalidCount {
        field: &'static str,
        value: usize,
    },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// A parameter must be finite.
    NotFinite {
        field: &'static str,
    },
    /// Two parameters are mutually inconsistent.
    Inconsistent {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::NotFinite { field } => {
                write!(f, "{} must be finite", field)
            }
            ConfigError::Inconsistent { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Hidden-layer activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Tanh,
    Sigmoid,
}

/// Named weight-initialization function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitFn {
    /// Orthogonal initialization with activation-derived gain.
    Orthogonal,
    /// Xavier/Glorot uniform initialization.
    XavierUniform,
}

/// Optimizer kind and learning rate for one network head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum OptimSpec {
    #[serde(alias = "Adam")]
    Adam { lr: f64 },
    #[serde(alias = "RMSprop")]
    Rmsprop { lr: f64 },
    #[serde(alias = "SGD")]
    Sgd { lr: f64 },
}

impl OptimSpec {
    /// Learning rate of this spec.
    pub fn lr(&self) -> f64 {
        match self {
            OptimSpec::Adam { lr } | OptimSpec::Rmsprop { lr } | OptimSpec::Sgd { lr } => *lr,
        }
    }
}

/// Entropy-coefficient schedule specification.
///
/// `no_decay` returns `start_val` for every step, the degenerate case of the
/// general linear interpolation where both endpoints coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum EntropyCoefSpec {
    NoDecay {
        start_val: f32,
    },
    LinearDecay {
        start_val: f32,
        end_val: f32,
        start_step: u64,
        end_step: u64,
    },
}

/// Frame-stacking operator. Concatenation along the feature axis is the only
/// supported mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOp {
    Concat,
}

/// Algorithm group: discounting, advantage estimation, loss weights, and
/// the collection cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    /// Discount factor.
    pub gamma: f32,
    /// GAE trace-decay factor.
    pub lam: f32,
    /// Fixed-horizon return mode; `None` means GAE is used exclusively.
    #[serde(default)]
    pub num_step_returns: Option<usize>,
    /// Entropy-schedule rule and endpoints.
    pub entropy_coef_spec: EntropyCoefSpec,
    /// Critic-loss weight.
    pub val_loss_coef: f32,
    /// Per-environment steps collected before each update.
    pub training_frequency: usize,
}

/// Net group: architecture, initialization, clipping, and per-head
/// optimizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetConfig {
    /// When true, one optimizer instance mutates both heads via the summed
    /// loss; when false, each head has its own optimizer. The actor and
    /// critic are independent parameter components either way.
    #[serde(default)]
    pub shared: bool,
    /// Hidden-layer widths for each trunk.
    pub hid_layers: Vec<usize>,
    /// Activation applied after each hidden layer.
    pub hid_layers_activation: Activation,
    /// Weight initialization for all dense layers.
    pub init_fn: InitFn,
    /// Apply batch normalization between hidden layers (before activation).
    #[serde(default)]
    pub batch_norm: bool,
    /// Gradient-norm clip threshold; `None` disables clipping.
    #[serde(default)]
    pub clip_grad_val: Option<f32>,
    /// Actor optimizer.
    pub actor_optim_spec: OptimSpec,
    /// Critic optimizer. Ignored when `shared` is true.
    #[serde(default)]
    pub critic_optim_spec: Option<OptimSpec>,
}

/// Env group: vectorization, stacking, and the termination budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Number of parallel environment instances.
    pub num_envs: usize,
    /// Frame-stacking operator; `None` disables stacking.
    #[serde(default)]
    pub frame_op: Option<FrameOp>,
    /// Window length for frame stacking.
    #[serde(default)]
    pub frame_op_len: Option<usize>,
    /// Total environment frames before the run terminates.
    pub max_frame: u64,
    /// Per-episode step cap (truncation); `None` disables it.
    #[serde(default)]
    pub max_t: Option<u32>,
}

impl EnvConfig {
    /// Effective frame-stack window length (1 when stacking is disabled).
    pub fn stack_len(&self) -> usize {
        match self.frame_op {
            Some(FrameOp::Concat) => self.frame_op_len.unwrap_or(1),
            None => 1,
        }
    }
}

fn default_log_frequency() -> u64 {
    10_000
}

fn default_eval_frequency() -> u64 {
    10_000
}

/// Meta group: orchestration fan-out (external to this core) and snapshot
/// emission cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaConfig {
    /// Sessions per trial. Parsed for round-tripping; orchestration is
    /// external to this engine.
    #[serde(default)]
    pub max_session: u32,
    /// Trials per experiment. Parsed for round-tripping; orchestration is
    /// external to this engine.
    #[serde(default)]
    pub max_trial: u32,
    /// Frames between metric snapshots.
    #[serde(default = "default_log_frequency")]
    pub log_frequency: u64,
    /// Frames between evaluation snapshots.
    #[serde(default = "default_eval_frequency")]
    pub eval_frequency: u64,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            max_session: 1,
            max_trial: 1,
            log_frequency: default_log_frequency(),
            eval_frequency: default_eval_frequency(),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub algorithm: AlgorithmConfig,
    pub net: NetConfig,
    pub env: EnvConfig,
    #[serde(default)]
    pub meta: MetaConfig,
}

impl EngineConfig {
    /// Validate all configuration parameters.
    ///
    /// Returns `Ok(())` if the configuration is valid, or `Err(ConfigError)`
    /// with details about what's invalid. Called at engine construction,
    /// before any environment interaction.
    ///
    /// # Validation Rules
    /// - Count parameters (num_envs, training_frequency, hid_layers widths,
    ///   frame_op_len, num_step_returns when present) must be > 0
    /// - `gamma` and `lam` must be in [0.0, 1.0]
    /// - `val_loss_coef`, learning rates, and `clip_grad_val` must be finite
    ///   and non-negative (clip strictly positive)
    /// - Entropy schedule endpoints must be finite, non-negative, and
    ///   ordered (`end_step >= start_step`)
    pub fn validate(&self) -> Result<(), ConfigError> {
        let algo = &self.algorithm;
        if algo.training_frequency == 0 {
            return Err(ConfigError::InvalidCount {
                field: "algorithm.training_frequency",
                value: 0,
            });
        }
        if !(0.0..=1.0).contains(&algo.gamma) {
            return Err(ConfigError::OutOfRange {
                field: "algorithm.gamma",
                value: algo.gamma as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&algo.lam) {
            return Err(ConfigError::OutOfRange {
                field: "algorithm.lam",
                value: algo.lam as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if let Some(n) = algo.num_step_returns {
            if n == 0 {
                return Err(ConfigError::InvalidCount {
                    field: "algorithm.num_step_returns",
                    value: 0,
                });
            }
        }
        if !algo.val_loss_coef.is_finite() || algo.val_loss_coef < 0.0 {
            return Err(ConfigError::NotFinite {
                field: "algorithm.val_loss_coef",
            });
        }
        validate_entropy_spec(&algo.entropy_coef_spec)?;

        let net = &self.net;
        for &width in &net.hid_layers {
            if width == 0 {
                return Err(ConfigError::InvalidCount {
                    field: "net.hid_layers",
                    value: 0,
                });
            }
        }
        if let Some(clip) = net.clip_grad_val {
            if !clip.is_finite() || clip <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    field: "net.clip_grad_val",
                    value: clip as f64,
                    min: f64::MIN_POSITIVE,
                    max: f64::INFINITY,
                });
            }
        }
        validate_optim_spec("net.actor_optim_spec", &net.actor_optim_spec)?;
        if let Some(spec) = &net.critic_optim_spec {
            validate_optim_spec("net.critic_optim_spec", spec)?;
        }
        if !net.shared && net.critic_optim_spec.is_none() {
            return Err(ConfigError::Inconsistent {
                field: "net.critic_optim_spec",
                reason: "required when net.shared is false",
            });
        }

        let env = &self.env;
        if env.num_envs == 0 {
            return Err(ConfigError::InvalidCount {
                field: "env.num_envs",
                value: 0,
            });
        }
        if env.max_frame == 0 {
            return Err(ConfigError::InvalidCount {
                field: "env.max_frame",
                value: 0,
            });
        }
        match (env.frame_op, env.frame_op_len) {
            (Some(FrameOp::Concat), Some(0)) => {
                return Err(ConfigError::InvalidCount {
                    field: "env.frame_op_len",
                    value: 0,
                });
            }
            (Some(FrameOp::Concat), None) => {
                return Err(ConfigError::Inconsistent {
                    field: "env.frame_op_len",
                    reason: "required when env.frame_op is set",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Inconsistent {
                    field: "env.frame_op",
                    reason: "frame_op_len set without frame_op",
                });
            }
            _ => {}
        }
        if let Some(max_t) = env.max_t {
            if max_t == 0 {
                return Err(ConfigError::InvalidCount {
                    field: "env.max_t",
                    value: 0,
                });
            }
        }

        if self.meta.log_frequency == 0 {
            return Err(ConfigError::InvalidCount {
                field: "meta.log_frequency",
                value: 0,
            });
        }
        if self.meta.eval_frequency == 0 {
            return Err(ConfigError::InvalidCount {
                field: "meta.eval_frequency",
                value: 0,
            });
        }

        Ok(())
    }
}

fn validate_optim_spec(field: &'static str, spec: &OptimSpec) -> Result<(), ConfigError> {
    let lr = spec.lr();
    if !lr.is_finite() || lr <= 0.0 {
        return Err(ConfigError::OutOfRange {
            field,
            value: lr,
            min: f64::MIN_POSITIVE,
            max: f64::INFINITY,
        });
    }
    Ok(())
}

fn validate_entropy_spec(spec: &EntropyCoefSpec) -> Result<(), ConfigError> {
    match spec {
        EntropyCoefSpec::NoDecay { start_val } => {
            if !start_val.is_finite() || *start_val < 0.0 {
                return Err(ConfigError::NotFinite {
                    field: "algorithm.entropy_coef_spec.start_val",
                });
            }
        }
        EntropyCoefSpec::LinearDecay {
            start_val,
            end_val,
            start_step,
            end_step,
        } => {
            if !start_val.is_finite() || *start_val < 0.0 {
                return Err(ConfigError::NotFinite {
                    field: "algorithm.entropy_coef_spec.start_val",
                });
            }
            if !end_val.is_finite() || *end_val < 0.0 {
                return Err(ConfigError::NotFinite {
                    field: "algorithm.entropy_coef_spec.end_val",
                });
            }
            if end_step < start_step {
                return Err(ConfigError::Inconsistent {
                    field: "algorithm.entropy_coef_spec",
                    reason: "end_step must be >= start_step",
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EngineConfig {
        EngineConfig {
            algorithm: AlgorithmConfig {
                gamma: 0.99,
                lam: 0.95,
                num_step_returns: None,
                entropy_coef_spec: EntropyCoefSpec::NoDecay { start_val: 0.01 },
                val_loss_coef: 0.5,
                training_frequency: 32,
            },
            net: NetConfig {
                shared: false,
                hid_layers: vec![64, 64],
                hid_layers_activation: Activation::Relu,
                init_fn: InitFn::Orthogonal,
                batch_norm: false,
                clip_grad_val: Some(0.5),
                actor_optim_spec: OptimSpec::Adam { lr: 3e-4 },
                critic_optim_spec: Some(OptimSpec::Adam { lr: 1e-3 }),
            },
            env: EnvConfig {
                num_envs: 8,
                frame_op: Some(FrameOp::Concat),
                frame_op_len: Some(4),
                max_frame: 1_000_000,
                max_t: None,
            },
            meta: MetaConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn lam_out_of_range_rejected() {
        let mut config = base_config();
        config.algorithm.lam = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "algorithm.lam",
                value: 1.5,
                min: 0.0,
                max: 1.0,
            })
        );
    }

    #[test]
    fn zero_training_frequency_rejected() {
        let mut config = base_config();
        config.algorithm.training_frequency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCount {
                field: "algorithm.training_frequency",
                ..
            })
        ));
    }

    #[test]
    fn zero_num_step_returns_rejected() {
        let mut config = base_config();
        config.algorithm.num_step_returns = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_critic_optimizer_rejected_when_unshared() {
        let mut config = base_config();
        config.net.critic_optim_spec = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Inconsistent { field: "net.critic_optim_spec", .. })
        ));
    }

    #[test]
    fn frame_op_len_without_frame_op_rejected() {
        let mut config = base_config();
        config.env.frame_op = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn stack_len_defaults_to_one_without_frame_op() {
        let mut config = base_config();
        config.env.frame_op = None;
        config.env.frame_op_len = None;
        assert_eq!(config.env.stack_len(), 1);
    }

    #[test]
    fn deserializes_nested_document() {
        let doc = r#"{
            "algorithm": {
                "gamma": 0.99,
                "lam": 0.95,
                "num_step_returns": null,
                "entropy_coef_spec": {
                    "name": "no_decay",
                    "start_val": 0.01,
                    "end_val": 0.01,
                    "start_step": 0,
                    "end_step": 0
                },
                "val_loss_coef": 0.5,
                "training_frequency": 32
            },
            "net": {
                "shared": false,
                "hid_layers": [64, 64],
                "hid_layers_activation": "relu",
                "init_fn": "orthogonal",
                "batch_norm": false,
                "clip_grad_val": 0.5,
                "actor_optim_spec": { "name": "Adam", "lr": 0.0003 },
                "critic_optim_spec": { "name": "RMSprop", "lr": 0.001 }
            },
            "env": {
                "num_envs": 8,
                "frame_op": "concat",
                "frame_op_len": 4,
                "max_frame": 1000000
            },
            "meta": {
                "max_session": 4,
                "max_trial": 1,
                "log_frequency": 20000,
                "eval_frequency": 20000
            }
        }"#;

        let config: EngineConfig = serde_json::from_str(doc).unwrap();
        assert_eq!(config.algorithm.training_frequency, 32);
        assert_eq!(config.net.actor_optim_spec, OptimSpec::Adam { lr: 3e-4 });
        assert_eq!(
            config.net.critic_optim_spec,
            Some(OptimSpec::Rmsprop { lr: 1e-3 })
        );
        assert_eq!(config.env.stack_len(), 4);
        assert_eq!(config.meta.max_session, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn linear_decay_spec_deserializes() {
        let doc = r#"{
            "name": "linear_decay",
            "start_val": 0.1,
            "end_val": 0.01,
            "start_step": 1000,
            "end_step": 50000
        }"#;
        let spec: EntropyCoefSpec = serde_json::from_str(doc).unwrap();
        assert_eq!(
            spec,
            EntropyCoefSpec::LinearDecay {
                start_val: 0.1,
                end_val: 0.01,
                start_step: 1000,
                end_step: 50_000,
            }
        );
    }
}
