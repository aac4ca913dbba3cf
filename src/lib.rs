//! # vector_rl: Synchronous Vectorized Actor-Critic Training
//!
//! On-policy Actor-Critic (A2C) training engine with Generalized Advantage
//! Estimation over N vectorized environments, built on Burn.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        TrainLoop                           │
//! │                                                            │
//! │  COLLECTING                         UPDATING               │
//! │  ┌──────────────┐  full rollout   ┌───────────────────┐   │
//! │  │ EnvVectorPool│ ──────────────► │ AdvantageEstimator│   │
//! │  │ FrameStacker │                 │ loss assembly     │   │
//! │  │ OnPolicyBuf  │ ◄────────────── │ optimizer step(s) │   │
//! │  └──────────────┘  buffer drained └───────────────────┘   │
//! │                                                            │
//! │  clock ≥ max_frame (checked after any update) ► TERMINATED │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread: collection and updating are mutually
//! exclusive phases, so a sampled action can never observe a
//! partially-applied parameter update.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vector_rl::{ConsoleLogger, EngineConfig, TrainLoop};
//!
//! let config: EngineConfig = serde_json::from_str(&document)?;
//! let mut train = TrainLoop::<B>::new(config, envs, device)?;
//! train.run(&mut ConsoleLogger::new())?;
//! ```

pub mod algorithms;
pub mod buffer;
pub mod config;
pub mod environment;
pub mod error;
pub mod frame_stack;
pub mod metrics;
pub mod nn;
pub mod runner;
pub mod scheduling;

pub use algorithms::{AdvantageEstimator, AdvantageSet, CategoricalOutput, LossComponents};
pub use buffer::{OnPolicyBuffer, RolloutBatch, TrajectoryStep};
pub use config::{
    Activation, AlgorithmConfig, ConfigError, EngineConfig, EntropyCoefSpec, EnvConfig, FrameOp,
    InitFn, MetaConfig, NetConfig, OptimSpec,
};
pub use environment::{EnvError, EnvStep, EnvVectorPool, Environment, StepBatch, TrainingClock};
pub use error::TrainError;
pub use frame_stack::FrameStacker;
pub use metrics::{ConsoleLogger, MetricsLogger, NullLogger, RecentReturns, TrainingSnapshot};
pub use nn::{ActorCriticNet, DenseLayer, HeadOptimizer, MlpNet};
pub use runner::{Phase, TrainLoop};
pub use scheduling::EntropySchedule;
