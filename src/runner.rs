//! Synchronous training loop.
//!
//! One `TrainLoop` owns everything a run needs: the model, per-head
//! optimizers, the environment pool, the frame stacker, the rollout
//! buffer, the advantage estimator, the entropy schedule, and the clock.
//! Collection and updating are phases of a single thread, never
//! concurrent, so no action can be sampled from partially-applied
//! parameters.
//!
//! Per tick: forward on the inner (non-autodiff) backend via
//! `model.valid()` → sample actions → step the pool → refresh the frame
//! windows → record the transitions. When the rollout is full the loop
//! switches to updating: bootstrap values from the successor
//! observations, advantage estimation, loss assembly, one optimizer step
//! per head (or one over both when `shared`), buffer drained. The
//! frame-budget check runs after any update triggered by the same tick,
//! so a rollout completed on the final frame is still consumed.

use burn::module::AutodiffModule;
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

use crate::algorithms::{
    actor_loss, critic_loss, extract_scalar, AdvantageEstimator, LossComponents,
};
use crate::buffer::{OnPolicyBuffer, RolloutBatch, TrajectoryStep};
use crate::config::{ConfigError, EngineConfig, FrameOp};
use crate::environment::{EnvVectorPool, Environment, TrainingClock};
use crate::error::TrainError;
use crate::frame_stack::FrameStacker;
use crate::metrics::{MetricsLogger, RecentReturns, TrainingSnapshot};
use crate::nn::{ActorCriticNet, HeadOptimizer, MlpNet};
use crate::scheduling::EntropySchedule;

/// Control-loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Updating,
    Terminated,
}

enum Optimizers<B: AutodiffBackend> {
    /// One optimizer over both heads, stepped with the summed loss.
    Shared(HeadOptimizer<ActorCriticNet<B>, B>),
    /// Independent optimizers, one backward and step per head.
    Separate {
        actor: HeadOptimizer<MlpNet<B>, B>,
        critic: HeadOptimizer<MlpNet<B>, B>,
    },
}

/// Synchronous vectorized actor-critic training loop.
pub struct TrainLoop<B: AutodiffBackend> {
    config: EngineConfig,
    model: ActorCriticNet<B>,
    optimizers: Optimizers<B>,
    pool: EnvVectorPool,
    stacker: FrameStacker,
    buffer: OnPolicyBuffer,
    estimator: AdvantageEstimator,
    schedule: EntropySchedule,
    clock: TrainingClock,
    phase: Phase,
    returns: RecentReturns,
    updates: u64,
    last_log_frame: u64,
    last_eval_frame: u64,
    stacked_size: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> TrainLoop<B> {
    /// Validate the configuration, build every component, and reset the
    /// pool so the loop is ready to run.
    pub fn new(
        config: EngineConfig,
        envs: Vec<Box<dyn Environment>>,
        device: B::Device,
    ) -> Result<Self, TrainError> {
        config.validate()?;

        let mut pool = EnvVectorPool::new(envs, config.env.max_t);
        let stack_len = config.env.stack_len();
        let mut stacker = FrameStacker::new(
            config.env.frame_op.unwrap_or(FrameOp::Concat),
            pool.num_envs(),
            pool.obs_size(),
            stack_len,
        );
        let stacked_size = stacker.stacked_size();

        let model = ActorCriticNet::new(&config.net, stacked_size, pool.n_actions(), &device);

        let clip = config.net.clip_grad_val;
        let optimizers = if config.net.shared {
            Optimizers::Shared(HeadOptimizer::new(&config.net.actor_optim_spec, clip))
        } else {
            let critic_spec = config.net.critic_optim_spec.clone().ok_or(
                ConfigError::Inconsistent {
                    field: "net.critic_optim_spec",
                    reason: "required when net.shared is false",
                },
            )?;
            Optimizers::Separate {
                actor: HeadOptimizer::new(&config.net.actor_optim_spec, clip),
                critic: HeadOptimizer::new(&critic_spec, clip),
            }
        };

        let buffer = OnPolicyBuffer::new(
            config.algorithm.training_frequency,
            pool.num_envs(),
            stacked_size,
        );
        let estimator = AdvantageEstimator::from_config(&config.algorithm);
        let schedule = EntropySchedule::from_spec(&config.algorithm.entropy_coef_spec);

        let clock = TrainingClock::new();
        let initial = pool.reset()?;
        stacker.reset_all(&initial);

        Ok(Self {
            config,
            model,
            optimizers,
            pool,
            stacker,
            buffer,
            estimator,
            schedule,
            clock,
            phase: Phase::Collecting,
            returns: RecentReturns::new(),
            updates: 0,
            last_log_frame: 0,
            last_eval_frame: 0,
            stacked_size,
            device,
        })
    }

    /// Run until the frame budget is exhausted.
    pub fn run(&mut self, logger: &mut dyn MetricsLogger) -> Result<(), TrainError> {
        while self.phase != Phase::Terminated {
            self.tick(logger)?;
        }
        logger.flush();
        log::info!(
            "run terminated at frame {} after {} updates",
            self.clock.frames(),
            self.updates
        );
        Ok(())
    }

    /// One collection tick, plus the update it completes if any.
    pub fn tick(&mut self, logger: &mut dyn MetricsLogger) -> Result<(), TrainError> {
        debug_assert_eq!(self.phase, Phase::Collecting);

        let n = self.pool.num_envs();
        let obs_vec = self.stacker.stacked_batch();

        // Inference on the inner backend: no autodiff graph is built
        // during collection.
        let valid = self.model.valid();
        let obs: Tensor<B::InnerBackend, 2> =
            Tensor::<B::InnerBackend, 1>::from_floats(obs_vec.as_slice(), &self.device)
                .reshape([n, self.stacked_size]);
        let policy = valid.forward_actor(obs.clone());
        let (actions, log_probs) = policy.sample();
        let values_data = valid.forward_critic(obs).into_data();
        let values: &[f32] = values_data.as_slice().expect("contiguous value buffer");

        let batch = self.pool.step(&actions, &mut self.clock)?;

        let tick: Vec<TrajectoryStep> = (0..n)
            .map(|i| TrajectoryStep {
                observation: obs_vec[i * self.stacked_size..(i + 1) * self.stacked_size].to_vec(),
                action: actions[i],
                log_prob: log_probs[i],
                value: values[i],
                reward: batch.rewards[i],
                done: batch.dones[i],
            })
            .collect();
        self.buffer.record(tick);

        // Successor windows: an episode boundary re-primes the slot's
        // window from the fresh observation.
        for i in 0..n {
            if batch.dones[i] {
                self.stacker.reset_slot(i, &batch.observations[i]);
            } else {
                self.stacker.push(i, &batch.observations[i]);
            }
        }
        for episode_return in batch.finished_returns {
            self.returns.push(episode_return);
        }

        if self.buffer.is_ready() {
            self.phase = Phase::Updating;
            let components = self.update()?;

            // Snapshots go out on the configured frame cadences, not per
            // update.
            let frames = self.clock.frames();
            let log_due = frames - self.last_log_frame >= self.config.meta.log_frequency;
            let eval_due = frames - self.last_eval_frame >= self.config.meta.eval_frequency;
            if log_due || eval_due {
                let snapshot = TrainingSnapshot::new(
                    frames,
                    self.updates,
                    self.returns.episodes(),
                    self.returns.mean(),
                )
                .with_losses(
                    components.actor_loss,
                    components.critic_loss,
                    components.entropy,
                )
                .with_entropy_coef(self.schedule.coefficient(frames));
                logger.log(&snapshot);
                if log_due {
                    self.last_log_frame = frames;
                }
                if eval_due {
                    self.last_eval_frame = frames;
                }
            }

            if !components.is_finite() {
                return Err(TrainError::NonFiniteLoss {
                    actor_loss: components.actor_loss,
                    critic_loss: components.critic_loss,
                    frame: self.clock.frames(),
                });
            }
        }

        // Budget check last: a rollout completed on the final frame has
        // already been consumed above.
        self.phase = if self.clock.is_exhausted(self.config.env.max_frame) {
            Phase::Terminated
        } else {
            Phase::Collecting
        };

        Ok(())
    }

    /// Drain the rollout, estimate advantages, and apply one optimizer
    /// step per head.
    fn update(&mut self) -> Result<LossComponents, TrainError> {
        let rollout = self.buffer.drain();

        // Bootstrap values for each slot's successor observation. Done
        // slots hold post-reset windows, but the done mask zeroes their
        // bootstrap term anyway.
        let n = self.pool.num_envs();
        let successor_vec = self.stacker.stacked_batch();
        let valid = self.model.valid();
        let successor: Tensor<B::InnerBackend, 2> =
            Tensor::<B::InnerBackend, 1>::from_floats(successor_vec.as_slice(), &self.device)
                .reshape([n, self.stacked_size]);
        let last_values_data = valid.forward_critic(successor).into_data();
        let last_values: &[f32] = last_values_data
            .as_slice()
            .expect("contiguous value buffer");

        let advantage_set = self.estimator.estimate(
            &rollout.rewards,
            &rollout.values,
            &rollout.dones,
            last_values,
            n,
        );

        let components = self.optimize(&rollout, &advantage_set.advantages, &advantage_set.returns);

        self.updates += 1;

        Ok(components)
    }

    /// Training forwards on the autodiff backend, loss assembly, and the
    /// optimizer step(s).
    fn optimize(&mut self, rollout: &RolloutBatch, advantages: &[f32], returns: &[f32]) -> LossComponents {
        let count = rollout.len();
        let obs: Tensor<B, 2> =
            Tensor::<B, 1>::from_floats(rollout.observations.as_slice(), &self.device)
                .reshape([count, self.stacked_size]);

        let policy = self.model.forward_actor(obs.clone());
        let log_probs = policy.log_prob(&rollout.actions, &self.device);
        let entropy = policy.entropy();
        let values = self.model.forward_critic(obs);

        // Advantage and return targets enter as fresh tensors, so the
        // actor loss cannot backpropagate into the critic.
        let advantages_t: Tensor<B, 1> = Tensor::from_floats(advantages, &self.device);
        let returns_t: Tensor<B, 1> = Tensor::from_floats(returns, &self.device);

        let coef = self.schedule.coefficient(self.clock.frames());
        let a_loss = actor_loss(log_probs, advantages_t, entropy.clone(), coef);
        let c_loss = critic_loss(values, returns_t, self.config.algorithm.val_loss_coef);

        let components = LossComponents {
            actor_loss: extract_scalar(&a_loss),
            critic_loss: extract_scalar(&c_loss),
            entropy: extract_scalar(&entropy.mean()),
        };

        match &mut self.optimizers {
            Optimizers::Shared(opt) => {
                let total = a_loss + c_loss;
                let grads = GradientsParams::from_grads(total.backward(), &self.model);
                self.model = opt.step(self.model.clone(), grads);
            }
            Optimizers::Separate { actor, critic } => {
                let actor_grads = GradientsParams::from_grads(a_loss.backward(), &self.model.actor);
                self.model.actor = actor.step(self.model.actor.clone(), actor_grads);

                let critic_grads =
                    GradientsParams::from_grads(c_loss.backward(), &self.model.critic);
                self.model.critic = critic.step(self.model.critic.clone(), critic_grads);
            }
        }

        components
    }

    /// Current control-loop phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Frames consumed so far.
    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }

    /// Updates applied so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Transitions waiting in the rollout buffer.
    pub fn pending_transitions(&self) -> usize {
        self.buffer.len()
    }

    /// The trained model.
    pub fn model(&self) -> &ActorCriticNet<B> {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Activation, AlgorithmConfig, EntropyCoefSpec, EnvConfig, InitFn, MetaConfig, NetConfig,
        OptimSpec,
    };
    use crate::environment::testing::ScriptedEnv;
    use crate::metrics::NullLogger;
    use burn::backend::{Autodiff, NdArray};

    type TB = Autodiff<NdArray<f32>>;

    fn base_config(num_envs: usize, training_frequency: usize, max_frame: u64) -> EngineConfig {
        EngineConfig {
            algorithm: AlgorithmConfig {
                gamma: 0.99,
                lam: 0.95,
                num_step_returns: None,
                entropy_coef_spec: EntropyCoefSpec::NoDecay { start_val: 0.01 },
                val_loss_coef: 0.5,
                training_frequency,
            },
            net: NetConfig {
                shared: false,
                hid_layers: vec![8],
                hid_layers_activation: Activation::Tanh,
                init_fn: InitFn::Orthogonal,
                batch_norm: false,
                clip_grad_val: Some(0.5),
                actor_optim_spec: OptimSpec::Adam { lr: 3e-4 },
                critic_optim_spec: Some(OptimSpec::Adam { lr: 1e-3 }),
            },
            env: EnvConfig {
                num_envs,
                frame_op: None,
                frame_op_len: None,
                max_frame,
                max_t: None,
            },
            meta: MetaConfig::default(),
        }
    }

    fn scripted_envs(n: usize, episode_len: u32) -> Vec<Box<dyn Environment>> {
        (0..n)
            .map(|_| Box::new(ScriptedEnv::new(vec![1.0], episode_len)) as Box<dyn Environment>)
            .collect()
    }

    #[test]
    fn budget_boundary_consumes_final_rollout() {
        fastrand::seed(7);
        let config = base_config(1, 128, 256);
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(1, 16), Default::default())
            .unwrap();

        train.run(&mut NullLogger).unwrap();

        // 256 frames at 128 per rollout: the second rollout completes on
        // the final frame and must still be consumed.
        assert_eq!(train.frames(), 256);
        assert_eq!(train.updates(), 2);
        assert_eq!(train.phase(), Phase::Terminated);
    }

    #[test]
    fn buffer_is_empty_between_updates() {
        fastrand::seed(11);
        let config = base_config(2, 8, 64);
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(2, 5), Default::default())
            .unwrap();

        let mut logger = NullLogger;
        while train.phase() != Phase::Terminated {
            train.tick(&mut logger).unwrap();
            // After any update the rollout is fully drained; otherwise
            // fewer than a full rollout of transitions is pending.
            assert!(train.pending_transitions() < 8 * 2);
        }
        assert_eq!(train.pending_transitions(), 0);
        assert_eq!(train.updates(), 4);
    }

    #[test]
    fn shared_mode_runs_to_termination() {
        fastrand::seed(13);
        let mut config = base_config(2, 4, 32);
        config.net.shared = true;
        config.net.critic_optim_spec = None;
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(2, 6), Default::default())
            .unwrap();

        train.run(&mut NullLogger).unwrap();
        assert_eq!(train.phase(), Phase::Terminated);
        assert_eq!(train.updates(), 4);
    }

    #[test]
    fn frame_stacking_runs_end_to_end() {
        fastrand::seed(17);
        let mut config = base_config(2, 4, 24);
        config.env.frame_op = Some(FrameOp::Concat);
        config.env.frame_op_len = Some(4);
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(2, 5), Default::default())
            .unwrap();

        train.run(&mut NullLogger).unwrap();
        assert_eq!(train.phase(), Phase::Terminated);
    }

    #[test]
    fn env_fault_aborts_the_run() {
        fastrand::seed(19);
        let config = base_config(1, 4, 1024);
        let mut env = ScriptedEnv::new(vec![1.0], 100);
        env.fail_on_step = Some(10);
        let mut train =
            TrainLoop::<TB>::new(config, vec![Box::new(env)], Default::default()).unwrap();

        let err = train.run(&mut NullLogger).unwrap_err();
        assert!(matches!(err, TrainError::Env(_)));
    }

    #[test]
    fn invalid_config_is_rejected_before_any_stepping() {
        let mut config = base_config(1, 4, 64);
        config.algorithm.gamma = 1.5;
        let result = TrainLoop::<TB>::new(config, scripted_envs(1, 8), Default::default());
        assert!(matches!(result, Err(TrainError::Config(_))));
    }

    #[test]
    fn n_step_mode_runs_to_termination() {
        fastrand::seed(23);
        let mut config = base_config(2, 8, 48);
        config.algorithm.num_step_returns = Some(3);
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(2, 7), Default::default())
            .unwrap();

        train.run(&mut NullLogger).unwrap();
        assert_eq!(train.phase(), Phase::Terminated);
        assert_eq!(train.updates(), 3);
    }

    struct CountingLogger {
        snapshots: usize,
    }

    impl MetricsLogger for CountingLogger {
        fn log(&mut self, _snapshot: &TrainingSnapshot) {
            self.snapshots += 1;
        }
        fn flush(&mut self) {}
    }

    #[test]
    fn snapshot_cadence_follows_meta_log_frequency() {
        // Cadences far beyond the budget: no snapshot may be emitted even
        // though updates happen.
        fastrand::seed(31);
        let mut config = base_config(2, 8, 64);
        config.meta.log_frequency = 1_000_000;
        config.meta.eval_frequency = 1_000_000;
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(2, 5), Default::default())
            .unwrap();
        let mut logger = CountingLogger { snapshots: 0 };
        train.run(&mut logger).unwrap();
        assert_eq!(train.updates(), 4);
        assert_eq!(logger.snapshots, 0);

        // Cadence of one rollout: every update is due.
        fastrand::seed(31);
        let mut config = base_config(2, 8, 64);
        config.meta.log_frequency = 16;
        config.meta.eval_frequency = 1_000_000;
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(2, 5), Default::default())
            .unwrap();
        let mut logger = CountingLogger { snapshots: 0 };
        train.run(&mut logger).unwrap();
        assert_eq!(logger.snapshots, 4);
    }

    #[test]
    fn max_t_truncation_feeds_episode_returns() {
        fastrand::seed(29);
        let mut config = base_config(1, 8, 64);
        config.env.max_t = Some(4);
        let mut train = TrainLoop::<TB>::new(config, scripted_envs(1, 1000), Default::default())
            .unwrap();

        train.run(&mut NullLogger).unwrap();
        // 64 frames with truncation every 4 steps: 16 completed episodes.
        assert_eq!(train.returns.episodes(), 16);
        assert!((train.returns.mean() - 4.0).abs() < 1e-6);
    }
}
