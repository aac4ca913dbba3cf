//! Run-level error types.
//!
//! No retries exist anywhere in this engine: configuration errors fail at
//! construction, environment faults abort the run, and a non-finite loss is
//! fatal at the end of the offending update.

use std::fmt;

use crate::config::ConfigError;
use crate::environment::EnvError;

/// Fatal error terminating a training run.
#[derive(Debug)]
pub enum TrainError {
    /// Invalid configuration, detected before any environment interaction.
    Config(ConfigError),
    /// An environment instance faulted mid-step. Episode state is not
    /// recoverable, so the whole run aborts.
    Env(EnvError),
    /// A loss became non-finite during an update. Continuing would train on
    /// corrupted parameters, so the run aborts instead.
    NonFiniteLoss {
        actor_loss: f32,
        critic_loss: f32,
        frame: u64,
    },
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Config(err) => write!(f, "invalid configuration: {}", err),
            TrainError::Env(err) => write!(f, "environment fault: {}", err),
            TrainError::NonFiniteLoss {
                actor_loss,
                critic_loss,
                frame,
            } => write!(
                f,
                "non-finite loss at frame {} (actor: {}, critic: {})",
                frame, actor_loss, critic_loss
            ),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainError::Config(err) => Some(err),
            TrainError::Env(err) => Some(err),
            TrainError::NonFiniteLoss { .. } => None,
        }
    }
}

impl From<ConfigError> for TrainError {
    fn from(err: ConfigError) -> Self {
        TrainError::Config(err)
    }
}

impl From<EnvError> for TrainError {
    fn from(err: EnvError) -> Self {
        TrainError::Env(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_frame_and_losses() {
        let err = TrainError::NonFiniteLoss {
            actor_loss: f32::NAN,
            critic_loss: 1.0,
            frame: 4096,
        };
        let msg = err.to_string();
        assert!(msg.contains("4096"));
        assert!(msg.contains("NaN"));
    }
}
