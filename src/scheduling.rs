//! Entropy-coefficient scheduling.
//!
//! The exploration bonus weight decays over training. Schedules are pure
//! functions of the global frame count: no interior mutability, so the
//! coefficient at a given clock reading is reproducible.
//!
//! Endpoints are validated hard at the configuration boundary
//! (`EngineConfig::validate`); construction here additionally
//! `debug_assert`s and sanitizes in release builds so a bad value can
//! never propagate NaN into the loss.

use crate::config::EntropyCoefSpec;

/// Step-dependent entropy coefficient.
///
/// `NoDecay` returns the start value forever. `Linear` interpolates from
/// `start_val` at `start_step` to `end_val` at `end_step` and clamps
/// outside that window; it never extrapolates.
#[derive(Debug, Clone, PartialEq)]
pub enum EntropySchedule {
    NoDecay {
        start_val: f32,
    },
    Linear {
        start_val: f32,
        end_val: f32,
        start_step: u64,
        end_step: u64,
    },
}

impl EntropySchedule {
    /// Build a schedule from its wire form.
    ///
    /// # Panics (debug only)
    ///
    /// Panics if an endpoint is non-finite or negative, or if
    /// `end_step < start_step`. In release builds bad values are
    /// sanitized to zero / an empty window.
    pub fn from_spec(spec: &EntropyCoefSpec) -> Self {
        match spec {
            EntropyCoefSpec::NoDecay { start_val } => {
                debug_assert!(
                    start_val.is_finite() && *start_val >= 0.0,
                    "entropy coefficient must be finite and non-negative, got {}",
                    start_val
                );
                let start_val = sanitize(*start_val);
                EntropySchedule::NoDecay { start_val }
            }
            EntropyCoefSpec::LinearDecay {
                start_val,
                end_val,
                start_step,
                end_step,
            } => {
                debug_assert!(
                    start_val.is_finite() && *start_val >= 0.0,
                    "start_val must be finite and non-negative, got {}",
                    start_val
                );
                debug_assert!(
                    end_val.is_finite() && *end_val >= 0.0,
                    "end_val must be finite and non-negative, got {}",
                    end_val
                );
                debug_assert!(
                    end_step >= start_step,
                    "end_step ({}) must not precede start_step ({})",
                    end_step,
                    start_step
                );
                let start_val = sanitize(*start_val);
                let end_val = sanitize(*end_val);
                let (start_step, end_step) = if end_step >= start_step {
                    (*start_step, *end_step)
                } else {
                    (*start_step, *start_step)
                };
                EntropySchedule::Linear {
                    start_val,
                    end_val,
                    start_step,
                    end_step,
                }
            }
        }
    }

    /// Coefficient at the given global frame count.
    pub fn coefficient(&self, step: u64) -> f32 {
        match self {
            EntropySchedule::NoDecay { start_val } => *start_val,
            EntropySchedule::Linear {
                start_val,
                end_val,
                start_step,
                end_step,
            } => {
                if step <= *start_step {
                    return *start_val;
                }
                if step >= *end_step {
                    return *end_val;
                }
                // start_step < step < end_step, so the span is non-zero.
                let span = (end_step - start_step) as f32;
                let progress = (step - start_step) as f32 / span;
                let coef = start_val + (end_val - start_val) * progress;
                if coef.is_finite() {
                    coef
                } else {
                    *end_val
                }
            }
        }
    }
}

fn sanitize(v: f32) -> f32 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        0.0
    }
}
