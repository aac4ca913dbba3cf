//! Algorithmic core: advantage estimation, the categorical policy head,
//! and loss assembly.

pub mod gae;
pub mod loss;
pub mod policy;

pub use gae::{AdvantageEstimator, AdvantageSet};
pub use loss::{actor_loss, critic_loss, extract_scalar, LossComponents};
pub use policy::CategoricalOutput;
