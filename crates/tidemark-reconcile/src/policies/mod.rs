//! Bundled policies.

pub mod enforcer;
pub mod scorer;
pub mod signals;

pub use enforcer::{VerificationEnforcer, ENFORCEMENT_MESSAGE};
pub use scorer::CompletenessScorer;
