//! Outcome decision for the simulated capture step.
//!
//! All probability draws in the crate go through [`OutcomeDecider`], which
//! reads from an injected [`RandomSource`] so tests can pin every outcome.

pub mod decider;
pub mod random;
pub mod result;

pub use decider::{
    DecisionError, DecisionPhase, DecisionPolicy, Outcome, OutcomeDecider, VerificationMode,
};
pub use random::{RandomSource, ScriptedRandom, SeededRandom, ThreadRandom};
pub use result::{VerificationNote, VerificationResult};

#[cfg(any(test, feature = "testing"))]
pub use random::MockRandomSource;
