use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::random::{RandomSource, ThreadRandom};

/// How the customer is verified. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Video KYC from home
    Remote,
    /// Biometrics at an agent location
    AgentLocation,
}

impl VerificationMode {
    pub fn from_agent_location(at_agent_location: bool) -> Self {
        if at_agent_location {
            VerificationMode::AgentLocation
        } else {
            VerificationMode::Remote
        }
    }

    pub fn is_agent_location(self) -> bool {
        matches!(self, VerificationMode::AgentLocation)
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMode::Remote => write!(f, "Video KYC (remote)"),
            VerificationMode::AgentLocation => write!(f, "Biometrics (agent location)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPhase {
    FirstPass,
    ReVerify,
}

/// Determination produced by the decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// First pass passed outright
    Verified,
    /// First pass raised flags; clarification needed before a final answer
    Suspicious,
    /// Follow-up answers cleared the flags
    Cleared,
    /// Still unresolved after follow-up
    Unresolved,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Verified | Outcome::Cleared)
    }
}

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
}

/// Probability table for both decision phases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// Chance a remote (video) first pass comes back suspicious
    pub remote_suspicion_probability: f64,
    /// Chance an agent-location (biometrics) first pass comes back suspicious
    pub agent_location_suspicion_probability: f64,
    /// Chance follow-up answers clear a suspicious first pass
    pub follow_up_clearance_probability: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            remote_suspicion_probability: 0.18,
            agent_location_suspicion_probability: 0.05,
            follow_up_clearance_probability: 0.5,
        }
    }
}

impl DecisionPolicy {
    pub fn suspicion_probability(&self, mode: VerificationMode) -> f64 {
        match mode {
            VerificationMode::Remote => self.remote_suspicion_probability,
            VerificationMode::AgentLocation => self.agent_location_suspicion_probability,
        }
    }

    pub fn validate(&self) -> Result<(), DecisionError> {
        let checks = [
            ("remote_suspicion_probability", self.remote_suspicion_probability),
            (
                "agent_location_suspicion_probability",
                self.agent_location_suspicion_probability,
            ),
            (
                "follow_up_clearance_probability",
                self.follow_up_clearance_probability,
            ),
        ];
        for (name, value) in checks {
            if !(0.0..=1.0).contains(&value) {
                return Err(DecisionError::ProbabilityOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Turns a mode, the override flag and a phase into an [`Outcome`].
///
/// The override flag ("force unsuccessful case") short-circuits both phases
/// without drawing from the random source.
pub struct OutcomeDecider {
    policy: DecisionPolicy,
    source: Box<dyn RandomSource + Send>,
}

impl fmt::Debug for OutcomeDecider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeDecider")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for OutcomeDecider {
    fn default() -> Self {
        Self::new(DecisionPolicy::default(), ThreadRandom)
    }
}

impl OutcomeDecider {
    pub fn new(policy: DecisionPolicy, source: impl RandomSource + Send + 'static) -> Self {
        Self {
            policy,
            source: Box::new(source),
        }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn decide(
        &mut self,
        mode: VerificationMode,
        force_failure: bool,
        phase: DecisionPhase,
    ) -> Outcome {
        let outcome = match phase {
            DecisionPhase::FirstPass if force_failure => Outcome::Suspicious,
            DecisionPhase::FirstPass => {
                let threshold = self.policy.suspicion_probability(mode);
                let draw = self.source.next_unit();
                debug!(?mode, draw, threshold, "First-pass draw");
                if draw < threshold {
                    Outcome::Suspicious
                } else {
                    Outcome::Verified
                }
            }
            DecisionPhase::ReVerify if force_failure => Outcome::Unresolved,
            DecisionPhase::ReVerify => {
                let threshold = self.policy.follow_up_clearance_probability;
                let draw = self.source.next_unit();
                debug!(draw, threshold, "Re-verification draw");
                if draw < threshold {
                    Outcome::Cleared
                } else {
                    Outcome::Unresolved
                }
            }
        };

        debug!(?mode, ?phase, force_failure, ?outcome, "Outcome decided");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::super::random::MockRandomSource;
    use super::*;

    fn decider_drawing(value: f64) -> OutcomeDecider {
        let mut source = MockRandomSource::new();
        source.expect_next_unit().times(1).return_const(value);
        OutcomeDecider::new(DecisionPolicy::default(), source)
    }

    fn decider_never_drawing() -> OutcomeDecider {
        let mut source = MockRandomSource::new();
        source.expect_next_unit().never();
        OutcomeDecider::new(DecisionPolicy::default(), source)
    }

    #[test]
    fn test_agent_location_flips_at_five_percent() {
        let below = decider_drawing(0.049).decide(
            VerificationMode::AgentLocation,
            false,
            DecisionPhase::FirstPass,
        );
        let above = decider_drawing(0.051).decide(
            VerificationMode::AgentLocation,
            false,
            DecisionPhase::FirstPass,
        );

        assert_eq!(below, Outcome::Suspicious);
        assert_eq!(above, Outcome::Verified);
    }

    #[test]
    fn test_remote_flips_at_eighteen_percent() {
        let at_agent_threshold = decider_drawing(0.051).decide(
            VerificationMode::Remote,
            false,
            DecisionPhase::FirstPass,
        );
        let below = decider_drawing(0.179).decide(
            VerificationMode::Remote,
            false,
            DecisionPhase::FirstPass,
        );
        let at = decider_drawing(0.18).decide(
            VerificationMode::Remote,
            false,
            DecisionPhase::FirstPass,
        );

        assert_eq!(at_agent_threshold, Outcome::Suspicious);
        assert_eq!(below, Outcome::Suspicious);
        assert_eq!(at, Outcome::Verified);
    }

    #[test]
    fn test_reverify_clears_below_half() {
        let cleared = decider_drawing(0.3).decide(
            VerificationMode::Remote,
            false,
            DecisionPhase::ReVerify,
        );
        let unresolved = decider_drawing(0.5).decide(
            VerificationMode::Remote,
            false,
            DecisionPhase::ReVerify,
        );

        assert_eq!(cleared, Outcome::Cleared);
        assert_eq!(unresolved, Outcome::Unresolved);
    }

    #[test]
    fn test_override_forces_failure_without_drawing() {
        for mode in [VerificationMode::Remote, VerificationMode::AgentLocation] {
            assert_eq!(
                decider_never_drawing().decide(mode, true, DecisionPhase::FirstPass),
                Outcome::Suspicious
            );
            assert_eq!(
                decider_never_drawing().decide(mode, true, DecisionPhase::ReVerify),
                Outcome::Unresolved
            );
        }
    }

    #[test]
    fn test_policy_validation_rejects_out_of_range() {
        let policy = DecisionPolicy {
            remote_suspicion_probability: 1.5,
            ..DecisionPolicy::default()
        };

        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("remote_suspicion_probability"));
        assert!(DecisionPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_mode_from_agent_location_flag() {
        assert_eq!(
            VerificationMode::from_agent_location(true),
            VerificationMode::AgentLocation
        );
        assert_eq!(
            VerificationMode::from_agent_location(false),
            VerificationMode::Remote
        );
    }
}
