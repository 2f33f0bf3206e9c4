// Life Certificate Agent Library - simulated pensioner verification workflow
// This exposes the core components for testing and integration

pub mod certificate;
pub mod cli;
pub mod config;
pub mod telemetry;
pub mod timer;
pub mod verification;
pub mod workflow;

// Re-export key types for easy access
pub use certificate::{Certificate, CertificateError, CertificateIssuer};
pub use config::{config, init_config, LifeCertAgentConfig};
pub use telemetry::{
    create_workflow_span, generate_correlation_id, init_telemetry, shutdown_telemetry,
};
pub use timer::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use verification::{
    DecisionPolicy, Outcome, OutcomeDecider, RandomSource, ScriptedRandom, SeededRandom,
    ThreadRandom, VerificationMode, VerificationNote, VerificationResult,
};
pub use workflow::{
    KycWorkflow, LogEntry, Speaker, WorkflowDriver, WorkflowError, WorkflowSnapshot,
    WorkflowState, WorkflowTiming,
};
