//! Verification workflow: the state machine, its narration log and the
//! follow-up questionnaire.
//!
//! # Flow
//!
//! ```text
//! Idle -> AwaitingModeChoice -> Verifying -> Issued
//!                                         -> AwaitingFollowUp -> ReVerifying -> Issued
//!                                                                            -> EscalatedToOffice
//!                                                             -> EscalatedToOffice (visit)
//! ```
//!
//! [`KycWorkflow`] is synchronous and owns its timer queue; [`WorkflowDriver`]
//! runs that queue on tokio for interactive use.

pub mod driver;
pub mod error;
pub mod event_log;
pub mod machine;
pub mod narration;
pub mod questionnaire;
pub mod types;

pub use driver::WorkflowDriver;
pub use error::WorkflowError;
pub use event_log::{EventLog, LogEntry, Speaker};
pub use machine::{KycWorkflow, WorkflowAction};
pub use questionnaire::{FollowUpQuestionnaire, FOLLOW_UP_PROMPTS};
pub use types::{
    CommandKind, StateTransitionRecord, TransitionTrigger, WorkflowId, WorkflowSnapshot,
    WorkflowState, WorkflowStatusReport, WorkflowTiming,
};
