use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::event_log::LogEntry;
use super::questionnaire::FollowUpQuestionnaire;
use crate::timer::RunId;
use crate::verification::{Outcome, VerificationMode, VerificationResult};

/// Phase of a verification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    #[default]
    Idle,
    AwaitingModeChoice,
    Verifying,
    AwaitingFollowUp,
    ReVerifying,
    Issued,
    EscalatedToOffice,
}

impl WorkflowState {
    /// States in which the follow-up questionnaire exists.
    pub fn holds_questionnaire(self) -> bool {
        matches!(
            self,
            WorkflowState::AwaitingFollowUp | WorkflowState::ReVerifying
        )
    }

    /// Terminal for the run; only a new run leaves these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Issued | WorkflowState::EscalatedToOffice
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::AwaitingModeChoice => "AwaitingModeChoice",
            WorkflowState::Verifying => "Verifying",
            WorkflowState::AwaitingFollowUp => "AwaitingFollowUp",
            WorkflowState::ReVerifying => "ReVerifying",
            WorkflowState::Issued => "Issued",
            WorkflowState::EscalatedToOffice => "EscalatedToOffice",
        };
        f.write_str(name)
    }
}

/// Commands a caller may issue against a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    StartRun,
    ChooseMode,
    SetOverride,
    AnswerQuestion,
    SubmitAnswers,
    ScheduleVisit,
    IssueCertificate,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::StartRun => "startRun",
            CommandKind::ChooseMode => "chooseMode",
            CommandKind::SetOverride => "setOverride",
            CommandKind::AnswerQuestion => "answerQuestion",
            CommandKind::SubmitAnswers => "submitAnswers",
            CommandKind::ScheduleVisit => "scheduleVisit",
            CommandKind::IssueCertificate => "issueCertificate",
        };
        f.write_str(name)
    }
}

/// Identity of one workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    pub fn new() -> Self {
        WorkflowId(Uuid::new_v4())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What moved the workflow from one state to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionTrigger {
    Command(CommandKind),
    Decision(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitionRecord {
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    pub trigger: TransitionTrigger,
    pub run: RunId,
    pub timestamp: DateTime<Utc>,
}

/// Delays between the steps of each simulated sequence, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTiming {
    /// Greeting to the customer's request line
    pub intro_request_ms: u64,
    /// Greeting to the mode prompt that ends the intro
    pub intro_prompt_ms: u64,
    /// Mode choice to the video capture line
    pub video_capture_ms: u64,
    /// Mode choice to the biometrics read line
    pub biometrics_capture_ms: u64,
    /// Mode choice to the first-pass decision
    pub first_pass_decision_ms: u64,
    /// Answer submission to the re-run line
    pub reverify_notice_ms: u64,
    /// Answer submission to the re-verification decision
    pub reverify_decision_ms: u64,
    /// Unresolved decision to the staff alert
    pub staff_alert_ms: u64,
}

impl Default for WorkflowTiming {
    fn default() -> Self {
        Self {
            intro_request_ms: 700,
            intro_prompt_ms: 1_400,
            video_capture_ms: 700,
            biometrics_capture_ms: 1_400,
            first_pass_decision_ms: 2_600,
            reverify_notice_ms: 800,
            reverify_decision_ms: 2_000,
            staff_alert_ms: 600,
        }
    }
}

impl WorkflowTiming {
    /// Every delay set to zero; sequences resolve on the next timer pass.
    pub fn immediate() -> Self {
        Self {
            intro_request_ms: 0,
            intro_prompt_ms: 0,
            video_capture_ms: 0,
            biometrics_capture_ms: 0,
            first_pass_decision_ms: 0,
            reverify_notice_ms: 0,
            reverify_decision_ms: 0,
            staff_alert_ms: 0,
        }
    }

    pub(crate) fn delay(millis: u64) -> Duration {
        Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub state: WorkflowState,
    pub running: bool,
    pub mode: Option<VerificationMode>,
    pub force_failure: bool,
    pub kyc_started_at: Option<DateTime<Utc>>,
    pub log: Vec<LogEntry>,
    pub result: Option<VerificationResult>,
    pub questionnaire: Option<FollowUpQuestionnaire>,
}

/// Status report for monitoring a workflow instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatusReport {
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub state: WorkflowState,
    pub running: bool,
    pub elapsed_since_kyc_start_ms: Option<i64>,
    pub transitions_count: usize,
    pub last_transition: Option<DateTime<Utc>>,
    pub pending_actions: usize,
}
