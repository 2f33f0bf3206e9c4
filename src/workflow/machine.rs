use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::WorkflowError;
use super::event_log::{EventLog, LogEntry, Speaker};
use super::narration;
use super::questionnaire::FollowUpQuestionnaire;
use super::types::{
    CommandKind, StateTransitionRecord, TransitionTrigger, WorkflowId, WorkflowSnapshot,
    WorkflowState, WorkflowStatusReport, WorkflowTiming,
};
use crate::certificate::{Certificate, CertificateError, CertificateIssuer};
use crate::timer::{Clock, RunId, Schedule, TimerQueue};
use crate::verification::{
    DecisionPhase, OutcomeDecider, VerificationMode, VerificationNote, VerificationResult,
};

/// Steps fired by the timer queue on behalf of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    Narrate {
        speaker: Speaker,
        text: &'static str,
    },
    /// Appends the mode prompt and releases the intro's busy gate
    FinishIntro,
    DecideFirstPass,
    DecideReVerify,
}

/// Life certificate verification workflow.
///
/// Commands mutate state immediately and queue the timed remainder of their
/// sequence; [`KycWorkflow::fire_due`] runs whatever the clock says is due.
/// Actions queued by a run that has since been superseded are discarded.
pub struct KycWorkflow {
    id: WorkflowId,
    run_id: RunId,
    state: WorkflowState,
    running: bool,
    mode: Option<VerificationMode>,
    kyc_started_at: Option<DateTime<Utc>>,
    force_failure: bool,
    result: Option<VerificationResult>,
    questionnaire: Option<FollowUpQuestionnaire>,
    log: EventLog,
    history: Vec<StateTransitionRecord>,
    timers: TimerQueue<WorkflowAction>,
    decider: OutcomeDecider,
    issuer: CertificateIssuer,
    timing: WorkflowTiming,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for KycWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KycWorkflow")
            .field("id", &self.id)
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("running", &self.running)
            .field("mode", &self.mode)
            .field("force_failure", &self.force_failure)
            .field("result", &self.result)
            .field("pending_actions", &self.timers.len())
            .field("decider", &self.decider)
            .finish()
    }
}

impl KycWorkflow {
    pub fn new(clock: Arc<dyn Clock>, decider: OutcomeDecider) -> Self {
        let mut log = EventLog::new();
        log.append(LogEntry::new(clock.now(), Speaker::Agent, narration::READY));

        Self {
            id: WorkflowId::new(),
            run_id: RunId::default(),
            state: WorkflowState::Idle,
            running: false,
            mode: None,
            kyc_started_at: None,
            force_failure: false,
            result: None,
            questionnaire: None,
            log,
            history: Vec::new(),
            timers: TimerQueue::new(),
            decider,
            issuer: CertificateIssuer::default(),
            timing: WorkflowTiming::default(),
            clock,
        }
    }

    pub fn with_timing(mut self, timing: WorkflowTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_issuer(mut self, issuer: CertificateIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_id(mut self, id: WorkflowId) -> Self {
        self.id = id;
        self
    }

    // ----- commands -------------------------------------------------------

    /// Reset everything and begin a new run. Valid from any state; any
    /// sequence still in flight is superseded.
    pub fn start_run(&mut self) {
        let at = self.clock.now();
        let superseded = self.running;

        self.run_id = self.run_id.next();
        self.log.reset();
        self.history.clear();
        self.result = None;
        self.questionnaire = None;
        self.mode = None;
        self.kyc_started_at = None;
        self.running = true;

        info!(
            workflow_id = %self.id,
            run_id = %self.run_id,
            superseded,
            "Starting verification run"
        );

        self.say(at, Speaker::Agent, narration::GREETING);
        let intro = Schedule::new()
            .after(
                WorkflowTiming::delay(self.timing.intro_request_ms),
                WorkflowAction::Narrate {
                    speaker: Speaker::Customer,
                    text: narration::CUSTOMER_REQUEST,
                },
            )
            .after(
                WorkflowTiming::delay(self.timing.intro_prompt_ms),
                WorkflowAction::FinishIntro,
            );
        self.timers.schedule_all(self.run_id, at, intro);

        self.transition(
            WorkflowState::AwaitingModeChoice,
            TransitionTrigger::Command(CommandKind::StartRun),
            at,
        );
    }

    /// Record the verification mode and kick off the capture sequence.
    pub fn choose_mode(&mut self, mode: VerificationMode) -> Result<(), WorkflowError> {
        let command = CommandKind::ChooseMode;
        self.ensure_not_busy(command)?;
        self.ensure_state(command, WorkflowState::AwaitingModeChoice)?;

        let at = self.clock.now();
        self.mode = Some(mode);
        self.kyc_started_at = Some(at);
        self.result = None;
        self.running = true;

        self.say(at, Speaker::Customer, narration::mode_choice(mode));
        self.say(at, Speaker::Agent, narration::INITIATING);

        let capture = Schedule::new()
            .after(
                WorkflowTiming::delay(self.timing.video_capture_ms),
                WorkflowAction::Narrate {
                    speaker: Speaker::VideoKycAgent,
                    text: narration::VIDEO_CAPTURE,
                },
            )
            .after(
                WorkflowTiming::delay(self.timing.biometrics_capture_ms),
                WorkflowAction::Narrate {
                    speaker: Speaker::BiometricsAgent,
                    text: narration::BIOMETRICS_CAPTURE,
                },
            )
            .after(
                WorkflowTiming::delay(self.timing.first_pass_decision_ms),
                WorkflowAction::DecideFirstPass,
            );
        self.timers.schedule_all(self.run_id, at, capture);

        self.transition(
            WorkflowState::Verifying,
            TransitionTrigger::Command(command),
            at,
        );
        Ok(())
    }

    /// Set the "force unsuccessful case" flag. Read when the next decision is
    /// computed, not when it is scheduled.
    pub fn set_override(&mut self, force_failure: bool) {
        if self.force_failure != force_failure {
            info!(
                workflow_id = %self.id,
                run_id = %self.run_id,
                force_failure,
                "Override flag changed"
            );
        }
        self.force_failure = force_failure;
    }

    pub fn answer_question(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let command = CommandKind::AnswerQuestion;
        self.ensure_not_busy(command)?;
        self.ensure_state(command, WorkflowState::AwaitingFollowUp)?;

        let questionnaire = self
            .questionnaire
            .as_mut()
            .ok_or(WorkflowError::InvalidTransition {
                command,
                state: self.state,
            })?;
        questionnaire.record_answer(index, text)?;

        debug!(workflow_id = %self.id, index, "Follow-up answer recorded");
        Ok(())
    }

    /// Re-run verification with the follow-up answers. Partial or empty
    /// answers are accepted.
    pub fn submit_answers(&mut self) -> Result<(), WorkflowError> {
        let command = CommandKind::SubmitAnswers;
        self.ensure_not_busy(command)?;
        self.ensure_state(command, WorkflowState::AwaitingFollowUp)?;

        let at = self.clock.now();
        self.running = true;
        self.say(at, Speaker::Customer, narration::ANSWERS_SUBMITTED);

        let reverify = Schedule::new()
            .after(
                WorkflowTiming::delay(self.timing.reverify_notice_ms),
                WorkflowAction::Narrate {
                    speaker: Speaker::Agent,
                    text: narration::RERUNNING,
                },
            )
            .after(
                WorkflowTiming::delay(self.timing.reverify_decision_ms),
                WorkflowAction::DecideReVerify,
            );
        self.timers.schedule_all(self.run_id, at, reverify);

        self.transition(
            WorkflowState::ReVerifying,
            TransitionTrigger::Command(command),
            at,
        );
        Ok(())
    }

    /// Leave the clarification loop for an in-person visit. No decision is
    /// computed.
    pub fn schedule_visit(&mut self) -> Result<(), WorkflowError> {
        let command = CommandKind::ScheduleVisit;
        self.ensure_not_busy(command)?;
        self.ensure_state(command, WorkflowState::AwaitingFollowUp)?;

        let at = self.clock.now();
        self.say(at, Speaker::Customer, narration::VISIT_REQUESTED);
        self.result = Some(VerificationResult::failed(
            VerificationNote::UserOptedInPerson,
            at,
        ));
        self.say(at, Speaker::Agent, narration::OFFICES_NOTIFIED);

        self.transition(
            WorkflowState::EscalatedToOffice,
            TransitionTrigger::Command(command),
            at,
        );
        Ok(())
    }

    /// Issue a life certificate from the current result. Only a successful
    /// result yields one; anything else is rejected without side effects.
    pub fn issue_certificate(&mut self) -> Result<Certificate, WorkflowError> {
        let result = self.result.as_ref().ok_or(CertificateError::NoResult)?;

        let at = self.clock.now();
        let certificate = match self.issuer.issue(result, at) {
            Ok(certificate) => certificate,
            Err(e) => {
                warn!(workflow_id = %self.id, error = %e, "Certificate request rejected");
                return Err(e.into());
            }
        };

        self.say(at, Speaker::Agent, narration::CERTIFICATE_DOWNLOADED);
        info!(
            workflow_id = %self.id,
            run_id = %self.run_id,
            certificate_id = %certificate.id,
            note = %certificate.note,
            "Life certificate issued"
        );
        Ok(certificate)
    }

    // ----- timer ----------------------------------------------------------

    /// Run every queued action that is due, in due order. Returns the number
    /// of actions applied; stale actions are dropped and not counted.
    pub fn fire_due(&mut self) -> usize {
        let mut fired = 0;
        while let Some(item) = self.timers.pop_due(self.clock.now()) {
            if item.run != self.run_id {
                debug!(
                    workflow_id = %self.id,
                    stale_run = %item.run,
                    current_run = %self.run_id,
                    action = ?item.action,
                    "Discarding stale scheduled action"
                );
                continue;
            }
            self.apply(item.action, item.due);
            fired += 1;
        }
        fired
    }

    /// Earliest queued deadline, stale entries included.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Queued actions that belong to the current run.
    pub fn pending_actions(&self) -> usize {
        self.timers.pending_for(self.run_id)
    }

    fn apply(&mut self, action: WorkflowAction, at: DateTime<Utc>) {
        match action {
            WorkflowAction::Narrate { speaker, text } => self.say(at, speaker, text),
            WorkflowAction::FinishIntro => {
                self.say(at, Speaker::Agent, narration::MODE_PROMPT);
                self.running = false;
            }
            WorkflowAction::DecideFirstPass => self.resolve_first_pass(at),
            WorkflowAction::DecideReVerify => self.resolve_reverification(at),
        }
    }

    fn resolve_first_pass(&mut self, at: DateTime<Utc>) {
        let (WorkflowState::Verifying, Some(mode)) = (self.state, self.mode) else {
            warn!(
                workflow_id = %self.id,
                state = %self.state,
                "First-pass decision out of sequence"
            );
            return;
        };

        let outcome = self
            .decider
            .decide(mode, self.force_failure, DecisionPhase::FirstPass);
        self.running = false;

        if outcome.is_success() {
            self.say(at, Speaker::Agent, narration::VERIFIED);
            self.result = Some(VerificationResult::succeeded(
                VerificationNote::AutoVerified,
                at,
            ));
            self.transition(WorkflowState::Issued, TransitionTrigger::Decision(outcome), at);
        } else {
            self.say(at, Speaker::Agent, narration::SUSPICIOUS);
            self.questionnaire = Some(FollowUpQuestionnaire::standard());
            self.transition(
                WorkflowState::AwaitingFollowUp,
                TransitionTrigger::Decision(outcome),
                at,
            );
        }
    }

    fn resolve_reverification(&mut self, at: DateTime<Utc>) {
        let (WorkflowState::ReVerifying, Some(mode)) = (self.state, self.mode) else {
            warn!(workflow_id = %self.id, state = %self.state, "Re-verification out of sequence");
            return;
        };

        let outcome = self
            .decider
            .decide(mode, self.force_failure, DecisionPhase::ReVerify);
        self.running = false;

        if outcome.is_success() {
            self.say(at, Speaker::Agent, narration::CLEARED);
            self.result = Some(VerificationResult::succeeded(
                VerificationNote::ClearedAfterFollowUp,
                at,
            ));
            self.transition(WorkflowState::Issued, TransitionTrigger::Decision(outcome), at);
        } else {
            self.say(at, Speaker::Agent, narration::STILL_UNRESOLVED);
            self.result = Some(VerificationResult::failed(
                VerificationNote::UnresolvedInPerson,
                at,
            ));
            self.timers.schedule_after(
                self.run_id,
                at,
                WorkflowTiming::delay(self.timing.staff_alert_ms),
                WorkflowAction::Narrate {
                    speaker: Speaker::Notification,
                    text: narration::STAFF_ALERTED,
                },
            );
            self.transition(
                WorkflowState::EscalatedToOffice,
                TransitionTrigger::Decision(outcome),
                at,
            );
        }
    }

    // ----- helpers --------------------------------------------------------

    fn say(&mut self, at: DateTime<Utc>, speaker: Speaker, text: &str) {
        self.log.append(LogEntry::new(at, speaker, text));
    }

    fn ensure_not_busy(&self, command: CommandKind) -> Result<(), WorkflowError> {
        if self.running {
            warn!(
                workflow_id = %self.id,
                run_id = %self.run_id,
                %command,
                state = %self.state,
                "Command rejected: sequence in flight"
            );
            return Err(WorkflowError::Busy { command });
        }
        Ok(())
    }

    fn ensure_state(
        &self,
        command: CommandKind,
        expected: WorkflowState,
    ) -> Result<(), WorkflowError> {
        if self.state != expected {
            warn!(
                workflow_id = %self.id,
                run_id = %self.run_id,
                %command,
                state = %self.state,
                "Invalid workflow transition"
            );
            return Err(WorkflowError::InvalidTransition {
                command,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Move to `to`, dropping the questionnaire when leaving the follow-up
    /// states, and record the transition for the audit trail.
    fn transition(&mut self, to: WorkflowState, trigger: TransitionTrigger, at: DateTime<Utc>) {
        let from = self.state;
        if !to.holds_questionnaire() {
            self.questionnaire = None;
        }
        self.state = to;

        info!(
            workflow_id = %self.id,
            run_id = %self.run_id,
            from_state = %from,
            to_state = %to,
            trigger = ?trigger,
            "Workflow state transition"
        );

        self.history.push(StateTransitionRecord {
            from_state: from,
            to_state: to,
            trigger,
            run: self.run_id,
            timestamp: at,
        });
    }

    // ----- observables ----------------------------------------------------

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// True from the start of a multi-step sequence until its last step lands.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> Option<VerificationMode> {
        self.mode
    }

    pub fn kyc_started_at(&self) -> Option<DateTime<Utc>> {
        self.kyc_started_at
    }

    pub fn force_failure(&self) -> bool {
        self.force_failure
    }

    pub fn result(&self) -> Option<&VerificationResult> {
        self.result.as_ref()
    }

    pub fn questionnaire(&self) -> Option<&FollowUpQuestionnaire> {
        self.questionnaire.as_ref()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Transitions of the current run, oldest first.
    pub fn history(&self) -> &[StateTransitionRecord] {
        &self.history
    }

    pub fn timing(&self) -> &WorkflowTiming {
        &self.timing
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            workflow_id: self.id,
            run_id: self.run_id,
            state: self.state,
            running: self.running,
            mode: self.mode,
            force_failure: self.force_failure,
            kyc_started_at: self.kyc_started_at,
            log: self.log.snapshot().to_vec(),
            result: self.result.clone(),
            questionnaire: self.questionnaire.clone(),
        }
    }

    pub fn status_report(&self) -> WorkflowStatusReport {
        let now = self.clock.now();
        WorkflowStatusReport {
            workflow_id: self.id,
            run_id: self.run_id,
            state: self.state,
            running: self.running,
            elapsed_since_kyc_start_ms: self
                .kyc_started_at
                .map(|started| now.signed_duration_since(started).num_milliseconds()),
            transitions_count: self.history.len(),
            last_transition: self.history.last().map(|t| t.timestamp),
            pending_actions: self.pending_actions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;
    use crate::verification::{DecisionPolicy, MockRandomSource, ScriptedRandom};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn workflow(values: Vec<f64>) -> (KycWorkflow, ManualClock) {
        let clock = ManualClock::new(start());
        let decider = OutcomeDecider::new(DecisionPolicy::default(), ScriptedRandom::new(values));
        (KycWorkflow::new(Arc::new(clock.clone()), decider), clock)
    }

    fn ready_for_mode(values: Vec<f64>) -> (KycWorkflow, ManualClock) {
        let (mut wf, clock) = workflow(values);
        wf.start_run();
        clock.advance_ms(1_400);
        wf.fire_due();
        (wf, clock)
    }

    #[test]
    fn test_new_workflow_is_idle_with_ready_line() {
        let (wf, _) = workflow(vec![]);

        assert_eq!(wf.state(), WorkflowState::Idle);
        assert!(!wf.is_running());
        assert_eq!(wf.log().len(), 1);
        assert!(wf.result().is_none());
        assert_eq!(wf.run_id(), RunId(0));
    }

    #[test]
    fn test_intro_holds_busy_gate_until_mode_prompt() {
        let (mut wf, clock) = workflow(vec![0.5]);
        wf.start_run();

        assert_eq!(wf.state(), WorkflowState::AwaitingModeChoice);
        assert!(wf.is_running());
        assert!(matches!(
            wf.choose_mode(VerificationMode::Remote),
            Err(WorkflowError::Busy { .. })
        ));

        clock.advance_ms(700);
        assert_eq!(wf.fire_due(), 1);
        assert_eq!(wf.log().last().unwrap().speaker, Speaker::Customer);
        assert!(wf.is_running());

        clock.advance_ms(700);
        assert_eq!(wf.fire_due(), 1);
        assert!(!wf.is_running());
        assert_eq!(wf.log().last().unwrap().text, narration::MODE_PROMPT);
    }

    #[test]
    fn test_choose_mode_sets_start_time_once() {
        let (mut wf, clock) = ready_for_mode(vec![0.01]);
        let chosen_at = clock.now();

        wf.choose_mode(VerificationMode::Remote).unwrap();
        assert_eq!(wf.kyc_started_at(), Some(chosen_at));
        assert_eq!(wf.state(), WorkflowState::Verifying);

        // Re-invocation mid-sequence is rejected and leaves the start time alone
        clock.advance_ms(100);
        assert!(matches!(
            wf.choose_mode(VerificationMode::AgentLocation),
            Err(WorkflowError::Busy { .. })
        ));
        assert_eq!(wf.kyc_started_at(), Some(chosen_at));
        assert_eq!(wf.mode(), Some(VerificationMode::Remote));
    }

    #[test]
    fn test_capture_lines_then_decision_in_delay_order() {
        let (mut wf, clock) = ready_for_mode(vec![0.5]);
        wf.choose_mode(VerificationMode::Remote).unwrap();

        clock.advance_ms(10_000);
        assert_eq!(wf.fire_due(), 3);

        let speakers: Vec<_> = wf
            .log()
            .snapshot()
            .iter()
            .rev()
            .take(3)
            .map(|e| e.speaker)
            .collect();
        assert_eq!(
            speakers,
            vec![Speaker::Agent, Speaker::BiometricsAgent, Speaker::VideoKycAgent]
        );
        // Decision stamped at its scheduled instant, not at the late fire time
        let result = wf.result().unwrap();
        assert_eq!(
            result.decided_at,
            wf.kyc_started_at().unwrap() + chrono::Duration::milliseconds(2_600)
        );
    }

    #[test]
    fn test_late_override_applies_to_pending_decision() {
        let (mut wf, clock) = ready_for_mode(vec![0.99]);
        wf.choose_mode(VerificationMode::AgentLocation).unwrap();

        clock.advance_ms(1_000);
        wf.fire_due();
        wf.set_override(true);

        clock.advance_ms(2_000);
        wf.fire_due();

        assert_eq!(wf.state(), WorkflowState::AwaitingFollowUp);
    }

    #[test]
    fn test_schedule_visit_never_consults_decider() {
        let clock = ManualClock::new(start());
        let mut source = MockRandomSource::new();
        // Exactly one draw: the first pass
        source.expect_next_unit().times(1).return_const(0.01);
        let decider = OutcomeDecider::new(DecisionPolicy::default(), source);
        let mut wf = KycWorkflow::new(Arc::new(clock.clone()), decider);

        wf.start_run();
        clock.advance_ms(1_400);
        wf.fire_due();
        wf.choose_mode(VerificationMode::Remote).unwrap();
        clock.advance_ms(2_600);
        wf.fire_due();
        assert_eq!(wf.state(), WorkflowState::AwaitingFollowUp);

        wf.schedule_visit().unwrap();

        assert_eq!(wf.state(), WorkflowState::EscalatedToOffice);
        assert!(wf.questionnaire().is_none());
        let result = wf.result().unwrap();
        assert!(!result.success);
        assert_eq!(result.note, VerificationNote::UserOptedInPerson);
    }

    #[test]
    fn test_unresolved_reverification_alerts_staff_later() {
        let (mut wf, clock) = ready_for_mode(vec![0.01, 0.9]);
        wf.choose_mode(VerificationMode::Remote).unwrap();
        clock.advance_ms(2_600);
        wf.fire_due();
        wf.submit_answers().unwrap();
        assert!(wf.is_running());
        assert_eq!(wf.state(), WorkflowState::ReVerifying);
        assert!(wf.questionnaire().is_some());

        clock.advance_ms(2_000);
        wf.fire_due();
        assert_eq!(wf.state(), WorkflowState::EscalatedToOffice);
        assert!(!wf.is_running());
        assert_eq!(wf.pending_actions(), 1);
        assert_ne!(wf.log().last().unwrap().speaker, Speaker::Notification);

        clock.advance_ms(600);
        wf.fire_due();
        assert_eq!(wf.log().last().unwrap().speaker, Speaker::Notification);
        assert_eq!(wf.pending_actions(), 0);
    }

    #[test]
    fn test_start_run_discards_stale_actions() {
        let (mut wf, clock) = ready_for_mode(vec![0.5]);
        wf.choose_mode(VerificationMode::Remote).unwrap();
        clock.advance_ms(700);
        wf.fire_due();

        wf.start_run();
        assert_eq!(wf.run_id(), RunId(2));
        clock.advance_ms(5_000);
        wf.fire_due();

        // Old capture lines and decision never land in the new run
        assert_eq!(wf.state(), WorkflowState::AwaitingModeChoice);
        assert!(wf.result().is_none());
        assert_eq!(wf.log().len(), 3);
        assert!(wf
            .log()
            .snapshot()
            .iter()
            .all(|e| e.speaker == Speaker::Agent || e.speaker == Speaker::Customer));
    }

    #[test]
    fn test_history_records_each_transition_of_the_run() {
        let (mut wf, clock) = ready_for_mode(vec![0.5]);
        wf.choose_mode(VerificationMode::AgentLocation).unwrap();
        clock.advance_ms(2_600);
        wf.fire_due();

        let path: Vec<_> = wf.history().iter().map(|r| (r.from_state, r.to_state)).collect();
        assert_eq!(
            path,
            vec![
                (WorkflowState::Idle, WorkflowState::AwaitingModeChoice),
                (WorkflowState::AwaitingModeChoice, WorkflowState::Verifying),
                (WorkflowState::Verifying, WorkflowState::Issued),
            ]
        );
        assert!(wf.history().iter().all(|r| r.run == RunId(1)));

        let report = wf.status_report();
        assert_eq!(report.transitions_count, 3);
        assert_eq!(report.elapsed_since_kyc_start_ms, Some(2_600));
    }

    #[test]
    fn test_issue_certificate_narrates_download() {
        let (mut wf, clock) = ready_for_mode(vec![0.5]);
        wf.choose_mode(VerificationMode::Remote).unwrap();
        clock.advance_ms(2_600);
        wf.fire_due();

        let cert = wf.issue_certificate().unwrap();

        assert_eq!(cert.id, format!("LC-{}", clock.now().timestamp_millis()));
        assert_eq!(wf.log().last().unwrap().text, narration::CERTIFICATE_DOWNLOADED);
    }

    #[test]
    fn test_unbounded_delay_parks_step_instead_of_panicking() {
        let (wf, clock) = workflow(vec![0.5]);
        let mut wf = wf.with_timing(WorkflowTiming {
            intro_prompt_ms: 10_000_000_000_000_000,
            ..WorkflowTiming::default()
        });

        wf.start_run();
        clock.advance_ms(1_000 * 60 * 60 * 24 * 365);
        assert_eq!(wf.fire_due(), 1);

        assert!(wf.is_running());
        assert_eq!(wf.next_deadline(), Some(DateTime::<Utc>::MAX_UTC));
    }
}
