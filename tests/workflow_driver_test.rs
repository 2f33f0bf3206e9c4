// Async driver tests. Tokio time is paused, so the simulated delays elapse
// instantly while keeping their order and spacing.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

use life_cert_agent::verification::DecisionPolicy;
use life_cert_agent::{
    KycWorkflow, MonotonicClock, OutcomeDecider, ScriptedRandom, Speaker, VerificationMode,
    VerificationNote, WorkflowDriver, WorkflowError, WorkflowState,
};

fn spawn_driver(draws: Vec<f64>) -> WorkflowDriver {
    let clock = MonotonicClock::anchored_at(Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap());
    let decider = OutcomeDecider::new(DecisionPolicy::default(), ScriptedRandom::new(draws));
    WorkflowDriver::spawn(KycWorkflow::new(Arc::new(clock), decider))
}

#[tokio::test(start_paused = true)]
async fn test_driver_runs_sequence_to_issued() {
    let mut driver = spawn_driver(vec![0.5]);

    driver.start_run().await.unwrap();
    let intro = driver.wait_until_idle().await.unwrap();
    assert_eq!(intro.state, WorkflowState::AwaitingModeChoice);
    assert_eq!(intro.log.len(), 3);

    driver.choose_mode(VerificationMode::Remote).await.unwrap();
    let done = driver.wait_until_idle().await.unwrap();

    assert_eq!(done.state, WorkflowState::Issued);
    let result = done.result.unwrap();
    assert_eq!(result.note, VerificationNote::AutoVerified);
    assert_eq!(
        result.decided_at - done.kyc_started_at.unwrap(),
        Duration::milliseconds(2_600)
    );

    let certificate = driver.issue_certificate().await.unwrap();
    assert!(certificate.id.starts_with("LC-"));
    driver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_driver_rejects_mode_choice_during_intro() {
    let mut driver = spawn_driver(vec![0.5]);

    driver.start_run().await.unwrap();
    let err = driver
        .choose_mode(VerificationMode::AgentLocation)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Busy { .. }));

    driver.wait_until_idle().await.unwrap();
    assert!(driver.choose_mode(VerificationMode::AgentLocation).await.is_ok());
    driver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_restart_mid_verification_discards_old_sequence() {
    let mut driver = spawn_driver(vec![0.5]);

    driver.start_run().await.unwrap();
    driver.wait_until_idle().await.unwrap();
    driver.choose_mode(VerificationMode::Remote).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;

    driver.start_run().await.unwrap();
    driver.wait_until_idle().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;

    let snapshot = driver.snapshot().await;
    assert_eq!(snapshot.state, WorkflowState::AwaitingModeChoice);
    assert_eq!(snapshot.run_id.0, 2);
    assert!(snapshot.result.is_none());
    assert!(snapshot
        .log
        .iter()
        .all(|e| matches!(e.speaker, Speaker::Agent | Speaker::Customer)));
    assert_eq!(driver.inspect(KycWorkflow::pending_actions).await, 0);
    driver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_follow_up_and_staff_alert() {
    let mut driver = spawn_driver(vec![0.01, 0.9]);
    let mut rx = driver.subscribe();

    driver.start_run().await.unwrap();
    driver.wait_until_idle().await.unwrap();
    driver.choose_mode(VerificationMode::Remote).await.unwrap();

    let follow_up = rx
        .wait_for(|s| s.state == WorkflowState::AwaitingFollowUp)
        .await
        .unwrap()
        .clone();
    assert_eq!(follow_up.questionnaire.unwrap().len(), 3);

    driver.answer_question(0, "Asha Devi").await.unwrap();
    driver.submit_answers().await.unwrap();

    let alerted = rx
        .wait_for(|s| {
            s.log
                .last()
                .is_some_and(|e| e.speaker == Speaker::Notification)
        })
        .await
        .unwrap()
        .clone();
    assert_eq!(alerted.state, WorkflowState::EscalatedToOffice);
    assert!(alerted.questionnaire.is_none());
    driver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_commands_after_shutdown_fail() {
    let mut driver = spawn_driver(vec![0.5]);
    driver.start_run().await.unwrap();
    driver.shutdown().await;

    assert!(matches!(
        driver.choose_mode(VerificationMode::Remote).await,
        Err(WorkflowError::DriverStopped)
    ));
    assert!(matches!(
        driver.start_run().await,
        Err(WorkflowError::DriverStopped)
    ));
    assert!(matches!(
        driver.set_override(true).await,
        Err(WorkflowError::DriverStopped)
    ));
    // The intro never completes once the timer task is gone
    assert!(driver.snapshot().await.running);
}
