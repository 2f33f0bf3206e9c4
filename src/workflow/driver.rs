//! Async driver that runs a workflow's timer queue on tokio.
//!
//! Commands go through the driver, which holds the workflow behind an async
//! mutex. A background task sleeps until the next deadline (or until a command
//! queues something new), fires due actions and publishes a fresh snapshot on
//! a watch channel after every change.
//!
//! The driver sleeps on tokio time, so the workflow should use a clock that
//! follows it ([`MonotonicClock`](crate::timer::MonotonicClock) or
//! [`SystemClock`](crate::timer::SystemClock)).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

use super::error::WorkflowError;
use super::machine::KycWorkflow;
use super::types::WorkflowSnapshot;
use crate::certificate::Certificate;
use crate::telemetry::create_workflow_span;
use crate::timer::Clock;
use crate::verification::VerificationMode;

struct Shared {
    workflow: Mutex<KycWorkflow>,
    wake: Notify,
    stopped: AtomicBool,
    snapshots: watch::Sender<WorkflowSnapshot>,
}

impl Shared {
    fn publish(&self, workflow: &KycWorkflow) {
        self.snapshots.send_replace(workflow.snapshot());
    }
}

pub struct WorkflowDriver {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkflowDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDriver")
            .field("running", &self.task.is_some())
            .field("snapshot", &*self.shared.snapshots.borrow())
            .finish()
    }
}

impl WorkflowDriver {
    /// Take ownership of `workflow` and start its timer task on the current
    /// tokio runtime.
    pub fn spawn(workflow: KycWorkflow) -> Self {
        let clock = workflow.clock();
        let span = create_workflow_span("timer_loop", &workflow.id().to_string(), None);
        let (snapshots, _) = watch::channel(workflow.snapshot());

        let shared = Arc::new(Shared {
            workflow: Mutex::new(workflow),
            wake: Notify::new(),
            stopped: AtomicBool::new(false),
            snapshots,
        });

        let task = tokio::spawn(run_timers(Arc::clone(&shared), clock).instrument(span));

        Self {
            shared,
            task: Some(task),
        }
    }

    pub async fn start_run(&self) -> Result<(), WorkflowError> {
        self.command(|wf| {
            wf.start_run();
            Ok(())
        })
        .await
    }

    pub async fn choose_mode(&self, mode: VerificationMode) -> Result<(), WorkflowError> {
        self.command(|wf| wf.choose_mode(mode)).await
    }

    pub async fn set_override(&self, force_failure: bool) -> Result<(), WorkflowError> {
        self.command(|wf| {
            wf.set_override(force_failure);
            Ok(())
        })
        .await
    }

    pub async fn answer_question(
        &self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let text = text.into();
        self.command(move |wf| wf.answer_question(index, text)).await
    }

    pub async fn submit_answers(&self) -> Result<(), WorkflowError> {
        self.command(KycWorkflow::submit_answers).await
    }

    pub async fn schedule_visit(&self) -> Result<(), WorkflowError> {
        self.command(KycWorkflow::schedule_visit).await
    }

    pub async fn issue_certificate(&self) -> Result<Certificate, WorkflowError> {
        self.command(KycWorkflow::issue_certificate).await
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.shared.workflow.lock().await.snapshot()
    }

    /// Read access to the workflow for anything the snapshot does not carry.
    pub async fn inspect<R>(&self, f: impl FnOnce(&KycWorkflow) -> R) -> R {
        let workflow = self.shared.workflow.lock().await;
        f(&*workflow)
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Wait until no sequence is in flight and return that snapshot.
    pub async fn wait_until_idle(&self) -> Result<WorkflowSnapshot, WorkflowError> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(|s| !s.running)
            .await
            .map_err(|_| WorkflowError::DriverStopped)?;
        Ok(snapshot.clone())
    }

    /// Stop the timer task. Pending actions are left unfired and later
    /// commands fail with [`WorkflowError::DriverStopped`].
    pub async fn shutdown(&mut self) {
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.wake.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "Timer task ended abnormally");
            }
        }
        info!("Workflow driver stopped");
    }

    async fn command<T>(
        &self,
        f: impl FnOnce(&mut KycWorkflow) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        if self.shared.stopped.load(Ordering::Acquire) {
            return Err(WorkflowError::DriverStopped);
        }
        let mut workflow = self.shared.workflow.lock().await;
        let outcome = f(&mut *workflow);
        if outcome.is_ok() {
            self.shared.publish(&workflow);
            self.shared.wake.notify_one();
        }
        outcome
    }
}

impl Drop for WorkflowDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_timers(shared: Arc<Shared>, clock: Arc<dyn Clock>) {
    debug!("Timer task started");
    loop {
        if shared.stopped.load(Ordering::Acquire) {
            break;
        }

        let deadline = {
            let mut workflow = shared.workflow.lock().await;
            if workflow.fire_due() > 0 {
                shared.publish(&workflow);
            }
            workflow.next_deadline()
        };

        match deadline {
            Some(at) => {
                let wait = (at - clock.now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
    }
    debug!("Timer task exiting");
}
