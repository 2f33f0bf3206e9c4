use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::certificate::Certificate;
use crate::config::LifeCertAgentConfig;
use crate::timer::MonotonicClock;
use crate::verification::{SeededRandom, ThreadRandom, VerificationMode};
use crate::workflow::{KycWorkflow, WorkflowDriver, WorkflowSnapshot, WorkflowState, WorkflowTiming};

const STAFF_ALERT_POLL: Duration = Duration::from_millis(25);

pub struct RunCommand {
    pub mode: VerificationMode,
    pub force_failure: bool,
    pub answers: Vec<String>,
    pub schedule_visit: bool,
    pub seed: Option<u64>,
    pub export_dir: Option<PathBuf>,
    pub instant: bool,
    pub json: bool,
}

impl RunCommand {
    pub fn new(mode: VerificationMode) -> Self {
        Self {
            mode,
            force_failure: false,
            answers: Vec::new(),
            schedule_visit: false,
            seed: None,
            export_dir: None,
            instant: false,
            json: false,
        }
    }

    pub fn with_force_failure(mut self, force_failure: bool) -> Self {
        self.force_failure = force_failure;
        self
    }

    pub fn with_answers(mut self, answers: Vec<String>) -> Self {
        self.answers = answers;
        self
    }

    pub fn with_schedule_visit(mut self, schedule_visit: bool) -> Self {
        self.schedule_visit = schedule_visit;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_export_dir(mut self, export_dir: Option<PathBuf>) -> Self {
        self.export_dir = export_dir;
        self
    }

    pub fn with_instant(mut self, instant: bool) -> Self {
        self.instant = instant;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self, config: &LifeCertAgentConfig) -> Result<()> {
        let workflow = self.build_workflow(config);
        let mut driver = WorkflowDriver::spawn(workflow);
        let mut narration = Narration::new(driver.subscribe(), !self.json);

        driver.set_override(self.force_failure).await?;
        driver.start_run().await?;
        narration.reset();
        narration.follow(|s| !s.running).await;

        driver.choose_mode(self.mode).await?;
        let settled = narration.follow(|s| !s.running).await;

        if settled.state == WorkflowState::AwaitingFollowUp {
            if self.schedule_visit {
                driver.schedule_visit().await?;
            } else {
                let prompts = settled
                    .questionnaire
                    .as_ref()
                    .map(|q| q.prompts().len())
                    .unwrap_or_default();
                for (index, answer) in self.answers.iter().take(prompts).enumerate() {
                    driver.answer_question(index, answer.as_str()).await?;
                }
                driver.submit_answers().await?;
                narration.follow(|s| !s.running).await;
            }
        }

        // The staff alert lands after the decision that releases the busy gate
        while driver.inspect(KycWorkflow::pending_actions).await > 0 {
            tokio::time::sleep(STAFF_ALERT_POLL).await;
        }

        let succeeded = driver
            .snapshot()
            .await
            .result
            .is_some_and(|r| r.success);
        let exported = if succeeded {
            let certificate = driver.issue_certificate().await?;
            let dir = self
                .export_dir
                .clone()
                .unwrap_or_else(|| config.certificate.export_dir.clone());
            Some(export_certificate(&certificate, &dir)?)
        } else {
            None
        };

        let last = narration.follow(|_| true).await;
        driver.shutdown().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&last)?);
            return Ok(());
        }

        println!();
        match (&last.result, exported) {
            (Some(result), Some(path)) => {
                println!("✅ {}", result.note);
                println!("📄 Certificate written to {}", path.display());
            }
            (Some(result), None) => {
                println!("🏢 {}", result.note);
                println!("💡 Visit your nearest pension office to complete verification");
            }
            (None, _) => println!("⚠️  Run ended without a result"),
        }
        Ok(())
    }

    fn build_workflow(&self, config: &LifeCertAgentConfig) -> KycWorkflow {
        let mut config = config.clone();
        if self.instant {
            config.timing = WorkflowTiming::immediate();
        }

        let clock = Arc::new(MonotonicClock::new());
        match self.seed {
            Some(seed) => config.build_workflow(clock, SeededRandom::new(seed)),
            None => config.build_workflow(clock, ThreadRandom),
        }
    }
}

/// Write `certificate` as `{id}.json` under `dir`, creating the directory.
pub fn export_certificate(certificate: &Certificate, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(certificate.file_name());
    std::fs::write(&path, certificate.to_json_bytes()?)
        .with_context(|| format!("Failed to write certificate to {}", path.display()))?;
    tracing::info!(
        certificate_id = %certificate.id,
        path = %path.display(),
        "Certificate exported"
    );
    Ok(path)
}

/// Prints log lines as snapshots arrive on the watch channel.
struct Narration {
    rx: watch::Receiver<WorkflowSnapshot>,
    printed: usize,
    echo: bool,
}

impl Narration {
    fn new(rx: watch::Receiver<WorkflowSnapshot>, echo: bool) -> Self {
        Self {
            rx,
            printed: 0,
            echo,
        }
    }

    /// Forget what was printed; the log restarts with each run.
    fn reset(&mut self) {
        self.printed = 0;
    }

    /// Print new lines until a snapshot satisfies `done`, returning it.
    async fn follow(&mut self, done: impl Fn(&WorkflowSnapshot) -> bool) -> WorkflowSnapshot {
        loop {
            let snapshot = self.rx.borrow_and_update().clone();
            for entry in snapshot.log.iter().skip(self.printed) {
                if self.echo {
                    println!("{entry}");
                }
            }
            self.printed = snapshot.log.len();

            if done(&snapshot) || self.rx.changed().await.is_err() {
                return snapshot;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateIssuer;
    use crate::verification::{VerificationNote, VerificationResult};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_export_writes_named_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let result = VerificationResult::succeeded(VerificationNote::AutoVerified, at);
        let certificate = CertificateIssuer::default().issue(&result, at).unwrap();

        let path = export_certificate(&certificate, &dir.path().join("certs")).unwrap();

        assert_eq!(path.file_name().unwrap().to_str().unwrap(), certificate.file_name());
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["id"], certificate.id.as_str());
        assert_eq!(written["note"], "Verified automatically");
    }
}
