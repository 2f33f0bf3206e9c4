use anyhow::{ensure, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::certificate::{CertificateIssuer, DEFAULT_ID_PREFIX};
use crate::timer::Clock;
use crate::verification::{DecisionPolicy, OutcomeDecider, RandomSource};
use crate::workflow::{KycWorkflow, WorkflowTiming};

/// Longest delay any simulated step may be configured with.
pub const MAX_STEP_DELAY_MS: u64 = 24 * 60 * 60 * 1_000;

/// Main configuration structure for the life certificate agent
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LifeCertAgentConfig {
    /// Delays between the simulated steps
    pub timing: WorkflowTiming,
    /// Outcome probabilities
    pub decision: DecisionPolicy,
    /// Certificate id and export settings
    pub certificate: CertificateConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CertificateConfig {
    /// Prefix of generated certificate ids
    pub id_prefix: String,
    /// Directory exported certificates are written to
    pub export_dir: PathBuf,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            export_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directives; `RUST_LOG` overrides it
    pub log_level: String,
    /// Emit JSON log lines instead of compact text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl LifeCertAgentConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (life-cert-agent.toml, .life-cert-agent-rc)
    /// 3. Environment variables (prefixed with LIFE_CERT_AGENT_, nested keys
    ///    separated by `__`)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("life-cert-agent.toml").exists() {
            builder = builder.add_source(File::with_name("life-cert-agent"));
        }

        if Path::new(".life-cert-agent-rc").exists() {
            builder = builder.add_source(
                File::with_name(".life-cert-agent-rc").format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("LIFE_CERT_AGENT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: LifeCertAgentConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load from an explicit TOML file layered over the defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let loaded: LifeCertAgentConfig = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path.as_ref()).format(config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        self.decision.validate()?;
        validate_timing(&self.timing)?;
        ensure!(
            !self.certificate.id_prefix.trim().is_empty(),
            "certificate.id_prefix must not be empty"
        );
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Build a workflow wired with this configuration.
    pub fn build_workflow(
        &self,
        clock: Arc<dyn Clock>,
        source: impl RandomSource + Send + 'static,
    ) -> KycWorkflow {
        KycWorkflow::new(clock, OutcomeDecider::new(self.decision, source))
            .with_timing(self.timing)
            .with_issuer(CertificateIssuer::new(self.certificate.id_prefix.clone()))
    }
}

/// Every delay is bounded, and each sequence's closing step comes no earlier
/// than the narration it follows.
fn validate_timing(timing: &WorkflowTiming) -> Result<()> {
    let delays = [
        ("intro_request_ms", timing.intro_request_ms),
        ("intro_prompt_ms", timing.intro_prompt_ms),
        ("video_capture_ms", timing.video_capture_ms),
        ("biometrics_capture_ms", timing.biometrics_capture_ms),
        ("first_pass_decision_ms", timing.first_pass_decision_ms),
        ("reverify_notice_ms", timing.reverify_notice_ms),
        ("reverify_decision_ms", timing.reverify_decision_ms),
        ("staff_alert_ms", timing.staff_alert_ms),
    ];
    for (name, value) in delays {
        ensure!(
            value <= MAX_STEP_DELAY_MS,
            "timing.{name} must be at most {MAX_STEP_DELAY_MS} ms, got {value}"
        );
    }

    ensure!(
        timing.intro_prompt_ms >= timing.intro_request_ms,
        "timing.intro_prompt_ms must not be shorter than timing.intro_request_ms"
    );
    let longest_capture = timing.video_capture_ms.max(timing.biometrics_capture_ms);
    ensure!(
        timing.first_pass_decision_ms >= longest_capture,
        "timing.first_pass_decision_ms must not be shorter than the capture delays"
    );
    ensure!(
        timing.reverify_decision_ms >= timing.reverify_notice_ms,
        "timing.reverify_decision_ms must not be shorter than timing.reverify_notice_ms"
    );
    Ok(())
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<LifeCertAgentConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = LifeCertAgentConfig::load_env_file();
        LifeCertAgentConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static LifeCertAgentConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
