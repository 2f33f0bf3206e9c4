use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::verification::VerificationMode;

pub mod commands;

#[derive(Parser)]
#[command(name = "life-cert-agent")]
#[command(about = "Simulated life certificate verification for pensioners")]
#[command(
    long_about = "Runs the life certificate verification workflow end to end: intro, \
                  video or biometric capture, optional follow-up questions, and \
                  certificate issuance or escalation to a pension office. \
                  Start with 'life-cert-agent run'."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one verification from greeting to outcome
    Run {
        /// How the customer is verified
        #[arg(
            long,
            value_enum,
            default_value = "remote",
            help = "remote (video) or agent-location (biometrics)"
        )]
        mode: ModeArg,
        /// Force the unsuccessful path on both decisions
        #[arg(long, help = "Force the suspicious and unresolved outcomes")]
        force_failure: bool,
        /// Follow-up answers, in question order
        #[arg(
            long = "answer",
            value_name = "TEXT",
            help = "Answer to the next follow-up question (repeatable)"
        )]
        answers: Vec<String>,
        /// Skip re-verification and ask for an in-person visit
        #[arg(long, help = "Schedule a pension office visit if follow-up is needed")]
        schedule_visit: bool,
        /// Seed for reproducible outcomes
        #[arg(long, help = "Seed the outcome generator for a reproducible run")]
        seed: Option<u64>,
        /// Where the certificate JSON is written
        #[arg(long, help = "Directory for the exported certificate (default from config)")]
        export_dir: Option<PathBuf>,
        /// Collapse every delay to zero
        #[arg(long, help = "Run without the simulated delays")]
        instant: bool,
        /// Print the final snapshot as JSON instead of narration
        #[arg(long, help = "Emit the final workflow snapshot as JSON")]
        json: bool,
    },
    /// Show the effective configuration as TOML
    Config {
        /// Write to a file instead of stdout
        #[arg(long, help = "File path to save the configuration to")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Remote,
    AgentLocation,
}

impl From<ModeArg> for VerificationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Remote => VerificationMode::Remote,
            ModeArg::AgentLocation => VerificationMode::AgentLocation,
        }
    }
}
