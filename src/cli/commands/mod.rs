use anyhow::Result;

pub mod config;
pub mod run;

pub use config::ConfigCommand;
pub use run::{export_certificate, RunCommand};

pub fn show_how_to_get_started() -> Result<()> {
    println!("🪪 Life Certificate Agent - simulated pensioner verification");
    println!();
    println!("To get started:");
    println!("  ▶️  life-cert-agent run                        # Remote video verification");
    println!("  📍 life-cert-agent run --mode agent-location  # Biometrics at an agent location");
    println!("  ⚙️  life-cert-agent config                     # Show effective configuration");
    println!();
    println!("💡 Add --force-failure to walk through follow-up questions and escalation.");
    Ok(())
}
