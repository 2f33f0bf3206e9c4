use anyhow::Result;
use std::path::PathBuf;

use crate::config::LifeCertAgentConfig;

pub struct ConfigCommand {
    pub output: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    pub fn execute(&self, config: &LifeCertAgentConfig) -> Result<()> {
        match &self.output {
            Some(path) => {
                config.save_to_file(path)?;
                println!("💾 Configuration saved to {}", path.display());
            }
            None => print!("{}", toml::to_string_pretty(config)?),
        }
        Ok(())
    }
}
