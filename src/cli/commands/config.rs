//! Config command: print the effective configuration.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigReport {
    config: Config,
}

impl CommandOutput for ConfigReport {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|err| format!("<unable to render config: {err}>"))
    }
}

pub fn execute(_args: ConfigArgs, config: &Config, json_mode: bool) -> Result<()> {
    let report = ConfigReport {
        config: config.clone(),
    };
    serde_json::to_value(&report).context("configuration is not serializable")?;
    output(&report, json_mode);
    Ok(())
}
