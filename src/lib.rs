pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::compare::CompareArgs;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Compare(CompareArgs),
    Setup,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    match command {
        AppCommand::Setup => match config_path {
            Some(path) => cli::setup::setup_at_path(path),
            None => cli::setup::setup(),
        },
        AppCommand::Compare(args) => {
            info!("Remittance comparison starting...");
            let result = match load_config(config_path) {
                Ok(config) => cli::compare::run(&args, config).await,
                Err(e) => Err(e),
            };
            if let Err(e) = &result
                && args.json
            {
                println!("{}", cli::compare::error_json(e));
            }
            result
        }
    }
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}
