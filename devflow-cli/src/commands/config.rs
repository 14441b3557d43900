//! `flow config show|init`

use anyhow::{Context, Result};
use clap::Subcommand;

use devflow_core::config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML.
    Show,
    /// Write the default configuration unless a file already exists.
    Init,
}

pub fn run(command: ConfigCommand) -> Result<u8> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    match command {
        ConfigCommand::Show => {
            let cfg = config::load_at(&home).context("failed to load config")?;
            println!("# {}", config::config_path_at(&home).display());
            print!(
                "{}",
                serde_yaml::to_string(&cfg).context("failed to render config YAML")?
            );
        }
        ConfigCommand::Init => {
            let path = config::config_path_at(&home);
            if path.exists() {
                println!("config already exists: {}", path.display());
                return Ok(0);
            }
            let path = config::save_at(&home, &config::FlowConfig::default())
                .context("failed to write config")?;
            println!("wrote {}", path.display());
        }
    }
    Ok(0)
}
