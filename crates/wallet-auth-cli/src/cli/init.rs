/*
[INPUT]:  Interactive user input via CLI (or defaults with --yes)
[OUTPUT]: Generated YAML configuration file
[POS]:    CLI initialization layer
[UPDATE]: When AppConfig schema changes
*/

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::path::PathBuf;

use wallet_auth_cli::AppConfig;

pub fn run_init(output: PathBuf, assume_yes: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        if assume_yes {
            bail!("{} already exists, pass --force to overwrite", output.display());
        }
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("{}", style("Nothing written.").dim());
            return Ok(());
        }
    }

    let config = if assume_yes {
        AppConfig::default()
    } else {
        prompt_config()?
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, config.to_yaml()?)
        .with_context(|| format!("failed to write config to {}", output.display()))?;

    println!("{}", style("SUCCESS!").bold().green());
    println!("Configuration written to: {}", style(output.display()).cyan());
    Ok(())
}

fn prompt_config() -> Result<AppConfig> {
    println!("{}", style("Welcome to wallet-auth init").bold().cyan());
    println!(
        "{}",
        style("This will guide you through creating a new configuration.").dim()
    );

    let theme = ColorfulTheme::default();
    let defaults = AppConfig::default();

    let api_base_url: String = Input::with_theme(&theme)
        .with_prompt("Backend API base URL")
        .default(defaults.api_base_url.clone())
        .interact_text()?;

    let app_name: String = Input::with_theme(&theme)
        .with_prompt("Application name shown in sign prompts")
        .default(defaults.app_name.clone())
        .interact_text()?;

    let domain: String = Input::with_theme(&theme)
        .with_prompt("Domain to bind challenges to (empty for none)")
        .allow_empty(true)
        .interact_text()?;

    let wallet_name: String = Input::with_theme(&theme)
        .with_prompt("Local wallet name")
        .default(defaults.wallet_name.clone())
        .interact_text()?;

    let config = AppConfig {
        api_base_url,
        app_name,
        domain: Some(domain.trim().to_string()).filter(|d| !d.is_empty()),
        wallet_name,
        ..defaults
    };
    config.validate()?;
    Ok(config)
}
