use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{
    Config, ENV_DISTANCE_METRIC, ENV_QDRANT_API_KEY, ENV_QDRANT_URL, OutputFormat, ResolvedConfig,
};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(long, short = 'f', help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show {
        #[arg(long, help = "Show which values come from the environment")]
        source: bool,
    },
    #[command(about = "Show configuration file paths")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => handle_init(force, formatter.as_ref()),
        ConfigCommand::Show { source } => handle_show(source, format),
        ConfigCommand::Path => handle_path(),
    }
}

fn handle_init(force: bool, formatter: &dyn Formatter) -> Result<()> {
    let config_path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default().save().context("failed to create config")?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );

    Ok(())
}

fn handle_show(show_source: bool, format: OutputFormat) -> Result<()> {
    let resolved = Config::load()?;

    if format == OutputFormat::Json {
        let mut config = serde_json::to_value(&resolved.config)?;
        if let Some(key) = config.pointer_mut("/vector_store/api_key")
            && key.is_string()
        {
            *key = serde_json::json!("********");
        }
        if show_source {
            let output = serde_json::json!({
                "config": config,
                "path": resolved.path,
                "env_overrides": resolved.env_overrides,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        return Ok(());
    }

    match resolved.path {
        Some(ref path) => println!("# Config: {}", path.display()),
        None => println!("# Config: defaults (no config file)"),
    }
    println!();

    print_resolved_config(&resolved, show_source);

    Ok(())
}

fn print_resolved_config(resolved: &ResolvedConfig, show_source: bool) {
    let config = &resolved.config;
    let src = |var: &str| {
        if show_source && resolved.env_overrides.iter().any(|v| *v == var) {
            format!("  # env {var}")
        } else {
            String::new()
        }
    };

    println!("[vector_store]");
    println!("url = \"{}\"{}", config.vector_store.url, src(ENV_QDRANT_URL));
    if config.vector_store.api_key.is_some() {
        println!("api_key = \"********\"{}", src(ENV_QDRANT_API_KEY));
    }
    println!("timeout_secs = {}", config.vector_store.timeout_secs);
    println!();

    let agg = &config.aggregation;
    println!("[aggregation]");
    println!("method = \"{}\"", agg.method);
    println!("trim_percentage = {}", agg.trim_percentage);
    println!("clusters = {}", agg.clusters);
    println!("distance = \"{}\"{}", agg.distance, src(ENV_DISTANCE_METRIC));
    println!("scroll_batch_size = {}", agg.scroll_batch_size);
    println!("upsert_batch_size = {}", agg.upsert_batch_size);
    println!();

    println!("[output]");
    println!("default_format = \"{}\"", config.output.default_format);
}

fn handle_path() -> Result<()> {
    println!("Configuration paths:");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("Config (active): {}", path.display());
        } else {
            println!("Config (would be): {}", path.display());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        if env_path.exists() {
            println!(".env file (active): {}", env_path.display());
        } else {
            println!(".env file (would be): {}", env_path.display());
        }
    }

    Ok(())
}
