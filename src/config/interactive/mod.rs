
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{Config, PointIdMode, QdrantConfig, SyncConfig};
use crate::index::{QdrantClient, VectorIndex};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Catalog Sync Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Vector Store").bold().yellow());
    eprintln!("Configure the Qdrant instance that receives the catalog collections.");
    eprintln!();

    configure_qdrant(&mut config.qdrant)?;

    eprintln!();
    eprintln!("{}", style("Sync Settings").bold().yellow());
    eprintln!("Every writer and reader of a collection must agree on the vector size.");
    eprintln!();

    configure_sync(&mut config.sync)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_qdrant_connection(&config.qdrant) {
        eprintln!("{}", style("✓ Vector store connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to the vector store").yellow()
        );
        eprintln!("You can continue, but make sure it is reachable before syncing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());

    let mut section = "";
    for (heading, label, value) in summary_lines(&config) {
        if heading != section {
            eprintln!();
            eprintln!("{}", style(format!("{}:", heading)).bold().yellow());
            section = heading;
        }
        eprintln!("  {}: {}", label, style(value).cyan());
    }

    eprintln!();
    match config.qdrant.qdrant_url() {
        Ok(url) => eprintln!("  Qdrant URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Qdrant URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Hide all but the first few characters of a secret
pub(crate) fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

/// (section, label, value) rows shown by `config --show`; secrets are masked
pub(crate) fn summary_lines(config: &Config) -> Vec<(&'static str, &'static str, String)> {
    let unset = || "(not set)".to_string();
    let database_target = config.database.url.as_ref().map_or_else(
        || {
            format!(
                "{}@{}:{}/{}",
                config.database.user, config.database.host, config.database.port, config.database.name
            )
        },
        |url| match url::Url::parse(url) {
            Ok(mut parsed) if parsed.password().is_some() => {
                let _ = parsed.set_password(Some("****"));
                parsed.to_string()
            }
            _ => url.clone(),
        },
    );

    let mut lines = vec![
        (
            "Vector Store",
            "URL",
            config.qdrant.url.clone().unwrap_or_else(unset),
        ),
        (
            "Vector Store",
            "API Key",
            config
                .qdrant
                .api_key
                .as_deref()
                .map_or_else(unset, mask_secret),
        ),
        (
            "Vector Store",
            "Timeout",
            format!("{}s", config.qdrant.timeout_seconds),
        ),
        ("Database", "Target", database_target),
        (
            "Database",
            "Password",
            config
                .database
                .password
                .as_deref()
                .map_or_else(unset, mask_secret),
        ),
        (
            "Database",
            "Max Connections",
            config.database.max_connections.to_string(),
        ),
        ("Sync", "Batch Size", config.sync.batch_size.to_string()),
        ("Sync", "Vector Size", config.sync.vector_size.to_string()),
        (
            "Sync",
            "Point Ids",
            match config.sync.point_ids {
                PointIdMode::Sequential => "sequential".to_string(),
                PointIdMode::SourceKey => "source_key".to_string(),
            },
        ),
        ("Sync", "Table Retries", config.sync.table_retries.to_string()),
        (
            "Ledger",
            "Enabled",
            config.ledger.enabled.to_string(),
        ),
        ("Ledger", "Keep Runs", config.ledger.keep_runs.to_string()),
    ];

    for table in &config.tables {
        lines.push(("Extra Tables", "Table", table.name.clone()));
    }

    lines
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            let base_dir = Config::config_dir().context("Failed to determine config directory")?;
            Ok(Config {
                base_dir,
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_qdrant(qdrant: &mut QdrantConfig) -> Result<()> {
    let url: String = Input::new()
        .with_prompt("Qdrant URL")
        .with_initial_text(qdrant.url.clone().unwrap_or_default())
        .validate_with(|input: &String| -> Result<(), String> {
            QdrantConfig::default()
                .set_url(input.clone())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let api_key = Password::new()
        .with_prompt("Qdrant API key (leave empty for none)")
        .allow_empty_password(true)
        .interact()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout in seconds")
        .default(qdrant.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=600).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 600 seconds")
            }
        })
        .interact_text()?;

    qdrant.set_url(url)?;
    if !api_key.is_empty() || qdrant.api_key.is_none() {
        qdrant.set_api_key(api_key);
    }
    qdrant.set_timeout_seconds(timeout_seconds)?;

    Ok(())
}

fn configure_sync(sync: &mut SyncConfig) -> Result<()> {
    let batch_size: usize = Input::new()
        .with_prompt("Batch size for upserts")
        .default(sync.batch_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 10_000 {
                Err("Batch size must be 10000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let vector_size: usize = Input::new()
        .with_prompt("Vector size")
        .default(sync.vector_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=65_536).contains(input) {
                Ok(())
            } else {
                Err("Vector size must be between 1 and 65536")
            }
        })
        .interact_text()?;

    let modes = &["sequential", "source_key"];
    let default_index = match sync.point_ids {
        PointIdMode::Sequential => 0,
        PointIdMode::SourceKey => 1,
    };
    let mode_index = Select::new()
        .with_prompt("Point id assignment")
        .default(default_index)
        .items(modes)
        .interact()?;

    let table_retries: u32 = Input::new()
        .with_prompt("Retries per failed table")
        .default(sync.table_retries)
        .interact_text()?;

    sync.set_batch_size(batch_size)?;
    sync.set_vector_size(vector_size)?;
    sync.point_ids = if mode_index == 0 {
        PointIdMode::Sequential
    } else {
        PointIdMode::SourceKey
    };
    sync.set_table_retries(table_retries)?;

    Ok(())
}

fn test_qdrant_connection(qdrant: &QdrantConfig) -> bool {
    let client = match QdrantClient::new(qdrant) {
        Ok(client) => client.with_timeout(std::time::Duration::from_secs(5)),
        Err(_) => return false,
    };

    client.list_collections().is_ok()
}
