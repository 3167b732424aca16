mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./brakewatch.toml",
        "~/.config/brakewatch/config.toml",
        "/etc/brakewatch/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.watch.matcher().is_empty() {
        anyhow::bail!("At least one media extension must be configured");
    }

    if config.transcoder.program.trim().is_empty() {
        anyhow::bail!("Transcoder program cannot be empty");
    }

    if config.transcoder.preset.trim().is_empty() {
        anyhow::bail!("Transcoder preset cannot be empty");
    }

    for (name, path) in [
        ("Input", &config.watch.input_dir),
        ("Output", &config.watch.output_dir),
        ("Source", &config.watch.source_dir),
    ] {
        if !path.as_os_str().is_empty() && !path.exists() {
            tracing::warn!("{} directory does not exist: {:?}", name, path);
        }
    }

    Ok(())
}
