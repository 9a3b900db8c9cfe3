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
        "./hlsforge.toml",
        "./config.toml",
        "~/.config/hlsforge/config.toml",
        "/etc/hlsforge/config.toml",
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

    if config.storage.max_upload_bytes == 0 {
        anyhow::bail!("storage.max_upload_bytes must be greater than 0");
    }

    let transcode = &config.transcode;
    if transcode.timeout_secs == 0 {
        anyhow::bail!("transcode.timeout_secs must be greater than 0");
    }
    if transcode.max_concurrent_jobs == 0 {
        anyhow::bail!("transcode.max_concurrent_jobs must be greater than 0");
    }
    if transcode.hls.segment_seconds == 0 {
        anyhow::bail!("transcode.hls.segment_seconds must be greater than 0");
    }
    if transcode.hls.audio_channels == 0 {
        anyhow::bail!("transcode.hls.audio_channels must be greater than 0");
    }
    if let Some(ref path) = transcode.ffmpeg_path {
        if !path.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", path);
        }
    }

    // A namespace still being transcoded has no completion marker yet; the
    // reaper must never catch it.
    if config.reaper.enabled && config.reaper.grace_secs <= transcode.timeout_secs {
        anyhow::bail!(
            "reaper.grace_secs ({}) must exceed transcode.timeout_secs ({})",
            config.reaper.grace_secs,
            transcode.timeout_secs
        );
    }
    if config.reaper.enabled && config.reaper.interval_secs == 0 {
        anyhow::bail!("reaper.interval_secs must be greater than 0");
    }

    Ok(())
}
