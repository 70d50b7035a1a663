//! Configuration, logging setup and asset loading

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;

use crate::services::api::{ApiConfig, DEFAULT_API_URL};
use crate::services::certificate::CertificateAssets;

pub const TOP_LEFT_IMAGE: &str = "corner_top_left.jpeg";
pub const BOTTOM_RIGHT_IMAGE: &str = "corner_bottom_right.jpeg";
pub const EMBLEM_IMAGE: &str = "emblem.jpeg";
pub const CERTIFICATE_FONT: &str = "certificate.ttf";

/// Runtime settings, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub http_timeout_secs: u64,
    pub log_level: LevelFilter,
    pub assets_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout_secs: 15,
            log_level: LevelFilter::Info,
            assets_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Loads `.env` when present, then reads `BRIGHTMIND_*` variables
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or invalid values keep
    /// their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = value("BRIGHTMIND_API_URL")
            .filter(|url| reqwest::Url::parse(url).is_ok())
            .unwrap_or(defaults.api_url);

        let http_timeout_secs = value("BRIGHTMIND_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.http_timeout_secs);

        let log_level = value("BRIGHTMIND_LOG_LEVEL")
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(defaults.log_level);

        let assets_dir = value("BRIGHTMIND_ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.assets_dir);

        let output_dir = value("BRIGHTMIND_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        Self {
            api_url,
            http_timeout_secs,
            log_level,
            assets_dir,
            output_dir,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            timeout_secs: self.http_timeout_secs,
        }
    }
}

/// Installs the global logger writing `[time level target] message` to stderr
pub fn init_logging(level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()
        .context("failed to install logger")?;
    Ok(())
}

async fn read_asset(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}

/// Reads the certificate template images and the optional font from `dir`
pub async fn load_certificate_assets(dir: &Path) -> Result<CertificateAssets> {
    let font_path = dir.join(CERTIFICATE_FONT);
    let font = match tokio::fs::read(&font_path).await {
        Ok(data) => Some(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} not found, using the built-in font", font_path.display());
            None
        }
        Err(e) => {
            return Err(e).with_context(|| format!("cannot read {}", font_path.display()))
        }
    };

    Ok(CertificateAssets {
        corner_top_left: read_asset(dir, TOP_LEFT_IMAGE).await?,
        corner_bottom_right: read_asset(dir, BOTTOM_RIGHT_IMAGE).await?,
        emblem: read_asset(dir, EMBLEM_IMAGE).await?,
        font,
    })
}
