use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, bail, Context};
use bridge_core::{
    backoff::{DEFAULT_MAX_RECONNECT_DELAY, DEFAULT_RECONNECT_DELAY},
    BridgeConfig, ReconnectPolicy, DEFAULT_LIGHTING_STATUS_URL, DEFAULT_LIGHTING_URL,
    DEFAULT_MIXER_URL,
};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectStrategy {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mixer_url: String,
    pub lighting_url: String,
    pub lighting_status_url: String,
    pub mappings_path: PathBuf,
    pub reconnect_strategy: ReconnectStrategy,
    pub reconnect_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mixer_url: DEFAULT_MIXER_URL.into(),
            lighting_url: DEFAULT_LIGHTING_URL.into(),
            lighting_status_url: DEFAULT_LIGHTING_STATUS_URL.into(),
            mappings_path: PathBuf::from("mappings.json"),
            reconnect_strategy: ReconnectStrategy::Fixed,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY.as_millis() as u64,
            reconnect_max_delay_ms: DEFAULT_MAX_RECONNECT_DELAY.as_millis() as u64,
            log_filter: "info".into(),
        }
    }
}

/// Every key is optional; absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    mixer_url: Option<String>,
    lighting_url: Option<String>,
    lighting_status_url: Option<String>,
    mappings_path: Option<PathBuf>,
    reconnect_strategy: Option<ReconnectStrategy>,
    reconnect_delay_ms: Option<u64>,
    reconnect_max_delay_ms: Option<u64>,
    log_filter: Option<String>,
}

impl Settings {
    pub fn bridge_config(&self) -> BridgeConfig {
        let delay = Duration::from_millis(self.reconnect_delay_ms);
        let reconnect = match self.reconnect_strategy {
            ReconnectStrategy::Fixed => ReconnectPolicy::Fixed { delay },
            ReconnectStrategy::Exponential => ReconnectPolicy::Exponential {
                initial: delay,
                max: Duration::from_millis(self.reconnect_max_delay_ms).max(delay),
            },
        };
        BridgeConfig {
            mixer_url: self.mixer_url.clone(),
            lighting_url: self.lighting_url.clone(),
            lighting_status_url: self.lighting_status_url.clone(),
            reconnect,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        check_url("mixer_url", &self.mixer_url, &["ws", "wss"])?;
        check_url("lighting_url", &self.lighting_url, &["ws", "wss"])?;
        check_url(
            "lighting_status_url",
            &self.lighting_status_url,
            &["http", "https"],
        )?;
        if self.reconnect_delay_ms == 0 {
            bail!("reconnect_delay_ms must be greater than zero");
        }
        Ok(())
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.mixer_url {
            self.mixer_url = v;
        }
        if let Some(v) = file_cfg.lighting_url {
            self.lighting_url = v;
        }
        if let Some(v) = file_cfg.lighting_status_url {
            self.lighting_status_url = v;
        }
        if let Some(v) = file_cfg.mappings_path {
            self.mappings_path = v;
        }
        if let Some(v) = file_cfg.reconnect_strategy {
            self.reconnect_strategy = v;
        }
        if let Some(v) = file_cfg.reconnect_delay_ms {
            self.reconnect_delay_ms = v;
        }
        if let Some(v) = file_cfg.reconnect_max_delay_ms {
            self.reconnect_max_delay_ms = v;
        }
        if let Some(v) = file_cfg.log_filter {
            self.log_filter = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("BRIDGE_MIXER_URL") {
            self.mixer_url = v;
        }
        if let Some(v) = lookup("BRIDGE_LIGHTING_URL") {
            self.lighting_url = v;
        }
        if let Some(v) = lookup("BRIDGE_LIGHTING_STATUS_URL") {
            self.lighting_status_url = v;
        }
        if let Some(v) = lookup("BRIDGE_MAPPINGS_PATH") {
            self.mappings_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("BRIDGE_RECONNECT_STRATEGY") {
            self.reconnect_strategy = match v.trim() {
                "fixed" => ReconnectStrategy::Fixed,
                "exponential" => ReconnectStrategy::Exponential,
                other => bail!("BRIDGE_RECONNECT_STRATEGY must be fixed or exponential, got {other:?}"),
            };
        }
        if let Some(v) = lookup("BRIDGE_RECONNECT_DELAY_MS") {
            self.reconnect_delay_ms = parse_millis("BRIDGE_RECONNECT_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("BRIDGE_RECONNECT_MAX_DELAY_MS") {
            self.reconnect_max_delay_ms = parse_millis("BRIDGE_RECONNECT_MAX_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("BRIDGE_LOG_FILTER") {
            self.log_filter = v;
        }
        Ok(())
    }
}

/// Defaults, then the settings file if present, then `BRIDGE_*` environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?;
            settings.apply_file(file_cfg);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    }

    settings.apply_env(lookup)?;
    Ok(settings)
}

fn parse_millis(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got {raw:?}"))
}

fn check_url(key: &str, raw: &str, schemes: &[&str]) -> anyhow::Result<()> {
    let url = Url::parse(raw).with_context(|| format!("{key} is not a valid url: {raw:?}"))?;
    if !schemes.contains(&url.scheme()) {
        return Err(anyhow!(
            "{key} must use one of {schemes:?}, got '{}'",
            url.scheme()
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
