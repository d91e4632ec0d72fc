use std::{fs, path::PathBuf, time::Duration};

use anyhow::Context;
use chrono::{FixedOffset, Local, Offset};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "admin.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    /// Token from the environment; wins over the stored one.
    pub token: Option<String>,
    pub token_path: PathBuf,
    pub page_size: usize,
    pub request_timeout_secs: Option<u64>,
    /// Offset used for the "local" calendar day of the date filter.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000/api".into(),
            token: None,
            token_path: PathBuf::from(".admin/token"),
            page_size: client_core::DEFAULT_PAGE_SIZE,
            request_timeout_secs: None,
            utc_offset_minutes: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn day_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Local::now().offset().fix())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    token_path: Option<PathBuf>,
    page_size: Option<usize>,
    request_timeout_secs: Option<u64>,
    utc_offset_minutes: Option<i32>,
}

/// Defaults, then `admin.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(SETTINGS_FILE) {
        Ok(raw) => {
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid settings file '{SETTINGS_FILE}'"))?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{SETTINGS_FILE}'"));
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.token_path {
        settings.token_path = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if file_cfg.request_timeout_secs.is_some() {
        settings.request_timeout_secs = file_cfg.request_timeout_secs;
    }
    if file_cfg.utc_offset_minutes.is_some() {
        settings.utc_offset_minutes = file_cfg.utc_offset_minutes;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ADMIN_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("ADMIN_TOKEN").filter(|v| !v.trim().is_empty()) {
        settings.token = Some(v);
    }

    if let Some(v) = lookup("APP__TOKEN_PATH") {
        settings.token_path = PathBuf::from(v);
    }

    if let Some(parsed) = lookup("APP__PAGE_SIZE").and_then(|v| v.parse::<usize>().ok()) {
        settings.page_size = parsed;
    }

    if let Some(parsed) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok())
    {
        settings.request_timeout_secs = Some(parsed);
    }

    if let Some(parsed) = lookup("APP__UTC_OFFSET_MINUTES").and_then(|v| v.parse::<i32>().ok()) {
        settings.utc_offset_minutes = Some(parsed);
    }
}
