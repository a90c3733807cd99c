use std::{fs, io, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "ssis.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `tracing` filter directive, e.g. `warn` or `client_core=debug`.
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".into(),
            page_size: client_core::page::DEFAULT_PAGE_SIZE,
            timeout_secs: 15,
            username: None,
            password: None,
            log: "warn".into(),
        }
    }
}

impl Settings {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    page_size: Option<u32>,
    timeout_secs: Option<u64>,
    username: Option<String>,
    password: Option<String>,
    log: Option<String>,
}

/// Defaults, then the toml file when it exists, then `SSIS_*` variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file.timeout_secs {
        settings.timeout_secs = v;
    }
    if file.username.is_some() {
        settings.username = file.username;
    }
    if file.password.is_some() {
        settings.password = file.password;
    }
    if let Some(v) = file.log {
        settings.log = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SSIS_API_URL") {
        settings.api_url = v;
    }
    if let Some(parsed) = var("SSIS_PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.page_size = parsed;
    }
    if let Some(parsed) = var("SSIS_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.timeout_secs = parsed;
    }
    if let Some(v) = var("SSIS_USERNAME") {
        settings.username = Some(v);
    }
    if let Some(v) = var("SSIS_PASSWORD") {
        settings.password = Some(v);
    }
    if let Some(v) = var("SSIS_LOG").or_else(|| var("RUST_LOG")) {
        settings.log = v;
    }
}
