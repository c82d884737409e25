use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub max_body_bytes: usize,
    /// Tolerated gap between a physical order's quantity and its point total.
    pub rescale_deadband: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8443".into(),
            database_url: "sqlite://./data/server.db".into(),
            max_body_bytes: 64 * 1024,
            rescale_deadband: 5,
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new("server.toml"))
}

/// Defaults, then the optional TOML file, then `APP__*` variables, then the
/// legacy `SERVER_BIND`/`DATABASE_URL` names when no `APP__` value is set.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let defaults = Settings::default();
    let mut settings: Settings = Config::builder()
        .set_default("bind_addr", defaults.bind_addr)?
        .set_default("database_url", defaults.database_url)?
        .set_default(
            "max_body_bytes",
            i64::try_from(defaults.max_body_bytes).unwrap_or(i64::MAX),
        )?
        .set_default("rescale_deadband", i64::from(defaults.rescale_deadband))?
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read settings from '{}'", path.display()))?
        .try_deserialize()
        .context("invalid server settings")?;

    apply_legacy_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_legacy_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if lookup("APP__BIND_ADDR").is_none() {
        if let Some(v) = lookup("SERVER_BIND") {
            settings.bind_addr = v;
        }
    }
    if lookup("APP__DATABASE_URL").is_none() {
        if let Some(v) = lookup("DATABASE_URL") {
            settings.database_url = v;
        }
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
