use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use client_core::{ClientOptions, DEFAULT_API_URL, DEFAULT_PAGE_SIZE};
use tracing::warn;

pub const CONFIG_FILE: &str = "onboarding.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub state_path: PathBuf,
    pub request_timeout_secs: u64,
    pub list_page_size: u32,
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            state_path: default_state_path(),
            request_timeout_secs: 30,
            list_page_size: DEFAULT_PAGE_SIZE,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Command-line flags win over every other layer.
    pub fn with_overrides(mut self, api_url: Option<String>, state_path: Option<PathBuf>) -> Self {
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        if let Some(state_path) = state_path {
            self.state_path = state_path;
        }
        self
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_url: self.api_url.trim().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            page_size: self.list_page_size,
        }
    }
}

pub fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("onboarding_review")
        .join("session.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(err) => warn!("config: ignoring '{}': {err}", path.display()),
        }
    }

    if let Some(v) = env("ONBOARDING_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__STATE_PATH") {
        settings.state_path = PathBuf::from(v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        set_parsed(&mut settings.request_timeout_secs, "APP__REQUEST_TIMEOUT_SECS", &v);
    }
    if let Some(v) = env("APP__LIST_PAGE_SIZE") {
        set_parsed(&mut settings.list_page_size, "APP__LIST_PAGE_SIZE", &v);
    }
    if let Some(v) = env("APP__EXPORT_DIR") {
        settings.export_dir = PathBuf::from(v);
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("api_url") {
        settings.api_url = v.clone();
    }
    if let Some(v) = file_cfg.get("state_path") {
        settings.state_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        set_parsed(&mut settings.request_timeout_secs, "request_timeout_secs", v);
    }
    if let Some(v) = file_cfg.get("list_page_size") {
        set_parsed(&mut settings.list_page_size, "list_page_size", v);
    }
    if let Some(v) = file_cfg.get("export_dir") {
        settings.export_dir = PathBuf::from(v);
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!("config: ignoring non-numeric {key} '{raw}'"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
