//! Layered configuration: `folio.ron`, then the environment, then flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use folio_engine::{ClientSettings, NavigationSettings};
use folio_logging::{folio_info, folio_warn};
use serde::{Deserialize, Serialize};

pub const BASE_URL_ENV: &str = "FOLIO_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub verify_answers: bool,
    pub cache_dir: PathBuf,
    pub log_file: PathBuf,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub anchor_ratio: f64,
    /// Timer that issues a parked jump without a mount acknowledgment. The
    /// terminal viewer always acknowledges, so it is off unless configured.
    pub fallback_delay_ms: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        let navigation = NavigationSettings::default();
        Self {
            base_url: client.base_url,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            verify_answers: client.verify_answers,
            cache_dir: PathBuf::from(".folio_cache"),
            log_file: PathBuf::from(folio_logging::DEFAULT_LOG_FILE),
            poll_interval_ms: navigation.poll_interval.as_millis() as u64,
            max_poll_attempts: navigation.max_attempts,
            anchor_ratio: navigation.anchor_ratio,
            fallback_delay_ms: None,
        }
    }
}

impl AppConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };
        let config: AppConfig =
            ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        folio_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
    }

    pub fn apply_flags(&mut self, base_url: Option<&str>) {
        if let Some(url) = base_url {
            self.base_url = url.to_string();
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            verify_answers: self.verify_answers,
        }
    }

    pub fn navigation_settings(&self) -> NavigationSettings {
        let anchor_ratio = if (0.0..=1.0).contains(&self.anchor_ratio) {
            self.anchor_ratio
        } else {
            folio_warn!(
                "anchor_ratio {} outside 0..=1, using default",
                self.anchor_ratio
            );
            NavigationSettings::default().anchor_ratio
        };
        NavigationSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            max_attempts: self.max_poll_attempts,
            anchor_ratio,
            fallback_delay: self.fallback_delay_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load(&temp.path().join("folio.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("folio.ron");
        fs::write(
            &path,
            "(base_url: \"http://files.local:9000\", fallback_delay_ms: Some(250))",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://files.local:9000");
        assert_eq!(config.max_poll_attempts, 30);
        assert_eq!(
            config.navigation_settings().fallback_delay,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("folio.ron");
        fs::write(&path, "(base_url: ").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn flags_override_environment() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == BASE_URL_ENV).then(|| "http://env:1".to_string()));
        assert_eq!(config.base_url, "http://env:1");
        config.apply_flags(Some("http://flag:2"));
        assert_eq!(config.client_settings().base_url, "http://flag:2");
    }

    #[test]
    fn out_of_range_anchor_falls_back() {
        let config = AppConfig {
            anchor_ratio: 3.0,
            ..AppConfig::default()
        };
        assert_eq!(config.navigation_settings().anchor_ratio, 0.15);
    }
}
