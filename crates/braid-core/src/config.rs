use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::http::HttpOptions;
use crate::request::DEFAULT_JOBS;

/// Configuration loaded from `~/.config/braid/config.toml`. Command-line flags
/// override these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BraidConfig {
    /// Number of parallel range requests.
    pub jobs: usize,
    /// `User-Agent` sent with every request; curl's default when absent.
    #[serde(default)]
    pub user_agent: Option<String>,
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    pub max_redirections: u32,
    /// Reserve the full file size on disk before the workers start.
    #[serde(default)]
    pub preallocate: bool,
}

impl Default for BraidConfig {
    fn default() -> Self {
        let http = HttpOptions::default();
        Self {
            jobs: DEFAULT_JOBS,
            user_agent: None,
            connect_timeout_secs: http.connect_timeout.as_secs(),
            low_speed_limit_bytes: http.low_speed_limit,
            low_speed_time_secs: http.low_speed_time.as_secs(),
            max_redirections: http.max_redirections,
            preallocate: false,
        }
    }
}

impl BraidConfig {
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            max_redirections: self.max_redirections,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("braid")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BraidConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BraidConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BraidConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = BraidConfig::default();
        assert_eq!(cfg.jobs, 5);
        assert!(cfg.user_agent.is_none());
        assert!(!cfg.preallocate);
        assert_eq!(cfg.http_options(), HttpOptions::default());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = BraidConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: BraidConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.jobs, cfg.jobs);
        assert_eq!(parsed.connect_timeout_secs, cfg.connect_timeout_secs);
        assert_eq!(parsed.max_redirections, cfg.max_redirections);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            jobs = 8
            user_agent = "braid-test/1.0"
            connect_timeout_secs = 5
            low_speed_limit_bytes = 0
            low_speed_time_secs = 10
            max_redirections = 2
            preallocate = true
        "#;
        let cfg: BraidConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.jobs, 8);
        assert_eq!(cfg.user_agent.as_deref(), Some("braid-test/1.0"));
        assert!(cfg.preallocate);
        let http = cfg.http_options();
        assert_eq!(http.connect_timeout, Duration::from_secs(5));
        assert_eq!(http.low_speed_limit, 0);
        assert_eq!(http.max_redirections, 2);
    }

    #[test]
    fn config_toml_optional_fields_default() {
        let toml = r#"
            jobs = 2
            connect_timeout_secs = 30
            low_speed_limit_bytes = 1024
            low_speed_time_secs = 60
            max_redirections = 10
        "#;
        let cfg: BraidConfig = toml::from_str(toml).unwrap();
        assert!(cfg.user_agent.is_none());
        assert!(!cfg.preallocate);
    }
}
