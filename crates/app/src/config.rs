use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use simulcheck_core::EngineConfig;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration for persisting sources and tuning between runs.
/// CLI flags override individual fields after loading.
#[derive(Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// YouTube video ID for source A.
    #[serde(default)]
    pub youtube_id: String,
    /// Direct stream URL for source B.
    #[serde(default)]
    pub stream_url: String,
    /// Extra HTTP headers for the source B capture (some CDNs require a
    /// Referer/User-Agent pair).
    #[serde(default)]
    pub stream_headers: Option<String>,

    #[serde(default = "default_chunk_seconds")]
    pub chunk_seconds: u32,
    #[serde(default = "default_sleep_between")]
    pub sleep_between_seconds: u64,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_same_threshold")]
    pub same_threshold: f64,
    #[serde(default = "default_similar_threshold")]
    pub similar_threshold: f64,
    #[serde(default = "default_max_offset")]
    pub max_offset_seconds: f64,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,

    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_seconds: u64,
    #[serde(default = "default_fingerprint_timeout")]
    pub fingerprint_timeout_seconds: u64,
    #[serde(default = "default_compare_timeout")]
    pub compare_timeout_seconds: u64,

    /// Ask fpcalc for the raw integer hash sequence instead of the
    /// compressed string form.
    #[serde(default = "default_raw_fingerprints")]
    pub raw_fingerprints: bool,
    #[serde(default = "default_fpcalc_binary")]
    pub fpcalc_binary: String,
    /// Directory for transient capture and fingerprint WAVs. Defaults to a
    /// subdirectory of the system temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

fn default_chunk_seconds() -> u32 {
    20
}

fn default_sleep_between() -> u64 {
    3
}

fn default_history_size() -> usize {
    5
}

fn default_same_threshold() -> f64 {
    0.50
}

fn default_similar_threshold() -> f64 {
    0.35
}

fn default_max_offset() -> f64 {
    10.0
}

fn default_window_seconds() -> f64 {
    20.0
}

fn default_capture_timeout() -> u64 {
    60
}

fn default_fingerprint_timeout() -> u64 {
    30
}

fn default_compare_timeout() -> u64 {
    10
}

fn default_raw_fingerprints() -> bool {
    true
}

fn default_fpcalc_binary() -> String {
    "fpcalc".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            youtube_id: String::new(),
            stream_url: String::new(),
            stream_headers: None,
            chunk_seconds: default_chunk_seconds(),
            sleep_between_seconds: default_sleep_between(),
            history_size: default_history_size(),
            same_threshold: default_same_threshold(),
            similar_threshold: default_similar_threshold(),
            max_offset_seconds: default_max_offset(),
            window_seconds: default_window_seconds(),
            capture_timeout_seconds: default_capture_timeout(),
            fingerprint_timeout_seconds: default_fingerprint_timeout(),
            compare_timeout_seconds: default_compare_timeout(),
            raw_fingerprints: default_raw_fingerprints(),
            fpcalc_binary: default_fpcalc_binary(),
            work_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from disk, or returns default if not found.
    pub fn load() -> Self {
        if let Some(path) = config_path() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(cfg) = serde_json::from_str(&content) {
                    return cfg;
                }
            }
        }
        Self::default()
    }

    /// Saves configuration to disk in JSON format.
    pub fn save(&self) {
        if let Some(path) = config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = fs::write(path, json);
            }
        }
    }

    /// The engine-side view of this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        let mut cfg = EngineConfig::new(self.same_threshold, self.similar_threshold);
        cfg.history_size = self.history_size;
        cfg.window_seconds = self.window_seconds;
        cfg.max_offset_seconds = self.max_offset_seconds;
        cfg.fingerprint_timeout = Duration::from_secs(self.fingerprint_timeout_seconds);
        cfg.compare_timeout = Duration::from_secs(self.compare_timeout_seconds);
        cfg
    }

    pub fn resolved_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("simulcheck"))
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "simulcheck", "simulcheck")
        .map(|dirs| dirs.config_dir().join("config.json"))
}
