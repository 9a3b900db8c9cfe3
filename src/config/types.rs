use hlsforge_av::HlsSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub reaper: ReaperConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: AuthConfig::default(),
        }
    }
}

/// HTTP Basic credentials required for uploads.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Username for uploads (default: admin)
    #[serde(default = "default_username")]
    pub username: String,

    /// Bcrypt hash of the password (generate with `hlsforge hash-password`)
    #[serde(default)]
    pub password_hash: Option<String>,
}

fn default_username() -> String {
    "admin".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password_hash: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per namespace.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Upload size ceiling in bytes (default: 1 GiB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}
fn default_max_upload_bytes() -> u64 {
    1 << 30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Hard deadline for one engine run (default: 10 minutes).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long to wait for a killed engine to be reaped.
    #[serde(default = "default_kill_grace_secs")]
    pub kill_grace_secs: u64,

    /// Maximum number of engine processes running at once (default: CPU count).
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Explicit ffmpeg path; looked up on PATH when unset.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub hls: HlsSettings,
}

fn default_timeout_secs() -> u64 {
    600
}
fn default_kill_grace_secs() -> u64 {
    5
}
fn default_max_concurrent_jobs() -> usize {
    num_cpus::get().max(1)
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            kill_grace_secs: default_kill_grace_secs(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            ffmpeg_path: None,
            hls: HlsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Cache lifetime of manifests in seconds (segments are always immutable).
    #[serde(default = "default_manifest_max_age")]
    pub manifest_max_age_secs: u64,
}

fn default_manifest_max_age() -> u64 {
    5
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            manifest_max_age_secs: default_manifest_max_age(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReaperConfig {
    #[serde(default = "default_reaper_enabled")]
    pub enabled: bool,

    #[serde(default = "default_reaper_interval")]
    pub interval_secs: u64,

    /// Age after which an incomplete namespace is removed.
    #[serde(default = "default_reaper_grace")]
    pub grace_secs: u64,
}

fn default_reaper_enabled() -> bool {
    true
}
fn default_reaper_interval() -> u64 {
    300
}
fn default_reaper_grace() -> u64 {
    3600
}

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_reaper_enabled(),
            interval_secs: default_reaper_interval(),
            grace_secs: default_reaper_grace(),
        }
    }
}
