#![forbid(unsafe_code)]

use crate::error::Error;
use crate::guard::GuardPolicy;
use crate::policy::DirectPolicy;
use crate::recipients::TokenSelection;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PREVIEW_LIMIT: usize = 50;
pub const DEFAULT_ACCESS_TOKEN_ENV: &str = "HERALD_FCM_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_filename: String,
    pub api: ApiConfig,
    pub fanout: FanOutConfig,
    pub push: PushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanOutConfig {
    pub direct_policy: DirectPolicy,
    pub group_guard: GuardPolicy,
    pub unknown_sender_name: String,
    pub default_group_name: String,
    pub preview_limit: usize,
    pub token_selection: TokenSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushTransport {
    Logging,
    Fcm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub transport: PushTransport,
    pub project_id: Option<String>,
    pub endpoint: String,
    pub access_token_env: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().unwrap_or_else(|_| {
                let fallback = std::env::temp_dir().join("herald");
                tracing::warn!(
                    path = %fallback.display(),
                    "Could not determine platform data directory; using ephemeral temp directory"
                );
                fallback
            }),
            db_filename: "herald.db".to_string(),
            api: ApiConfig::default(),
            fanout: FanOutConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            direct_policy: DirectPolicy::DirectWithMirrorGuard,
            group_guard: GuardPolicy::Disabled,
            unknown_sender_name: "Unknown".to_string(),
            default_group_name: "Group chat".to_string(),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            token_selection: TokenSelection::All,
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            transport: PushTransport::Logging,
            project_id: None,
            endpoint: "https://fcm.googleapis.com".to_string(),
            access_token_env: DEFAULT_ACCESS_TOKEN_ENV.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            data_dir: default_data_dir()?,
            ..Self::default()
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, Error> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.fanout.preview_limit == 0 {
            return Err(Error::Config("fanout.preview_limit must be positive".into()));
        }
        if self.push.transport == PushTransport::Fcm && self.push.project_id.is_none() {
            return Err(Error::Config(
                "push.project_id is required for the fcm transport".into(),
            ));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_filename)
    }

    pub fn with_data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = path;
        self
    }

    pub fn with_direct_policy(mut self, policy: DirectPolicy) -> Self {
        self.fanout.direct_policy = policy;
        self
    }

    pub fn with_group_guard(mut self, guard: GuardPolicy) -> Self {
        self.fanout.group_guard = guard;
        self
    }

    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

impl PushConfig {
    pub fn access_token(&self) -> Option<String> {
        std::env::var(&self.access_token_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

fn default_data_dir() -> Result<PathBuf, Error> {
    ProjectDirs::from("io", "herald", "herald")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::Config(
                "Could not determine platform data directory; \
                 please specify --data-dir or set $HOME"
                    .to_string(),
            )
        })
}
