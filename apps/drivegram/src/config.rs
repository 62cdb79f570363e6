//! Runtime configuration.
//!
//! Read from a TOML file (default `drivegram.toml` in the working
//! directory), then overridden by environment variables, which may come
//! from a `.env` file:
//!
//! | Variable | Field |
//! |---|---|
//! | `TELEGRAM_BOT_TOKEN` | `telegram.bot_token` |
//! | `CHANNEL_ID` | `telegram.channel_id` |
//! | `SERVICE_ACCOUNT_FILE` | `drive.service_account_file` |
//! | `MAX_SIZE` | `max_part_size` |
//! | `SCRATCH_DIR` | `scratch_dir` |

use std::path::{Path, PathBuf};

use drivegram_mirror::PartFailurePolicy;
use drivegram_transfer::DEFAULT_MAX_PART_SIZE;
use serde::{Deserialize, Deserializer};

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "drivegram.toml";

/// Upload cap of the public Bot API server.
pub const PUBLIC_API_UPLOAD_LIMIT: u64 = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("max_part_size must be greater than zero")]
    ZeroPartSize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for downloaded artifacts and their parts.
    pub scratch_dir: PathBuf,

    /// Files larger than this are split into parts of at most this size.
    pub max_part_size: u64,

    #[serde(deserialize_with = "deserialize_policy")]
    pub part_failure_policy: PartFailurePolicy,

    pub telegram: TelegramConfig,
    pub drive: DriveConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Numeric chat id (`-100...`) or `@channel` username.
    pub channel_id: String,
    /// Bot API server; point at a local server to upload above 50 MB.
    pub api_url: String,
    pub max_flood_waits: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub service_account_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("drivegram-scratch"),
            max_part_size: DEFAULT_MAX_PART_SIZE,
            part_failure_policy: PartFailurePolicy::default(),
            telegram: TelegramConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: String::new(),
            api_url: drivegram_telegram::DEFAULT_API_URL.into(),
            max_flood_waits: drivegram_telegram::DEFAULT_MAX_FLOOD_WAITS,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            service_account_file: PathBuf::from("service_account.json"),
        }
    }
}

fn deserialize_policy<'de, D: Deserializer<'de>>(d: D) -> Result<PartFailurePolicy, D::Error> {
    let raw = String::deserialize(d)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl Config {
    /// Loads `path` and applies environment overrides.
    ///
    /// A missing file is only an error when it was asked for explicitly;
    /// otherwise everything can come from the environment.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        Self::load_with(path, explicit, |name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load), with overrides looked up via `lookup`.
    fn load_with(
        path: &Path,
        explicit: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = if path.exists() || explicit {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Config::default()
        };

        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Applies the environment variable overrides, looked up via `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(channel) = lookup("CHANNEL_ID") {
            self.telegram.channel_id = channel;
        }
        if let Some(file) = lookup("SERVICE_ACCOUNT_FILE") {
            self.drive.service_account_file = PathBuf::from(file);
        }
        if let Some(dir) = lookup("SCRATCH_DIR") {
            self.scratch_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("MAX_SIZE") {
            self.max_part_size = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: "MAX_SIZE",
                    value,
                })?;
        }
        Ok(())
    }

    /// Checks that everything needed for a run is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("telegram bot token (TELEGRAM_BOT_TOKEN)"));
        }
        if self.telegram.channel_id.trim().is_empty() {
            return Err(ConfigError::Missing("channel id (CHANNEL_ID)"));
        }
        if self.drive.service_account_file.as_os_str().is_empty() {
            return Err(ConfigError::Missing(
                "service account key file (SERVICE_ACCOUNT_FILE)",
            ));
        }
        if self.max_part_size == 0 {
            return Err(ConfigError::ZeroPartSize);
        }
        Ok(())
    }

    /// True when parts may exceed what the configured Bot API server accepts.
    pub fn exceeds_public_upload_limit(&self) -> bool {
        let public = self
            .telegram
            .api_url
            .trim_end_matches('/')
            .eq_ignore_ascii_case(drivegram_telegram::DEFAULT_API_URL);
        public && self.max_part_size > PUBLIC_API_UPLOAD_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn valid() -> Config {
        let mut config = Config::default();
        config.telegram.bot_token = "123:ABC".into();
        config.telegram.channel_id = "-100123".into();
        config
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.scratch_dir, PathBuf::from("drivegram-scratch"));
        assert_eq!(config.max_part_size, 1900 * 1024 * 1024);
        assert_eq!(config.part_failure_policy, PartFailurePolicy::Continue);
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.telegram.max_flood_waits, 3);
        assert_eq!(
            config.drive.service_account_file,
            PathBuf::from("service_account.json")
        );
    }

    #[test]
    fn partial_toml() {
        let config: Config = toml::from_str(
            r#"
            max_part_size = 1048576
            part_failure_policy = "abort"

            [telegram]
            channel_id = "@mirror"
            api_url = "http://localhost:8081"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_part_size, 1_048_576);
        assert_eq!(config.part_failure_policy, PartFailurePolicy::Abort);
        assert_eq!(config.telegram.channel_id, "@mirror");
        assert_eq!(config.telegram.api_url, "http://localhost:8081");
        assert_eq!(config.telegram.max_flood_waits, 3);
        assert_eq!(config.scratch_dir, PathBuf::from("drivegram-scratch"));
    }

    #[test]
    fn unknown_policy_rejected() {
        let result: Result<Config, _> = toml::from_str(r#"part_failure_policy = "retry""#);
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "from-file"
            channel_id = "@file"
            "#,
        )
        .unwrap();
        config
            .apply_overrides(env(&[
                ("TELEGRAM_BOT_TOKEN", "from-env"),
                ("SERVICE_ACCOUNT_FILE", "/secrets/sa.json"),
                ("MAX_SIZE", "2048"),
                ("SCRATCH_DIR", "/tmp/mirror"),
            ]))
            .unwrap();

        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.telegram.channel_id, "@file");
        assert_eq!(
            config.drive.service_account_file,
            PathBuf::from("/secrets/sa.json")
        );
        assert_eq!(config.max_part_size, 2048);
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/mirror"));
    }

    #[test]
    fn invalid_max_size_env() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("MAX_SIZE", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "MAX_SIZE", .. }));
    }

    #[test]
    fn validate_requires_credentials() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.telegram.bot_token.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        let mut config = valid();
        config.telegram.channel_id = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        let mut config = valid();
        config.drive.service_account_file = PathBuf::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn validate_rejects_zero_part_size() {
        let mut config = valid();
        config.max_part_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPartSize)));
    }

    #[test]
    fn public_upload_limit() {
        let mut config = valid();
        assert!(config.exceeds_public_upload_limit());

        config.max_part_size = PUBLIC_API_UPLOAD_LIMIT;
        assert!(!config.exceeds_public_upload_limit());

        config.max_part_size = DEFAULT_MAX_PART_SIZE;
        config.telegram.api_url = "http://localhost:8081".into();
        assert!(!config.exceeds_public_upload_limit());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("drivegram.toml");
        std::fs::write(
            &path,
            "part_failure_policy = \"abort\"\n[telegram]\napi_url = \"http://127.0.0.1:8081\"\n",
        )
        .unwrap();

        let config = Config::load_with(&path, true, env(&[])).unwrap();
        assert_eq!(config.part_failure_policy, PartFailurePolicy::Abort);
        assert_eq!(config.telegram.api_url, "http://127.0.0.1:8081");
        assert_eq!(config.max_part_size, DEFAULT_MAX_PART_SIZE);

        let config = Config::load_with(&path, true, env(&[("MAX_SIZE", "4096")])).unwrap();
        assert_eq!(config.max_part_size, 4096);
        assert_eq!(config.part_failure_policy, PartFailurePolicy::Abort);
    }

    #[test]
    fn implicit_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);

        let config = Config::load_with(&path, false, env(&[("CHANNEL_ID", "@env")])).unwrap();
        assert_eq!(config.telegram.channel_id, "@env");
        assert_eq!(config.max_part_size, DEFAULT_MAX_PART_SIZE);
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        assert!(matches!(
            Config::load_with(&path, true, env(&[])),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "max_part_size = \"big\"").unwrap();
        assert!(matches!(
            Config::load_with(&path, true, env(&[])),
            Err(ConfigError::Parse(_))
        ));
    }
}
