//! Agent configuration
//!
//! Loaded from a JSON file once at startup, and again whenever the remote
//! session is rebuilt after a token expiry. The connection keys are flat
//! (`fm_server_address`, `fm_file`, `fm_layout`, `fm_account`, `fm_pw`);
//! everything else lives in optional `agent` and `hardware` sections.

use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use sensehat_shared::{timing, GAP_SCRIPT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SENSEHAT_AGENT_CONFIG";

/// Environment variable overriding `fm_pw`
pub const PASSWORD_ENV: &str = "FM_PW";

/// Config file used when neither an argument nor the env variable is given
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Upper bound for every millisecond setting (one day)
const MAX_MILLIS: u64 = 24 * 60 * 60 * 1000;

/// Connection and credential parameters for the Data API server
#[derive(Clone, Deserialize)]
pub struct ServerSettings {
    pub fm_server_address: String,
    pub fm_file: String,
    pub fm_layout: String,
    pub fm_account: String,
    pub fm_pw: String,
}

impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("fm_server_address", &self.fm_server_address)
            .field("fm_file", &self.fm_file)
            .field("fm_layout", &self.fm_layout)
            .field("fm_account", &self.fm_account)
            .field("fm_pw", &"<redacted>")
            .finish()
    }
}

impl ServerSettings {
    fn validate(&self) -> Result<()> {
        let required = [
            ("fm_server_address", &self.fm_server_address),
            ("fm_file", &self.fm_file),
            ("fm_layout", &self.fm_layout),
            ("fm_account", &self.fm_account),
            ("fm_pw", &self.fm_pw),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                bail!("Config key {} must not be empty", key);
            }
        }
        Ok(())
    }
}

/// Cycle timing and upload behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Timer period
    pub tick_interval_ms: u64,
    /// Token age at which the session is retired
    pub token_max_age_secs: i64,
    /// Hold before the matrix is cleared at the end of every cycle
    pub cycle_end_hold_ms: u64,
    /// Red overlay hold after a failed upload
    pub upload_failure_hold_ms: u64,
    /// Amber overlay hold after a failed login
    pub auth_failure_hold_ms: u64,
    /// Script run by the server after each record
    pub script_name: String,
    pub request_timeout_ms: u64,
    /// Accept self-signed server certificates
    pub accept_invalid_certs: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: timing::DEFAULT_TICK_INTERVAL_MS,
            token_max_age_secs: timing::TOKEN_MAX_AGE_SECS,
            cycle_end_hold_ms: timing::CYCLE_END_HOLD_MS,
            upload_failure_hold_ms: timing::UPLOAD_FAILURE_HOLD_MS,
            auth_failure_hold_ms: timing::AUTH_FAILURE_HOLD_MS,
            script_name: GAP_SCRIPT.into(),
            request_timeout_ms: timing::REQUEST_TIMEOUT_MS,
            accept_invalid_certs: false,
        }
    }
}

impl AgentSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Falls back to the default age for values `validate` rejects
    pub fn token_max_age(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.token_max_age_secs)
            .unwrap_or_else(|| TimeDelta::seconds(timing::TOKEN_MAX_AGE_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("agent.tick_interval_ms must be greater than zero");
        }

        let millis = [
            ("agent.tick_interval_ms", self.tick_interval_ms),
            ("agent.cycle_end_hold_ms", self.cycle_end_hold_ms),
            ("agent.upload_failure_hold_ms", self.upload_failure_hold_ms),
            ("agent.auth_failure_hold_ms", self.auth_failure_hold_ms),
            ("agent.request_timeout_ms", self.request_timeout_ms),
        ];
        for (key, value) in millis {
            if value > MAX_MILLIS {
                bail!("{} must not exceed {} ms", key, MAX_MILLIS);
            }
        }

        if self.token_max_age_secs <= 0 {
            bail!("agent.token_max_age_secs must be greater than zero");
        }
        if TimeDelta::try_seconds(self.token_max_age_secs).is_none() {
            bail!(
                "agent.token_max_age_secs is out of range: {}",
                self.token_max_age_secs
            );
        }
        Ok(())
    }
}

/// Hardware backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareMode {
    /// Real Sense HAT through the Linux drivers
    #[default]
    SenseHat,
    /// Generated readings and a logging matrix (for development)
    Simulation,
}

/// Where the Linux drivers expose the Sense HAT
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    pub mode: HardwareMode,
    /// IIO device directory (hts221, lps25h)
    pub iio_root: PathBuf,
    /// Framebuffer class directory, searched for the Sense HAT matrix
    pub graphics_root: PathBuf,
    /// Explicit framebuffer device, skips the search
    pub framebuffer: Option<PathBuf>,
    pub cpuinfo_path: PathBuf,
    pub device_tree_model_path: PathBuf,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            mode: HardwareMode::SenseHat,
            iio_root: PathBuf::from("/sys/bus/iio/devices"),
            graphics_root: PathBuf::from("/sys/class/graphics"),
            framebuffer: None,
            cpuinfo_path: PathBuf::from("/proc/cpuinfo"),
            device_tree_model_path: PathBuf::from("/proc/device-tree/model"),
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(flatten)]
    pub server: ServerSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub hardware: HardwareSettings,
}

impl AgentConfig {
    /// Parse and validate a configuration document
    pub fn from_json(text: &str, password_override: Option<String>) -> Result<Self> {
        let mut config: AgentConfig =
            serde_json::from_str(text).context("Invalid configuration document")?;

        if let Some(pw) = password_override.filter(|pw| !pw.is_empty()) {
            config.server.fm_pw = pw;
        }

        config.server.validate()?;
        config.agent.validate()?;

        Ok(config)
    }

    /// Load the configuration file, honouring the password env override
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text, std::env::var(PASSWORD_ENV).ok())
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }
}

/// Pick the config file: first argument, then env variable, then default
pub fn resolve_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
