use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

use crate::eval::collation::Collation;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EsiConfig {
    /// Ordering used by every comparison in conditional expressions.
    #[serde(default)]
    pub collation: Collation,

    #[serde(default)]
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Incoming request headers copied onto fragment requests.
    #[serde(default = "default_forwarded_headers")]
    pub forwarded_headers: Vec<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-attempt bound on a fragment fetch. No bound when absent.
    #[serde(default, with = "opt_duration_ms")]
    pub timeout: Option<Duration>,

    #[serde(default, with = "opt_duration_ms")]
    pub pool_idle_timeout: Option<Duration>,

    /// Host → origin URL. Fragments on a listed host are fetched from the
    /// origin instead.
    #[serde(default)]
    pub rewrites: HashMap<String, String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            forwarded_headers: default_forwarded_headers(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
            timeout: None,
            pool_idle_timeout: None,
            rewrites: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total tries including the first one; 1 disables retrying.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_retry_delay", with = "duration_ms")]
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay: default_retry_delay(),
        }
    }
}

fn default_forwarded_headers() -> Vec<String> {
    vec![
        "cookie".to_string(),
        "accept-language".to_string(),
        "authorization".to_string(),
    ]
}

fn default_user_agent() -> Option<String> {
    Some(format!("esi-core/{}", env!("CARGO_PKG_VERSION")))
}

fn default_attempts() -> u32 {
    1
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(100)
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    let config = serde_json::from_str(s)?;
    Ok(config)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
