//! Tunables for the sensor, resolved once at startup.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `ROOTFS_MOUNT_PATH` | `/` | absolute root the pseudo-file paths are joined onto |
//! | `SENSOR_SAMPLING_INTERVAL_MS` | 1000 | TCP snapshot TTL and poll cadence |
//! | `SENSOR_CPU_REFRESH_INTERVAL_MS` | 5000 | minimum time between CPU utilization updates |
//! | `SENSOR_MEMORY_REFRESH_INTERVAL_MS` | 5000 | minimum time between memory utilization updates |
//! | `SENSOR_RETRY_INTERVAL_MS` | 300000 | cooldown after a TCP table turns out to be missing |

use std::path::PathBuf;
use std::time::Duration;

pub const ROOTFS_ENV: &str = "ROOTFS_MOUNT_PATH";
pub const SAMPLING_INTERVAL_ENV: &str = "SENSOR_SAMPLING_INTERVAL_MS";
pub const CPU_REFRESH_INTERVAL_ENV: &str = "SENSOR_CPU_REFRESH_INTERVAL_MS";
pub const MEMORY_REFRESH_INTERVAL_ENV: &str = "SENSOR_MEMORY_REFRESH_INTERVAL_MS";
pub const RETRY_INTERVAL_ENV: &str = "SENSOR_RETRY_INTERVAL_MS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for `{name}`: '{value}' is not a number of milliseconds")]
    InvalidDuration { name: &'static str, value: String },
    #[error("`{name}` must be greater than zero")]
    ZeroDuration { name: &'static str },
    #[error("`ROOTFS_MOUNT_PATH` must be an absolute path, got `{}`", root.display())]
    RelativeRoot { root: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorOptions {
    /// Absolute prefix joined onto every pseudo-file path, e.g. a host root mounted
    /// into a container.
    pub root: PathBuf,
    /// TTL of a cached TCP snapshot and cadence of the polling loop.
    pub sampling_interval: Duration,
    /// Minimum time between two CPU utilization computations.
    pub cpu_refresh_interval: Duration,
    /// Minimum time between two memory utilization computations.
    pub memory_refresh_interval: Duration,
    /// How long a missing TCP table is left alone before it is read again.
    pub retry_interval: Duration,
}

impl Default for SensorOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            sampling_interval: Duration::from_secs(1),
            cpu_refresh_interval: Duration::from_secs(5),
            memory_refresh_interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl SensorOptions {
    /// Reads the options from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the options through `lookup`, falling back to defaults for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let duration = |name: &'static str, default: Duration| match lookup(name) {
            Some(value) => parse_millis(name, &value),
            None => Ok(default),
        };

        let root = lookup(ROOTFS_ENV)
            .map(PathBuf::from)
            .unwrap_or(defaults.root);
        if !root.is_absolute() {
            return Err(ConfigError::RelativeRoot { root });
        }

        Ok(Self {
            root,
            sampling_interval: duration(SAMPLING_INTERVAL_ENV, defaults.sampling_interval)?,
            cpu_refresh_interval: duration(
                CPU_REFRESH_INTERVAL_ENV,
                defaults.cpu_refresh_interval,
            )?,
            memory_refresh_interval: duration(
                MEMORY_REFRESH_INTERVAL_ENV,
                defaults.memory_refresh_interval,
            )?,
            retry_interval: duration(RETRY_INTERVAL_ENV, defaults.retry_interval)?,
        })
    }
}

fn parse_millis(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let millis = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidDuration {
            name,
            value: value.to_string(),
        })?;
    if millis == 0 {
        return Err(ConfigError::ZeroDuration { name });
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = SensorOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, SensorOptions::default());
        assert_eq!(options.retry_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let options = SensorOptions::from_lookup(lookup(&[
            (ROOTFS_ENV, "/rootfs"),
            (SAMPLING_INTERVAL_ENV, "250"),
            (RETRY_INTERVAL_ENV, " 60000 "),
        ]))
        .unwrap();
        assert_eq!(options.root, PathBuf::from("/rootfs"));
        assert_eq!(options.sampling_interval, Duration::from_millis(250));
        assert_eq!(options.retry_interval, Duration::from_secs(60));
        assert_eq!(options.cpu_refresh_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_duration() {
        let err =
            SensorOptions::from_lookup(lookup(&[(CPU_REFRESH_INTERVAL_ENV, "5s")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidDuration {
                name: CPU_REFRESH_INTERVAL_ENV,
                value: "5s".to_string()
            }
        );
    }

    #[test]
    fn test_relative_root_rejected() {
        let err =
            SensorOptions::from_lookup(lookup(&[(ROOTFS_ENV, "rootfs/../etc")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::RelativeRoot {
                root: PathBuf::from("rootfs/../etc")
            }
        );
    }

    #[test]
    fn test_zero_duration() {
        let err =
            SensorOptions::from_lookup(lookup(&[(MEMORY_REFRESH_INTERVAL_ENV, "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::ZeroDuration {
                name: MEMORY_REFRESH_INTERVAL_ENV
            }
        );
    }
}
