//! Configuration file
//!
//! JSON, every field optional. Without `--config` the file is looked up in
//! the per-user configuration directory; a missing default file simply means
//! built-in defaults.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use twinmount_core::protocol::BusIds;
use twinmount_core::targeting::TargetingConfig;

use crate::Cli;

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_TICK_MS: u64 = 100;
const MIN_TICK_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub bus: BusIds,
    pub targeting: TargetingConfig,
    pub tick_ms: u64,
    pub firing_table: Option<PathBuf>,
    pub slope_table: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bus: BusIds::default(),
            targeting: TargetingConfig::default(),
            tick_ms: DEFAULT_TICK_MS,
            firing_table: None,
            slope_table: None,
        }
    }
}

impl Config {
    /// Load `path`, or the default file if no path is given
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Config::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Config::from_file(&path),
                Some(path) => {
                    log::info!("No {}, using built-in defaults", path.display());
                    Ok(Config::default())
                }
                None => {
                    log::warn!("No home directory, using built-in defaults");
                    Ok(Config::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Tick interval; the command line wins over the file
    pub fn tick_interval(&self, args: &Cli) -> Duration {
        let ms = args.tick_ms.unwrap_or(self.tick_ms).max(MIN_TICK_MS);
        Duration::from_millis(ms)
    }

    pub fn firing_table_path<'a>(&'a self, args: &'a Cli) -> Option<&'a Path> {
        args.firing_table.as_deref().or(self.firing_table.as_deref())
    }

    pub fn slope_table_path<'a>(&'a self, args: &'a Cli) -> Option<&'a Path> {
        args.slope_table.as_deref().or(self.slope_table.as_deref())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "twinmount").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use twinmount_core::ballistics::SlopeMode;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "tickMs": 250,
                "bus": {{ "distance": 512 }},
                "targeting": {{
                    "ship": {{ "length": 40 }},
                    "slopeMode": "bilinear"
                }},
                "firingTable": "/var/lib/twinmount/firing.csv"
            }}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.bus.distance, 512);
        assert_eq!(config.bus.direction, BusIds::default().direction);
        assert_eq!(config.targeting.ship.length, 40.0);
        assert_eq!(config.targeting.ship.width, 10.0);
        assert_eq!(config.targeting.slope_mode, SlopeMode::Bilinear);
        assert_eq!(
            config.firing_table.as_deref(),
            Some(Path::new("/var/lib/twinmount/firing.csv"))
        );
        assert_eq!(config.slope_table, None);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid config file"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_command_line_overrides() {
        let config = Config {
            firing_table: Some(PathBuf::from("file.csv")),
            slope_table: Some(PathBuf::from("slope.csv")),
            ..Default::default()
        };
        let args = Cli::parse_from([
            "twinmount-server",
            "--tick-ms",
            "1",
            "--firing-table",
            "cli.csv",
        ]);
        assert_eq!(config.tick_interval(&args), Duration::from_millis(MIN_TICK_MS));
        assert_eq!(config.firing_table_path(&args), Some(Path::new("cli.csv")));
        assert_eq!(config.slope_table_path(&args), Some(Path::new("slope.csv")));

        let args = Cli::parse_from(["twinmount-server"]);
        assert_eq!(config.tick_interval(&args), Duration::from_millis(DEFAULT_TICK_MS));
    }
}
