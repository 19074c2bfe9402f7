use crate::routines::evaluation::obs_error::ObservationError;
use config::Config as eConfig;
use eyre::{Result, WrapErr};
use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Settings used for likelihood evaluation
///
/// The user can specify the desired settings in a TOML configuration file, see [read] for details.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub paths: Paths,
    #[serde(default)]
    pub config: Config,
    pub error: ObservationError,
}

/// File locations
///
/// - `data`: headerless CSV with one row per (group, strain, individual) and one column per time point
/// - `log`: optional log file
/// - `output`: optional CSV for the simulated trajectories
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Paths {
    pub data: String,
    pub log: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)] // Defaults to FALSE
    pub cache: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            parallel: true,
            cache: false,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn new(data: impl Into<String>, error: ObservationError) -> Self {
        Settings {
            paths: Paths {
                data: data.into(),
                log: None,
                output: None,
            },
            config: Config::default(),
            error,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.error
            .validate()
            .wrap_err("Invalid observation error parameters")
    }

    /// Write the settings as JSON
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .wrap_err_with(|| format!("Unable to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self).wrap_err("Unable to serialize settings")?;
        Ok(())
    }
}

/// Read and validate settings from a TOML configuration file
///
/// Values can be overridden with environment variables prefixed by `ABK_`, using `__` between
/// sections and keys, e.g. `ABK_CONFIG__LOG_LEVEL=debug`.
pub fn read(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let parsed = eConfig::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Toml))
        .add_source(
            config::Environment::with_prefix("ABK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .wrap_err_with(|| format!("Unable to read settings from {}", path.display()))?;

    let settings: Settings = parsed
        .try_deserialize()
        .wrap_err_with(|| format!("Unable to parse settings in {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
