use crate::routines::settings::Settings;
use eyre::{Result, WrapErr};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Setup logging for the library
///
/// This function sets up logging for the library. It uses the `tracing` crate, and the `tracing-subscriber` crate for formatting.
///
/// The log level is defined in the configuration file, and defaults to `INFO`.
///
/// Log messages are always written to stdout. If `log` is specified in the `paths` section of the
/// configuration file, they are also written to that file.
///
/// Only the first call in a process installs the subscriber. Later calls keep the existing one
/// and return `Ok`.
pub fn setup_log(settings: &Settings) -> Result<()> {
    let log_level = settings.config.log_level.to_lowercase();
    let env_filter = EnvFilter::new(&log_level);

    // Define a registry with that level as an environment filter
    let subscriber = Registry::default().with(env_filter);

    // Define a layer for the log file
    let file_layer = match &settings.paths.log {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .wrap_err_with(|| format!("Failed to open log file {} - does the directory exist?", path))?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_timer(CompactTimestamp),
            )
        }
        None => None,
    };

    // Define layer for stdout
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false)
        .with_timer(CompactTimestamp);

    // Combine layers with subscriber
    match subscriber
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
    {
        Ok(()) => tracing::debug!("Logging is configured with level: {}", log_level),
        Err(err) => tracing::debug!("Keeping the existing global logger: {}", err),
    }
    Ok(())
}

#[derive(Clone)]
struct CompactTimestamp;

impl FormatTime for CompactTimestamp {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> Result<(), std::fmt::Error> {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}
