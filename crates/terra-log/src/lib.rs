//! Logging setup for Terra.
//!
//! Console output with uptime timestamps and targets, plus a JSON log file
//! in debug builds. `RUST_LOG` wins over the configured level.

use std::fs::File;
use std::path::Path;

use terra_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// Name of the JSON log file inside the log directory.
pub const LOG_FILE_NAME: &str = "terra.log";

/// Install the global subscriber.
///
/// `log_dir` is only used when `debug_build` is set; if the file cannot be
/// created, logging continues on the console alone.
///
/// ```no_run
/// use terra_config::Config;
/// use terra_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && let Ok(log_file) = create_log_file(log_dir)
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        tracing::debug!(dir = %log_dir.display(), "Logging to file");
        return;
    }

    subscriber.init();
}

/// Filter directives from the config's log level, falling back to
/// [`DEFAULT_DIRECTIVES`].
pub fn filter_directives(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

/// Create (truncating) `log_dir/terra.log`, creating the directory too.
pub fn create_log_file(log_dir: &Path) -> std::io::Result<File> {
    std::fs::create_dir_all(log_dir)?;
    File::create(log_dir.join(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_default_without_config() {
        assert_eq!(filter_directives(None), "info");
    }

    #[test]
    fn test_directives_follow_config() {
        let mut config = Config::default();
        config.debug.log_level = "warn,terra_lod=debug".to_string();
        assert_eq!(filter_directives(Some(&config)), "warn,terra_lod=debug");

        config.debug.log_level = "   ".to_string();
        assert_eq!(filter_directives(Some(&config)), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn test_subsystem_filters_parse() {
        for directives in [
            "info",
            "debug,terra_lod=trace",
            "warn,terra_tiles=debug,terra_lod::cube=trace",
        ] {
            let filter = EnvFilter::try_new(directives);
            assert!(filter.is_ok(), "Failed to parse filter: {directives}");
        }
    }

    #[test]
    fn test_log_file_created_in_new_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("nested").join("logs");
        create_log_file(&log_dir).unwrap();
        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_log_file_receives_json_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_file = create_log_file(temp_dir.path()).unwrap();

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(log_file)
                .with_ansi(false)
                .json(),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(lod = 3, "Split node");
        });

        let contents = std::fs::read_to_string(temp_dir.path().join(LOG_FILE_NAME)).unwrap();
        let line = contents.lines().next().expect("one event written");
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["fields"]["message"], "Split node");
        assert_eq!(event["fields"]["lod"], 3);
    }
}
