//!
//! Logger configuration backed by `log4rs`: a colored console sink and,
//! when a log directory is provided, size-rolled files for all records and
//! for warnings.
//!

mod consts;
mod logger;
mod sink;

use log::LevelFilter;
use log4rs::config::{Config, Root};
use sink::Sink;
use std::path::Path;

pub use consts::{LOG_FILE_NAME, RUST_LOG_ENV, SENSIBLE_LOG_ENV, WARN_LOG_FILE_NAME};
pub use log::{debug, error, info, trace, warn};
pub use logger::LogError;

/// Installs the global logger. Filters follow the `RUST_LOG` grammar and are
/// applied on top of the `RUST_LOG` and `SENSIBLE_LOG` environment variables.
///
/// Failures (such as a logger already being installed) are reported on stderr.
pub fn init_logger(log_dir: Option<&str>, filters: &str) {
    if let Err(err) = try_init_logger(log_dir, filters) {
        eprintln!("{err}");
    }
}

/// Same as [`init_logger`] but returns the failure instead of reporting it.
pub fn try_init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let loggers = logger::Builder::new()
        .root_level(LevelFilter::Info)
        .parse_env(RUST_LOG_ENV)
        .parse_env(SENSIBLE_LOG_ENV)
        .parse_expression(filters)
        .build();

    let sinks = Sink::for_dir(log_dir);
    let dir = Path::new(log_dir.unwrap_or_default());
    let appenders = sinks.iter().map(|sink| sink.appender(dir)).collect::<Result<Vec<_>, _>>()?;
    let root = Root::builder().appenders(sinks.iter().map(|sink| sink.name())).build(loggers.root_level());

    let config = Config::builder().appenders(appenders).loggers(loggers.items()).build(root).map_err(|err| LogError::Init(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| LogError::Init(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_with_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        try_init_logger(Some(path), "info").unwrap();
        warn!("logger test record");
        log::logger().flush();
        assert!(dir.path().join(LOG_FILE_NAME).exists());
        assert!(dir.path().join(WARN_LOG_FILE_NAME).exists());

        // A second installation is refused.
        assert!(matches!(try_init_logger(None, ""), Err(LogError::Init(_))));
    }
}
