/// Directives read from the environment, in this order, before the ones
/// passed to [`init_logger`](super::init_logger).
pub const RUST_LOG_ENV: &str = "RUST_LOG";
pub const SENSIBLE_LOG_ENV: &str = "SENSIBLE_LOG";

pub const LOG_FILE_NAME: &str = "sensible-wallet.log";
pub const WARN_LOG_FILE_NAME: &str = "sensible-wallet-warn.log";

/// A log file is archived once it grows past this size.
pub const ROLL_SIZE: u64 = 16 * 1024 * 1024;
/// Gzipped archives kept next to each log file.
pub const ROLL_ARCHIVES: u32 = 4;

pub const CONSOLE_PATTERN: &str = "{d(%H:%M:%S%.3f)(utc)} {h({l:<5})} {m}{n}";
/// UTC timestamp, level and module target.
pub const FILE_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S%.3fZ)(utc)} {l:<5} [{t}] {m}{n}";
