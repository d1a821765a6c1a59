use super::{
    consts::{CONSOLE_PATTERN, FILE_PATTERN, LOG_FILE_NAME, ROLL_ARCHIVES, ROLL_SIZE, WARN_LOG_FILE_NAME},
    logger::LogError,
};
use log::LevelFilter;
use log4rs::{
    append::{
        Append,
        console::ConsoleAppender,
        rolling_file::{
            RollingFileAppender,
            policy::compound::{CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger},
        },
    },
    config::Appender,
    encode::pattern::PatternEncoder,
    filter::{Filter, threshold::ThresholdFilter},
};
use std::path::Path;

/// Where log records go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Sink {
    Console,
    /// Every record, rolled by size.
    File,
    /// Warnings and errors only.
    WarnFile,
}

impl Sink {
    /// Sinks installed with and without a log directory.
    pub fn for_dir(log_dir: Option<&str>) -> &'static [Sink] {
        match log_dir {
            Some(_) => &[Sink::Console, Sink::File, Sink::WarnFile],
            None => &[Sink::Console],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Sink::Console => "console",
            Sink::File => "wallet_file",
            Sink::WarnFile => "wallet_warn_file",
        }
    }

    pub fn file_name(self) -> Option<&'static str> {
        match self {
            Sink::Console => None,
            Sink::File => Some(LOG_FILE_NAME),
            Sink::WarnFile => Some(WARN_LOG_FILE_NAME),
        }
    }

    fn threshold(self) -> Option<LevelFilter> {
        (self == Sink::WarnFile).then_some(LevelFilter::Warn)
    }

    /// Builds the appender. File sinks write under `log_dir`.
    pub fn appender(self, log_dir: &Path) -> Result<Appender, LogError> {
        let append: Box<dyn Append> = match self.file_name() {
            None => Box::new(ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN))).build()),
            Some(file_name) => Box::new(rolling_file(log_dir, file_name)?),
        };
        let filters = self.threshold().map(|level| Box::new(ThresholdFilter::new(level)) as Box<dyn Filter>);
        Ok(Appender::builder().filters(filters).build(self.name(), append))
    }
}

fn rolling_file(log_dir: &Path, file_name: &str) -> Result<RollingFileAppender, LogError> {
    let archive = log_dir.join(format!("{file_name}.{{}}.gz"));
    let archive = archive.to_str().ok_or_else(|| LogError::InvalidPath(log_dir.display().to_string()))?;
    let roller = FixedWindowRoller::builder().build(archive, ROLL_ARCHIVES).map_err(|err| LogError::Appender(err.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(log_dir.join(file_name), Box::new(policy))
        .map_err(|err| LogError::Appender(err.to_string()))
}
