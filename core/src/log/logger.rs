use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::BTreeMap, env, mem};
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum LogError {
    #[error("Logger spec parsing error: {0}")]
    ParseLoggerSpecError(String),

    #[error("Log directory path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("Log appender error: {0}")]
    Appender(String),

    #[error("Logger initialization error: {0}")]
    Init(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct LoggerSpec {
    pub name: String,
    pub level: LevelFilter,
}

impl LoggerSpec {
    pub fn logger(&self) -> Logger {
        Logger::builder().build(self.name.clone(), self.level)
    }
}

pub(super) struct Loggers {
    loggers: Vec<LoggerSpec>,
    root_level: LevelFilter,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn items(&self) -> impl IntoIterator<Item = Logger> + '_ {
        self.loggers.iter().map(|x| x.logger())
    }
}

/// Collects per-module levels from `RUST_LOG`-style expressions such as
/// `info,sensible_wallet_core=debug`. Later directives override earlier ones.
#[derive(Default)]
pub(super) struct Builder {
    loggers: BTreeMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Builder {
    pub fn new() -> Builder {
        Self::default()
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    pub fn from_expression(expression: &str) -> Self {
        let mut builder = Self::new();
        builder.parse_expression(expression);
        builder
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(str::trim).filter(|spec| !spec.is_empty()) {
            match Self::parse_directive(spec) {
                Ok((Some(name), level)) => {
                    self.loggers.insert(name.to_string(), level);
                }
                Ok((None, level)) => self.root_level = Some(level),
                Err(err) => eprintln!("Ignoring invalid logging spec: {err}"),
            }
        }
        self
    }

    /// A bare level sets the root level, a bare module name enables all its records.
    fn parse_directive(spec: &str) -> Result<(Option<&str>, LevelFilter), LogError> {
        let invalid = |part: &str| LogError::ParseLoggerSpecError(part.to_string());
        match spec.split('=').map(str::trim).collect::<Vec<_>>()[..] {
            [single] => Ok(single.parse().map_or((Some(single), LevelFilter::max()), |level| (None, level))),
            [name, ""] => Ok((Some(name), LevelFilter::max())),
            [name, level] => level.parse().map(|level| (Some(name), level)).map_err(|_| invalid(level)),
            _ => Err(invalid(spec)),
        }
    }

    pub fn root_level(&mut self, root_level: LevelFilter) -> &mut Self {
        self.root_level = Some(root_level);
        self
    }

    pub fn build(&mut self) -> Loggers {
        let loggers = mem::take(&mut self.loggers).into_iter().map(|(name, level)| LoggerSpec { name, level }).collect();
        Loggers { loggers, root_level: self.root_level.take().unwrap_or(LevelFilter::Error) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expression() {
        struct Test {
            name: &'static str,
            expression: &'static str,
            root_level: LevelFilter,
            loggers: Vec<(&'static str, LevelFilter)>,
        }

        let tests = vec![
            Test { name: "empty", expression: "", root_level: LevelFilter::Error, loggers: vec![] },
            Test { name: "root only", expression: "info", root_level: LevelFilter::Info, loggers: vec![] },
            Test {
                name: "root and module",
                expression: "warn, sensible_wallet_core=debug",
                root_level: LevelFilter::Warn,
                loggers: vec![("sensible_wallet_core", LevelFilter::Debug)],
            },
            Test {
                name: "bare module enables everything",
                expression: "sensible_contracts",
                root_level: LevelFilter::Error,
                loggers: vec![("sensible_contracts", LevelFilter::Trace)],
            },
            Test {
                name: "invalid level is ignored",
                expression: "info,sensible_core=loud,a=b=c",
                root_level: LevelFilter::Info,
                loggers: vec![],
            },
        ];

        for test in tests {
            let loggers = Builder::from_expression(test.expression).build();
            assert_eq!(loggers.root_level(), test.root_level, "{} root level", test.name);
            let actual = loggers.loggers.iter().map(|x| (x.name.as_str(), x.level)).collect::<Vec<_>>();
            assert_eq!(actual, test.loggers, "{} loggers", test.name);
        }
    }
}
