// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Log, Metadata, Record};
use serde::{Deserialize, Deserializer, Serialize};

use super::extract_guard;

/// Default level filter of the logger.
pub const DEFAULT_LEVEL: log::LevelFilter = log::LevelFilter::Info;
/// Instance id printed in every log line.
pub const INSTANCE_ID: &str = "anonymous-instance";

/// The logger.
pub static LOGGER: Logger = Logger::new();

/// Error type for [`Logger::init`].
pub type LoggerInitError = log::SetLoggerError;

/// Failed to open target file: {0}
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub struct LoggerUpdateError(pub std::io::Error);

impl Logger {
    /// Logger writing to stdout, with no module filter and neither level nor origin shown.
    pub const fn new() -> Self {
        Logger(Mutex::new(LoggerConfiguration {
            target: None,
            filter: LogFilter { module: None },
            format: LogFormat {
                show_level: false,
                show_log_origin: false,
            },
        }))
    }

    /// Initialize the logger.
    pub fn init(&'static self) -> Result<(), LoggerInitError> {
        log::set_logger(self)?;
        log::set_max_level(DEFAULT_LEVEL);
        Ok(())
    }

    /// Applies the given logger configuration the logger.
    ///
    /// The process-wide max level only changes when `config` names a level.
    pub fn update(&self, config: LoggerConfig) -> Result<(), LoggerUpdateError> {
        let mut guard = extract_guard(self.0.lock());
        if let Some(level) = config.level {
            log::set_max_level(log::LevelFilter::from(level));
        }

        if let Some(log_path) = config.log_path {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
                .map_err(LoggerUpdateError)?;

            guard.target = Some(file);
        };

        if let Some(show_level) = config.show_level {
            guard.format.show_level = show_level;
        }

        if let Some(show_log_origin) = config.show_log_origin {
            guard.format.show_log_origin = show_log_origin;
        }

        if let Some(module) = config.module {
            guard.filter.module = Some(module);
        }

        // Logging while holding the guard would deadlock.
        drop(guard);

        Ok(())
    }
}

#[derive(Debug)]
struct LogFilter {
    module: Option<String>,
}

#[derive(Debug)]
struct LogFormat {
    show_level: bool,
    show_log_origin: bool,
}

#[derive(Debug)]
struct LoggerConfiguration {
    target: Option<std::fs::File>,
    filter: LogFilter,
    format: LogFormat,
}

/// Sink for the `log` facade, writing one line per record to a file or stdout.
#[derive(Debug)]
pub struct Logger(Mutex<LoggerConfiguration>);

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => format!(
            "{}.{:09}",
            since_epoch.as_secs(),
            since_epoch.subsec_nanos()
        ),
        Err(_) => String::from("0.000000000"),
    }
}

impl Log for Logger {
    // No additional filters to <https://docs.rs/log/latest/log/fn.max_level.html>.
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let mut guard = extract_guard(self.0.lock());

        let enabled = match (&guard.filter.module, record.module_path()) {
            (Some(filter), Some(source)) => source.starts_with(filter),
            (Some(_), None) => false,
            (None, _) => true,
        };
        if !enabled {
            return;
        }

        let thread = thread::current().name().unwrap_or("-").to_string();
        let level = match guard.format.show_level {
            true => format!(":{}", record.level()),
            false => String::new(),
        };

        let origin = match guard.format.show_log_origin {
            true => {
                let file = record.file().unwrap_or("?");
                let line = match record.line() {
                    Some(x) => x.to_string(),
                    None => String::from("?"),
                };
                format!(":{file}:{line}")
            }
            false => String::new(),
        };

        let message = format!(
            "{} [{INSTANCE_ID}:{thread}{level}{origin}] {}\n",
            timestamp(),
            record.args()
        );

        // A line that cannot be written is dropped; there is nowhere left to report it.
        let _ = if let Some(file) = &mut guard.target {
            file.write_all(message.as_bytes())
        } else {
            std::io::stdout().write_all(message.as_bytes())
        };
    }

    fn flush(&self) {}
}

/// Strongly typed structure used to describe the logger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    /// Named pipe or file used as output for logs.
    pub log_path: Option<PathBuf>,
    /// The level of the Logger.
    pub level: Option<LevelFilter>,
    /// Whether to show the log level in the log.
    pub show_level: Option<bool>,
    /// Whether to show the log origin in the log.
    pub show_log_origin: Option<bool>,
    /// The module to filter logs by.
    pub module: Option<String>,
}

/// Level filter that also accepts `warning` and any letter case when parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LevelFilter {
    /// [`log::LevelFilter::Off`]
    Off,
    /// [`log::LevelFilter::Trace`]
    Trace,
    /// [`log::LevelFilter::Debug`]
    Debug,
    /// [`log::LevelFilter::Info`]
    Info,
    /// [`log::LevelFilter::Warn`]
    Warn,
    /// [`log::LevelFilter::Error`]
    Error,
}

impl From<LevelFilter> for log::LevelFilter {
    fn from(filter: LevelFilter) -> log::LevelFilter {
        match filter {
            LevelFilter::Off => log::LevelFilter::Off,
            LevelFilter::Trace => log::LevelFilter::Trace,
            LevelFilter::Debug => log::LevelFilter::Debug,
            LevelFilter::Info => log::LevelFilter::Info,
            LevelFilter::Warn => log::LevelFilter::Warn,
            LevelFilter::Error => log::LevelFilter::Error,
        }
    }
}

impl<'de> Deserialize<'de> for LevelFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let key = String::deserialize(deserializer)?;
        LevelFilter::from_str(&key).map_err(|_| D::Error::custom("Invalid LevelFilter"))
    }
}

/// Failed to parse string to level filter: {0}
#[derive(Debug, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
pub struct LevelFilterFromStrError(String);

impl FromStr for LevelFilter {
    type Err = LevelFilterFromStrError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LevelFilterFromStrError(String::from(s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use log::Level;
    use vmm_sys_util::tempfile::TempFile;

    use super::*;

    fn logger(target: Option<std::fs::File>, module: Option<&str>, verbose: bool) -> Logger {
        Logger(Mutex::new(LoggerConfiguration {
            target,
            filter: LogFilter {
                module: module.map(String::from),
            },
            format: LogFormat {
                show_level: verbose,
                show_log_origin: verbose,
            },
        }))
    }

    #[test]
    fn levelfilter_from_str_all_variants() {
        use itertools::Itertools;

        #[derive(Deserialize)]
        struct Foo {
            #[allow(dead_code)]
            level: LevelFilter,
        }

        for (level, level_enum) in [
            ("off", LevelFilter::Off),
            ("trace", LevelFilter::Trace),
            ("debug", LevelFilter::Debug),
            ("info", LevelFilter::Info),
            ("warn", LevelFilter::Warn),
            ("warning", LevelFilter::Warn),
            ("error", LevelFilter::Error),
        ] {
            let multi = level.chars().map(|_| 0..=1).multi_cartesian_product();
            for combination in multi {
                let variant = level
                    .chars()
                    .zip_eq(combination)
                    .map(|(c, v)| match v {
                        0 => c.to_ascii_lowercase(),
                        1 => c.to_ascii_uppercase(),
                        _ => unreachable!(),
                    })
                    .collect::<String>();

                let ex = format!("{{ \"level\": \"{}\" }}", variant);
                assert_eq!(LevelFilter::from_str(&variant), Ok(level_enum));
                assert!(serde_json::from_str::<Foo>(&ex).is_ok(), "{ex}");
            }
        }
        let ex = "{ \"level\": \"blah\" }".to_string();
        assert!(
            serde_json::from_str::<Foo>(&ex).is_err(),
            "expected error got {ex:#?}"
        );
        assert_eq!(
            LevelFilter::from_str("bad"),
            Err(LevelFilterFromStrError(String::from("bad")))
        );
        assert_eq!(
            log::LevelFilter::from(LevelFilter::Warn),
            log::LevelFilter::Warn
        );
    }

    #[test]
    fn test_logger_config() {
        let config: LoggerConfig = serde_json::from_str(
            r#"{"log_path": "/tmp/soc.log", "level": "Warning", "show_level": true}"#,
        )
        .unwrap();
        assert_eq!(config.log_path, Some(PathBuf::from("/tmp/soc.log")));
        assert_eq!(config.level, Some(LevelFilter::Warn));
        assert_eq!(config.show_level, Some(true));
        assert_eq!(config.show_log_origin, None);

        serde_json::from_str::<LoggerConfig>(r#"{"log_file": "/tmp/soc.log"}"#).unwrap_err();
    }

    #[test]
    fn test_logger_writes_to_file() {
        let file = TempFile::new().unwrap();
        let target = std::fs::OpenOptions::new()
            .write(true)
            .open(file.as_path())
            .unwrap();
        let logger = logger(Some(target), Some("soc"), true);

        assert!(logger.enabled(&Metadata::builder().level(Level::Debug).build()));

        let record = Record::builder()
            .args(format_args!("Routing table generated"))
            .metadata(Metadata::builder().level(Level::Info).build())
            .file(Some("src/builder.rs"))
            .line(Some(42))
            .module_path(Some("soc::builder"))
            .build();
        logger.log(&record);

        // Filtered out by module.
        let record = Record::builder()
            .args(format_args!("Hidden"))
            .metadata(Metadata::builder().level(Level::Error).build())
            .module_path(Some("other::module"))
            .build();
        logger.log(&record);
        logger.flush();

        let contents = std::fs::read_to_string(file.as_path()).unwrap();
        let (_time, rest) = contents.split_once(' ').unwrap();
        let thread = thread::current().name().unwrap_or("-").to_string();
        assert_eq!(
            rest,
            format!("[{INSTANCE_ID}:{thread}:INFO:src/builder.rs:42] Routing table generated\n")
        );
    }

    #[test]
    fn test_update_opens_target() {
        let file = TempFile::new().unwrap();
        let logger = logger(None, None, false);
        logger
            .update(LoggerConfig {
                log_path: Some(file.as_path().to_path_buf()),
                level: None,
                show_level: Some(true),
                show_log_origin: Some(false),
                module: None,
            })
            .unwrap();

        let record = Record::builder()
            .args(format_args!("Cores created"))
            .metadata(Metadata::builder().level(Level::Debug).build())
            .build();
        logger.log(&record);

        let contents = std::fs::read_to_string(file.as_path()).unwrap();
        assert!(contents.ends_with(":DEBUG] Cores created\n"), "{contents}");

        let err = logger
            .update(LoggerConfig {
                log_path: Some(PathBuf::from("/nonexistent/dir/soc.log")),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Failed to open target file: {}", err.0)
        );
    }
}
