// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::logger::{LOGGER, Logger, LoggerConfig, LoggerUpdateError};
use crate::machine::MachineClass;
use crate::soc_config::machine_config::{MachineConfig, MachineConfigError, MachineConfigUpdate};

/// Errors encountered when configuring platform resources.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum ResourcesError {
    /// Invalid JSON: {0}
    InvalidJson(#[from] serde_json::Error),
    /// Logger error: {0}
    Logger(#[from] LoggerUpdateError),
    /// Machine config error: {0}
    MachineConfig(#[from] MachineConfigError),
}

/// Used for configuring a platform from one single json passed to the process.
#[derive(Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Overrides of the machine class defaults.
    #[serde(rename = "machine-config", default)]
    pub machine_config: Option<MachineConfigUpdate>,
    /// Logger settings.
    #[serde(rename = "logger", default)]
    pub logger: Option<LoggerConfig>,
}

/// Configuration a platform is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformResources {
    machine_config: MachineConfig,
}

impl PlatformResources {
    /// Resources holding the defaults of `machine`.
    pub fn new(machine: &MachineClass) -> Self {
        PlatformResources {
            machine_config: machine.default_config(),
        }
    }

    /// Configures platform resources as described by the `config_json` param.
    ///
    /// A `logger` section is applied to the process-wide logger straight away.
    pub fn from_json(config_json: &str, machine: &MachineClass) -> Result<Self, ResourcesError> {
        Self::from_json_with_logger(config_json, machine, &LOGGER)
    }

    /// Same as [`PlatformResources::from_json`], applying the `logger` section to `logger`.
    pub fn from_json_with_logger(
        config_json: &str,
        machine: &MachineClass,
        logger: &Logger,
    ) -> Result<Self, ResourcesError> {
        let config: PlatformConfig = serde_json::from_str(config_json)?;

        if let Some(logger_config) = config.logger {
            logger.update(logger_config)?;
        }

        let mut resources = Self::new(machine);
        if let Some(update) = config.machine_config {
            resources.update_machine_config(&update, machine)?;
        }
        Ok(resources)
    }

    /// The current machine configuration.
    pub fn machine_config(&self) -> &MachineConfig {
        &self.machine_config
    }

    /// Applies `update` if the result is valid for `machine`; otherwise leaves the current
    /// configuration untouched.
    pub fn update_machine_config(
        &mut self,
        update: &MachineConfigUpdate,
        machine: &MachineClass,
    ) -> Result<(), MachineConfigError> {
        let updated = self.machine_config.update(update);
        machine.validate(&updated)?;
        self.machine_config = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use log::{Level, Log, Metadata, Record};
    use vmm_sys_util::tempfile::TempFile;

    use super::*;
    use crate::cpu::CpuType;
    use crate::exynos9830;
    use crate::gic::routing::ExceptionBanding;

    fn machine() -> MachineClass {
        exynos9830::machine_class().unwrap()
    }

    #[test]
    fn test_from_json_defaults() {
        let resources = PlatformResources::from_json("{}", &machine()).unwrap();
        assert_eq!(*resources.machine_config(), machine().default_config());
        assert_eq!(resources, PlatformResources::new(&machine()));
    }

    #[test]
    fn test_from_json_machine_config() {
        let json = r#"{
            "machine-config": {
                "mem_size_mib": 1024,
                "cpu_type": "cortex-a76",
                "exception_banding": "interleaved"
            }
        }"#;
        let resources = PlatformResources::from_json(json, &machine()).unwrap();
        let config = resources.machine_config();
        assert_eq!(config.vcpu_count, 6);
        assert_eq!(config.mem_size_mib, 1024);
        assert_eq!(config.cpu_type, Some(CpuType::CortexA76));
        assert_eq!(config.exception_banding, ExceptionBanding::Interleaved);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            PlatformResources::from_json("{", &machine()),
            Err(ResourcesError::InvalidJson(_))
        ));
        assert!(matches!(
            PlatformResources::from_json(r#"{"drives": []}"#, &machine()),
            Err(ResourcesError::InvalidJson(_))
        ));
        assert!(matches!(
            PlatformResources::from_json(r#"{"machine-config": {"vcpu_count": 7}}"#, &machine()),
            Err(ResourcesError::MachineConfig(
                MachineConfigError::InvalidVcpuCount(7, 6)
            ))
        ));
        assert!(matches!(
            PlatformResources::from_json(
                r#"{"machine-config": {"cpu_type": "mongoose-m5"}}"#,
                &machine()
            ),
            Err(ResourcesError::MachineConfig(
                MachineConfigError::UnsupportedCpuType(CpuType::MongooseM5)
            ))
        ));
        assert!(matches!(
            PlatformResources::from_json_with_logger(
                r#"{"logger": {"log_path": "/nonexistent/dir/soc.log"}}"#,
                &machine(),
                &Logger::new()
            ),
            Err(ResourcesError::Logger(_))
        ));
    }

    #[test]
    fn test_from_json_logger() {
        let file = TempFile::new().unwrap();
        let json = format!(
            r#"{{"logger": {{"log_path": "{}", "show_level": true}}}}"#,
            file.as_path().display()
        );
        let logger = Logger::new();
        PlatformResources::from_json_with_logger(&json, &machine(), &logger).unwrap();

        let record = Record::builder()
            .args(format_args!("Platform exynos9830 ready"))
            .metadata(Metadata::builder().level(Level::Info).build())
            .build();
        logger.log(&record);

        let contents = std::fs::read_to_string(file.as_path()).unwrap();
        assert!(
            contents.ends_with(":INFO] Platform exynos9830 ready\n"),
            "{contents}"
        );
    }

    #[test]
    fn test_rejected_update_keeps_config() {
        let mut resources = PlatformResources::new(&machine());
        let update = MachineConfigUpdate {
            mem_size_mib: Some(0),
            ..Default::default()
        };
        assert_eq!(
            resources.update_machine_config(&update, &machine()),
            Err(MachineConfigError::InvalidMemorySize)
        );
        assert_eq!(*resources.machine_config(), machine().default_config());
    }
}
