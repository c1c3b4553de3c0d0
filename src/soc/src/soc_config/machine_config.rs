// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::fmt;

use serde::{Deserialize, Serialize, de};

use crate::cpu::CpuType;
use crate::gic::routing::ExceptionBanding;
use crate::layout::LayoutError;

/// Converts a size in MiB to bytes, saturating at `u64::MAX`.
pub fn mib_to_bytes(mib: usize) -> u64 {
    u64::try_from(mib)
        .ok()
        .and_then(|mib| mib.checked_mul(1 << 20))
        .unwrap_or(u64::MAX)
}

/// Errors associated with configuring the platform.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum MachineConfigError {
    /// The vCPU number {0} is invalid: this platform always has exactly {1} cores.
    InvalidVcpuCount(u8, u32),
    /// The core type {0} is not supported.
    UnsupportedCpuType(CpuType),
    /// The core type {0} is not one of the platform's cluster types.
    InvalidCpuType(CpuType),
    /// The memory size (MiB) is invalid.
    InvalidMemorySize,
    /// The memory size of {0} MiB does not fit in the physical address space.
    MemorySizeTooLarge(usize),
    /// The memory size conflicts with the address map: {0}
    MemoryMap(LayoutError),
}

/// Strongly typed structure that represents the configuration of the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MachineConfig {
    /// Number of cores to instantiate.
    #[serde(deserialize_with = "deserialize_vcpu_num")]
    pub vcpu_count: u8,
    /// The memory size in MiB.
    pub mem_size_mib: usize,
    /// Core type requested by the user, checked against the platform's cluster types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_type: Option<CpuType>,
    /// How controller outputs are grouped into exception bands.
    #[serde(default)]
    pub exception_banding: ExceptionBanding,
}

impl MachineConfig {
    /// RAM size in bytes, or `None` if it does not fit in 64 bits.
    pub fn ram_size(&self) -> Option<u64> {
        u64::try_from(self.mem_size_mib)
            .ok()
            .and_then(|mib| mib.checked_mul(1 << 20))
    }

    /// Applies the fields set in `update` on top of this configuration.
    pub fn update(&self, update: &MachineConfigUpdate) -> MachineConfig {
        MachineConfig {
            vcpu_count: update.vcpu_count.unwrap_or(self.vcpu_count),
            mem_size_mib: update.mem_size_mib.unwrap_or(self.mem_size_mib),
            cpu_type: update.cpu_type.or(self.cpu_type),
            exception_banding: update.exception_banding.unwrap_or(self.exception_banding),
        }
    }
}

impl fmt::Display for MachineConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ \"vcpu_count\": {:?}, \"mem_size_mib\": {:?}, \"cpu_type\": {:?}, \
             \"exception_banding\": {:?} }}",
            self.vcpu_count, self.mem_size_mib, self.cpu_type, self.exception_banding
        )
    }
}

/// Partial configuration of the platform.
/// This struct mirrors all the fields in `MachineConfig`.
/// If a field is `Some(value)` then an update is requested for that field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MachineConfigUpdate {
    /// Number of cores to instantiate.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_vcpu_num"
    )]
    pub vcpu_count: Option<u8>,
    /// The memory size in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_size_mib: Option<usize>,
    /// Core type requested by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_type: Option<CpuType>,
    /// How controller outputs are grouped into exception bands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_banding: Option<ExceptionBanding>,
}

impl MachineConfigUpdate {
    /// Returns `true` if no field is set, which means that there is nothing to be updated.
    pub fn is_empty(&self) -> bool {
        self.vcpu_count.is_none()
            && self.mem_size_mib.is_none()
            && self.cpu_type.is_none()
            && self.exception_banding.is_none()
    }
}

impl From<MachineConfig> for MachineConfigUpdate {
    fn from(cfg: MachineConfig) -> Self {
        MachineConfigUpdate {
            vcpu_count: Some(cfg.vcpu_count),
            mem_size_mib: Some(cfg.mem_size_mib),
            cpu_type: cfg.cpu_type,
            exception_banding: Some(cfg.exception_banding),
        }
    }
}

/// Deserialization function for the `vcpu_count` field in `MachineConfig` and
/// `MachineConfigUpdate`. `T` can be either `u8` or `Option<u8>`.
///
/// Only the lower bound is checked here; the exact count is checked against the platform
/// when the configuration is validated.
fn deserialize_vcpu_num<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: de::Deserializer<'de>,
    T: Deserialize<'de> + PartialOrd + From<u8>,
{
    let val = T::deserialize(d)?;

    if val < T::from(1) {
        return Err(de::Error::invalid_value(
            de::Unexpected::Other("vcpu_count"),
            &"number of vCPUs should be larger than 0",
        ));
    }
    Ok(val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MachineConfig {
        MachineConfig {
            vcpu_count: 6,
            mem_size_mib: 2048,
            cpu_type: None,
            exception_banding: ExceptionBanding::Contiguous,
        }
    }

    #[test]
    fn test_deserialize() {
        let cfg: MachineConfig =
            serde_json::from_str(r#"{"vcpu_count": 6, "mem_size_mib": 2048}"#).unwrap();
        assert_eq!(cfg, config());

        let cfg: MachineConfig = serde_json::from_str(
            r#"{
                "vcpu_count": 6,
                "mem_size_mib": 1024,
                "cpu_type": "cortex-a76",
                "exception_banding": "interleaved"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.cpu_type, Some(CpuType::CortexA76));
        assert_eq!(cfg.exception_banding, ExceptionBanding::Interleaved);
        assert_eq!(cfg.ram_size(), Some(1 << 30));

        serde_json::from_str::<MachineConfig>(r#"{"vcpu_count": 0, "mem_size_mib": 2048}"#)
            .unwrap_err();
        serde_json::from_str::<MachineConfig>(r#"{"vcpu_count": 256, "mem_size_mib": 2048}"#)
            .unwrap_err();
        serde_json::from_str::<MachineConfig>(
            r#"{"vcpu_count": 6, "mem_size_mib": 2048, "smt": true}"#,
        )
        .unwrap_err();
        serde_json::from_str::<MachineConfig>(
            r#"{"vcpu_count": 6, "mem_size_mib": 2048, "cpu_type": "cortex-a53"}"#,
        )
        .unwrap_err();
    }

    #[test]
    fn test_update() {
        let update: MachineConfigUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
        assert_eq!(config().update(&update), config());

        let update: MachineConfigUpdate =
            serde_json::from_str(r#"{"mem_size_mib": 512, "exception_banding": "interleaved"}"#)
                .unwrap();
        assert!(!update.is_empty());
        let updated = config().update(&update);
        assert_eq!(updated.vcpu_count, 6);
        assert_eq!(updated.mem_size_mib, 512);
        assert_eq!(updated.exception_banding, ExceptionBanding::Interleaved);

        serde_json::from_str::<MachineConfigUpdate>(r#"{"vcpu_count": 0}"#).unwrap_err();

        let full = MachineConfigUpdate::from(config());
        assert_eq!(MachineConfig { vcpu_count: 1, ..config() }.update(&full), config());
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&config()).unwrap();
        assert_eq!(
            json,
            r#"{"vcpu_count":6,"mem_size_mib":2048,"exception_banding":"contiguous"}"#
        );
        assert_eq!(
            config().to_string(),
            "{ \"vcpu_count\": 6, \"mem_size_mib\": 2048, \"cpu_type\": None, \
             \"exception_banding\": Contiguous }"
        );
    }

    #[test]
    fn test_ram_size() {
        assert_eq!(config().ram_size(), Some(2 << 30));
        assert_eq!(mib_to_bytes(2048), 2 << 30);
        assert_eq!(mib_to_bytes(usize::MAX), u64::MAX);
        let huge = MachineConfig {
            mem_size_mib: usize::MAX,
            ..config()
        };
        assert_eq!(huge.ram_size(), None);
    }
}
