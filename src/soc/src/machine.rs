// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::boot::PsciConduit;
use crate::cpu::{Cluster, ClusterLayout, ClusterLayoutError, CpuType};
use crate::gic::routing::ExceptionBanding;
use crate::layout::{LayoutError, MemoryMap};
use crate::quirks::CntfrqQuirk;
use crate::soc_config::machine_config::{MachineConfig, MachineConfigError, mib_to_bytes};

/// Static description of a board, as written down by its definition.
#[derive(Clone, Copy, Debug)]
pub struct Board {
    /// Name of the platform type.
    pub name: &'static str,
    /// Human readable description.
    pub desc: &'static str,
    /// Core clusters, efficiency cores first.
    pub clusters: &'static [Cluster],
    /// Physical address map.
    pub memory_map: MemoryMap,
    /// Nominal generic timer frequency, in Hz.
    pub timer_hz: u64,
    /// RAM size used when none is configured, in MiB.
    pub default_mem_size_mib: usize,
    /// PSCI call convention of the board firmware.
    pub psci_conduit: PsciConduit,
}

/// Errors found while turning a [`Board`] into a [`MachineClass`].
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum MachineClassError {
    /// Invalid cluster layout: {0}
    Clusters(#[from] ClusterLayoutError),
    /// Invalid address map: {0}
    MemoryMap(#[from] LayoutError),
}

/// A platform type that passed validation and can be instantiated.
///
/// The core count is fixed: the minimum, maximum and default number of cores are all the
/// total size of the cluster layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineClass {
    /// Name of the platform type.
    pub name: &'static str,
    /// Human readable description.
    pub desc: &'static str,
    /// Cores of the platform.
    pub layout: ClusterLayout,
    /// Physical address map.
    pub memory_map: MemoryMap,
    /// Timer frequency policy applied to every core.
    pub cntfrq_quirk: CntfrqQuirk,
    /// Core type reported when none is requested.
    pub default_cpu_type: CpuType,
    /// Core types a configuration may name.
    pub valid_cpu_types: Vec<CpuType>,
    /// RAM size used when none is configured, in MiB.
    pub default_mem_size_mib: usize,
    /// PSCI call convention of the board firmware.
    pub psci_conduit: PsciConduit,
    /// Whether users may create the platform's SoC component on its own.
    pub user_creatable: bool,
    vcpu_count: u8,
}

impl MachineClass {
    /// Validates `board` and builds its descriptor.
    pub fn new(board: &Board) -> Result<Self, MachineClassError> {
        let layout = ClusterLayout::new(board.clusters)?;
        let vcpu_count = u8::try_from(layout.total_count())
            .map_err(|_| ClusterLayoutError::TooManyCores(layout.iter().len()))?;
        board.memory_map.check_disjoint(
            layout.total_count(),
            mib_to_bytes(board.default_mem_size_mib),
        )?;

        let valid_cpu_types = layout.cpu_types();
        Ok(MachineClass {
            name: board.name,
            desc: board.desc,
            default_cpu_type: valid_cpu_types[0],
            valid_cpu_types,
            layout,
            memory_map: board.memory_map,
            cntfrq_quirk: CntfrqQuirk::new(board.timer_hz),
            default_mem_size_mib: board.default_mem_size_mib,
            psci_conduit: board.psci_conduit,
            user_creatable: false,
            vcpu_count,
        })
    }

    /// Smallest number of cores the platform accepts.
    pub fn min_cpus(&self) -> u32 {
        self.layout.total_count()
    }

    /// Largest number of cores the platform accepts.
    pub fn max_cpus(&self) -> u32 {
        self.layout.total_count()
    }

    /// Number of cores used when none is configured.
    pub fn default_cpus(&self) -> u32 {
        self.layout.total_count()
    }

    /// Configuration used when nothing is overridden.
    pub fn default_config(&self) -> MachineConfig {
        MachineConfig {
            vcpu_count: self.vcpu_count,
            mem_size_mib: self.default_mem_size_mib,
            cpu_type: None,
            exception_banding: ExceptionBanding::default(),
        }
    }

    /// Checks `config` against the platform's fixed topology and memory map.
    pub fn validate(&self, config: &MachineConfig) -> Result<(), MachineConfigError> {
        let vcpu_count = u32::from(config.vcpu_count);
        if vcpu_count < self.min_cpus() || vcpu_count > self.max_cpus() {
            return Err(MachineConfigError::InvalidVcpuCount(
                config.vcpu_count,
                self.layout.total_count(),
            ));
        }

        if let Some(cpu_type) = config.cpu_type {
            if !cpu_type.is_supported() {
                return Err(MachineConfigError::UnsupportedCpuType(cpu_type));
            }
            if !self.valid_cpu_types.contains(&cpu_type) {
                return Err(MachineConfigError::InvalidCpuType(cpu_type));
            }
        }

        if config.mem_size_mib == 0 {
            return Err(MachineConfigError::InvalidMemorySize);
        }
        let ram_size = config
            .ram_size()
            .filter(|size| *size <= self.memory_map.max_ram_size())
            .ok_or(MachineConfigError::MemorySizeTooLarge(config.mem_size_mib))?;
        self.memory_map
            .check_disjoint(self.layout.total_count(), ram_size)
            .map_err(MachineConfigError::MemoryMap)
    }
}
