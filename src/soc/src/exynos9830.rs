// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The Exynos 9830 test platform: four Cortex-A55 cores followed by two Cortex-A76 cores
//! sharing one GICv3.
//!
//! The production part carries two Mongoose M5 cores in its performance cluster. Those
//! cannot be instantiated, so the test platform stands in Cortex-A76 cores for them.

use crate::boot::PsciConduit;
use crate::cpu::{Cluster, CpuType};
use crate::layout::MemoryMap;
use crate::machine::{Board, MachineClass, MachineClassError};

/// Physical address map of the platform.
pub const MEMMAP: MemoryMap = MemoryMap::new(0x1010_1000, 0x1010_2000, 0x8000_0000);

/// Nominal generic timer frequency.
pub const TIMER_HZ: u64 = 26_000_000;

/// Default RAM size, in MiB.
pub const DEFAULT_MEM_SIZE_MIB: usize = 2048;

const CLUSTERS: &[Cluster] = &[
    Cluster::new(CpuType::CortexA55, 4),
    Cluster::new(CpuType::CortexA76, 2),
];

/// Board definition of the platform.
pub const EXYNOS9830: Board = Board {
    name: "exynos9830",
    desc: "EXYNOS9830 test platform",
    clusters: CLUSTERS,
    memory_map: MEMMAP,
    timer_hz: TIMER_HZ,
    default_mem_size_mib: DEFAULT_MEM_SIZE_MIB,
    psci_conduit: PsciConduit::Smc,
};

/// Machine class of the platform.
pub fn machine_class() -> Result<MachineClass, MachineClassError> {
    MachineClass::new(&EXYNOS9830)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::ClusterLayoutError;
    use crate::layout::Region;

    #[test]
    fn test_machine_class() {
        let machine = machine_class().unwrap();
        assert_eq!(machine.name, "exynos9830");
        assert_eq!(machine.desc, "EXYNOS9830 test platform");
        assert_eq!(machine.layout.small_count(), 4);
        assert_eq!(machine.layout.large_count(), 2);
        assert_eq!(machine.default_cpus(), 6);
        assert_eq!(machine.default_cpu_type, CpuType::CortexA55);
        assert_eq!(
            machine.valid_cpu_types,
            vec![CpuType::CortexA55, CpuType::CortexA76]
        );
        assert_eq!(machine.default_mem_size_mib, 2048);
        assert_eq!(machine.psci_conduit, PsciConduit::Smc);
        assert!(!machine.user_creatable);
    }

    #[test]
    fn test_memmap() {
        assert_eq!(MEMMAP.base(Region::GicDist).0, 0x1010_1000);
        assert_eq!(MEMMAP.base(Region::GicRedist).0, 0x1010_2000);
        assert_eq!(MEMMAP.base(Region::Sdram).0, 0x8000_0000);
        MEMMAP.check_disjoint(6, 2 << 30).unwrap();
    }

    #[test]
    fn test_production_clusters_refused() {
        const PRODUCTION: &[Cluster] = &[
            Cluster::new(CpuType::CortexA55, 4),
            Cluster::new(CpuType::MongooseM5, 2),
        ];
        let board = Board {
            clusters: PRODUCTION,
            ..EXYNOS9830
        };
        assert_eq!(
            MachineClass::new(&board),
            Err(MachineClassError::Clusters(
                ClusterLayoutError::UnsupportedCpuType(CpuType::MongooseM5)
            ))
        );
    }
}
