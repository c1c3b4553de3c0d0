// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use vm_memory::GuestAddress;

use crate::layout::{MemoryMap, Region};

/// Mechanism the guest uses to call into PSCI firmware services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PsciConduit {
    /// No PSCI firmware is emulated.
    Disabled,
    /// Secure monitor call.
    Smc,
    /// Hypervisor call.
    Hvc,
}

impl fmt::Display for PsciConduit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PsciConduit::Disabled => write!(f, "disabled"),
            PsciConduit::Smc => write!(f, "smc"),
            PsciConduit::Hvc => write!(f, "hvc"),
        }
    }
}

/// Parameters handed to the boot image loader.
///
/// Owned by a single platform instance and passed to the loader by reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootParams {
    /// Where RAM starts and the loader may place images.
    pub loader_start: GuestAddress,
    /// Size of RAM, in bytes.
    pub ram_size: u64,
    /// PSCI call convention advertised to the guest.
    pub psci_conduit: PsciConduit,
    /// Index of the core that starts executing the image.
    pub entry_core: u32,
}

impl BootParams {
    /// Boot parameters for a platform with `ram_size` bytes of RAM placed according to
    /// `memory_map`. Execution always starts on core 0.
    pub fn new(memory_map: &MemoryMap, ram_size: u64, psci_conduit: PsciConduit) -> Self {
        BootParams {
            loader_start: memory_map.base(Region::Sdram),
            ram_size,
            psci_conduit,
            entry_core: 0,
        }
    }
}

/// Errors reported by the boot image loader.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum LoaderError {
    /// Cannot load boot image: {0}
    Load(String),
    /// Cannot set up the initial register state of core {0}: {1}
    EntryCore(u32, String),
}

/// Places the boot images in RAM and sets up the entry core's registers.
pub trait ImageLoader<C> {
    /// Loads the boot images for a platform whose first core is `entry_core`.
    fn load(&mut self, entry_core: &C, params: &BootParams) -> Result<(), LoaderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_params() {
        let map = MemoryMap::new(0x1010_1000, 0x1010_2000, 0x8000_0000);
        let params = BootParams::new(&map, 2 << 30, PsciConduit::Smc);
        assert_eq!(params.loader_start, map.base(Region::Sdram));
        assert_eq!(params.ram_size, 2 << 30);
        assert_eq!(params.psci_conduit, PsciConduit::Smc);
        assert_eq!(params.entry_core, 0);
        assert_eq!(params.psci_conduit.to_string(), "smc");
    }
}
