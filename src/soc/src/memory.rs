// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use vm_memory::{Address, GuestAddress};

/// Errors associated with attaching memory to the system address space.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum MemoryError {
    /// Cannot attach an empty region at {0:#x}.
    EmptyRegion(u64),
    /// Region at {0:#x} of size {1:#x} wraps around the address space.
    Overflow(u64, u64),
    /// Region at {0:#x} overlaps the region already attached at {1:#x}.
    Overlap(u64, u64),
}

/// System address space the platform attaches its RAM to.
pub trait SystemMemory {
    /// Attaches a RAM region of `size` bytes at physical address `base`.
    fn add_subregion(&mut self, base: GuestAddress, size: u64) -> Result<(), MemoryError>;
}

/// Address space that keeps track of the attached regions and refuses overlaps.
#[derive(Debug, Default)]
pub struct AddressSpace {
    // Sorted by base address.
    regions: Vec<(GuestAddress, u64)>,
}

impl AddressSpace {
    /// Creates an empty address space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attached regions as `(base, size)` pairs, by ascending base address.
    pub fn regions(&self) -> &[(GuestAddress, u64)] {
        &self.regions
    }

    /// Region containing `addr`, if any.
    pub fn find_region(&self, addr: GuestAddress) -> Option<(GuestAddress, u64)> {
        self.regions
            .iter()
            .copied()
            .find(|(base, size)| addr >= *base && addr.raw_value() - base.raw_value() < *size)
    }
}

impl SystemMemory for AddressSpace {
    fn add_subregion(&mut self, base: GuestAddress, size: u64) -> Result<(), MemoryError> {
        if size == 0 {
            return Err(MemoryError::EmptyRegion(base.raw_value()));
        }
        let end = base
            .checked_add(size)
            .ok_or(MemoryError::Overflow(base.raw_value(), size))?;

        if let Some((other, _)) = self.regions.iter().find(|(other, other_size)| {
            // Regions already attached never wrap.
            base < other.unchecked_add(*other_size) && *other < end
        }) {
            return Err(MemoryError::Overlap(base.raw_value(), other.raw_value()));
        }

        let pos = self.regions.partition_point(|(other, _)| *other < base);
        self.regions.insert(pos, (base, size));
        Ok(())
    }
}
