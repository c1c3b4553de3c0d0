// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//      ==== Physical address map of the heterogeneous platforms ====
//
// 1024GB   +---------------------------------------------------------------+  <- 40-bit
//          |                                                               |
//          ~                          DRAM                                 ~
//          |                                                               |
// 2GB      +---------------------------------------------------------------+  <- SDRAM base
//          |                         Reserved                              |
//          ~                                                               ~
//          +---------------------------------------------------------------+
//          |           GIC redistributors (2 x 64KiB per core)             |
//          +---------------------------------------------------------------+  <- REDIST base
//          |           GIC distributor register page (4KiB)                |
//          +---------------------------------------------------------------+  <- DIST base
//          ~                         Reserved                              ~
// 0GB      +---------------------------------------------------------------+
//
// The concrete bases are board specific and live with the board definition, see
// `crate::exynos9830::MEMMAP`.

use vm_memory::{Address, GuestAddress};

const SZ_4K: u64 = 0x1000;
const SZ_64K: u64 = 0x0001_0000;

/// Size of the distributor register window exposed by the address map.
pub const GIC_DIST_SIZE: u64 = SZ_4K;
/// Size of a single GICv3 redistributor (RD_base + SGI_base frames).
pub const GIC_REDIST_SIZE_PER_CPU: u64 = 2 * SZ_64K;

/// First address past the 40-bit physical address space.
pub const PHYS_ADDR_LIMIT: u64 = 1 << 40;

/// Identifiers of the regions placed by the address map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    /// Interrupt controller distributor frame.
    GicDist,
    /// Interrupt controller redistributor frames.
    GicRedist,
    /// Start of general purpose memory.
    Sdram,
}

impl Region {
    /// Every region the map knows about, in address-map order.
    pub const ALL: [Region; 3] = [Region::GicDist, Region::GicRedist, Region::Sdram];
}

/// Errors found while checking an address map against its region sizes.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum LayoutError {
    /// Region {0:?} overlaps region {1:?}.
    Overlap(Region, Region),
    /// Region {0:?} does not fit in the 40-bit physical address space.
    Overflow(Region),
}

/// Read-only table mapping every [`Region`] to its physical base address.
///
/// The set of regions is closed, so every lookup succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryMap {
    gic_dist: u64,
    gic_redist: u64,
    sdram: u64,
}

impl MemoryMap {
    /// Builds the table from the bases of each region.
    pub const fn new(gic_dist: u64, gic_redist: u64, sdram: u64) -> Self {
        MemoryMap {
            gic_dist,
            gic_redist,
            sdram,
        }
    }

    /// Physical base address of `region`.
    pub fn base(&self, region: Region) -> GuestAddress {
        match region {
            Region::GicDist => GuestAddress(self.gic_dist),
            Region::GicRedist => GuestAddress(self.gic_redist),
            Region::Sdram => GuestAddress(self.sdram),
        }
    }

    /// Size of `region` for a platform with `cpu_count` cores and `ram_size` bytes of RAM.
    pub fn size(region: Region, cpu_count: u32, ram_size: u64) -> u64 {
        match region {
            Region::GicDist => GIC_DIST_SIZE,
            Region::GicRedist => u64::from(cpu_count) * GIC_REDIST_SIZE_PER_CPU,
            Region::Sdram => ram_size,
        }
    }

    /// Largest amount of RAM that fits between the SDRAM base and the top of the
    /// physical address space.
    pub fn max_ram_size(&self) -> u64 {
        PHYS_ADDR_LIMIT.saturating_sub(self.sdram)
    }

    /// Checks that no two regions overlap and that every region ends below
    /// [`PHYS_ADDR_LIMIT`].
    pub fn check_disjoint(&self, cpu_count: u32, ram_size: u64) -> Result<(), LayoutError> {
        let mut extents = Vec::with_capacity(Region::ALL.len());
        for region in Region::ALL {
            let start = self.base(region);
            let end = start
                .checked_add(Self::size(region, cpu_count, ram_size))
                .filter(|end| end.raw_value() <= PHYS_ADDR_LIMIT)
                .ok_or(LayoutError::Overflow(region))?;
            extents.push((start, end, region));
        }

        extents.sort_by_key(|(start, _, _)| *start);
        for pair in extents.windows(2) {
            let (_, prev_end, prev) = pair[0];
            let (next_start, _, next) = pair[1];
            if next_start < prev_end {
                return Err(LayoutError::Overlap(prev, next));
            }
        }

        Ok(())
    }
}
