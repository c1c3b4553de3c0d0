// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// Wiring of core interrupt lines to controller pins.
pub mod routing;

use std::fmt::Debug;

use vm_memory::GuestAddress;

use crate::component::ComponentError;
use crate::cpu::ClusterLayout;
use crate::vcpu::CoreIrqInput;

/// Number of shared peripheral interrupts (SPIs) the platform budgets for.
pub const SPI_COUNT: u32 = 288;
/// Number of interrupt IDs private to each core (SGIs + PPIs).
pub const PRIVATE_IRQ_COUNT: u32 = 32;
/// Number of software generated interrupts at the start of each private window.
pub const SGI_COUNT: u32 = 16;
/// PPI of the GICv3 virtual interface maintenance interrupt.
pub const MAINT_PPI: u32 = 9;
/// PPI of the performance monitor overflow interrupt.
pub const PMU_PPI: u32 = 7;

/// Interrupt controller architecture revisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GicVersion {
    /// GICv3: one redistributor per CPU interface.
    V3,
}

impl GicVersion {
    /// Value of the controller's `revision` property.
    pub fn revision(self) -> u32 {
        match self {
            GicVersion::V3 => 3,
        }
    }
}

/// MMIO frames exposed by the interrupt controller, by region number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GicFrame {
    /// Distributor.
    Distributor,
    /// Redistributor region.
    Redistributor,
}

impl GicFrame {
    /// MMIO region number of the frame.
    pub fn mmio_index(self) -> u32 {
        match self {
            GicFrame::Distributor => 0,
            GicFrame::Redistributor => 1,
        }
    }
}

/// Construction parameters of the interrupt controller.
///
/// Derived from the core count only, so two derivations from the same layout are equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GicConfig {
    /// Value of the `num-irq` property: SPIs plus one private window.
    pub num_irq: u32,
    /// Controller architecture.
    pub version: GicVersion,
    /// Number of CPU interfaces.
    pub num_cpu: u32,
    /// Number of redistributors in each redistributor region.
    pub redist_region_count: Vec<u32>,
}

impl GicConfig {
    /// Sizes the controller for `layout`.
    pub fn from_layout(layout: &ClusterLayout) -> Self {
        let num_cpu = layout.total_count();
        GicConfig {
            num_irq: SPI_COUNT + PRIVATE_IRQ_COUNT,
            version: GicVersion::V3,
            num_cpu,
            redist_region_count: vec![num_cpu],
        }
    }

    /// Number of input lines: the SPIs followed by one private window per CPU.
    pub fn num_inputs(&self) -> u32 {
        (self.num_irq - PRIVATE_IRQ_COUNT) + self.num_cpu * PRIVATE_IRQ_COUNT
    }

    /// Number of output lines: one per exception input of every CPU.
    pub fn num_outputs(&self) -> u32 {
        self.num_cpu * routing::EXCEPTION_BANDS
    }

    /// Input index of PPI 0 of `core`.
    pub fn ppi_base(&self, core: u32) -> u32 {
        routing::ppi_base(core)
    }
}

/// A realized interrupt controller.
pub trait GicHandle: Debug {
    /// Configuration the controller was realized with.
    fn config(&self) -> &GicConfig;

    /// Places `frame` at physical address `addr`.
    fn map_frame(&mut self, frame: GicFrame, addr: GuestAddress) -> Result<(), ComponentError>;

    /// Connects controller output `output` to exception input `line` of core `core`.
    fn connect_output(
        &mut self,
        output: u32,
        core: u32,
        line: CoreIrqInput,
    ) -> Result<(), ComponentError>;
}
