// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;

use crate::component::ComponentError;
use crate::cpu::{CoreSlot, CpuType};
use crate::quirks::CntfrqQuirk;

/// Generic timer outputs of a core, in the order the core model numbers its timer lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerLine {
    /// EL1 physical timer (non-secure).
    Phys,
    /// EL1 virtual timer.
    Virt,
    /// EL2 physical timer.
    Hyp,
    /// Secure physical timer.
    Sec,
}

impl TimerLine {
    /// All timer lines, indexed by their core output number.
    pub const ALL: [TimerLine; 4] = [
        TimerLine::Phys,
        TimerLine::Virt,
        TimerLine::Hyp,
        TimerLine::Sec,
    ];

    /// Core output number of the line.
    pub fn output_index(self) -> u32 {
        match self {
            TimerLine::Phys => 0,
            TimerLine::Virt => 1,
            TimerLine::Hyp => 2,
            TimerLine::Sec => 3,
        }
    }

    /// PPI number the architecture assigns to the line, relative to the start of the
    /// per-core PPI range.
    pub fn ppi(self) -> u32 {
        match self {
            TimerLine::Phys => 14,
            TimerLine::Virt => 11,
            TimerLine::Hyp => 10,
            TimerLine::Sec => 13,
        }
    }
}

/// Interrupt lines a core drives towards the interrupt controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoreOutput {
    /// One of the generic timer outputs.
    Timer(TimerLine),
    /// GICv3 virtual interface maintenance interrupt.
    GicMaintenance,
    /// Performance monitor overflow interrupt.
    Pmu,
}

impl CoreOutput {
    /// Every output line of a core, timers first.
    pub const ALL: [CoreOutput; 6] = [
        CoreOutput::Timer(TimerLine::Phys),
        CoreOutput::Timer(TimerLine::Virt),
        CoreOutput::Timer(TimerLine::Hyp),
        CoreOutput::Timer(TimerLine::Sec),
        CoreOutput::GicMaintenance,
        CoreOutput::Pmu,
    ];

    /// Name of the side-band output; timer lines are anonymous and addressed by number.
    pub fn name(self) -> Option<&'static str> {
        match self {
            CoreOutput::Timer(_) => None,
            CoreOutput::GicMaintenance => Some("gicv3-maintenance-interrupt"),
            CoreOutput::Pmu => Some("pmu-interrupt"),
        }
    }
}

/// Exception inputs of a core, driven by the interrupt controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoreIrqInput {
    /// Physical IRQ.
    Irq,
    /// Physical FIQ.
    Fiq,
    /// Virtual IRQ.
    Virq,
    /// Virtual FIQ.
    Vfiq,
}

impl CoreIrqInput {
    /// All exception inputs, in controller band order.
    pub const ALL: [CoreIrqInput; 4] = [
        CoreIrqInput::Irq,
        CoreIrqInput::Fiq,
        CoreIrqInput::Virq,
        CoreIrqInput::Vfiq,
    ];

    /// Band of the controller's per-core outputs that drives this input.
    pub fn band(self) -> u32 {
        match self {
            CoreIrqInput::Irq => 0,
            CoreIrqInput::Fiq => 1,
            CoreIrqInput::Virq => 2,
            CoreIrqInput::Vfiq => 3,
        }
    }
}

/// Construction parameters of one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    /// Platform-wide core index.
    pub index: u32,
    /// Core model to instantiate.
    pub cpu_type: CpuType,
    /// Reset value of the timer frequency register, in Hz.
    pub cntfrq_hz: u64,
}

impl CoreConfig {
    /// Configuration of the core in `slot`, with the cntfrq quirk applied.
    pub fn new(slot: &CoreSlot, quirk: &CntfrqQuirk) -> Self {
        CoreConfig {
            index: slot.index,
            cpu_type: slot.cpu_type,
            cntfrq_hz: quirk.setting_for(slot).hz(),
        }
    }
}

/// A realized core emulation component.
pub trait CoreHandle: Debug {
    /// Configuration the core was realized with.
    fn config(&self) -> &CoreConfig;

    /// Connects output `line` of the core to controller input `gic_input`.
    fn connect_output(&mut self, line: CoreOutput, gic_input: u32) -> Result<(), ComponentError>;
}
