// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{GicConfig, MAINT_PPI, PMU_PPI, PRIVATE_IRQ_COUNT, SGI_COUNT, SPI_COUNT};
use crate::cpu::ClusterLayout;
use crate::vcpu::{CoreIrqInput, CoreOutput};

/// Number of per-core output bands of the controller (IRQ, FIQ, VIRQ, VFIQ).
pub const EXCEPTION_BANDS: u32 = 4;

/// Number of routes generated for every core.
pub const ROUTES_PER_CORE: usize = CoreOutput::ALL.len() + CoreIrqInput::ALL.len();

/// Controller input index of PPI 0 of `core`.
///
/// Controller inputs start with the SPIs, followed by one private window per core. The first
/// [`SGI_COUNT`] entries of a window are SGIs, which are never driven by a wire.
pub fn ppi_base(core: u32) -> u32 {
    SPI_COUNT + core * PRIVATE_IRQ_COUNT + SGI_COUNT
}

/// PPI number of a core output line, relative to [`ppi_base`].
pub fn output_ppi(output: CoreOutput) -> u32 {
    match output {
        CoreOutput::Timer(line) => line.ppi(),
        CoreOutput::GicMaintenance => MAINT_PPI,
        CoreOutput::Pmu => PMU_PPI,
    }
}

/// How the controller orders its per-core exception outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionBanding {
    /// Four contiguous bands spanning every core: all IRQs, then all FIQs, then all VIRQs,
    /// then all VFIQs.
    #[default]
    Contiguous,
    /// Four consecutive outputs per core.
    Interleaved,
}

impl ExceptionBanding {
    /// Controller output slot driving exception input `line` of `core`, on a controller with
    /// `num_cpu` CPU interfaces.
    pub fn output_index(self, core: u32, num_cpu: u32, line: CoreIrqInput) -> u32 {
        match self {
            ExceptionBanding::Contiguous => core + line.band() * num_cpu,
            ExceptionBanding::Interleaved => core * EXCEPTION_BANDS + line.band(),
        }
    }
}

/// A core-side interrupt line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoreLine {
    /// Line driven by the core.
    Output(CoreOutput),
    /// Exception line driven by the controller.
    Input(CoreIrqInput),
}

/// A controller-side interrupt line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GicPin {
    /// Controller input index.
    Input(u32),
    /// Controller output index.
    Output(u32),
}

/// Direction and endpoints of a wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wire {
    /// Core output `line` drives controller input `input`.
    ToGic {
        /// Core output line.
        line: CoreOutput,
        /// Controller input index.
        input: u32,
    },
    /// Controller output `output` drives core exception input `line`.
    FromGic {
        /// Controller output index.
        output: u32,
        /// Core exception input.
        line: CoreIrqInput,
    },
}

/// One wire between a core and the interrupt controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoutingEntry {
    /// Core index.
    pub core: u32,
    /// The wire itself.
    pub wire: Wire,
}

impl RoutingEntry {
    /// Line on the core side.
    pub fn line(&self) -> CoreLine {
        match self.wire {
            Wire::ToGic { line, .. } => CoreLine::Output(line),
            Wire::FromGic { line, .. } => CoreLine::Input(line),
        }
    }

    /// Line on the controller side.
    pub fn pin(&self) -> GicPin {
        match self.wire {
            Wire::ToGic { input, .. } => GicPin::Input(input),
            Wire::FromGic { output, .. } => GicPin::Output(output),
        }
    }
}

/// Errors raised while validating a routing table.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum RoutingError {
    /// Controller pin {0:?} is wired to both core {1} and core {2}.
    DuplicateDestination(GicPin, u32, u32),
    /// Controller pin {0:?} of core {1} is out of range: the controller has {2} lines.
    OutOfRange(GicPin, u32, u32),
}

/// Complete set of wires between the cores and the interrupt controller.
///
/// No two entries share a controller pin; this is checked when the table is generated. The
/// table is immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingTable {
    entries: Vec<RoutingEntry>,
}

impl RoutingTable {
    /// Generates the wiring of every core in `layout` to a controller sized by `config`.
    pub fn generate(
        layout: &ClusterLayout,
        config: &GicConfig,
        banding: ExceptionBanding,
    ) -> Result<Self, RoutingError> {
        let mut entries = Vec::with_capacity(layout.iter().len() * ROUTES_PER_CORE);

        for slot in layout {
            let base = config.ppi_base(slot.index);
            entries.extend(CoreOutput::ALL.into_iter().map(|line| RoutingEntry {
                core: slot.index,
                wire: Wire::ToGic {
                    line,
                    input: base + output_ppi(line),
                },
            }));
            entries.extend(CoreIrqInput::ALL.into_iter().map(|line| RoutingEntry {
                core: slot.index,
                wire: Wire::FromGic {
                    output: banding.output_index(slot.index, config.num_cpu, line),
                    line,
                },
            }));
        }

        check_entries(&entries, config)?;
        Ok(RoutingTable { entries })
    }

    /// Every wire, grouped by core in index order.
    pub fn entries(&self) -> &[RoutingEntry] {
        &self.entries
    }

    /// Number of wires.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no wires.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wires of `core`.
    pub fn for_core(&self, core: u32) -> impl Iterator<Item = &RoutingEntry> {
        self.entries.iter().filter(move |entry| entry.core == core)
    }

    /// Wire attached to controller pin `pin`, if any.
    pub fn source_of(&self, pin: GicPin) -> Option<&RoutingEntry> {
        self.entries.iter().find(|entry| entry.pin() == pin)
    }

    /// Controller pin attached to `line` of `core`, if any.
    pub fn pin_of(&self, core: u32, line: CoreLine) -> Option<GicPin> {
        self.entries
            .iter()
            .find(|entry| entry.core == core && entry.line() == line)
            .map(RoutingEntry::pin)
    }
}

fn check_entries(entries: &[RoutingEntry], config: &GicConfig) -> Result<(), RoutingError> {
    let mut claimed: HashMap<GicPin, u32> = HashMap::with_capacity(entries.len());

    for entry in entries {
        let pin = entry.pin();
        let (index, limit) = match pin {
            GicPin::Input(index) => (index, config.num_inputs()),
            GicPin::Output(index) => (index, config.num_outputs()),
        };
        if index >= limit {
            return Err(RoutingError::OutOfRange(pin, entry.core, limit));
        }
        if let Some(owner) = claimed.insert(pin, entry.core) {
            return Err(RoutingError::DuplicateDestination(pin, owner, entry.core));
        }
    }

    Ok(())
}
