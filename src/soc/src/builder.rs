// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Enables pre-boot setup, instantiation and booting of a platform.

use log::{debug, error, info};

use crate::boot::{BootParams, ImageLoader, LoaderError};
use crate::component::{ComponentError, ComponentFactory};
use crate::gic::routing::{RoutingError, RoutingTable, Wire};
use crate::gic::{GicConfig, GicFrame, GicHandle};
use crate::layout::{LayoutError, Region};
use crate::machine::MachineClass;
use crate::memory::{MemoryError, SystemMemory};
use crate::soc_config::machine_config::{MachineConfig, MachineConfigError};
use crate::vcpu::{CoreConfig, CoreHandle};

/// Errors associated with building a platform.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum StartPlatformError {
    /// Invalid machine configuration: {0}
    MachineConfig(#[from] MachineConfigError),
    /// Invalid address map: {0}
    Layout(#[from] LayoutError),
    /// Cannot create core {0}: {1}
    CreateCore(u32, ComponentError),
    /// Cannot create the interrupt controller: {0}
    CreateGic(ComponentError),
    /// Cannot map the interrupt controller frames: {0}
    MapGicFrame(ComponentError),
    /// Cannot generate the interrupt routing table: {0}
    Routing(#[from] RoutingError),
    /// Cannot wire the interrupt lines of core {0}: {1}
    ConnectIrq(u32, ComponentError),
    /// The routing table names core {0}, which does not exist.
    UnknownCore(u32),
    /// Cannot attach RAM: {0}
    AttachMemory(#[from] MemoryError),
    /// Cannot load the boot image: {0}
    LoadImage(#[from] LoaderError),
    /// The boot entry core {0} does not exist.
    MissingEntryCore(u32),
}

/// A fully composed platform: every core, the interrupt controller and its wiring.
#[derive(Debug)]
pub struct Platform<C, G> {
    name: &'static str,
    config: MachineConfig,
    cores: Vec<C>,
    gic: G,
    routing: RoutingTable,
    boot_params: BootParams,
}

impl<C: CoreHandle, G: GicHandle> Platform<C, G> {
    /// Name of the platform type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Configuration the platform was built with.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Cores, in index order.
    pub fn cores(&self) -> &[C] {
        &self.cores
    }

    /// Core with platform-wide index `index`.
    pub fn core(&self, index: u32) -> Option<&C> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.cores.get(index))
    }

    /// The interrupt controller.
    pub fn gic(&self) -> &G {
        &self.gic
    }

    /// Wires between the cores and the interrupt controller.
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Parameters the boot image was loaded with.
    pub fn boot_params(&self) -> &BootParams {
        &self.boot_params
    }
}

/// Builds and boots a platform of class `machine` configured by `config`.
///
/// Cores are created in layout order, then the interrupt controller, then the wiring, then
/// RAM, and finally the boot image is loaded for core 0. The first failure aborts the whole
/// build: components created so far are dropped and no partial platform is returned.
pub fn build_platform<F, M, L>(
    machine: &MachineClass,
    config: &MachineConfig,
    factory: &mut F,
    memory: &mut M,
    loader: &mut L,
) -> Result<Platform<F::Core, F::Gic>, StartPlatformError>
where
    F: ComponentFactory,
    M: SystemMemory,
    L: ImageLoader<F::Core>,
{
    compose(machine, config, factory, memory, loader)
        .inspect_err(|err| error!("Building platform {} failed: {err}", machine.name))
}

fn compose<F, M, L>(
    machine: &MachineClass,
    config: &MachineConfig,
    factory: &mut F,
    memory: &mut M,
    loader: &mut L,
) -> Result<Platform<F::Core, F::Gic>, StartPlatformError>
where
    F: ComponentFactory,
    M: SystemMemory,
    L: ImageLoader<F::Core>,
{
    machine.validate(config)?;
    let ram_size = config
        .ram_size()
        .ok_or(MachineConfigError::MemorySizeTooLarge(config.mem_size_mib))?;
    let layout = &machine.layout;
    machine
        .memory_map
        .check_disjoint(layout.total_count(), ram_size)?;

    info!(
        "Building platform {} with {} cores and {} MiB of RAM",
        machine.name,
        layout.total_count(),
        config.mem_size_mib,
    );

    let cores = create_cores(machine, factory)?;
    let gic = create_gic(machine, factory)?;
    let routing = RoutingTable::generate(layout, gic.config(), config.exception_banding)?;
    debug!(
        "Generated {} interrupt routes with {:?} exception banding",
        routing.len(),
        config.exception_banding
    );
    let (cores, gic) = connect_interrupts(cores, gic, &routing)?;

    let ram_base = machine.memory_map.base(Region::Sdram);
    memory.add_subregion(ram_base, ram_size)?;
    debug!("Attached {ram_size:#x} bytes of RAM at {:#x}", ram_base.0);

    let boot_params = BootParams::new(&machine.memory_map, ram_size, machine.psci_conduit);
    let entry_core = usize::try_from(boot_params.entry_core)
        .ok()
        .and_then(|index| cores.get(index))
        .ok_or(StartPlatformError::MissingEntryCore(boot_params.entry_core))?;
    loader.load(entry_core, &boot_params)?;

    info!("Platform {} ready", machine.name);
    Ok(Platform {
        name: machine.name,
        config: *config,
        cores,
        gic,
        routing,
        boot_params,
    })
}

fn create_cores<F: ComponentFactory>(
    machine: &MachineClass,
    factory: &mut F,
) -> Result<Vec<F::Core>, StartPlatformError> {
    machine
        .layout
        .iter()
        .map(|slot| {
            let config = CoreConfig::new(slot, &machine.cntfrq_quirk);
            let core = factory
                .create_core(&config)
                .map_err(|err| StartPlatformError::CreateCore(slot.index, err))?;
            debug!("Created core {} ({})", slot.index, slot.cpu_type);
            Ok(core)
        })
        .collect()
}

fn create_gic<F: ComponentFactory>(
    machine: &MachineClass,
    factory: &mut F,
) -> Result<F::Gic, StartPlatformError> {
    let config = GicConfig::from_layout(&machine.layout);
    let mut gic = factory
        .create_gic(&config)
        .map_err(StartPlatformError::CreateGic)?;

    for (frame, region) in [
        (GicFrame::Distributor, Region::GicDist),
        (GicFrame::Redistributor, Region::GicRedist),
    ] {
        gic.map_frame(frame, machine.memory_map.base(region))
            .map_err(StartPlatformError::MapGicFrame)?;
    }
    debug!(
        "Created GICv{} with {} interrupts for {} CPUs",
        config.version.revision(),
        config.num_irq,
        config.num_cpu
    );
    Ok(gic)
}

fn connect_interrupts<C: CoreHandle, G: GicHandle>(
    mut cores: Vec<C>,
    mut gic: G,
    routing: &RoutingTable,
) -> Result<(Vec<C>, G), StartPlatformError> {
    for entry in routing.entries() {
        let connected = match entry.wire {
            Wire::ToGic { line, input } => {
                let core = usize::try_from(entry.core)
                    .ok()
                    .and_then(|index| cores.get_mut(index))
                    .ok_or(StartPlatformError::UnknownCore(entry.core))?;
                core.connect_output(line, input)
            }
            Wire::FromGic { output, line } => gic.connect_output(output, entry.core, line),
        };
        connected.map_err(|err| StartPlatformError::ConnectIrq(entry.core, err))?;
    }
    Ok((cores, gic))
}
