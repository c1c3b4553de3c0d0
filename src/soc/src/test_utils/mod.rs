// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

//! Recording stand-ins for the component, memory and loader collaborators.

use vm_memory::GuestAddress;

use crate::boot::{BootParams, ImageLoader, LoaderError};
use crate::component::{ComponentError, ComponentFactory};
use crate::gic::{GicConfig, GicFrame, GicHandle};
use crate::vcpu::{CoreConfig, CoreHandle, CoreIrqInput, CoreOutput};

/// Core that records the wires attached to its outputs.
#[derive(Debug)]
pub struct MockCore {
    pub config: CoreConfig,
    pub outputs: Vec<(CoreOutput, u32)>,
    fail_connect: bool,
}

impl CoreHandle for MockCore {
    fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn connect_output(&mut self, line: CoreOutput, gic_input: u32) -> Result<(), ComponentError> {
        if self.fail_connect {
            return Err(ComponentError::Connect(
                self.config.cpu_type.model_name(),
                format!("{line:?} refused"),
            ));
        }
        self.outputs.push((line, gic_input));
        Ok(())
    }
}

/// Interrupt controller that records mapped frames and wired outputs.
#[derive(Debug)]
pub struct MockGic {
    pub config: GicConfig,
    pub frames: Vec<(GicFrame, GuestAddress)>,
    pub outputs: Vec<(u32, u32, CoreIrqInput)>,
}

impl GicHandle for MockGic {
    fn config(&self) -> &GicConfig {
        &self.config
    }

    fn map_frame(&mut self, frame: GicFrame, addr: GuestAddress) -> Result<(), ComponentError> {
        if self.frames.iter().any(|(mapped, _)| *mapped == frame) {
            return Err(ComponentError::MapFrame(
                String::from("arm-gicv3"),
                format!("{frame:?} already mapped"),
            ));
        }
        self.frames.push((frame, addr));
        Ok(())
    }

    fn connect_output(
        &mut self,
        output: u32,
        core: u32,
        line: CoreIrqInput,
    ) -> Result<(), ComponentError> {
        if output >= self.config.num_outputs() {
            return Err(ComponentError::Connect(
                String::from("arm-gicv3"),
                format!("no output {output}"),
            ));
        }
        self.outputs.push((output, core, line));
        Ok(())
    }
}

/// Factory handing out [`MockCore`]s and [`MockGic`]s, with optional injected failures.
#[derive(Debug, Default)]
pub struct MockComponentFactory {
    /// Core index whose creation fails.
    pub fail_core: Option<u32>,
    /// Core index whose output wiring fails.
    pub fail_connect: Option<u32>,
    /// Whether controller creation fails.
    pub fail_gic: bool,
    /// Configuration of every core created, in creation order.
    pub created_cores: Vec<CoreConfig>,
    /// Configuration of every controller created.
    pub created_gics: Vec<GicConfig>,
}

impl ComponentFactory for MockComponentFactory {
    type Core = MockCore;
    type Gic = MockGic;

    fn create_core(&mut self, config: &CoreConfig) -> Result<MockCore, ComponentError> {
        if self.fail_core == Some(config.index) {
            return Err(ComponentError::Realize(
                config.cpu_type.model_name(),
                String::from("injected failure"),
            ));
        }
        self.created_cores.push(*config);
        Ok(MockCore {
            config: *config,
            outputs: Vec::new(),
            fail_connect: self.fail_connect == Some(config.index),
        })
    }

    fn create_gic(&mut self, config: &GicConfig) -> Result<MockGic, ComponentError> {
        if self.fail_gic {
            return Err(ComponentError::Create(
                String::from("arm-gicv3"),
                String::from("injected failure"),
            ));
        }
        self.created_gics.push(config.clone());
        Ok(MockGic {
            config: config.clone(),
            frames: Vec::new(),
            outputs: Vec::new(),
        })
    }
}

/// Loader that records the entry core and parameters it is called with.
#[derive(Debug, Default)]
pub struct MockImageLoader {
    pub fail: bool,
    pub loads: Vec<(u32, BootParams)>,
}

impl<C: CoreHandle> ImageLoader<C> for MockImageLoader {
    fn load(&mut self, entry_core: &C, params: &BootParams) -> Result<(), LoaderError> {
        if self.fail {
            return Err(LoaderError::Load(String::from("no kernel image")));
        }
        self.loads.push((entry_core.config().index, *params));
        Ok(())
    }
}
