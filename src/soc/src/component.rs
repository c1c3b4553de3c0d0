// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::gic::{GicConfig, GicHandle};
use crate::vcpu::{CoreConfig, CoreHandle};

/// Errors reported by the external component implementations.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum ComponentError {
    /// Cannot create component {0}: {1}
    Create(String, String),
    /// Component {0} failed to realize: {1}
    Realize(String, String),
    /// Cannot connect line of component {0}: {1}
    Connect(String, String),
    /// Cannot map MMIO frame of component {0}: {1}
    MapFrame(String, String),
}

/// Creates and realizes the cores and the interrupt controller of a platform.
///
/// Every call receives the complete configuration of the component and returns a realized
/// handle; implementations hold no ambient registry the composer depends on.
pub trait ComponentFactory {
    /// Handle of a realized core.
    type Core: CoreHandle;
    /// Handle of a realized interrupt controller.
    type Gic: GicHandle;

    /// Instantiates and realizes the core described by `config`.
    fn create_core(&mut self, config: &CoreConfig) -> Result<Self::Core, ComponentError>;

    /// Instantiates and realizes the interrupt controller described by `config`.
    fn create_gic(&mut self, config: &GicConfig) -> Result<Self::Gic, ComponentError>;
}
