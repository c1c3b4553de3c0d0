// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![warn(clippy::undocumented_unsafe_blocks)]

//! Static composition of heterogeneous multi-cluster aarch64 platforms.
//!
//! A platform is a fixed set of cores in two clusters of different core types, one GICv3
//! shared by all of them, a physical address map and a single RAM region. [`builder`]
//! instantiates the cores and the interrupt controller through a
//! [`component::ComponentFactory`], wires every per-core interrupt line to its controller
//! pin as computed by [`gic::routing::RoutingTable`], attaches RAM and hands the boot
//! parameters to an [`boot::ImageLoader`].

/// Boot parameters and the image loader interface.
pub mod boot;
/// Composition of a platform from its machine class and configuration.
pub mod builder;
/// Interface of the external core and interrupt controller implementations.
pub mod component;
/// Core types and cluster layouts.
pub mod cpu;
/// The Exynos 9830 test platform.
pub mod exynos9830;
/// GICv3 sizing and interrupt routing.
pub mod gic;
/// Physical address map.
pub mod layout;
/// Logging sink for the `log` facade.
pub mod logger;
/// Machine classes and board definitions.
pub mod machine;
/// RAM attachment.
pub mod memory;
/// Deliberate reproductions of firmware behavior.
pub mod quirks;
/// Platform configuration loaded from JSON.
pub mod resources;
/// Wrappers for platform configuration.
pub mod soc_config;
/// Recording collaborators for tests.
pub mod test_utils;
/// Per-core interrupt lines and construction parameters.
pub mod vcpu;

pub use crate::builder::{Platform, StartPlatformError, build_platform};
pub use crate::machine::{Board, MachineClass, MachineClassError};
pub use crate::soc_config::machine_config::MachineConfig;
