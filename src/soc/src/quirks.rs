// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Deliberate deviations from architecturally correct reset values.
//!
//! Firmware on some boards never programs the generic timer frequency register of the boot
//! core, while every secondary core gets the nominal frequency. Guests written for those
//! boards cope with (or depend on) the zero value, so the platform reproduces it.

use crate::cpu::CoreSlot;

/// Value the timer frequency register of a core is reset to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CntfrqSetting {
    /// Programmed with the platform timer frequency, in Hz.
    Nominal(u64),
    /// Left unprogrammed by firmware; reads as zero.
    Unprogrammed,
}

impl CntfrqSetting {
    /// Frequency in Hz handed to the core model.
    pub fn hz(self) -> u64 {
        match self {
            CntfrqSetting::Nominal(hz) => hz,
            CntfrqSetting::Unprogrammed => 0,
        }
    }
}

/// Per-core cntfrq policy: the boot core is left unprogrammed, the others run at the nominal
/// platform frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CntfrqQuirk {
    nominal_hz: u64,
}

impl CntfrqQuirk {
    /// Index of the core whose register firmware leaves unprogrammed.
    pub const UNPROGRAMMED_CORE: u32 = 0;

    /// Policy for a platform whose timer runs at `nominal_hz`.
    pub const fn new(nominal_hz: u64) -> Self {
        CntfrqQuirk { nominal_hz }
    }

    /// Nominal platform timer frequency.
    pub fn nominal_hz(&self) -> u64 {
        self.nominal_hz
    }

    /// Setting for the core in `slot`.
    pub fn setting_for(&self, slot: &CoreSlot) -> CntfrqSetting {
        if slot.index == Self::UNPROGRAMMED_CORE {
            CntfrqSetting::Unprogrammed
        } else {
            CntfrqSetting::Nominal(self.nominal_hz)
        }
    }
}
