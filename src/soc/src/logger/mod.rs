// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide logger for platform composition.
//!
//! Composition code logs through the `log` facade; this module provides the sink those
//! records end up in once [`Logger::init`] has been called.

mod logging;

use std::sync::LockResult;

pub use crate::logger::logging::{
    DEFAULT_LEVEL, INSTANCE_ID, LOGGER, LevelFilter, LevelFilterFromStrError, Logger,
    LoggerConfig, LoggerInitError, LoggerUpdateError,
};

fn extract_guard<G>(lock_result: LockResult<G>) -> G {
    match lock_result {
        Ok(guard) => guard,
        // A thread that panicked while logging leaves the target usable.
        Err(poisoned) => poisoned.into_inner(),
    }
}
