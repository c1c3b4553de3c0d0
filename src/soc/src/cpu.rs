// Copyright 2024 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upper bound on the number of cores a cluster layout may describe: the largest core count a
/// machine configuration can name.
pub const MAX_CORES: u32 = u8::MAX as u32;

/// Core models known to the platform definitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuType {
    /// Efficiency class core.
    #[serde(rename = "cortex-a55")]
    CortexA55,
    /// Performance class core.
    #[serde(rename = "cortex-a76")]
    CortexA76,
    /// Custom performance core found on some boards. There is no emulation for it, so it can
    /// be named but never instantiated.
    #[serde(rename = "mongoose-m5")]
    MongooseM5,
}

impl CpuType {
    /// Architecture name of the core.
    pub fn name(self) -> &'static str {
        match self {
            CpuType::CortexA55 => "cortex-a55",
            CpuType::CortexA76 => "cortex-a76",
            CpuType::MongooseM5 => "mongoose-m5",
        }
    }

    /// Name of the core emulation component for this type.
    pub fn model_name(self) -> String {
        format!("{}-arm-cpu", self.name())
    }

    /// Whether a core emulation component exists for this type.
    pub fn is_supported(self) -> bool {
        !matches!(self, CpuType::MongooseM5)
    }

    /// Whether this is an efficiency ("small") class core.
    pub fn is_efficiency(self) -> bool {
        matches!(self, CpuType::CortexA55)
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error type for [`<CpuType as FromStr>::from_str`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown CPU type: {0}")]
pub struct CpuTypeFromStrError(String);

impl FromStr for CpuType {
    type Err = CpuTypeFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        let name = name.strip_suffix("-arm-cpu").unwrap_or(&name);
        match name {
            "cortex-a55" => Ok(CpuType::CortexA55),
            "cortex-a76" => Ok(CpuType::CortexA76),
            "mongoose-m5" => Ok(CpuType::MongooseM5),
            _ => Err(CpuTypeFromStrError(String::from(s))),
        }
    }
}

/// Errors raised while describing a cluster layout.
#[derive(Debug, thiserror::Error, displaydoc::Display, PartialEq, Eq)]
pub enum ClusterLayoutError {
    /// The layout does not contain any core.
    Empty,
    /// CPU type {0} has no emulation available.
    UnsupportedCpuType(CpuType),
    /// Cluster of {1} cores cannot follow a cluster of {0} cores: efficiency cores come first.
    ClusterOrder(CpuType, CpuType),
    /// The layout describes {0} cores, more than the supported maximum.
    TooManyCores(usize),
}

/// A cluster of `count` cores of the same type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cluster {
    /// Type of every core in the cluster.
    pub cpu_type: CpuType,
    /// Number of cores in the cluster.
    pub count: u32,
}

impl Cluster {
    /// Describes a cluster of `count` cores of type `cpu_type`.
    pub const fn new(cpu_type: CpuType, count: u32) -> Self {
        Cluster { cpu_type, count }
    }
}

/// One entry of a [`ClusterLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreSlot {
    /// Platform-wide, 0-based core index.
    pub index: u32,
    /// Type of the core at this index.
    pub cpu_type: CpuType,
}

/// Ordered list of the cores making up a platform.
///
/// Indices are 0-based and contiguous and every efficiency core precedes every
/// performance core. The layout never changes once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterLayout {
    slots: Vec<CoreSlot>,
}

impl ClusterLayout {
    /// Lays out `clusters` in the given order.
    pub fn new(clusters: &[Cluster]) -> Result<Self, ClusterLayoutError> {
        let mut slots = Vec::new();
        let mut prev: Option<CpuType> = None;

        for cluster in clusters.iter().filter(|cluster| cluster.count > 0) {
            if !cluster.cpu_type.is_supported() {
                return Err(ClusterLayoutError::UnsupportedCpuType(cluster.cpu_type));
            }
            if let Some(prev) = prev {
                if !prev.is_efficiency() && cluster.cpu_type.is_efficiency() {
                    return Err(ClusterLayoutError::ClusterOrder(prev, cluster.cpu_type));
                }
            }
            prev = Some(cluster.cpu_type);

            for _ in 0..cluster.count {
                if slots.len() >= MAX_CORES as usize {
                    return Err(ClusterLayoutError::TooManyCores(
                        clusters.iter().map(|c| c.count as usize).sum(),
                    ));
                }
                let index = u32::try_from(slots.len())
                    .map_err(|_| ClusterLayoutError::TooManyCores(slots.len()))?;
                slots.push(CoreSlot {
                    index,
                    cpu_type: cluster.cpu_type,
                });
            }
        }

        if slots.is_empty() {
            return Err(ClusterLayoutError::Empty);
        }

        Ok(ClusterLayout { slots })
    }

    /// Convenience constructor for the usual two-cluster shape.
    pub fn two_cluster(
        small: CpuType,
        small_count: u32,
        large: CpuType,
        large_count: u32,
    ) -> Result<Self, ClusterLayoutError> {
        Self::new(&[
            Cluster::new(small, small_count),
            Cluster::new(large, large_count),
        ])
    }

    /// Total number of cores.
    pub fn total_count(&self) -> u32 {
        self.slots.last().map_or(0, |slot| slot.index + 1)
    }

    /// Number of efficiency class cores; these occupy indices `0..small_count()`.
    pub fn small_count(&self) -> u32 {
        self.count_where(|slot| slot.cpu_type.is_efficiency())
    }

    /// Number of performance class cores.
    pub fn large_count(&self) -> u32 {
        self.total_count() - self.small_count()
    }

    /// Number of cores of the given type.
    pub fn count_of(&self, cpu_type: CpuType) -> u32 {
        self.count_where(|slot| slot.cpu_type == cpu_type)
    }

    /// Slot at `index`, if the layout has that many cores.
    pub fn get(&self, index: u32) -> Option<&CoreSlot> {
        self.slots.get(index as usize)
    }

    /// Slots in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &CoreSlot> {
        self.slots.iter()
    }

    /// Distinct core types, in layout order.
    pub fn cpu_types(&self) -> Vec<CpuType> {
        let mut types: Vec<CpuType> = Vec::new();
        for slot in &self.slots {
            if types.last() != Some(&slot.cpu_type) {
                types.push(slot.cpu_type);
            }
        }
        types
    }

    fn count_where(&self, pred: impl Fn(&CoreSlot) -> bool) -> u32 {
        self.slots.iter().filter(|slot| pred(slot)).map(|_| 1).sum()
    }
}

impl<'a> IntoIterator for &'a ClusterLayout {
    type Item = &'a CoreSlot;
    type IntoIter = std::slice::Iter<'a, CoreSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_4_2() -> ClusterLayout {
        ClusterLayout::two_cluster(CpuType::CortexA55, 4, CpuType::CortexA76, 2).unwrap()
    }

    #[test]
    fn test_cpu_type_names() {
        assert_eq!(CpuType::CortexA55.to_string(), "cortex-a55");
        assert_eq!(CpuType::CortexA76.model_name(), "cortex-a76-arm-cpu");
        assert_eq!(CpuType::from_str("Cortex-A76"), Ok(CpuType::CortexA76));
        assert_eq!(
            CpuType::from_str("cortex-a55-arm-cpu"),
            Ok(CpuType::CortexA55)
        );
        assert_eq!(
            CpuType::from_str("cortex-x1"),
            Err(CpuTypeFromStrError(String::from("cortex-x1")))
        );
        assert_eq!(
            serde_json::from_str::<CpuType>("\"mongoose-m5\"").unwrap(),
            CpuType::MongooseM5
        );
    }

    #[test]
    fn test_small_cores_come_first() {
        let layout = layout_4_2();
        assert_eq!(layout.total_count(), 6);
        assert_eq!(layout.small_count(), 4);
        assert_eq!(layout.large_count(), 2);

        for slot in &layout {
            if slot.index < layout.small_count() {
                assert_eq!(slot.cpu_type, CpuType::CortexA55);
            } else {
                assert_eq!(slot.cpu_type, CpuType::CortexA76);
            }
        }
        assert_eq!(
            layout.cpu_types(),
            vec![CpuType::CortexA55, CpuType::CortexA76]
        );
    }

    #[test]
    fn test_indices_are_contiguous() {
        let layout = layout_4_2();
        for (expected, slot) in layout.iter().enumerate() {
            assert_eq!(slot.index as usize, expected);
        }
        assert_eq!(layout.get(5).unwrap().cpu_type, CpuType::CortexA76);
        assert!(layout.get(6).is_none());
    }

    #[test]
    fn test_unsupported_cluster() {
        let res = ClusterLayout::new(&[
            Cluster::new(CpuType::CortexA55, 4),
            Cluster::new(CpuType::CortexA76, 2),
            Cluster::new(CpuType::MongooseM5, 2),
        ]);
        assert_eq!(
            res,
            Err(ClusterLayoutError::UnsupportedCpuType(CpuType::MongooseM5))
        );

        // An empty cluster of an unsupported type instantiates nothing.
        ClusterLayout::new(&[
            Cluster::new(CpuType::CortexA55, 4),
            Cluster::new(CpuType::MongooseM5, 0),
        ])
        .unwrap();
    }

    #[test]
    fn test_cluster_order() {
        assert_eq!(
            ClusterLayout::two_cluster(CpuType::CortexA76, 2, CpuType::CortexA55, 4),
            Err(ClusterLayoutError::ClusterOrder(
                CpuType::CortexA76,
                CpuType::CortexA55
            ))
        );
    }

    #[test]
    fn test_layout_bounds() {
        assert_eq!(ClusterLayout::new(&[]), Err(ClusterLayoutError::Empty));
        assert_eq!(
            ClusterLayout::two_cluster(CpuType::CortexA55, 0, CpuType::CortexA76, 0),
            Err(ClusterLayoutError::Empty)
        );
        assert_eq!(
            ClusterLayout::two_cluster(CpuType::CortexA55, MAX_CORES, CpuType::CortexA76, 1),
            Err(ClusterLayoutError::TooManyCores(MAX_CORES as usize + 1))
        );
        assert_eq!(
            ClusterLayout::two_cluster(CpuType::CortexA55, 128, CpuType::CortexA76, 128),
            Err(ClusterLayoutError::TooManyCores(256))
        );
        let layout =
            ClusterLayout::two_cluster(CpuType::CortexA55, 128, CpuType::CortexA76, 127).unwrap();
        assert_eq!(layout.total_count(), MAX_CORES);
        let layout =
            ClusterLayout::two_cluster(CpuType::CortexA55, 0, CpuType::CortexA76, 3).unwrap();
        assert_eq!(layout.small_count(), 0);
        assert_eq!(layout.count_of(CpuType::CortexA76), 3);
    }
}
