//! Tree and carving configuration.

use serde::{Deserialize, Serialize};

use crate::{flags::NodeFlags, TreeError};

/// Deepest subdivision a tree accepts. Depth 20 already means a million
/// cells per side.
pub const MAX_TREE_DEPTH: u32 = 20;

/// Shape of the [`Tree`](crate::tree::Tree).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Leaves at this depth never split (root depth is 0).
    pub max_depth: u32,
    /// A leaf splits when a sample arrives and it already holds this many.
    pub leaf_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            leaf_capacity: 8,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.max_depth > MAX_TREE_DEPTH {
            return Err(TreeError::InvalidConfig(format!(
                "Max depth {} is above {MAX_TREE_DEPTH}",
                self.max_depth
            )));
        }
        if self.leaf_capacity == 0 {
            return Err(TreeError::InvalidConfig(
                "Leaf capacity should be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parameters of a [`Carver`](crate::carving::Carver) run.
///
/// Lengths are expressed in multiples of a sample's scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarvingConfig {
    /// Cone end radius, relative to the sample footprint.
    pub radius_factor: f64,
    /// Gap left between the end of an emptiness cone and its sample.
    pub emptiness_margin: f64,
    /// How far behind its sample an occupancy cone reaches.
    pub occupancy_depth: f64,
    /// Emptiness passes only visit nodes already carrying these flags.
    pub emptiness_required: NodeFlags,
    /// Occupancy passes only visit nodes already carrying these flags.
    pub occupancy_required: NodeFlags,
    /// Checker depth limit, the tree's own one when unset.
    pub max_depth: Option<u32>,
    /// Mark leaves holding samples with `SAMPLENESS` first.
    pub mark_samples: bool,
    /// Run the passes of a family on the rayon thread pool.
    pub parallel: bool,
}

impl Default for CarvingConfig {
    fn default() -> Self {
        Self {
            radius_factor: 1.0,
            emptiness_margin: 2.0,
            occupancy_depth: 3.0,
            emptiness_required: NodeFlags::empty(),
            occupancy_required: NodeFlags::empty(),
            max_depth: None,
            mark_samples: true,
            parallel: true,
        }
    }
}

impl CarvingConfig {
    pub fn validate(&self) -> Result<(), TreeError> {
        if !(self.radius_factor.is_finite() && self.radius_factor > 0.0) {
            return Err(TreeError::InvalidConfig(format!(
                "Radius factor should be positive: {}",
                self.radius_factor
            )));
        }
        if !(self.emptiness_margin.is_finite() && self.emptiness_margin >= 0.0) {
            return Err(TreeError::InvalidConfig(format!(
                "Emptiness margin should not be negative: {}",
                self.emptiness_margin
            )));
        }
        if !(self.occupancy_depth.is_finite() && self.occupancy_depth > 0.0) {
            return Err(TreeError::InvalidConfig(format!(
                "Occupancy depth should be positive: {}",
                self.occupancy_depth
            )));
        }
        if let Some(depth) = self.max_depth {
            if depth > MAX_TREE_DEPTH {
                return Err(TreeError::InvalidConfig(format!(
                    "Max depth {depth} is above {MAX_TREE_DEPTH}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(TreeConfig::default().validate(), Ok(()));
        assert_eq!(CarvingConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_invalid() {
        let tree = TreeConfig {
            leaf_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(tree.validate(), Err(TreeError::InvalidConfig(_))));

        let tree = TreeConfig {
            max_depth: 30,
            ..Default::default()
        };
        assert!(tree.validate().is_err());

        for carving in [
            CarvingConfig {
                radius_factor: 0.0,
                ..Default::default()
            },
            CarvingConfig {
                emptiness_margin: -1.0,
                ..Default::default()
            },
            CarvingConfig {
                occupancy_depth: f64::NAN,
                ..Default::default()
            },
            CarvingConfig {
                max_depth: Some(21),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                carving.validate(),
                Err(TreeError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_json() {
        let config: CarvingConfig =
            serde_json::from_str(r#"{ "radius_factor": 0.5, "occupancy_required": 4 }"#).unwrap();
        assert_eq!(config.radius_factor, 0.5);
        assert_eq!(config.occupancy_required, NodeFlags::SAMPLENESS);
        assert_eq!(config.emptiness_margin, 2.0);
        assert!(config.parallel);

        let text = serde_json::to_string(&config).unwrap();
        let back: CarvingConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);

        let tree: TreeConfig = serde_json::from_str(r#"{ "max_depth": 6 }"#).unwrap();
        assert_eq!(tree.leaf_capacity, 8);
        assert_eq!(tree.max_depth, 6);
    }
}
