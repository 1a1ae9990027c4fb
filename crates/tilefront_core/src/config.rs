//! Match configuration.
//!
//! A [`MatchConfig`] is plain data loaded from RON. Difficulty scales the
//! requested map dimensions and the density of resource deposits.
//!
//! ```
//! use tilefront_core::config::{Difficulty, MatchConfig};
//!
//! let config = MatchConfig::from_ron_str("(width: 60, height: 50, seed: 7, difficulty: Hard)")
//!     .unwrap();
//! assert_eq!(config.effective_dimensions(), (72, 60));
//! assert_eq!(config.difficulty, Difficulty::Hard);
//! ```

use serde::{Deserialize, Serialize};

use crate::economy::ResourceAmounts;
use crate::error::{GameError, Result};
use crate::map_generation::{MapConfig, MIN_MAP_DIMENSION};
use crate::pathfinding::Connectivity;

/// Upper bound on either effective map dimension.
pub const MAX_MAP_DIMENSION: u32 = 512;

/// Difficulty setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Smaller map, richer resources.
    Easy,
    /// Baseline.
    #[default]
    Normal,
    /// Larger map, scarcer resources.
    Hard,
}

impl Difficulty {
    /// Map dimension scale in percent.
    #[must_use]
    pub const fn dimension_percent(self) -> u32 {
        match self {
            Self::Easy => 80,
            Self::Normal => 100,
            Self::Hard => 120,
        }
    }

    /// Resource deposit count scale in percent.
    #[must_use]
    pub const fn resource_percent(self) -> u32 {
        match self {
            Self::Easy => 125,
            Self::Normal => 100,
            Self::Hard => 75,
        }
    }
}

/// Settings for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Requested width before difficulty scaling.
    pub width: u32,
    /// Requested height before difficulty scaling.
    pub height: u32,
    /// Terrain seed.
    pub seed: u64,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Resources each side starts with.
    pub starting_resources: ResourceAmounts,
    /// Pathfinding neighbourhood.
    pub connectivity: Connectivity,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            seed: 12_345,
            difficulty: Difficulty::Normal,
            starting_resources: ResourceAmounts::new(50, 20, 30),
            connectivity: Connectivity::FourWay,
        }
    }
}

impl MatchConfig {
    /// Default config with a given requested size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the difficulty.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the starting resources.
    #[must_use]
    pub fn with_starting_resources(mut self, resources: ResourceAmounts) -> Self {
        self.starting_resources = resources;
        self
    }

    /// Set the pathfinding neighbourhood.
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Parse from RON text and validate.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(text).map_err(|e| GameError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Map dimensions after difficulty scaling.
    #[must_use]
    pub fn effective_dimensions(&self) -> (u32, u32) {
        let pct = u64::from(self.difficulty.dimension_percent());
        let scale = |v: u32| (u64::from(v) * pct / 100).min(u64::from(u32::MAX)) as u32;
        (scale(self.width), scale(self.height))
    }

    /// Check that the scaled dimensions are usable.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.effective_dimensions();
        if w < MIN_MAP_DIMENSION || h < MIN_MAP_DIMENSION {
            return Err(GameError::InvalidConfig(format!(
                "map {w}x{h} is smaller than the {MIN_MAP_DIMENSION}x{MIN_MAP_DIMENSION} minimum"
            )));
        }
        if w > MAX_MAP_DIMENSION || h > MAX_MAP_DIMENSION {
            return Err(GameError::InvalidConfig(format!(
                "map {w}x{h} exceeds the {MAX_MAP_DIMENSION}x{MAX_MAP_DIMENSION} maximum"
            )));
        }
        Ok(())
    }

    /// Terrain generator settings for this match.
    #[must_use]
    pub fn map_config(&self) -> MapConfig {
        let (w, h) = self.effective_dimensions();
        MapConfig::new(w, h)
            .with_seed(self.seed)
            .with_resource_percent(self.difficulty.resource_percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.effective_dimensions(), (100, 100));
        assert_eq!(config.starting_resources, ResourceAmounts::new(50, 20, 30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_difficulty_scales_dimensions() {
        let easy = MatchConfig::new(100, 50).with_difficulty(Difficulty::Easy);
        let hard = MatchConfig::new(100, 50).with_difficulty(Difficulty::Hard);

        assert_eq!(easy.effective_dimensions(), (80, 40));
        assert_eq!(hard.effective_dimensions(), (120, 60));
    }

    #[test]
    fn test_too_small_after_scaling_is_rejected() {
        let config = MatchConfig::new(28, 28).with_difficulty(Difficulty::Easy);
        assert!(matches!(
            config.validate(),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = MatchConfig::from_ron_str("(seed: 99)").unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.width, 100);
        assert_eq!(config.starting_resources.metal, 50);
    }

    #[test]
    fn test_ron_with_resources_and_connectivity() {
        let text = r"(
            width: 40,
            height: 40,
            starting_resources: (metal: 500, gold: 200),
            connectivity: EightWay,
        )";
        let config = MatchConfig::from_ron_str(text).unwrap();

        assert_eq!(config.starting_resources, ResourceAmounts::new(500, 200, 0));
        assert_eq!(config.connectivity, Connectivity::EightWay);
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        assert!(matches!(
            MatchConfig::from_ron_str("(width: \"wide\")"),
            Err(GameError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_map_config_carries_resource_scale() {
        let config = MatchConfig::new(50, 50).with_difficulty(Difficulty::Hard);
        let map_config = config.map_config();
        assert_eq!(map_config.width, 60);
        assert_eq!(map_config.resource_percent, 75);
        assert_eq!(map_config.seed, config.seed);
    }
}
