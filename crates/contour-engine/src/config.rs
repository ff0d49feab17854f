//! Configuration for the contour engine.

use contour_common::{ContourError, Rgba};
use serde::{Deserialize, Serialize};

/// Configuration for the contour engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest level set accepted by a full computation.
    pub max_levels: usize,

    /// Memory budget for the working grid, in cells.
    pub max_grid_cells: usize,

    /// Points a single traced level may produce before it is refused.
    pub max_points_per_level: usize,

    /// Keep the working grid after tracing so single levels can be adjusted.
    pub retain_working_grid: bool,

    /// Share of reported progress covered by sampling.
    pub sampling_weight: f32,

    /// Share of reported progress covered by tracing.
    pub tracing_weight: f32,

    /// Share of reported progress covered by projection.
    pub projecting_weight: f32,

    /// Base colors handed out to successive overlays.
    pub palette: Vec<Rgba>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_levels: 20,
            max_grid_cells: 64 * 1024 * 1024,
            max_points_per_level: 4_000_000,
            retain_working_grid: true,
            sampling_weight: 0.15,
            tracing_weight: 0.75,
            projecting_weight: 0.10,
            palette: default_palette(),
        }
    }
}

fn default_palette() -> Vec<Rgba> {
    vec![
        Rgba::opaque(0, 255, 0),
        Rgba::opaque(255, 0, 255),
        Rgba::opaque(0, 255, 255),
        Rgba::opaque(255, 200, 0),
        Rgba::opaque(255, 80, 80),
        Rgba::opaque(120, 160, 255),
    ]
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CONTOUR_MAX_LEVELS") {
            if let Ok(n) = val.parse() {
                config.max_levels = n;
            }
        }

        if let Ok(val) = std::env::var("CONTOUR_MAX_GRID_CELLS") {
            if let Ok(n) = val.parse() {
                config.max_grid_cells = n;
            }
        }

        if let Ok(val) = std::env::var("CONTOUR_MAX_POINTS_PER_LEVEL") {
            if let Ok(n) = val.parse() {
                config.max_points_per_level = n;
            }
        }

        if let Ok(val) = std::env::var("CONTOUR_RETAIN_GRID") {
            config.retain_working_grid = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("CONTOUR_PALETTE") {
            let palette: Vec<Rgba> = val.split(',').filter_map(|c| Rgba::parse(c.trim())).collect();
            if !palette.is_empty() {
                config.palette = palette;
            }
        }

        config
    }

    /// Load configuration from a JSON document; missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self, ContourError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_levels == 0 {
            return Err("max_levels must be > 0".to_string());
        }

        if self.max_grid_cells == 0 {
            return Err("max_grid_cells must be > 0".to_string());
        }

        if self.max_points_per_level == 0 {
            return Err("max_points_per_level must be > 0".to_string());
        }

        let weights = [self.sampling_weight, self.tracing_weight, self.projecting_weight];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err("progress weights must be within 0-1".to_string());
        }
        if (weights.iter().sum::<f32>() - 1.0).abs() > 1e-3 {
            return Err("progress weights must sum to 1".to_string());
        }

        if self.palette.is_empty() {
            return Err("palette must contain at least one color".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
        assert_eq!(EngineConfig::default().max_levels, 20);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = EngineConfig {
            tracing_weight: 0.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "max_levels": 5, "retain_working_grid": false }"#)
            .unwrap();
        assert_eq!(config.max_levels, 5);
        assert!(!config.retain_working_grid);
        assert_eq!(config.max_grid_cells, EngineConfig::default().max_grid_cells);
    }

    #[test]
    fn test_bad_json_is_invalid_request() {
        assert!(matches!(
            EngineConfig::from_json("{ nope"),
            Err(ContourError::InvalidRequest(_))
        ));
    }
}
