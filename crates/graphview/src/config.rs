use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 3.0;
/// Above this alpha the simulation counts as still moving
pub const ALPHA_ANIMATING_LIMIT: f64 = 0.1;
/// Zoom above which nodes are rendered with full detail
pub const FULL_RENDER_LIMIT: f64 = 0.3;
/// Cache key used when auto-layout is off
pub const DEFAULT_KEY: &str = "DefaultKey";

/// How the collision radius of a node is chosen
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollideRadius {
    Fixed(f64),
    /// Half the node diagonal plus padding; nodes without a size fall back to 120
    FromSize { padding: f64 },
}

impl Default for CollideRadius {
    fn default() -> Self {
        CollideRadius::Fixed(120.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub link_distance: f64,
    /// Positive values attract
    pub charge_strength: f64,
    pub charge_distance_max: Option<f64>,
    pub collide_radius: CollideRadius,
    /// Pull toward the origin; `None` disables the x/y forces
    pub center_strength: Option<f64>,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub velocity_decay: f64,
    pub animating_limit: f64,
    pub reheat_alpha: f64,
    /// Synchronous ticks per node when the whole node set is replaced
    pub fast_forward_ticks_per_node: usize,
    pub seed: u64,
}

impl SimulationConfig {
    /// Ticks run synchronously when a node set of `nodes` replaces the current one
    pub fn fast_forward_ticks(&self, nodes: usize) -> usize {
        nodes.saturating_mul(self.fast_forward_ticks_per_node)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001f64;
        Self {
            link_distance: 120.0,
            charge_strength: 20.0,
            charge_distance_max: None,
            collide_radius: CollideRadius::default(),
            center_strength: Some(0.05),
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            animating_limit: ALPHA_ANIMATING_LIMIT,
            reheat_alpha: 0.1,
            fast_forward_ticks_per_node: 10,
            seed: 0x5eed,
        }
    }
}

/// Pixels to grow (positive) or shrink the canvas by on each side when culling
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offsets {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Offsets {
    pub fn uniform(value: f64) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub simulation: SimulationConfig,
    pub use_curve: bool,
    pub use_cache: bool,
    pub offsets: Offsets,
    pub full_render_limit: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            use_curve: false,
            use_cache: true,
            offsets: Offsets::default(),
            full_render_limit: FULL_RENDER_LIMIT,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            zoom_step: 1.1,
        }
    }
}

impl GraphConfig {
    pub fn zoom_range(&self) -> RangeInclusive<f64> {
        self.min_zoom..=self.max_zoom
    }

    /// Rejects zoom settings that cannot bound a transform.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.min_zoom) || !positive(self.max_zoom) {
            return Err(GraphError::InvalidConfig(format!(
                "zoom bounds must be positive, got {}..={}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(GraphError::InvalidConfig(format!(
                "min_zoom {} is above max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !positive(self.zoom_step) {
            return Err(GraphError::InvalidConfig(format!(
                "zoom_step must be positive, got {}",
                self.zoom_step
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Key under which the whole cache is stored
    pub storage_key: String,
    /// Node sets remembered before the least recently used one is evicted
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage_key: "schemaviz.layout-positions".to_string(),
            capacity: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alpha_decay_reaches_min_in_300_ticks() {
        let config = SimulationConfig::default();
        let alpha = (1.0 - config.alpha_decay).powi(300);
        assert!((alpha - config.alpha_min).abs() < 1e-12);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: GraphConfig =
            serde_json::from_str(r#"{"use_curve": true, "simulation": {"link_distance": 60}}"#)
                .unwrap();
        assert!(config.use_curve);
        assert!(config.use_cache);
        assert_eq!(config.simulation.link_distance, 60.0);
        assert_eq!(config.simulation.charge_strength, 20.0);
        assert_eq!(config.zoom_range(), MIN_ZOOM..=MAX_ZOOM);
    }

    #[test]
    fn test_validate_rejects_unusable_zoom() {
        assert!(GraphConfig::default().validate().is_ok());

        let inverted: GraphConfig = serde_json::from_str(r#"{"min_zoom": 5}"#).unwrap();
        assert!(matches!(inverted.validate(), Err(GraphError::InvalidConfig(_))));

        for config in [
            GraphConfig {
                min_zoom: f64::NAN,
                ..Default::default()
            },
            GraphConfig {
                min_zoom: 0.0,
                ..Default::default()
            },
            GraphConfig {
                max_zoom: f64::INFINITY,
                ..Default::default()
            },
            GraphConfig {
                zoom_step: -1.0,
                ..Default::default()
            },
        ] {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_fast_forward_ticks_saturate() {
        let config = SimulationConfig {
            fast_forward_ticks_per_node: usize::MAX,
            ..Default::default()
        };
        assert_eq!(config.fast_forward_ticks(3), usize::MAX);
        assert_eq!(SimulationConfig::default().fast_forward_ticks(4), 40);
    }

    #[test]
    fn test_collide_radius_from_json() {
        let radius: CollideRadius = serde_json::from_str(r#"{"from-size": {"padding": 8}}"#).unwrap();
        assert_eq!(radius, CollideRadius::FromSize { padding: 8.0 });
    }
}
