//! Counter configuration
//!
//! All tuning values live here. Every field has a default, so a JSON file only
//! needs to name what it changes.

use crate::error::CounterError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Length of the stability window, in ticks.
pub const MAX_HISTORY: usize = 15;

/// Default tick cadence, roughly one display refresh at 30 Hz.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 33;

/// Top-level configuration for a counting session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub strategy: SegmentationStrategy,
    /// Accepted blob area range. `None` uses the strategy's default bounds.
    pub area: Option<AreaBounds>,
    /// Expected count. Only changes the status coloring, never the count.
    pub target_count: Option<u32>,
    pub tick_interval_ms: u64,
    /// Stop after this many ticks. `None` runs until the reporter closes.
    pub max_ticks: Option<u64>,
}

/// How a frame becomes a foreground mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentationStrategy {
    /// Luminance, optional blur, Otsu threshold.
    Intensity(IntensityParams),
    /// Inclusive HSV box.
    ColorRange(ColorRangeParams),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityParams {
    /// Gaussian sigma applied before thresholding. `None` skips the blur.
    pub blur_sigma: Option<f32>,
    /// Treat pixels at or below the Otsu level as foreground (dark items on a light tray).
    pub invert: bool,
    /// Apply a 3x3 morphological opening to the mask.
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRangeParams {
    /// Inclusive lower bound as [hue, saturation, value], hue in 0..=179.
    pub lower: [u8; 3],
    /// Inclusive upper bound as [hue, saturation, value], hue in 0..=179.
    pub upper: [u8; 3],
    pub open: bool,
}

/// Blob size window. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaBounds {
    pub min_area: f64,
    #[serde(default)]
    pub max_area: Option<f64>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            strategy: SegmentationStrategy::default(),
            area: None,
            target_count: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_ticks: None,
        }
    }
}

impl Default for SegmentationStrategy {
    fn default() -> Self {
        SegmentationStrategy::Intensity(IntensityParams::default())
    }
}

impl Default for ColorRangeParams {
    fn default() -> Self {
        // Yellow candy on a neutral tray.
        Self {
            lower: [20, 100, 100],
            upper: [35, 255, 255],
            open: false,
        }
    }
}

impl SegmentationStrategy {
    /// Area bounds the strategy was tuned against.
    pub fn default_area_bounds(&self) -> AreaBounds {
        match self {
            SegmentationStrategy::Intensity(_) => AreaBounds {
                min_area: 200.0,
                max_area: None,
            },
            SegmentationStrategy::ColorRange(_) => AreaBounds {
                min_area: 120.0,
                max_area: Some(5000.0),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SegmentationStrategy::Intensity(_) => "intensity",
            SegmentationStrategy::ColorRange(_) => "color_range",
        }
    }
}

impl CounterConfig {
    pub fn from_json_str(text: &str) -> Result<Self, CounterError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| CounterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CounterError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CounterError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// The effective area bounds: explicit ones, or the strategy defaults.
    pub fn area_bounds(&self) -> AreaBounds {
        self.area
            .unwrap_or_else(|| self.strategy.default_area_bounds())
    }

    pub fn validate(&self) -> Result<(), CounterError> {
        if self.tick_interval_ms == 0 {
            return Err(CounterError::Config("tick_interval_ms must be positive".into()));
        }

        let bounds = self.area_bounds();
        if !bounds.min_area.is_finite() || bounds.min_area < 0.0 {
            return Err(CounterError::Config(format!(
                "min_area must be a non-negative number, got {}",
                bounds.min_area
            )));
        }
        if let Some(max_area) = bounds.max_area {
            if max_area.is_nan() || max_area <= bounds.min_area {
                return Err(CounterError::Config(format!(
                    "max_area ({max_area}) must exceed min_area ({})",
                    bounds.min_area
                )));
            }
        }

        match &self.strategy {
            SegmentationStrategy::Intensity(params) => {
                if let Some(sigma) = params.blur_sigma {
                    if !(sigma.is_finite() && sigma > 0.0) {
                        return Err(CounterError::Config(format!(
                            "blur_sigma must be positive, got {sigma}"
                        )));
                    }
                }
            }
            SegmentationStrategy::ColorRange(params) => {
                for (channel, (low, high)) in ["hue", "saturation", "value"]
                    .iter()
                    .zip(params.lower.iter().zip(params.upper.iter()))
                {
                    if low > high {
                        return Err(CounterError::Config(format!(
                            "{channel} lower bound {low} exceeds upper bound {high}"
                        )));
                    }
                }
                if params.upper[0] > 179 {
                    return Err(CounterError::Config(format!(
                        "hue upper bound {} is outside 0..=179",
                        params.upper[0]
                    )));
                }
            }
        }

        Ok(())
    }
}
