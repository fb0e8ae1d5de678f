//! Thresholds and colours shared by every computation.
//!
//! Nothing reads process-wide defaults: callers build a [`FusionConfig`]
//! (usually `FusionConfig::default()` or one loaded from disk) and pass it in.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// IoU at or above which a box duplicates an existing union region.
pub const DEFAULT_DEDUP_IOU: f32 = 0.9;
/// IoU at or above which an engine box matches a union region.
pub const DEFAULT_MATCH_IOU: f32 = 0.5;
/// Gap allowed between stacked (vertical) or adjacent (horizontal) boxes.
pub const DEFAULT_MERGE_GAP: f32 = 0.02;
/// Centre proximity for the paragraph merge mode.
pub const DEFAULT_PROXIMITY: f32 = 0.03;
/// Horizontal centre alignment for the `vertical_centers` grouping.
pub const DEFAULT_CENTER_ALIGN: f32 = 0.02;
/// Vertical gap for the consolidation `paragraph` grouping.
pub const DEFAULT_PARAGRAPH_GAP: f32 = 0.03;
/// Minimum intersection width / smaller width for the `paragraph` grouping.
pub const DEFAULT_PARAGRAPH_OVERLAP: f32 = 0.3;

/// How engine boxes are assigned to union regions when scoring coverage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Each box, in original order, takes its best unused region.
    #[default]
    Greedy,
    /// Maximum-cardinality bipartite matching.
    Optimal,
}

impl std::str::FromStr for MatchMode {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "optimal" | "bipartite" => Ok(Self::Optimal),
            other => Err(FusionError::UnknownOption {
                kind: "match mode",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutThresholds {
    pub column_max_std_x: f32,
    pub column_min_std_y: f32,
    pub row_max_std_y: f32,
    pub row_min_std_x: f32,
}

impl Default for LayoutThresholds {
    fn default() -> Self {
        Self {
            column_max_std_x: 0.01,
            column_min_std_y: 0.02,
            row_max_std_y: 0.005,
            row_min_std_x: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    pub dedup_iou: f32,
    pub match_iou: f32,
    pub match_mode: MatchMode,
    pub vertical_gap: f32,
    pub horizontal_gap: f32,
    pub proximity: f32,
    pub center_align: f32,
    pub paragraph_gap: f32,
    pub paragraph_overlap: f32,
    pub layout: LayoutThresholds,
    /// Render resolution for overlays.
    pub dpi: u32,
    /// Outline colour per engine; engines not listed get [`FALLBACK_COLOR`].
    pub colors: IndexMap<String, [u8; 3]>,
}

/// Outline colour for engines without an entry in [`FusionConfig::colors`].
pub const FALLBACK_COLOR: [u8; 3] = [0, 255, 255];

impl Default for FusionConfig {
    fn default() -> Self {
        let colors = [
            ("pymupdf", [0, 255, 0]),
            ("pdfplumber", [255, 0, 0]),
            ("pypdf2", [0, 0, 255]),
            ("tesseract", [255, 255, 0]),
            ("markitdown", [255, 0, 255]),
        ]
        .into_iter()
        .map(|(name, rgb)| (name.to_string(), rgb))
        .collect();

        Self {
            dedup_iou: DEFAULT_DEDUP_IOU,
            match_iou: DEFAULT_MATCH_IOU,
            match_mode: MatchMode::Greedy,
            vertical_gap: DEFAULT_MERGE_GAP,
            horizontal_gap: DEFAULT_MERGE_GAP,
            proximity: DEFAULT_PROXIMITY,
            center_align: DEFAULT_CENTER_ALIGN,
            paragraph_gap: DEFAULT_PARAGRAPH_GAP,
            paragraph_overlap: DEFAULT_PARAGRAPH_OVERLAP,
            layout: LayoutThresholds::default(),
            dpi: 200,
            colors,
        }
    }
}

impl FusionConfig {
    /// Load from a `.toml` or `.json` file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| FusionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&data).map_err(|err| FusionError::Config {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?,
            _ => toml::from_str(&data).map_err(|err| FusionError::Config {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Thresholds must be finite and non-negative; IoU thresholds at most 1.
    /// The render resolution must be positive.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("dedup_iou", self.dedup_iou, true),
            ("match_iou", self.match_iou, true),
            ("vertical_gap", self.vertical_gap, false),
            ("horizontal_gap", self.horizontal_gap, false),
            ("proximity", self.proximity, false),
            ("center_align", self.center_align, false),
            ("paragraph_gap", self.paragraph_gap, false),
            ("paragraph_overlap", self.paragraph_overlap, true),
            ("layout.column_max_std_x", self.layout.column_max_std_x, false),
            ("layout.column_min_std_y", self.layout.column_min_std_y, false),
            ("layout.row_max_std_y", self.layout.row_max_std_y, false),
            ("layout.row_min_std_x", self.layout.row_min_std_x, false),
        ];
        for (name, value, at_most_one) in checks {
            if !value.is_finite() || value < 0.0 || (at_most_one && value > 1.0) {
                return Err(FusionError::InvalidThreshold { name, value });
            }
        }
        if self.dpi == 0 {
            return Err(FusionError::InvalidThreshold {
                name: "dpi",
                value: 0.0,
            });
        }
        Ok(())
    }

    pub fn color_for(&self, engine: &str) -> [u8; 3] {
        self.colors.get(engine).copied().unwrap_or(FALLBACK_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_constants() {
        let config = FusionConfig::default();
        assert_eq!(config.dedup_iou, 0.9);
        assert_eq!(config.match_iou, 0.5);
        assert_eq!(config.match_mode, MatchMode::Greedy);
        assert_eq!(config.color_for("pdfplumber"), [255, 0, 0]);
        assert_eq!(config.color_for("unknown"), FALLBACK_COLOR);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_partial_toml() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "match_iou = 0.6\nmatch_mode = \"optimal\"\n[layout]\nrow_max_std_y = 0.01")?;
        let config = FusionConfig::load(file.path())?;
        assert_eq!(config.match_iou, 0.6);
        assert_eq!(config.match_mode, MatchMode::Optimal);
        assert_eq!(config.layout.row_max_std_y, 0.01);
        assert_eq!(config.layout.column_max_std_x, 0.01);
        assert_eq!(config.dedup_iou, 0.9);
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let config = FusionConfig {
            match_iou: 1.5,
            ..FusionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FusionError::InvalidThreshold { name: "match_iou", .. })
        ));
    }

    #[test]
    fn rejects_bad_layout_thresholds_and_dpi() {
        let mut config = FusionConfig::default();
        config.layout.row_min_std_x = f32::NAN;
        assert!(matches!(
            config.validate(),
            Err(FusionError::InvalidThreshold { name: "layout.row_min_std_x", .. })
        ));

        let config = FusionConfig {
            dpi: 0,
            ..FusionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FusionError::InvalidThreshold { name: "dpi", .. })
        ));
    }

    #[test]
    fn parses_match_mode_names() {
        assert_eq!("bipartite".parse::<MatchMode>().unwrap(), MatchMode::Optimal);
        assert_eq!("Greedy".parse::<MatchMode>().unwrap(), MatchMode::Greedy);
        assert!("hungarian".parse::<MatchMode>().is_err());
    }
}
