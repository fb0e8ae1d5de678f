//! Spatial merging of fragmented boxes (words, lines) into larger groups.

pub mod flood;

use serde::{Deserialize, Serialize};

use crate::core::config::FusionConfig;
use crate::core::geometry::{Axis, BBox};
use crate::core::model::{EngineBlockSet, MergeGroup, NormalizedBox};
use crate::error::FusionError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Stacked boxes sharing horizontal extent.
    Vertical,
    /// Side-by-side boxes sharing vertical extent.
    Horizontal,
    /// Overlapping boxes or boxes whose centres line up on either axis.
    #[serde(alias = "auto")]
    Paragraph,
}

impl std::str::FromStr for MergeMode {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            "paragraph" | "auto" => Ok(Self::Paragraph),
            other => Err(FusionError::UnknownOption {
                kind: "merge mode",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeResult {
    pub mode: MergeMode,
    pub groups: Vec<MergeGroup>,
}

/// Group `boxes` under `mode`. Member ids are positions in `boxes`.
pub fn merge_boxes(boxes: &[NormalizedBox], mode: MergeMode, config: &FusionConfig) -> MergeResult {
    let rects: Vec<BBox> = boxes.iter().map(|b| b.bbox).collect();
    let groups = match mode {
        MergeMode::Vertical => {
            let tolerance = config.vertical_gap;
            flood::connected_groups(&rects, &flood::top_down_order(&rects), |u, v| {
                stacked(u, v, tolerance)
            })
        }
        MergeMode::Horizontal => {
            let tolerance = config.horizontal_gap;
            flood::connected_groups(&rects, &flood::left_right_order(&rects), |u, v| {
                side_by_side(u, v, tolerance)
            })
        }
        MergeMode::Paragraph => {
            let tolerance = config.proximity;
            flood::connected_groups(&rects, &flood::top_down_order(&rects), |u, v| {
                near(u, v, tolerance)
            })
        }
    };
    tracing::debug!(?mode, boxes = boxes.len(), groups = groups.len(), "merged boxes");
    MergeResult { mode, groups }
}

/// Merge one page's boxes, restricted to `engines` when that list is non-empty.
pub fn merge_page(
    set: &EngineBlockSet,
    engines: &[String],
    mode: MergeMode,
    config: &FusionConfig,
) -> MergeResult {
    merge_boxes(&set.flatten(engines), mode, config)
}

fn stacked(u: &BBox, v: &BBox, tolerance: f32) -> bool {
    u.axis_overlap(v, Axis::X) > 0.0 && u.axis_gap(v, Axis::Y) <= tolerance
}

fn side_by_side(u: &BBox, v: &BBox, tolerance: f32) -> bool {
    u.axis_overlap(v, Axis::Y) > 0.0 && u.axis_gap(v, Axis::X) <= tolerance
}

fn near(u: &BBox, v: &BBox, tolerance: f32) -> bool {
    if u.iou(v) > 0.0 {
        return true;
    }
    let (ux, uy) = u.center();
    let (vx, vy) = v.center();
    (ux - vx).abs() <= tolerance || (uy - vy).abs() <= tolerance
}
