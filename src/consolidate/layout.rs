use serde::{Deserialize, Serialize};

use crate::core::config::{FusionConfig, LayoutThresholds};
use crate::core::geometry::{Axis, BBox};
use crate::core::model::MergeGroup;
use crate::error::FusionError;
use crate::merge::flood;

/// Adjacency rule used to group one engine's boxes during consolidation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    Overlap,
    VerticalCenters,
    Paragraph,
}

impl GroupingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overlap => "overlap",
            Self::VerticalCenters => "vertical_centers",
            Self::Paragraph => "paragraph",
        }
    }
}

impl std::fmt::Display for GroupingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GroupingStrategy {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overlap" => Ok(Self::Overlap),
            "vertical_centers" | "vertical-centers" => Ok(Self::VerticalCenters),
            "paragraph" => Ok(Self::Paragraph),
            other => Err(FusionError::UnknownOption {
                kind: "grouping strategy",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Row,
    Column,
    Paragraph,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutGroup {
    pub group_id: usize,
    pub layout: LayoutKind,
    /// Population standard deviation of member left edges.
    pub std_x: f32,
    /// Population standard deviation of member top edges.
    pub std_y: f32,
}

pub fn group_boxes(boxes: &[BBox], strategy: GroupingStrategy, config: &FusionConfig) -> Vec<MergeGroup> {
    let order = flood::top_down_order(boxes);
    match strategy {
        GroupingStrategy::Overlap => flood::connected_groups(boxes, &order, |u, v| u.iou(v) > 0.0),
        GroupingStrategy::VerticalCenters => {
            let tolerance = config.center_align;
            flood::connected_groups(boxes, &order, |u, v| {
                (u.center().0 - v.center().0).abs() <= tolerance
            })
        }
        GroupingStrategy::Paragraph => {
            let gap = config.paragraph_gap;
            let min_ratio = config.paragraph_overlap;
            flood::connected_groups(boxes, &order, |u, v| {
                let vertically_close =
                    u.axis_overlap(v, Axis::Y) > 0.0 || u.axis_gap(v, Axis::Y) <= gap;
                vertically_close && horizontal_overlap_ratio(u, v) >= min_ratio
            })
        }
    }
}

/// Layout role of every group. `vertical_centers` groups are columns and
/// `paragraph` groups are paragraphs by construction; `overlap` groups are
/// classified from the spread of their members.
pub fn classify_groups(
    boxes: &[BBox],
    groups: &[MergeGroup],
    strategy: GroupingStrategy,
    thresholds: &LayoutThresholds,
) -> Vec<LayoutGroup> {
    groups
        .iter()
        .map(|group| {
            let (std_x, std_y) = member_spread(boxes, &group.members);
            let layout = match strategy {
                GroupingStrategy::VerticalCenters => LayoutKind::Column,
                GroupingStrategy::Paragraph => LayoutKind::Paragraph,
                GroupingStrategy::Overlap => classify_spread(std_x, std_y, thresholds),
            };
            LayoutGroup {
                group_id: group.id,
                layout,
                std_x,
                std_y,
            }
        })
        .collect()
}

pub fn classify_spread(std_x: f32, std_y: f32, thresholds: &LayoutThresholds) -> LayoutKind {
    if std_x < thresholds.column_max_std_x && std_y > thresholds.column_min_std_y {
        LayoutKind::Column
    } else if std_y < thresholds.row_max_std_y && std_x > thresholds.row_min_std_x {
        LayoutKind::Row
    } else {
        LayoutKind::Paragraph
    }
}

/// Intersection width over the narrower box's width.
fn horizontal_overlap_ratio(u: &BBox, v: &BBox) -> f32 {
    let narrower = u.width().min(v.width());
    if narrower <= 0.0 {
        return 0.0;
    }
    u.axis_overlap(v, Axis::X) / narrower
}

fn member_spread(boxes: &[BBox], members: &[usize]) -> (f32, f32) {
    let xs: Vec<f64> = members.iter().map(|&m| f64::from(boxes[m].x0)).collect();
    let ys: Vec<f64> = members.iter().map(|&m| f64::from(boxes[m].y0)).collect();
    (population_std(&xs) as f32, population_std(&ys) as f32)
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
