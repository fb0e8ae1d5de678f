//! Per-engine consolidation: which boxes add nothing, which add something,
//! and how the boxes group into rows, columns and paragraphs.

pub mod layout;
pub mod service;
pub mod words;

use serde::{Deserialize, Serialize};

use crate::core::config::FusionConfig;
use crate::core::geometry::BBox;
use crate::core::model::{MergeGroup, NormalizedBox, WordToken};

pub use layout::{GroupingStrategy, LayoutGroup, LayoutKind};
pub use service::ConsolidationService;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedBox {
    pub id: usize,
    pub bbox: BBox,
    pub text: String,
    pub redundant: bool,
    pub unique_extra: bool,
    pub merged_group: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsolidationResult {
    pub boxes: Vec<ClassifiedBox>,
    pub merged_groups: Vec<MergeGroup>,
    pub layout_groups: Vec<LayoutGroup>,
}

/// Identity of a persisted consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationKey {
    pub document: String,
    pub tool: String,
    pub page: usize,
    pub strategy: GroupingStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsolidatedPageAnnotation {
    pub document: String,
    pub tool: String,
    pub page: usize,
    pub strategy: GroupingStrategy,
    #[serde(flatten)]
    pub result: ConsolidationResult,
}

impl ConsolidatedPageAnnotation {
    pub fn key(&self) -> AnnotationKey {
        AnnotationKey {
            document: self.document.clone(),
            tool: self.tool.clone(),
            page: self.page,
            strategy: self.strategy,
        }
    }
}

/// Classify one engine's boxes for a page against the page's words.
///
/// Pure and deterministic: the same boxes, words, strategy and config always
/// give the same result.
pub fn consolidate_page(
    boxes: &[NormalizedBox],
    words: &[WordToken],
    strategy: GroupingStrategy,
    config: &FusionConfig,
) -> ConsolidationResult {
    let rects: Vec<BBox> = boxes.iter().map(|b| b.bbox).collect();
    let covered: Vec<Vec<usize>> = rects
        .iter()
        .map(|rect| words::covered_words(rect, words))
        .collect();
    let flags = words::redundancy_flags(&rects, &covered);
    let merged_groups = layout::group_boxes(&rects, strategy, config);
    let layout_groups = layout::classify_groups(&rects, &merged_groups, strategy, &config.layout);

    let mut group_of = vec![0; rects.len()];
    for group in &merged_groups {
        for &member in &group.members {
            group_of[member] = group.id;
        }
    }

    let boxes = rects
        .iter()
        .enumerate()
        .map(|(id, rect)| ClassifiedBox {
            id,
            bbox: *rect,
            text: words::covered_text(&covered[id], words),
            redundant: flags[id].redundant,
            unique_extra: flags[id].unique_extra,
            merged_group: group_of[id],
        })
        .collect();

    ConsolidationResult {
        boxes,
        merged_groups,
        layout_groups,
    }
}
