pub mod align;
pub mod compare;
pub mod coverage;
pub mod union;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::config::FusionConfig;
use crate::core::model::{EngineBlockSet, UnionRegion};
use align::OverlapStats;
use coverage::PageCoverage;

/// Everything derived from one page's engine outputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageConsensus {
    pub page: usize,
    pub union: Vec<UnionRegion>,
    pub coverage: PageCoverage,
    pub overlaps: Vec<OverlapStats>,
    pub box_counts: IndexMap<String, usize>,
}

pub trait FusionEngine {
    fn fuse(&self, set: &EngineBlockSet) -> PageConsensus;
}

/// Union by first-seen representative, coverage by the configured match mode.
#[derive(Debug, Clone, Default)]
pub struct SimpleFusionEngine {
    config: FusionConfig,
}

impl SimpleFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }
}

impl FusionEngine for SimpleFusionEngine {
    fn fuse(&self, set: &EngineBlockSet) -> PageConsensus {
        let union = union::build_union(set, self.config.dedup_iou);
        let coverage =
            coverage::page_coverage(set, &union, self.config.match_iou, self.config.match_mode);
        let overlaps = align::pairwise_overlaps(set, self.config.match_iou);
        let box_counts = set
            .engines
            .iter()
            .map(|(name, boxes)| (name.clone(), boxes.len()))
            .collect();
        PageConsensus {
            page: set.page,
            union,
            coverage,
            overlaps,
            box_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::model::NormalizedBox;

    #[test]
    fn fuses_a_page() {
        let mut set = EngineBlockSet::new(4);
        let line = |engine: &str, y: f32| {
            NormalizedBox::new(4, BBox::new(0.1, y, 0.9, y + 0.04), engine).unwrap()
        };
        set.insert("pymupdf", vec![line("pymupdf", 0.1), line("pymupdf", 0.2)]);
        set.insert("tesseract", vec![line("tesseract", 0.1)]);

        let fused = SimpleFusionEngine::default().fuse(&set);
        assert_eq!(fused.page, 4);
        assert_eq!(fused.union.len(), 2);
        assert_eq!(fused.coverage.engines["pymupdf"], 1.0);
        assert_eq!(fused.coverage.engines["tesseract"], 0.5);
        assert_eq!(fused.box_counts["tesseract"], 1);
        assert_eq!(fused.overlaps.len(), 1);
    }
}
