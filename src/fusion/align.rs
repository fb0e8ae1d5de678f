use serde::{Deserialize, Serialize};

use crate::core::model::{EngineBlockSet, NormalizedBox};

/// Best counterpart of one box in another engine's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    pub index: usize,
    pub iou: f32,
}

/// Overlap between two engines on one page, measured in both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlapStats {
    pub page: usize,
    pub engine_a: String,
    pub engine_b: String,
    pub boxes_a: usize,
    pub boxes_b: usize,
    /// Boxes of A whose best match in B reaches the threshold.
    pub matched_a_in_b: usize,
    pub matched_b_in_a: usize,
    /// Mean over A's boxes of the best IoU found in B (0 when A is empty).
    pub avg_best_iou_a_to_b: f32,
    pub avg_best_iou_b_to_a: f32,
}

/// For every box in `a`, the highest-IoU box in `b`. Ties keep the lowest
/// index; boxes without any overlap get `None`.
pub fn best_matches(a_blocks: &[NormalizedBox], b_blocks: &[NormalizedBox]) -> Vec<Option<BestMatch>> {
    a_blocks
        .iter()
        .map(|a| {
            let mut best: Option<BestMatch> = None;
            for (index, b) in b_blocks.iter().enumerate() {
                let iou = a.bbox.iou(&b.bbox);
                if iou > 0.0 && best.map_or(true, |m| iou > m.iou) {
                    best = Some(BestMatch { index, iou });
                }
            }
            best
        })
        .collect()
}

pub fn overlap_stats(
    page: usize,
    engine_a: &str,
    a_blocks: &[NormalizedBox],
    engine_b: &str,
    b_blocks: &[NormalizedBox],
    threshold: f32,
) -> OverlapStats {
    let (matched_a_in_b, avg_best_iou_a_to_b) = directional(a_blocks, b_blocks, threshold);
    let (matched_b_in_a, avg_best_iou_b_to_a) = directional(b_blocks, a_blocks, threshold);
    OverlapStats {
        page,
        engine_a: engine_a.to_string(),
        engine_b: engine_b.to_string(),
        boxes_a: a_blocks.len(),
        boxes_b: b_blocks.len(),
        matched_a_in_b,
        matched_b_in_a,
        avg_best_iou_a_to_b,
        avg_best_iou_b_to_a,
    }
}

/// Stats for every unordered engine pair on the page, in engine order.
pub fn pairwise_overlaps(set: &EngineBlockSet, threshold: f32) -> Vec<OverlapStats> {
    let engines: Vec<(&String, &Vec<NormalizedBox>)> = set.engines.iter().collect();
    let mut stats = Vec::new();
    for (i, (name_a, a)) in engines.iter().enumerate() {
        for (name_b, b) in engines.iter().skip(i + 1) {
            stats.push(overlap_stats(set.page, name_a, a, name_b, b, threshold));
        }
    }
    stats
}

fn directional(from: &[NormalizedBox], to: &[NormalizedBox], threshold: f32) -> (usize, f32) {
    if from.is_empty() {
        return (0, 0.0);
    }
    let matches = best_matches(from, to);
    let matched = matches
        .iter()
        .flatten()
        .filter(|m| m.iou >= threshold)
        .count();
    let total: f32 = matches.iter().flatten().map(|m| m.iou).sum();
    (matched, total / from.len() as f32)
}
