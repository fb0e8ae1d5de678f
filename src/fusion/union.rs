use crate::core::model::{EngineBlockSet, NormalizedBox, UnionRegion};

/// Collapse every engine's boxes for one page into canonical regions.
///
/// Engines are visited in the set's order and boxes in their original order.
/// A box whose IoU with an existing region reaches `dedup_iou` is dropped and
/// the existing region is kept verbatim: the first box seen for a region is
/// its representative, and duplicates never move or grow it.
pub fn build_union(set: &EngineBlockSet, dedup_iou: f32) -> Vec<UnionRegion> {
    let mut union: Vec<UnionRegion> = Vec::new();
    for boxes in set.engines.values() {
        for candidate in boxes {
            if duplicate_of(&union, candidate, dedup_iou).is_none() {
                union.push(UnionRegion::from(candidate));
            }
        }
    }
    tracing::debug!(
        page = set.page,
        input = set.total_boxes(),
        regions = union.len(),
        "built union"
    );
    union
}

/// Index of the first region the candidate duplicates, scanning in insertion order.
fn duplicate_of(union: &[UnionRegion], candidate: &NormalizedBox, dedup_iou: f32) -> Option<usize> {
    union
        .iter()
        .position(|region| region.bbox.iou(&candidate.bbox) >= dedup_iou)
}
