//! How much of the canonical union each engine reproduces.
//!
//! Two assignment policies exist and the caller always picks one explicitly
//! through [`MatchMode`]. `Greedy` walks an engine's boxes in original order
//! and gives each the best still-unused region. `Optimal` computes a
//! maximum-cardinality bipartite matching with augmenting paths, so it never
//! matches fewer regions than `Greedy`; the two can disagree when one box is
//! the best candidate for several regions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::config::MatchMode;
use crate::core::model::{EngineBlockSet, NormalizedBox, UnionRegion};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageCoverage {
    pub page: usize,
    /// Number of union regions on the page; the page's weight in the document score.
    pub union: usize,
    pub engines: IndexMap<String, f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoverageReport {
    pub per_page: Vec<PageCoverage>,
    pub per_document: IndexMap<String, f32>,
}

/// For every engine box, the union region it was matched to (if any).
pub fn assign(
    boxes: &[NormalizedBox],
    union: &[UnionRegion],
    threshold: f32,
    mode: MatchMode,
) -> Vec<Option<usize>> {
    match mode {
        MatchMode::Greedy => assign_greedy(boxes, union, threshold),
        MatchMode::Optimal => assign_optimal(boxes, union, threshold),
    }
}

/// `matches / |union|`, or 0 for an empty union.
pub fn coverage_ratio(
    boxes: &[NormalizedBox],
    union: &[UnionRegion],
    threshold: f32,
    mode: MatchMode,
) -> f32 {
    if union.is_empty() {
        return 0.0;
    }
    let matched = assign(boxes, union, threshold, mode)
        .iter()
        .filter(|slot| slot.is_some())
        .count();
    matched as f32 / union.len() as f32
}

/// Coverage of every engine in `set` against `union`.
pub fn page_coverage(
    set: &EngineBlockSet,
    union: &[UnionRegion],
    threshold: f32,
    mode: MatchMode,
) -> PageCoverage {
    let engines = set
        .engines
        .iter()
        .map(|(name, boxes)| (name.clone(), coverage_ratio(boxes, union, threshold, mode)))
        .collect();
    PageCoverage {
        page: set.page,
        union: union.len(),
        engines,
    }
}

/// Union-size weighted average of per-page coverage.
///
/// Pages with an empty union carry no weight. Every engine in `engines`
/// appears in the result; an engine missing from a weighted page counts as 0
/// there.
pub fn document_coverage(pages: &[PageCoverage], engines: &[String]) -> IndexMap<String, f32> {
    let mut totals: IndexMap<String, f64> = engines.iter().map(|e| (e.clone(), 0.0)).collect();
    let mut weight = 0_u64;
    for page in pages.iter().filter(|p| p.union > 0) {
        weight += page.union as u64;
        for (engine, ratio) in &page.engines {
            *totals.entry(engine.clone()).or_insert(0.0) += f64::from(*ratio) * page.union as f64;
        }
    }
    totals
        .into_iter()
        .map(|(engine, total)| {
            let score = if weight > 0 { total / weight as f64 } else { 0.0 };
            (engine, score as f32)
        })
        .collect()
}

pub fn build_report(per_page: Vec<PageCoverage>, engines: &[String]) -> CoverageReport {
    let per_document = document_coverage(&per_page, engines);
    CoverageReport {
        per_page,
        per_document,
    }
}

fn assign_greedy(boxes: &[NormalizedBox], union: &[UnionRegion], threshold: f32) -> Vec<Option<usize>> {
    let mut used = vec![false; union.len()];
    boxes
        .iter()
        .map(|b| {
            let mut best: Option<(usize, f32)> = None;
            for (idx, region) in union.iter().enumerate() {
                if used[idx] {
                    continue;
                }
                let iou = b.bbox.iou(&region.bbox);
                if iou >= threshold && best.map_or(true, |(_, best_iou)| iou > best_iou) {
                    best = Some((idx, iou));
                }
            }
            let (idx, _) = best?;
            used[idx] = true;
            Some(idx)
        })
        .collect()
}

fn assign_optimal(boxes: &[NormalizedBox], union: &[UnionRegion], threshold: f32) -> Vec<Option<usize>> {
    // Candidate regions per box, best IoU first so augmenting paths prefer
    // the closest geometry when several complete matchings exist.
    let candidates: Vec<Vec<usize>> = boxes
        .iter()
        .map(|b| {
            let mut scored: Vec<(usize, f32)> = union
                .iter()
                .enumerate()
                .map(|(idx, region)| (idx, b.bbox.iou(&region.bbox)))
                .filter(|(_, iou)| *iou >= threshold)
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            scored.into_iter().map(|(idx, _)| idx).collect()
        })
        .collect();

    let mut owner: Vec<Option<usize>> = vec![None; union.len()];
    for box_idx in 0..boxes.len() {
        let mut visited = vec![false; union.len()];
        augment(box_idx, &candidates, &mut owner, &mut visited);
    }

    let mut assignment = vec![None; boxes.len()];
    for (region, holder) in owner.iter().enumerate() {
        if let Some(box_idx) = holder {
            assignment[*box_idx] = Some(region);
        }
    }
    assignment
}

fn augment(
    box_idx: usize,
    candidates: &[Vec<usize>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &region in &candidates[box_idx] {
        if visited[region] {
            continue;
        }
        visited[region] = true;
        let free = match owner[region] {
            None => true,
            Some(other) => augment(other, candidates, owner, visited),
        };
        if free {
            owner[region] = Some(box_idx);
            return true;
        }
    }
    false
}
