//! Words under a box and the redundancy flags derived from them.
//!
//! Reading order is approximate: words keep the extractor's (line, word)
//! indices when it supplies them and otherwise their encounter order. No
//! line reconstruction is attempted.

use std::collections::BTreeSet;

use crate::core::geometry::BBox;
use crate::core::model::WordToken;

/// Indices of the words whose box intersects `bbox` with positive area,
/// in approximate reading order.
pub fn covered_words(bbox: &BBox, words: &[WordToken]) -> Vec<usize> {
    let mut hits: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, word)| bbox.intersects(&word.bbox))
        .map(|(idx, _)| idx)
        .collect();
    hits.sort_by_key(|&idx| (words[idx].line, words[idx].word, idx));
    hits
}

pub fn covered_text(indices: &[usize], words: &[WordToken]) -> String {
    indices
        .iter()
        .map(|&idx| words[idx].text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedundancyFlags {
    pub redundant: bool,
    pub unique_extra: bool,
}

/// Flag boxes that contain another box.
///
/// For each ordered pair (A, B) with A containing B, A is redundant when it
/// covers no word B does not, and unique-extra otherwise. Redundancy wins if
/// different contained boxes disagree. Of two identical boxes only the later
/// one is treated as the container.
pub fn redundancy_flags(boxes: &[BBox], covered: &[Vec<usize>]) -> Vec<RedundancyFlags> {
    let sets: Vec<BTreeSet<usize>> = covered
        .iter()
        .map(|words| words.iter().copied().collect())
        .collect();
    let mut flags = vec![RedundancyFlags::default(); boxes.len()];

    for (a, outer) in boxes.iter().enumerate() {
        let mut redundant = false;
        let mut extra = false;
        for (b, inner) in boxes.iter().enumerate() {
            if a == b || !outer.contains(inner) {
                continue;
            }
            if outer == inner && a < b {
                continue;
            }
            if sets[a].difference(&sets[b]).next().is_none() {
                redundant = true;
            } else {
                extra = true;
            }
        }
        flags[a] = RedundancyFlags {
            redundant,
            unique_extra: extra && !redundant,
        };
    }
    flags
}
