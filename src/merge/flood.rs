use std::collections::VecDeque;

use crate::core::geometry::BBox;
use crate::core::model::MergeGroup;

/// Connected components of `boxes` under `edge`.
///
/// Seeds are taken from `order`; each seed grows breadth-first, absorbing
/// every unvisited box adjacent to an already absorbed one. The group bbox
/// is the running union of absorbed members, clamped to the unit square.
/// Group ids follow discovery order; members are listed in ascending index.
pub fn connected_groups<F>(boxes: &[BBox], order: &[usize], edge: F) -> Vec<MergeGroup>
where
    F: Fn(&BBox, &BBox) -> bool,
{
    let mut visited = vec![false; boxes.len()];
    let mut groups = Vec::new();

    for &seed in order {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut bbox = boxes[seed];
        let mut members = Vec::new();
        let mut queue = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            members.push(current);
            for &candidate in order {
                if visited[candidate] || !edge(&boxes[current], &boxes[candidate]) {
                    continue;
                }
                visited[candidate] = true;
                bbox = bbox.union(&boxes[candidate]);
                queue.push_back(candidate);
            }
        }

        members.sort_unstable();
        groups.push(MergeGroup {
            id: groups.len(),
            bbox: bbox.clamp_unit(),
            members,
        });
    }
    groups
}

/// Indices of `boxes` sorted by top then left edge.
pub fn top_down_order(boxes: &[BBox]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        boxes[a]
            .y0
            .total_cmp(&boxes[b].y0)
            .then(boxes[a].x0.total_cmp(&boxes[b].x0))
            .then(a.cmp(&b))
    });
    order
}

/// Indices of `boxes` sorted by left then top edge.
pub fn left_right_order(boxes: &[BBox]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        boxes[a]
            .x0
            .total_cmp(&boxes[b].x0)
            .then(boxes[a].y0.total_cmp(&boxes[b].y0))
            .then(a.cmp(&b))
    });
    order
}
