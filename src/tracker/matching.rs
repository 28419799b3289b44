//! Matching utilities for identity resolution.

use ndarray::Array2;

use crate::appearance::Embedding;
use crate::tracker::detection::Detection;
use crate::tracker::resolution::Resolution;

/// Claim the identity of the first pool entry whose IoU with `detection`
/// exceeds `threshold`. The claimed entry leaves the pool, so no identity is
/// handed out twice.
pub fn match_by_overlap(
    detection: &Detection,
    pool: &mut Vec<Detection>,
    threshold: f32,
) -> Resolution {
    let Some(position) = pool
        .iter()
        .position(|candidate| candidate.id.is_some() && detection.iou(candidate) > threshold)
    else {
        return Resolution::Unmatched;
    };
    pool.remove(position).id.into()
}

/// Overlap resolution for every detection, in order.
pub fn resolve_by_overlap(
    detections: &[Detection],
    mut pool: Vec<Detection>,
    threshold: f32,
) -> Vec<Resolution> {
    detections
        .iter()
        .map(|det| match_by_overlap(det, &mut pool, threshold))
        .collect()
}

/// Pairwise embedding distances, shape (queries, references).
///
/// Missing embeddings get `missing_cost` so they never beat a real match.
pub fn embedding_distance(
    queries: &[Option<Embedding>],
    references: &[Option<Embedding>],
    missing_cost: f32,
) -> Array2<f32> {
    let mut dists = Array2::from_elem((queries.len(), references.len()), missing_cost);
    for (i, q) in queries.iter().enumerate() {
        for (j, r) in references.iter().enumerate() {
            if let (Some(q), Some(r)) = (q, r) {
                dists[[i, j]] = q.distance(r).min(missing_cost);
            }
        }
    }
    dists
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_rows: Vec<usize>,
    pub unmatched_cols: Vec<usize>,
}

/// Minimum-cost one-to-one assignment keeping only pairs whose cost is
/// strictly below `thresh`.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_rows: vec![],
            unmatched_cols: (0..num_cols).collect(),
        };
    }

    if num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_rows: (0..num_rows).collect(),
            unmatched_cols: vec![],
        };
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    let result = lapjv::lapjv(&padded);
    let mut matches = vec![];
    let mut unmatched_rows = vec![];
    let mut unmatched_cols_mask: Vec<bool> = vec![true; num_cols];

    match result {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate() {
                if row_idx >= num_rows {
                    continue;
                }
                if col_idx >= num_cols {
                    unmatched_rows.push(row_idx);
                } else if cost_matrix[[row_idx, col_idx]] < thresh {
                    matches.push((row_idx, col_idx));
                    unmatched_cols_mask[col_idx] = false;
                } else {
                    unmatched_rows.push(row_idx);
                }
            }
        }
        Err(_) => {
            unmatched_rows = (0..num_rows).collect();
        }
    }

    let unmatched_cols: Vec<usize> = unmatched_cols_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    AssignmentResult {
        matches,
        unmatched_rows,
        unmatched_cols,
    }
}
