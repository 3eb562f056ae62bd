//! One-shot analysis of which edges are globally unique under a long-read
//! coverage map. The unique set is populated at construction and only
//! queried afterwards.

use crate::graph::{
    equal_begins, equal_ends, first_not_equal_position, last_not_equal_position,
    BidirectionalPath, EdgeId, Graph, GraphCoverageMap,
};
use fxhash::FxHashSet;
use log::debug;

#[derive(Debug, Clone, Copy)]
pub struct UniqueEdgeParams {
    /// Sub-path weights below this are never treated as discriminating.
    pub filter_threshold: f64,
    /// Diverging sub-path weights must differ by this factor to keep an edge
    /// unique.
    pub prior_threshold: f64,
    /// Edges longer than this are unique by length alone.
    pub max_repeat_length: usize,
    /// Skip the coverage-based pass for uneven-depth data.
    pub uneven_depth: bool,
}

/// Pre-computed set of globally-unique edges, symmetric under conjugation.
#[derive(Debug)]
pub struct LongReadsUniqueEdgeAnalyzer {
    unique_edges: FxHashSet<EdgeId>,
}

impl LongReadsUniqueEdgeAnalyzer {
    pub fn build(g: &Graph, cov_map: &GraphCoverageMap, params: UniqueEdgeParams) -> Self {
        let mut analyzer = LongReadsUniqueEdgeAnalyzer {
            unique_edges: FxHashSet::default(),
        };
        analyzer.find_all_unique_edges(g, cov_map, &params);
        analyzer
    }

    #[inline]
    pub fn is_unique(&self, e: EdgeId) -> bool {
        self.unique_edges.contains(&e)
    }

    fn find_all_unique_edges(
        &mut self,
        g: &Graph,
        cov_map: &GraphCoverageMap,
        params: &UniqueEdgeParams,
    ) {
        for e in g.edge_ids() {
            if unique_edge(g, cov_map, params, e) {
                self.unique_edges.insert(e);
                self.unique_edges.insert(g.conjugate(e));
            }
        }
        if !params.uneven_depth {
            self.find_all_unique_coverage_edges(g, params);
        }
        debug!("{} unique edges found", self.unique_edges.len());
    }

    /// Coverage pass: edges of length > 500 covered below 1.2x the mean
    /// coverage of long edges are unique. Skipped when long edges make up
    /// less than a quarter of the graph.
    fn find_all_unique_coverage_edges(&mut self, g: &Graph, params: &UniqueEdgeParams) {
        assert!(!params.uneven_depth);
        let mut cov_sum = 0.0;
        let mut len_sum = 0usize;
        let mut total_len = 0usize;
        for e in g.edge_ids() {
            total_len += g.length(e);
            if g.length(e) >= params.max_repeat_length {
                cov_sum += g.coverage(e) * g.length(e) as f64;
                len_sum += g.length(e);
            }
        }
        if len_sum * 4 < total_len {
            return;
        }
        let mean_cov = cov_sum / len_sum as f64;
        debug!("average coverage of long edges: {mean_cov}");
        for e in g.edge_ids() {
            if g.length(e) > 500
                && g.coverage(e) < 1.2 * mean_cov
                && !self.unique_edges.contains(&e)
            {
                self.unique_edges.insert(e);
                self.unique_edges.insert(g.conjugate(e));
            }
        }
    }
}

// An edge is unique if it is long, or no covering path lists it twice and
// every pair of covering paths either agrees on the context around it or
// diverges with significantly different weights.
fn unique_edge(
    g: &Graph,
    cov_map: &GraphCoverageMap,
    params: &UniqueEdgeParams,
    e: EdgeId,
) -> bool {
    if g.length(e) > params.max_repeat_length {
        return true;
    }
    if cov_map.is_empty() {
        return false;
    }
    let cov_paths = cov_map.covering_paths(e);
    for (n1, &i1) in cov_paths.iter().enumerate() {
        let p1 = cov_map.path(i1);
        let pos1 = p1.find_all(e);
        if pos1.len() > 1 {
            return false;
        }
        for &i2 in &cov_paths[n1..] {
            let p2 = cov_map.path(i2);
            let pos2 = p2.find_all(e);
            if pos2.len() > 1 {
                return false;
            }
            if !consistent_path(p1, pos1[0], p2, pos2[0])
                && check_inconsistence(g, cov_map, params, p1, pos1[0], p2, pos2[0], cov_paths)
            {
                return false;
            }
        }
    }
    true
}

fn consistent_path(
    p1: &BidirectionalPath,
    pos1: usize,
    p2: &BidirectionalPath,
    pos2: usize,
) -> bool {
    equal_begins(p1, pos1, p2, pos2) && equal_ends(p1, pos1, p2, pos2)
}

fn significantly_diff_weights(params: &UniqueEdgeParams, w1: f64, w2: f64) -> bool {
    if w1 > params.filter_threshold && w2 > params.filter_threshold {
        return w1 > w2 * params.prior_threshold || w2 > w1 * params.prior_threshold;
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn check_inconsistence(
    g: &Graph,
    cov_map: &GraphCoverageMap,
    params: &UniqueEdgeParams,
    p1: &BidirectionalPath,
    pos1: usize,
    p2: &BidirectionalPath,
    pos2: usize,
    cov_paths: &[usize],
) -> bool {
    let first_diff_pos1 = first_not_equal_position(p1, pos1, p2, pos2);
    let first_diff_pos2 = first_not_equal_position(p2, pos2, p1, pos1);
    if let (Some(d1), Some(d2)) = (first_diff_pos1, first_diff_pos2) {
        let cand1 = p1.sub_path(g, d1, pos1 + 1);
        let cand2 = p2.sub_path(g, d2, pos2 + 1);
        let (w1, w2) = sub_path_weights(cov_map, cov_paths, &cand1, &cand2);
        if !significantly_diff_weights(params, w1, w2) {
            return true;
        }
    }
    let last_diff_pos1 = last_not_equal_position(p1, pos1, p2, pos2);
    let last_diff_pos2 = last_not_equal_position(p2, pos2, p1, pos1);
    if let (Some(d1), Some(d2)) = (last_diff_pos1, last_diff_pos2) {
        let cand1 = p1.sub_path(g, pos1, d1 + 1);
        let cand2 = p2.sub_path(g, pos2, d2 + 1);
        let (w1, w2) = sub_path_weights(cov_map, cov_paths, &cand1, &cand2);
        if !significantly_diff_weights(params, w1, w2) {
            return true;
        }
    }
    false
}

// Total weight of the covering paths that contain each diverging sub-path.
fn sub_path_weights(
    cov_map: &GraphCoverageMap,
    cov_paths: &[usize],
    cand1: &BidirectionalPath,
    cand2: &BidirectionalPath,
) -> (f64, f64) {
    let mut weight1 = 0.0;
    let mut weight2 = 0.0;
    for &i in cov_paths {
        let path = cov_map.path(i);
        if contains_sub_path(path, cand1) {
            weight1 += path.weight();
        } else if contains_sub_path(path, cand2) {
            weight2 += path.weight();
        }
    }
    (weight1, weight2)
}

fn contains_sub_path(path: &BidirectionalPath, sub: &BidirectionalPath) -> bool {
    (0..path.size()).any(|i| path.compare_from(i, sub))
}
