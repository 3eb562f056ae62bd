//! Coverage views used by the coverage-driven choosers.

use crate::graph::{BidirectionalPath, EdgeId, Graph};
use fxhash::FxHashMap;

/// Per-edge coverage split by originating strand, for stereospecific
/// (strand-split) sequencing protocols.
#[derive(Debug, Default)]
pub struct StrandCoverageStorage {
    forward: FxHashMap<EdgeId, f64>,
    reverse: FxHashMap<EdgeId, f64>,
}

impl StrandCoverageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, e: EdgeId, forward: f64, reverse: f64) {
        self.forward.insert(e, forward);
        self.reverse.insert(e, reverse);
    }

    /// Coverage of `e` on the requested strand; unknown edges read as 0.
    pub fn coverage(&self, e: EdgeId, reverse: bool) -> f64 {
        let map = if reverse { &self.reverse } else { &self.forward };
        map.get(&e).copied().unwrap_or(0.0)
    }
}

/// Length-weighted mean coverage over path edges of at least `min_edge_len`.
/// `None` when the path holds no such edge — short edges alone give no
/// reliable estimate.
pub fn estimate_path_coverage(
    g: &Graph,
    path: &BidirectionalPath,
    min_edge_len: usize,
) -> Option<f64> {
    let mut cov_sum = 0.0;
    let mut len_sum = 0usize;
    for &e in path.edges() {
        if g.length(e) >= min_edge_len {
            cov_sum += g.coverage(e) * g.length(e) as f64;
            len_sum += g.length(e);
        }
    }
    if len_sum == 0 {
        None
    } else {
        Some(cov_sum / len_sum as f64)
    }
}
