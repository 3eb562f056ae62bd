//! Interfaces consumed by the extension choosers. The paired-end libraries,
//! weight computation and barcode indices are built elsewhere; the choosers
//! only query them through these seams.

use crate::graph::{BidirectionalPath, EdgeId};
use fxhash::FxHashSet;

/// Identifier of a linked-read barcode.
pub type BarcodeId = u64;

/// Paired-end insert-size library queries.
pub trait PairedLibrary {
    /// Expected pair count linking `e1` and `e2` at distance `dist` under the
    /// insert-size distribution.
    fn ideal_paired_info(&self, e1: EdgeId, e2: EdgeId, dist: i64) -> f64;

    /// Observed (distance, weight) samples between `e1` and `e2`.
    fn count_distances(&self, e1: EdgeId, e2: EdgeId) -> (Vec<i64>, Vec<f64>);

    /// Edges reachable by read pairs jumping from `e` within the distance
    /// window.
    fn find_jump_edges(&self, e: EdgeId, min_dist: i64, max_dist: i64) -> Vec<EdgeId>;

    /// Insert-size variance.
    fn is_var(&self) -> f64;

    /// Maximal insert size.
    fn is_max(&self) -> usize;
}

/// Scalar paired-end support that a candidate continuation accumulates from
/// the path, optionally ignoring designated positions.
pub trait WeightCounter {
    fn count_weight(
        &self,
        path: &BidirectionalPath,
        candidate: EdgeId,
        to_exclude: &FxHashSet<usize>,
    ) -> f64;

    /// Path positions with any pair info towards `candidate`.
    fn pair_info_exist(&self, path: &BidirectionalPath, candidate: EdgeId) -> FxHashSet<usize>;

    fn paired_library(&self) -> &dyn PairedLibrary;
}

/// Per-edge barcode occurrence and position queries for linked/10x reads.
pub trait BarcodeIndex {
    /// Number of distinct barcodes on the tail of `e`.
    fn tail_barcode_number(&self, e: EdgeId) -> usize;

    /// Barcodes present on both edges.
    fn intersection(&self, e1: EdgeId, e2: EdgeId) -> Vec<BarcodeId>;

    /// Shared-barcode count normalized by the second edge's barcode count.
    fn intersection_size_normalized_by_second(&self, e1: EdgeId, e2: EdgeId) -> f64;

    /// Leftmost position of `b` on `e`.
    fn min_pos(&self, e: EdgeId, b: BarcodeId) -> usize;

    /// Rightmost position of `b` on `e`.
    fn max_pos(&self, e: EdgeId, b: BarcodeId) -> usize;

    /// Read count of `b` on `e`.
    fn barcode_count(&self, e: EdgeId, b: BarcodeId) -> usize;

    fn has_barcode(&self, e: EdgeId, b: BarcodeId) -> bool;

    /// At least `shared_threshold` barcodes shared between the tail windows,
    /// each with abundancy at least `abundancy_threshold` within
    /// `tail_threshold` of the edge ends.
    fn enough_shared_barcodes(
        &self,
        e1: EdgeId,
        e2: EdgeId,
        shared_threshold: usize,
        abundancy_threshold: usize,
        tail_threshold: usize,
    ) -> bool;
}
