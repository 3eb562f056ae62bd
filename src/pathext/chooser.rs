//! Extension choosers: every variant maps `(path, candidates)` to a filtered
//! candidate set. Empty output means "no decision here", one edge means
//! "extend", two or more means the evidence stays ambiguous.

use crate::graph::{
    bounded_dijkstra, equal_begins, BidirectionalPath, EdgeContainer, EdgeId, EdgeWithDistance,
    Graph, GraphCoverageMap, ScaffoldingUniqueEdgeStorage, VertexId,
};
use crate::pathext::analysis::PathAnalyzer;
use crate::pathext::coverage::{estimate_path_coverage, StrandCoverageStorage};
use crate::pathext::unique::LongReadsUniqueEdgeAnalyzer;
use crate::pathext::weight::{BarcodeIndex, WeightCounter};
use fxhash::{FxHashMap, FxHashSet};
use log::debug;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Candidates keyed by their accumulated weight, ascending, duplicates
/// allowed.
pub type AlternativeContainer = Vec<(f64, EdgeWithDistance)>;

/// Out-of-band observer for the weights a chooser computed. No control-flow
/// influence.
pub type WeightSink = Box<dyn Fn(&AlternativeContainer) + Send + Sync>;

/* ------------------------------------------------------------------------- */
/*  Shared helpers                                                           */
/* ------------------------------------------------------------------------- */

fn has_ideal_info(wc: &dyn WeightCounter, e1: EdgeId, e2: EdgeId, dist: i64) -> bool {
    wc.paired_library().ideal_paired_info(e1, e2, dist) > 0.0
}

fn has_ideal_info_from_path(
    wc: &dyn WeightCounter,
    path: &BidirectionalPath,
    e: EdgeId,
    gap: i64,
) -> bool {
    (0..path.size())
        .rev()
        .any(|i| has_ideal_info(wc, path.at(i), e, gap + path.length_at(i) as i64))
}

/* ------------------------------------------------------------------------- */
/*  Excluding family                                                         */
/* ------------------------------------------------------------------------- */

/// How the excluding family extends the exclusion set before weighting.
#[derive(Debug, Clone, Copy)]
pub enum ExclusionStrategy {
    /// Drop positions lacking ideal info to any candidate and positions
    /// whose pair info points at every candidate alike.
    Simple,
    /// Drop positions only by absence of ideal info; no trivial pruning.
    IdealBased,
    /// Additionally drop positions on edges shorter than `min_len`.
    LongEdge { min_len: usize },
    /// Drop everything back to the first branch point; a branchless path
    /// weighs as a whole.
    Rna,
}

pub struct ExcludingChooser<'a> {
    wc: &'a dyn WeightCounter,
    strategy: ExclusionStrategy,
    analyzer: PathAnalyzer,
    weight_threshold: f64,
    prior_coeff: f64,
    sink: Option<WeightSink>,
}

impl<'a> ExcludingChooser<'a> {
    pub fn new(
        wc: &'a dyn WeightCounter,
        strategy: ExclusionStrategy,
        weight_threshold: f64,
        prior_coeff: f64,
    ) -> Self {
        let analyzer = match strategy {
            ExclusionStrategy::Rna => PathAnalyzer::preserve_simple(),
            _ => PathAnalyzer::new(),
        };
        ExcludingChooser {
            wc,
            strategy,
            analyzer,
            weight_threshold,
            prior_coeff,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: WeightSink) -> Self {
        self.sink = Some(sink);
        self
    }

    fn filter(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
    ) -> EdgeContainer {
        let mut to_exclude = FxHashSet::default();
        self.exclude_positions(g, path, candidates, &mut to_exclude);
        debug!("excluded {} positions", to_exclude.len());

        let mut weights: AlternativeContainer = candidates
            .iter()
            .map(|&ewd| (self.wc.count_weight(path, ewd.edge, &to_exclude), ewd))
            .collect();
        weights.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(sink) = &self.sink {
            sink(&weights);
        }

        assert!(!weights.is_empty());
        let max_weight = weights.last().unwrap().0;
        if max_weight < self.weight_threshold {
            return EdgeContainer::new();
        }
        weights
            .iter()
            .filter(|(w, _)| *w >= max_weight / self.prior_coeff)
            .map(|&(_, ewd)| ewd)
            .collect()
    }

    fn exclude_positions(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
        to_exclude: &mut FxHashSet<usize>,
    ) {
        match self.strategy {
            ExclusionStrategy::Simple => {
                self.analyzer.remove_trivial(g, path, to_exclude, true);
                if candidates.len() < 2 {
                    return;
                }
                self.exclude_without_ideal_info(path, candidates, to_exclude, true);
                self.exclude_ambiguous_pair_info(path, candidates, to_exclude);
            }
            ExclusionStrategy::IdealBased => {
                assert!(to_exclude.is_empty());
                self.exclude_without_ideal_info(path, candidates, to_exclude, false);
            }
            ExclusionStrategy::LongEdge { min_len } => {
                self.analyzer.remove_trivial(g, path, to_exclude, true);
                if candidates.len() < 2 {
                    return;
                }
                for index in (0..path.size()).rev() {
                    if to_exclude.contains(&index) {
                        continue;
                    }
                    if g.length(path.at(index)) < min_len {
                        to_exclude.insert(index);
                    }
                }
            }
            ExclusionStrategy::Rna => {
                self.analyzer.remove_trivial(g, path, to_exclude, true);
                if candidates.len() < 2 {
                    return;
                }
                let mut i = path.size() - 1;
                while i > 0 {
                    if g.incoming_edge_count(g.edge_start(path.at(i))) > 1 {
                        break;
                    }
                    to_exclude.insert(i);
                    i -= 1;
                }
                if i == 0 {
                    to_exclude.clear();
                }
            }
        }
    }

    // Positions with no ideal paired info towards some candidate carry no
    // discriminating evidence.
    fn exclude_without_ideal_info(
        &self,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
        to_exclude: &mut FxHashSet<usize>,
        skip_excluded: bool,
    ) {
        for index in (0..path.size()).rev() {
            if skip_excluded && to_exclude.contains(&index) {
                continue;
            }
            let path_edge = path.at(index);
            for ewd in candidates {
                if !has_ideal_info(self.wc, path_edge, ewd.edge, path.length_at(index) as i64) {
                    to_exclude.insert(index);
                }
            }
        }
    }

    // A position whose pair info exists for every candidate alike does not
    // discriminate between them.
    fn exclude_ambiguous_pair_info(
        &self,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
        to_exclude: &mut FxHashSet<usize>,
    ) {
        let mut extension_cnt: FxHashMap<usize, usize> = FxHashMap::default();
        for ewd in candidates {
            for pos in self.wc.pair_info_exist(path, ewd.edge) {
                *extension_cnt.entry(pos).or_insert(0) += 1;
            }
        }
        for (pos, cnt) in extension_cnt {
            if cnt == candidates.len() {
                to_exclude.insert(pos);
            }
        }
    }
}

/* ------------------------------------------------------------------------- */
/*  Strand-split coverage                                                    */
/* ------------------------------------------------------------------------- */

pub struct SimpleCoverageChooser<'a> {
    storage: &'a StrandCoverageStorage,
    // < 1
    coverage_delta: f64,
    // 1 / coverage_delta
    inverted_coverage_delta: f64,
    min_upper_coverage: f64,
}

impl<'a> SimpleCoverageChooser<'a> {
    pub fn new(
        storage: &'a StrandCoverageStorage,
        coverage_delta: f64,
        min_upper_coverage: f64,
    ) -> Self {
        assert!(coverage_delta <= 1.0 && coverage_delta != 0.0);
        SimpleCoverageChooser {
            storage,
            coverage_delta,
            inverted_coverage_delta: 1.0 / coverage_delta,
            min_upper_coverage,
        }
    }

    fn filter(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
    ) -> EdgeContainer {
        if candidates.len() != 2 {
            return EdgeContainer::new();
        }
        let split = match self.find_split(g, path) {
            Some(i) => i,
            None => return EdgeContainer::new(),
        };
        debug!("split found at {split}");
        let path_edge = path.at(split - 1);
        let reverse =
            self.storage.coverage(path_edge, false) < self.storage.coverage(path_edge, true);
        self.filter_at_split(g, path, candidates, split, reverse)
    }

    // First vertex with exactly two incoming edges, scanning from the path
    // end.
    fn find_split(&self, g: &Graph, path: &BidirectionalPath) -> Option<usize> {
        (1..path.size())
            .rev()
            .find(|&i| g.incoming_edge_count(g.edge_start(path.at(i))) == 2)
    }

    fn filter_at_split(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
        split: usize,
        reverse: bool,
    ) -> EdgeContainer {
        let (first, second) = (candidates[0], candidates[1]);
        if !self.is_enough_coverage(first.edge, second.edge, reverse) {
            return EdgeContainer::new();
        }
        if self.is_coverage_similar(first.edge, second.edge, reverse) {
            return EdgeContainer::new();
        }

        let path_edge = path.at(split - 1);
        let other_edge = self
            .other_edge_at_split(g, g.edge_end(path_edge), path_edge)
            .expect("split vertex lost its second incoming edge");

        if self.is_coverage_similar(path_edge, other_edge, reverse) {
            return EdgeContainer::new();
        }
        if !self.is_enough_coverage(path_edge, other_edge, reverse) {
            return EdgeContainer::new();
        }

        let cov1 = self.storage.coverage(first.edge, reverse);
        let cov2 = self.storage.coverage(second.edge, reverse);
        let path_cov = self.storage.coverage(path_edge, reverse);
        let other_cov = self.storage.coverage(other_edge, reverse);

        // The strand that dominated before the split keeps dominating after
        // it.
        let chosen = if path_cov > other_cov {
            if cov1 > cov2 {
                first
            } else {
                second
            }
        } else if cov1 < cov2 {
            first
        } else {
            second
        };

        if !self.is_coverage_similar(path_edge, chosen.edge, reverse) {
            return EdgeContainer::new();
        }
        let mut result = EdgeContainer::new();
        result.push(EdgeWithDistance::new(chosen.edge, 0));
        result
    }

    fn is_enough_coverage(&self, e1: EdgeId, e2: EdgeId, reverse: bool) -> bool {
        let cov1 = self.storage.coverage(e1, reverse);
        let cov2 = self.storage.coverage(e2, reverse);
        cov1.max(cov2) >= self.min_upper_coverage || cov1.min(cov2) == 0.0
    }

    fn is_coverage_similar(&self, e1: EdgeId, e2: EdgeId, reverse: bool) -> bool {
        let cov1 = self.storage.coverage(e1, reverse);
        let cov2 = self.storage.coverage(e2, reverse);
        if cov1 == 0.0 || cov2 == 0.0 {
            return false;
        }
        let diff = cov1 / cov2;
        if diff < 1.0 {
            diff > self.coverage_delta
        } else {
            diff < self.inverted_coverage_delta
        }
    }

    fn other_edge_at_split(&self, g: &Graph, split: VertexId, e: EdgeId) -> Option<EdgeId> {
        assert_eq!(g.incoming_edge_count(split), 2);
        g.incoming_edges(split).iter().copied().find(|&other| other != e)
    }
}

/* ------------------------------------------------------------------------- */
/*  Scaffolding                                                              */
/* ------------------------------------------------------------------------- */

pub struct ScaffoldingChooser<'a> {
    wc: &'a dyn WeightCounter,
    raw_weight_threshold: f64,
    cl_weight_threshold: f64,
    is_scatter_coeff: f64,
}

impl<'a> ScaffoldingChooser<'a> {
    pub fn new(wc: &'a dyn WeightCounter, cl_weight_threshold: f64, is_scatter_coeff: f64) -> Self {
        ScaffoldingChooser {
            wc,
            raw_weight_threshold: 0.0,
            cl_weight_threshold,
            is_scatter_coeff,
        }
    }

    pub fn with_raw_threshold(mut self, raw_weight_threshold: f64) -> Self {
        self.raw_weight_threshold = raw_weight_threshold;
        self
    }

    fn filter(&self, g: &Graph, path: &BidirectionalPath) -> EdgeContainer {
        let mut result = EdgeContainer::new();
        for e in self.find_candidates(g, path) {
            let histogram = self.distance_histogram(path, e);
            let sum: f64 = histogram.iter().map(|&(_, w)| w).sum();
            debug!("scaffolding weight {sum}, threshold {}", self.cl_weight_threshold);
            if sum < self.cl_weight_threshold {
                continue;
            }
            let gap = weighted_mean(&histogram);
            if has_ideal_info_from_path(self.wc, path, e, gap) {
                result.push(EdgeWithDistance::new(e, gap));
            }
        }
        result
    }

    // Tips reachable by jump info from positions within the insert size of
    // the path end.
    fn find_candidates(&self, g: &Graph, path: &BidirectionalPath) -> Vec<EdgeId> {
        let lib = self.wc.paired_library();
        let is_scatter = (lib.is_var() * self.is_scatter_coeff).round() as i64;
        let mut jumping: Vec<EdgeId> = Vec::new();
        for i in (0..path.size()).rev() {
            if path.length_at(i) - g.length(path.at(i)) > lib.is_max() {
                break;
            }
            let min_dist = (path.length_at(i) as i64 - is_scatter).max(0);
            let max_dist = path.length_at(i) as i64 + lib.is_max() as i64 + is_scatter;
            for e in lib.find_jump_edges(path.at(i), min_dist, max_dist) {
                if is_tip(g, e) && !jumping.contains(&e) {
                    jumping.push(e);
                }
            }
        }
        jumping.sort_unstable();
        jumping
    }

    // Offset every distance sample by the length from its path position to
    // the path end; weak samples are dropped.
    fn distance_histogram(&self, path: &BidirectionalPath, e: EdgeId) -> Vec<(i64, f64)> {
        let mut histogram = Vec::new();
        for j in 0..path.size() {
            let (distances, weights) = self.wc.paired_library().count_distances(path.at(j), e);
            let len_to_end = path.length_at(j) as i64;
            for (d, w) in distances.iter().zip(weights.iter()) {
                if *w >= self.raw_weight_threshold {
                    histogram.push((d - len_to_end, *w));
                }
            }
        }
        histogram
    }
}

fn is_tip(g: &Graph, e: EdgeId) -> bool {
    g.incoming_edge_count(g.edge_start(e)) == 0
}

fn weighted_mean(histogram: &[(i64, f64)]) -> i64 {
    let mut dist = 0.0;
    let mut sum = 0.0;
    for &(d, w) in histogram {
        dist += d as f64 * w;
        sum += w;
    }
    (dist / sum).round() as i64
}

/* ------------------------------------------------------------------------- */
/*  Long reads                                                               */
/* ------------------------------------------------------------------------- */

pub struct LongReadsChooser<'a> {
    cov_map: &'a GraphCoverageMap,
    unique_analyzer: LongReadsUniqueEdgeAnalyzer,
    filtering_threshold: f64,
    weight_priority_threshold: f64,
    min_significant_overlap: usize,
}

impl<'a> LongReadsChooser<'a> {
    pub fn new(
        cov_map: &'a GraphCoverageMap,
        unique_analyzer: LongReadsUniqueEdgeAnalyzer,
        filtering_threshold: f64,
        weight_priority_threshold: f64,
        min_significant_overlap: usize,
    ) -> Self {
        LongReadsChooser {
            cov_map,
            unique_analyzer,
            filtering_threshold,
            weight_priority_threshold,
            min_significant_overlap,
        }
    }

    pub fn unique_analyzer(&self) -> &LongReadsUniqueEdgeAnalyzer {
        &self.unique_analyzer
    }

    fn filter(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
    ) -> EdgeContainer {
        let mut weights_cands: FxHashMap<EdgeId, f64> =
            candidates.iter().map(|ewd| (ewd.edge, 0.0)).collect();
        let mut filtered_cands: FxHashSet<EdgeId> = FxHashSet::default();

        for &pidx in self.cov_map.covering_paths(path.back()) {
            let support = self.cov_map.path(pidx);
            for pos in support.find_all(path.back()) {
                if pos + 1 < support.size()
                    && equal_begins(path, path.size() - 1, support, pos)
                    && self.unique_back_path(g, support, pos)
                {
                    let next = support.at(pos + 1);
                    *weights_cands.entry(next).or_insert(0.0) += support.weight();
                    filtered_cands.insert(next);
                }
            }
        }

        let mut sort_res: Vec<(EdgeId, f64)> = weights_cands.into_iter().collect();
        sort_res.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        if sort_res.is_empty() || sort_res[0].1 < self.filtering_threshold {
            filtered_cands.clear();
        } else if sort_res.len() > 1
            && sort_res[0].1 > self.weight_priority_threshold * sort_res[1].1
        {
            filtered_cands.clear();
            filtered_cands.insert(sort_res[0].0);
        } else if sort_res.len() > 1 {
            for &(e, w) in &sort_res {
                if w * self.weight_priority_threshold < sort_res[0].1 {
                    filtered_cands.remove(&e);
                }
            }
        }

        candidates
            .iter()
            .filter(|ewd| filtered_cands.contains(&ewd.edge))
            .copied()
            .collect()
    }

    // The long-read prefix must cross a unique edge long enough to anchor
    // the overlap.
    fn unique_back_path(&self, g: &Graph, path: &BidirectionalPath, pos: usize) -> bool {
        (0..=pos).rev().any(|i| {
            self.unique_analyzer.is_unique(path.at(i))
                && g.length(path.at(i)) >= self.min_significant_overlap
        })
    }
}

/* ------------------------------------------------------------------------- */
/*  Coordinated coverage                                                     */
/* ------------------------------------------------------------------------- */

pub struct CoordinatedCoverageChooser {
    max_edge_length_in_repeat: usize,
    delta: f64,
    min_path_len: usize,
    /// Edges shorter than this do not contribute to the path-coverage
    /// estimate.
    min_cov_edge_len: usize,
}

impl CoordinatedCoverageChooser {
    pub fn new(
        max_edge_length_in_repeat: usize,
        delta: f64,
        min_path_len: usize,
        min_cov_edge_len: usize,
    ) -> Self {
        CoordinatedCoverageChooser {
            max_edge_length_in_repeat,
            delta,
            min_path_len,
            min_cov_edge_len,
        }
    }

    fn filter(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
    ) -> EdgeContainer {
        if candidates.len() < 2 {
            // a unique candidate the previous choosers rejected is better
            // left alone
            return EdgeContainer::new();
        }
        if path.length() < self.min_path_len {
            return EdgeContainer::new();
        }
        let path_coverage = match estimate_path_coverage(g, path, self.min_cov_edge_len) {
            Some(c) if c > 10.0 => c,
            _ => return EdgeContainer::new(),
        };
        for ewd in candidates {
            if path.contains_vertex(g, g.edge_end(ewd.edge)) {
                // avoid creating loops
                return EdgeContainer::new();
            }
        }
        self.find_extension_through_repeat(g, candidates, path_coverage)
    }

    fn compatible_edge(&self, g: &Graph, e: EdgeId, path_coverage: f64) -> bool {
        g.coverage(e) >= path_coverage * self.delta
    }

    // Lowest coverage among long compatible edges past the repeat component
    // ahead of `ext`; +inf when none were detected, negative when the
    // component is hopeless (long internal edges, cycles back).
    fn analyze_extension(&self, g: &Graph, ext: EdgeId, path_coverage: f64) -> f64 {
        if !self.compatible_edge(g, ext, path_coverage) {
            return f64::INFINITY;
        }
        if g.length(ext) > self.max_edge_length_in_repeat {
            return g.coverage(ext);
        }

        let component = match self.repeat_component(g, g.edge_end(ext), path_coverage) {
            Some(c) => c,
            None => return -1.0,
        };

        for &v in &component {
            for &e in g.outgoing_edges(v) {
                if component.contains(&g.edge_end(e)) && g.length(e) > self.max_edge_length_in_repeat
                {
                    return -1.0;
                }
            }
        }

        let mut answer = f64::INFINITY;
        for &v in &component {
            for &e in g.outgoing_edges(v) {
                if !component.contains(&g.edge_end(e))
                    && g.length(e) > self.max_edge_length_in_repeat
                    && self.compatible_edge(g, e, path_coverage)
                    && g.coverage(e) < answer
                {
                    answer = g.coverage(e);
                }
            }
        }
        answer
    }

    // Bounded BFS through short compatible edges; `None` when the expansion
    // revisits a vertex (component too complex).
    fn repeat_component(
        &self,
        g: &Graph,
        start: VertexId,
        path_coverage: f64,
    ) -> Option<FxHashSet<VertexId>> {
        let mut component = FxHashSet::default();
        component.insert(start);
        let mut queue = VecDeque::new();
        self.push_neighbours(g, start, path_coverage, &mut queue);
        while let Some(v) = queue.pop_front() {
            if !component.insert(v) {
                return None;
            }
            self.push_neighbours(g, v, path_coverage, &mut queue);
        }
        Some(component)
    }

    fn push_neighbours(
        &self,
        g: &Graph,
        v: VertexId,
        path_coverage: f64,
        queue: &mut VecDeque<VertexId>,
    ) {
        for &e in g.outgoing_edges(v) {
            if g.length(e) <= self.max_edge_length_in_repeat
                && self.compatible_edge(g, e, path_coverage)
            {
                queue.push_back(g.edge_end(e));
            }
        }
    }

    fn find_extension_through_repeat(
        &self,
        g: &Graph,
        candidates: &EdgeContainer,
        path_coverage: f64,
    ) -> EdgeContainer {
        let mut good: Vec<(EdgeWithDistance, f64)> = Vec::new();
        for &ewd in candidates {
            let res = self.analyze_extension(g, ewd.edge, path_coverage);
            if res == f64::INFINITY {
                continue;
            }
            if res < 0.0 {
                return EdgeContainer::new();
            }
            good.push((ewd, res));
        }
        if let [(ewd, ahead_cov)] = good.as_slice() {
            if *ahead_cov <= path_coverage / self.delta {
                let mut result = EdgeContainer::new();
                result.push(*ewd);
                return result;
            }
        }
        EdgeContainer::new()
    }
}

/* ------------------------------------------------------------------------- */
/*  Read clouds (TSLR / 10x)                                                 */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub struct TenXParams {
    pub shared_threshold: usize,
    pub tail_threshold: usize,
    pub max_initial_candidates: usize,
    pub internal_gap_threshold: usize,
    pub initial_abundancy_threshold: usize,
    pub middle_abundancy_threshold: usize,
    pub conjugate_left_window: usize,
    pub conjugate_right_window: usize,
    pub conjugate_fraction_threshold: f64,
}

pub enum ReadCloudFlavor {
    /// Normalized barcode-intersection score scaled by the gap coefficient.
    Tslr { barcode_threshold: f64 },
    /// The initial / middle / conjugate filter cascade.
    TenX(TenXParams),
}

/// Outcome counters of the 10x filter cascade; purely observational.
#[derive(Debug, Default)]
pub struct TenXChooserStats {
    pub overall: AtomicU64,
    pub no_candidates: AtomicU64,
    pub single_candidate: AtomicU64,
    pub no_barcodes_on_last_edge: AtomicU64,
    pub no_candidates_after_initial: AtomicU64,
    pub initial_filter_helped: AtomicU64,
    pub too_many_after_initial: AtomicU64,
    pub no_candidates_after_middle: AtomicU64,
    pub middle_filter_helped: AtomicU64,
    pub multiple_after_both: AtomicU64,
    pub pair_of_conjugates_left: AtomicU64,
    pub conjugate_resolved: AtomicU64,
}

impl TenXChooserStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct ReadCloudChooser<'a> {
    barcodes: &'a dyn BarcodeIndex,
    unique_storage: &'a ScaffoldingUniqueEdgeStorage,
    fragment_len: usize,
    distance_bound: usize,
    flavor: ReadCloudFlavor,
    stats: TenXChooserStats,
}

impl<'a> ReadCloudChooser<'a> {
    pub fn new(
        barcodes: &'a dyn BarcodeIndex,
        unique_storage: &'a ScaffoldingUniqueEdgeStorage,
        fragment_len: usize,
        distance_bound: usize,
        flavor: ReadCloudFlavor,
    ) -> Self {
        ReadCloudChooser {
            barcodes,
            unique_storage,
            fragment_len,
            distance_bound,
            flavor,
            stats: TenXChooserStats::default(),
        }
    }

    pub fn stats(&self) -> &TenXChooserStats {
        &self.stats
    }

    /// Last path position holding a designated-unique edge.
    pub fn find_last_unique_in_path(&self, path: &BidirectionalPath) -> Option<(EdgeId, usize)> {
        (0..path.size())
            .rev()
            .find(|&i| self.unique_storage.is_unique(path.at(i)))
            .map(|i| (path.at(i), i))
    }

    fn filter(&self, g: &Graph, path: &BidirectionalPath) -> EdgeContainer {
        let (last_unique, _) = match self.find_last_unique_in_path(path) {
            Some(found) => found,
            None => return EdgeContainer::new(),
        };
        let candidates = self.initial_candidates(g, path, last_unique);
        debug!(
            "decisive edge {:?}, {} initial candidates",
            last_unique,
            candidates.len()
        );
        match &self.flavor {
            ReadCloudFlavor::Tslr { barcode_threshold } => {
                self.tslr_best_candidates(&candidates, last_unique, *barcode_threshold)
            }
            ReadCloudFlavor::TenX(params) => {
                self.tenx_best_candidates(g, &candidates, last_unique, params)
            }
        }
    }

    // Unique edges ahead of the decisive edge within the distance bound,
    // excluding the decisive edge, its conjugate and anything already in
    // the path.
    fn initial_candidates(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        last_unique: EdgeId,
    ) -> EdgeContainer {
        assert!(self.unique_storage.is_unique(last_unique));
        let dist = bounded_dijkstra(g, g.edge_end(last_unique), self.distance_bound);
        let mut reached: Vec<(EdgeId, i64)> = Vec::new();
        for (&v, &d) in &dist {
            for &e in g.outgoing_edges(v) {
                if self.unique_storage.is_unique(e) {
                    reached.push((e, d as i64));
                }
            }
        }
        reached.sort_unstable();
        reached.dedup();
        reached
            .into_iter()
            .filter(|&(e, _)| {
                e != last_unique
                    && e != g.conjugate(last_unique)
                    && path.find_first(e).is_none()
                    && path.find_first(g.conjugate(e)).is_none()
            })
            .map(|(e, d)| EdgeWithDistance::new(e, d))
            .collect()
    }

    fn gap_coefficient(&self, gap: i64) -> f64 {
        assert!(gap <= self.fragment_len as i64);
        (self.fragment_len as i64 - gap) as f64 / self.fragment_len as f64
    }

    fn tslr_best_candidates(
        &self,
        candidates: &EdgeContainer,
        decisive: EdgeId,
        barcode_threshold: f64,
    ) -> EdgeContainer {
        candidates
            .iter()
            .filter(|ewd| {
                ewd.edge != decisive
                    && self
                        .barcodes
                        .intersection_size_normalized_by_second(decisive, ewd.edge)
                        > barcode_threshold * self.gap_coefficient(ewd.gap)
            })
            .copied()
            .collect()
    }

    fn tenx_best_candidates(
        &self,
        g: &Graph,
        candidates: &EdgeContainer,
        decisive: EdgeId,
        params: &TenXParams,
    ) -> EdgeContainer {
        let stats = &self.stats;
        TenXChooserStats::bump(&stats.overall);
        if candidates.is_empty() {
            TenXChooserStats::bump(&stats.no_candidates);
            return candidates.clone();
        }
        if candidates.len() == 1 {
            TenXChooserStats::bump(&stats.single_candidate);
            return candidates.clone();
        }
        if self.barcodes.tail_barcode_number(decisive) == 0 {
            TenXChooserStats::bump(&stats.no_barcodes_on_last_edge);
            return candidates.clone();
        }

        let initial = self.tenx_initial_filter(candidates, decisive, params);
        match initial.len() {
            0 => {
                TenXChooserStats::bump(&stats.no_candidates_after_initial);
                return initial;
            }
            1 => {
                TenXChooserStats::bump(&stats.initial_filter_helped);
                return initial;
            }
            n if n > params.max_initial_candidates => {
                TenXChooserStats::bump(&stats.too_many_after_initial);
                return initial;
            }
            _ => {}
        }

        let middle = self.tenx_middle_filter(g, &initial, decisive, params);
        match middle.len() {
            0 => {
                TenXChooserStats::bump(&stats.no_candidates_after_middle);
                return middle;
            }
            1 => {
                TenXChooserStats::bump(&stats.middle_filter_helped);
                return middle;
            }
            _ => {}
        }

        TenXChooserStats::bump(&stats.multiple_after_both);
        if middle.len() == 2 && middle[0].edge == g.conjugate(middle[1].edge) {
            TenXChooserStats::bump(&stats.pair_of_conjugates_left);
            let resolved = self.tenx_conjugate_filter(g, decisive, middle[0], middle[1], params);
            if resolved.len() == 1 {
                TenXChooserStats::bump(&stats.conjugate_resolved);
            }
            return resolved;
        }
        middle
    }

    fn tenx_initial_filter(
        &self,
        candidates: &EdgeContainer,
        decisive: EdgeId,
        params: &TenXParams,
    ) -> EdgeContainer {
        candidates
            .iter()
            .filter(|ewd| {
                ewd.edge != decisive
                    && self.barcodes.enough_shared_barcodes(
                        decisive,
                        ewd.edge,
                        params.shared_threshold,
                        params.initial_abundancy_threshold,
                        params.tail_threshold,
                    )
            })
            .copied()
            .collect()
    }

    fn tenx_middle_filter(
        &self,
        g: &Graph,
        candidates: &EdgeContainer,
        decisive: EdgeId,
        params: &TenXParams,
    ) -> EdgeContainer {
        candidates
            .iter()
            .filter(|ewd| self.tenx_middle_check(g, decisive, ewd.edge, candidates, params))
            .copied()
            .collect()
    }

    // `candidate` survives if no other surviving candidate shows evidence of
    // sitting between the decisive edge and it.
    fn tenx_middle_check(
        &self,
        g: &Graph,
        decisive: EdgeId,
        candidate: EdgeId,
        others: &EdgeContainer,
        params: &TenXParams,
    ) -> bool {
        others.iter().all(|other| {
            other.edge == candidate
                || self.tenx_is_between(
                    g,
                    candidate,
                    decisive,
                    other.edge,
                    params.internal_gap_threshold,
                    params.middle_abundancy_threshold,
                )
        })
    }

    // Cumulative implied length of the barcoded fragments that would have to
    // span `middle` stays below the threshold.
    fn tenx_is_between(
        &self,
        g: &Graph,
        middle: EdgeId,
        left: EdgeId,
        right: EdgeId,
        len_threshold: usize,
        abundancy_threshold: usize,
    ) -> bool {
        let side_barcodes = self.barcodes.intersection(left, right);
        let middle_length = g.length(middle);
        let sum_length_threshold = len_threshold * side_barcodes.len();
        let mut current_length = 0usize;
        for b in side_barcodes {
            let left_count = self.barcodes.barcode_count(left, b);
            let right_count = self.barcodes.barcode_count(right, b);
            if !self.barcodes.has_barcode(middle, b)
                && left_count >= abundancy_threshold
                && right_count >= abundancy_threshold
            {
                let right_length = self.barcodes.min_pos(right, b);
                let left_length = g.length(left) - self.barcodes.max_pos(left, b);
                current_length += left_length + right_length + middle_length;
            }
        }
        current_length <= sum_length_threshold
    }

    // Break a conjugate tie by counting barcodes anchored near the start of
    // one strand and far on the other.
    fn tenx_conjugate_filter(
        &self,
        g: &Graph,
        decisive: EdgeId,
        edgewd: EdgeWithDistance,
        conjwd: EdgeWithDistance,
        params: &TenXParams,
    ) -> EdgeContainer {
        let edge = edgewd.edge;
        let conj = conjwd.edge;
        assert_eq!(g.conjugate(edge), conj);
        let left = params.conjugate_left_window;
        let right = params.conjugate_right_window;

        let common = self.barcodes.intersection(decisive, edge);
        let mut edge_voters = 0usize;
        let mut conj_voters = 0usize;
        for b in &common {
            let gap = self.barcodes.min_pos(edge, *b);
            let conj_gap = self.barcodes.min_pos(conj, *b);
            if gap < left && conj_gap > right {
                edge_voters += 1;
            }
            if gap > right && conj_gap < left {
                conj_voters += 1;
            }
        }
        let mut result = EdgeContainer::new();
        if common.is_empty() {
            return result;
        }
        let edge_fraction = edge_voters as f64 / common.len() as f64;
        let conj_fraction = conj_voters as f64 / common.len() as f64;
        if edge_fraction - conj_fraction > params.conjugate_fraction_threshold {
            result.push(edgewd);
        }
        if conj_fraction - edge_fraction > params.conjugate_fraction_threshold {
            result.push(conjwd);
        }
        result
    }
}

/* ------------------------------------------------------------------------- */
/*  The chooser variant                                                      */
/* ------------------------------------------------------------------------- */

/// A path-extension decision policy. `filter` narrows the candidate set;
/// an empty result is the ordinary "no decision" outcome, never an error.
pub enum ExtensionChooser<'a> {
    /// Accept a lone candidate, refuse any ambiguity.
    Trivial,
    /// Intersection of two policies by edge id; matching edges must agree on
    /// their gaps.
    Joint(Box<ExtensionChooser<'a>>, Box<ExtensionChooser<'a>>),
    /// Paired-end weighting with position exclusion.
    Excluding(ExcludingChooser<'a>),
    /// Stereospecific strand-split coverage.
    SimpleCoverage(SimpleCoverageChooser<'a>),
    /// Jump candidates across gaps from paired-end distance histograms.
    Scaffolding(ScaffoldingChooser<'a>),
    /// Long-read paths covering the path end.
    LongReads(LongReadsChooser<'a>),
    /// Coverage of the repeat component ahead.
    CoordinatedCoverage(CoordinatedCoverageChooser),
    /// Barcode evidence (TSLR or 10x).
    ReadCloud(ReadCloudChooser<'a>),
}

impl ExtensionChooser<'_> {
    pub fn filter(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        candidates: &EdgeContainer,
    ) -> EdgeContainer {
        if candidates.is_empty() {
            return EdgeContainer::new();
        }
        match self {
            ExtensionChooser::Trivial => {
                if candidates.len() == 1 {
                    candidates.clone()
                } else {
                    EdgeContainer::new()
                }
            }
            ExtensionChooser::Joint(first, second) => {
                let r1 = first.filter(g, path, candidates);
                let r2 = second.filter(g, path, candidates);
                let mut answer = EdgeContainer::new();
                for ewd1 in &r1 {
                    for ewd2 in &r2 {
                        if ewd1.edge == ewd2.edge {
                            assert_eq!(
                                ewd1.gap, ewd2.gap,
                                "joint chooser saw one edge with two gaps"
                            );
                            answer.push(*ewd1);
                        }
                    }
                }
                answer
            }
            ExtensionChooser::Excluding(c) => c.filter(g, path, candidates),
            ExtensionChooser::SimpleCoverage(c) => c.filter(g, path, candidates),
            ExtensionChooser::Scaffolding(c) => c.filter(g, path),
            ExtensionChooser::LongReads(c) => c.filter(g, path, candidates),
            ExtensionChooser::CoordinatedCoverage(c) => c.filter(g, path, candidates),
            ExtensionChooser::ReadCloud(c) => c.filter(g, path),
        }
    }
}
