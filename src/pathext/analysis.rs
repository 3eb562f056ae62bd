//! Trivial-prefix exclusion. Paired-end evidence from positions on a linear
//! stretch is already implied by the extension decision and must not be
//! double-counted; bulges are locally resolvable and carry no directional
//! information.

use crate::graph::{BidirectionalPath, Graph};
use fxhash::FxHashSet;

/// Marks path positions whose contribution is ignored when weighting
/// candidate extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathAnalyzer {
    preserve_simple: bool,
}

impl PathAnalyzer {
    pub fn new() -> Self {
        PathAnalyzer {
            preserve_simple: false,
        }
    }

    /// A wholly-trivial path contributes as itself rather than as nothing:
    /// when the entire path would be excluded, the exclusion set is cleared.
    pub fn preserve_simple() -> Self {
        PathAnalyzer {
            preserve_simple: true,
        }
    }

    pub fn remove_trivial(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        to_exclude: &mut FxHashSet<usize>,
        exclude_bulges: bool,
    ) {
        if exclude_bulges {
            self.exclude_trivial_with_bulges(g, path, to_exclude);
        } else {
            self.exclude_trivial(g, path, to_exclude, None);
        }
    }

    /// Walk backwards from `from` (default: last position); while the current
    /// vertex has a unique incoming edge, exclude that position and step
    /// back. Returns the first non-trivial index, `-1` if the whole path is
    /// trivial.
    pub fn exclude_trivial(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        to_exclude: &mut FxHashSet<usize>,
        from: Option<usize>,
    ) -> isize {
        if path.is_empty() {
            return -1;
        }
        let start = from.unwrap_or(path.size() - 1);
        let mut index = start as isize;
        if start >= path.size() {
            return index;
        }
        let mut current = g.edge_end(path.at(index as usize));
        while index >= 0 {
            match g.unique_incoming_edge(current) {
                Some(e) => {
                    current = g.edge_start(e);
                    to_exclude.insert(index as usize);
                    index -= 1;
                }
                None => break,
            }
        }
        if self.preserve_simple && index == -1 {
            to_exclude.clear();
            return start as isize;
        }
        index
    }

    /// Alternate trivial exclusion with single-step skips over bulges —
    /// positions where every incoming edge to `edge_end(path[i])` originates
    /// at `edge_start(path[i])`.
    pub fn exclude_trivial_with_bulges(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        to_exclude: &mut FxHashSet<usize>,
    ) -> isize {
        if path.is_empty() {
            return 0;
        }

        let mut last_edge = path.size() as isize - 1;
        let mut has_bulge = false;
        loop {
            last_edge = self.exclude_trivial_plain(g, path, to_exclude, last_edge);
            if last_edge >= 0 {
                let v = g.edge_end(path.at(last_edge as usize));
                let u = g.edge_start(path.at(last_edge as usize));
                has_bulge = g
                    .incoming_edges(v)
                    .iter()
                    .all(|&candidate| g.edge_start(candidate) == u);
                if !has_bulge && !self.preserve_simple {
                    break;
                }
                last_edge -= 1;
            }
            if last_edge < 0 {
                break;
            }
        }

        if self.preserve_simple && !has_bulge && last_edge == -1 {
            to_exclude.clear();
            last_edge = path.size() as isize - 1;
        }
        last_edge
    }

    // Trivial walk without the preserve-simple rewrite; the bulge loop
    // applies that rewrite itself once the whole path is consumed.
    fn exclude_trivial_plain(
        &self,
        g: &Graph,
        path: &BidirectionalPath,
        to_exclude: &mut FxHashSet<usize>,
        from: isize,
    ) -> isize {
        let mut index = from;
        if index < 0 || index as usize >= path.size() {
            return index;
        }
        let mut current = g.edge_end(path.at(index as usize));
        while index >= 0 {
            match g.unique_incoming_edge(current) {
                Some(e) => {
                    current = g.edge_start(e);
                    to_exclude.insert(index as usize);
                    index -= 1;
                }
                None => break,
            }
        }
        index
    }
}
