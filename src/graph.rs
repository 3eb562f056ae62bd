use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Identifier of a vertex in the assembly graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Identifier of an edge in the assembly graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

#[derive(Debug)]
struct VertexData {
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
}

#[derive(Debug)]
struct EdgeData {
    start: VertexId,
    end: VertexId,
    length: usize,
    coverage: f64,
    conjugate: EdgeId,
}

/// Immutable directed multigraph shared by both pipelines.
///
/// Every edge has a conjugate (the reverse-complement strand);
/// `conjugate(conjugate(e)) == e` and lengths agree across the pair.
/// The graph is built once and only read afterwards.
#[derive(Debug, Default)]
pub struct Graph {
    vertices: Vec<VertexData>,
    edges: Vec<EdgeData>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn add_vertex(&mut self) -> VertexId {
        self.vertices.push(VertexData {
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        VertexId((self.vertices.len() - 1) as u32)
    }

    /// Add a self-conjugate edge (enough for strand-agnostic tests and
    /// palindromic sequence).
    pub fn add_edge(&mut self, start: VertexId, end: VertexId, length: usize, coverage: f64) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeData {
            start,
            end,
            length,
            coverage,
            conjugate: id,
        });
        self.vertices[start.0 as usize].outgoing.push(id);
        self.vertices[end.0 as usize].incoming.push(id);
        id
    }

    /// Add an edge together with its reverse-complement twin.
    ///
    /// * `fwd` – (start, end) of the forward strand
    /// * `rc`  – (start, end) of the conjugate strand
    pub fn add_edge_pair(
        &mut self,
        fwd: (VertexId, VertexId),
        rc: (VertexId, VertexId),
        length: usize,
        coverage: f64,
    ) -> (EdgeId, EdgeId) {
        let e = self.add_edge(fwd.0, fwd.1, length, coverage);
        let c = self.add_edge(rc.0, rc.1, length, coverage);
        self.edges[e.0 as usize].conjugate = c;
        self.edges[c.0 as usize].conjugate = e;
        (e, c)
    }

    #[inline]
    pub fn edge_start(&self, e: EdgeId) -> VertexId {
        self.edges[e.0 as usize].start
    }

    #[inline]
    pub fn edge_end(&self, e: EdgeId) -> VertexId {
        self.edges[e.0 as usize].end
    }

    #[inline]
    pub fn length(&self, e: EdgeId) -> usize {
        self.edges[e.0 as usize].length
    }

    #[inline]
    pub fn coverage(&self, e: EdgeId) -> f64 {
        self.edges[e.0 as usize].coverage
    }

    #[inline]
    pub fn conjugate(&self, e: EdgeId) -> EdgeId {
        self.edges[e.0 as usize].conjugate
    }

    #[inline]
    pub fn int_id(&self, e: EdgeId) -> u32 {
        e.0
    }

    #[inline]
    pub fn incoming_edges(&self, v: VertexId) -> &[EdgeId] {
        &self.vertices[v.0 as usize].incoming
    }

    #[inline]
    pub fn outgoing_edges(&self, v: VertexId) -> &[EdgeId] {
        &self.vertices[v.0 as usize].outgoing
    }

    #[inline]
    pub fn incoming_edge_count(&self, v: VertexId) -> usize {
        self.vertices[v.0 as usize].incoming.len()
    }

    #[inline]
    pub fn outgoing_edge_count(&self, v: VertexId) -> usize {
        self.vertices[v.0 as usize].outgoing.len()
    }

    /// The single incoming edge of `v`, if there is exactly one.
    pub fn unique_incoming_edge(&self, v: VertexId) -> Option<EdgeId> {
        match self.vertices[v.0 as usize].incoming.as_slice() {
            [e] => Some(*e),
            _ => None,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// All edge ids in creation order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(|i| EdgeId(i as u32))
    }
}

/* ------------------------------------------------------------------------- */
/*  Candidate containers                                                     */
/* ------------------------------------------------------------------------- */

/// A candidate continuation: an edge plus the signed gap from the end of the
/// current path (non-zero only for scaffolding jumps).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeWithDistance {
    pub edge: EdgeId,
    pub gap: i64,
}

impl EdgeWithDistance {
    pub fn new(edge: EdgeId, gap: i64) -> Self {
        EdgeWithDistance { edge, gap }
    }
}

/// Ordered candidate set; the universal input/output of extension choosers.
pub type EdgeContainer = SmallVec<[EdgeWithDistance; 4]>;

/* ------------------------------------------------------------------------- */
/*  Paths                                                                    */
/* ------------------------------------------------------------------------- */

/// An ordered, connected walk through the graph with cached cumulative
/// lengths. Created by the extender, mutated only by appending.
#[derive(Debug, Clone, Default)]
pub struct BidirectionalPath {
    edges: Vec<EdgeId>,
    // prefix[i] = total length of edges[0..i]; prefix.len() == edges.len() + 1
    prefix: Vec<usize>,
    weight: f64,
}

impl BidirectionalPath {
    pub fn new() -> Self {
        BidirectionalPath {
            edges: Vec::new(),
            prefix: vec![0],
            weight: 1.0,
        }
    }

    pub fn from_edges(g: &Graph, edges: &[EdgeId]) -> Self {
        let mut p = BidirectionalPath::new();
        for &e in edges {
            p.push(g, e);
        }
        p
    }

    pub fn push(&mut self, g: &Graph, e: EdgeId) {
        let total = *self.prefix.last().unwrap() + g.length(e);
        self.edges.push(e);
        self.prefix.push(total);
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[inline]
    pub fn at(&self, i: usize) -> EdgeId {
        self.edges[i]
    }

    #[inline]
    pub fn back(&self) -> EdgeId {
        *self.edges.last().expect("back() on empty path")
    }

    /// Total path length in base pairs.
    #[inline]
    pub fn length(&self) -> usize {
        *self.prefix.last().unwrap()
    }

    /// Length of the suffix starting at position `i` (inclusive).
    #[inline]
    pub fn length_at(&self, i: usize) -> usize {
        self.length() - self.prefix[i]
    }

    pub fn sub_path(&self, g: &Graph, from: usize, to: usize) -> BidirectionalPath {
        BidirectionalPath::from_edges(g, &self.edges[from..to])
    }

    /// Every position at which `e` occurs.
    pub fn find_all(&self, e: EdgeId) -> Vec<usize> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, &x)| x == e)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn find_first(&self, e: EdgeId) -> Option<usize> {
        self.edges.iter().position(|&x| x == e)
    }

    /// Does `sub` occur edge-for-edge starting at position `from`?
    pub fn compare_from(&self, from: usize, sub: &BidirectionalPath) -> bool {
        if from + sub.size() > self.size() {
            return false;
        }
        (0..sub.size()).all(|i| self.edges[from + i] == sub.edges[i])
    }

    /// True if any edge of the path ends in `v`.
    pub fn contains_vertex(&self, g: &Graph, v: VertexId) -> bool {
        self.edges.iter().any(|&e| g.edge_end(e) == v || g.edge_start(e) == v)
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, w: f64) {
        self.weight = w;
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

/* ------------------------------------------------------------------------- */
/*  Pairwise path comparison                                                 */
/* ------------------------------------------------------------------------- */

/// Walking backwards from `pos1`/`pos2`, the first position in `p1`'s
/// coordinates where the two paths disagree; `None` if they agree until the
/// shorter prefix runs out.
pub fn first_not_equal_position(
    p1: &BidirectionalPath,
    pos1: usize,
    p2: &BidirectionalPath,
    pos2: usize,
) -> Option<usize> {
    let (mut i, mut j) = (pos1 as isize, pos2 as isize);
    while i >= 0 && j >= 0 {
        if p1.at(i as usize) != p2.at(j as usize) {
            return Some(i as usize);
        }
        i -= 1;
        j -= 1;
    }
    None
}

/// Walking forward from `pos1`/`pos2`, the last position in `p1`'s
/// coordinates where the two paths disagree; `None` if they agree until the
/// shorter suffix runs out.
pub fn last_not_equal_position(
    p1: &BidirectionalPath,
    pos1: usize,
    p2: &BidirectionalPath,
    pos2: usize,
) -> Option<usize> {
    let mut answer = None;
    let (mut i, mut j) = (pos1, pos2);
    while i < p1.size() && j < p2.size() {
        if p1.at(i) != p2.at(j) {
            answer = Some(i);
        }
        i += 1;
        j += 1;
    }
    answer
}

/// The prefixes ending at `pos1`/`pos2` agree up to the shorter one.
pub fn equal_begins(
    p1: &BidirectionalPath,
    pos1: usize,
    p2: &BidirectionalPath,
    pos2: usize,
) -> bool {
    first_not_equal_position(p1, pos1, p2, pos2).is_none()
}

/// The suffixes starting at `pos1`/`pos2` agree up to the shorter one.
pub fn equal_ends(
    p1: &BidirectionalPath,
    pos1: usize,
    p2: &BidirectionalPath,
    pos2: usize,
) -> bool {
    last_not_equal_position(p1, pos1, p2, pos2).is_none()
}

/* ------------------------------------------------------------------------- */
/*  Shared read-only indices                                                 */
/* ------------------------------------------------------------------------- */

/// For each edge, which long-read-derived paths cover it. Built once,
/// queried read-only afterwards.
#[derive(Debug, Default)]
pub struct GraphCoverageMap {
    paths: Vec<BidirectionalPath>,
    by_edge: FxHashMap<EdgeId, Vec<usize>>,
}

impl GraphCoverageMap {
    pub fn from_paths(paths: Vec<BidirectionalPath>) -> Self {
        let mut by_edge: FxHashMap<EdgeId, Vec<usize>> = FxHashMap::default();
        for (idx, p) in paths.iter().enumerate() {
            let mut seen = FxHashSet::default();
            for &e in p.edges() {
                if seen.insert(e) {
                    by_edge.entry(e).or_default().push(idx);
                }
            }
        }
        GraphCoverageMap { paths, by_edge }
    }

    /// Indices of paths covering `e` (empty slice if none).
    pub fn covering_paths(&self, e: EdgeId) -> &[usize] {
        self.by_edge.get(&e).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn path(&self, idx: usize) -> &BidirectionalPath {
        &self.paths[idx]
    }

    pub fn paths(&self) -> &[BidirectionalPath] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Edges designated globally unique for scaffolding; read-only during
/// extension.
#[derive(Debug, Default)]
pub struct ScaffoldingUniqueEdgeStorage {
    unique: FxHashSet<EdgeId>,
}

impl ScaffoldingUniqueEdgeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `e` and its conjugate.
    pub fn insert(&mut self, g: &Graph, e: EdgeId) {
        self.unique.insert(e);
        self.unique.insert(g.conjugate(e));
    }

    #[inline]
    pub fn is_unique(&self, e: EdgeId) -> bool {
        self.unique.contains(&e)
    }

    pub fn len(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }
}

/* ------------------------------------------------------------------------- */
/*  Bounded search                                                           */
/* ------------------------------------------------------------------------- */

/// Shortest distances (in accumulated edge length) from `start` to every
/// vertex reachable within `bound`.
pub fn bounded_dijkstra(g: &Graph, start: VertexId, bound: usize) -> FxHashMap<VertexId, usize> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    let mut dist: FxHashMap<VertexId, usize> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    dist.insert(start, 0);
    heap.push(Reverse((0usize, start)));

    while let Some(Reverse((d, v))) = heap.pop() {
        if d > *dist.get(&v).unwrap_or(&usize::MAX) {
            continue;
        }
        for &e in g.outgoing_edges(v) {
            let nd = d + g.length(e);
            if nd > bound {
                continue;
            }
            let u = g.edge_end(e);
            if nd < *dist.get(&u).unwrap_or(&usize::MAX) {
                dist.insert(u, nd);
                heap.push(Reverse((nd, u)));
            }
        }
    }
    dist
}
