#[cfg(test)]
mod tests {
    use assembly::graph::{
        BidirectionalPath, EdgeContainer, EdgeId, EdgeWithDistance, Graph, GraphCoverageMap,
    };
    use assembly::pathext::chooser::{
        CoordinatedCoverageChooser, ExcludingChooser, ExtensionChooser, LongReadsChooser,
        ScaffoldingChooser, SimpleCoverageChooser,
    };
    use assembly::pathext::coverage::StrandCoverageStorage;
    use assembly::pathext::unique::{LongReadsUniqueEdgeAnalyzer, UniqueEdgeParams};
    use assembly::pathext::weight::{PairedLibrary, WeightCounter};
    use assembly::pathext::ExclusionStrategy;
    use fxhash::{FxHashMap, FxHashSet};
    use std::sync::{Arc, Mutex};

    /* --------------------------------------------------------------------- */
    /*  Stub paired library / weight counter                                 */
    /* --------------------------------------------------------------------- */

    #[derive(Default)]
    struct StubLibrary {
        // (e1, e2) -> ideal info value, distance-independent
        ideal: FxHashMap<(EdgeId, EdgeId), f64>,
        // (e1, e2) -> distance/weight samples
        distances: FxHashMap<(EdgeId, EdgeId), (Vec<i64>, Vec<f64>)>,
        // e -> jump targets
        jumps: FxHashMap<EdgeId, Vec<EdgeId>>,
        is_var: f64,
        is_max: usize,
    }

    impl PairedLibrary for StubLibrary {
        fn ideal_paired_info(&self, e1: EdgeId, e2: EdgeId, _dist: i64) -> f64 {
            self.ideal.get(&(e1, e2)).copied().unwrap_or(0.0)
        }

        fn count_distances(&self, e1: EdgeId, e2: EdgeId) -> (Vec<i64>, Vec<f64>) {
            self.distances.get(&(e1, e2)).cloned().unwrap_or_default()
        }

        fn find_jump_edges(&self, e: EdgeId, _min_dist: i64, _max_dist: i64) -> Vec<EdgeId> {
            self.jumps.get(&e).cloned().unwrap_or_default()
        }

        fn is_var(&self) -> f64 {
            self.is_var
        }

        fn is_max(&self) -> usize {
            self.is_max
        }
    }

    struct StubWeightCounter {
        weights: FxHashMap<EdgeId, f64>,
        lib: StubLibrary,
    }

    impl StubWeightCounter {
        fn from_weights(entries: &[(EdgeId, f64)]) -> Self {
            StubWeightCounter {
                weights: entries.iter().copied().collect(),
                lib: StubLibrary::default(),
            }
        }
    }

    impl WeightCounter for StubWeightCounter {
        fn count_weight(
            &self,
            _path: &BidirectionalPath,
            candidate: EdgeId,
            _to_exclude: &FxHashSet<usize>,
        ) -> f64 {
            self.weights.get(&candidate).copied().unwrap_or(0.0)
        }

        fn pair_info_exist(
            &self,
            _path: &BidirectionalPath,
            _candidate: EdgeId,
        ) -> FxHashSet<usize> {
            FxHashSet::default()
        }

        fn paired_library(&self) -> &dyn PairedLibrary {
            &self.lib
        }
    }

    fn container(edges: &[(EdgeId, i64)]) -> EdgeContainer {
        edges
            .iter()
            .map(|&(e, d)| EdgeWithDistance::new(e, d))
            .collect()
    }

    fn edge_ids(c: &EdgeContainer) -> Vec<EdgeId> {
        c.iter().map(|ewd| ewd.edge).collect()
    }

    /// v0 -e0-> v1 with two outgoing candidates from v1
    fn fork_graph() -> (Graph, EdgeId, EdgeId, EdgeId) {
        let mut g = Graph::new();
        let v0 = g.add_vertex();
        let v1 = g.add_vertex();
        let a = g.add_vertex();
        let b = g.add_vertex();
        let e0 = g.add_edge(v0, v1, 100, 10.0);
        let c1 = g.add_edge(v1, a, 100, 10.0);
        let c2 = g.add_edge(v1, b, 100, 10.0);
        (g, e0, c1, c2)
    }

    /* --------------------------------------------------------------------- */
    /*  Trivial / Joint                                                      */
    /* --------------------------------------------------------------------- */

    #[test]
    fn trivial_accepts_a_lone_candidate() {
        let (g, e0, c1, c2) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let chooser = ExtensionChooser::Trivial;

        let res = chooser.filter(&g, &path, &container(&[(c1, 0)]));
        assert_eq!(res.as_slice(), &[EdgeWithDistance::new(c1, 0)]);

        assert!(chooser
            .filter(&g, &path, &container(&[(c1, 0), (c2, 0)]))
            .is_empty());
    }

    #[test]
    fn every_chooser_maps_empty_input_to_empty_output() {
        let (g, e0, _, _) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let empty = EdgeContainer::new();

        let wc = StubWeightCounter::from_weights(&[]);
        let storage = StrandCoverageStorage::new();
        let cov_map = GraphCoverageMap::from_paths(Vec::new());
        let analyzer = LongReadsUniqueEdgeAnalyzer::build(
            &g,
            &cov_map,
            UniqueEdgeParams {
                filter_threshold: 1.0,
                prior_threshold: 10.0,
                max_repeat_length: 8000,
                uneven_depth: true,
            },
        );

        let choosers = vec![
            ExtensionChooser::Trivial,
            ExtensionChooser::Joint(
                Box::new(ExtensionChooser::Trivial),
                Box::new(ExtensionChooser::Trivial),
            ),
            ExtensionChooser::Excluding(ExcludingChooser::new(
                &wc,
                ExclusionStrategy::Simple,
                0.0,
                2.0,
            )),
            ExtensionChooser::SimpleCoverage(SimpleCoverageChooser::new(&storage, 0.5, 10.0)),
            ExtensionChooser::Scaffolding(ScaffoldingChooser::new(&wc, 2.0, 3.0)),
            ExtensionChooser::LongReads(LongReadsChooser::new(&cov_map, analyzer, 10.0, 2.0, 50)),
            ExtensionChooser::CoordinatedCoverage(CoordinatedCoverageChooser::new(
                300, 0.5, 1000, 1000,
            )),
        ];
        for chooser in &choosers {
            assert!(chooser.filter(&g, &path, &empty).is_empty());
        }
    }

    #[test]
    fn joint_intersects_by_edge_id() {
        let (g, e0, c1, c2) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let wc1 = StubWeightCounter::from_weights(&[(c1, 10.0), (c2, 8.0)]);
        let wc2 = StubWeightCounter::from_weights(&[(c1, 9.0), (c2, 1.0)]);

        // first keeps both, second keeps only c1
        let joint = ExtensionChooser::Joint(
            Box::new(ExtensionChooser::Excluding(ExcludingChooser::new(
                &wc1,
                ExclusionStrategy::Simple,
                1.0,
                2.0,
            ))),
            Box::new(ExtensionChooser::Excluding(ExcludingChooser::new(
                &wc2,
                ExclusionStrategy::Simple,
                1.0,
                2.0,
            ))),
        );
        let res = joint.filter(&g, &path, &container(&[(c1, 0), (c2, 0)]));
        assert_eq!(edge_ids(&res), vec![c1]);
    }

    /* --------------------------------------------------------------------- */
    /*  Excluding family                                                     */
    /* --------------------------------------------------------------------- */

    #[test]
    fn excluding_keeps_only_the_dominant_candidate() {
        // weights {c1: 10, c2: 3}, threshold 2, prior 2: c2 < 10/2 drops
        let (g, e0, c1, c2) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let wc = StubWeightCounter::from_weights(&[(c1, 10.0), (c2, 3.0)]);
        let chooser = ExtensionChooser::Excluding(ExcludingChooser::new(
            &wc,
            ExclusionStrategy::Simple,
            2.0,
            2.0,
        ));
        let res = chooser.filter(&g, &path, &container(&[(c1, 0), (c2, 0)]));
        assert_eq!(edge_ids(&res), vec![c1]);
    }

    #[test]
    fn excluding_returns_empty_below_the_weight_threshold() {
        let (g, e0, c1, c2) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let wc = StubWeightCounter::from_weights(&[(c1, 1.0), (c2, 0.5)]);
        let chooser = ExtensionChooser::Excluding(ExcludingChooser::new(
            &wc,
            ExclusionStrategy::Simple,
            2.0,
            2.0,
        ));
        assert!(chooser
            .filter(&g, &path, &container(&[(c1, 0), (c2, 0)]))
            .is_empty());
    }

    #[test]
    fn excluding_keeps_close_competitors_together() {
        let (g, e0, c1, c2) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let wc = StubWeightCounter::from_weights(&[(c1, 10.0), (c2, 7.0)]);
        let chooser = ExtensionChooser::Excluding(ExcludingChooser::new(
            &wc,
            ExclusionStrategy::Simple,
            2.0,
            2.0,
        ));
        let res = chooser.filter(&g, &path, &container(&[(c1, 0), (c2, 0)]));
        // ambiguous: both candidates stay, ascending by weight
        assert_eq!(edge_ids(&res), vec![c2, c1]);
    }

    #[test]
    fn weight_sink_observes_the_alternatives() {
        let (g, e0, c1, c2) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let wc = StubWeightCounter::from_weights(&[(c1, 10.0), (c2, 3.0)]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let chooser = ExtensionChooser::Excluding(
            ExcludingChooser::new(&wc, ExclusionStrategy::Simple, 2.0, 2.0).with_sink(Box::new(
                move |alts| {
                    sink_seen
                        .lock()
                        .unwrap()
                        .extend(alts.iter().map(|&(w, _)| w));
                },
            )),
        );
        chooser.filter(&g, &path, &container(&[(c1, 0), (c2, 0)]));
        assert_eq!(*seen.lock().unwrap(), vec![3.0, 10.0]);
    }

    #[test]
    fn chooser_config_defaults_drive_the_excluding_family() {
        let cfg = assembly::correct::config::ChooserConfig::default();
        let (g, e0, c1, _) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let wc = StubWeightCounter::from_weights(&[(c1, 10.0)]);
        let chooser = ExtensionChooser::Excluding(ExcludingChooser::new(
            &wc,
            ExclusionStrategy::LongEdge {
                min_len: cfg.long_edge_min_len,
            },
            cfg.weight_threshold,
            cfg.prior_coeff,
        ));
        let res = chooser.filter(&g, &path, &container(&[(c1, 0)]));
        assert_eq!(edge_ids(&res), vec![c1]);
    }

    /* --------------------------------------------------------------------- */
    /*  SimpleCoverage                                                       */
    /* --------------------------------------------------------------------- */

    /// Path [e0, e1] through a strand split at the start of e1.
    fn split_graph() -> (Graph, EdgeId, EdgeId, EdgeId, EdgeId, EdgeId) {
        let mut g = Graph::new();
        let v0 = g.add_vertex();
        let v1 = g.add_vertex();
        let v2 = g.add_vertex();
        let side = g.add_vertex();
        let a = g.add_vertex();
        let b = g.add_vertex();
        let e0 = g.add_edge(v0, v1, 100, 0.0);
        let e_other = g.add_edge(side, v1, 100, 0.0);
        let e1 = g.add_edge(v1, v2, 100, 0.0);
        let c1 = g.add_edge(v2, a, 100, 0.0);
        let c2 = g.add_edge(v2, b, 100, 0.0);
        (g, e0, e_other, e1, c1, c2)
    }

    #[test]
    fn simple_coverage_follows_the_dominant_strand() {
        let (g, e0, e_other, e1, c1, c2) = split_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0, e1]);
        let mut storage = StrandCoverageStorage::new();
        storage.set(e0, 28.0, 0.0);
        storage.set(e_other, 6.0, 0.0);
        storage.set(c1, 30.0, 0.0);
        storage.set(c2, 5.0, 0.0);

        let chooser = ExtensionChooser::SimpleCoverage(SimpleCoverageChooser::new(
            &storage, 0.5, 10.0,
        ));
        let res = chooser.filter(&g, &path, &container(&[(c1, 0), (c2, 0)]));
        // the path edge dominated its split twin, so take the covered fork
        assert_eq!(edge_ids(&res), vec![c1]);
    }

    #[test]
    fn simple_coverage_rejects_similar_candidates() {
        let (g, e0, e_other, e1, c1, c2) = split_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0, e1]);
        let mut storage = StrandCoverageStorage::new();
        storage.set(e0, 28.0, 0.0);
        storage.set(e_other, 6.0, 0.0);
        storage.set(c1, 30.0, 0.0);
        storage.set(c2, 25.0, 0.0);

        let chooser = ExtensionChooser::SimpleCoverage(SimpleCoverageChooser::new(
            &storage, 0.5, 10.0,
        ));
        assert!(chooser
            .filter(&g, &path, &container(&[(c1, 0), (c2, 0)]))
            .is_empty());
    }

    #[test]
    fn simple_coverage_needs_exactly_two_candidates_and_a_split() {
        let (g, e0, c1, c2) = fork_graph();
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let storage = StrandCoverageStorage::new();
        let chooser = ExtensionChooser::SimpleCoverage(SimpleCoverageChooser::new(
            &storage, 0.5, 10.0,
        ));
        // no vertex with two incoming edges anywhere in the path
        assert!(chooser
            .filter(&g, &path, &container(&[(c1, 0), (c2, 0)]))
            .is_empty());
    }

    /* --------------------------------------------------------------------- */
    /*  Scaffolding                                                          */
    /* --------------------------------------------------------------------- */

    #[test]
    fn scaffolding_emits_a_jump_with_the_mean_gap() {
        let mut g = Graph::new();
        let v0 = g.add_vertex();
        let v1 = g.add_vertex();
        let t0 = g.add_vertex();
        let t1 = g.add_vertex();
        let e0 = g.add_edge(v0, v1, 100, 10.0);
        // a tip: no incoming edges at its start
        let tip = g.add_edge(t0, t1, 100, 10.0);
        let path = BidirectionalPath::from_edges(&g, &[e0]);

        let mut lib = StubLibrary {
            is_var: 0.0,
            is_max: 100,
            ..StubLibrary::default()
        };
        lib.jumps.insert(e0, vec![tip]);
        lib.distances.insert((e0, tip), (vec![150, 160], vec![2.0, 3.0]));
        lib.ideal.insert((e0, tip), 1.0);
        let wc = StubWeightCounter {
            weights: FxHashMap::default(),
            lib,
        };

        let chooser = ExtensionChooser::Scaffolding(ScaffoldingChooser::new(&wc, 2.0, 3.0));
        let res = chooser.filter(&g, &path, &container(&[(tip, 0)]));
        // weighted mean of (150-100)*2 and (160-100)*3 is 56
        assert_eq!(res.as_slice(), &[EdgeWithDistance::new(tip, 56)]);
    }

    #[test]
    fn scaffolding_drops_candidates_below_the_clustered_weight() {
        let mut g = Graph::new();
        let v0 = g.add_vertex();
        let v1 = g.add_vertex();
        let t0 = g.add_vertex();
        let t1 = g.add_vertex();
        let e0 = g.add_edge(v0, v1, 100, 10.0);
        let tip = g.add_edge(t0, t1, 100, 10.0);
        let path = BidirectionalPath::from_edges(&g, &[e0]);

        let mut lib = StubLibrary {
            is_var: 0.0,
            is_max: 100,
            ..StubLibrary::default()
        };
        lib.jumps.insert(e0, vec![tip]);
        lib.distances.insert((e0, tip), (vec![150], vec![1.0]));
        lib.ideal.insert((e0, tip), 1.0);
        let wc = StubWeightCounter {
            weights: FxHashMap::default(),
            lib,
        };

        let chooser = ExtensionChooser::Scaffolding(ScaffoldingChooser::new(&wc, 2.0, 3.0));
        assert!(chooser.filter(&g, &path, &container(&[(tip, 0)])).is_empty());
    }

    /* --------------------------------------------------------------------- */
    /*  LongReads                                                            */
    /* --------------------------------------------------------------------- */

    fn long_reads_setup(
        weights: &[f64],
    ) -> (Graph, EdgeId, Vec<EdgeId>, GraphCoverageMap) {
        let mut g = Graph::new();
        let v0 = g.add_vertex();
        let v1 = g.add_vertex();
        // anchor long enough to be unique by length
        let u = g.add_edge(v0, v1, 9000, 30.0);
        let mut cands = Vec::new();
        let mut paths = Vec::new();
        for &w in weights {
            let end = g.add_vertex();
            let c = g.add_edge(v1, end, 100, 10.0);
            cands.push(c);
            let mut p = BidirectionalPath::from_edges(&g, &[u, c]);
            p.set_weight(w);
            paths.push(p);
        }
        let cov_map = GraphCoverageMap::from_paths(paths);
        (g, u, cands, cov_map)
    }

    fn long_reads_chooser<'a>(cov_map: &'a GraphCoverageMap, g: &Graph) -> ExtensionChooser<'a> {
        let analyzer = LongReadsUniqueEdgeAnalyzer::build(
            g,
            cov_map,
            UniqueEdgeParams {
                filter_threshold: 10.0,
                prior_threshold: 10.0,
                max_repeat_length: 8000,
                uneven_depth: true,
            },
        );
        ExtensionChooser::LongReads(LongReadsChooser::new(cov_map, analyzer, 10.0, 2.0, 50))
    }

    #[test]
    fn long_reads_priority_rule_picks_the_top_vote() {
        // weights [50, 20, 8]: 50 > 2 * 20, only the top survives
        let (g, u, cands, cov_map) = long_reads_setup(&[50.0, 20.0, 8.0]);
        let path = BidirectionalPath::from_edges(&g, &[u]);
        let chooser = long_reads_chooser(&cov_map, &g);
        let input = container(&[(cands[0], 0), (cands[1], 0), (cands[2], 0)]);
        let res = chooser.filter(&g, &path, &input);
        assert_eq!(edge_ids(&res), vec![cands[0]]);
    }

    #[test]
    fn long_reads_keeps_candidates_within_the_priority_factor() {
        // 50 < 2 * 30: both stay
        let (g, u, cands, cov_map) = long_reads_setup(&[50.0, 30.0]);
        let path = BidirectionalPath::from_edges(&g, &[u]);
        let chooser = long_reads_chooser(&cov_map, &g);
        let input = container(&[(cands[0], 0), (cands[1], 0)]);
        let res = chooser.filter(&g, &path, &input);
        assert_eq!(edge_ids(&res).len(), 2);
    }

    #[test]
    fn long_reads_rejects_weak_top_votes() {
        let (g, u, cands, cov_map) = long_reads_setup(&[5.0, 3.0]);
        let path = BidirectionalPath::from_edges(&g, &[u]);
        let chooser = long_reads_chooser(&cov_map, &g);
        let input = container(&[(cands[0], 0), (cands[1], 0)]);
        // top vote under the filtering threshold of 10
        assert!(chooser.filter(&g, &path, &input).is_empty());
    }

    /* --------------------------------------------------------------------- */
    /*  CoordinatedCoverage                                                  */
    /* --------------------------------------------------------------------- */

    #[test]
    fn coordinated_coverage_extends_through_a_clean_repeat() {
        let mut g = Graph::new();
        let v0 = g.add_vertex();
        let v1 = g.add_vertex();
        let a = g.add_vertex();
        let b = g.add_vertex();
        let long = g.add_edge(v0, v1, 2000, 50.0);
        // long compatible extension and an incompatible twin
        let c1 = g.add_edge(v1, a, 400, 48.0);
        let c2 = g.add_edge(v1, b, 400, 10.0);
        let path = BidirectionalPath::from_edges(&g, &[long]);

        let chooser =
            ExtensionChooser::CoordinatedCoverage(CoordinatedCoverageChooser::new(300, 0.5, 1000, 1000));
        let res = chooser.filter(&g, &path, &container(&[(c1, 0), (c2, 0)]));
        assert_eq!(edge_ids(&res), vec![c1]);
    }

    #[test]
    fn coordinated_coverage_requires_an_estimable_path() {
        let (g, e0, c1, c2) = fork_graph();
        // all path edges too short for a coverage estimate
        let path = BidirectionalPath::from_edges(&g, &[e0]);
        let chooser =
            ExtensionChooser::CoordinatedCoverage(CoordinatedCoverageChooser::new(300, 0.5, 10, 1000));
        assert!(chooser
            .filter(&g, &path, &container(&[(c1, 0), (c2, 0)]))
            .is_empty());
    }
}
