//! Tuning knobs for both pipelines, loadable from YAML with every field
//! defaulted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options of the counting/correction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Sub-k-mer partition count handed to the external clustering step.
    pub tau: usize,
    /// Shard count N of the split phase.
    pub num_shard_files: usize,
    /// Parallelism cap of the shard-merge phase, never above `max_threads`.
    pub merge_threads: usize,
    /// Parallelism cap of the expansion and read-rewriting stage, never
    /// above `max_threads`.
    pub correct_threads: usize,
    /// Size of the process-wide thread pool.
    pub max_threads: usize,
    /// Phred offset of the input encoding (33 or 64).
    pub qv_offset: u8,
    /// Quality floor applied when trimming reads on input.
    pub trim_quality: u8,
    pub discard_only_singletons: bool,
    pub use_threshold: bool,
    /// Seed for the solid set when no external clustering ran: k-mers whose
    /// total error probability stays below this become solid.
    pub good_threshold: f64,
    /// Dump the solid set after every expansion pass.
    pub expand_write_each_iteration: bool,
    pub max_expand_iterations: usize,
    pub paired: bool,
    /// Scratch space for the split phase's shard files.
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        CorrectionConfig {
            tau: 1,
            num_shard_files: 16,
            merge_threads: 1,
            correct_threads: 1,
            max_threads: 1,
            qv_offset: 33,
            trim_quality: 2,
            discard_only_singletons: false,
            use_threshold: false,
            good_threshold: 0.5,
            expand_write_each_iteration: false,
            max_expand_iterations: 20,
            paired: false,
            working_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
        }
    }
}

impl CorrectionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Per-chooser tuning constants of the extension engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChooserConfig {
    pub weight_threshold: f64,
    pub prior_coeff: f64,
    pub long_edge_min_len: usize,

    pub coverage_delta: f64,
    pub min_upper_coverage: f64,

    pub scaffolding_cl_weight_threshold: f64,
    pub scaffolding_is_scatter_coeff: f64,
    pub scaffolding_raw_weight_threshold: f64,

    pub long_reads_filtering_threshold: f64,
    pub long_reads_weight_priority_threshold: f64,
    pub unique_edge_priority_threshold: f64,
    pub min_significant_overlap: usize,
    pub max_repeat_length: usize,
    pub uneven_depth: bool,

    pub coord_coverage_max_edge_length_in_repeat: usize,
    pub coord_coverage_delta: f64,
    pub coord_coverage_min_path_len: usize,
    pub coord_coverage_min_cov_edge_len: usize,

    pub read_cloud_fragment_len: usize,
    pub read_cloud_distance_bound: usize,
    pub tslr_barcode_threshold: f64,
    pub tenx_shared_threshold: usize,
    pub tenx_tail_threshold: usize,
    pub tenx_max_initial_candidates: usize,
    pub tenx_internal_gap_threshold: usize,
    pub tenx_initial_abundancy_threshold: usize,
    pub tenx_middle_abundancy_threshold: usize,
    pub tenx_conjugate_left_window: usize,
    pub tenx_conjugate_right_window: usize,
    pub tenx_conjugate_fraction_threshold: f64,
}

impl Default for ChooserConfig {
    fn default() -> Self {
        ChooserConfig {
            weight_threshold: 0.0,
            prior_coeff: 1.5,
            long_edge_min_len: 200,

            coverage_delta: 0.5,
            min_upper_coverage: 10.0,

            scaffolding_cl_weight_threshold: 3.0,
            scaffolding_is_scatter_coeff: 3.0,
            scaffolding_raw_weight_threshold: 0.0,

            long_reads_filtering_threshold: 2.0,
            long_reads_weight_priority_threshold: 1.2,
            unique_edge_priority_threshold: 10.0,
            min_significant_overlap: 0,
            max_repeat_length: 8000,
            uneven_depth: false,

            coord_coverage_max_edge_length_in_repeat: 300,
            coord_coverage_delta: 0.5,
            coord_coverage_min_path_len: 1000,
            coord_coverage_min_cov_edge_len: 1000,

            read_cloud_fragment_len: 10000,
            read_cloud_distance_bound: 8000,
            tslr_barcode_threshold: 0.1,
            tenx_shared_threshold: 10,
            tenx_tail_threshold: 10000,
            tenx_max_initial_candidates: 5,
            tenx_internal_gap_threshold: 5000,
            tenx_initial_abundancy_threshold: 1,
            tenx_middle_abundancy_threshold: 1,
            tenx_conjugate_left_window: 1000,
            tenx_conjugate_right_window: 2000,
            tenx_conjugate_fraction_threshold: 0.2,
        }
    }
}

impl ChooserConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading chooser config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing chooser config {}", path.display()))
    }
}
