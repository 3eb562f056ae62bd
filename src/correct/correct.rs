//! Read correction: per-position consensus voting from solid (and
//! corrected-to) k-mers, trimming to the solid-covered window, and routing
//! of corrected/bad/unpaired outputs.

use crate::cli::counters::CorrectionCounters;
use crate::correct::blob::Arena;
use crate::correct::config::CorrectionConfig;
use crate::correct::fastq::{open_fastq, write_record, FastqRecord};
use crate::correct::kmer::{canonical, complement_digit, dignucl, nucl, KmerBytes, ValidKmerIter};
use crate::correct::merge::KmerTable;
use crate::K;
use anyhow::{Context, Result};
use log::info;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Correction-mode switches set by the external clustering step.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectionSettings {
    /// Also trust k-mers carrying the plain `good` flag.
    pub use_threshold: bool,
    /// Trust every assigned rewrite target, not only solid ones.
    pub discard_only_singletons: bool,
}

impl CorrectionSettings {
    pub fn from_config(cfg: &CorrectionConfig) -> Self {
        CorrectionSettings {
            use_threshold: cfg.use_threshold,
            discard_only_singletons: cfg.discard_only_singletons,
        }
    }
}

/// Correct one read in place against the blob image at `readno`.
/// Returns whether the read ended up backed by any trusted k-mer.
pub fn correct_one_read(
    arena: &Arena,
    table: &KmerTable,
    readno: usize,
    rec: &mut FastqRecord,
    settings: CorrectionSettings,
    counters: &mut CorrectionCounters,
) -> bool {
    let pr = arena.read(readno);
    let read_size = pr.size();
    debug_assert_eq!(read_size, rec.seq.len());
    let seq = arena.read_seq(readno);

    // votes[nucleotide][position]
    let mut votes = Array2::<u32>::zeros((4, read_size));
    let mut left = read_size;
    let mut right: isize = -1;
    let mut is_good = false;

    for p in ValidKmerIter::new(seq) {
        let (canon, _) = canonical(&seq[p..p + K]);
        let id = match table.lookup(&canon) {
            Some(id) => id,
            None => continue,
        };
        let stat = &table.entry(id).stat;
        let revcomp = pr.rc_bit(p);
        if stat.is_good_iterative() || (settings.use_threshold && stat.is_good()) {
            is_good = true;
            cast_votes(&mut votes, &table.entry(id).kmer, p, revcomp);
            left = left.min(p);
            right = right.max(p as isize);
        } else if let Some(target) = stat.change() {
            let target_entry = table.entry(target);
            if settings.discard_only_singletons
                || target_entry.stat.is_good_iterative()
                || (settings.use_threshold && stat.is_good())
            {
                is_good = true;
                cast_votes(&mut votes, &target_entry.kmer, p, revcomp);
                left = left.min(p);
                right = right.max(p as isize);
            }
        }
    }

    if right < 0 {
        // no trusted k-mer touched the read
        return false;
    }

    let mut changed_nucleotides = 0usize;
    for j in 0..read_size {
        let mut cmax = rec.seq[j];
        let mut nummax = 0u32;
        for k in 0..4 {
            if votes[(k, j)] > nummax {
                cmax = nucl(k);
                nummax = votes[(k, j)];
            }
        }
        if rec.seq[j] != cmax {
            changed_nucleotides += 1;
        }
        rec.seq[j] = cmax;
    }

    rec.trim_left_right(left, right as usize + K - 1);

    counters.changed_nucleotides += changed_nucleotides as u64;
    if changed_nucleotides > 0 {
        counters.changed_reads += 1;
    }
    is_good
}

// One vote per base; reverse-complement orientation walks the k-mer
// backwards with complemented nucleotides.
fn cast_votes(votes: &mut Array2<u32>, kmer: &KmerBytes, pos: usize, revcomp: bool) {
    for (j, &b) in kmer.iter().enumerate() {
        let d = dignucl(b).expect("canonical k-mer holds only ACGT");
        if revcomp {
            votes[(complement_digit(d), pos + K - 1 - j)] += 1;
        } else {
            votes[(d, pos + j)] += 1;
        }
    }
}

/// Correct a single-end file; good reads go to `out_good`, the rest to
/// `out_bad`. `readno` must point at the blob image of the file's first
/// surviving read.
#[allow(clippy::too_many_arguments)]
pub fn correct_read_file<W: Write>(
    arena: &Arena,
    table: &KmerTable,
    path: &Path,
    cfg: &CorrectionConfig,
    mut readno: usize,
    out_good: &mut W,
    out_bad: &mut W,
    counters: &mut CorrectionCounters,
) -> Result<()> {
    let settings = CorrectionSettings::from_config(cfg);
    let mut reader = open_fastq(path, cfg.qv_offset)?;
    while let Some(mut rec) = reader.next_record()? {
        counters.total += 1;
        if rec.trim_ns_and_bad_quality(cfg.trim_quality) < K {
            counters.bad += 1;
            write_record(out_bad, &rec, cfg.qv_offset)?;
            continue;
        }
        if correct_one_read(arena, table, readno, &mut rec, settings, counters) {
            counters.corrected += 1;
            write_record(out_good, &rec, cfg.qv_offset)?;
        } else {
            counters.bad += 1;
            write_record(out_bad, &rec, cfg.qv_offset)?;
        }
        readno += 1;
    }
    Ok(())
}

/// Output writers of one corrected pair of files.
struct PairedOutputs {
    bad_left: BufWriter<File>,
    corrected_left: BufWriter<File>,
    unpaired_left: BufWriter<File>,
    bad_right: BufWriter<File>,
    corrected_right: BufWriter<File>,
    unpaired_right: BufWriter<File>,
}

/// Correct two mate files in lockstep. Both corrected ⇒ corrected pair; one
/// corrected ⇒ unpaired for the survivor, bad for the other; both rejected
/// ⇒ both bad.
#[allow(clippy::too_many_arguments)]
fn correct_paired_files(
    arena: &Arena,
    table: &KmerTable,
    left_path: &Path,
    right_path: &Path,
    cfg: &CorrectionConfig,
    mut readno_left: usize,
    mut readno_right: usize,
    outs: &mut PairedOutputs,
    counters: &mut CorrectionCounters,
) -> Result<()> {
    let settings = CorrectionSettings::from_config(cfg);
    let mut left_reader = open_fastq(left_path, cfg.qv_offset)?;
    let mut right_reader = open_fastq(right_path, cfg.qv_offset)?;
    loop {
        let (mut l, mut r) = match (left_reader.next_record()?, right_reader.next_record()?) {
            (Some(l), Some(r)) => (l, r),
            (None, None) => break,
            _ => anyhow::bail!(
                "paired files {} and {} hold different read counts",
                left_path.display(),
                right_path.display()
            ),
        };
        counters.total += 2;
        let left_len = l.trim_ns_and_bad_quality(cfg.trim_quality);
        let right_len = r.trim_ns_and_bad_quality(cfg.trim_quality);

        let mut left_res = false;
        let mut right_res = false;
        if left_len >= K {
            left_res = correct_one_read(arena, table, readno_left, &mut l, settings, counters);
            readno_left += 1;
        }
        if right_len >= K {
            right_res = correct_one_read(arena, table, readno_right, &mut r, settings, counters);
            readno_right += 1;
        }

        if !left_res {
            counters.bad += 1;
            write_record(&mut outs.bad_left, &l, cfg.qv_offset)?;
        }
        if !right_res {
            counters.bad += 1;
            write_record(&mut outs.bad_right, &r, cfg.qv_offset)?;
        }
        match (left_res, right_res) {
            (true, false) => {
                counters.unpaired += 1;
                write_record(&mut outs.unpaired_left, &l, cfg.qv_offset)?;
            }
            (false, true) => {
                counters.unpaired += 1;
                write_record(&mut outs.unpaired_right, &r, cfg.qv_offset)?;
            }
            (true, true) => {
                counters.corrected += 2;
                write_record(&mut outs.corrected_left, &l, cfg.qv_offset)?;
                write_record(&mut outs.corrected_right, &r, cfg.qv_offset)?;
            }
            (false, false) => {}
        }
    }
    Ok(())
}

fn create_output(dir: &Path, name: String) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    Ok(BufWriter::new(File::create(&path).with_context(|| {
        format!("creating correction output {}", path.display())
    })?))
}

/// Correct every input file for this iteration. Returns the counters and
/// the corrected-file paths that feed the next iteration.
pub fn correct_all_reads(
    arena: &Arena,
    table: &KmerTable,
    input_files: &[PathBuf],
    cfg: &CorrectionConfig,
    iteration: usize,
) -> Result<(CorrectionCounters, Vec<PathBuf>)> {
    let mut counters = CorrectionCounters::default();
    let mut next_inputs = Vec::with_capacity(input_files.len());
    let offsets = arena.file_read_offsets();
    let dir = &cfg.output_dir;

    if !cfg.paired {
        for (i, path) in input_files.iter().enumerate() {
            let good_name = format!("{iteration:02}.reads.{i}.corrected.fastq");
            let mut good = create_output(dir, good_name.clone())?;
            let mut bad = create_output(dir, format!("{iteration:02}.reads.{i}.bad.fastq"))?;
            correct_read_file(
                arena,
                table,
                path,
                cfg,
                offsets[i],
                &mut good,
                &mut bad,
                &mut counters,
            )?;
            info!("{} corrected", path.display());
            next_inputs.push(dir.join(good_name));
        }
    } else {
        let mut i = 0;
        while i + 1 < input_files.len() {
            let left_name = format!("{iteration:02}.reads.{i}.left.corrected.fastq");
            let right_name = format!("{iteration:02}.reads.{i}.right.corrected.fastq");
            let mut outs = PairedOutputs {
                bad_left: create_output(dir, format!("{iteration:02}.reads.{i}.left.bad.fastq"))?,
                corrected_left: create_output(dir, left_name.clone())?,
                unpaired_left: create_output(
                    dir,
                    format!("{iteration:02}.reads.{i}.left.unpaired.fastq"),
                )?,
                bad_right: create_output(dir, format!("{iteration:02}.reads.{i}.right.bad.fastq"))?,
                corrected_right: create_output(dir, right_name.clone())?,
                unpaired_right: create_output(
                    dir,
                    format!("{iteration:02}.reads.{i}.right.unpaired.fastq"),
                )?,
            };
            correct_paired_files(
                arena,
                table,
                &input_files[i],
                &input_files[i + 1],
                cfg,
                offsets[i],
                offsets[i + 1],
                &mut outs,
                &mut counters,
            )?;
            info!(
                "{} and {} corrected as a pair",
                input_files[i].display(),
                input_files[i + 1].display()
            );
            next_inputs.push(dir.join(left_name));
            next_inputs.push(dir.join(right_name));
            i += 2;
        }
    }
    info!(
        "correction done, changed {} bases in {} reads",
        counters.changed_nucleotides, counters.changed_reads
    );
    Ok((counters, next_inputs))
}
