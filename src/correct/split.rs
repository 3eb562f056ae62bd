//! Split phase: canonicalize every valid k-mer of every forward read and
//! shard its `(position, error_probability)` record to disk by k-mer hash.
//! Reads are partitioned across workers; each worker writes only its own
//! shard files, so the phase is contention-free.

use crate::correct::blob::Arena;
use crate::correct::kmer::{canonical, error_probability, ValidKmerIter};
use crate::K;
use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Shard files produced by one split run, grouped per shard: element `s`
/// holds every worker's file for shard `s`.
#[derive(Debug)]
pub struct SplitOutput {
    pub shard_files: Vec<Vec<PathBuf>>,
    pub kmer_count: u64,
}

/// Shard every valid k-mer occurrence of the forward half of the blob.
/// Canonicalization flips the owning read's RC bit whenever the reverse
/// strand wins, so later phases can reconstruct the orientation.
pub fn split_kmers(
    arena: &mut Arena,
    working_dir: &Path,
    iteration: usize,
    num_files: usize,
) -> Result<SplitOutput> {
    let (blob, quality, reads, rev_pos) = arena.split_view();
    if reads.is_empty() {
        return Ok(SplitOutput {
            shard_files: vec![Vec::new(); num_files],
            kmer_count: 0,
        });
    }

    let n_workers = rayon::current_num_threads().max(1);
    let chunk_size = (reads.len() + n_workers - 1) / n_workers;

    let results: Vec<(Vec<PathBuf>, u64)> = reads
        .par_chunks_mut(chunk_size)
        .enumerate()
        .map(|(worker, chunk)| -> Result<(Vec<PathBuf>, u64)> {
            let mut paths = Vec::with_capacity(num_files);
            let mut writers = Vec::with_capacity(num_files);
            for shard in 0..num_files {
                let path =
                    working_dir.join(format!("{iteration:02}.tmp.kmers.{worker}.{shard}"));
                let file = File::create(&path)
                    .with_context(|| format!("creating shard file {}", path.display()))?;
                writers.push(BufWriter::new(file));
                paths.push(path);
            }

            let mut emitted = 0u64;
            for pr in chunk.iter_mut() {
                let start = pr.start();
                let len = pr.size();
                let seq = &blob[start..start + len];
                let qual = &quality[start..start + len];
                for p in ValidKmerIter::new(seq) {
                    let err = error_probability(&qual[p..p + K]);
                    let (canon, reversed) = canonical(&seq[p..p + K]);
                    let pos = if reversed {
                        pr.set_rc_bit(p);
                        rev_pos + start + (len - p - K)
                    } else {
                        start + p
                    };
                    let shard = fxhash::hash64(&canon) as usize % num_files;
                    writeln!(writers[shard], "{pos}\t{err:.6}")?;
                    emitted += 1;
                }
            }
            for mut w in writers {
                w.flush()?;
            }
            Ok((paths, emitted))
        })
        .collect::<Result<_>>()?;

    let mut shard_files = vec![Vec::new(); num_files];
    let mut kmer_count = 0u64;
    for (paths, emitted) in results {
        for (shard, path) in paths.into_iter().enumerate() {
            shard_files[shard].push(path);
        }
        kmer_count += emitted;
    }
    info!("split {kmer_count} k-mer instances into {num_files} shards");
    Ok(SplitOutput {
        shard_files,
        kmer_count,
    })
}

/// Recompute the canonical-strand RC bits without writing shard files.
/// Runs that restart from a saved k-mer table skip the split phase but the
/// correction voting still needs the per-window orientation.
pub fn mark_rc_bits(arena: &mut Arena) {
    let (blob, _, reads, _) = arena.split_view();
    reads.par_iter_mut().for_each(|pr| {
        let start = pr.start();
        let len = pr.size();
        let seq = &blob[start..start + len];
        for p in ValidKmerIter::new(seq) {
            let (_, reversed) = canonical(&seq[p..p + K]);
            if reversed {
                pr.set_rc_bit(p);
            }
        }
    });
}
