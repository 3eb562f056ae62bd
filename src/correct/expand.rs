//! Iterative expansion of the solid set: a read whose every position is
//! covered by solid k-mers vouches for all of its k-mers. Iterates to a
//! fixed point.

use crate::correct::blob::Arena;
use crate::correct::kmer::{canonical, ValidKmerIter};
use crate::correct::merge::KmerTable;
use crate::K;
use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpansionOutcome {
    pub iterations: usize,
    pub total_marked: usize,
}

/// One pass over the not-yet-done reads. Marks every k-mer of a fully
/// covered read; returns the number of freshly marked k-mers. Marks become
/// visible as solid only after `promote_marks`, so every read in a pass
/// sees the same solid snapshot.
pub fn expansion_step(arena: &Arena, table: &KmerTable) -> usize {
    let fresh = AtomicUsize::new(0);
    (0..arena.rev_no()).into_par_iter().for_each(|readno| {
        let pr = arena.read(readno);
        if pr.is_done() {
            return;
        }
        let seq = arena.read_seq(readno);
        let read_size = pr.size();
        let mut covered = vec![false; read_size];
        let mut kmer_ids: Vec<u32> = Vec::new();
        for p in ValidKmerIter::new(seq) {
            let (canon, _) = canonical(&seq[p..p + K]);
            if let Some(id) = table.lookup(&canon) {
                kmer_ids.push(id);
                if table.entry(id).stat.is_good_iterative() {
                    covered[p..p + K].fill(true);
                }
            }
        }
        if !covered.iter().all(|&c| c) {
            return;
        }

        pr.mark_done();
        for id in kmer_ids {
            let stat = &table.entry(id).stat;
            if !stat.is_good_iterative() && stat.mark_good_iterative() {
                fresh.fetch_add(1, Ordering::Relaxed);
            }
        }
    });
    fresh.into_inner()
}

/// Promote every pending mark to the full solid flag.
pub fn promote_marks(table: &KmerTable) {
    for entry in table.iter() {
        entry.stat.promote_marked();
    }
}

/// Grow the solid set to a fixed point (or until `max_iterations`).
pub fn expand_solid(
    arena: &Arena,
    table: &KmerTable,
    max_iterations: usize,
    dump_dir: Option<&Path>,
    iteration_no: usize,
) -> Result<ExpansionOutcome> {
    let mut outcome = ExpansionOutcome::default();
    loop {
        let marked = expansion_step(arena, table);
        promote_marks(table);
        outcome.iterations += 1;
        outcome.total_marked += marked;
        info!(
            "expansion pass {}: {} new solid k-mers",
            outcome.iterations, marked
        );
        if let Some(dir) = dump_dir {
            dump_solid(table, dir, iteration_no, outcome.iterations)?;
        }
        if marked == 0 || outcome.iterations >= max_iterations {
            return Ok(outcome);
        }
    }
}

// Diagnostic dump of the current solid set, one file per expansion pass.
fn dump_solid(table: &KmerTable, dir: &Path, iteration_no: usize, pass: usize) -> Result<()> {
    let path = dir.join(format!("{iteration_no:02}.goodkmers.{pass}"));
    let mut out = BufWriter::new(
        File::create(&path).with_context(|| format!("creating dump {}", path.display()))?,
    );
    for entry in table.iter() {
        if entry.stat.is_good_iterative() {
            writeln!(
                out,
                "{}\n>{}  cnt={}  tql={:.6}",
                std::str::from_utf8(&entry.kmer).expect("k-mer bytes are ASCII"),
                entry.offset,
                entry.stat.count,
                1.0 - entry.stat.total_qual
            )?;
        }
    }
    Ok(())
}
