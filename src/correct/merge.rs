//! Merge phase: read each shard, aggregate duplicate canonical k-mers, and
//! emit the global k-mer table with stable integer ids.

use crate::correct::blob::Arena;
use crate::correct::kmer::KmerBytes;
use crate::K;
use anyhow::{bail, Context, Result};
use fxhash::FxHashMap;
use log::info;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

const FLAG_GOOD: u8 = 1 << 0;
const FLAG_GOOD_ITER: u8 = 1 << 1;
const FLAG_MARKED_GOOD_ITER: u8 = 1 << 2;
const FLAG_SINGLETON: u8 = 1 << 3;

/// Aggregate statistics of one canonical k-mer.
///
/// `count >= 1` always; `total_qual` is the product of per-occurrence error
/// probabilities; `qual[j]` the capped sum of per-occurrence quality at
/// position j. Flag upgrades are monotone and idempotent, so they go through
/// a per-entry atomic rather than a lock.
#[derive(Debug)]
pub struct KmerStat {
    pub count: u32,
    pub change_to: Option<u32>,
    pub total_qual: f64,
    pub qual: [u16; K],
    flags: AtomicU8,
}

impl KmerStat {
    fn fresh(err: f64, quals: &[u8]) -> Self {
        let mut qual = [0u16; K];
        for (q, &b) in qual.iter_mut().zip(quals) {
            *q = b as u16;
        }
        KmerStat {
            count: 1,
            change_to: None,
            total_qual: err,
            qual,
            flags: AtomicU8::new(0),
        }
    }

    fn absorb(&mut self, err: f64, quals: &[u8]) {
        self.count += 1;
        self.total_qual *= err;
        for (q, &b) in self.qual.iter_mut().zip(quals) {
            *q = q.saturating_add(b as u16);
        }
    }

    #[inline]
    fn has_flag(&self, flag: u8) -> bool {
        self.flags.load(Ordering::Relaxed) & flag != 0
    }

    pub fn is_good(&self) -> bool {
        self.has_flag(FLAG_GOOD)
    }

    pub fn is_good_iterative(&self) -> bool {
        self.has_flag(FLAG_GOOD_ITER)
    }

    pub fn is_marked_good_iterative(&self) -> bool {
        self.has_flag(FLAG_MARKED_GOOD_ITER)
    }

    pub fn is_singleton(&self) -> bool {
        self.has_flag(FLAG_SINGLETON)
    }

    pub fn make_good(&self) {
        self.flags.fetch_or(FLAG_GOOD, Ordering::Relaxed);
    }

    pub fn make_good_iterative(&self) {
        self.flags.fetch_or(FLAG_GOOD_ITER, Ordering::Relaxed);
    }

    pub fn make_singleton(&self) {
        self.flags.fetch_or(FLAG_SINGLETON, Ordering::Relaxed);
    }

    /// Set the iterative mark; true when this call was the first to set it.
    pub fn mark_good_iterative(&self) -> bool {
        let prev = self.flags.fetch_or(FLAG_MARKED_GOOD_ITER, Ordering::Relaxed);
        prev & FLAG_MARKED_GOOD_ITER == 0
    }

    /// Promote a pending mark to the full iterative flag.
    pub fn promote_marked(&self) {
        if self.is_marked_good_iterative() {
            self.make_good_iterative();
        }
    }

    /// The k-mer this one rewrites to, if the external clustering assigned
    /// one.
    pub fn change(&self) -> Option<u32> {
        self.change_to
    }

    pub fn set_change_to(&mut self, id: u32) {
        self.change_to = Some(id);
    }
}

/// One row of the merged table.
#[derive(Debug)]
pub struct KmerEntry {
    /// Blob offset of the canonical occurrence first seen.
    pub offset: usize,
    pub kmer: KmerBytes,
    pub stat: KmerStat,
}

/// The global k-mer table: entries with stable ids plus a content-keyed
/// index. Owned by the merge step; read-only afterwards except for monotone
/// flag upgrades.
#[derive(Debug, Default)]
pub struct KmerTable {
    entries: Vec<KmerEntry>,
    index: FxHashMap<KmerBytes, u32>,
}

impl KmerTable {
    pub fn lookup(&self, kmer: &KmerBytes) -> Option<u32> {
        self.index.get(kmer).copied()
    }

    #[inline]
    pub fn entry(&self, id: u32) -> &KmerEntry {
        &self.entries[id as usize]
    }

    pub fn entry_mut(&mut self, id: u32) -> &mut KmerEntry {
        &mut self.entries[id as usize]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KmerEntry> {
        self.entries.iter()
    }

    fn push(&mut self, entry: KmerEntry) -> u32 {
        let id = self.entries.len() as u32;
        self.index.insert(entry.kmer, id);
        self.entries.push(entry);
        id
    }
}

/// Merge every shard into the global table, writing the text form to
/// `out_path`. Shards aggregate in parallel; the shared writer is locked per
/// shard, appending in shard order so ids stay stable for a given input.
pub fn merge_shards(
    arena: &Arena,
    shard_files: &[Vec<PathBuf>],
    out_path: &Path,
) -> Result<KmerTable> {
    let shards: Vec<Vec<(KmerBytes, usize, KmerStat)>> = shard_files
        .par_iter()
        .map(|files| process_shard(arena, files))
        .collect::<Result<_>>()?;

    let out = File::create(out_path)
        .with_context(|| format!("creating k-mer table {}", out_path.display()))?;
    let writer = Mutex::new(BufWriter::new(out));

    let mut table = KmerTable::default();
    for shard in shards {
        let mut out = writer.lock().expect("k-mer table writer poisoned");
        for (kmer, offset, stat) in shard {
            write_entry(&mut *out, offset, &kmer, &stat)?;
            table.push(KmerEntry { offset, kmer, stat });
        }
    }
    writer
        .into_inner()
        .expect("k-mer table writer poisoned")
        .flush()?;
    info!("merge done, {} k-mers in total", table.len());
    Ok(table)
}

// Aggregate one shard's occurrence lines, keyed by canonical k-mer content.
// Entries come out ordered by blob offset.
fn process_shard(arena: &Arena, files: &[PathBuf]) -> Result<Vec<(KmerBytes, usize, KmerStat)>> {
    let mut map: FxHashMap<KmerBytes, (usize, KmerStat)> = FxHashMap::default();
    for path in files {
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("opening shard {}", path.display()))?,
        );
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (pos_s, err_s) = line
                .split_once('\t')
                .with_context(|| format!("truncated shard line in {}", path.display()))?;
            let pos: usize = pos_s
                .parse()
                .with_context(|| format!("bad position in {}", path.display()))?;
            let err: f64 = err_s
                .parse()
                .with_context(|| format!("bad error probability in {}", path.display()))?;
            if pos + K > arena.blob_size() {
                bail!("shard {} references past the blob end", path.display());
            }
            let kmer: KmerBytes = arena.blob()[pos..pos + K]
                .try_into()
                .expect("slice of K bytes");
            let quals = &arena.quality()[pos..pos + K];
            map.entry(kmer)
                .and_modify(|(_, stat)| stat.absorb(err, quals))
                .or_insert_with(|| (pos, KmerStat::fresh(err, quals)));
        }
    }
    let mut entries: Vec<(KmerBytes, usize, KmerStat)> = map
        .into_iter()
        .map(|(kmer, (pos, stat))| (kmer, pos, stat))
        .collect();
    entries.sort_by_key(|&(_, pos, _)| pos);
    Ok(entries)
}

fn write_entry<W: Write>(out: &mut W, offset: usize, kmer: &KmerBytes, stat: &KmerStat) -> Result<()> {
    write!(
        out,
        "{}\t{}\t{}\t{:.6}\t",
        offset,
        std::str::from_utf8(kmer).expect("k-mer bytes are ASCII"),
        stat.count,
        stat.total_qual
    )?;
    for (i, q) in stat.qual.iter().enumerate() {
        if i > 0 {
            write!(out, " ")?;
        }
        write!(out, "{q}")?;
    }
    writeln!(out)?;
    Ok(())
}

/// Reload a merged table from its text form, so an iteration can restart
/// from a saved table instead of raw reads.
pub fn read_kmer_table(path: &Path) -> Result<KmerTable> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("opening k-mer table {}", path.display()))?,
    );
    let mut table = KmerTable::default();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (offset, kmer_s, count, total_qual, quals) = match (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) {
            (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
            _ => bail!("truncated k-mer table line {}", lineno + 1),
        };
        if kmer_s.len() != K {
            bail!("k-mer table line {}: bad k-mer length", lineno + 1);
        }
        let mut kmer = [0u8; K];
        kmer.copy_from_slice(kmer_s.as_bytes());
        let mut qual = [0u16; K];
        for (i, q) in quals.split(' ').enumerate() {
            if i >= K {
                bail!("k-mer table line {}: too many quality values", lineno + 1);
            }
            qual[i] = q
                .parse()
                .with_context(|| format!("bad quality on line {}", lineno + 1))?;
        }
        let stat = KmerStat {
            count: count
                .parse()
                .with_context(|| format!("bad count on line {}", lineno + 1))?,
            change_to: None,
            total_qual: total_qual
                .parse()
                .with_context(|| format!("bad total quality on line {}", lineno + 1))?,
            qual,
            flags: AtomicU8::new(0),
        };
        table.push(KmerEntry {
            offset: offset
                .parse()
                .with_context(|| format!("bad offset on line {}", lineno + 1))?,
            kmer,
            stat,
        });
    }
    Ok(table)
}
