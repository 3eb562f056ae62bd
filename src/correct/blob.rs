//! The blob arena: every read (forward, then reverse-complement) concatenated
//! into one contiguous buffer, with a parallel quality buffer. Built once per
//! correction iteration, read-only afterwards; the only mutation later phases
//! perform is flipping per-read atomic flags.

use crate::correct::fastq::open_fastq;
use crate::correct::kmer::complement;
use crate::K;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// One read's slice of the blob.
#[derive(Debug)]
pub struct PositionRead {
    start: usize,
    len: usize,
    // one bit per k-mer start: set when the canonical strand is the reverse
    rc_bits: Vec<u64>,
    done: AtomicBool,
}

impl PositionRead {
    fn new(start: usize, len: usize) -> Self {
        let words = (len + 63) / 64;
        PositionRead {
            start,
            len,
            rc_bits: vec![0; words],
            done: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn rc_bit(&self, pos: usize) -> bool {
        self.rc_bits[pos / 64] >> (pos % 64) & 1 == 1
    }

    pub fn set_rc_bit(&mut self, pos: usize) {
        self.rc_bits[pos / 64] |= 1 << (pos % 64);
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Relaxed)
    }

    /// Monotone false→true; idempotent.
    pub fn mark_done(&self) {
        self.done.store(true, Ordering::Relaxed);
    }
}

/// Process-wide sequence state for one correction iteration.
#[derive(Debug, Default)]
pub struct Arena {
    blob: Vec<u8>,
    quality: Vec<u8>,
    reads: Vec<PositionRead>,
    // number of forward reads == index of the first reverse-complement read
    rev_no: usize,
    // blob offset where the reverse-complement half begins
    rev_pos: usize,
    // read index where each input file's reads begin
    file_read_offsets: Vec<usize>,
}

impl Arena {
    /// Read every input file into the blob (forward), then append the
    /// reverse complement of every read. Reads shorter than K after
    /// trimming never enter the blob.
    pub fn build(files: &[PathBuf], qv_offset: u8, trim_quality: u8) -> Result<Arena> {
        let mut arena = Arena::default();
        for path in files {
            arena.file_read_offsets.push(arena.reads.len());
            let mut reader = open_fastq(path, qv_offset)
                .with_context(|| format!("building blob from {}", path.display()))?;
            while let Some(mut rec) = reader.next_record()? {
                let read_size = rec.trim_ns_and_bad_quality(trim_quality);
                if read_size < K {
                    continue;
                }
                let start = arena.blob.len();
                arena.blob.extend_from_slice(&rec.seq);
                arena.quality.extend_from_slice(&rec.qual);
                arena.reads.push(PositionRead::new(start, read_size));
            }
            info!(
                "{}: {} reads in blob",
                path.display(),
                arena.reads.len()
            );
        }
        arena.rev_no = arena.reads.len();
        arena.rev_pos = arena.blob.len();

        // Second half: reverse complements, same order and lengths.
        for i in 0..arena.rev_no {
            let (start, len) = (arena.reads[i].start, arena.reads[i].len);
            let rc_start = arena.blob.len();
            for j in (0..len).rev() {
                arena.blob.push(complement(arena.blob[start + j]));
                arena.quality.push(arena.quality[start + j]);
            }
            arena.reads.push(PositionRead::new(rc_start, len));
        }
        debug_assert_eq!(arena.blob.len(), 2 * arena.rev_pos);
        Ok(arena)
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    #[inline]
    pub fn quality(&self) -> &[u8] {
        &self.quality
    }

    #[inline]
    pub fn blob_size(&self) -> usize {
        self.blob.len()
    }

    #[inline]
    pub fn reads(&self) -> &[PositionRead] {
        &self.reads
    }

    #[inline]
    pub fn read(&self, i: usize) -> &PositionRead {
        &self.reads[i]
    }

    /// Number of forward reads.
    #[inline]
    pub fn rev_no(&self) -> usize {
        self.rev_no
    }

    /// Blob offset of the reverse-complement half.
    #[inline]
    pub fn rev_pos(&self) -> usize {
        self.rev_pos
    }

    pub fn file_read_offsets(&self) -> &[usize] {
        &self.file_read_offsets
    }

    /// Sequence slice of read `i`.
    pub fn read_seq(&self, i: usize) -> &[u8] {
        let r = &self.reads[i];
        &self.blob[r.start..r.start + r.len]
    }

    /// Quality slice of read `i`.
    pub fn read_qual(&self, i: usize) -> &[u8] {
        let r = &self.reads[i];
        &self.quality[r.start..r.start + r.len]
    }

    /// Blob offset of the reverse-complement image of the k-mer starting at
    /// `pos` within forward read `i`.
    pub fn rc_kmer_position(&self, i: usize, pos: usize) -> usize {
        debug_assert!(i < self.rev_no);
        let r = &self.reads[i];
        self.rev_pos + r.start + (r.len - pos - K)
    }

    /// Disjoint views for the split phase: blob, quality, forward reads
    /// (mutable, for RC bits), and the RC-half offset.
    pub fn split_view(&mut self) -> (&[u8], &[u8], &mut [PositionRead], usize) {
        let rev_no = self.rev_no;
        let rev_pos = self.rev_pos;
        let Arena {
            blob,
            quality,
            reads,
            ..
        } = self;
        (blob.as_slice(), quality.as_slice(), &mut reads[..rev_no], rev_pos)
    }
}
