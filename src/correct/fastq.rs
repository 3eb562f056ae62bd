//! FASTQ input/output with Phred-offset handling and quality trimming.
//! Malformed records are fatal: the iteration aborts rather than guessing.

use crate::correct::kmer::is_valid_base;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// One read with its quality scores. Qualities are raw Phred values; the
/// encoding offset is stripped on input and re-applied on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub name: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl FastqRecord {
    /// Trim leading and trailing bases that are ambiguous or fall below
    /// `trim_quality`. Returns the remaining length.
    pub fn trim_ns_and_bad_quality(&mut self, trim_quality: u8) -> usize {
        let keep = |i: usize| is_valid_base(self.seq[i]) && self.qual[i] >= trim_quality;
        let mut left = 0;
        while left < self.seq.len() && !keep(left) {
            left += 1;
        }
        let mut right = self.seq.len();
        while right > left && !keep(right - 1) {
            right -= 1;
        }
        self.seq.drain(..left);
        self.seq.truncate(right - left);
        self.qual.drain(..left);
        self.qual.truncate(right - left);
        self.seq.len()
    }

    /// Keep positions `[left, right]` inclusive.
    pub fn trim_left_right(&mut self, left: usize, right: usize) {
        let right = (right + 1).min(self.seq.len());
        let left = left.min(right);
        self.seq.drain(..left);
        self.seq.truncate(right - left);
        self.qual.drain(..left);
        self.qual.truncate(right - left);
    }
}

/// Streaming FASTQ reader.
pub struct FastqReader<R> {
    inner: R,
    qv_offset: u8,
    line_no: usize,
}

pub fn open_fastq(path: &Path, qv_offset: u8) -> Result<FastqReader<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("opening FASTQ input {}", path.display()))?;
    Ok(FastqReader::new(BufReader::new(file), qv_offset))
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(inner: R, qv_offset: u8) -> Self {
        FastqReader {
            inner,
            qv_offset,
            line_no: 0,
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let n = self.inner.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Next record, `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        let header = match self.read_line()? {
            Some(l) if l.is_empty() => return Ok(None),
            Some(l) => l,
            None => return Ok(None),
        };
        if !header.starts_with('@') {
            bail!("FASTQ line {}: expected '@', got {:?}", self.line_no, header);
        }
        let seq = self
            .read_line()?
            .with_context(|| format!("FASTQ truncated after line {}", self.line_no))?;
        let plus = self
            .read_line()?
            .with_context(|| format!("FASTQ truncated after line {}", self.line_no))?;
        if !plus.starts_with('+') {
            bail!("FASTQ line {}: expected '+', got {:?}", self.line_no, plus);
        }
        let qual_line = self
            .read_line()?
            .with_context(|| format!("FASTQ truncated after line {}", self.line_no))?;
        if qual_line.len() != seq.len() {
            bail!(
                "FASTQ line {}: quality length {} does not match sequence length {}",
                self.line_no,
                qual_line.len(),
                seq.len()
            );
        }
        let mut qual = Vec::with_capacity(qual_line.len());
        for &q in qual_line.as_bytes() {
            if q < self.qv_offset {
                bail!(
                    "FASTQ line {}: quality byte {} below offset {}",
                    self.line_no,
                    q,
                    self.qv_offset
                );
            }
            qual.push(q - self.qv_offset);
        }
        Ok(Some(FastqRecord {
            name: header[1..].to_string(),
            seq: seq.into_bytes(),
            qual,
        }))
    }
}

/// Write one record, re-applying the Phred offset.
pub fn write_record<W: Write>(out: &mut W, rec: &FastqRecord, qv_offset: u8) -> Result<()> {
    out.write_all(b"@")?;
    out.write_all(rec.name.as_bytes())?;
    out.write_all(b"\n")?;
    out.write_all(&rec.seq)?;
    out.write_all(b"\n+\n")?;
    for &q in &rec.qual {
        out.write_all(&[q + qv_offset])?;
    }
    out.write_all(b"\n")?;
    Ok(())
}
