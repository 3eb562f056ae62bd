//! K-mer counting and read correction: reads are concatenated into a blob,
//! every valid k-mer is canonicalized and sharded to disk, shards merge into
//! a global k-mer table, the solid set grows to a fixed point, and reads are
//! rewritten to their per-position consensus.

pub mod blob;
pub mod config;
pub mod correct;
pub mod expand;
pub mod fastq;
pub mod kmer;
pub mod merge;
pub mod split;

pub use blob::{Arena, PositionRead};
pub use config::CorrectionConfig;
pub use merge::{KmerEntry, KmerStat, KmerTable};
