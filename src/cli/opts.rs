use clap::builder::RangedU64ValueParser;
use clap::{value_parser, ArgAction, Args};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct IOArgs {
    /// Input FASTQ files; in paired mode, left/right mates alternate [path]
    #[clap(
        short = 'i',
        long,
        value_parser,
        num_args = 1..,
        action = ArgAction::Append,
        required = true,
        help_heading = "Core"
    )]
    pub input: Vec<PathBuf>,

    /// Output directory for corrected reads [path]
    #[clap(
        short = 'o',
        long,
        value_parser,
        required = true,
        help_heading = "Core"
    )]
    pub output_dir: PathBuf,

    /// Working directory for scratch shard files [path]
    ///
    /// Defaults to a temporary directory removed on exit.
    #[clap(short = 'w', long, value_parser, help_heading = "Core")]
    pub working_dir: Option<PathBuf>,

    /// Number of threads to use (increases RAM usage) [integer]
    #[clap(short = 't', long, default_value = "1", help_heading = "Core")]
    pub n_threads: usize,

    /// YAML config with pipeline tuning constants [path]
    #[clap(short = 'c', long, value_parser, help_heading = "Core")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CorrectionArgs {
    /// Phred offset of the quality encoding (33 or 64) [integer]
    #[clap(long, value_parser = value_parser!(u8), help_heading = "Correction")]
    pub qv_offset: Option<u8>,

    /// Quality floor for trimming reads on input [integer]
    #[clap(long, value_parser = value_parser!(u8), help_heading = "Correction")]
    pub trim_quality: Option<u8>,

    /// Shard count of the k-mer split phase [integer]
    #[clap(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..), help_heading = "Correction")]
    pub num_shard_files: Option<usize>,

    /// Treat inputs as left/right mate files [flag]
    #[clap(short = 'p', long, help_heading = "Correction")]
    pub paired: bool,

    /// Number of correction iterations [integer]
    #[clap(long, default_value = "1", value_parser = RangedU64ValueParser::<usize>::new().range(1..), help_heading = "Correction")]
    pub iterations: usize,

    /// Stop after the merged k-mer table is written [flag]
    #[clap(long, help_heading = "Correction")]
    pub count_only: bool,

    /// Dump the solid k-mer set after every expansion pass [flag]
    #[clap(long, help_heading = "Correction")]
    pub expand_write_each_iteration: bool,
}
