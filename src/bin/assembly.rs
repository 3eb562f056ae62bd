use anyhow::{Context, Result};
use assembly::cli::opts::{CorrectionArgs, IOArgs};
use assembly::correct::correct::correct_all_reads;
use assembly::correct::expand::expand_solid;
use assembly::correct::merge::{merge_shards, read_kmer_table};
use assembly::correct::split::{mark_rc_bits, split_kmers};
use assembly::correct::{Arena, CorrectionConfig};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};
use std::fs::create_dir_all;
use std::time::Instant;

/// Command-line options for the read-correction pipeline
#[derive(Parser)]
#[command(
    name = "assembly",
    about = "Correct sequencing reads against their solid k-mer spectrum",
    long_about = "Correct sequencing reads against their solid k-mer spectrum.


EXAMPLES:
    // Single-end, two iterations
    $ assembly -i reads.fastq -o out/ --iterations 2 -t 8

    // Paired mode
    $ assembly -i left.fastq right.fastq -o out/ --paired
    ",
    version = "0.1.0"
)]
struct Cli {
    #[command(flatten)]
    io: IOArgs,

    #[command(flatten)]
    correction: CorrectionArgs,
}

impl Cli {
    /// Resolve the final config, in priority order:
    /// 1) command-line overrides
    /// 2) the YAML config file
    /// 3) built-in defaults
    fn resolve_config(&self, scratch: &tempfile::TempDir) -> Result<CorrectionConfig> {
        let mut cfg = match &self.io.config {
            Some(path) => CorrectionConfig::load(path)?,
            None => CorrectionConfig::default(),
        };
        cfg.output_dir = self.io.output_dir.clone();
        cfg.working_dir = self
            .io
            .working_dir
            .clone()
            .unwrap_or_else(|| scratch.path().to_path_buf());
        cfg.max_threads = self.io.n_threads;
        if let Some(qv) = self.correction.qv_offset {
            cfg.qv_offset = qv;
        }
        if let Some(tq) = self.correction.trim_quality {
            cfg.trim_quality = tq;
        }
        if let Some(n) = self.correction.num_shard_files {
            cfg.num_shard_files = n;
        }
        if self.correction.paired {
            cfg.paired = true;
        }
        if self.correction.expand_write_each_iteration {
            cfg.expand_write_each_iteration = true;
        }
        Ok(cfg)
    }
}

fn main() {
    // Catch and handle errors
    // Ensures that scratch files have time to unwind
    if let Err(e) = run() {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn run() -> Result<()> {
    let start_time = Instant::now();
    let opt = Cli::parse();
    TermLogger::init(
        LevelFilter::Info,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("initializing logger")?;

    // shard files are scratch; the tempdir unwinds with the process
    let scratch = tempfile::tempdir().context("creating scratch directory")?;
    let cfg = opt.resolve_config(&scratch)?;
    create_dir_all(&cfg.output_dir).context("Cannot create output_dir")?;
    create_dir_all(&cfg.working_dir).context("Cannot create working_dir")?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.max_threads)
        .build_global()
        .context("building Rayon thread pool")?;
    // the merge and correction stages carry their own caps
    let merge_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.merge_threads.min(cfg.max_threads))
        .build()
        .context("building merge thread pool")?;
    let correct_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.correct_threads.min(cfg.max_threads))
        .build()
        .context("building correction thread pool")?;

    if cfg.paired && opt.io.input.len() % 2 != 0 {
        anyhow::bail!("paired mode needs an even number of input files");
    }

    let pb = ProgressBar::new(opt.correction.iterations as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("       {bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
            .unwrap(),
    );

    let mut input_files = opt.io.input.clone();
    for iteration in 0..opt.correction.iterations {
        info!("== iteration {iteration} ==");
        pb.set_message("reading blob");
        let mut arena = Arena::build(&input_files, cfg.qv_offset, cfg.trim_quality)?;

        // restart from a saved table when one is present, otherwise rebuild
        // from the reads
        let table_path = cfg.output_dir.join(format!("{iteration:02}.kmers.total"));
        let table = if table_path.exists() {
            info!("restarting from saved k-mer table {}", table_path.display());
            pb.set_message("loading k-mer table");
            mark_rc_bits(&mut arena);
            read_kmer_table(&table_path)?
        } else {
            pb.set_message("splitting k-mers");
            let split = split_kmers(
                &mut arena,
                &cfg.working_dir,
                iteration,
                cfg.num_shard_files,
            )?;

            pb.set_message("merging shards");
            merge_pool.install(|| merge_shards(&arena, &split.shard_files, &table_path))?
        };
        if opt.correction.count_only {
            info!("k-mer table ready at {}", table_path.display());
            pb.inc(1);
            break;
        }

        // No external clustering in this driver; seed the solid set from the
        // error-probability threshold.
        let mut seeded = 0usize;
        for entry in table.iter() {
            if entry.stat.count == 1 {
                entry.stat.make_singleton();
            }
            if entry.stat.total_qual < cfg.good_threshold {
                entry.stat.make_good();
                entry.stat.make_good_iterative();
                seeded += 1;
            }
        }
        info!("seeded {seeded} solid k-mers of {}", table.len());

        pb.set_message("expanding solid set");
        let dump_dir = cfg
            .expand_write_each_iteration
            .then_some(cfg.output_dir.as_path());
        let expansion = correct_pool.install(|| {
            expand_solid(
                &arena,
                &table,
                cfg.max_expand_iterations,
                dump_dir,
                iteration,
            )
        })?;
        info!(
            "expansion finished after {} passes, {} k-mers added",
            expansion.iterations, expansion.total_marked
        );

        pb.set_message("correcting reads");
        let (counters, next_inputs) =
            correct_pool.install(|| correct_all_reads(&arena, &table, &input_files, &cfg, iteration))?;
        pb.inc(1);
        if counters.changed_reads == 0 {
            info!("no reads changed, stopping early");
            break;
        }
        input_files = next_inputs;
    }
    pb.finish_with_message("| Finished");

    let elapsed = start_time.elapsed();
    info!("Elapsed time: {:.2?}", elapsed);
    Ok(())
}
