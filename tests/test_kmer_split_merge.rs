#[cfg(test)]
mod tests {
    use assembly::correct::blob::Arena;
    use assembly::correct::kmer::{
        canonical, error_probability, reverse_complement, ValidKmerIter,
    };
    use assembly::correct::merge::{merge_shards, read_kmer_table};
    use assembly::correct::split::{mark_rc_bits, split_kmers};
    use assembly::K;
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    const S: &str = "AACCAACCAACCACCAACACCACCA"; // 25 bases, A/C only

    fn write_fastq(path: &Path, reads: &[(&str, &str, u8)]) {
        let mut f = File::create(path).unwrap();
        for (name, seq, qual) in reads {
            let quals: String = std::iter::repeat((qual + 33) as char)
                .take(seq.len())
                .collect();
            writeln!(f, "@{name}\n{seq}\n+\n{quals}").unwrap();
        }
    }

    /* --------------------------------------------------------------------- */
    /*  canonicalization                                                     */
    /* --------------------------------------------------------------------- */

    #[test]
    fn canonical_is_the_smaller_strand_and_idempotent() {
        let fwd: Vec<u8> = S.bytes().take(K).collect();
        let (canon, reversed) = canonical(&fwd);
        // A/C-only windows always beat their G/T reverse complement
        assert!(!reversed);
        assert_eq!(canon.as_slice(), &fwd[..]);

        let tail: Vec<u8> = "T".repeat(K).into_bytes();
        let (canon, reversed) = canonical(&tail);
        assert!(reversed);
        assert_eq!(canon, [b'A'; K]);

        // idempotence: canonical(canonical(k)) == canonical(k)
        let (again, reversed_again) = canonical(&canon);
        assert!(!reversed_again);
        assert_eq!(again, canon);

        // canonical == min(k, revcomp(k)) in the byte order
        let rc = reverse_complement(&fwd);
        let expected = if fwd.as_slice() < rc.as_slice() {
            fwd.clone()
        } else {
            rc.to_vec()
        };
        assert_eq!(canonical(&fwd).0.as_slice(), expected.as_slice());
    }

    #[test]
    fn valid_windows_skip_ambiguous_bases() {
        let mut seq = S.as_bytes().to_vec();
        seq[22] = b'N';
        let positions: Vec<usize> = ValidKmerIter::new(&seq).collect();
        assert_eq!(positions, vec![0, 1]);

        let clean: Vec<usize> = ValidKmerIter::new(S.as_bytes()).collect();
        assert_eq!(clean, vec![0, 1, 2, 3, 4]);

        let too_short: Vec<usize> = ValidKmerIter::new(&seq[..K - 1]).collect();
        assert!(too_short.is_empty());
    }

    #[test]
    fn error_probability_follows_the_phred_product() {
        let qual = vec![10u8; K];
        // per-base accuracy 0.9
        let expected = 1.0 - 0.9f64.powi(K as i32);
        assert!((error_probability(&qual) - expected).abs() < 1e-9);
    }

    /* --------------------------------------------------------------------- */
    /*  blob construction                                                    */
    /* --------------------------------------------------------------------- */

    #[test]
    fn blob_holds_forward_then_reverse_complement_halves() {
        let dir = tempfile::tempdir().unwrap();
        let fastq = dir.path().join("reads.fastq");
        write_fastq(&fastq, &[("r1", S, 30), ("short", "ACGT", 30), ("r2", S, 30)]);

        let arena = Arena::build(&[fastq], 33, 2).unwrap();
        // the short read never entered the blob
        assert_eq!(arena.rev_no(), 2);
        assert_eq!(arena.reads().len(), 4);
        assert_eq!(arena.rev_pos(), 2 * S.len());
        assert_eq!(arena.blob_size(), 4 * S.len());
        assert_eq!(arena.file_read_offsets(), &[0]);

        assert_eq!(arena.read_seq(0), S.as_bytes());
        let rc: Vec<u8> = S
            .bytes()
            .rev()
            .map(|b| match b {
                b'A' => b'T',
                b'C' => b'G',
                b'G' => b'C',
                _ => b'A',
            })
            .collect();
        assert_eq!(arena.read_seq(2), rc.as_slice());
        // every PositionRead stays inside the blob
        for pr in arena.reads() {
            assert!(pr.start() + pr.size() <= arena.blob_size());
        }
    }

    /* --------------------------------------------------------------------- */
    /*  split + merge                                                        */
    /* --------------------------------------------------------------------- */

    #[test]
    fn merge_counts_match_the_occurrences() {
        let dir = tempfile::tempdir().unwrap();
        let fastq = dir.path().join("reads.fastq");
        write_fastq(&fastq, &[("r1", S, 30), ("r2", S, 30)]);

        let mut arena = Arena::build(&[fastq], 33, 2).unwrap();
        let split = split_kmers(&mut arena, dir.path(), 0, 3).unwrap();
        assert_eq!(split.kmer_count, 2 * (S.len() - K + 1) as u64);

        let table_path = dir.path().join("00.kmers.total");
        let table = merge_shards(&arena, &split.shard_files, &table_path).unwrap();

        // five distinct windows, each seen once per read
        assert_eq!(table.len(), S.len() - K + 1);
        for entry in table.iter() {
            assert_eq!(entry.stat.count, 2);
            assert!(entry.stat.count >= 1);
        }

        // every k-mer of every read is present in the merged table
        for i in 0..arena.rev_no() {
            let seq = arena.read_seq(i);
            for p in ValidKmerIter::new(seq) {
                let (canon, _) = canonical(&seq[p..p + K]);
                assert!(table.lookup(&canon).is_some());
            }
        }
    }

    #[test]
    fn reverse_strand_occurrences_set_the_rc_bit() {
        let dir = tempfile::tempdir().unwrap();
        let fastq = dir.path().join("reads.fastq");
        let t_read = "T".repeat(25);
        write_fastq(&fastq, &[("r1", &t_read, 30)]);

        let mut arena = Arena::build(&[fastq], 33, 2).unwrap();
        let split = split_kmers(&mut arena, dir.path(), 0, 2).unwrap();
        for p in 0..=t_read.len() - K {
            assert!(arena.read(0).rc_bit(p));
        }

        let table_path = dir.path().join("00.kmers.total");
        let table = merge_shards(&arena, &split.shard_files, &table_path).unwrap();
        assert_eq!(table.len(), 1);
        let entry = table.iter().next().unwrap();
        assert_eq!(entry.kmer, [b'A'; K]);
        assert_eq!(entry.stat.count, 5);
        // the stored offset points into the reverse-complement half
        assert!(entry.offset >= arena.rev_pos());
        assert_eq!(&arena.blob()[entry.offset..entry.offset + K], [b'A'; K]);
    }

    #[test]
    fn merge_combines_counts_quality_sums_and_error_products() {
        let dir = tempfile::tempdir().unwrap();
        let fastq = dir.path().join("reads.fastq");
        let kmer_seq = "AAAAAAAAAAAAAAAAAAAAC"; // exactly K bases
        write_fastq(
            &fastq,
            &[("a", kmer_seq, 20), ("b", kmer_seq, 25), ("c", kmer_seq, 22)],
        );
        let arena = Arena::build(&[fastq], 33, 2).unwrap();

        // hand-written shard: three occurrences of the same canonical k-mer
        let shard = dir.path().join("00.tmp.kmers.0.0");
        let mut f = File::create(&shard).unwrap();
        writeln!(f, "0\t0.100000").unwrap();
        writeln!(f, "{}\t0.200000", K).unwrap();
        writeln!(f, "{}\t0.050000", 2 * K).unwrap();
        drop(f);

        let table_path = dir.path().join("00.kmers.total");
        let table = merge_shards(&arena, &[vec![shard]], &table_path).unwrap();
        assert_eq!(table.len(), 1);
        let entry = table.iter().next().unwrap();
        assert_eq!(entry.stat.count, 3);
        assert!((entry.stat.total_qual - 0.001).abs() < 1e-12);
        for j in 0..K {
            assert_eq!(entry.stat.qual[j], 20 + 25 + 22);
        }
    }

    #[test]
    fn rc_bits_can_be_restored_without_splitting() {
        let dir = tempfile::tempdir().unwrap();
        let fastq = dir.path().join("reads.fastq");
        let t_read = "T".repeat(25);
        write_fastq(&fastq, &[("fwd", S, 30), ("rev", &t_read, 30)]);

        let mut arena = Arena::build(&[fastq], 33, 2).unwrap();
        mark_rc_bits(&mut arena);

        // A/C windows keep the forward strand, T windows flip
        for p in 0..=S.len() - K {
            assert!(!arena.read(0).rc_bit(p));
            assert!(arena.read(1).rc_bit(p));
        }
        // no shard files were produced
        assert!(!dir.path().join("00.tmp.kmers.0.0").exists());
    }

    /* --------------------------------------------------------------------- */
    /*  table round-trip                                                     */
    /* --------------------------------------------------------------------- */

    #[test]
    fn written_tables_reload_to_the_same_entries() {
        let dir = tempfile::tempdir().unwrap();
        let fastq = dir.path().join("reads.fastq");
        write_fastq(&fastq, &[("r1", S, 30), ("r2", S, 28)]);

        let mut arena = Arena::build(&[fastq], 33, 2).unwrap();
        let split = split_kmers(&mut arena, dir.path(), 0, 2).unwrap();
        let table_path = dir.path().join("00.kmers.total");
        let table = merge_shards(&arena, &split.shard_files, &table_path).unwrap();

        let reloaded = read_kmer_table(&table_path).unwrap();
        assert_eq!(reloaded.len(), table.len());
        for (a, b) in table.iter().zip(reloaded.iter()) {
            assert_eq!(a.offset, b.offset);
            assert_eq!(a.kmer, b.kmer);
            assert_eq!(a.stat.count, b.stat.count);
            assert_eq!(a.stat.qual, b.stat.qual);
            assert!((a.stat.total_qual - b.stat.total_qual).abs() < 1e-6);
        }
    }

    /* --------------------------------------------------------------------- */
    /*  determinism                                                          */
    /* --------------------------------------------------------------------- */

    #[test]
    fn split_and_merge_are_stable_for_a_given_input() {
        let dir = tempfile::tempdir().unwrap();
        let fastq = dir.path().join("reads.fastq");
        write_fastq(&fastq, &[("r1", S, 30), ("r2", &"T".repeat(25), 30)]);

        let run = |iteration: usize| -> Vec<(usize, [u8; K], u32)> {
            let mut arena = Arena::build(std::slice::from_ref(&fastq), 33, 2).unwrap();
            let split = split_kmers(&mut arena, dir.path(), iteration, 4).unwrap();
            let table_path: PathBuf = dir.path().join(format!("{iteration:02}.kmers.total"));
            let table = merge_shards(&arena, &split.shard_files, &table_path).unwrap();
            table
                .iter()
                .map(|e| (e.offset, e.kmer, e.stat.count))
                .collect()
        };
        assert_eq!(run(0), run(1));
    }
}
