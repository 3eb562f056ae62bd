#[derive(Debug, Default)]
pub struct CorrectionCounters {
    pub total: u64,
    pub corrected: u64,
    pub bad: u64,
    pub unpaired: u64,
    pub changed_reads: u64,
    pub changed_nucleotides: u64,
}

impl std::ops::AddAssign for CorrectionCounters {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.corrected += other.corrected;
        self.bad += other.bad;
        self.unpaired += other.unpaired;
        self.changed_reads += other.changed_reads;
        self.changed_nucleotides += other.changed_nucleotides;
    }
}
