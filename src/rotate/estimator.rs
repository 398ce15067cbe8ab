/// Recalibration samples below this record count are ignored: a handful of
/// rows tells us nothing reliable about per-record size.
pub const MIN_RECALIBRATION_SAMPLE: u64 = 100;

/// Running approximation of bytes accumulated in the current segment.
///
/// The estimate is `records_in_segment * bytes_per_record`. It is an
/// approximation, never an exact count: compression, dictionary encoding and
/// columnar layout all make the real file size diverge from it. The
/// per-record figure is seeded from configuration and nudged toward observed
/// reality whenever a finished segment reports its flushed byte count.
pub struct SizeEstimator {
    bytes_per_record: f64,
    records_in_segment: u64,
}

impl SizeEstimator {
    pub fn new(bytes_per_record: f64) -> Self {
        Self {
            bytes_per_record,
            records_in_segment: 0,
        }
    }

    /// Account for one written record and return the updated estimate
    pub fn record_written(&mut self) -> u64 {
        self.records_in_segment += 1;
        self.estimated_bytes()
    }

    pub fn estimated_bytes(&self) -> u64 {
        (self.records_in_segment as f64 * self.bytes_per_record) as u64
    }

    pub fn records_in_segment(&self) -> u64 {
        self.records_in_segment
    }

    pub fn bytes_per_record(&self) -> f64 {
        self.bytes_per_record
    }

    /// Start a fresh segment
    pub fn reset_segment(&mut self) {
        self.records_in_segment = 0;
    }

    /// Fold an observed (bytes, records) sample into the per-record estimate.
    ///
    /// The new estimate is the average of the prior estimate and the observed
    /// per-record size. Samples smaller than MIN_RECALIBRATION_SAMPLE are
    /// ignored, which also rules out division by zero.
    pub fn recalibrate(&mut self, observed_bytes: u64, observed_records: u64) {
        if observed_records < MIN_RECALIBRATION_SAMPLE {
            log::debug!(
                "skipping recalibration: sample of {observed_records} records is below minimum {MIN_RECALIBRATION_SAMPLE}"
            );
            return;
        }

        let observed = observed_bytes as f64 / observed_records as f64;
        let updated = (self.bytes_per_record + observed) / 2.0;
        log::debug!(
            "recalibrated bytes/record: {:.2} -> {:.2} (observed {:.2} over {} records)",
            self.bytes_per_record,
            updated,
            observed,
            observed_records
        );
        self.bytes_per_record = updated;
    }
}
