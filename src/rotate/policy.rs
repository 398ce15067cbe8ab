/// Decides when the current segment should be closed and a new one opened.
///
/// A `target_bytes` of 0 disables size-based rotation entirely; it is a valid
/// configuration, not an error. A segment holding zero records is never
/// rotated, so a wildly overestimated per-record size cannot spin the session
/// into an endless rotation loop.
pub struct RotationPolicy {
    target_bytes: u64,
    min_records: u64,
    max_records: Option<u64>,
}

impl RotationPolicy {
    pub fn new(target_bytes: u64, min_records: u64, max_records: Option<u64>) -> Self {
        Self {
            target_bytes,
            min_records: min_records.max(1),
            max_records,
        }
    }

    pub fn should_rotate(&self, estimated_bytes: u64, records_in_segment: u64) -> bool {
        if records_in_segment == 0 {
            return false;
        }

        // Hard cap bounds worst-case memory even if the estimate never trips
        if let Some(max) = self.max_records {
            if records_in_segment >= max {
                return true;
            }
        }

        if self.target_bytes == 0 || records_in_segment < self.min_records {
            return false;
        }

        estimated_bytes > self.target_bytes
    }
}
