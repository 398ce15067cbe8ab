use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub job_name: String,
    pub input_files: Vec<String>,
    pub segments: Vec<SegmentManifest>,
    pub total_records: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentManifest {
    pub path: String,
    pub records: u64,
    pub bytes: u64,
}

impl Manifest {
    pub fn new(job_name: String) -> Self {
        Self {
            job_name,
            input_files: Vec::new(),
            segments: Vec::new(),
            total_records: 0,
            total_bytes: 0,
        }
    }

    pub fn add_segment(&mut self, segment: SegmentManifest) {
        self.total_records += segment.records;
        self.total_bytes += segment.bytes;
        self.segments.push(segment);
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_accumulate_across_segments() {
        let mut manifest = Manifest::new("job".to_string());
        manifest.add_segment(SegmentManifest {
            path: "out/part-00000000.jsonl".to_string(),
            records: 10,
            bytes: 400,
        });
        manifest.add_segment(SegmentManifest {
            path: "out/part-00000001.jsonl".to_string(),
            records: 5,
            bytes: 180,
        });
        assert_eq!(manifest.total_records, 15);
        assert_eq!(manifest.total_bytes, 580);
        assert_eq!(manifest.segments.len(), 2);
    }
}
