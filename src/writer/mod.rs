use crate::record::Record;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Unified writer trait for segment sinks.
///
/// A RecordWriter owns exactly one output file. It accepts one record at a
/// time and is finalized with `close`, which reports the number of bytes
/// actually flushed to storage. That byte count is an observation of real
/// output size and feeds estimator recalibration; a writer that received no
/// records reports 0 and removes its (empty) file.
pub trait RecordWriter {
    /// Write a single record
    fn write_record(&mut self, record: Record) -> anyhow::Result<()>;

    /// Close the writer and finalize the output.
    /// Returns the number of bytes flushed to storage.
    fn close(self: Box<Self>) -> anyhow::Result<u64>;
}

/// Type alias for writer creation function, keyed by segment index
pub type WriterFactory = Box<dyn Fn(u64) -> anyhow::Result<Box<dyn RecordWriter>> + Send>;

/// Build the output path for a segment from a name pattern.
///
/// Supported placeholders:
/// - `{segment}`: segment index, no padding
/// - `{segment:08}`: segment index, zero-padded to the given width
/// - `{ext}`: file extension (without the dot)
///
/// Default pattern: `part-{segment:08}.{ext}`
pub fn segment_path(dir: &Path, pattern: &str, extension: &str, segment_index: u64) -> PathBuf {
    let mut name = pattern.replace("{ext}", extension);

    if name.contains("{segment:") {
        let re = Regex::new(r"\{segment:(\d+)\}").unwrap();
        if let Some(caps) = re.captures(&name) {
            if let Ok(width) = caps[1].parse::<usize>() {
                let formatted = format!("{:0width$}", segment_index, width = width);
                name = re.replace(&name, formatted.as_str()).to_string();
            }
        }
    } else {
        name = name.replace("{segment}", &segment_index.to_string());
    }

    dir.join(name)
}

pub const DEFAULT_SEGMENT_NAME_PATTERN: &str = "part-{segment:08}.{ext}";

pub mod jsonl;
pub mod parquet;
