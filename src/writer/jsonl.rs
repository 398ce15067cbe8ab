use super::RecordWriter;
use crate::record::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Line-delimited JSON segment writer.
pub struct JsonlWriter {
    writer: BufWriter<File>,
    buffer: Vec<Record>,
    buffer_capacity: usize,
    path: PathBuf, // Stored for deletion of empty segments
    records_written: u64,
    bytes_written: u64,
}

impl JsonlWriter {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let output_file = File::create(path)?;
        let writer = BufWriter::new(output_file);
        Ok(Self {
            writer,
            buffer: Vec::new(),
            buffer_capacity: 50000,
            path: path.to_path_buf(),
            records_written: 0,
            bytes_written: 0,
        })
    }

    /// Flush buffered records to disk
    fn flush(&mut self) -> anyhow::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        // Serialize the whole buffer into one string to reduce write syscalls
        let mut output = String::with_capacity(self.buffer.len() * 200);
        for record in &self.buffer {
            let json_str = serde_json::to_string(record.as_value())?;
            output.push_str(&json_str);
            output.push('\n');
        }

        self.writer.write_all(output.as_bytes())?;
        self.records_written += self.buffer.len() as u64;
        self.bytes_written += output.len() as u64;
        self.buffer.clear();

        Ok(())
    }
}

impl RecordWriter for JsonlWriter {
    fn write_record(&mut self, record: Record) -> anyhow::Result<()> {
        self.buffer.push(record);

        if self.buffer.len() >= self.buffer_capacity {
            self.flush()?;
        }

        Ok(())
    }

    fn close(mut self: Box<Self>) -> anyhow::Result<u64> {
        self.flush()?;
        self.writer.flush()?;

        // An empty segment is useless downstream; remove the file
        if self.records_written == 0 {
            drop(self.writer);
            let _ = std::fs::remove_file(&self.path);
            return Ok(0);
        }

        Ok(self.bytes_written)
    }
}
