use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::config::{JobConfig, OutputFormat};
use crate::record::Record;
use crate::rotate::{SegmentSummary, WriteSession};
use crate::writer::jsonl::JsonlWriter;
use crate::writer::parquet::ParquetWriter;
use crate::writer::{segment_path, RecordWriter, WriterFactory, DEFAULT_SEGMENT_NAME_PATTERN};

mod manifest;
pub use manifest::{Manifest, SegmentManifest};

/// Stream JSONL input records through a rotating write session and record the
/// produced segments in a manifest next to them.
pub fn run_job(config: &JobConfig) -> Result<()> {
    println!("Running job: {}", config.name);

    let input_files = expand_inputs(&config.input.path)?;
    if input_files.is_empty() {
        anyhow::bail!("No input files match {:?}", config.input.path);
    }

    let out_dir = PathBuf::from(&config.output.path);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

    let pattern = config
        .output
        .segment_name_pattern
        .clone()
        .unwrap_or_else(|| DEFAULT_SEGMENT_NAME_PATTERN.to_string());
    let format = config.output.format;

    let factory = segment_writer_factory(out_dir.clone(), pattern.clone(), format);
    let mut session = WriteSession::open(&config.rotation, factory)?;

    let mut manifest = Manifest::new(config.name.clone());
    manifest.input_files = input_files
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {pos} records written {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let limit = config.input.limit.unwrap_or(u64::MAX);
    let mut records_read: u64 = 0;
    let mut skipped: u64 = 0;

    'files: for file in &input_files {
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("Failed to open input file {:?}", file))?,
        );
        for line in reader.lines() {
            if records_read >= limit {
                break 'files;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let value: serde_json::Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    skipped += 1;
                    log::warn!("skipping malformed JSON line in {:?}: {e}", file);
                    continue;
                }
            };
            let record = match Record::from_value(value) {
                Some(r) => r,
                None => {
                    skipped += 1;
                    log::warn!("skipping non-object JSON line in {:?}", file);
                    continue;
                }
            };

            if let Some(summary) = session.write(record)? {
                manifest.add_segment(to_segment_manifest(&out_dir, &pattern, format, &summary));
            }
            records_read += 1;
            pb.inc(1);
        }
    }

    if let Some(summary) = session.close()? {
        // A zero-record final segment was deleted by its writer
        if summary.records > 0 {
            manifest.add_segment(to_segment_manifest(&out_dir, &pattern, format, &summary));
        }
    }
    pb.finish_and_clear();

    let manifest_path = out_dir.join("manifest.json");
    manifest.write_to_file(&manifest_path)?;

    println!(
        "Wrote {} records into {} segments ({} bytes); {} malformed lines skipped",
        manifest.total_records,
        manifest.segments.len(),
        manifest.total_bytes,
        skipped
    );
    println!("Manifest: {:?}", manifest_path);

    Ok(())
}

fn expand_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("Bad input glob {:?}", pattern))? {
        files.push(entry?);
    }
    files.sort();
    Ok(files)
}

fn segment_writer_factory(out_dir: PathBuf, pattern: String, format: OutputFormat) -> WriterFactory {
    Box::new(move |segment_index| {
        let path = segment_path(&out_dir, &pattern, format.extension(), segment_index);
        let writer: Box<dyn RecordWriter> = match format {
            OutputFormat::Jsonl => Box::new(JsonlWriter::new(&path)?),
            OutputFormat::Parquet => Box::new(ParquetWriter::new(&path)?),
        };
        Ok(writer)
    })
}

fn to_segment_manifest(
    out_dir: &Path,
    pattern: &str,
    format: OutputFormat,
    summary: &SegmentSummary,
) -> SegmentManifest {
    SegmentManifest {
        path: segment_path(out_dir, pattern, format.extension(), summary.segment_index)
            .to_string_lossy()
            .to_string(),
        records: summary.records,
        bytes: summary.flushed_bytes,
    }
}
