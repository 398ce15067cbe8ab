use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_TARGET_SEGMENT_BYTES: u64 = 128 * 1024 * 1024;
pub const DEFAULT_BYTES_PER_RECORD_ESTIMATE: f64 = 35.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Glob of JSONL input files
    pub path: String,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory; segments are created inside it
    pub path: String,
    pub format: OutputFormat,
    /// Segment file name pattern, e.g. "part-{segment:08}.{ext}"
    pub segment_name_pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jsonl,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Segment rotation tuning. All fields have defaults, so the whole section
/// may be omitted from the job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Target size per segment in bytes. 0 disables size-based rotation.
    #[serde(default = "default_target_segment_bytes")]
    pub target_segment_bytes: u64,
    /// Seed for the per-record size estimate, corrected by recalibration
    #[serde(default = "default_bytes_per_record_estimate")]
    pub bytes_per_record_estimate: f64,
    /// A segment never rotates before holding this many records
    #[serde(default = "default_min_records_per_segment")]
    pub min_records_per_segment: u64,
    /// Hard cap on records per segment, rotating regardless of the estimate
    #[serde(default)]
    pub max_records_per_segment: Option<u64>,
}

fn default_target_segment_bytes() -> u64 {
    DEFAULT_TARGET_SEGMENT_BYTES
}

fn default_bytes_per_record_estimate() -> f64 {
    DEFAULT_BYTES_PER_RECORD_ESTIMATE
}

fn default_min_records_per_segment() -> u64 {
    1
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            target_segment_bytes: DEFAULT_TARGET_SEGMENT_BYTES,
            bytes_per_record_estimate: DEFAULT_BYTES_PER_RECORD_ESTIMATE,
            min_records_per_segment: 1,
            max_records_per_segment: None,
        }
    }
}

impl JobConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: JobConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let rotation = &self.rotation;

        if rotation.bytes_per_record_estimate <= 0.0 {
            anyhow::bail!(
                "bytes_per_record_estimate must be positive, got {}",
                rotation.bytes_per_record_estimate
            );
        }

        if rotation.min_records_per_segment == 0 {
            anyhow::bail!("min_records_per_segment must be at least 1");
        }

        if let Some(max) = rotation.max_records_per_segment {
            if max < rotation.min_records_per_segment {
                anyhow::bail!(
                    "max_records_per_segment ({}) is below min_records_per_segment ({})",
                    max,
                    rotation.min_records_per_segment
                );
            }
        }

        Ok(())
    }
}
