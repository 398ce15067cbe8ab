pub mod config;
pub mod record;
pub mod rotate;
pub mod runtime;
pub mod telemetry;
pub mod writer;

pub use config::{JobConfig, RotationConfig};
pub use record::Record;
pub use rotate::{SegmentSummary, SessionError, WriteSession};
pub use writer::{RecordWriter, WriterFactory};
