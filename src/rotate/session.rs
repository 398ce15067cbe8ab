use super::{RotationPolicy, SizeEstimator};
use crate::config::RotationConfig;
use crate::record::Record;
use crate::writer::{RecordWriter, WriterFactory};
use thiserror::Error;

/// Errors surfaced by a [`WriteSession`]. Any Write/Close/OpenSegment error is
/// terminal for the session: later operations fail with `AlreadyClosed`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The underlying writer rejected a record. Not retried here; the record
    /// was not persisted and no rotation was attempted.
    #[error("record write failed in segment {segment_index}: {cause}")]
    Write {
        segment_index: u64,
        cause: anyhow::Error,
    },

    /// The underlying writer failed to close. The segment may be truncated.
    #[error("failed to close segment {segment_index}: {cause}")]
    Close {
        segment_index: u64,
        cause: anyhow::Error,
    },

    /// The factory could not produce a writer for the next segment. The
    /// previous segment is already closed, so the session cannot continue.
    #[error("failed to open writer for segment {segment_index}: {cause}")]
    OpenSegment {
        segment_index: u64,
        cause: anyhow::Error,
    },

    #[error("write session is already closed")]
    AlreadyClosed,
}

/// Description of one finalized segment, reported when a rotation or the
/// final close ends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSummary {
    pub segment_index: u64,
    pub records: u64,
    pub flushed_bytes: u64,
}

/// One task's output stream, split into target-sized segments.
///
/// The session owns exactly one underlying writer at a time, from construction
/// until `close`. Every `write` forwards the record to the current writer
/// first and only then consults the estimator and rotation policy, so the
/// record that crosses the size threshold always lands in the segment that was
/// open when `write` was called.
///
/// Sessions are single-writer by contract: one task drives `write` and `close`
/// sequentially and never shares the session.
pub struct WriteSession {
    factory: WriterFactory,
    writer: Option<Box<dyn RecordWriter>>,
    estimator: SizeEstimator,
    policy: RotationPolicy,
    segment_index: u64,
    failed: bool,
}

impl WriteSession {
    /// Open a session, immediately acquiring the writer for segment 0.
    pub fn open(config: &RotationConfig, factory: WriterFactory) -> Result<Self, SessionError> {
        let writer = factory(0).map_err(|cause| SessionError::OpenSegment {
            segment_index: 0,
            cause,
        })?;

        Ok(Self {
            factory,
            writer: Some(writer),
            estimator: SizeEstimator::new(config.bytes_per_record_estimate),
            policy: RotationPolicy::new(
                config.target_segment_bytes,
                config.min_records_per_segment,
                config.max_records_per_segment,
            ),
            segment_index: 0,
            failed: false,
        })
    }

    /// Write one record. Returns `Some(summary)` when this write closed a
    /// segment and opened the next one, `None` otherwise.
    pub fn write(&mut self, record: Record) -> Result<Option<SegmentSummary>, SessionError> {
        if self.failed {
            return Err(SessionError::AlreadyClosed);
        }
        let writer = match self.writer.as_mut() {
            Some(w) => w,
            None => return Err(SessionError::AlreadyClosed),
        };

        if let Err(cause) = writer.write_record(record) {
            self.failed = true;
            return Err(SessionError::Write {
                segment_index: self.segment_index,
                cause,
            });
        }

        let estimated_bytes = self.estimator.record_written();
        if !self
            .policy
            .should_rotate(estimated_bytes, self.estimator.records_in_segment())
        {
            return Ok(None);
        }

        self.rotate().map(Some)
    }

    /// Close the current segment's writer and open the next one.
    fn rotate(&mut self) -> Result<SegmentSummary, SessionError> {
        let old = match self.writer.take() {
            Some(w) => w,
            None => return Err(SessionError::AlreadyClosed),
        };
        let records = self.estimator.records_in_segment();

        let flushed_bytes = match old.close() {
            Ok(bytes) => bytes,
            Err(cause) => {
                self.failed = true;
                return Err(SessionError::Close {
                    segment_index: self.segment_index,
                    cause,
                });
            }
        };

        // Observed real output size corrects estimator drift for later segments
        self.estimator.recalibrate(flushed_bytes, records);

        let summary = SegmentSummary {
            segment_index: self.segment_index,
            records,
            flushed_bytes,
        };

        let next = self.segment_index + 1;
        log::info!(
            "rotating: segment {} closed with {} records ({} bytes flushed), opening segment {}",
            summary.segment_index,
            summary.records,
            summary.flushed_bytes,
            next
        );

        match (self.factory)(next) {
            Ok(writer) => {
                self.writer = Some(writer);
                self.segment_index = next;
                self.estimator.reset_segment();
                Ok(summary)
            }
            Err(cause) => {
                self.failed = true;
                Err(SessionError::OpenSegment {
                    segment_index: next,
                    cause,
                })
            }
        }
    }

    /// Close the session, finalizing the last segment.
    ///
    /// Idempotent: the underlying writer is closed at most once, and calling
    /// `close` again returns `Ok(None)`. Safe to call after a failed write.
    pub fn close(&mut self) -> Result<Option<SegmentSummary>, SessionError> {
        let writer = match self.writer.take() {
            Some(w) => w,
            None => return Ok(None),
        };
        let records = self.estimator.records_in_segment();

        let flushed_bytes = writer.close().map_err(|cause| {
            self.failed = true;
            SessionError::Close {
                segment_index: self.segment_index,
                cause,
            }
        })?;

        Ok(Some(SegmentSummary {
            segment_index: self.segment_index,
            records,
            flushed_bytes,
        }))
    }

    pub fn segment_index(&self) -> u64 {
        self.segment_index
    }

    pub fn records_in_segment(&self) -> u64 {
        self.estimator.records_in_segment()
    }

    pub fn bytes_per_record(&self) -> f64 {
        self.estimator.bytes_per_record()
    }
}

impl Drop for WriteSession {
    /// Safety net for aborted tasks: the underlying writer is released even
    /// when the owner never called `close`. Errors on this path can only be
    /// logged; call `close` explicitly to observe them.
    fn drop(&mut self) {
        if self.writer.is_some() {
            log::warn!(
                "write session dropped without close; closing segment {}",
                self.segment_index
            );
            if let Err(e) = self.close() {
                log::error!("closing dropped write session failed: {e}");
            }
        }
    }
}
