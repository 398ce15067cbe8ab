use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rollsink::config::RotationConfig;
use rollsink::record::Record;
use rollsink::rotate::{SessionError, WriteSession};
use rollsink::writer::{RecordWriter, WriterFactory};
use serde_json::json;

/// Shared view of everything the mock writers saw, keyed by segment index.
#[derive(Default)]
struct SinkLog {
    records_per_segment: HashMap<u64, Vec<i64>>,
    closes_per_segment: HashMap<u64, u32>,
    total_writes: u64,
}

struct MockWriter {
    segment_index: u64,
    records: u64,
    log: Arc<Mutex<SinkLog>>,
    /// Global write number (across segments) that fails, if any
    fail_write_on: Option<u64>,
    fail_close: bool,
    /// Byte count reported per record on close
    close_bytes_per_record: u64,
}

impl RecordWriter for MockWriter {
    fn write_record(&mut self, record: Record) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        if Some(log.total_writes) == self.fail_write_on {
            anyhow::bail!("injected write failure");
        }
        log.total_writes += 1;
        log.records_per_segment
            .entry(self.segment_index)
            .or_default()
            .push(record.get_i64("id").unwrap_or(-1));
        self.records += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> anyhow::Result<u64> {
        let mut log = self.log.lock().unwrap();
        *log.closes_per_segment.entry(self.segment_index).or_default() += 1;
        if self.fail_close {
            anyhow::bail!("injected close failure");
        }
        Ok(self.records * self.close_bytes_per_record)
    }
}

struct MockOptions {
    fail_write_on: Option<u64>,
    fail_close: bool,
    close_bytes_per_record: u64,
    /// Factory refuses to open this segment index, if set
    fail_open_segment: Option<u64>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            fail_write_on: None,
            fail_close: false,
            close_bytes_per_record: 100,
            fail_open_segment: None,
        }
    }
}

fn mock_factory(log: Arc<Mutex<SinkLog>>, options: MockOptions) -> WriterFactory {
    Box::new(move |segment_index| {
        if Some(segment_index) == options.fail_open_segment {
            anyhow::bail!("injected factory failure");
        }
        Ok(Box::new(MockWriter {
            segment_index,
            records: 0,
            log: log.clone(),
            fail_write_on: options.fail_write_on,
            fail_close: options.fail_close,
            close_bytes_per_record: options.close_bytes_per_record,
        }))
    })
}

fn rotation_config(target_bytes: u64, estimate: f64) -> RotationConfig {
    RotationConfig {
        target_segment_bytes: target_bytes,
        bytes_per_record_estimate: estimate,
        min_records_per_segment: 1,
        max_records_per_segment: None,
    }
}

fn record(id: i64) -> Record {
    Record::from_value(json!({ "id": id })).unwrap()
}

#[test]
fn eleventh_write_triggers_first_rotation() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let mut session = WriteSession::open(
        &rotation_config(1000, 100.0),
        mock_factory(log.clone(), MockOptions::default()),
    )
    .unwrap();

    for i in 0..10 {
        assert!(session.write(record(i)).unwrap().is_none());
    }
    // 11 * 100 = 1100 > 1000
    let summary = session.write(record(10)).unwrap().expect("rotation");
    assert_eq!(summary.segment_index, 0);
    assert_eq!(summary.records, 11);
    assert_eq!(session.segment_index(), 1);
    assert_eq!(session.records_in_segment(), 0);
}

#[test]
fn rotation_count_matches_fixed_estimate() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let mut session = WriteSession::open(
        &rotation_config(1000, 100.0),
        mock_factory(log.clone(), MockOptions::default()),
    )
    .unwrap();

    let mut rotations = 0;
    for i in 0..55 {
        if session.write(record(i)).unwrap().is_some() {
            rotations += 1;
        }
    }
    // floor(55 * 100 / 1000) = 5, and the per-segment sample of 11 records is
    // too small to recalibrate the estimate away
    assert_eq!(rotations, 5);

    let log = log.lock().unwrap();
    for segment in 0..5 {
        assert_eq!(log.closes_per_segment[&segment], 1);
        assert_eq!(log.records_per_segment[&segment].len(), 11);
    }
}

#[test]
fn threshold_record_lands_in_old_segment() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let mut session = WriteSession::open(
        &rotation_config(1000, 100.0),
        mock_factory(log.clone(), MockOptions::default()),
    )
    .unwrap();

    for i in 0..12 {
        session.write(record(i)).unwrap();
    }
    session.close().unwrap();

    let log = log.lock().unwrap();
    // Record 10 crossed the threshold and still belongs to segment 0
    assert_eq!(log.records_per_segment[&0], (0..=10).collect::<Vec<_>>());
    assert_eq!(log.records_per_segment[&1], vec![11]);
}

#[test]
fn close_is_idempotent() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let mut session = WriteSession::open(
        &rotation_config(1000, 100.0),
        mock_factory(log.clone(), MockOptions::default()),
    )
    .unwrap();

    session.write(record(0)).unwrap();
    let first = session.close().unwrap();
    assert_eq!(first.unwrap().records, 1);
    let second = session.close().unwrap();
    assert!(second.is_none());
    assert_eq!(log.lock().unwrap().closes_per_segment[&0], 1);
}

#[test]
fn write_after_close_fails() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let mut session = WriteSession::open(
        &rotation_config(1000, 100.0),
        mock_factory(log, MockOptions::default()),
    )
    .unwrap();

    session.close().unwrap();
    assert!(matches!(
        session.write(record(0)),
        Err(SessionError::AlreadyClosed)
    ));
}

#[test]
fn zero_target_disables_rotation() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let mut session = WriteSession::open(
        &rotation_config(0, 100.0),
        mock_factory(log.clone(), MockOptions::default()),
    )
    .unwrap();

    for i in 0..10_000 {
        assert!(session.write(record(i)).unwrap().is_none());
    }
    assert_eq!(session.segment_index(), 0);
    assert_eq!(session.records_in_segment(), 10_000);
}

#[test]
fn max_records_cap_rotates_without_size_pressure() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let config = RotationConfig {
        target_segment_bytes: 0,
        bytes_per_record_estimate: 1.0,
        min_records_per_segment: 1,
        max_records_per_segment: Some(100),
    };
    let mut session =
        WriteSession::open(&config, mock_factory(log.clone(), MockOptions::default())).unwrap();

    let mut rotations = 0;
    for i in 0..250 {
        if session.write(record(i)).unwrap().is_some() {
            rotations += 1;
        }
    }
    assert_eq!(rotations, 2);
    assert_eq!(log.lock().unwrap().records_per_segment[&0].len(), 100);
}

#[test]
fn failed_write_is_terminal_and_never_rotates() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let options = MockOptions {
        fail_write_on: Some(5),
        ..MockOptions::default()
    };
    // Estimate so large that any successful write would rotate
    let mut session = WriteSession::open(
        &rotation_config(1, 1_000_000.0),
        mock_factory(log.clone(), options),
    )
    .unwrap();

    // min_records guard does not apply here: every write rotates immediately
    for i in 0..5 {
        session.write(record(i)).unwrap();
    }
    let err = session.write(record(5)).unwrap_err();
    assert!(matches!(err, SessionError::Write { segment_index: 5, .. }));

    // Terminal: further writes fail fast
    assert!(matches!(
        session.write(record(6)),
        Err(SessionError::AlreadyClosed)
    ));

    // Close after failure still releases the underlying writer exactly once
    session.close().unwrap();
    let log = log.lock().unwrap();
    assert_eq!(log.closes_per_segment[&5], 1);
}

#[test]
fn factory_failure_after_rotation_is_fatal() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let options = MockOptions {
        fail_open_segment: Some(1),
        ..MockOptions::default()
    };
    let mut session = WriteSession::open(
        &rotation_config(1000, 100.0),
        mock_factory(log.clone(), options),
    )
    .unwrap();

    for i in 0..10 {
        session.write(record(i)).unwrap();
    }
    let err = session.write(record(10)).unwrap_err();
    assert!(matches!(err, SessionError::OpenSegment { segment_index: 1, .. }));

    // The old segment was already closed; nothing is left to close
    assert_eq!(log.lock().unwrap().closes_per_segment[&0], 1);
    assert!(session.close().unwrap().is_none());
    assert!(matches!(
        session.write(record(11)),
        Err(SessionError::AlreadyClosed)
    ));
}

#[test]
fn close_failure_is_surfaced() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let options = MockOptions {
        fail_close: true,
        ..MockOptions::default()
    };
    let mut session = WriteSession::open(
        &rotation_config(1000, 100.0),
        mock_factory(log, options),
    )
    .unwrap();

    session.write(record(0)).unwrap();
    let err = session.close().unwrap_err();
    assert!(matches!(err, SessionError::Close { segment_index: 0, .. }));
}

#[test]
fn rotation_recalibrates_from_flushed_bytes() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    // Segments report 200 bytes per record on close, double the seed estimate
    let options = MockOptions {
        close_bytes_per_record: 200,
        ..MockOptions::default()
    };
    let mut session = WriteSession::open(
        &rotation_config(10_000, 100.0),
        mock_factory(log, options),
    )
    .unwrap();

    // 101 * 100 = 10100 > 10000: first rotation carries a large enough sample
    for i in 0..101 {
        session.write(record(i)).unwrap();
    }
    assert_eq!(session.segment_index(), 1);
    assert_eq!(session.bytes_per_record(), 150.0);
}

#[test]
fn dropped_session_releases_its_writer() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    {
        let mut session = WriteSession::open(
            &rotation_config(1000, 100.0),
            mock_factory(log.clone(), MockOptions::default()),
        )
        .unwrap();
        session.write(record(0)).unwrap();
    }
    assert_eq!(log.lock().unwrap().closes_per_segment[&0], 1);
}
