use super::RecordWriter;
use crate::record::Record;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parquet segment writer.
///
/// The Arrow schema is inferred from the first buffered batch of records, so
/// the writer accepts heterogeneous pipelines without an up-front schema. All
/// later batches are projected onto that schema; fields missing from a record
/// are written as null.
pub struct ParquetWriter {
    writer: Option<ArrowWriter<File>>,
    schema: Option<Arc<Schema>>,
    buffer: Vec<Record>,
    buffer_capacity: usize,
    path: PathBuf,
    records_written: u64,
}

impl ParquetWriter {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            writer: None, // Created on first flush, once a schema exists
            schema: None,
            buffer: Vec::new(),
            buffer_capacity: 10000,
            path: path.to_path_buf(),
            records_written: 0,
        })
    }

    fn init_writer(&mut self) -> anyhow::Result<()> {
        if self.writer.is_some() || self.buffer.is_empty() {
            return Ok(());
        }

        let schema = Self::infer_schema(&self.buffer)?;
        let output_file = File::create(&self.path)?;
        let writer = ArrowWriter::try_new(output_file, schema.clone(), None)?;
        self.schema = Some(schema);
        self.writer = Some(writer);

        Ok(())
    }

    /// Infer an Arrow schema from buffered records.
    /// Field order follows first appearance; types come from the first
    /// non-null value seen for each field.
    fn infer_schema(records: &[Record]) -> anyhow::Result<Arc<Schema>> {
        let mut field_names: Vec<String> = Vec::new();
        for record in records {
            if let Some(obj) = record.as_value().as_object() {
                for name in obj.keys() {
                    if !field_names.contains(name) {
                        field_names.push(name.clone());
                    }
                }
            }
        }

        let mut fields = Vec::new();
        for name in &field_names {
            let data_type = records
                .iter()
                .find_map(|r| r.get(name))
                .map(|v| match v {
                    Value::String(_) => DataType::Utf8,
                    Value::Number(n) if n.is_i64() => DataType::Int64,
                    Value::Number(_) => DataType::Float64,
                    Value::Bool(_) => DataType::Boolean,
                    _ => DataType::Utf8,
                })
                .unwrap_or(DataType::Utf8);

            fields.push(Field::new(name.as_str(), data_type, true));
        }

        Ok(Arc::new(Schema::new(fields)))
    }

    /// Flush buffered records to the underlying ArrowWriter
    fn flush(&mut self) -> anyhow::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.init_writer()?;

        let schema = self.schema.as_ref().unwrap().clone();
        let batch = Self::records_to_batch(&self.buffer, &schema)?;
        self.records_written += self.buffer.len() as u64;
        self.writer.as_mut().unwrap().write(&batch)?;
        self.buffer.clear();

        Ok(())
    }

    fn records_to_batch(records: &[Record], schema: &Arc<Schema>) -> anyhow::Result<RecordBatch> {
        if records.is_empty() {
            return Err(anyhow::anyhow!("Cannot create batch from empty buffer"));
        }

        let mut arrays: Vec<Arc<dyn Array>> = Vec::new();

        for field in schema.fields() {
            let name = field.name();

            let array: Arc<dyn Array> = match field.data_type() {
                DataType::Utf8 => {
                    let mut builder = StringBuilder::new();
                    for record in records {
                        match record.get(name) {
                            Some(Value::String(s)) => builder.append_value(s),
                            _ => builder.append_null(),
                        }
                    }
                    Arc::new(builder.finish())
                }
                DataType::Int64 => {
                    let mut builder = Int64Builder::new();
                    for record in records {
                        match record.get(name) {
                            Some(Value::Number(n)) if n.is_i64() => {
                                builder.append_value(n.as_i64().unwrap())
                            }
                            _ => builder.append_null(),
                        }
                    }
                    Arc::new(builder.finish())
                }
                DataType::Float64 => {
                    let mut builder = Float64Builder::new();
                    for record in records {
                        match record.get(name).and_then(Value::as_f64) {
                            Some(x) => builder.append_value(x),
                            None => builder.append_null(),
                        }
                    }
                    Arc::new(builder.finish())
                }
                DataType::Boolean => {
                    let mut builder = BooleanBuilder::new();
                    for record in records {
                        match record.get(name) {
                            Some(Value::Bool(x)) => builder.append_value(*x),
                            _ => builder.append_null(),
                        }
                    }
                    Arc::new(builder.finish())
                }
                other => {
                    return Err(anyhow::anyhow!("Unsupported data type: {:?}", other));
                }
            };

            arrays.push(array);
        }

        Ok(RecordBatch::try_new(Arc::clone(schema), arrays)?)
    }
}

impl RecordWriter for ParquetWriter {
    fn write_record(&mut self, record: Record) -> anyhow::Result<()> {
        self.buffer.push(record);

        if self.buffer.len() >= self.buffer_capacity {
            self.flush()?;
        }

        Ok(())
    }

    fn close(mut self: Box<Self>) -> anyhow::Result<u64> {
        self.flush()?;

        match self.writer {
            Some(writer) => {
                writer.close()?;
                // The footer is only written on close, so measure afterwards
                Ok(std::fs::metadata(&self.path)?.len())
            }
            // No record ever arrived; the file was never created
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_schema_from_first_values() {
        let records: Vec<Record> = vec![
            Record::from_value(json!({"id": 1, "name": "a"})).unwrap(),
            Record::from_value(json!({"id": 2, "score": 0.5})).unwrap(),
        ];
        let schema = ParquetWriter::infer_schema(&records).unwrap();
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).name(), "name");
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).name(), "score");
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);
    }

    #[test]
    fn close_reports_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.parquet");
        let mut w: Box<dyn RecordWriter> = Box::new(ParquetWriter::new(&path).unwrap());

        for i in 0..100 {
            let r = Record::from_value(json!({"id": i, "name": format!("row-{i}")})).unwrap();
            w.write_record(r).unwrap();
        }
        let bytes = w.close().unwrap();

        assert_eq!(bytes, std::fs::metadata(&path).unwrap().len());
        assert!(bytes > 0);
    }

    #[test]
    fn empty_segment_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.parquet");
        let w: Box<dyn RecordWriter> = Box::new(ParquetWriter::new(&path).unwrap());
        assert_eq!(w.close().unwrap(), 0);
        assert!(!path.exists());
    }
}
