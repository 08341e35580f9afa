use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chronoshift_core::{Dataset, Record, Schema, Value};

use crate::CliError;

/// Read a table CSV against its declared schema.
///
/// Every declared field must appear in the header and every header column
/// must be declared: the engine round-trips files, so an undeclared column
/// would be silently dropped on write.
pub fn read_table_csv(path: &Path, schema: &Schema) -> Result<Dataset, CliError> {
    let file = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    for column in headers.iter() {
        if schema.field(column).is_none() {
            return Err(CliError::UndeclaredColumn {
                file,
                column: column.to_string(),
            });
        }
    }
    let mut positions = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let position = headers
            .iter()
            .position(|column| column == field.name)
            .ok_or_else(|| CliError::MissingColumn {
                file: file.clone(),
                column: field.name.clone(),
            })?;
        positions.push(position);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (field, &position) in schema.fields.iter().zip(&positions) {
            let raw = row.get(position).unwrap_or_default();
            let value = Value::parse(raw, field.field_type)?;
            record.insert(field.name.clone(), value);
        }
        records.push(record);
    }
    Ok(Dataset::new(schema.clone(), records))
}

/// Write a dataset as CSV with columns in declared schema order.
pub fn write_table_csv(path: &Path, dataset: &Dataset) -> Result<u64, CliError> {
    let writer = BufWriter::new(File::create(path)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    let header: Vec<&str> = dataset
        .schema
        .fields
        .iter()
        .map(|field| field.name.as_str())
        .collect();
    writer.write_record(&header)?;

    for record in &dataset.records {
        let row: Vec<String> = dataset
            .schema
            .fields
            .iter()
            .map(|field| {
                record
                    .get(&field.name)
                    .map(Value::to_csv)
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
