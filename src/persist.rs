//! Writing encoded batches to disk.
//!
//! Rows are appended as headerless comma-separated values, the same format
//! [`crate::CsvBatchSource`] reads, so an encoded dataset can feed another stack.

use std::fs::OpenOptions;
use std::path::Path;

use crate::{Error, Matrix, Result};

/// Append every row of `batch` to `path`, creating the file if needed.
///
/// An empty batch writes nothing.
pub fn append_rows<P: AsRef<Path>>(batch: &Matrix, path: P) -> Result<()> {
    let path = path.as_ref();
    if batch.is_empty() {
        return Ok(());
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);

    let mut record = csv::StringRecord::with_capacity(batch.cols() * 12, batch.cols());
    for row in batch.rows_iter() {
        record.clear();
        for v in row {
            record.push_field(&v.to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    log::debug!("appended {} rows to {}", batch.rows(), path.display());
    Ok(())
}

/// Read a whole headerless numeric CSV file into a matrix.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Matrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut data = Vec::new();
    let mut rows = 0;
    let mut cols = 0;
    for record in reader.records() {
        let record = record?;
        if rows == 0 {
            cols = record.len();
        }
        for field in &record {
            let v = field
                .parse::<f32>()
                .map_err(|e| Error::InvalidData(format!("row {rows}: {field:?}: {e}")))?;
            data.push(v);
        }
        rows += 1;
    }
    Matrix::from_vec(rows, cols, data)
}
