//! Batch sources.
//!
//! Pretraining pulls fixed-size batches one at a time from a [`BatchSource`]. Each
//! call to [`BatchSource::batches`] starts a fresh pass, so the same source can
//! feed every epoch of every layer. A trailing partial batch is dropped.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::{Error, Matrix, Result};

/// Lazy iterator over batches, as returned by [`BatchSource::batches`].
pub type Batches<'a> = Box<dyn Iterator<Item = Result<Matrix>> + 'a>;

/// A restartable, finite sequence of `(batch_size, features)` batches.
pub trait BatchSource {
    /// Start a new pass over the data.
    fn batches(&self) -> Result<Batches<'_>>;
}

fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
    }
    Ok(())
}

/// Serves batches from a matrix already in memory.
#[derive(Debug, Clone)]
pub struct MemoryBatchSource {
    data: Matrix,
    batch_size: usize,
    batch_limit: Option<usize>,
}

impl MemoryBatchSource {
    pub fn new(data: Matrix, batch_size: usize) -> Result<Self> {
        check_batch_size(batch_size)?;
        Ok(Self {
            data,
            batch_size,
            batch_limit: None,
        })
    }

    /// Stop each pass after `n` batches.
    pub fn with_batch_limit(mut self, n: usize) -> Self {
        self.batch_limit = Some(n);
        self
    }

    /// Number of batches one pass yields.
    pub fn num_batches(&self) -> usize {
        let full = self.data.rows() / self.batch_size;
        self.batch_limit.map_or(full, |n| n.min(full))
    }
}

impl BatchSource for MemoryBatchSource {
    fn batches(&self) -> Result<Batches<'_>> {
        let cols = self.data.cols();
        let stride = self.batch_size * cols;
        let iter = (0..self.num_batches()).map(move |i| {
            let chunk = self.data.as_slice()[i * stride..(i + 1) * stride].to_vec();
            Matrix::from_vec(self.batch_size, cols, chunk)
        });
        Ok(Box::new(iter))
    }
}

/// Reads batches lazily from a headerless comma-separated file of numbers.
///
/// Only as many rows as needed are parsed: the file is never loaded whole.
#[derive(Debug, Clone)]
pub struct CsvBatchSource {
    path: PathBuf,
    batch_size: usize,
    row_limit: Option<usize>,
    batch_limit: Option<usize>,
}

impl CsvBatchSource {
    pub fn new<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        check_batch_size(batch_size)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            batch_size,
            row_limit: None,
            batch_limit: None,
        })
    }

    /// Never read past the first `n` rows of the file.
    pub fn with_row_limit(mut self, n: usize) -> Self {
        self.row_limit = Some(n);
        self
    }

    /// Stop each pass after `n` batches.
    pub fn with_batch_limit(mut self, n: usize) -> Self {
        self.batch_limit = Some(n);
        self
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Count the data rows in the file (one streaming pass, no parsing of fields).
    pub fn count_rows(&self) -> Result<usize> {
        let mut reader = reader_for(&self.path)?;
        let mut record = csv::ByteRecord::new();
        let mut rows = 0;
        while reader.read_byte_record(&mut record)? {
            rows += 1;
        }
        Ok(rows)
    }
}

impl BatchSource for CsvBatchSource {
    fn batches(&self) -> Result<Batches<'_>> {
        let records = reader_for(&self.path)?.into_records();
        log::debug!("opened batch source {}", self.path.display());
        Ok(Box::new(CsvBatches {
            records,
            batch_size: self.batch_size,
            rows_left: self.row_limit,
            batches_left: self.batch_limit,
            cols: None,
            row_idx: 0,
            done: false,
        }))
    }
}

fn reader_for(path: &Path) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    Ok(reader)
}

struct CsvBatches {
    records: csv::StringRecordsIntoIter<File>,
    batch_size: usize,
    rows_left: Option<usize>,
    batches_left: Option<usize>,
    cols: Option<usize>,
    row_idx: usize,
    done: bool,
}

impl CsvBatches {
    fn next_row(&mut self, buf: &mut Vec<f32>) -> Result<bool> {
        if self.rows_left == Some(0) {
            return Ok(false);
        }
        let record = match self.records.next() {
            Some(record) => record?,
            None => return Ok(false),
        };
        let row = self.row_idx;
        self.row_idx += 1;
        if let Some(n) = self.rows_left.as_mut() {
            *n -= 1;
        }

        let cols = *self.cols.get_or_insert(record.len());
        if record.len() != cols {
            return Err(Error::InvalidData(format!(
                "row {row} has {} fields, expected {cols}",
                record.len()
            )));
        }
        for (col, field) in record.iter().enumerate() {
            let value = field.parse::<f32>().map_err(|e| {
                Error::InvalidData(format!("row {row} column {col}: {field:?}: {e}"))
            })?;
            buf.push(value);
        }
        Ok(true)
    }
}

impl Iterator for CsvBatches {
    type Item = Result<Matrix>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.batches_left == Some(0) {
            return None;
        }

        let mut buf = Vec::new();
        for _ in 0..self.batch_size {
            match self.next_row(&mut buf) {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        if let Some(n) = self.batches_left.as_mut() {
            *n -= 1;
        }
        let cols = self.cols.unwrap_or(0);
        Some(Matrix::from_vec(self.batch_size, cols, buf))
    }
}
