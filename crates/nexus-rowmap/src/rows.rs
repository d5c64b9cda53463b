//! Row sources.
//!
//! [`Rows`] is the cursor a scan reads from: fixed column names, one current
//! row at a time, and a scan operation that assigns the current row into the
//! [`Bindings`] prepared by the mapper. [`ResultSet`] is an in-memory result
//! that hands out such a cursor.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::warn;

use crate::error::{ConvertError, ScanError, ScanResult};
use crate::value::{Scanner, Value};

/// Destinations for the columns of one row, in column order.
pub trait Bindings {
    /// Number of bound columns.
    fn len(&self) -> usize;

    /// Returns true if no column is bound.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scanner bound to `column`.
    fn bind(&mut self, column: usize) -> Option<&mut dyn Scanner>;
}

/// A single self-scanning destination bound to the only column.
pub struct SingleBinding<'a>(pub &'a mut dyn Scanner);

impl Bindings for SingleBinding<'_> {
    fn len(&self) -> usize {
        1
    }

    fn bind(&mut self, column: usize) -> Option<&mut dyn Scanner> {
        if column == 0 {
            Some(&mut *self.0)
        } else {
            None
        }
    }
}

/// A cursor over query results.
pub trait Rows {
    /// Error reported by the source.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Column names of the result set.
    fn columns(&self) -> Result<Vec<String>, Self::Error>;

    /// Moves to the next row. Returns `Ok(false)` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool, Self::Error>;

    /// Assigns every column of the current row into its binding.
    fn scan(&mut self, dest: &mut dyn Bindings) -> Result<(), Self::Error>;

    /// Releases the source.
    fn close(&mut self) -> Result<(), Self::Error>;
}

impl<R: Rows + ?Sized> Rows for &mut R {
    type Error = R::Error;

    fn columns(&self) -> Result<Vec<String>, Self::Error> {
        (**self).columns()
    }

    fn advance(&mut self) -> Result<bool, Self::Error> {
        (**self).advance()
    }

    fn scan(&mut self, dest: &mut dyn Bindings) -> Result<(), Self::Error> {
        (**self).scan(dest)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}

/// Rows owned by a single scan call.
///
/// Translates source errors into [`ScanError::Fetch`] and closes the source
/// exactly once: explicitly through [`finish`](Self::finish), or on drop if
/// the scan unwound before reaching it.
pub(crate) struct ScopedRows<R: Rows> {
    rows: R,
    closed: bool,
}

impl<R: Rows> ScopedRows<R> {
    pub(crate) fn new(rows: R) -> Self {
        Self {
            rows,
            closed: false,
        }
    }

    pub(crate) fn columns(&self) -> ScanResult<Vec<String>> {
        self.rows.columns().map_err(ScanError::fetch)
    }

    pub(crate) fn advance(&mut self) -> ScanResult<bool> {
        self.rows.advance().map_err(ScanError::fetch)
    }

    pub(crate) fn scan(&mut self, dest: &mut dyn Bindings) -> ScanResult<()> {
        self.rows.scan(dest).map_err(ScanError::fetch)
    }

    fn close(&mut self) -> Result<(), R::Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.rows.close()
    }

    /// Closes the source and combines the close outcome with the scan result.
    ///
    /// A scan error takes precedence; a close error shadowed by it is logged.
    pub(crate) fn finish<T>(mut self, result: ScanResult<T>) -> ScanResult<T> {
        let closed = self.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(ScanError::fetch(err)),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "closing rows failed after scan error");
                Err(err)
            }
        }
    }
}

impl<R: Rows> Drop for ScopedRows<R> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "closing rows failed");
        }
    }
}

/// Errors of the in-memory row source.
#[derive(Debug, Error)]
pub enum RowsError {
    /// The rows were closed.
    #[error("rows are closed")]
    Closed,

    /// Scan called before `advance` or after exhaustion.
    #[error("scan called without a current row")]
    NoCurrentRow,

    /// Bindings do not match the column count.
    #[error("expected {expected} destination arguments in scan, not {got}")]
    DestinationCount {
        /// Columns in the result set.
        expected: usize,
        /// Bound destinations.
        got: usize,
    },

    /// The row has a different number of values than there are columns.
    #[error("row has {got} values for {expected} columns")]
    RowArity {
        /// Columns in the result set.
        expected: usize,
        /// Values in the row.
        got: usize,
    },

    /// No destination was bound for a column.
    #[error("no destination bound for column {0:?}")]
    Unbound(String),

    /// A value could not be converted into its destination.
    #[error("converting column {column:?}: {source}")]
    Convert {
        /// Column name.
        column: String,
        /// Conversion failure.
        #[source]
        source: ConvertError,
    },
}

/// A materialized query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names.
    pub columns: Vec<String>,
    /// Row data.
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Creates an empty result with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn with_row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_row(values);
        self
    }

    /// Appends a row.
    pub fn push_row<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns a cursor over the rows.
    pub fn into_rows(self) -> ResultRows {
        ResultRows {
            columns: self.columns,
            pending: self.rows.into(),
            current: None,
            closed: false,
            scans: 0,
            closes: 0,
        }
    }
}

/// Cursor over a [`ResultSet`].
#[derive(Debug)]
pub struct ResultRows {
    columns: Vec<String>,
    pending: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    closed: bool,
    scans: usize,
    closes: usize,
}

impl ResultRows {
    /// Number of `scan` calls made so far.
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Number of `close` calls made so far.
    pub fn close_count(&self) -> usize {
        self.closes
    }

    /// Returns true once the cursor was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Rows not yet reached by `advance`.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Rows for ResultRows {
    type Error = RowsError;

    fn columns(&self) -> Result<Vec<String>, RowsError> {
        if self.closed {
            return Err(RowsError::Closed);
        }
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> Result<bool, RowsError> {
        if self.closed {
            return Ok(false);
        }
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn scan(&mut self, dest: &mut dyn Bindings) -> Result<(), RowsError> {
        self.scans += 1;
        if self.closed {
            return Err(RowsError::Closed);
        }
        let row = self.current.as_ref().ok_or(RowsError::NoCurrentRow)?;
        if dest.len() != self.columns.len() {
            return Err(RowsError::DestinationCount {
                expected: self.columns.len(),
                got: dest.len(),
            });
        }
        if row.len() != self.columns.len() {
            return Err(RowsError::RowArity {
                expected: self.columns.len(),
                got: row.len(),
            });
        }

        for (i, (column, value)) in self.columns.iter().zip(row).enumerate() {
            let scanner = dest
                .bind(i)
                .ok_or_else(|| RowsError::Unbound(column.clone()))?;
            scanner.scan(value).map_err(|source| RowsError::Convert {
                column: column.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), RowsError> {
        self.closes += 1;
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
