//! Error types for row mapping.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error surfaced by a row source.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors returned by [`Mapper::scan_one`](crate::Mapper::scan_one) and
/// [`Mapper::scan_many`](crate::Mapper::scan_many).
#[derive(Debug, Error)]
pub enum ScanError {
    /// Destination is not a mutable reference.
    #[error("destination must be a mutable reference")]
    InvalidDestination,

    /// Destination reference is null.
    #[error("destination must not be nil")]
    NilDestination,

    /// Destination type has no supported shape for this operation.
    #[error("unsupported destination type {0}")]
    UnsupportedDestinationType(&'static str),

    /// Collection element type is neither a record nor self-scanning.
    #[error("unsupported element type in {0}")]
    UnsupportedElementType(&'static str),

    /// A self-scanning destination was handed more than one column.
    #[error("self-scanning destination {target} cannot take {columns} columns")]
    MultiColumnScannableType {
        /// Destination type name.
        target: &'static str,
        /// Number of columns reported by the row source.
        columns: usize,
    },

    /// No field of the record maps to the column.
    #[error("couldn't find a field for column {0:?}")]
    UnmappedColumn(String),

    /// Two fields of a record resolve to the same column name.
    #[error("column {column:?} is mapped twice in record {record}")]
    DuplicateColumn {
        /// Record type name.
        record: &'static str,
        /// Colliding column name.
        column: String,
    },

    /// A field path does not lead to a leaf of the record.
    #[error("field path {path} does not resolve to a leaf of {record}")]
    UnresolvedFieldPath {
        /// Record type name.
        record: &'static str,
        /// Offending path.
        path: String,
    },

    /// The row source had no row to scan.
    #[error("no rows in result set")]
    NoRows,

    /// Error reported by the row source.
    #[error("fetch error: {0}")]
    Fetch(#[source] BoxError),
}

impl ScanError {
    /// Wraps a row source error.
    pub fn fetch<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ScanError::Fetch(Box::new(err))
    }

    /// Returns true if the result set was empty.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, ScanError::NoRows)
    }

    /// Returns true if the error comes from the shape of the destination
    /// rather than from the data.
    pub fn is_destination_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidDestination
                | ScanError::NilDestination
                | ScanError::UnsupportedDestinationType(_)
                | ScanError::UnsupportedElementType(_)
                | ScanError::MultiColumnScannableType { .. }
        )
    }
}

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Error raised while converting a raw column value into a destination.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// NULL assigned to a destination that cannot hold it.
    #[error("cannot assign NULL to {target}")]
    UnexpectedNull {
        /// Destination type name.
        target: &'static str,
    },

    /// Value kind has no conversion to the destination.
    #[error("cannot convert {from} to {target}")]
    Incompatible {
        /// Source value kind.
        from: &'static str,
        /// Destination type name.
        target: &'static str,
    },

    /// Numeric value does not fit the destination.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Rendered source value.
        value: String,
        /// Destination type name.
        target: &'static str,
    },

    /// Text value does not parse as the destination.
    #[error("cannot parse {value:?} as {target}")]
    Parse {
        /// Source text.
        value: String,
        /// Destination type name.
        target: &'static str,
    },
}

/// Result type for value conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("socket reset")]
    struct SocketReset;

    #[test]
    fn test_fetch_keeps_source() {
        let err = ScanError::fetch(SocketReset);
        assert_eq!(err.to_string(), "fetch error: socket reset");
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<SocketReset>().is_some());
    }

    #[test]
    fn test_error_categories() {
        assert!(ScanError::NoRows.is_no_rows());
        assert!(!ScanError::NoRows.is_destination_error());
        assert!(ScanError::NilDestination.is_destination_error());
        assert!(ScanError::MultiColumnScannableType {
            target: "i64",
            columns: 2
        }
        .is_destination_error());
        assert!(!ScanError::UnmappedColumn("x".into()).is_destination_error());
    }

    #[test]
    fn test_unmapped_column_message() {
        let err = ScanError::UnmappedColumn("weight".into());
        assert_eq!(err.to_string(), "couldn't find a field for column \"weight\"");
    }
}
