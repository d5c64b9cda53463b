//! Column name to field path resolution.
//!
//! A [`MappingTable`] is built by walking a [`RecordType`] recursively:
//! nested record fields are flattened into the parent's column namespace,
//! collections of records and non-exported fields are skipped, every other
//! field is a leaf mapped under its column name.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::config::CollisionPolicy;
use crate::error::{ScanError, ScanResult};
use crate::record::RecordType;
use crate::shape::Shape;

/// Field indices leading from a record root to a leaf field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<usize>);

impl FieldPath {
    /// Creates a path from field indices.
    ///
    /// Returns `None` for an empty list.
    pub fn new(indices: Vec<usize>) -> Option<Self> {
        if indices.is_empty() {
            None
        } else {
            Some(Self(indices))
        }
    }

    /// Path of a top-level field.
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    /// Path of field `index` inside the record at this path.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Self(indices)
    }

    /// The field indices.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", index)?;
        }
        Ok(())
    }
}

/// Column name to field path index for one record type.
#[derive(Debug, Clone)]
pub struct MappingTable {
    record: &'static str,
    columns: HashMap<String, FieldPath>,
}

impl MappingTable {
    /// Creates an empty table for a record type.
    ///
    /// Used to register hand-built tables with
    /// [`MappingCache::register`](crate::MappingCache::register).
    pub fn new(record: &'static RecordType) -> Self {
        Self {
            record: record.name(),
            columns: HashMap::new(),
        }
    }

    /// Builds the table of a record type.
    pub fn build(record: &'static RecordType, policy: CollisionPolicy) -> ScanResult<Self> {
        let mut table = Self::new(record);
        table.map_fields(record, None, policy)?;
        debug!(
            record = record.name(),
            columns = table.columns.len(),
            "built mapping table"
        );
        Ok(table)
    }

    fn map_fields(
        &mut self,
        record: &'static RecordType,
        parent: Option<&FieldPath>,
        policy: CollisionPolicy,
    ) -> ScanResult<()> {
        for (index, field) in record.fields().iter().enumerate() {
            if !field.is_exported() {
                continue;
            }

            let path = match parent {
                Some(parent) => parent.child(index),
                None => FieldPath::root(index),
            };

            let shape = field.shape().base();
            if let Shape::Record(nested) = shape {
                self.map_fields(nested, Some(&path), policy)?;
                continue;
            }
            if shape.is_record_collection() {
                trace!(record = record.name(), field = field.name(), "skipping record collection");
                continue;
            }

            let column = field.column_name().into_owned();
            self.insert_with(column, path, policy)?;
        }
        Ok(())
    }

    fn insert_with(
        &mut self,
        column: String,
        path: FieldPath,
        policy: CollisionPolicy,
    ) -> ScanResult<()> {
        if let Some(previous) = self.columns.get(&column) {
            match policy {
                CollisionPolicy::Overwrite => {
                    debug!(
                        record = self.record,
                        column = %column,
                        previous = %previous,
                        path = %path,
                        "column remapped"
                    );
                }
                CollisionPolicy::Reject => {
                    return Err(ScanError::DuplicateColumn {
                        record: self.record,
                        column,
                    });
                }
            }
        }
        self.columns.insert(column, path);
        Ok(())
    }

    /// Maps `column` to `path`, replacing any previous mapping.
    pub fn insert(&mut self, column: impl Into<String>, path: FieldPath) -> Option<FieldPath> {
        self.columns.insert(column.into(), path)
    }

    /// Name of the record type.
    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Path for a column.
    pub fn get(&self, column: &str) -> Option<&FieldPath> {
        self.columns.get(column)
    }

    /// Resolves every column of a result set, in column order.
    ///
    /// Fails on the first column without a field.
    pub fn resolve(&self, columns: &[String]) -> ScanResult<Vec<&FieldPath>> {
        columns
            .iter()
            .map(|column| {
                self.columns
                    .get(column)
                    .ok_or_else(|| ScanError::UnmappedColumn(column.clone()))
            })
            .collect()
    }

    /// Checks that every path of the table leads, through record fields of
    /// `record`, to a field that takes a single column.
    ///
    /// Tables built by [`build`](Self::build) always pass.
    pub fn validate(&self, record: &'static RecordType) -> ScanResult<()> {
        match self.columns.values().find(|path| !leads_to_leaf(record, path)) {
            Some(path) => Err(ScanError::UnresolvedFieldPath {
                record: record.name(),
                path: path.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Mapped column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of mapped columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if no column is mapped.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn leads_to_leaf(mut record: &'static RecordType, path: &FieldPath) -> bool {
    let Some((last, parents)) = path.indices().split_last() else {
        return false;
    };
    for &index in parents {
        match record.fields().get(index).map(|field| field.shape().base()) {
            Some(Shape::Record(nested)) => record = nested,
            _ => return false,
        }
    }
    record
        .fields()
        .get(*last)
        .is_some_and(|field| !matches!(field.shape().base(), Shape::Record(_)))
}
