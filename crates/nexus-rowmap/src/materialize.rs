//! Binding of result columns to the leaves of a record.

use crate::error::{ScanError, ScanResult};
use crate::mapping::FieldPath;
use crate::record::Record;
use crate::rows::Bindings;
use crate::shape::{leaf_scanner, record_mut};
use crate::value::Scanner;

/// Walks `path` from `root` to its leaf.
///
/// Every segment but the last must be a record field; unset optional records
/// along the way are allocated.
fn walk<'r>(root: &'r mut dyn Record, path: &FieldPath) -> Option<&'r mut dyn Scanner> {
    let (last, parents) = path.indices().split_last()?;
    let mut record = root;
    for &index in parents {
        record = record_mut(record.field_mut(index)?)?;
    }
    leaf_scanner(record.field_mut(*last)?)
}

/// Columns of one row bound to the leaves of a record, in column order.
///
/// Each column walks its path once, when the row source binds it; optional
/// intermediate records are allocated at that point.
pub(crate) struct RecordBindings<'r, 'p> {
    root: &'r mut dyn Record,
    paths: &'p [&'p FieldPath],
    unresolved: Option<usize>,
}

impl<'r, 'p> RecordBindings<'r, 'p> {
    pub(crate) fn new(root: &'r mut dyn Record, paths: &'p [&'p FieldPath]) -> Self {
        Self {
            root,
            paths,
            unresolved: None,
        }
    }

    /// Consumes the bindings after a scan, failing if a column could not be
    /// bound to a leaf.
    pub(crate) fn finish(self) -> ScanResult<()> {
        match self.unresolved.and_then(|column| self.paths.get(column)) {
            Some(path) => Err(ScanError::UnresolvedFieldPath {
                record: self.root.record_type().name(),
                path: path.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Bindings for RecordBindings<'_, '_> {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn bind(&mut self, column: usize) -> Option<&mut dyn Scanner> {
        let path = self.paths.get(column)?;
        let scanner = walk(&mut *self.root, path);
        if scanner.is_none() {
            self.unresolved.get_or_insert(column);
        }
        scanner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        pub struct Leafy {
            pub exported: bool,
            pub note: Option<String>,
        }
    }

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        pub struct Branch {
            pub name: String,
            pub leaf: Option<Leafy>,
            pub fixed: Leafy,
        }
    }

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        pub struct Root {
            pub branch: Option<Branch>,
        }
    }

    #[test]
    fn test_walk_allocates_optional_intermediates() {
        let mut root = Root::default();
        let path = FieldPath::new(vec![0, 1, 0]).unwrap();
        walk(&mut root, &path).unwrap().scan(&Value::Boolean(true)).unwrap();

        let branch = root.branch.as_ref().unwrap();
        assert!(branch.leaf.as_ref().unwrap().exported);
        assert_eq!(branch.name, "");
    }

    #[test]
    fn test_walk_keeps_existing_values() {
        let mut root = Root {
            branch: Some(Branch {
                name: "kept".into(),
                ..Default::default()
            }),
        };
        let path = FieldPath::new(vec![0, 2, 1]).unwrap();
        walk(&mut root, &path).unwrap().scan(&Value::from("n")).unwrap();

        let branch = root.branch.unwrap();
        assert_eq!(branch.name, "kept");
        assert_eq!(branch.fixed.note.as_deref(), Some("n"));
        assert!(branch.leaf.is_none());
    }

    #[test]
    fn test_walk_rejects_bad_paths() {
        let mut root = Root::default();
        // Ends on a record.
        assert!(walk(&mut root, &FieldPath::root(0)).is_none());
        // Descends through a leaf.
        assert!(walk(&mut root, &FieldPath::new(vec![0, 0, 0]).unwrap()).is_none());
        // Out of range.
        assert!(walk(&mut root, &FieldPath::root(4)).is_none());
    }

    #[test]
    fn test_bindings_follow_column_order() {
        let mut branch = Branch::default();
        let name = FieldPath::root(0);
        let note = FieldPath::new(vec![1, 1]).unwrap();
        let paths = [&note, &name];
        let mut bindings = RecordBindings::new(&mut branch, &paths);
        assert_eq!(bindings.len(), 2);

        bindings.bind(0).unwrap().scan(&Value::from("memo")).unwrap();
        bindings.bind(1).unwrap().scan(&Value::from("oak")).unwrap();
        assert!(bindings.bind(2).is_none());
        bindings.finish().unwrap();

        assert_eq!(branch.name, "oak");
        assert_eq!(branch.leaf.unwrap().note.as_deref(), Some("memo"));
    }

    #[test]
    fn test_bind_allocates_only_bound_paths() {
        let mut branch = Branch::default();
        let name = FieldPath::root(0);
        let note = FieldPath::new(vec![1, 1]).unwrap();
        let paths = [&name, &note];
        let mut bindings = RecordBindings::new(&mut branch, &paths);
        bindings.bind(0).unwrap().scan(&Value::from("elm")).unwrap();
        bindings.finish().unwrap();

        assert_eq!(branch.name, "elm");
        assert!(branch.leaf.is_none());
    }

    #[test]
    fn test_finish_reports_unresolved_path() {
        let mut branch = Branch::default();
        let name = FieldPath::root(0);
        let bad = FieldPath::root(1);
        let paths = [&name, &bad];
        let mut bindings = RecordBindings::new(&mut branch, &paths);
        assert!(bindings.bind(0).is_some());
        assert!(bindings.bind(1).is_none());

        match bindings.finish() {
            Err(ScanError::UnresolvedFieldPath { record, path }) => {
                assert_eq!(record, "Branch");
                assert_eq!(path, "1");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
