//! Scan entry points.
//!
//! A [`Mapper`] validates the destination from its static shape, picks the
//! leaf shortcut or the record's mapping table, and then drives the row source:
//!
//! ```text
//!   scan_one:  validate -> plan -> advance -> columns -> assign -> close
//!   scan_many: validate -> plan -> columns -> { advance -> assign -> append }* -> close
//! ```
//!
//! The row source is closed on every exit path.

use std::any::type_name;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::MappingCache;
use crate::config::MapperConfig;
use crate::error::{ScanError, ScanResult};
use crate::mapping::{FieldPath, MappingTable};
use crate::materialize::RecordBindings;
use crate::rows::{Rows, ScopedRows, SingleBinding};
use crate::shape::{leaf_scanner, record_mut, IntoDestination, Scan, Shape, SlotMut};

/// How a destination receives the columns of a row.
enum Plan {
    /// The destination scans the single column itself.
    Leaf,
    /// Columns are bound to record fields through the table.
    Record(Arc<MappingTable>),
}

/// Columns of the result set resolved against a plan.
enum Binding<'t> {
    Single,
    Paths(Vec<&'t FieldPath>),
}

impl<'t> Binding<'t> {
    /// Resolves `columns` for `plan`. Nothing is assigned here, so an unmapped
    /// column fails before the destination is touched.
    fn resolve(plan: &'t Plan, columns: &[String], target: &'static str) -> ScanResult<Self> {
        match plan {
            Plan::Leaf if columns.len() > 1 => Err(ScanError::MultiColumnScannableType {
                target,
                columns: columns.len(),
            }),
            Plan::Leaf => Ok(Binding::Single),
            Plan::Record(table) => table.resolve(columns).map(Binding::Paths),
        }
    }

    /// Assigns the current row into `dest`.
    fn assign<R: Rows>(
        &self,
        dest: &mut dyn Scan,
        rows: &mut ScopedRows<R>,
        target: &'static str,
    ) -> ScanResult<()> {
        match self {
            Binding::Single => {
                let scanner =
                    leaf_scanner(dest).ok_or(ScanError::UnsupportedDestinationType(target))?;
                rows.scan(&mut SingleBinding(scanner))
            }
            Binding::Paths(paths) => {
                let record =
                    record_mut(dest).ok_or(ScanError::UnsupportedDestinationType(target))?;
                let mut bindings = RecordBindings::new(record, paths);
                let scanned = rows.scan(&mut bindings);
                // An unbound leaf explains the row source's error.
                bindings.finish().and(scanned)
            }
        }
    }
}

/// Maps query result rows onto records.
///
/// A mapper owns (or shares) a [`MappingCache`]; clones of the `Arc` handed to
/// [`with_cache`](Self::with_cache) let several mappers build each table once.
///
/// # Example
///
/// ```rust
/// use nexus_rowmap::{record, Mapper, ResultSet, Value};
///
/// record! {
///     #[derive(Debug, Default)]
///     pub struct User {
///         pub id: i64,
///         pub name: String,
///     }
/// }
///
/// let mapper = Mapper::default();
/// let rows = ResultSet::new(["id", "name"])
///     .with_row([Value::from(1), Value::from("ada")])
///     .with_row([Value::from(2), Value::from("grace")])
///     .into_rows();
///
/// let mut users: Vec<User> = Vec::new();
/// mapper.scan_many(&mut users, rows).unwrap();
/// assert_eq!(users.len(), 2);
/// assert_eq!(users[1].name, "grace");
/// ```
#[derive(Debug)]
pub struct Mapper {
    config: MapperConfig,
    cache: Arc<MappingCache>,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl Mapper {
    /// Creates a mapper with its own cache.
    pub fn new(config: MapperConfig) -> Self {
        let cache = Arc::new(MappingCache::new(&config));
        Self { config, cache }
    }

    /// Creates a mapper backed by a shared cache.
    ///
    /// The configuration is taken from the cache, which keeps the settings
    /// it was created with.
    pub fn with_cache(cache: Arc<MappingCache>) -> Self {
        let config = MapperConfig::new()
            .with_collision(cache.collision_policy())
            .with_stats(cache.records_stats());
        Self { config, cache }
    }

    /// The mapping cache.
    pub fn cache(&self) -> &Arc<MappingCache> {
        &self.cache
    }

    /// The configuration.
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    fn plan(&self, shape: Shape) -> Option<ScanResult<Plan>> {
        match shape.base() {
            Shape::Leaf => Some(Ok(Plan::Leaf)),
            Shape::Record(record) => Some(self.cache.get_or_build(record).map(Plan::Record)),
            Shape::Optional(_) | Shape::Collection(_) => None,
        }
    }

    /// Scans the first row of `rows` into `dest`.
    ///
    /// `dest` is `&mut T` or `Option<&mut T>` where `T`, after unwrapping one
    /// `Option`, is a record or a self-scanning leaf. Returns
    /// [`ScanError::NoRows`] if the source has no row, leaving `dest`
    /// untouched. A result set without columns succeeds without touching
    /// `dest`. `rows` is closed before returning.
    pub fn scan_one<'a, D, R>(&self, dest: D, rows: R) -> ScanResult<()>
    where
        D: IntoDestination<'a>,
        R: Rows,
    {
        let mut rows = ScopedRows::new(rows);
        let result = self.scan_one_inner(dest, &mut rows);
        rows.finish(result)
    }

    fn scan_one_inner<'a, D, R>(&self, dest: D, rows: &mut ScopedRows<R>) -> ScanResult<()>
    where
        D: IntoDestination<'a>,
        R: Rows,
    {
        let dest = dest.into_destination()?;
        let target = type_name::<D::Target>();
        let plan = self
            .plan(<D::Target as Scan>::shape())
            .ok_or(ScanError::UnsupportedDestinationType(target))??;

        if !rows.advance()? {
            return Err(ScanError::NoRows);
        }
        let columns = rows.columns()?;
        if columns.is_empty() {
            trace!(destination = target, "result set has no columns");
            return Ok(());
        }

        let binding = Binding::resolve(&plan, &columns, target)?;
        binding.assign(dest, rows, target)
    }

    /// Scans every row of `rows`, appending one element per row to `dest`.
    ///
    /// `dest` is `&mut Vec<T>` or `Option<&mut Vec<T>>` where `T`, after
    /// unwrapping one `Option`, is a record or a self-scanning leaf. Existing
    /// elements are kept. An element is appended only once its row was
    /// assigned, so a failing row leaves the elements of the earlier rows in
    /// place. `rows` is closed before returning.
    pub fn scan_many<'a, D, R>(&self, dest: D, rows: R) -> ScanResult<()>
    where
        D: IntoDestination<'a>,
        R: Rows,
    {
        let mut rows = ScopedRows::new(rows);
        let result = self.scan_many_inner(dest, &mut rows);
        rows.finish(result)
    }

    fn scan_many_inner<'a, D, R>(&self, dest: D, rows: &mut ScopedRows<R>) -> ScanResult<()>
    where
        D: IntoDestination<'a>,
        R: Rows,
    {
        let dest = dest.into_destination()?;
        let target = type_name::<D::Target>();
        let element = match <D::Target as Scan>::shape() {
            Shape::Collection(element) => element(),
            _ => return Err(ScanError::UnsupportedDestinationType(target)),
        };
        let plan = self
            .plan(element)
            .ok_or(ScanError::UnsupportedElementType(target))??;

        let columns = rows.columns()?;
        if columns.is_empty() {
            trace!(destination = target, "result set has no columns");
            return Ok(());
        }
        let binding = Binding::resolve(&plan, &columns, target)?;

        let collection = match dest.slot() {
            SlotMut::Collection(collection) => collection,
            _ => return Err(ScanError::UnsupportedDestinationType(target)),
        };

        let mut scanned = 0usize;
        while rows.advance()? {
            collection.push_with(&mut |element: &mut dyn Scan| {
                binding.assign(element, rows, target)
            })?;
            scanned += 1;
        }
        debug!(destination = target, rows = scanned, "scanned rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollisionPolicy;
    use crate::rows::ResultSet;
    use crate::value::Value;

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        pub struct Pair {
            pub key: String,
            pub value: Option<i64>,
        }
    }

    fn pairs() -> ResultSet {
        ResultSet::new(["key", "value"])
            .with_row([Value::from("a"), Value::Integer(1)])
            .with_row([Value::from("b"), Value::Null])
    }

    #[test]
    fn test_scan_one_takes_first_row() {
        let mapper = Mapper::default();
        let mut rows = pairs().into_rows();
        let mut pair = Pair::default();
        mapper.scan_one(&mut pair, &mut rows).unwrap();

        assert_eq!(pair.key, "a");
        assert_eq!(pair.value, Some(1));
        assert_eq!(rows.scan_count(), 1);
        assert_eq!(rows.close_count(), 1);
        assert_eq!(rows.remaining(), 1);
    }

    #[test]
    fn test_scan_many_appends() {
        let mapper = Mapper::default();
        let mut got = vec![Pair {
            key: "existing".into(),
            value: None,
        }];
        mapper.scan_many(&mut got, pairs().into_rows()).unwrap();

        let keys: Vec<_> = got.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["existing", "a", "b"]);
        assert_eq!(got[2].value, None);
    }

    #[test]
    fn test_scan_one_optional_record() {
        let mapper = Mapper::default();
        let mut pair: Option<Pair> = None;
        mapper.scan_one(&mut pair, pairs().into_rows()).unwrap();
        assert_eq!(pair.unwrap().key, "a");
    }

    #[test]
    fn test_plan_rejects_nested_wrappers() {
        let mapper = Mapper::default();
        let mut nested: Option<Option<i64>> = None;
        let mut rows = ResultSet::new(["n"]).with_row([1]).into_rows();
        let err = mapper.scan_one(&mut nested, &mut rows).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedDestinationType(_)));
        assert_eq!(rows.scan_count(), 0);
        assert!(rows.is_closed());
    }

    #[test]
    fn test_with_cache_shares_tables() {
        let cache = Arc::new(MappingCache::new(&MapperConfig::strict()));
        let first = Mapper::with_cache(Arc::clone(&cache));
        let second = Mapper::with_cache(Arc::clone(&cache));
        assert_eq!(second.config().collision, CollisionPolicy::Reject);

        let mut one = Pair::default();
        first.scan_one(&mut one, pairs().into_rows()).unwrap();
        let mut many: Vec<Pair> = Vec::new();
        second.scan_many(&mut many, pairs().into_rows()).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().builds(), 1);
        assert_eq!(cache.stats().hits(), 1);
    }

    #[test]
    fn test_with_cache_reports_cache_settings() {
        let config = MapperConfig::new().with_stats(false);
        let cache = Arc::new(MappingCache::new(&config));
        let mapper = Mapper::with_cache(cache);
        assert_eq!(mapper.config(), &config);
        assert!(!mapper.config().record_stats);

        let mut pair = Pair::default();
        mapper.scan_one(&mut pair, pairs().into_rows()).unwrap();
        assert_eq!(mapper.cache().stats().accesses(), 0);
    }
}
