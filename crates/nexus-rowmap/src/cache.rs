//! Mapping table cache.
//!
//! Tables are built on first use of a record type and kept for the lifetime
//! of the cache; nothing is evicted or invalidated. The lookup and the
//! build-then-insert step share one lock, which is released before any row
//! is scanned.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::{CollisionPolicy, MapperConfig};
use crate::error::ScanResult;
use crate::mapping::MappingTable;
use crate::record::{Record, RecordType};

/// Statistics for mapping cache operations.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Total number of lookups.
    accesses: AtomicU64,
    /// Lookups served from the cache.
    hits: AtomicU64,
    /// Lookups that had to build a table.
    misses: AtomicU64,
    /// Tables built.
    builds: AtomicU64,
    /// Tables registered by hand.
    registrations: AtomicU64,
}

impl CacheStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn record_access(&self) {
        self.accesses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns total lookups.
    pub fn accesses(&self) -> u64 {
        self.accesses.load(Ordering::Relaxed)
    }

    /// Returns cache hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns cache misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the number of tables built.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Returns the number of tables registered by hand.
    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    /// Returns the hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let accesses = self.accesses();
        if accesses == 0 {
            0.0
        } else {
            self.hits() as f64 / accesses as f64
        }
    }
}

/// Record type to mapping table cache.
///
/// Construct one per process (or per subsystem) and share it by reference or
/// through `Arc` between [`Mapper`](crate::Mapper)s.
#[derive(Debug)]
pub struct MappingCache {
    tables: Mutex<HashMap<TypeId, Arc<MappingTable>>>,
    collision: CollisionPolicy,
    record_stats: bool,
    stats: CacheStats,
}

impl Default for MappingCache {
    fn default() -> Self {
        Self::new(&MapperConfig::default())
    }
}

impl MappingCache {
    /// Creates an empty cache.
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            collision: config.collision,
            record_stats: config.record_stats,
            stats: CacheStats::new(),
        }
    }

    /// Collision policy used when building tables.
    pub fn collision_policy(&self) -> CollisionPolicy {
        self.collision
    }

    /// Returns true if the cache collects statistics.
    pub fn records_stats(&self) -> bool {
        self.record_stats
    }

    /// Returns the table of a record type, building it on first use.
    pub fn get_or_build(&self, record: &'static RecordType) -> ScanResult<Arc<MappingTable>> {
        if self.record_stats {
            self.stats.record_access();
        }

        let mut tables = self.tables.lock();
        if let Some(table) = tables.get(&record.type_id()) {
            if self.record_stats {
                self.stats.record_hit();
            }
            trace!(record = record.name(), "mapping cache hit");
            return Ok(Arc::clone(table));
        }

        if self.record_stats {
            self.stats.record_miss();
        }
        let table = Arc::new(MappingTable::build(record, self.collision)?);
        tables.insert(record.type_id(), Arc::clone(&table));
        if self.record_stats {
            self.stats.record_build();
        }
        Ok(table)
    }

    /// Registers a hand-built table for `T`.
    ///
    /// Returns false, leaving the cache unchanged, if `T` already has a table.
    /// Fails with [`ScanError::UnresolvedFieldPath`] if a path of the table
    /// does not lead to a single-column field of `T`.
    pub fn register<T: Record>(&self, table: MappingTable) -> ScanResult<bool> {
        let record = T::describe();
        table.validate(record)?;

        let mut tables = self.tables.lock();
        if tables.contains_key(&record.type_id()) {
            return Ok(false);
        }
        debug!(
            record = record.name(),
            columns = table.len(),
            "registered mapping table"
        );
        tables.insert(record.type_id(), Arc::new(table));
        if self.record_stats {
            self.stats.record_registration();
        }
        Ok(true)
    }

    /// Returns the cached table of `T`, if any.
    pub fn get<T: Record>(&self) -> Option<Arc<MappingTable>> {
        self.tables.lock().get(&TypeId::of::<T>()).cloned()
    }

    /// Returns true if `T` has a table.
    pub fn contains<T: Record>(&self) -> bool {
        self.tables.lock().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.lock().len()
    }

    /// Returns true if no table is cached.
    pub fn is_empty(&self) -> bool {
        self.tables.lock().is_empty()
    }

    /// Cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
