//! Row-to-record mapping for NexusDB query results.
//!
//! This crate assigns the rows of a result set to typed records:
//!
//! - **Records**: structs declared with [`record!`] (or described by hand
//!   through [`Record`]) expose a static descriptor of their fields
//! - **Flattening**: nested record fields share the column namespace of their
//!   parent, so `{a, sub: {b}}` takes the columns `a` and `b`
//! - **Mapping cache**: the column to field-path table of each record type is
//!   built once and shared by every scan
//! - **Self-scanning leaves**: primitives and types declared with [`leaf!`]
//!   take a single column directly
//!
//! # Example
//!
//! ```rust
//! use nexus_rowmap::{record, Mapper, ResultSet, Value};
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Account {
//!         pub id: i64,
//!         #[column = "display_name"]
//!         pub name: String,
//!         pub owner: Option<Owner>,
//!     }
//! }
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Owner {
//!         pub email: String,
//!     }
//! }
//!
//! let mapper = Mapper::default();
//! let rows = ResultSet::new(["id", "display_name", "email"])
//!     .with_row([Value::from(7), Value::from("ops"), Value::from("ops@example.com")])
//!     .into_rows();
//!
//! let mut account = Account::default();
//! mapper.scan_one(&mut account, rows).unwrap();
//! assert_eq!(account.name, "ops");
//! assert_eq!(account.owner.unwrap().email, "ops@example.com");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod error;
pub mod mapper;
pub mod mapping;
mod materialize;
pub mod record;
pub mod rows;
pub mod shape;
pub mod value;

pub use cache::{CacheStats, MappingCache};
pub use config::{CollisionPolicy, MapperConfig};
pub use error::{BoxError, ConvertError, ConvertResult, ScanError, ScanResult};
pub use mapper::Mapper;
pub use mapping::{FieldPath, MappingTable};
pub use record::{FieldDef, Record, RecordType};
pub use rows::{Bindings, ResultRows, ResultSet, Rows, RowsError, SingleBinding};
pub use shape::{CollectionSlot, IntoDestination, OptionalSlot, Scan, Shape, SlotMut};
pub use value::{Scanner, Value};
