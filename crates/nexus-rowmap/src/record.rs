//! Record type descriptors.
//!
//! A record type is described once, statically, by a [`RecordType`]: its
//! name, its `TypeId` and the ordered list of its declared fields. The
//! [`record!`](crate::record!) macro declares a struct together with its
//! descriptor; [`Record`] can also be implemented by hand.
//!
//! # Example
//!
//! ```rust
//! use nexus_rowmap::record;
//!
//! record! {
//!     #[derive(Debug, Default, Clone, PartialEq)]
//!     pub struct Account {
//!         pub id: i64,
//!         #[column = "display_name"]
//!         pub name: String,
//!         pub owner: Owner,
//!         secret: String,
//!     }
//! }
//!
//! record! {
//!     #[derive(Debug, Default, Clone, PartialEq)]
//!     pub struct Owner {
//!         pub email: Option<String>,
//!     }
//! }
//! ```

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

use crate::shape::{Scan, Shape};

/// A declared field of a record type.
pub struct FieldDef {
    name: &'static str,
    column: Option<&'static str>,
    visibility: &'static str,
    shape: fn() -> Shape,
}

impl FieldDef {
    /// Describes a field.
    ///
    /// `visibility` is the field's visibility as written in the declaration;
    /// only `"pub"` fields are accessible to the mapper.
    pub const fn new(
        name: &'static str,
        column: Option<&'static str>,
        visibility: &'static str,
        shape: fn() -> Shape,
    ) -> Self {
        Self {
            name,
            column,
            visibility,
            shape,
        }
    }

    /// Field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Explicit column annotation, if any.
    pub fn column(&self) -> Option<&'static str> {
        self.column
    }

    /// Returns true if the field is reachable from outside its module.
    pub fn is_exported(&self) -> bool {
        self.visibility == "pub"
    }

    /// Declared shape of the field.
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }

    /// Column the field is scanned from: the annotation, or the lowercased
    /// field name.
    ///
    /// A raw identifier such as `r#type` maps to the column `type`.
    pub fn column_name(&self) -> Cow<'static, str> {
        match self.column {
            Some(column) => Cow::Borrowed(column),
            None => {
                let name = self.name.strip_prefix("r#").unwrap_or(self.name);
                Cow::Owned(name.to_lowercase())
            }
        }
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("exported", &self.is_exported())
            .field("shape", &self.shape())
            .finish()
    }
}

/// Static descriptor of a record type.
pub struct RecordType {
    name: &'static str,
    type_id: fn() -> TypeId,
    fields: &'static [FieldDef],
}

impl RecordType {
    /// Describes a record type.
    pub const fn new(
        name: &'static str,
        type_id: fn() -> TypeId,
        fields: &'static [FieldDef],
    ) -> Self {
        Self {
            name,
            type_id,
            fields,
        }
    }

    /// Type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Identity of the described type; the mapping cache key.
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    /// Field at `index`.
    pub fn field(&self, index: usize) -> Option<&'static FieldDef> {
        self.fields.get(index)
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// A record whose fields can be addressed by index.
///
/// `field_mut(i)` must return the field described by `record_type().fields()[i]`.
pub trait Record: 'static {
    /// Descriptor of the type.
    fn describe() -> &'static RecordType
    where
        Self: Sized;

    /// Descriptor of the value's type.
    fn record_type(&self) -> &'static RecordType;

    /// Mutable access to the field at `index`.
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Scan>;
}

#[doc(hidden)]
#[macro_export]
macro_rules! __column_annotation {
    () => {
        ::std::option::Option::None
    };
    ($column:literal) => {
        ::std::option::Option::Some($column)
    };
}

/// Declares a record struct and its descriptor.
///
/// Fields keep their declared visibility; only `pub` fields are mapped.
/// A `#[column = "name"]` annotation, placed after any doc comments, overrides
/// the default column (the lowercased field name). Every field type must
/// implement [`Scan`]. Record types used inside `Option` or `Vec`, or scanned
/// with `scan_many`, also need `Default`.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[column = $column:literal])?
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn describe() -> &'static $crate::RecordType {
                static FIELDS: &[$crate::FieldDef] = &[
                    $(
                        $crate::FieldDef::new(
                            stringify!($field),
                            $crate::__column_annotation!($($column)?),
                            stringify!($field_vis),
                            <$ty as $crate::Scan>::shape,
                        ),
                    )*
                ];
                static RECORD_TYPE: $crate::RecordType = $crate::RecordType::new(
                    stringify!($name),
                    ::std::any::TypeId::of::<$name>,
                    FIELDS,
                );
                &RECORD_TYPE
            }

            fn record_type(&self) -> &'static $crate::RecordType {
                <Self as $crate::Record>::describe()
            }

            #[allow(unused_mut, unused_assignments)]
            fn field_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn $crate::Scan> {
                // Fields are numbered in declaration order, like the descriptor.
                let mut position = 0usize;
                $(
                    if index == position {
                        return ::std::option::Option::Some(&mut self.$field);
                    }
                    position += 1;
                )*
                ::std::option::Option::None
            }
        }

        impl $crate::Scan for $name {
            fn shape() -> $crate::Shape {
                $crate::Shape::Record(<Self as $crate::Record>::describe())
            }

            fn slot(&mut self) -> $crate::SlotMut<'_> {
                $crate::SlotMut::Record(self)
            }
        }

        impl<'a> $crate::IntoDestination<'a> for $name {
            type Target = $name;

            fn into_destination(self) -> $crate::ScanResult<&'a mut $name> {
                ::std::result::Result::Err($crate::ScanError::InvalidDestination)
            }
        }
    };
}
