//! Static shapes of scan destinations.
//!
//! Every type that can receive scanned values implements [`Scan`]. The static
//! [`Shape`] tells the resolver how to treat a field or a destination without
//! touching a value; [`Scan::slot`] exposes a live value as the matching
//! [`SlotMut`] so the materializer can descend into it.
//!
//! ```text
//!   Shape::Leaf            -> SlotMut::Leaf        (self-scanning)
//!   Shape::Record(type)    -> SlotMut::Record      (fields addressed by path)
//!   Shape::Optional(inner) -> SlotMut::Optional    (Option<T>, allocated on demand)
//!   Shape::Collection(el)  -> SlotMut::Collection  (Vec<T>, appended per row)
//! ```

use std::any::{type_name, Any};
use std::fmt;

use crate::error::{ConvertError, ConvertResult, ScanError, ScanResult};
use crate::record::{Record, RecordType};
use crate::value::{Scanner, Value};

/// Static description of how a type receives column values.
#[derive(Clone, Copy)]
pub enum Shape {
    /// Assigns itself from a single column.
    Leaf,
    /// Record whose fields are addressed by field paths.
    Record(&'static RecordType),
    /// One level of optional wrapper around the inner shape.
    Optional(fn() -> Shape),
    /// Growable collection of the element shape.
    Collection(fn() -> Shape),
}

impl Shape {
    /// Unwraps one level of optional wrapper.
    pub fn base(self) -> Shape {
        match self {
            Shape::Optional(inner) => inner(),
            other => other,
        }
    }

    /// Returns the record type if this shape is a record.
    pub fn record_type(self) -> Option<&'static RecordType> {
        match self {
            Shape::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns true for a collection whose element is, after unwrapping, a
    /// record. Such fields are never mapped.
    pub fn is_record_collection(self) -> bool {
        match self {
            Shape::Collection(element) => element().base().record_type().is_some(),
            _ => false,
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Leaf => write!(f, "Leaf"),
            Shape::Record(record) => write!(f, "Record({})", record.name()),
            Shape::Optional(inner) => write!(f, "Optional({:?})", inner()),
            Shape::Collection(element) => write!(f, "Collection({:?})", element()),
        }
    }
}

/// A type that can receive scanned values.
///
/// Implemented by the `record!` and `leaf!` macros, by `Option<T>` and
/// `Vec<T>`, and by hand for records described manually.
pub trait Scan: 'static {
    /// Static shape of the type.
    fn shape() -> Shape
    where
        Self: Sized;

    /// Exposes the value for assignment.
    fn slot(&mut self) -> SlotMut<'_>;
}

/// Mutable view of a value, tagged by its shape.
pub enum SlotMut<'a> {
    /// Self-scanning value.
    Leaf(&'a mut dyn Scanner),
    /// Record value.
    Record(&'a mut dyn Record),
    /// Optional wrapper.
    Optional(&'a mut dyn OptionalSlot),
    /// Collection.
    Collection(&'a mut dyn CollectionSlot),
}

/// An optional wrapper that allocates its value on demand.
pub trait OptionalSlot {
    /// Shape of the wrapped type.
    fn inner_shape(&self) -> Shape;

    /// Returns the wrapped value, replacing an unset wrapper by a default
    /// instance first.
    fn get_or_insert_default(&mut self) -> &mut dyn Scan;

    /// The wrapper as a leaf: NULL unsets it, anything else is scanned into
    /// the wrapped type.
    fn as_scanner(&mut self) -> &mut dyn Scanner;
}

/// A collection that receives one element per row.
pub trait CollectionSlot {
    /// Builds a default element, lets `fill` assign it and appends it if
    /// `fill` succeeded.
    fn push_with(
        &mut self,
        fill: &mut dyn FnMut(&mut dyn Scan) -> ScanResult<()>,
    ) -> ScanResult<()>;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Returns true if the collection has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The collection as a leaf. Only `Vec<u8>` takes a single column (binary
    /// or text); scanning any other collection fails.
    fn as_scanner(&mut self) -> &mut dyn Scanner;
}

/// Returns the scanner for a value that sits at the end of a field path.
///
/// Records, optional or not, have no scanner; every other shape does.
pub(crate) fn leaf_scanner(value: &mut dyn Scan) -> Option<&mut dyn Scanner> {
    match value.slot() {
        SlotMut::Leaf(scanner) => Some(scanner),
        SlotMut::Optional(optional) => match optional.inner_shape() {
            Shape::Record(_) => None,
            _ => Some(optional.as_scanner()),
        },
        SlotMut::Collection(collection) => Some(collection.as_scanner()),
        SlotMut::Record(_) => None,
    }
}

/// Returns the record behind a value, allocating one level of optional
/// wrapper if it is unset.
pub(crate) fn record_mut(value: &mut dyn Scan) -> Option<&mut dyn Record> {
    match value.slot() {
        SlotMut::Record(record) => Some(record),
        SlotMut::Optional(optional) => match optional.get_or_insert_default().slot() {
            SlotMut::Record(record) => Some(record),
            _ => None,
        },
        _ => None,
    }
}

impl<T: Scan + Default> Scan for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(T::shape)
    }

    fn slot(&mut self) -> SlotMut<'_> {
        SlotMut::Optional(self)
    }
}

impl<T: Scan + Default> OptionalSlot for Option<T> {
    fn inner_shape(&self) -> Shape {
        T::shape()
    }

    fn get_or_insert_default(&mut self) -> &mut dyn Scan {
        self.get_or_insert_with(T::default)
    }

    fn as_scanner(&mut self) -> &mut dyn Scanner {
        self
    }
}

impl<T: Scan + Default> Scanner for Option<T> {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        match leaf_scanner(&mut inner) {
            Some(scanner) => scanner.scan(value)?,
            None => {
                return Err(ConvertError::Incompatible {
                    from: value.kind(),
                    target: type_name::<T>(),
                })
            }
        }
        *self = Some(inner);
        Ok(())
    }
}

impl<T: Scan + Default> Scan for Vec<T> {
    fn shape() -> Shape {
        Shape::Collection(T::shape)
    }

    fn slot(&mut self) -> SlotMut<'_> {
        SlotMut::Collection(self)
    }
}

impl<T: Scan + Default> CollectionSlot for Vec<T> {
    fn push_with(
        &mut self,
        fill: &mut dyn FnMut(&mut dyn Scan) -> ScanResult<()>,
    ) -> ScanResult<()> {
        let mut element = T::default();
        fill(&mut element)?;
        self.push(element);
        Ok(())
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn as_scanner(&mut self) -> &mut dyn Scanner {
        self
    }
}

impl<T: Scan + Default> Scanner for Vec<T> {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        let Some(buf) = (self as &mut dyn Any).downcast_mut::<Vec<u8>>() else {
            return Err(ConvertError::Incompatible {
                from: value.kind(),
                target: type_name::<Self>(),
            });
        };
        match value {
            Value::Bytes(bytes) => *buf = bytes.to_vec(),
            Value::String(text) => *buf = text.as_bytes().to_vec(),
            // NULL reads as an empty buffer.
            Value::Null => buf.clear(),
            other => {
                return Err(ConvertError::Incompatible {
                    from: other.kind(),
                    target: "Vec<u8>",
                })
            }
        }
        Ok(())
    }
}

/// Conversion of a caller-supplied destination into the mutable target.
///
/// Only `&mut T` and a non-null `Option<&mut T>` are settable. Owned values
/// and shared references are rejected with
/// [`ScanError::InvalidDestination`], `None` with
/// [`ScanError::NilDestination`].
pub trait IntoDestination<'a> {
    /// Type written by the scan.
    type Target: Scan;

    /// Returns the mutable target.
    fn into_destination(self) -> ScanResult<&'a mut Self::Target>;
}

impl<'a, T: Scan> IntoDestination<'a> for &'a mut T {
    type Target = T;

    fn into_destination(self) -> ScanResult<&'a mut T> {
        Ok(self)
    }
}

impl<'a, T: Scan> IntoDestination<'a> for Option<&'a mut T> {
    type Target = T;

    fn into_destination(self) -> ScanResult<&'a mut T> {
        self.ok_or(ScanError::NilDestination)
    }
}

impl<'a, T: Scan> IntoDestination<'a> for &'a T {
    type Target = T;

    fn into_destination(self) -> ScanResult<&'a mut T> {
        Err(ScanError::InvalidDestination)
    }
}

impl<'a, T: Scan + Default> IntoDestination<'a> for Vec<T> {
    type Target = Vec<T>;

    fn into_destination(self) -> ScanResult<&'a mut Vec<T>> {
        Err(ScanError::InvalidDestination)
    }
}

/// Declares self-scanning leaf types.
///
/// Each type must implement [`Scanner`]. The macro implements [`Scan`] with
/// [`Shape::Leaf`] and rejects the type when it is passed by value as a
/// destination.
///
/// ```rust
/// use nexus_rowmap::{leaf, ConvertResult, Scanner, Value};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Celsius(f64);
///
/// impl Scanner for Celsius {
///     fn scan(&mut self, value: &Value) -> ConvertResult<()> {
///         self.0.scan(value)
///     }
/// }
///
/// leaf!(Celsius);
/// ```
#[macro_export]
macro_rules! leaf {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Scan for $ty {
                fn shape() -> $crate::Shape {
                    $crate::Shape::Leaf
                }

                fn slot(&mut self) -> $crate::SlotMut<'_> {
                    $crate::SlotMut::Leaf(self)
                }
            }

            impl<'a> $crate::IntoDestination<'a> for $ty {
                type Target = $ty;

                fn into_destination(self) -> $crate::ScanResult<&'a mut $ty> {
                    ::std::result::Result::Err($crate::ScanError::InvalidDestination)
                }
            }
        )+
    };
}
