//! Raw column values and the conversions applied when assigning them.
//!
//! A row source hands each column to the [`Scanner`] bound for it. The
//! implementations here are the conversion rules of the in-memory row source
//! and of any source that produces [`Value`]s.

use std::fmt;

use bytes::Bytes;

use crate::error::{ConvertError, ConvertResult};

/// Raw column value as produced by a row source.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Binary data.
    Bytes(Bytes),
}

impl Value {
    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Tries to get as integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Tries to get as float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Tries to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Tries to get as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the name of the value kind, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A destination that assigns itself from one raw column value.
///
/// Types implementing `Scanner` and reporting [`Shape::Leaf`](crate::Shape)
/// are self-scanning: they can be scan targets on their own, bypassing
/// field-path resolution.
pub trait Scanner {
    /// Assigns `self` from `value`.
    fn scan(&mut self, value: &Value) -> ConvertResult<()>;
}

fn incompatible(value: &Value, target: &'static str) -> ConvertError {
    match value {
        Value::Null => ConvertError::UnexpectedNull { target },
        other => ConvertError::Incompatible {
            from: other.kind(),
            target,
        },
    }
}

fn parse_text<T: std::str::FromStr>(text: &str, target: &'static str) -> ConvertResult<T> {
    text.trim().parse().map_err(|_| ConvertError::Parse {
        value: text.to_string(),
        target,
    })
}

impl Scanner for bool {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        *self = match value {
            Value::Boolean(b) => *b,
            Value::Integer(0) => false,
            Value::Integer(1) => true,
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => true,
                "false" | "f" | "0" => false,
                _ => {
                    return Err(ConvertError::Parse {
                        value: s.clone(),
                        target: "bool",
                    })
                }
            },
            other => return Err(incompatible(other, "bool")),
        };
        Ok(())
    }
}

macro_rules! impl_integer_scanner {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scanner for $ty {
                fn scan(&mut self, value: &Value) -> ConvertResult<()> {
                    *self = match value {
                        Value::Integer(i) => <$ty>::try_from(*i).map_err(|_| {
                            ConvertError::OutOfRange {
                                value: i.to_string(),
                                target: stringify!($ty),
                            }
                        })?,
                        Value::String(s) => parse_text::<$ty>(s, stringify!($ty))?,
                        other => return Err(incompatible(other, stringify!($ty))),
                    };
                    Ok(())
                }
            }
        )*
    };
}

impl_integer_scanner!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl Scanner for f64 {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        *self = match value {
            Value::Float(f) => *f,
            Value::Integer(i) => *i as f64,
            Value::String(s) => parse_text::<f64>(s, "f64")?,
            other => return Err(incompatible(other, "f64")),
        };
        Ok(())
    }
}

impl Scanner for f32 {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        let mut wide = 0f64;
        wide.scan(value).map_err(|err| match err {
            ConvertError::Parse { value: text, .. } => ConvertError::Parse {
                value: text,
                target: "f32",
            },
            _ => incompatible(value, "f32"),
        })?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(ConvertError::OutOfRange {
                value: wide.to_string(),
                target: "f32",
            });
        }
        *self = wide as f32;
        Ok(())
    }
}

impl Scanner for String {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        *self = match value {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Bytes(b) => {
                String::from_utf8(b.to_vec()).map_err(|_| ConvertError::Incompatible {
                    from: "non-UTF-8 BYTES",
                    target: "String",
                })?
            }
            Value::Null => return Err(incompatible(value, "String")),
        };
        Ok(())
    }
}

impl Scanner for Bytes {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        *self = match value {
            Value::Bytes(b) => b.clone(),
            Value::String(s) => Bytes::copy_from_slice(s.as_bytes()),
            other => return Err(incompatible(other, "Bytes")),
        };
        Ok(())
    }
}

impl Scanner for Value {
    fn scan(&mut self, value: &Value) -> ConvertResult<()> {
        *self = value.clone();
        Ok(())
    }
}

crate::leaf!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64, String, Bytes, Value
);

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned<T: Scanner + Default>(value: Value) -> ConvertResult<T> {
        let mut dest = T::default();
        dest.scan(&value)?;
        Ok(dest)
    }

    #[test]
    fn test_value_accessors() {
        let int_val = Value::Integer(42);
        assert_eq!(int_val.as_i64(), Some(42));
        assert_eq!(int_val.as_f64(), Some(42.0));
        assert!(int_val.as_str().is_none());

        let str_val = Value::from("hello");
        assert_eq!(str_val.as_str(), Some("hello"));
        assert_eq!(str_val.kind(), "STRING");

        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::Bytes(Bytes::from_static(b"abc")).to_string(), "<3 bytes>");
    }

    #[test]
    fn test_scan_integers() {
        assert_eq!(scanned::<i64>(Value::Integer(100)), Ok(100));
        assert_eq!(scanned::<u16>(Value::from("512")), Ok(512));
        assert_eq!(
            scanned::<u8>(Value::Integer(300)),
            Err(ConvertError::OutOfRange {
                value: "300".into(),
                target: "u8"
            })
        );
        assert_eq!(
            scanned::<i32>(Value::Float(1.5)),
            Err(ConvertError::Incompatible {
                from: "FLOAT",
                target: "i32"
            })
        );
        assert!(matches!(
            scanned::<i64>(Value::from("ten")),
            Err(ConvertError::Parse { .. })
        ));
    }

    #[test]
    fn test_scan_bool() {
        assert_eq!(scanned::<bool>(Value::Boolean(true)), Ok(true));
        assert_eq!(scanned::<bool>(Value::Integer(0)), Ok(false));
        assert_eq!(scanned::<bool>(Value::from("T")), Ok(true));
        assert!(scanned::<bool>(Value::Integer(2)).is_err());
    }

    #[test]
    fn test_scan_floats() {
        assert_eq!(scanned::<f64>(Value::Integer(3)), Ok(3.0));
        assert_eq!(scanned::<f32>(Value::Float(0.5)), Ok(0.5));
        assert!(matches!(
            scanned::<f32>(Value::Float(1e300)),
            Err(ConvertError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_scan_text_and_bytes() {
        assert_eq!(scanned::<String>(Value::Integer(9)), Ok("9".to_string()));
        assert_eq!(
            scanned::<String>(Value::from(b"hi".to_vec())),
            Ok("hi".to_string())
        );
        assert_eq!(
            scanned::<String>(Value::from(vec![0xffu8, 0xfe])),
            Err(ConvertError::Incompatible {
                from: "non-UTF-8 BYTES",
                target: "String",
            })
        );
        assert_eq!(scanned::<u8>(Value::Integer(255)), Ok(255));
        assert_eq!(
            scanned::<Bytes>(Value::from("raw")),
            Ok(Bytes::from_static(b"raw"))
        );
    }

    #[test]
    fn test_null_into_plain_destination() {
        assert_eq!(
            scanned::<String>(Value::Null),
            Err(ConvertError::UnexpectedNull { target: "String" })
        );
        assert_eq!(scanned::<Value>(Value::Null), Ok(Value::Null));
    }
}
