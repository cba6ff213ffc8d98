//! Tagged values held by attribute lists.
//!
//! Every entry carries exactly one [`NvType`] tag, fixed at insertion time.
//! Values are never coerced between tags; the only equivalence is that a
//! presence-only boolean flag reads as `true` through [`AttributeValue::as_boolean`].

use std::collections::TryReserveError;
use std::fmt;

use crate::error::{NvError, NvResult};
use crate::nvlist::AttributeList;

/// Data type tag of an attribute entry.
///
/// The discriminants are the storage subsystem's data-type codes, so a tag can
/// be exchanged with it as a plain integer.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NvType {
    Unknown = 0,
    /// Presence-only flag; the value is implied `true`.
    Boolean = 1,
    Byte = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Int64 = 7,
    Uint64 = 8,
    String = 9,
    ByteArray = 10,
    Int16Array = 11,
    Uint16Array = 12,
    Int32Array = 13,
    Uint32Array = 14,
    Int64Array = 15,
    Uint64Array = 16,
    StringArray = 17,
    Hrtime = 18,
    Nvlist = 19,
    NvlistArray = 20,
    /// Value-bearing boolean.
    BooleanValue = 21,
    Int8 = 22,
    Uint8 = 23,
    BooleanArray = 24,
    Int8Array = 25,
    Uint8Array = 26,
}

impl NvType {
    const ALL: [Self; 27] = [
        Self::Unknown,
        Self::Boolean,
        Self::Byte,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Int64,
        Self::Uint64,
        Self::String,
        Self::ByteArray,
        Self::Int16Array,
        Self::Uint16Array,
        Self::Int32Array,
        Self::Uint32Array,
        Self::Int64Array,
        Self::Uint64Array,
        Self::StringArray,
        Self::Hrtime,
        Self::Nvlist,
        Self::NvlistArray,
        Self::BooleanValue,
        Self::Int8,
        Self::Uint8,
        Self::BooleanArray,
        Self::Int8Array,
        Self::Uint8Array,
    ];

    /// Numeric data-type code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Maps a data-type code back to a tag. Unknown codes map to `None`.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Type name as used in annotated JSON output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::String => "string",
            Self::ByteArray => "byte_array",
            Self::Int16Array => "int16_array",
            Self::Uint16Array => "uint16_array",
            Self::Int32Array => "int32_array",
            Self::Uint32Array => "uint32_array",
            Self::Int64Array => "int64_array",
            Self::Uint64Array => "uint64_array",
            Self::StringArray => "string_array",
            Self::Hrtime => "hrtime",
            Self::Nvlist => "nvlist",
            Self::NvlistArray => "nvlist_array",
            Self::BooleanValue => "boolean_value",
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::BooleanArray => "boolean_array",
            Self::Int8Array => "int8_array",
            Self::Uint8Array => "uint8_array",
        }
    }
}

impl fmt::Display for NvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single tagged value.
///
/// # Examples
///
/// ```
/// use nvkit::{AttributeValue, NvType};
///
/// let v = AttributeValue::from(42u64);
/// assert_eq!(v.nv_type(), NvType::Uint64);
/// assert_eq!(v.as_uint64(), Some(42));
/// assert_eq!(v.as_int64(), None);
///
/// assert_eq!(AttributeValue::Boolean.as_boolean(), Some(true));
/// ```
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Presence-only flag.
    Boolean,
    BooleanValue(bool),
    Byte(u8),
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    /// High-resolution time in nanoseconds.
    Hrtime(i64),
    String(String),
    List(AttributeList),
    BooleanArray(Vec<bool>),
    ByteArray(Vec<u8>),
    Int8Array(Vec<i8>),
    Uint8Array(Vec<u8>),
    Int16Array(Vec<i16>),
    Uint16Array(Vec<u16>),
    Int32Array(Vec<i32>),
    Uint32Array(Vec<u32>),
    Int64Array(Vec<i64>),
    Uint64Array(Vec<u64>),
    StringArray(Vec<String>),
    ListArray(Vec<AttributeList>),
    /// Entry handed over by the storage subsystem with a type code this crate
    /// does not model. It can be carried and erased, never read.
    Unrecognized {
        code: i32,
    },
}

macro_rules! copy_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Reads a `", stringify!($variant), "` scalar.")]
        #[must_use]
        pub const fn $name(&self) -> Option<$ty> {
            match self {
                Self::$variant(v) => Some(*v),
                _ => None,
            }
        }
    };
}

macro_rules! slice_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Borrows a `", stringify!($variant), "`.")]
        #[must_use]
        pub fn $name(&self) -> Option<&[$ty]> {
            match self {
                Self::$variant(v) => Some(v),
                _ => None,
            }
        }
    };
}

impl AttributeValue {
    /// Tag of this value.
    #[must_use]
    pub const fn nv_type(&self) -> NvType {
        match self {
            Self::Boolean => NvType::Boolean,
            Self::BooleanValue(_) => NvType::BooleanValue,
            Self::Byte(_) => NvType::Byte,
            Self::Int8(_) => NvType::Int8,
            Self::Uint8(_) => NvType::Uint8,
            Self::Int16(_) => NvType::Int16,
            Self::Uint16(_) => NvType::Uint16,
            Self::Int32(_) => NvType::Int32,
            Self::Uint32(_) => NvType::Uint32,
            Self::Int64(_) => NvType::Int64,
            Self::Uint64(_) => NvType::Uint64,
            Self::Hrtime(_) => NvType::Hrtime,
            Self::String(_) => NvType::String,
            Self::List(_) => NvType::Nvlist,
            Self::BooleanArray(_) => NvType::BooleanArray,
            Self::ByteArray(_) => NvType::ByteArray,
            Self::Int8Array(_) => NvType::Int8Array,
            Self::Uint8Array(_) => NvType::Uint8Array,
            Self::Int16Array(_) => NvType::Int16Array,
            Self::Uint16Array(_) => NvType::Uint16Array,
            Self::Int32Array(_) => NvType::Int32Array,
            Self::Uint32Array(_) => NvType::Uint32Array,
            Self::Int64Array(_) => NvType::Int64Array,
            Self::Uint64Array(_) => NvType::Uint64Array,
            Self::StringArray(_) => NvType::StringArray,
            Self::ListArray(_) => NvType::NvlistArray,
            Self::Unrecognized { .. } => NvType::Unknown,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.nv_type().name()
    }

    /// Reads a boolean. Both the presence flag and a value-bearing boolean qualify.
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean => Some(true),
            Self::BooleanValue(v) => Some(*v),
            _ => None,
        }
    }

    copy_accessor!(as_byte, Byte, u8);
    copy_accessor!(as_int8, Int8, i8);
    copy_accessor!(as_uint8, Uint8, u8);
    copy_accessor!(as_int16, Int16, i16);
    copy_accessor!(as_uint16, Uint16, u16);
    copy_accessor!(as_int32, Int32, i32);
    copy_accessor!(as_uint32, Uint32, u32);
    copy_accessor!(as_int64, Int64, i64);
    copy_accessor!(as_uint64, Uint64, u64);
    copy_accessor!(as_hrtime, Hrtime, i64);

    /// Reads a string.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Borrows a nested list.
    #[must_use]
    pub const fn as_nvlist(&self) -> Option<&AttributeList> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    slice_accessor!(as_boolean_array, BooleanArray, bool);
    slice_accessor!(as_byte_array, ByteArray, u8);
    slice_accessor!(as_int8_array, Int8Array, i8);
    slice_accessor!(as_uint8_array, Uint8Array, u8);
    slice_accessor!(as_int16_array, Int16Array, i16);
    slice_accessor!(as_uint16_array, Uint16Array, u16);
    slice_accessor!(as_int32_array, Int32Array, i32);
    slice_accessor!(as_uint32_array, Uint32Array, u32);
    slice_accessor!(as_int64_array, Int64Array, i64);
    slice_accessor!(as_uint64_array, Uint64Array, u64);
    slice_accessor!(as_string_array, StringArray, String);
    slice_accessor!(as_nvlist_array, ListArray, AttributeList);

    /// Checks that the value can be encoded by the storage subsystem.
    pub(crate) fn validate(&self, key: &str) -> NvResult<()> {
        match self {
            Self::String(s) if s.contains('\0') => {
                Err(NvError::invalid_argument(key, "string contains a NUL byte"))
            }
            Self::StringArray(items) if items.iter().any(|s| s.contains('\0')) => Err(
                NvError::invalid_argument(key, "string array element contains a NUL byte"),
            ),
            Self::Unrecognized { code } => Err(NvError::invalid_argument(
                key,
                format!("type code {code} cannot be encoded"),
            )),
            Self::List(list) => validate_entries(list),
            Self::ListArray(lists) => lists.iter().try_for_each(validate_entries),
            _ => Ok(()),
        }
    }

    /// Deep copy that reports allocation failure instead of aborting.
    pub(crate) fn try_clone(&self) -> NvResult<Self> {
        let copy = match self {
            Self::String(s) => Self::String(try_copy_str(s)?),
            Self::List(l) => Self::List(l.try_clone()?),
            Self::BooleanArray(v) => Self::BooleanArray(try_copy_slice(v)?),
            Self::ByteArray(v) => Self::ByteArray(try_copy_slice(v)?),
            Self::Int8Array(v) => Self::Int8Array(try_copy_slice(v)?),
            Self::Uint8Array(v) => Self::Uint8Array(try_copy_slice(v)?),
            Self::Int16Array(v) => Self::Int16Array(try_copy_slice(v)?),
            Self::Uint16Array(v) => Self::Uint16Array(try_copy_slice(v)?),
            Self::Int32Array(v) => Self::Int32Array(try_copy_slice(v)?),
            Self::Uint32Array(v) => Self::Uint32Array(try_copy_slice(v)?),
            Self::Int64Array(v) => Self::Int64Array(try_copy_slice(v)?),
            Self::Uint64Array(v) => Self::Uint64Array(try_copy_slice(v)?),
            Self::StringArray(items) => {
                let mut out = Vec::new();
                out.try_reserve_exact(items.len())?;
                for s in items {
                    out.push(try_copy_str(s)?);
                }
                Self::StringArray(out)
            }
            Self::ListArray(items) => {
                let mut out = Vec::new();
                out.try_reserve_exact(items.len())?;
                for l in items {
                    out.push(l.try_clone()?);
                }
                Self::ListArray(out)
            }
            Self::Boolean => Self::Boolean,
            Self::BooleanValue(v) => Self::BooleanValue(*v),
            Self::Byte(v) => Self::Byte(*v),
            Self::Int8(v) => Self::Int8(*v),
            Self::Uint8(v) => Self::Uint8(*v),
            Self::Int16(v) => Self::Int16(*v),
            Self::Uint16(v) => Self::Uint16(*v),
            Self::Int32(v) => Self::Int32(*v),
            Self::Uint32(v) => Self::Uint32(*v),
            Self::Int64(v) => Self::Int64(*v),
            Self::Uint64(v) => Self::Uint64(*v),
            Self::Hrtime(v) => Self::Hrtime(*v),
            Self::Unrecognized { code } => Self::Unrecognized { code: *code },
        };
        Ok(copy)
    }
}

fn try_copy_slice<T: Copy>(src: &[T]) -> Result<Vec<T>, TryReserveError> {
    let mut out = Vec::new();
    out.try_reserve_exact(src.len())?;
    out.extend_from_slice(src);
    Ok(out)
}

/// Rejects keys the storage subsystem cannot encode.
pub(crate) fn validate_key(key: &str) -> NvResult<()> {
    if key.is_empty() {
        return Err(NvError::invalid_argument(key, "key is empty"));
    }
    if key.contains('\0') {
        return Err(NvError::invalid_argument(key, "key contains a NUL byte"));
    }
    Ok(())
}

/// Checks every key and value of `list`, descending into nested lists.
fn validate_entries(list: &AttributeList) -> NvResult<()> {
    list.iter().try_for_each(|pair| {
        validate_key(pair.key())?;
        pair.value().validate(pair.key())
    })
}

fn try_copy_str(src: &str) -> Result<String, TryReserveError> {
    let mut out = String::new();
    out.try_reserve_exact(src.len())?;
    out.push_str(src);
    Ok(out)
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::BooleanValue(v)
    }
}

impl From<i8> for AttributeValue {
    fn from(v: i8) -> Self {
        Self::Int8(v)
    }
}

impl From<u8> for AttributeValue {
    fn from(v: u8) -> Self {
        Self::Uint8(v)
    }
}

impl From<i16> for AttributeValue {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<u16> for AttributeValue {
    fn from(v: u16) -> Self {
        Self::Uint16(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        Self::Uint32(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        Self::Uint64(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<AttributeList> for AttributeValue {
    fn from(v: AttributeList) -> Self {
        Self::List(v)
    }
}

impl From<Vec<bool>> for AttributeValue {
    fn from(v: Vec<bool>) -> Self {
        Self::BooleanArray(v)
    }
}

impl From<Vec<i8>> for AttributeValue {
    fn from(v: Vec<i8>) -> Self {
        Self::Int8Array(v)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Uint8Array(v)
    }
}

impl From<Vec<i16>> for AttributeValue {
    fn from(v: Vec<i16>) -> Self {
        Self::Int16Array(v)
    }
}

impl From<Vec<u16>> for AttributeValue {
    fn from(v: Vec<u16>) -> Self {
        Self::Uint16Array(v)
    }
}

impl From<Vec<i32>> for AttributeValue {
    fn from(v: Vec<i32>) -> Self {
        Self::Int32Array(v)
    }
}

impl From<Vec<u32>> for AttributeValue {
    fn from(v: Vec<u32>) -> Self {
        Self::Uint32Array(v)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(v: Vec<i64>) -> Self {
        Self::Int64Array(v)
    }
}

impl From<Vec<u64>> for AttributeValue {
    fn from(v: Vec<u64>) -> Self {
        Self::Uint64Array(v)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

impl From<Vec<AttributeList>> for AttributeValue {
    fn from(v: Vec<AttributeList>) -> Self {
        Self::ListArray(v)
    }
}
