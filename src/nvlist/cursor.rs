//! Positions within an attribute list.

use std::ptr;

use crate::error::{NvError, NvResult};
use crate::nvlist::raw::RawPair;
use crate::nvlist::AttributeList;
use crate::value::{AttributeValue, NvType};

/// Borrowed view of one entry: its key plus tag-checked accessors.
#[derive(Debug, Clone, Copy)]
pub struct Pair<'a> {
    key: &'a str,
    value: &'a AttributeValue,
}

macro_rules! pair_copy_accessor {
    ($name:ident, $ty:ty, $expected:expr) => {
        #[doc = concat!("Reads the value as `", stringify!($ty), "`.")]
        #[doc = ""]
        #[doc = "# Errors"]
        #[doc = ""]
        #[doc = "`TypeMismatch` if the entry holds another tag."]
        pub fn $name(&self) -> NvResult<$ty> {
            self.value.$name().ok_or_else(|| self.mismatch($expected))
        }
    };
}

macro_rules! pair_slice_accessor {
    ($name:ident, $ty:ty, $expected:expr) => {
        #[doc = concat!("Borrows the value as `&[", stringify!($ty), "]`.")]
        #[doc = ""]
        #[doc = "# Errors"]
        #[doc = ""]
        #[doc = "`TypeMismatch` if the entry holds another tag."]
        pub fn $name(&self) -> NvResult<&'a [$ty]> {
            self.value.$name().ok_or_else(|| self.mismatch($expected))
        }
    };
}

impl<'a> Pair<'a> {
    pub(crate) fn new(raw: &'a RawPair) -> Self {
        Self {
            key: &raw.name,
            value: &raw.value,
        }
    }

    /// Entry key.
    #[must_use]
    pub const fn key(&self) -> &'a str {
        self.key
    }

    /// Entry tag.
    #[must_use]
    pub const fn nv_type(&self) -> NvType {
        self.value.nv_type()
    }

    /// Underlying value.
    #[must_use]
    pub const fn value(&self) -> &'a AttributeValue {
        self.value
    }

    fn mismatch(&self, expected: NvType) -> NvError {
        NvError::TypeMismatch {
            key: self.key.to_string(),
            expected,
            actual: self.value.nv_type(),
        }
    }

    pair_copy_accessor!(as_boolean, bool, NvType::BooleanValue);
    pair_copy_accessor!(as_byte, u8, NvType::Byte);
    pair_copy_accessor!(as_int8, i8, NvType::Int8);
    pair_copy_accessor!(as_uint8, u8, NvType::Uint8);
    pair_copy_accessor!(as_int16, i16, NvType::Int16);
    pair_copy_accessor!(as_uint16, u16, NvType::Uint16);
    pair_copy_accessor!(as_int32, i32, NvType::Int32);
    pair_copy_accessor!(as_uint32, u32, NvType::Uint32);
    pair_copy_accessor!(as_int64, i64, NvType::Int64);
    pair_copy_accessor!(as_uint64, u64, NvType::Uint64);
    pair_copy_accessor!(as_hrtime, i64, NvType::Hrtime);

    /// Reads the value as a string.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the entry holds another tag.
    pub fn as_string(&self) -> NvResult<&'a str> {
        self.value.as_string().ok_or_else(|| self.mismatch(NvType::String))
    }

    /// Borrows the nested list.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the entry holds another tag.
    pub fn as_nvlist(&self) -> NvResult<&'a AttributeList> {
        self.value.as_nvlist().ok_or_else(|| self.mismatch(NvType::Nvlist))
    }

    pair_slice_accessor!(as_boolean_array, bool, NvType::BooleanArray);
    pair_slice_accessor!(as_byte_array, u8, NvType::ByteArray);
    pair_slice_accessor!(as_int8_array, i8, NvType::Int8Array);
    pair_slice_accessor!(as_uint8_array, u8, NvType::Uint8Array);
    pair_slice_accessor!(as_int16_array, i16, NvType::Int16Array);
    pair_slice_accessor!(as_uint16_array, u16, NvType::Uint16Array);
    pair_slice_accessor!(as_int32_array, i32, NvType::Int32Array);
    pair_slice_accessor!(as_uint32_array, u32, NvType::Uint32Array);
    pair_slice_accessor!(as_int64_array, i64, NvType::Int64Array);
    pair_slice_accessor!(as_uint64_array, u64, NvType::Uint64Array);
    pair_slice_accessor!(as_string_array, String, NvType::StringArray);
    pair_slice_accessor!(as_nvlist_array, AttributeList, NvType::NvlistArray);
}

/// Forward-only position within one list.
///
/// A cursor either points at an entry or is exhausted. All exhausted cursors
/// compare equal, whichever list they came from, so [`Cursor::end`] works as
/// a sentinel. Iterating a cursor yields the current entry, then advances.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    pairs: &'a [RawPair],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) const fn new(pairs: &'a [RawPair], pos: usize) -> Self {
        Self { pairs, pos }
    }

    /// The exhausted cursor.
    #[must_use]
    pub const fn end() -> Self {
        Self { pairs: &[], pos: 0 }
    }

    /// Returns true if no entry is under the cursor.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.pos >= self.pairs.len()
    }

    /// Entry under the cursor.
    #[must_use]
    pub fn get(&self) -> Option<Pair<'a>> {
        self.pairs.get(self.pos).map(Pair::new)
    }

    /// Moves to the next entry in insertion order. No-op once exhausted.
    pub fn advance(&mut self) {
        if !self.is_end() {
            self.pos += 1;
        }
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_end(), other.is_end()) {
            (true, true) => true,
            (false, false) => ptr::eq(self.pairs.as_ptr(), other.pairs.as_ptr()) && self.pos == other.pos,
            _ => false,
        }
    }
}

impl Eq for Cursor<'_> {}

impl<'a> Iterator for Cursor<'a> {
    type Item = Pair<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let pair = self.get()?;
        self.pos += 1;
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pairs.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Cursor<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttributeList {
        let mut list = AttributeList::new();
        list.add_uint64("a", 1).unwrap();
        list.add_string("b", "two").unwrap();
        list.add_boolean("c").unwrap();
        list
    }

    #[test]
    fn cursor_walks_in_insertion_order() {
        let list = sample();
        let mut cursor = list.begin();
        assert_eq!(cursor.get().unwrap().key(), "a");
        cursor.advance();
        assert_eq!(cursor.get().unwrap().key(), "b");
        cursor.advance();
        assert_eq!(cursor.get().unwrap().key(), "c");
        cursor.advance();
        assert!(cursor.is_end());
        assert_eq!(cursor, list.end());
        cursor.advance();
        assert!(cursor.is_end());
    }

    #[test]
    fn exhausted_cursors_are_equal_across_lists() {
        let a = sample();
        let b = AttributeList::new();
        let mut ca = a.begin();
        for _ in ca.by_ref() {}
        assert_eq!(ca, b.begin());
        assert_eq!(ca, Cursor::end());
        assert_ne!(a.begin(), Cursor::end());
    }

    #[test]
    fn cursors_at_same_position_are_equal() {
        let list = sample();
        assert_eq!(list.find("b"), list.find("b"));
        assert_ne!(list.find("a"), list.find("b"));
    }

    #[test]
    fn pair_accessors_check_tags() {
        let list = sample();
        let a = list.at("a").unwrap();
        assert_eq!(a.as_uint64().unwrap(), 1);
        assert_eq!(a.nv_type(), NvType::Uint64);
        let err = a.as_int64().unwrap_err();
        match err {
            NvError::TypeMismatch { key, expected, actual } => {
                assert_eq!(key, "a");
                assert_eq!(expected, NvType::Int64);
                assert_eq!(actual, NvType::Uint64);
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }

        let c = list.at("c").unwrap();
        assert!(c.as_boolean().unwrap());
        assert!(c.as_boolean_array().is_err());
    }

    #[test]
    fn iterator_reports_exact_size() {
        let list = sample();
        let mut it = list.iter();
        assert_eq!(it.len(), 3);
        it.next();
        assert_eq!(it.len(), 2);
    }
}
