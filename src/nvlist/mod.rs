//! Self-describing attribute lists.
//!
//! An [`AttributeList`] is an ordered sequence of `(key, AttributeValue)`
//! entries. Its backing storage is either owned by this crate (created empty
//! and allocated on first insertion, or deep-copied) or adopted from storage
//! the storage subsystem allocated, without copying.

/// Entry positions and typed entry views.
pub mod cursor;
/// Diagnostic text export.
pub mod json;
/// Backing storage and release hooks.
pub mod raw;
/// Serde export.
pub mod serialize;

use std::collections::BTreeSet;

use crate::error::{NvError, NvResult};
use crate::value::{validate_key, AttributeValue};

pub use cursor::{Cursor, Pair};
pub use raw::{RawList, RawPair, ReleaseHook};

/// Ordered, dynamically typed key/value container.
///
/// Copies are always deep; moving out with [`AttributeList::take`] leaves the
/// source empty.
///
/// # Examples
///
/// ```
/// use nvkit::AttributeList;
///
/// let mut props = AttributeList::new();
/// props.add_string("type", "file")?;
/// props.add_uint64("ashift", 9)?;
///
/// assert_eq!(props.size(), 2);
/// assert_eq!(props.at("ashift")?.as_uint64()?, 9);
/// assert!(props.find("missing").is_end());
/// # Ok::<(), nvkit::NvError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct AttributeList {
    raw: Option<Box<RawList>>,
}

macro_rules! add_scalar {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Appends a `", stringify!($variant), "` entry.")]
        #[doc = ""]
        #[doc = "# Errors"]
        #[doc = ""]
        #[doc = "Same as [`AttributeList::insert`]."]
        pub fn $name(&mut self, key: &str, value: $ty) -> NvResult<()> {
            self.insert(key, AttributeValue::$variant(value))
        }
    };
}

macro_rules! add_array {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Appends a `", stringify!($variant), "` entry holding a copy of `values`.")]
        #[doc = ""]
        #[doc = "# Errors"]
        #[doc = ""]
        #[doc = "Same as [`AttributeList::insert`]; `Allocation` also covers copying `values`."]
        pub fn $name(&mut self, key: &str, values: &[$ty]) -> NvResult<()> {
            let mut copy = Vec::new();
            copy.try_reserve_exact(values.len())?;
            copy.extend_from_slice(values);
            self.insert(key, AttributeValue::$variant(copy))
        }
    };
}

impl AttributeList {
    /// Creates an empty list. Nothing is allocated until the first insertion.
    #[must_use]
    pub const fn new() -> Self {
        Self { raw: None }
    }

    /// Deep-copies foreign storage.
    ///
    /// # Errors
    ///
    /// Returns `NvError::Allocation` if the copy cannot be allocated.
    pub fn copy_from(raw: &RawList) -> NvResult<Self> {
        Ok(Self {
            raw: Some(Box::new(raw.try_clone()?)),
        })
    }

    /// Takes ownership of foreign storage without copying.
    ///
    /// The storage's release hook, if any, runs when this list (or whichever
    /// list the storage is later moved into) is cleared or dropped.
    #[must_use]
    pub fn adopt(raw: Box<RawList>) -> Self {
        Self { raw: Some(raw) }
    }

    /// Gives up the backing storage, if allocated.
    #[must_use]
    pub fn into_raw(self) -> Option<Box<RawList>> {
        self.raw
    }

    /// Borrows the backing storage, if allocated.
    #[must_use]
    pub fn raw(&self) -> Option<&RawList> {
        self.raw.as_deref()
    }

    /// Returns true once backing storage exists.
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.raw.is_some()
    }

    /// Deep copy.
    ///
    /// # Errors
    ///
    /// Returns `NvError::Allocation` if the copy cannot be allocated.
    pub fn try_clone(&self) -> NvResult<Self> {
        match &self.raw {
            Some(raw) => Self::copy_from(raw),
            None => Ok(Self::new()),
        }
    }

    /// Replaces this list's contents with a deep copy of `other`.
    ///
    /// The copy is made before anything is released, so on failure `self`
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `NvError::Allocation` if the copy cannot be allocated.
    pub fn assign_from(&mut self, other: &Self) -> NvResult<()> {
        let copy = other.try_clone()?;
        *self = copy;
        Ok(())
    }

    /// Moves the contents out, leaving this list empty and unallocated.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Releases the backing storage.
    pub fn clear(&mut self) {
        self.raw = None;
    }

    fn pairs(&self) -> &[RawPair] {
        match self.raw.as_deref() {
            Some(raw) => raw.pairs(),
            None => &[],
        }
    }

    fn ensure_allocated(&mut self) -> &mut RawList {
        self.raw.get_or_insert_with(|| Box::new(RawList::new()))
    }

    /// Number of entries.
    #[must_use]
    pub fn size(&self) -> usize {
        self.iter().count()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.begin() == self.end()
    }

    /// Distinct keys present.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<&str> {
        self.pairs().iter().map(|p| p.name.as_str()).collect()
    }

    /// Cursor at the first entry.
    #[must_use]
    pub fn begin(&self) -> Cursor<'_> {
        Cursor::new(self.pairs(), 0)
    }

    /// The exhausted cursor.
    #[must_use]
    pub const fn end(&self) -> Cursor<'_> {
        Cursor::end()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> Cursor<'_> {
        self.begin()
    }

    /// Cursor at the first entry named `key`, or the end cursor.
    #[must_use]
    pub fn find(&self, key: &str) -> Cursor<'_> {
        let pairs = self.pairs();
        match pairs.iter().position(|p| p.name == key) {
            Some(pos) => Cursor::new(pairs, pos),
            None => Cursor::end(),
        }
    }

    /// First entry named `key`.
    ///
    /// # Errors
    ///
    /// Returns `NvError::NotFound` if there is none.
    pub fn at(&self, key: &str) -> NvResult<Pair<'_>> {
        self.find(key).get().ok_or_else(|| NvError::not_found(key))
    }

    /// Value of the first entry named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.pairs().iter().find(|p| p.name == key).map(|p| &p.value)
    }

    /// Returns true if some entry is named `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        !self.find(key).is_end()
    }

    /// Removes every entry named `key`. Returns true if anything was removed.
    pub fn erase(&mut self, key: &str) -> bool {
        let Some(raw) = self.raw.as_deref_mut() else {
            return false;
        };
        let before = raw.pairs.len();
        raw.pairs.retain(|p| p.name != key);
        raw.pairs.len() != before
    }

    /// Appends `value` under `key`, replacing any entry with the same key.
    ///
    /// Nested lists without backing storage are stored as allocated empty lists.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the key is empty, the key/value contains a NUL byte,
    ///   or a nested list holds such an entry or an unrecognized type
    /// - `Allocation` if storage cannot grow
    ///
    /// # Examples
    ///
    /// ```
    /// use nvkit::{AttributeList, NvError};
    ///
    /// let mut list = AttributeList::new();
    /// assert!(matches!(list.insert("", 1u64), Err(NvError::InvalidArgument { .. })));
    /// assert!(matches!(list.add_string("path", "a\0b"), Err(NvError::InvalidArgument { .. })));
    /// assert!(!list.is_allocated());
    /// ```
    pub fn insert(&mut self, key: &str, value: impl Into<AttributeValue>) -> NvResult<()> {
        validate_key(key)?;
        let mut value = value.into();
        value.validate(key)?;
        materialize_placeholders(&mut value);

        let mut name = String::new();
        name.try_reserve_exact(key.len())?;
        name.push_str(key);

        let raw = self.ensure_allocated();
        raw.pairs.retain(|p| p.name != key);
        raw.pairs.try_reserve(1)?;
        raw.pairs.push(RawPair { name, value });
        Ok(())
    }

    /// Appends a presence-only boolean flag.
    ///
    /// # Errors
    ///
    /// Same as [`AttributeList::insert`].
    pub fn add_boolean(&mut self, key: &str) -> NvResult<()> {
        self.insert(key, AttributeValue::Boolean)
    }

    add_scalar!(add_boolean_value, BooleanValue, bool);
    add_scalar!(add_byte, Byte, u8);
    add_scalar!(add_int8, Int8, i8);
    add_scalar!(add_uint8, Uint8, u8);
    add_scalar!(add_int16, Int16, i16);
    add_scalar!(add_uint16, Uint16, u16);
    add_scalar!(add_int32, Int32, i32);
    add_scalar!(add_uint32, Uint32, u32);
    add_scalar!(add_int64, Int64, i64);
    add_scalar!(add_uint64, Uint64, u64);
    add_scalar!(add_hrtime, Hrtime, i64);

    /// Appends a string entry.
    ///
    /// # Errors
    ///
    /// Same as [`AttributeList::insert`], including a `value` containing a NUL byte.
    pub fn add_string(&mut self, key: &str, value: &str) -> NvResult<()> {
        let mut copy = String::new();
        copy.try_reserve_exact(value.len())?;
        copy.push_str(value);
        self.insert(key, AttributeValue::String(copy))
    }

    /// Appends a deep copy of `nested`.
    ///
    /// # Errors
    ///
    /// Same as [`AttributeList::insert`]. `InvalidArgument` is also returned
    /// when any key or value inside `nested` cannot be encoded.
    pub fn add_nvlist(&mut self, key: &str, nested: &Self) -> NvResult<()> {
        let copy = nested.try_clone()?;
        self.insert(key, AttributeValue::List(copy))
    }

    add_array!(add_boolean_array, BooleanArray, bool);
    add_array!(add_byte_array, ByteArray, u8);
    add_array!(add_int8_array, Int8Array, i8);
    add_array!(add_uint8_array, Uint8Array, u8);
    add_array!(add_int16_array, Int16Array, i16);
    add_array!(add_uint16_array, Uint16Array, u16);
    add_array!(add_int32_array, Int32Array, i32);
    add_array!(add_uint32_array, Uint32Array, u32);
    add_array!(add_int64_array, Int64Array, i64);
    add_array!(add_uint64_array, Uint64Array, u64);

    /// Appends a string array entry.
    ///
    /// # Errors
    ///
    /// Same as [`AttributeList::insert`], including an element containing a NUL byte.
    pub fn add_string_array<S: AsRef<str>>(&mut self, key: &str, values: &[S]) -> NvResult<()> {
        let mut copy = Vec::new();
        copy.try_reserve_exact(values.len())?;
        for s in values {
            let s = s.as_ref();
            let mut owned = String::new();
            owned.try_reserve_exact(s.len())?;
            owned.push_str(s);
            copy.push(owned);
        }
        self.insert(key, AttributeValue::StringArray(copy))
    }

    /// Appends deep copies of `values` as a list array entry.
    ///
    /// # Errors
    ///
    /// Same as [`AttributeList::add_nvlist`], applied to every element.
    pub fn add_nvlist_array(&mut self, key: &str, values: &[Self]) -> NvResult<()> {
        let mut copy = Vec::new();
        copy.try_reserve_exact(values.len())?;
        for list in values {
            copy.push(list.try_clone()?);
        }
        self.insert(key, AttributeValue::ListArray(copy))
    }
}

fn materialize_placeholders(value: &mut AttributeValue) {
    match value {
        AttributeValue::List(list) => {
            list.ensure_allocated();
        }
        AttributeValue::ListArray(lists) => {
            for list in lists {
                list.ensure_allocated();
            }
        }
        _ => {}
    }
}

impl PartialEq for AttributeList {
    fn eq(&self, other: &Self) -> bool {
        self.pairs() == other.pairs()
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = Pair<'a>;
    type IntoIter = Cursor<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.begin()
    }
}

impl FromIterator<RawPair> for AttributeList {
    /// Builds a list from pairs as-is, keeping duplicates.
    fn from_iter<I: IntoIterator<Item = RawPair>>(iter: I) -> Self {
        Self::adopt(Box::new(RawList::from_pairs(iter.into_iter().collect())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NvType;

    #[test]
    fn new_list_is_unallocated() {
        let list = AttributeList::new();
        assert!(!list.is_allocated());
        assert!(list.is_empty());
        assert_eq!(list.size(), 0);
        assert!(list.keys().is_empty());
    }

    #[test]
    fn first_insert_allocates() {
        let mut list = AttributeList::new();
        list.add_int32("x", -3).unwrap();
        assert!(list.is_allocated());
        assert_eq!(list.size(), 1);
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut list = AttributeList::new();
        list.add_uint64("a", 1).unwrap();
        list.add_uint64("b", 2).unwrap();
        list.add_string("a", "again").unwrap();
        assert_eq!(list.size(), 2);
        let keys: Vec<&str> = list.iter().map(|p| p.key()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(list.at("a").unwrap().as_string().unwrap(), "again");
    }

    #[test]
    fn find_returns_first_duplicate() {
        let list: AttributeList = vec![RawPair::new("k", 1u32), RawPair::new("k", 2u32)]
            .into_iter()
            .collect();
        assert_eq!(list.size(), 2);
        assert_eq!(list.keys().len(), 1);
        assert_eq!(list.at("k").unwrap().as_uint32().unwrap(), 1);
    }

    #[test]
    fn erase_removes_all_matches() {
        let mut list: AttributeList = vec![
            RawPair::new("k", 1u32),
            RawPair::new("other", 5u32),
            RawPair::new("k", 2u32),
        ]
        .into_iter()
        .collect();
        assert!(list.erase("k"));
        assert_eq!(list.size(), 1);
        assert!(!list.erase("k"));
        assert!(!AttributeList::new().erase("k"));
    }

    #[test]
    fn at_missing_key_is_not_found() {
        let list = AttributeList::new();
        let err = list.at("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn rejects_bad_keys_and_values() {
        let mut list = AttributeList::new();
        assert!(matches!(
            list.add_uint8("", 1),
            Err(NvError::InvalidArgument { .. })
        ));
        assert!(matches!(
            list.add_uint8("a\0b", 1),
            Err(NvError::InvalidArgument { .. })
        ));
        assert!(matches!(
            list.add_string("s", "x\0y"),
            Err(NvError::InvalidArgument { .. })
        ));
        assert!(matches!(
            list.add_string_array("s", &["ok", "n\0o"]),
            Err(NvError::InvalidArgument { .. })
        ));
        assert!(matches!(
            list.insert("u", AttributeValue::Unrecognized { code: 99 }),
            Err(NvError::InvalidArgument { .. })
        ));
        assert!(!list.is_allocated());
    }

    #[test]
    fn rejects_unencodable_entries_inside_nested_lists() {
        let empty_key: AttributeList = vec![RawPair::new("", 1u8)].into_iter().collect();
        let nul_value: AttributeList = vec![RawPair::new("s", "x\0y")].into_iter().collect();
        let unknown: AttributeList =
            vec![RawPair::new("u", AttributeValue::Unrecognized { code: 99 })]
                .into_iter()
                .collect();
        let deep: AttributeList = vec![RawPair::new("inner", nul_value.clone())]
            .into_iter()
            .collect();

        let mut list = AttributeList::new();
        for bad in [&empty_key, &nul_value, &unknown, &deep] {
            assert!(matches!(
                list.add_nvlist("child", bad),
                Err(NvError::InvalidArgument { .. })
            ));
            assert!(matches!(
                list.add_nvlist_array("children", &[AttributeList::new(), bad.clone()]),
                Err(NvError::InvalidArgument { .. })
            ));
            assert!(matches!(
                list.insert("child", bad.clone()),
                Err(NvError::InvalidArgument { .. })
            ));
        }
        assert!(!list.is_allocated());

        list.add_uint8("keep", 1).unwrap();
        assert!(list.add_nvlist("keep", &unknown).is_err());
        assert_eq!(list.at("keep").unwrap().as_uint8().unwrap(), 1);
    }

    #[test]
    fn add_nvlist_substitutes_empty_placeholder() {
        let mut outer = AttributeList::new();
        outer.add_nvlist("child", &AttributeList::new()).unwrap();
        let child = outer.at("child").unwrap().as_nvlist().unwrap();
        assert!(child.is_allocated());
        assert!(child.is_empty());

        outer
            .add_nvlist_array("children", &[AttributeList::new(), AttributeList::new()])
            .unwrap();
        let children = outer.at("children").unwrap().as_nvlist_array().unwrap();
        assert!(children.iter().all(AttributeList::is_allocated));
    }

    #[test]
    fn add_nvlist_stores_independent_copy() {
        let mut child = AttributeList::new();
        child.add_string("type", "file").unwrap();
        let mut root = AttributeList::new();
        root.add_nvlist("child", &child).unwrap();
        child.add_uint64("ashift", 9).unwrap();

        let stored = root.at("child").unwrap().as_nvlist().unwrap();
        assert_eq!(stored.size(), 1);
        assert_eq!(child.size(), 2);
    }

    #[test]
    fn assign_from_and_take() {
        let mut a = AttributeList::new();
        a.add_int64("n", 5).unwrap();
        let mut b = AttributeList::new();
        b.add_boolean("flag").unwrap();

        b.assign_from(&a).unwrap();
        assert_eq!(a, b);
        assert!(!b.contains_key("flag"));

        let moved = a.take();
        assert_eq!(a.size(), 0);
        assert!(!a.is_allocated());
        assert_eq!(moved.at("n").unwrap().as_int64().unwrap(), 5);
    }

    #[test]
    fn clear_resets_to_unallocated() {
        let mut list = AttributeList::new();
        list.add_hrtime("t", 123).unwrap();
        list.clear();
        assert!(!list.is_allocated());
        assert_eq!(list.size(), 0);
    }

    #[test]
    fn typed_get() {
        let mut list = AttributeList::new();
        list.add_uint16_array("ids", &[1, 2, 3]).unwrap();
        let value = list.get("ids").unwrap();
        assert_eq!(value.nv_type(), NvType::Uint16Array);
        assert_eq!(value.as_uint16_array(), Some(&[1u16, 2, 3][..]));
        assert!(list.get("none").is_none());
    }

    #[test]
    fn unallocated_equals_allocated_empty() {
        let mut a = AttributeList::new();
        a.add_boolean("x").unwrap();
        a.erase("x");
        assert!(a.is_allocated());
        assert_eq!(a, AttributeList::new());
    }
}
