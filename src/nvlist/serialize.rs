//! Serde export of attribute lists.
//!
//! Lists serialize as maps in iteration order, values as their natural serde
//! shape. Flags serialize as `true` and unrecognized entries as unit (`null`
//! in JSON). Tags are not preserved; use [`AttributeList::to_json`] with type
//! annotations when they matter.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::nvlist::AttributeList;
use crate::value::AttributeValue;

impl Serialize for AttributeList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.size()))?;
        for pair in self {
            map.serialize_entry(pair.key(), pair.value())?;
        }
        map.end()
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Boolean => serializer.serialize_bool(true),
            Self::BooleanValue(v) => serializer.serialize_bool(*v),
            Self::Byte(v) | Self::Uint8(v) => serializer.serialize_u8(*v),
            Self::Int8(v) => serializer.serialize_i8(*v),
            Self::Int16(v) => serializer.serialize_i16(*v),
            Self::Uint16(v) => serializer.serialize_u16(*v),
            Self::Int32(v) => serializer.serialize_i32(*v),
            Self::Uint32(v) => serializer.serialize_u32(*v),
            Self::Int64(v) | Self::Hrtime(v) => serializer.serialize_i64(*v),
            Self::Uint64(v) => serializer.serialize_u64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::List(v) => v.serialize(serializer),
            Self::BooleanArray(v) => v.serialize(serializer),
            Self::ByteArray(v) | Self::Uint8Array(v) => serializer.collect_seq(v),
            Self::Int8Array(v) => v.serialize(serializer),
            Self::Int16Array(v) => v.serialize(serializer),
            Self::Uint16Array(v) => v.serialize(serializer),
            Self::Int32Array(v) => v.serialize(serializer),
            Self::Uint32Array(v) => v.serialize(serializer),
            Self::Int64Array(v) => v.serialize(serializer),
            Self::Uint64Array(v) => v.serialize(serializer),
            Self::StringArray(v) => v.serialize(serializer),
            Self::ListArray(v) => v.serialize(serializer),
            Self::Unrecognized { .. } => serializer.serialize_unit(),
        }
    }
}

impl AttributeList {
    /// Converts to a `serde_json::Value` object.
    ///
    /// Later duplicates of a key overwrite earlier ones in the resulting object.
    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_nested_structure() {
        let mut child = AttributeList::new();
        child.add_string("path", "/dev/sda").unwrap();
        child.add_uint64("ashift", 12).unwrap();

        let mut root = AttributeList::new();
        root.add_boolean("is_log").unwrap();
        root.add_int64_array("time", &[100, 200]).unwrap();
        root.add_nvlist_array("children", &[child]).unwrap();
        root.add_byte_array("raw", &[0, 7]).unwrap();

        let value = root.to_json_value().unwrap();
        assert_eq!(
            value,
            json!({
                "is_log": true,
                "time": [100, 200],
                "children": [{ "path": "/dev/sda", "ashift": 12 }],
                "raw": [0, 7],
            })
        );
    }

    #[test]
    fn keeps_iteration_order_in_text() {
        let mut list = AttributeList::new();
        list.add_uint8("z", 1).unwrap();
        list.add_uint8("a", 2).unwrap();
        let text = serde_json::to_string(&list).unwrap();
        assert_eq!(text, r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn unrecognized_is_null() {
        let value = serde_json::to_value(AttributeValue::Unrecognized { code: 99 }).unwrap();
        assert!(value.is_null());
    }
}
