//! Diagnostic text export.
//!
//! Output is deterministic and tab-indented, one entry per line:
//!
//! ```text
//! {
//! 	"name": "tank",
//! 	"guid": <uint64> 42,
//! 	"vdev": {
//! 		"type": "root"
//! 	}
//! }
//! ```
//!
//! It is meant for humans. Nothing reads it back, and the number/string
//! distinction of the tags only survives when type annotations are
//! requested.

use std::fmt::{self, Display, Write};

use crate::nvlist::AttributeList;
use crate::value::AttributeValue;

/// Display adapter rendering a list as annotated or plain text.
#[derive(Debug, Clone, Copy)]
pub struct JsonView<'a> {
    list: &'a AttributeList,
    with_types: bool,
}

impl<'a> JsonView<'a> {
    /// Wraps `list`. With `with_types`, every value is prefixed by `<typename> `.
    #[must_use]
    pub const fn new(list: &'a AttributeList, with_types: bool) -> Self {
        Self { list, with_types }
    }
}

impl Display for JsonView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_object(f, self.list, 0, self.with_types)
    }
}

impl AttributeList {
    /// Renders the list as indented JSON-like text.
    ///
    /// # Examples
    ///
    /// ```
    /// use nvkit::AttributeList;
    ///
    /// let mut list = AttributeList::new();
    /// list.add_uint64("eid", 7)?;
    /// assert_eq!(list.to_json(false), "{\n\t\"eid\": 7\n}");
    /// assert_eq!(list.to_json(true), "{\n\t\"eid\": <uint64> 7\n}");
    /// # Ok::<(), nvkit::NvError>(())
    /// ```
    #[must_use]
    pub fn to_json(&self, with_types: bool) -> String {
        JsonView::new(self, with_types).to_string()
    }
}

impl Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_object(f, self, 0, false)
    }
}

fn write_indent<W: Write>(out: &mut W, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        out.write_char('\t')?;
    }
    Ok(())
}

fn write_object<W: Write>(
    out: &mut W,
    list: &AttributeList,
    depth: usize,
    with_types: bool,
) -> fmt::Result {
    out.write_char('{')?;
    for (idx, pair) in list.iter().enumerate() {
        if idx > 0 {
            out.write_char(',')?;
        }
        out.write_char('\n')?;
        write_indent(out, depth + 1)?;
        write_escaped(out, pair.key())?;
        out.write_str(": ")?;
        if with_types {
            write!(out, "<{}> ", pair.nv_type())?;
        }
        write_value(out, pair.value(), depth, with_types)?;
    }
    out.write_char('\n')?;
    write_indent(out, depth)?;
    out.write_char('}')
}

fn write_value<W: Write>(
    out: &mut W,
    value: &AttributeValue,
    depth: usize,
    with_types: bool,
) -> fmt::Result {
    match value {
        AttributeValue::Boolean => out.write_str("true"),
        AttributeValue::BooleanValue(v) => write!(out, "{v}"),
        AttributeValue::Byte(v) | AttributeValue::Uint8(v) => write!(out, "{v}"),
        AttributeValue::Int8(v) => write!(out, "{v}"),
        AttributeValue::Int16(v) => write!(out, "{v}"),
        AttributeValue::Uint16(v) => write!(out, "{v}"),
        AttributeValue::Int32(v) => write!(out, "{v}"),
        AttributeValue::Uint32(v) => write!(out, "{v}"),
        AttributeValue::Int64(v) | AttributeValue::Hrtime(v) => write!(out, "{v}"),
        AttributeValue::Uint64(v) => write!(out, "{v}"),
        AttributeValue::String(s) => write_escaped(out, s),
        AttributeValue::List(nested) => write_object(out, nested, depth + 1, with_types),
        AttributeValue::BooleanArray(v) => write_array(out, v),
        AttributeValue::ByteArray(v) | AttributeValue::Uint8Array(v) => write_array(out, v),
        AttributeValue::Int8Array(v) => write_array(out, v),
        AttributeValue::Int16Array(v) => write_array(out, v),
        AttributeValue::Uint16Array(v) => write_array(out, v),
        AttributeValue::Int32Array(v) => write_array(out, v),
        AttributeValue::Uint32Array(v) => write_array(out, v),
        AttributeValue::Int64Array(v) => write_array(out, v),
        AttributeValue::Uint64Array(v) => write_array(out, v),
        AttributeValue::StringArray(items) => {
            out.write_str("[ ")?;
            for (idx, s) in items.iter().enumerate() {
                if idx > 0 {
                    out.write_str(", ")?;
                }
                write_escaped(out, s)?;
            }
            out.write_str(" ]")
        }
        AttributeValue::ListArray(items) => {
            out.write_str("[ ")?;
            for (idx, nested) in items.iter().enumerate() {
                if idx > 0 {
                    out.write_str(",\n")?;
                }
                write_object(out, nested, depth + 1, with_types)?;
            }
            out.write_str(" ]")
        }
        AttributeValue::Unrecognized { .. } => out.write_str("null"),
    }
}

fn write_array<W: Write, T: Display>(out: &mut W, items: &[T]) -> fmt::Result {
    out.write_str("[ ")?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{item}")?;
    }
    out.write_str(" ]")
}

/// Writes `s` as a quoted string, escaping `\`, `"` and control characters.
fn write_escaped<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '\\' => out.write_str("\\\\")?,
            '"' => out.write_str("\\\"")?,
            c if u32::from(c) < 0x20 => write!(out, "\\u{:04X}", u32::from(c))?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvlist::RawPair;

    #[test]
    fn empty_list() {
        assert_eq!(AttributeList::new().to_json(false), "{\n}");
        assert_eq!(AttributeList::new().to_json(true), "{\n}");
    }

    #[test]
    fn scalars_and_annotations() {
        let mut list = AttributeList::new();
        list.add_string("name", "tank").unwrap();
        list.add_int32("delta", -4).unwrap();
        list.add_boolean("flag").unwrap();
        list.add_boolean_value("off", false).unwrap();

        assert_eq!(
            list.to_json(false),
            "{\n\t\"name\": \"tank\",\n\t\"delta\": -4,\n\t\"flag\": true,\n\t\"off\": false\n}"
        );
        assert_eq!(
            list.to_json(true),
            "{\n\t\"name\": <string> \"tank\",\n\t\"delta\": <int32> -4,\n\t\"flag\": <boolean> true,\n\t\"off\": <boolean_value> false\n}"
        );
    }

    #[test]
    fn escapes_strings() {
        let mut list = AttributeList::new();
        list.add_string("s", "a\"b\\c\n\u{1}é").unwrap();
        assert_eq!(
            list.to_json(false),
            "{\n\t\"s\": \"a\\\"b\\\\c\\u000A\\u0001é\"\n}"
        );
    }

    #[test]
    fn arrays() {
        let mut list = AttributeList::new();
        list.add_uint8_array("bytes", &[1, 2, 255]).unwrap();
        list.add_boolean_array("bits", &[true, false]).unwrap();
        list.add_string_array("names", &["a", "\"b\""]).unwrap();
        list.add_int64_array("none", &[]).unwrap();
        assert_eq!(
            list.to_json(false),
            "{\n\t\"bytes\": [ 1, 2, 255 ],\n\t\"bits\": [ true, false ],\n\t\"names\": [ \"a\", \"\\\"b\\\"\" ],\n\t\"none\": [  ]\n}"
        );
    }

    #[test]
    fn nested_lists_indent() {
        let mut child = AttributeList::new();
        child.add_string("type", "file").unwrap();
        let mut root = AttributeList::new();
        root.add_string("type", "root").unwrap();
        root.add_nvlist("vdev", &child).unwrap();
        assert_eq!(
            root.to_json(false),
            "{\n\t\"type\": \"root\",\n\t\"vdev\": {\n\t\t\"type\": \"file\"\n\t}\n}"
        );
    }

    #[test]
    fn list_arrays_are_newline_separated() {
        let mut a = AttributeList::new();
        a.add_uint64("n", 1).unwrap();
        let mut b = AttributeList::new();
        b.add_uint64("n", 2).unwrap();
        let mut root = AttributeList::new();
        root.add_nvlist_array("children", &[a, b]).unwrap();
        assert_eq!(
            root.to_json(false),
            "{\n\t\"children\": [ {\n\t\t\"n\": 1\n\t},\n{\n\t\t\"n\": 2\n\t} ]\n}"
        );
    }

    #[test]
    fn unrecognized_renders_null() {
        let list: AttributeList = vec![RawPair::new("x", AttributeValue::Unrecognized { code: 27 })]
            .into_iter()
            .collect();
        assert_eq!(list.to_json(false), "{\n\t\"x\": null\n}");
        assert_eq!(list.to_json(true), "{\n\t\"x\": <unknown> null\n}");
    }

    #[test]
    fn display_matches_plain_export() {
        let mut list = AttributeList::new();
        list.add_hrtime("t", 10).unwrap();
        assert_eq!(list.to_string(), list.to_json(false));
        assert_eq!(JsonView::new(&list, true).to_string(), list.to_json(true));
    }
}
