//! Renders runtime values as JSON.
//!
//! This backs the `tojson` filter.  The flat layout joins entries with
//! `", "`; the indented layout breaks after every bracket and pads each
//! depth level by the requested number of spaces.

use std::fmt::{self, Write};

use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueRepr};

/// Renders a value as JSON text.
///
/// `none` and `undefined` serialize as `null`; non-finite floats also
/// degrade to `null`.  Functions do not serialize.
pub fn to_json(value: &Value, indent: Option<usize>) -> Result<String, Error> {
    let mut out = String::new();
    ok!(write_json(&mut out, value, indent, 0));
    Ok(out)
}

fn write_json(out: &mut String, value: &Value, indent: Option<usize>, depth: usize) -> Result<(), Error> {
    match &value.0 {
        ValueRepr::Undefined | ValueRepr::None => ok!(write_str(out, "null")),
        ValueRepr::Bool(val) => ok!(write!(out, "{val}").map_err(Error::from)),
        ValueRepr::Int(val) => ok!(write!(out, "{val}").map_err(Error::from)),
        ValueRepr::Float(val) => match serde_json::Number::from_f64(*val) {
            Some(num) => ok!(write!(out, "{num}").map_err(Error::from)),
            None => ok!(write_str(out, "null")),
        },
        ValueRepr::String(val) => ok!(write_escaped_str(out, val).map_err(Error::from)),
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => {
            let items = value.as_seq_items().unwrap_or_default();
            if items.is_empty() {
                return write_str(out, "[]");
            }
            ok!(write_str(out, "["));
            for (idx, item) in items.iter().enumerate() {
                ok!(write_separator(out, idx, indent, depth));
                ok!(write_json(out, item, indent, depth + 1));
            }
            ok!(write_close(out, indent, depth));
            ok!(write_str(out, "]"));
        }
        ValueRepr::Map(_) | ValueRepr::Kwargs(_) => {
            let entries = value.as_map_entries().unwrap_or_default();
            if entries.is_empty() {
                return write_str(out, "{}");
            }
            ok!(write_str(out, "{"));
            for (idx, (key, val)) in entries.iter().enumerate() {
                ok!(write_separator(out, idx, indent, depth));
                ok!(write_escaped_str(out, key).map_err(Error::from));
                ok!(write_str(out, ": "));
                ok!(write_json(out, val, indent, depth + 1));
            }
            ok!(write_close(out, indent, depth));
            ok!(write_str(out, "}"));
        }
        ValueRepr::Func(_) => {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "cannot serialize a function to JSON",
            ))
        }
    }
    Ok(())
}

fn write_str(out: &mut String, s: &str) -> Result<(), Error> {
    out.write_str(s).map_err(Error::from)
}

fn write_separator(
    out: &mut String,
    idx: usize,
    indent: Option<usize>,
    depth: usize,
) -> Result<(), Error> {
    match indent {
        Some(width) => {
            if idx > 0 {
                ok!(write_str(out, ","));
            }
            ok!(write_str(out, "\n"));
            for _ in 0..width * (depth + 1) {
                ok!(write_str(out, " "));
            }
        }
        None if idx > 0 => ok!(write_str(out, ", ")),
        None => {}
    }
    Ok(())
}

fn write_close(out: &mut String, indent: Option<usize>, depth: usize) -> Result<(), Error> {
    if let Some(width) = indent {
        ok!(write_str(out, "\n"));
        for _ in 0..width * depth {
            ok!(write_str(out, " "));
        }
    }
    Ok(())
}

/// Writes a string as a quoted JSON string literal.
pub(crate) fn write_escaped_str<W: fmt::Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}
