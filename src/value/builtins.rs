//! Per-type builtin methods and attributes.
//!
//! Member access on a value consults this table after its own data.
//! Methods resolve lazily into bound functions: the returned callable
//! closes over the receiver at access time, so `msg.upper` can be passed
//! around like any other value and called later.

use crate::error::{Error, ErrorKind};
use crate::value::args::{int_arg, str_arg, CallArgs};
use crate::value::{Value, ValueRepr};

/// Resolves a builtin member on a value.
pub(crate) fn get_builtin(value: &Value, name: &str) -> Option<Value> {
    match value.0 {
        ValueRepr::String(_) => string_builtin(value, name),
        ValueRepr::Seq(_) | ValueRepr::Tuple(_) => match name {
            "length" => Some(Value::from(value.len().unwrap_or(0))),
            _ => None,
        },
        ValueRepr::Map(_) | ValueRepr::Kwargs(_) => object_builtin(value, name),
        _ => None,
    }
}

fn bound<F>(name: &str, receiver: &Value, f: F) -> Option<Value>
where
    F: Fn(&Value, &[Value]) -> Result<Value, Error> + 'static,
{
    let receiver = receiver.clone();
    Some(Value::from_func(Some(name.to_string()), move |args, _env| {
        f(&receiver, args)
    }))
}

fn receiver_str(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

fn string_builtin(value: &Value, name: &str) -> Option<Value> {
    match name {
        "length" => Some(Value::from(value.len().unwrap_or(0))),
        "upper" => bound(name, value, |v, args| {
            ok!(CallArgs::new(args).expect("upper", &[]));
            Ok(Value::from(receiver_str(v).to_uppercase()))
        }),
        "lower" => bound(name, value, |v, args| {
            ok!(CallArgs::new(args).expect("lower", &[]));
            Ok(Value::from(receiver_str(v).to_lowercase()))
        }),
        "strip" => bound(name, value, |v, args| {
            strip_method("strip", args, v, StripMode::Both)
        }),
        "lstrip" => bound(name, value, |v, args| {
            strip_method("lstrip", args, v, StripMode::Start)
        }),
        "rstrip" => bound(name, value, |v, args| {
            strip_method("rstrip", args, v, StripMode::End)
        }),
        "title" => bound(name, value, |v, args| {
            ok!(CallArgs::new(args).expect("title", &[]));
            Ok(Value::from(str_title(receiver_str(v))))
        }),
        "capitalize" => bound(name, value, |v, args| {
            ok!(CallArgs::new(args).expect("capitalize", &[]));
            Ok(Value::from(str_capitalize(receiver_str(v))))
        }),
        "startswith" => bound(name, value, |v, args| {
            affix_method("startswith", args, v, |s, affix| s.starts_with(affix))
        }),
        "endswith" => bound(name, value, |v, args| {
            affix_method("endswith", args, v, |s, affix| s.ends_with(affix))
        }),
        "split" => bound(name, value, |v, args| {
            let args = CallArgs::new(args);
            ok!(args.expect("split", &["sep", "maxsplit"]));
            let sep = args.get(0, "sep").unwrap_or(Value::NONE);
            let maxsplit = match args.get(1, "maxsplit") {
                Some(val) => ok!(int_arg("split", "maxsplit", &val)),
                None => -1,
            };
            let sep = match sep.0 {
                ValueRepr::Undefined | ValueRepr::None => None,
                _ => Some(ok!(str_arg("split", "sep", &sep))),
            };
            let parts = ok!(str_split(receiver_str(v), sep.as_deref(), maxsplit));
            Ok(Value::from_items(
                parts.into_iter().map(Value::from).collect(),
            ))
        }),
        "splitlines" => bound(name, value, |v, args| {
            let args = CallArgs::new(args);
            ok!(args.expect("splitlines", &["keepends"]));
            let keepends = args
                .get(0, "keepends")
                .map(|val| val.is_true())
                .unwrap_or(false);
            let s = receiver_str(v);
            let mut rv = Vec::new();
            if !keepends {
                rv.extend(s.lines().map(Value::from));
            } else {
                let mut rest = s;
                while let Some(offset) = rest.find('\n') {
                    rv.push(Value::from(&rest[..offset + 1]));
                    rest = &rest[offset + 1..];
                }
                if !rest.is_empty() {
                    rv.push(Value::from(rest));
                }
            }
            Ok(Value::from_items(rv))
        }),
        "replace" => bound(name, value, |v, args| {
            let args = CallArgs::new(args);
            ok!(args.expect("replace", &["old", "new", "count"]));
            let old = ok!(str_arg(
                "replace",
                "old",
                &ok!(args.require("replace", 0, "old"))
            ));
            let new = ok!(str_arg(
                "replace",
                "new",
                &ok!(args.require("replace", 1, "new"))
            ));
            let count = args.get(2, "count").unwrap_or(Value::NONE);
            Ok(Value::from(ok!(str_replace(
                receiver_str(v),
                &old,
                &new,
                &count
            ))))
        }),
        "find" => bound(name, value, |v, args| {
            find_method("find", args, v, |s, sub| s.find(sub))
        }),
        "rfind" => bound(name, value, |v, args| {
            find_method("rfind", args, v, |s, sub| s.rfind(sub))
        }),
        "count" => bound(name, value, |v, args| {
            let args = CallArgs::new(args);
            ok!(args.expect("count", &["sub"]));
            let sub = ok!(str_arg(
                "count",
                "sub",
                &ok!(args.require("count", 0, "sub"))
            ));
            let mut c = 0;
            let mut rest = receiver_str(v);
            if !sub.is_empty() {
                while let Some(offset) = rest.find(&sub) {
                    c += 1;
                    rest = &rest[offset + sub.len()..];
                }
            }
            Ok(Value::from(c))
        }),
        _ => None,
    }
}

enum StripMode {
    Both,
    Start,
    End,
}

fn strip_method(
    what: &'static str,
    args: &[Value],
    value: &Value,
    mode: StripMode,
) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect(what, &["chars"]));
    let s = receiver_str(value);
    Ok(Value::from(match args.get(0, "chars") {
        Some(chars) if !chars.is_none() && !chars.is_undefined() => {
            let chars: Vec<char> = ok!(str_arg(what, "chars", &chars)).chars().collect();
            match mode {
                StripMode::Both => s.trim_matches(&chars[..]),
                StripMode::Start => s.trim_start_matches(&chars[..]),
                StripMode::End => s.trim_end_matches(&chars[..]),
            }
            .to_string()
        }
        _ => match mode {
            StripMode::Both => s.trim(),
            StripMode::Start => s.trim_start(),
            StripMode::End => s.trim_end(),
        }
        .to_string(),
    }))
}

fn affix_method(
    what: &'static str,
    args: &[Value],
    value: &Value,
    matches: impl Fn(&str, &str) -> bool,
) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect(what, &["affix"]));
    let affix = ok!(args.require(what, 0, "affix"));
    let s = receiver_str(value);
    if let Some(affix) = affix.as_str() {
        return Ok(Value::from(matches(s, affix)));
    }
    if let Some(items) = affix.as_seq_items() {
        for item in items {
            let affix = item.as_str().ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!(
                        "tuple for {} must contain only strings, not {}",
                        what,
                        item.kind()
                    ),
                )
            })?;
            if matches(s, affix) {
                return Ok(Value::from(true));
            }
        }
        return Ok(Value::from(false));
    }
    Err(Error::new(
        ErrorKind::InvalidOperation,
        format!(
            "{} argument must be a string or a tuple of strings, not {}",
            what,
            affix.kind()
        ),
    ))
}

fn find_method(
    what: &'static str,
    args: &[Value],
    value: &Value,
    locate: impl Fn(&str, &str) -> Option<usize>,
) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect(what, &["sub"]));
    let sub = ok!(str_arg(what, "sub", &ok!(args.require(what, 0, "sub"))));
    let s = receiver_str(value);
    Ok(Value::from(match locate(s, &sub) {
        // byte offset back to a code point index
        Some(pos) => s[..pos].chars().count() as i64,
        None => -1,
    }))
}

fn object_builtin(value: &Value, name: &str) -> Option<Value> {
    match name {
        "get" => bound(name, value, |v, args| {
            let args = CallArgs::new(args);
            ok!(args.expect("get", &["key", "default"]));
            let key = ok!(str_arg("get", "key", &ok!(args.require("get", 0, "key"))));
            let default = args.get(1, "default").unwrap_or(Value::NONE);
            Ok(v
                .as_map_entries()
                .unwrap_or_default()
                .into_iter()
                .find(|(k, _)| *k == key)
                .map(|(_, val)| val)
                .unwrap_or(default))
        }),
        "keys" => bound(name, value, |v, args| {
            ok!(CallArgs::new(args).expect("keys", &[]));
            Ok(Value::from_items(
                v.as_map_entries()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, _)| Value::from(k))
                    .collect(),
            ))
        }),
        "values" => bound(name, value, |v, args| {
            ok!(CallArgs::new(args).expect("values", &[]));
            Ok(Value::from_items(
                v.as_map_entries()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(_, val)| val)
                    .collect(),
            ))
        }),
        "items" => bound(name, value, |v, args| {
            ok!(CallArgs::new(args).expect("items", &[]));
            Ok(object_items(v))
        }),
        _ => None,
    }
}

/// Returns an object's entries as an array of two-element arrays.
pub(crate) fn object_items(value: &Value) -> Value {
    Value::from_items(
        value
            .as_map_entries()
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| Value::from_items(vec![Value::from(k), v]))
            .collect(),
    )
}

/// Title-cases each whitespace-separated word.
pub(crate) fn str_title(s: &str) -> String {
    let mut rv = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            rv.push(c);
        } else if at_word_start {
            rv.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            rv.extend(c.to_lowercase());
        }
    }
    rv
}

/// Uppercases the first code point, lowercases the rest.
pub(crate) fn str_capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Python's `str.split`.
///
/// Without a separator, runs of whitespace split and leading whitespace is
/// trimmed; once `maxsplit` splits happened the remainder (interior
/// whitespace included) becomes the final element.  With a separator, the
/// tail after `maxsplit` splits stays joined by it.  An empty separator is
/// an error.
pub(crate) fn str_split(s: &str, sep: Option<&str>, maxsplit: i64) -> Result<Vec<String>, Error> {
    match sep {
        Some("") => Err(Error::new(ErrorKind::InvalidArguments, "empty separator")),
        Some(sep) => Ok(if maxsplit < 0 {
            s.split(sep).map(Into::into).collect()
        } else {
            s.splitn(maxsplit as usize + 1, sep).map(Into::into).collect()
        }),
        None => {
            let mut rv = Vec::new();
            let mut rest = s.trim_start();
            let mut splits = 0;
            while !rest.is_empty() {
                if maxsplit >= 0 && splits >= maxsplit {
                    rv.push(rest.to_string());
                    break;
                }
                match rest.find(char::is_whitespace) {
                    Some(pos) => {
                        rv.push(rest[..pos].to_string());
                        rest = rest[pos..].trim_start();
                        splits += 1;
                    }
                    None => {
                        rv.push(rest.to_string());
                        break;
                    }
                }
            }
            Ok(rv)
        }
    }
}

/// Python's `str.replace`: replace the first `count` left-to-right
/// non-overlapping occurrences, or all of them when `count` is none.
pub(crate) fn str_replace(s: &str, old: &str, new: &str, count: &Value) -> Result<String, Error> {
    Ok(match count.0 {
        ValueRepr::Undefined | ValueRepr::None => s.replace(old, new),
        _ => {
            let count = ok!(int_arg("replace", "count", count));
            if count < 0 {
                s.replace(old, new)
            } else {
                s.replacen(old, new, count as usize)
            }
        }
    })
}

/// Builds the object value for missing-map situations in tests.
#[cfg(test)]
pub(crate) fn map_of(entries: &[(&str, Value)]) -> Value {
    let mut map = crate::value::ValueMap::new();
    for (k, v) in entries {
        map.insert((*k).into(), v.clone());
    }
    Value::from_map(map)
}
