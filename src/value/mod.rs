//! Provides the dynamic value type the interpreter operates on.
//!
//! Template evaluation is dynamically typed with Python flavored
//! semantics: empty containers are falsy, `1 == 1.0` holds, strings
//! iterate by code point.  Each value is a cheaply clonable handle; the
//! container variants share their storage through reference counting and
//! the mutable ones (`array`, `object`) add interior mutability so that
//! `{% set ns.attr = ... %}` can write through an existing handle.
//!
//! Host data enters the runtime through serde:
//!
//! ```
//! # use chatjinja::value::Value;
//! let value = Value::from_serializable(&[1, 2, 3]);
//! ```
//!
//! Undefined is its own variant, distinct from none: looking up a
//! variable that was never bound yields [`Value::UNDEFINED`], which
//! renders as an empty string and is falsy.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::environment::EnvRef;
use crate::error::{Error, ErrorKind};

pub(crate) mod args;
pub(crate) mod builtins;
pub mod json;
pub(crate) mod ops;
mod serialize;

pub use self::serialize::ValueSerializer;

// the type we want to use for refcounting.  The interpreter is a
// single-threaded tree walk, so plain `Rc` does.
pub(crate) type RcType<T> = Rc<T>;

/// The insertion-ordered map type backing objects.
pub type ValueMap = IndexMap<String, Value>;

/// The signature of callable values.
///
/// Callables receive the evaluated positional arguments (with a trailing
/// kwargs value when keyword arguments were present) and the environment
/// of the call site.
pub type FuncType = dyn Fn(&[Value], &EnvRef) -> Result<Value, Error>;

pub(crate) struct FuncObject {
    pub(crate) name: Option<String>,
    pub(crate) f: Box<FuncType>,
}

impl fmt::Debug for FuncObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(ref name) => write!(f, "<function {name}>"),
            None => write!(f, "<function>"),
        }
    }
}

/// Describes the kind of value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Undefined,
    None,
    Bool,
    Int,
    Float,
    String,
    Array,
    Tuple,
    Object,
    Kwargs,
    Function,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Undefined => "undefined",
            ValueKind::None => "none",
            ValueKind::Bool => "bool",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Tuple => "tuple",
            ValueKind::Object => "object",
            ValueKind::Kwargs => "kwargs",
            ValueKind::Function => "function",
        })
    }
}

#[derive(Clone)]
pub(crate) enum ValueRepr {
    Undefined,
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(RcType<String>),
    Seq(RcType<RefCell<Vec<Value>>>),
    Tuple(RcType<Vec<Value>>),
    Map(RcType<RefCell<ValueMap>>),
    Kwargs(RcType<RefCell<ValueMap>>),
    Func(RcType<FuncObject>),
}

/// Represents a dynamically typed value in the template engine.
#[derive(Clone)]
pub struct Value(pub(crate) ValueRepr);

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ValueRepr::Undefined => write!(f, "undefined"),
            ValueRepr::None => write!(f, "none"),
            ValueRepr::Bool(val) => fmt::Debug::fmt(val, f),
            ValueRepr::Int(val) => fmt::Debug::fmt(val, f),
            ValueRepr::Float(val) => fmt::Debug::fmt(val, f),
            ValueRepr::String(val) => fmt::Debug::fmt(val, f),
            ValueRepr::Seq(val) => fmt::Debug::fmt(&*val.borrow(), f),
            ValueRepr::Tuple(val) => {
                let mut t = f.debug_tuple("");
                for item in val.iter() {
                    t.field(item);
                }
                t.finish()
            }
            ValueRepr::Map(val) | ValueRepr::Kwargs(val) => {
                f.debug_map().entries(val.borrow().iter()).finish()
            }
            ValueRepr::Func(val) => fmt::Debug::fmt(val, f),
        }
    }
}

impl From<ValueRepr> for Value {
    #[inline(always)]
    fn from(val: ValueRepr) -> Value {
        Value(val)
    }
}

impl<'a> From<&'a str> for Value {
    #[inline(always)]
    fn from(val: &'a str) -> Self {
        ValueRepr::String(RcType::new(val.into())).into()
    }
}

impl From<String> for Value {
    #[inline(always)]
    fn from(val: String) -> Self {
        ValueRepr::String(RcType::new(val)).into()
    }
}

impl From<()> for Value {
    #[inline(always)]
    fn from(_: ()) -> Self {
        ValueRepr::None.into()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Self {
        Value::from_items(val.into_iter().map(Into::into).collect())
    }
}

impl From<ValueMap> for Value {
    fn from(val: ValueMap) -> Self {
        Value::from_map(val)
    }
}

macro_rules! value_from {
    ($src:ty, $dst:ident) => {
        impl From<$src> for Value {
            #[inline(always)]
            fn from(val: $src) -> Self {
                ValueRepr::$dst(val as _).into()
            }
        }
    };
}

value_from!(bool, Bool);
value_from!(u8, Int);
value_from!(u16, Int);
value_from!(u32, Int);
value_from!(i8, Int);
value_from!(i16, Int);
value_from!(i32, Int);
value_from!(i64, Int);
value_from!(usize, Int);
value_from!(f32, Float);
value_from!(f64, Float);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            // none and undefined render empty so that concatenation and
            // emission silently drop them
            ValueRepr::Undefined | ValueRepr::None => Ok(()),
            ValueRepr::Bool(val) => write!(f, "{val}"),
            ValueRepr::Int(val) => write!(f, "{val}"),
            ValueRepr::Float(val) => fmt_float(f, *val),
            ValueRepr::String(val) => write!(f, "{val}"),
            ValueRepr::Seq(_)
            | ValueRepr::Tuple(_)
            | ValueRepr::Map(_)
            | ValueRepr::Kwargs(_) => fmt_compound(f, self),
            ValueRepr::Func(val) => write!(f, "{val:?}"),
        }
    }
}

fn fmt_float(f: &mut fmt::Formatter<'_>, val: f64) -> fmt::Result {
    if val.is_finite() && val == val.trunc() {
        write!(f, "{val:.1}")
    } else {
        write!(f, "{val}")
    }
}

// repr-style rendering for values nested inside containers: strings get
// quoted, none becomes null, so that `{{ [1, "a"] }}` reads back.
fn fmt_repr(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match &value.0 {
        ValueRepr::Undefined | ValueRepr::None => f.write_str("null"),
        ValueRepr::String(val) => json::write_escaped_str(f, val),
        _ => fmt::Display::fmt(value, f),
    }
}

fn fmt_compound(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match &value.0 {
        ValueRepr::Seq(items) => fmt_items(f, &items.borrow()),
        ValueRepr::Tuple(items) => fmt_items(f, items),
        ValueRepr::Map(map) | ValueRepr::Kwargs(map) => {
            f.write_str("{")?;
            for (idx, (key, val)) in map.borrow().iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                json::write_escaped_str(f, key)?;
                f.write_str(": ")?;
                fmt_repr(f, val)?;
            }
            f.write_str("}")
        }
        _ => unreachable!(),
    }
}

fn fmt_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    f.write_str("[")?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        fmt_repr(f, item)?;
    }
    f.write_str("]")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        ops::loose_eq(self, other)
    }
}

impl Default for Value {
    fn default() -> Value {
        ValueRepr::Undefined.into()
    }
}

impl Value {
    /// The undefined value.
    pub const UNDEFINED: Value = Value(ValueRepr::Undefined);

    /// The none value.
    pub const NONE: Value = Value(ValueRepr::None);

    /// Creates an array value from a vector of items.
    pub fn from_items(items: Vec<Value>) -> Value {
        ValueRepr::Seq(RcType::new(RefCell::new(items))).into()
    }

    /// Creates a tuple value from a vector of items.
    pub fn from_tuple(items: Vec<Value>) -> Value {
        ValueRepr::Tuple(RcType::new(items)).into()
    }

    /// Creates an object value from a map.
    pub fn from_map(map: ValueMap) -> Value {
        ValueRepr::Map(RcType::new(RefCell::new(map))).into()
    }

    /// Creates a kwargs payload from a map.
    pub fn from_kwargs(map: ValueMap) -> Value {
        ValueRepr::Kwargs(RcType::new(RefCell::new(map))).into()
    }

    /// Creates a callable value.
    pub fn from_func<F>(name: Option<String>, f: F) -> Value
    where
        F: Fn(&[Value], &EnvRef) -> Result<Value, Error> + 'static,
    {
        ValueRepr::Func(RcType::new(FuncObject {
            name,
            f: Box::new(f),
        }))
        .into()
    }

    /// Creates a value from something that can be serialized.
    ///
    /// This is how context data enters the runtime: integers become
    /// integer values, floats float values, sequences arrays, maps
    /// objects, unit and `Option::None` the none value.
    pub fn from_serializable<T: serde::Serialize>(value: &T) -> Value {
        value
            .serialize(ValueSerializer)
            .unwrap_or(Value::UNDEFINED)
    }

    /// Returns the value kind.
    pub fn kind(&self) -> ValueKind {
        match self.0 {
            ValueRepr::Undefined => ValueKind::Undefined,
            ValueRepr::None => ValueKind::None,
            ValueRepr::Bool(_) => ValueKind::Bool,
            ValueRepr::Int(_) => ValueKind::Int,
            ValueRepr::Float(_) => ValueKind::Float,
            ValueRepr::String(_) => ValueKind::String,
            ValueRepr::Seq(_) => ValueKind::Array,
            ValueRepr::Tuple(_) => ValueKind::Tuple,
            ValueRepr::Map(_) => ValueKind::Object,
            ValueRepr::Kwargs(_) => ValueKind::Kwargs,
            ValueRepr::Func(_) => ValueKind::Function,
        }
    }

    /// Is this value truthy?
    pub fn is_true(&self) -> bool {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None => false,
            ValueRepr::Bool(val) => *val,
            ValueRepr::Int(val) => *val != 0,
            ValueRepr::Float(val) => *val != 0.0,
            ValueRepr::String(val) => !val.is_empty(),
            ValueRepr::Seq(val) => !val.borrow().is_empty(),
            ValueRepr::Tuple(val) => !val.is_empty(),
            ValueRepr::Map(val) | ValueRepr::Kwargs(val) => !val.borrow().is_empty(),
            ValueRepr::Func(_) => true,
        }
    }

    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, ValueRepr::Undefined)
    }

    /// Returns true if this value is none.
    pub fn is_none(&self) -> bool {
        matches!(self.0, ValueRepr::None)
    }

    /// Returns true if this value is a kwargs payload.
    pub(crate) fn is_kwargs(&self) -> bool {
        matches!(self.0, ValueRepr::Kwargs(_))
    }

    /// If the value is a string, returns it.
    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            ValueRepr::String(val) => Some(val.as_str()),
            _ => None,
        }
    }

    /// If the value is an integer, returns it.
    pub fn as_int(&self) -> Option<i64> {
        match self.0 {
            ValueRepr::Int(val) => Some(val),
            _ => None,
        }
    }

    /// If the value is a sequence (array or tuple), returns its items.
    pub fn as_seq_items(&self) -> Option<Vec<Value>> {
        match &self.0 {
            ValueRepr::Seq(items) => Some(items.borrow().clone()),
            ValueRepr::Tuple(items) => Some(items.as_ref().clone()),
            _ => None,
        }
    }

    /// If the value is an object (or kwargs payload), returns a copy of
    /// its entries in insertion order.
    pub fn as_map_entries(&self) -> Option<Vec<(String, Value)>> {
        match &self.0 {
            ValueRepr::Map(map) | ValueRepr::Kwargs(map) => Some(
                map.borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Returns the length of strings (in code points), sequences and
    /// objects.
    pub fn len(&self) -> Option<usize> {
        match &self.0 {
            ValueRepr::String(val) => Some(val.chars().count()),
            ValueRepr::Seq(val) => Some(val.borrow().len()),
            ValueRepr::Tuple(val) => Some(val.len()),
            ValueRepr::Map(val) | ValueRepr::Kwargs(val) => Some(val.borrow().len()),
            _ => None,
        }
    }

    /// Looks up an attribute by name.
    ///
    /// Object data is consulted first, then the per-type builtin table.
    /// Missing attributes yield undefined, never an error.
    pub fn get_attr(&self, name: &str) -> Value {
        if let ValueRepr::Map(ref map) | ValueRepr::Kwargs(ref map) = self.0 {
            if let Some(val) = map.borrow().get(name) {
                return val.clone();
            }
        }
        builtins::get_builtin(self, name).unwrap_or(Value::UNDEFINED)
    }

    /// Looks up an item by a computed subscript.
    ///
    /// Objects take string keys; arrays, tuples and strings take integer
    /// indexes (negative counts from the end) or a string for builtins
    /// lookup.  Missing items yield undefined; a key of the wrong type
    /// for the receiver fails.
    pub fn get_item(&self, key: &Value) -> Result<Value, Error> {
        match &self.0 {
            ValueRepr::Map(_) | ValueRepr::Kwargs(_) => match key.as_str() {
                Some(name) => Ok(self.get_attr(name)),
                None => Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("object keys must be strings, got {}", key.kind()),
                )),
            },
            ValueRepr::Seq(_) | ValueRepr::Tuple(_) | ValueRepr::String(_) => {
                if let Some(name) = key.as_str() {
                    return Ok(builtins::get_builtin(self, name).unwrap_or(Value::UNDEFINED));
                }
                let idx = match key.as_int() {
                    Some(idx) => idx,
                    None => {
                        return Err(Error::new(
                            ErrorKind::InvalidOperation,
                            format!(
                                "cannot index {} with a {} subscript",
                                self.kind(),
                                key.kind()
                            ),
                        ))
                    }
                };
                if let ValueRepr::String(ref s) = self.0 {
                    let count = s.chars().count();
                    return Ok(match abs_index(idx, count) {
                        Some(i) => s
                            .chars()
                            .nth(i)
                            .map(|c| Value::from(c.to_string()))
                            .unwrap_or(Value::UNDEFINED),
                        None => Value::UNDEFINED,
                    });
                }
                let items = self.as_seq_items().unwrap_or_default();
                Ok(match abs_index(idx, items.len()) {
                    Some(i) => items.get(i).cloned().unwrap_or(Value::UNDEFINED),
                    None => Value::UNDEFINED,
                })
            }
            ValueRepr::Undefined | ValueRepr::None => Ok(Value::UNDEFINED),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("value of type {} cannot be indexed", self.kind()),
            )),
        }
    }

    /// Writes an attribute into an object.
    pub fn set_attr(&self, name: &str, value: Value) -> Result<(), Error> {
        match &self.0 {
            ValueRepr::Map(map) | ValueRepr::Kwargs(map) => {
                map.borrow_mut().insert(name.into(), value);
                Ok(())
            }
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("cannot assign attributes on {}", self.kind()),
            )),
        }
    }

    /// Calls the value with the given arguments.
    pub fn call(&self, call_args: &[Value], env: &EnvRef) -> Result<Value, Error> {
        match &self.0 {
            ValueRepr::Func(func) => (func.f)(call_args, env),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("value of type {} is not callable", self.kind()),
            )),
        }
    }
}

// resolves a possibly negative index against a collection length
pub(crate) fn abs_index(idx: i64, len: usize) -> Option<usize> {
    if idx < 0 {
        let idx = idx.checked_neg()? as usize;
        if idx > len {
            None
        } else {
            Some(len - idx)
        }
    } else {
        Some(idx as usize)
    }
}
