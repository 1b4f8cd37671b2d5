//! The variable environment and the filter/test registries.
//!
//! An [`Environment`] is one frame in a parent-linked chain of scopes.
//! Lookups walk the chain and yield undefined for unbound names; writes
//! always hit the current frame, so `{% set %}` inside a macro or loop
//! shadows an outer binding instead of mutating it.  New frames are
//! created for the program global scope, each `for` body, each macro
//! call and each `call` block.
//!
//! The root frame owns the built-in filter and test registries; child
//! frames share them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::filters::{self, BoxedFilter};
use crate::tests::{self, BoxedTest};
use crate::value::{RcType, Value, ValueMap};

/// A shared handle to an environment frame.
pub type EnvRef = RcType<Environment>;

pub(crate) struct Registries {
    pub(crate) filters: BTreeMap<&'static str, BoxedFilter>,
    pub(crate) tests: BTreeMap<&'static str, BoxedTest>,
}

/// A single scope frame holding variables.
pub struct Environment {
    variables: RefCell<ValueMap>,
    parent: Option<EnvRef>,
    registries: RcType<Registries>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("variables", &*self.variables.borrow())
            .field("parent", &self.parent)
            .finish()
    }
}

impl Environment {
    /// Creates a fresh root environment with the built-in registries.
    pub fn new() -> EnvRef {
        RcType::new(Environment {
            variables: RefCell::new(ValueMap::new()),
            parent: None,
            registries: RcType::new(Registries {
                filters: filters::get_builtin_filters(),
                tests: tests::get_builtin_tests(),
            }),
        })
    }

    /// Creates a child scope of the given environment.
    pub fn child(parent: &EnvRef) -> EnvRef {
        RcType::new(Environment {
            variables: RefCell::new(ValueMap::new()),
            parent: Some(parent.clone()),
            registries: parent.registries.clone(),
        })
    }

    /// Looks up a variable, walking the parent chain.
    ///
    /// Unknown names yield undefined; this never fails.
    pub fn lookup(&self, name: &str) -> Value {
        if let Some(value) = self.variables.borrow().get(name) {
            return value.clone();
        }
        match self.parent {
            Some(ref parent) => parent.lookup(name),
            None => Value::UNDEFINED,
        }
    }

    /// Binds a value in the current scope.
    pub fn set_value(&self, name: &str, value: Value) {
        self.variables.borrow_mut().insert(name.into(), value);
    }

    /// Seeds a host value into the current scope via serde.
    pub fn set<T: Serialize>(&self, name: &str, value: T) {
        self.set_value(name, Value::from_serializable(&value));
    }
}

/// Applies a registered filter to a value.
pub(crate) fn apply_filter(
    env: &EnvRef,
    name: &str,
    value: Value,
    args: &[Value],
) -> Result<Value, Error> {
    match env.registries.filters.get(name) {
        Some(filter) => filter.apply(env, value, args),
        None => Err(Error::new(
            ErrorKind::UnknownFilter,
            format!("filter {name} is unknown"),
        )),
    }
}

/// Performs a registered test against a value.
pub(crate) fn perform_test(
    env: &EnvRef,
    name: &str,
    value: Value,
    args: &[Value],
) -> Result<bool, Error> {
    match env.registries.tests.get(name) {
        Some(test) => test.perform(env, value, args),
        None => Err(Error::new(
            ErrorKind::UnknownTest,
            format!("test {name} is unknown"),
        )),
    }
}
