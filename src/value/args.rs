//! Argument handling for filters, tests, builtin methods and functions.
//!
//! The calling convention appends at most one kwargs payload after the
//! positional arguments; [`CallArgs`] splits it back apart and resolves
//! positional-or-keyword parameters by index and name.

use crate::error::{Error, ErrorKind};
use crate::value::Value;

pub(crate) struct CallArgs<'a> {
    positional: &'a [Value],
    kwargs: Vec<(String, Value)>,
}

impl<'a> CallArgs<'a> {
    pub fn new(args: &'a [Value]) -> CallArgs<'a> {
        match args.last() {
            Some(last) if last.is_kwargs() => CallArgs {
                positional: &args[..args.len() - 1],
                kwargs: last.as_map_entries().unwrap_or_default(),
            },
            _ => CallArgs {
                positional: args,
                kwargs: Vec::new(),
            },
        }
    }

    /// Validates the arguments against the declared parameter names.
    pub fn expect(&self, what: &str, names: &[&str]) -> Result<(), Error> {
        if self.positional.len() > names.len() {
            return Err(Error::new(
                ErrorKind::TooManyArguments,
                format!(
                    "{} takes at most {} argument(s), got {}",
                    what,
                    names.len(),
                    self.positional.len()
                ),
            ));
        }
        for (key, _) in &self.kwargs {
            if !names.contains(&key.as_str()) {
                return Err(Error::new(
                    ErrorKind::InvalidArguments,
                    format!("{what} got an unknown keyword argument {key:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Resolves a positional-or-keyword parameter.
    pub fn get(&self, idx: usize, name: &str) -> Option<Value> {
        self.positional.get(idx).cloned().or_else(|| {
            self.kwargs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, val)| val.clone())
        })
    }

    /// Like [`get`](Self::get) but fails when the parameter is absent.
    pub fn require(&self, what: &str, idx: usize, name: &str) -> Result<Value, Error> {
        self.get(idx, name).ok_or_else(|| {
            Error::new(
                ErrorKind::MissingArgument,
                format!("{what} is missing the argument {name:?}"),
            )
        })
    }
}

pub(crate) fn str_arg(what: &str, name: &str, value: &Value) -> Result<String, Error> {
    value.as_str().map(Into::into).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidArguments,
            format!(
                "{} argument {:?} must be a string, got {}",
                what,
                name,
                value.kind()
            ),
        )
    })
}

pub(crate) fn int_arg(what: &str, name: &str, value: &Value) -> Result<i64, Error> {
    value.as_int().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidArguments,
            format!(
                "{} argument {:?} must be an integer, got {}",
                what,
                name,
                value.kind()
            ),
        )
    })
}
