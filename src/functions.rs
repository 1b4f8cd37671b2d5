//! Global functions available to every template.
//!
//! [`setup_globals`] seeds an environment with the boolean/none literals
//! in both spellings, `range`, `namespace`, `raise_exception` and
//! `strftime_now`.  Globals are ordinary values: hosts can expose their
//! own callables through the context the same way.

use time::OffsetDateTime;

use crate::environment::EnvRef;
use crate::error::{Error, ErrorKind};
use crate::value::args::{int_arg, str_arg, CallArgs};
use crate::value::{Value, ValueKind, ValueMap};

/// Injects the default globals into an environment.
pub fn setup_globals(env: &EnvRef) {
    env.set_value("true", Value::from(true));
    env.set_value("false", Value::from(false));
    env.set_value("none", Value::NONE);
    env.set_value("True", Value::from(true));
    env.set_value("False", Value::from(false));
    env.set_value("None", Value::NONE);
    env.set_value("range", Value::from_func(Some("range".into()), range));
    env.set_value(
        "namespace",
        Value::from_func(Some("namespace".into()), namespace),
    );
    env.set_value(
        "raise_exception",
        Value::from_func(Some("raise_exception".into()), raise_exception),
    );
    env.set_value(
        "strftime_now",
        Value::from_func(Some("strftime_now".into()), strftime_now),
    );
}

/// Returns an array containing an arithmetic progression of integers.
///
/// `range(i, j)` returns `[i, i+1, ..., j-1]`; `range(j)` starts at zero;
/// a third argument sets the step, which may be negative.
pub fn range(args: &[Value], _env: &EnvRef) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("range", &["start", "stop", "step"]));
    let first = ok!(int_arg(
        "range",
        "start",
        &ok!(args.require("range", 0, "start"))
    ));
    let (start, stop) = match args.get(1, "stop") {
        Some(val) => (first, ok!(int_arg("range", "stop", &val))),
        None => (0, first),
    };
    let step = match args.get(2, "step") {
        Some(val) => ok!(int_arg("range", "step", &val)),
        None => 1,
    };
    if step == 0 {
        return Err(Error::new(
            ErrorKind::InvalidArguments,
            "range step must not be zero",
        ));
    }

    let mut rv = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        rv.push(Value::from(i));
        i += step;
    }
    Ok(Value::from_items(rv))
}

/// Creates a mutable attribute holder.
///
/// Without arguments an empty object; with one object argument, that
/// object.  Useful for writable state that survives loop scopes:
/// `{% set ns = namespace() %}{% set ns.found = true %}`.
pub fn namespace(args: &[Value], _env: &EnvRef) -> Result<Value, Error> {
    match args {
        [] => Ok(Value::from_map(ValueMap::new())),
        [arg] => match arg.kind() {
            ValueKind::Object => Ok(arg.clone()),
            // a kwargs payload rewraps into a plain object
            ValueKind::Kwargs => Ok(Value::from_map(
                arg.as_map_entries().unwrap_or_default().into_iter().collect(),
            )),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("namespace argument must be an object, got {}", arg.kind()),
            )),
        },
        _ => Err(Error::new(
            ErrorKind::TooManyArguments,
            "namespace takes at most one argument",
        )),
    }
}

/// Aborts the render with an exception carrying the given message.
pub fn raise_exception(args: &[Value], _env: &EnvRef) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("raise_exception", &["message"]));
    let message = args
        .require("raise_exception", 0, "message")
        .map(|val| val.to_string())?;
    Err(Error::new(ErrorKind::RaisedException, message))
}

/// Formats the current local time with strftime directives.
pub fn strftime_now(args: &[Value], _env: &EnvRef) -> Result<Value, Error> {
    let args = CallArgs::new(args);
    ok!(args.expect("strftime_now", &["format"]));
    let format = ok!(str_arg(
        "strftime_now",
        "format",
        &ok!(args.require("strftime_now", 0, "format"))
    ));
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(Value::from(strftime(&now, &format)))
}

// strftime over the handful of directives chat templates actually use;
// unknown directives pass through verbatim.
fn strftime(dt: &OffsetDateTime, format: &str) -> String {
    use std::fmt::Write;

    let mut rv = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            rv.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => write!(rv, "{:04}", dt.year()).ok(),
            Some('y') => write!(rv, "{:02}", dt.year().rem_euclid(100)).ok(),
            Some('m') => write!(rv, "{:02}", u8::from(dt.month())).ok(),
            Some('d') => write!(rv, "{:02}", dt.day()).ok(),
            Some('e') => write!(rv, "{:2}", dt.day()).ok(),
            Some('H') => write!(rv, "{:02}", dt.hour()).ok(),
            Some('I') => {
                let hour = dt.hour() % 12;
                write!(rv, "{:02}", if hour == 0 { 12 } else { hour }).ok()
            }
            Some('M') => write!(rv, "{:02}", dt.minute()).ok(),
            Some('S') => write!(rv, "{:02}", dt.second()).ok(),
            Some('j') => write!(rv, "{:03}", dt.ordinal()).ok(),
            Some('p') => {
                rv.push_str(if dt.hour() < 12 { "AM" } else { "PM" });
                Some(())
            }
            Some('a') => {
                let name = weekday_name(dt);
                rv.push_str(&name[..3]);
                Some(())
            }
            Some('A') => {
                rv.push_str(weekday_name(dt));
                Some(())
            }
            Some('b') => {
                let name = month_name(dt);
                rv.push_str(&name[..3]);
                Some(())
            }
            Some('B') => {
                rv.push_str(month_name(dt));
                Some(())
            }
            Some('%') => {
                rv.push('%');
                Some(())
            }
            Some(other) => {
                rv.push('%');
                rv.push(other);
                Some(())
            }
            None => {
                rv.push('%');
                Some(())
            }
        };
    }
    rv
}

fn weekday_name(dt: &OffsetDateTime) -> &'static str {
    match dt.weekday() {
        time::Weekday::Monday => "Monday",
        time::Weekday::Tuesday => "Tuesday",
        time::Weekday::Wednesday => "Wednesday",
        time::Weekday::Thursday => "Thursday",
        time::Weekday::Friday => "Friday",
        time::Weekday::Saturday => "Saturday",
        time::Weekday::Sunday => "Sunday",
    }
}

fn month_name(dt: &OffsetDateTime) -> &'static str {
    match dt.month() {
        time::Month::January => "January",
        time::Month::February => "February",
        time::Month::March => "March",
        time::Month::April => "April",
        time::Month::May => "May",
        time::Month::June => "June",
        time::Month::July => "July",
        time::Month::August => "August",
        time::Month::September => "September",
        time::Month::October => "October",
        time::Month::November => "November",
        time::Month::December => "December",
    }
}

#[cfg(test)]
mod test_functions {
    use super::*;
    use crate::environment::Environment;

    use similar_asserts::assert_eq;

    fn int_array(items: &[i64]) -> Value {
        Value::from_items(items.iter().map(|&x| Value::from(x)).collect())
    }

    #[test]
    fn test_range_forms() {
        let env = Environment::new();
        assert_eq!(
            range(&[Value::from(4)], &env).unwrap(),
            int_array(&[0, 1, 2, 3])
        );
        assert_eq!(
            range(&[Value::from(1), Value::from(4)], &env).unwrap(),
            int_array(&[1, 2, 3])
        );
        assert_eq!(
            range(&[Value::from(5), Value::from(1), Value::from(-2)], &env).unwrap(),
            int_array(&[5, 3])
        );
        assert_eq!(range(&[Value::from(-3)], &env).unwrap(), int_array(&[]));
        assert!(range(&[Value::from(1), Value::from(4), Value::from(0)], &env).is_err());
    }

    #[test]
    fn test_namespace() {
        let env = Environment::new();
        let ns = namespace(&[], &env).unwrap();
        ns.set_attr("found", Value::from(true)).unwrap();
        assert_eq!(ns.get_attr("found"), Value::from(true));
        assert!(namespace(&[Value::from(1)], &env).is_err());
    }

    #[test]
    fn test_raise_exception() {
        let env = Environment::new();
        let err = raise_exception(&[Value::from("boom")], &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RaisedException);
        assert_eq!(err.to_string(), "exception raised: boom");
    }

    #[test]
    fn test_strftime_directives() {
        let dt = OffsetDateTime::from_unix_timestamp(0).unwrap();
        assert_eq!(strftime(&dt, "%Y-%m-%d %H:%M:%S"), "1970-01-01 00:00:00");
        assert_eq!(strftime(&dt, "%A, %B %d"), "Thursday, January 01");
        assert_eq!(strftime(&dt, "%I %p"), "12 AM");
        assert_eq!(strftime(&dt, "100%%"), "100%");
        assert_eq!(strftime(&dt, "%q"), "%q");
    }
}
