// Plain-match stand-ins for the `?` operator.  The evaluator never needs
// error-type conversion on propagation, so these expand to a bare match
// and keep the recursive eval functions cheap to compile.

macro_rules! ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => return Err(err),
        }
    };
}

macro_rules! some {
    ($expr:expr) => {
        match $expr {
            Some(val) => val,
            None => return None,
        }
    };
}
