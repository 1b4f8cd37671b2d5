use std::borrow::Cow;
use std::fmt;

/// Represents template runtime errors.
///
/// Rendering aborts on the first error; there is no partial-output
/// recovery.  Since errors can carry a source error it's recommended
/// to render the entire chain to better understand the causes.
pub struct Error {
    repr: Box<ErrorRepr>,
}

/// The internal error data
struct ErrorRepr {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut err = f.debug_struct("Error");
        err.field("kind", &self.kind());
        if let Some(ref detail) = self.repr.detail {
            err.field("detail", detail);
        }
        if let Some(ref source) = std::error::Error::source(self) {
            err.field("source", source);
        }
        err.finish()
    }
}

/// An enum describing the error kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An invalid operation was attempted (bad operand or receiver types,
    /// calling a non-function, indexing with the wrong key type).
    InvalidOperation,
    /// The template program itself is malformed (`break` outside a loop,
    /// an assignment target that cannot be assigned to).
    SyntaxError,
    /// A filter is unknown.
    UnknownFilter,
    /// A test is unknown.
    UnknownTest,
    /// An expected argument was missing.
    MissingArgument,
    /// Too many arguments were passed to a function or filter.
    TooManyArguments,
    /// An argument had an unusable value (empty separator, positional
    /// argument after a keyword argument).
    InvalidArguments,
    /// Unable to unpack a value into a destructuring target.
    CannotUnpack,
    /// The template raised an exception via `raise_exception`.
    RaisedException,
    /// Not able to convert a host value into a template value.
    BadSerialization,
}

impl ErrorKind {
    fn description(self) -> &'static str {
        match self {
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::UnknownFilter => "unknown filter",
            ErrorKind::UnknownTest => "unknown test",
            ErrorKind::MissingArgument => "missing argument",
            ErrorKind::TooManyArguments => "too many arguments",
            ErrorKind::InvalidArguments => "invalid arguments",
            ErrorKind::CannotUnpack => "cannot unpack",
            ErrorKind::RaisedException => "exception raised",
            ErrorKind::BadSerialization => "could not serialize to value",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref detail) = self.repr.detail {
            write!(f, "{}: {}", self.kind(), detail)
        } else {
            write!(f, "{}", self.kind())
        }
    }
}

impl Error {
    /// Creates a new error with kind and detail.
    pub fn new<D: Into<Cow<'static, str>>>(kind: ErrorKind, detail: D) -> Error {
        Error {
            repr: Box::new(ErrorRepr {
                kind,
                detail: Some(detail.into()),
                source: None,
            }),
        }
    }

    /// Attaches another error as source to this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.repr.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.repr.kind
    }

    /// Returns the detail message if available.
    pub fn detail(&self) -> Option<&str> {
        self.repr.detail.as_deref()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.repr.source.as_ref().map(|err| err.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            repr: Box::new(ErrorRepr {
                kind,
                detail: None,
                source: None,
            }),
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::new(ErrorKind::InvalidOperation, "formatting failed")
    }
}
