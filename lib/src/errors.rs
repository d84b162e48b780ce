use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug)]
pub enum Error {
    /// Backtrace token does not fit its shape, or its depth cannot be reconciled with the raw
    /// frames of the exception
    MalformedBackTrace(String),

    /// A method or class handle that the runtime no longer resolves
    UnresolvableMethod(String),

    /// Rejected while building settings (eg. a non-positive duplicate block size)
    InvalidConfiguration(String),

    /// Node identifier that does not name a node of the exception graph
    NullGraphNode,

    /// Output sink refused the rendered text
    IoError(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::MalformedBackTrace(msg) => write!(f, "malformed backtrace: {}", msg),
            Error::UnresolvableMethod(msg) => write!(f, "unresolvable method: {}", msg),
            Error::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
            Error::NullGraphNode => f.write_str("no such exception node"),
            Error::IoError(err) => write!(f, "output error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
