use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

/// Ways re-rendering a dump can go wrong
#[derive(Debug)]
pub enum FmtError {
    Io(io::Error),
    Render(trex::Error),

    /// Dump text that does not parse (1-based line number)
    Dump { line: usize, message: String },
}

impl FmtError {
    pub fn dump(line: usize, message: impl Into<String>) -> FmtError {
        FmtError::Dump {
            line,
            message: message.into(),
        }
    }
}

impl From<io::Error> for FmtError {
    fn from(err: io::Error) -> FmtError {
        FmtError::Io(err)
    }
}

impl From<trex::Error> for FmtError {
    fn from(err: trex::Error) -> FmtError {
        FmtError::Render(err)
    }
}

impl Display for FmtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FmtError::Io(err) => write!(f, "IO - {}", err),
            FmtError::Render(err) => write!(f, "Render - {}", err),
            FmtError::Dump { line, message } => write!(f, "Dump line {} - {}", line, message),
        }
    }
}
