use std::fmt;

#[derive(Debug)]
pub enum Error {
    InvalidConfig(String),
    InvalidData(String),
    InvalidShape(String),
    /// A layer (or a prefix of the stack) was used before its pretraining finished.
    NotTrained(String),
    /// Parameters were written to a layer that is already frozen.
    AlreadyTrained(String),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            Error::NotTrained(msg) => write!(f, "not trained: {msg}"),
            Error::AlreadyTrained(msg) => write!(f, "already trained: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => Error::Io(io),
                other => Error::InvalidData(format!("{other:?}")),
            }
        } else {
            Error::InvalidData(format!("csv: {err}"))
        }
    }
}
