use std::io;

/// Every failure the content store reports. Messages are kept as strings so a single terminal
/// error can be replayed to every handler waiting on the same asset.
#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum Error {
    #[fail(display = "{} could not be found.", _0)]
    NotFound(String),
    #[fail(display = "IO failure: {}", _0)]
    IO(String),
    #[fail(display = "Corrupted data: {}", _0)]
    Corrupt(String),
    #[fail(display = "Buffer with {} bytes exceeds the addressable size.", _0)]
    BufferTooLarge(u64),
    #[fail(display = "Invalid async state: {}", _0)]
    AsyncState(String),
    #[fail(display = "Logic error: {}", _0)]
    Logic(String),
    #[fail(display = "Compression failure: {}", _0)]
    Compression(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// Returns true if the loader chain may move on to the next loader after this error. Data
    /// errors of one loader only mean "this loader does not have it".
    pub fn is_recoverable(&self) -> bool {
        match *self {
            Error::NotFound(_) | Error::IO(_) | Error::Corrupt(_) | Error::Compression(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(format!("{}", err)),
            _ => Error::IO(format!("{}", err)),
        }
    }
}

/// Converts a 64-bit length read from disk or from metadata into `usize`.
pub(crate) fn to_usize(len: u64) -> Result<usize> {
    if len > usize::max_value() as u64 {
        Err(Error::BufferTooLarge(len))
    } else {
        Ok(len as usize)
    }
}
