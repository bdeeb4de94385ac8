use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::result;
use std::str::Utf8Error;

// Error data structures are modeled just like in the `csv` crate by BurntSushi.

pub(crate) fn new_error(kind: ErrorKind) -> Error {
    Error(Box::new(kind))
}

/// A type alias for `Result<T, osmdata::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or querying PBF files.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// Return the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }
}

/// The specific type of an error.
#[non_exhaustive]
#[derive(Debug)]
pub enum ErrorKind {
    /// An error for I/O operations.
    Io(io::Error),
    /// The input path does not carry the `.pbf` extension.
    NotPbf { path: PathBuf },
    /// The file ends in the middle of a framed message.
    Truncated { offset: u64 },
    /// A varint did not terminate within 10 bytes.
    MalformedVarint { offset: usize },
    /// A length-delimited field would read past its container.
    FieldOverrun { offset: usize },
    /// A blob header or blob message exceeds the permitted size.
    BlobTooBig { size: u64 },
    /// The blob uses a compression this implementation does not handle.
    UnsupportedCompression { format: &'static str },
    /// The header lists a required feature outside the allow-list.
    UnsupportedFeature { feature: String },
    /// A query constraint was violated.
    InvalidQuery { reason: &'static str },
    /// The stringtable contains an entry at `index` that could not be decoded
    /// to a valid UTF-8 string.
    StringtableUtf8 { err: Utf8Error, index: usize },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        new_error(ErrorKind::Io(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, err)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            ErrorKind::StringtableUtf8 { ref err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::NotPbf { ref path } => {
                write!(
                    f,
                    "not a PBF file (expected .pbf extension): {}",
                    path.display()
                )
            }
            ErrorKind::Truncated { offset } => {
                write!(f, "file is truncated inside a framed message at byte {offset}")
            }
            ErrorKind::MalformedVarint { offset } => {
                write!(f, "malformed varint at byte {offset}")
            }
            ErrorKind::FieldOverrun { offset } => {
                write!(
                    f,
                    "length-delimited field at byte {offset} overruns its container"
                )
            }
            ErrorKind::BlobTooBig { size } => {
                write!(f, "blob message is too big: {size} bytes")
            }
            ErrorKind::UnsupportedCompression { format } => {
                write!(f, "unsupported blob compression: {format}")
            }
            ErrorKind::UnsupportedFeature { ref feature } => {
                write!(f, "unsupported required feature: {feature}")
            }
            ErrorKind::InvalidQuery { reason } => {
                write!(f, "invalid query: {reason}")
            }
            ErrorKind::StringtableUtf8 { ref err, index } => {
                write!(f, "invalid UTF-8 at string table index {index}: {err}")
            }
        }
    }
}
