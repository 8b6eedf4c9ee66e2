use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal trace-input failures. None of these are retried: a corrupt trace makes every later
/// cycle of the simulation meaningless.
#[derive(Debug)]
pub enum TraceError {
    /// The trace file could not be opened.
    Open { path: PathBuf, source: io::Error },
    /// The stream does not start with the `BINFILE` magic.
    BadMagic { found: [u8; 8] },
    /// A record id broke the 0, 1, 2, ... sequence.
    Sequence { expected: u64, found: u64 },
    /// Input ended in the middle of a record.
    Truncated { expected_id: u64, field: &'static str },
    /// A record names a dependency that never appeared before it in the stream.
    UnknownDependency { id: u64, dependency: u64 },
    /// A text-trace line could not be parsed.
    Parse { line: usize, message: String },
    Io(io::Error),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TraceError::Open { path, source } => {
                write!(f, "trace file {} failed to open: {}", path.display(), source)
            }
            TraceError::BadMagic { found } => {
                write!(f, "bad trace magic {:?}, expected \"BINFILE\"", found)
            }
            TraceError::Sequence { expected, found } => write!(
                f,
                "record id is not continuous, should be {:#x} but {:#x} encountered",
                expected, found
            ),
            TraceError::Truncated { expected_id, field } => write!(
                f,
                "trace ended inside record {} while reading `{}`",
                expected_id, field
            ),
            TraceError::UnknownDependency { id, dependency } => write!(
                f,
                "record {} depends on {}, which does not precede it in the trace",
                id, dependency
            ),
            TraceError::Parse { line, message } => {
                write!(f, "trace line {}: {}", line, message)
            }
            TraceError::Io(err) => write!(f, "trace read failed: {}", err),
        }
    }
}

impl Error for TraceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TraceError::Open { source, .. } => Some(source),
            TraceError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        TraceError::Io(err)
    }
}
