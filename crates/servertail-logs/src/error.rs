use std::io;
use std::path::PathBuf;

/// Errors produced while tailing a log source.
///
/// A missing file is not an error (see [`SourceInfo::exists`]) and neither is
/// rotation, which is reported on the read outcome.
///
/// [`SourceInfo::exists`]: servertail_types::SourceInfo
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    /// Transient I/O failure on an existing file. The cursor is left untouched
    /// so the next cycle retries from the same offset.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to clear {}: {source}", path.display())]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown log source '{0}'")]
    UnknownSource(String),

    #[error("invalid noise pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl TailError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = TailError> = std::result::Result<T, E>;
