use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use servertail_types::SourceInfo;

use crate::error::{Result, TailError};

/// Byte position reached in one log source.
///
/// `offset` is how far the file has been read. Bytes after the last line
/// terminator are held back in `pending` until the terminator arrives, so
/// `offset - pending.len()` is the position of the last delivered line end.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TailCursor {
    pub source_id: String,
    offset: u64,
    pending: Vec<u8>,
}

impl TailCursor {
    /// Cursor at the start of a source
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            offset: 0,
            pending: Vec::new(),
        }
    }

    /// Cursor resumed from an offset known to sit on a line boundary
    pub fn at(source_id: impl Into<String>, offset: u64) -> Self {
        Self {
            source_id: source_id.into(),
            offset,
            pending: Vec::new(),
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// End of the last complete line handed out
    pub fn committed_offset(&self) -> u64 {
        self.offset.saturating_sub(self.pending.len() as u64)
    }

    /// Partial trailing line not yet delivered
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// A file smaller than what was already read has been truncated or
    /// replaced. Same-size rewrites are not detected.
    pub fn is_rotated(&self, current_size: u64) -> bool {
        current_size < self.offset
    }

    pub(crate) fn advance(&self, offset: u64, pending: Vec<u8>) -> Self {
        Self {
            source_id: self.source_id.clone(),
            offset,
            pending,
        }
    }

    /// Back to byte 0, dropping any held-back fragment
    pub fn reset(&self) -> Self {
        Self::new(self.source_id.clone())
    }
}

/// A tailed file and what its latest stat reported
#[derive(Clone, Debug)]
pub struct LogSource {
    info: SourceInfo,
}

impl LogSource {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            info: SourceInfo::new(id, path),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn path(&self) -> &Path {
        &self.info.path
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Open the file and refresh size and existence. A missing file yields
    /// `Ok(None)`; any other failure is a read error.
    pub(crate) fn open(&mut self) -> Result<Option<File>> {
        let file = match File::open(&self.info.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.info.exists = false;
                self.info.size = 0;
                return Ok(None);
            }
            Err(e) => return Err(TailError::read(&self.info.path, e)),
        };

        let metadata = file
            .metadata()
            .map_err(|e| TailError::read(&self.info.path, e))?;
        self.info.exists = true;
        self.info.size = metadata.len();
        Ok(Some(file))
    }

    /// Truncate the file to zero bytes. A missing file is already clear.
    pub fn truncate(&mut self) -> Result<()> {
        match OpenOptions::new().write(true).truncate(true).open(&self.info.path) {
            Ok(_) => {
                self.info.exists = true;
                self.info.size = 0;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.info.exists = false;
                self.info.size = 0;
                Ok(())
            }
            Err(source) => Err(TailError::Clear {
                path: self.info.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committed_offset_excludes_pending() {
        let cursor = TailCursor::new("console").advance(12, b"abc".to_vec());
        assert_eq!(cursor.offset(), 12);
        assert_eq!(cursor.committed_offset(), 9);
        assert_eq!(cursor.pending(), b"abc");
    }

    #[test]
    fn test_rotation_is_size_below_offset() {
        let cursor = TailCursor::at("console", 1000);
        assert!(cursor.is_rotated(200));
        assert!(!cursor.is_rotated(1000));
        assert!(!cursor.is_rotated(1200));
    }

    #[test]
    fn test_reset_clears_everything() {
        let cursor = TailCursor::new("console").advance(40, b"partial".to_vec());
        let reset = cursor.reset();
        assert_eq!(reset.offset(), 0);
        assert!(reset.pending().is_empty());
        assert_eq!(reset.source_id, "console");
    }

    #[test]
    fn test_open_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = LogSource::new("console", tmp.path().join("server-console.txt"));
        assert!(source.open().unwrap().is_none());
        assert!(!source.info().exists);
        assert_eq!(source.info().size, 0);
    }

    #[test]
    fn test_open_refreshes_size() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("server-console.txt");
        std::fs::write(&path, "hello\n").unwrap();

        let mut source = LogSource::new("console", &path);
        assert!(source.open().unwrap().is_some());
        assert!(source.info().exists);
        assert_eq!(source.info().size, 6);
    }

    #[test]
    fn test_truncate() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("server-console.txt");
        std::fs::write(&path, "hello\n").unwrap();

        let mut source = LogSource::new("console", &path);
        source.truncate().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

        let mut missing = LogSource::new("console", tmp.path().join("absent.txt"));
        missing.truncate().unwrap();
        assert!(!missing.info().exists);
    }
}
