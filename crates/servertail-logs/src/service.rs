use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use servertail_types::{DeltaResponse, SnapshotResponse};

use crate::cursor::{LogSource, TailCursor};
use crate::error::{Result, TailError};
use crate::reader::IncrementalReader;

/// Known log sources by id
#[derive(Clone, Debug, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, PathBuf>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, path: impl Into<PathBuf>) {
        self.sources.insert(id.into(), path.into());
    }

    pub fn path(&self, id: &str) -> Option<&Path> {
        self.sources.get(id).map(PathBuf::as_path)
    }

    /// Fresh [`LogSource`] for an id
    pub fn source(&self, id: &str) -> Result<LogSource> {
        self.path(id)
            .map(|path| LogSource::new(id, path))
            .ok_or_else(|| TailError::UnknownSource(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SourceRegistry
where
    K: Into<String>,
    V: Into<PathBuf>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (id, path) in iter {
            registry.insert(id, path);
        }
        registry
    }
}

/// Stateless request/response access to the registered sources.
///
/// Callers keep their own cursor: the `size` of a snapshot and the
/// `current_size` of a delta are where the next fetch should start. Both stop
/// at the end of the last complete line so a line still being written is
/// delivered whole by a later fetch.
#[derive(Clone, Debug)]
pub struct LogService {
    registry: SourceRegistry,
    reader: IncrementalReader,
}

impl LogService {
    pub fn new(registry: SourceRegistry, reader: IncrementalReader) -> Self {
        Self { registry, reader }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Last `max_lines` lines and the starting cursor
    pub fn snapshot(&self, id: &str, max_lines: usize) -> Result<SnapshotResponse> {
        let mut source = self.registry.source(id)?;
        let load = self.reader.initial_load(&mut source, max_lines)?;

        Ok(SnapshotResponse {
            lines: load.lines,
            size: load.cursor.committed_offset(),
            path: load.info.path.display().to_string(),
            exists: load.info.exists,
        })
    }

    /// Complete lines written after `known_offset`
    pub fn fetch_since(&self, id: &str, known_offset: u64) -> Result<DeltaResponse> {
        let mut source = self.registry.source(id)?;
        let cursor = TailCursor::at(id, known_offset);
        let outcome = self.reader.read_new_lines(&mut source, &cursor)?;

        // A missing file restarts the caller at 0 so its reappearance is read
        // from the beginning.
        let current_size = if source.info().exists {
            outcome.cursor.committed_offset()
        } else {
            0
        };

        Ok(DeltaResponse {
            new_lines: outcome.lines,
            rotated: outcome.rotated,
            current_size,
        })
    }

    /// Truncate a source. The caller resets its cursor to 0.
    pub fn clear(&self, id: &str) -> Result<()> {
        let mut source = self.registry.source(id)?;
        source.truncate()?;
        tracing::info!(source = id, "log source cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn service(dir: &Path) -> (LogService, PathBuf) {
        let path = dir.join("server-console.txt");
        let registry: SourceRegistry = [("console", path.clone())].into_iter().collect();
        (LogService::new(registry, IncrementalReader::default()), path)
    }

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_unknown_source() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, _) = service(tmp.path());
        assert!(matches!(
            service.snapshot("chat", 10),
            Err(TailError::UnknownSource(id)) if id == "chat"
        ));
        assert!(service.fetch_since("chat", 0).is_err());
        assert!(service.clear("chat").is_err());
    }

    #[test]
    fn test_snapshot_of_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, path) = service(tmp.path());

        let snapshot = service.snapshot("console", 10).unwrap();
        assert!(!snapshot.exists);
        assert!(snapshot.lines.is_empty());
        assert_eq!(snapshot.size, 0);
        assert_eq!(snapshot.path, path.display().to_string());
    }

    #[test]
    fn test_snapshot_then_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, path) = service(tmp.path());
        append(&path, "INFO: one\nINFO: two\nINFO: three\n");

        let snapshot = service.snapshot("console", 2).unwrap();
        assert_eq!(snapshot.lines, vec!["INFO: two", "INFO: three"]);
        assert_eq!(snapshot.size, 32);
        assert!(snapshot.exists);

        let delta = service.fetch_since("console", snapshot.size).unwrap();
        assert!(delta.new_lines.is_empty());
        assert_eq!(delta.current_size, snapshot.size);

        append(&path, "INFO: four\n");
        let delta = service.fetch_since("console", snapshot.size).unwrap();
        assert_eq!(delta.new_lines, vec!["INFO: four"]);
        assert!(!delta.rotated);
        assert_eq!(delta.current_size, 43);
    }

    #[test]
    fn test_partial_line_is_not_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, path) = service(tmp.path());
        append(&path, "INFO: done\nINFO: half");

        let snapshot = service.snapshot("console", 10).unwrap();
        assert_eq!(snapshot.lines, vec!["INFO: done"]);
        assert_eq!(snapshot.size, 11);

        append(&path, " written\n");
        let delta = service.fetch_since("console", snapshot.size).unwrap();
        assert_eq!(delta.new_lines, vec!["INFO: half written"]);
        assert_eq!(delta.current_size, 30);
    }

    #[test]
    fn test_fetch_detects_rotation() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, path) = service(tmp.path());
        append(&path, "INFO: fresh\n");

        let delta = service.fetch_since("console", 1000).unwrap();
        assert!(delta.rotated);
        assert_eq!(delta.new_lines, vec!["INFO: fresh"]);
        assert_eq!(delta.current_size, 12);
    }

    #[test]
    fn test_fetch_on_missing_file_restarts_at_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, _) = service(tmp.path());

        let delta = service.fetch_since("console", 500).unwrap();
        assert!(delta.new_lines.is_empty());
        assert!(!delta.rotated);
        assert_eq!(delta.current_size, 0);
    }

    #[test]
    fn test_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, path) = service(tmp.path());
        append(&path, "INFO: one\n");

        service.clear("console").unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

        let delta = service.fetch_since("console", 0).unwrap();
        assert!(delta.new_lines.is_empty());
        assert_eq!(delta.current_size, 0);
    }

    #[test]
    fn test_registry_ids_are_sorted() {
        let registry: SourceRegistry = [("console", "a.txt"), ("chat", "b.txt")]
            .into_iter()
            .collect();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["chat", "console"]);
        assert_eq!(registry.path("chat"), Some(Path::new("b.txt")));
    }
}
