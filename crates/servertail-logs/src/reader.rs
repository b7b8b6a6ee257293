use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use servertail_types::SourceInfo;

use crate::cursor::{LogSource, TailCursor};
use crate::error::{Result, TailError};

/// Upper bound on bytes read by an initial load
pub const DEFAULT_INITIAL_MAX_BYTES: u64 = 4 * 1024 * 1024;

/// Result of one incremental read cycle
#[derive(Clone, Debug)]
pub struct ReadOutcome {
    pub lines: Vec<String>,
    pub cursor: TailCursor,
    /// The file shrank: `lines` is the whole file and replaces what was shown
    pub rotated: bool,
}

/// Result of the first read of a subscription
#[derive(Clone, Debug)]
pub struct InitialLoad {
    pub lines: Vec<String>,
    pub cursor: TailCursor,
    pub info: SourceInfo,
}

/// Produces the complete lines appended to a source since a cursor.
///
/// Reads are pure with respect to the cursor: a new cursor is returned and the
/// old one is never modified, so a failed cycle can be retried from the same
/// position.
#[derive(Clone, Debug)]
pub struct IncrementalReader {
    max_initial_bytes: u64,
}

impl IncrementalReader {
    pub fn new(max_initial_bytes: u64) -> Self {
        Self {
            max_initial_bytes: max_initial_bytes.max(1),
        }
    }

    /// Read what was appended after `cursor`
    pub fn read_new_lines(&self, source: &mut LogSource, cursor: &TailCursor) -> Result<ReadOutcome> {
        let Some(mut file) = source.open()? else {
            return Ok(ReadOutcome {
                lines: Vec::new(),
                cursor: cursor.clone(),
                rotated: false,
            });
        };
        let current_size = source.info().size;

        if cursor.is_rotated(current_size) {
            tracing::warn!(
                source = %source.id(),
                previous = cursor.offset(),
                current_size,
                "log source shrank, re-reading from the start"
            );
            let bytes = read_range(&mut file, 0, current_size)
                .map_err(|e| TailError::read(source.path(), e))?;
            let end = bytes.len() as u64;
            let (lines, pending) = split_lines(bytes);
            return Ok(ReadOutcome {
                lines,
                cursor: cursor.reset().advance(end, pending),
                rotated: true,
            });
        }

        if current_size == cursor.offset() {
            return Ok(ReadOutcome {
                lines: Vec::new(),
                cursor: cursor.clone(),
                rotated: false,
            });
        }

        // The writer may still be appending: the stat is only a lower bound and
        // a short read is fine.
        //
        // With nothing held back the cursor should sit just past a newline.
        // Read that byte too, so a resume point inside a line skips the rest
        // of that line instead of emitting its tail.
        let check_boundary = cursor.pending().is_empty() && cursor.offset() > 0;
        let from = if check_boundary {
            cursor.offset() - 1
        } else {
            cursor.offset()
        };
        let mut fresh = read_range(&mut file, from, current_size - from)
            .map_err(|e| TailError::read(source.path(), e))?;
        let end = from + fresh.len() as u64;
        if check_boundary {
            drop_cut_head(&mut fresh);
        }

        let mut bytes = Vec::with_capacity(cursor.pending().len() + fresh.len());
        bytes.extend_from_slice(cursor.pending());
        bytes.extend_from_slice(&fresh);
        let (lines, pending) = split_lines(bytes);

        tracing::debug!(
            source = %source.id(),
            lines = lines.len(),
            offset = end,
            "read new log lines"
        );

        Ok(ReadOutcome {
            lines,
            cursor: cursor.advance(end, pending),
            rotated: false,
        })
    }

    /// First read of a subscription: the last `max_lines` lines within the
    /// byte window, with the cursor placed at end of file.
    pub fn initial_load(&self, source: &mut LogSource, max_lines: usize) -> Result<InitialLoad> {
        let cursor = TailCursor::new(source.id());
        let Some(mut file) = source.open()? else {
            return Ok(InitialLoad {
                lines: Vec::new(),
                cursor,
                info: source.info().clone(),
            });
        };
        let size = source.info().size;
        // One byte before the window tells whether it starts on a line boundary
        let start = size.saturating_sub(self.max_initial_bytes).saturating_sub(1);

        let mut bytes =
            read_range(&mut file, start, size - start).map_err(|e| TailError::read(source.path(), e))?;
        let end = start + bytes.len() as u64;

        if start > 0 {
            drop_cut_head(&mut bytes);
        }

        let (mut lines, pending) = split_lines(bytes);
        if lines.len() > max_lines {
            lines.drain(..lines.len() - max_lines);
        }

        tracing::info!(
            source = %source.id(),
            lines = lines.len(),
            size,
            "initial log load"
        );

        Ok(InitialLoad {
            lines,
            cursor: cursor.advance(end, pending),
            info: source.info().clone(),
        })
    }
}

impl Default for IncrementalReader {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_MAX_BYTES)
    }
}

/// Read up to `len` bytes starting at `start`
fn read_range(file: &mut File, start: u64, len: u64) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(start))?;
    let mut buf = Vec::with_capacity(len.min(DEFAULT_INITIAL_MAX_BYTES) as usize);
    file.take(len).read_to_end(&mut buf)?;
    Ok(buf)
}

/// `bytes` starts with the byte before the wanted range. Drop everything up to
/// and including the first newline: just that byte when it ends a line,
/// otherwise the remainder of a line whose start was never read. Without any
/// newline the whole range belongs to that line.
fn drop_cut_head(bytes: &mut Vec<u8>) {
    match bytes.iter().position(|b| *b == b'\n') {
        Some(newline) => {
            bytes.drain(..=newline);
        }
        None => bytes.clear(),
    }
}

/// Split on `\n` (dropping a trailing `\r`). Bytes after the last terminator
/// are returned separately as the pending fragment.
fn split_lines(mut bytes: Vec<u8>) -> (Vec<String>, Vec<u8>) {
    let Some(last_newline) = bytes.iter().rposition(|b| *b == b'\n') else {
        return (Vec::new(), bytes);
    };
    let pending = bytes.split_off(last_newline + 1);

    let lines = bytes[..last_newline]
        .split(|b| *b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect();

    (lines, pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn setup() -> (tempfile::TempDir, LogSource) {
        let tmp = tempfile::tempdir().unwrap();
        let source = LogSource::new("console", tmp.path().join("server-console.txt"));
        (tmp, source)
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let (_tmp, mut source) = setup();
        let reader = IncrementalReader::default();
        let cursor = TailCursor::new("console");

        let outcome = reader.read_new_lines(&mut source, &cursor).unwrap();
        assert!(outcome.lines.is_empty());
        assert!(!outcome.rotated);
        assert_eq!(outcome.cursor, cursor);
        assert!(!source.info().exists);
    }

    #[test]
    fn test_cursor_follows_growth() {
        let (_tmp, mut source) = setup();
        let path = source.path().to_path_buf();
        let reader = IncrementalReader::default();
        let mut cursor = TailCursor::new("console");

        let mut last_offset = 0;
        for batch in 0..5 {
            append(&path, &format!("LOG : General f:{batch}> tick {batch}\n"));
            let outcome = reader.read_new_lines(&mut source, &cursor).unwrap();
            assert_eq!(outcome.lines.len(), 1);
            assert!(!outcome.rotated);
            assert!(outcome.cursor.offset() >= last_offset);
            assert_eq!(outcome.cursor.offset(), source.info().size);
            last_offset = outcome.cursor.offset();
            cursor = outcome.cursor;
        }
    }

    #[test]
    fn test_no_new_data_keeps_cursor() {
        let (_tmp, mut source) = setup();
        append(source.path(), "one\ntwo\n");
        let reader = IncrementalReader::default();

        let first = reader
            .read_new_lines(&mut source, &TailCursor::new("console"))
            .unwrap();
        assert_eq!(first.lines, vec!["one", "two"]);

        let second = reader.read_new_lines(&mut source, &first.cursor).unwrap();
        assert!(second.lines.is_empty());
        assert_eq!(second.cursor, first.cursor);
    }

    #[test]
    fn test_rotation_rereads_from_start() {
        let (_tmp, mut source) = setup();
        let path = source.path().to_path_buf();
        append(&path, &"x".repeat(999));
        append(&path, "\n");
        let reader = IncrementalReader::default();
        let cursor = TailCursor::at("console", 1000);

        let mut rewritten = String::new();
        while rewritten.len() < 200 {
            rewritten.push_str("fresh line\n");
        }
        rewritten.truncate(198);
        rewritten.push_str("z\n");
        std::fs::write(&path, &rewritten).unwrap();

        let outcome = reader.read_new_lines(&mut source, &cursor).unwrap();
        assert!(outcome.rotated);
        assert_eq!(outcome.cursor.offset(), 200);
        assert_eq!(outcome.lines.first().map(String::as_str), Some("fresh line"));
        assert_eq!(outcome.lines.len(), rewritten.lines().count());
    }

    #[test]
    fn test_partial_line_is_deferred() {
        let (_tmp, mut source) = setup();
        let path = source.path().to_path_buf();
        let reader = IncrementalReader::default();

        append(&path, "hello wor");
        let first = reader
            .read_new_lines(&mut source, &TailCursor::new("console"))
            .unwrap();
        assert!(first.lines.is_empty());
        assert_eq!(first.cursor.offset(), 9);
        assert_eq!(first.cursor.committed_offset(), 0);

        append(&path, "ld\nnext");
        let second = reader.read_new_lines(&mut source, &first.cursor).unwrap();
        assert_eq!(second.lines, vec!["hello world"]);
        assert_eq!(second.cursor.pending(), b"next");
    }

    #[test]
    fn test_crlf_and_invalid_utf8() {
        let (_tmp, mut source) = setup();
        std::fs::write(source.path(), b"WARN: a\r\n\xffbad\n").unwrap();
        let reader = IncrementalReader::default();

        let outcome = reader
            .read_new_lines(&mut source, &TailCursor::new("console"))
            .unwrap();
        assert_eq!(outcome.lines[0], "WARN: a");
        assert_eq!(outcome.lines[1], "\u{fffd}bad");
    }

    #[test]
    fn test_failed_read_can_be_retried() {
        let (tmp, mut source) = setup();
        let path = source.path().to_path_buf();
        let reader = IncrementalReader::default();
        let cursor = TailCursor::new("console");

        // A directory opens fine but cannot be read
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("child"), "x").unwrap();
        let failed = reader.read_new_lines(&mut source, &cursor);
        assert!(matches!(failed, Err(TailError::Read { .. })));

        std::fs::remove_dir_all(&path).unwrap();
        append(&path, "first\nsecond\n");
        let retried = reader.read_new_lines(&mut source, &cursor).unwrap();

        let mut control = LogSource::new("console", tmp.path().join("server-console.txt"));
        let expected = reader.read_new_lines(&mut control, &cursor).unwrap();
        assert_eq!(retried.lines, expected.lines);
        assert_eq!(retried.lines, vec!["first", "second"]);
    }

    #[test]
    fn test_initial_load_keeps_last_lines() {
        let (_tmp, mut source) = setup();
        let text: String = (1..=100).map(|i| format!("line {i}\n")).collect();
        std::fs::write(source.path(), &text).unwrap();
        let reader = IncrementalReader::default();

        let load = reader.initial_load(&mut source, 10).unwrap();
        assert_eq!(load.lines.len(), 10);
        assert_eq!(load.lines[0], "line 91");
        assert_eq!(load.lines[9], "line 100");
        assert_eq!(load.cursor.offset(), text.len() as u64);
        assert!(load.info.exists);
    }

    #[test]
    fn test_initial_load_respects_byte_window() {
        let (_tmp, mut source) = setup();
        std::fs::write(source.path(), "aaaaaaaaaa\nbbbb\ncccc\n").unwrap();
        let reader = IncrementalReader::new(12);

        let load = reader.initial_load(&mut source, 100).unwrap();
        assert_eq!(load.lines, vec!["bbbb", "cccc"]);
        assert_eq!(load.cursor.offset(), 21);
    }

    #[test]
    fn test_window_starting_on_a_line_keeps_that_line() {
        let (_tmp, mut source) = setup();
        std::fs::write(source.path(), "aaaa\nbbbb\ncccc\n").unwrap();
        let reader = IncrementalReader::new(10);

        let load = reader.initial_load(&mut source, 100).unwrap();
        assert_eq!(load.lines, vec!["bbbb", "cccc"]);
        assert_eq!(load.cursor.offset(), 15);
        assert!(load.cursor.pending().is_empty());
    }

    #[test]
    fn test_window_inside_one_line_never_emits_its_tail() {
        let (_tmp, mut source) = setup();
        let path = source.path().to_path_buf();
        std::fs::write(&path, "ERROR : Zombie f:1> 0123456789abcdef").unwrap();
        let reader = IncrementalReader::new(8);

        let load = reader.initial_load(&mut source, 100).unwrap();
        assert!(load.lines.is_empty());
        assert!(load.cursor.pending().is_empty());
        assert_eq!(load.cursor.offset(), 36);

        append(&path, "\n");
        let next = reader.read_new_lines(&mut source, &load.cursor).unwrap();
        assert!(next.lines.is_empty());

        append(&path, "INFO: next\n");
        let after = reader.read_new_lines(&mut source, &next.cursor).unwrap();
        assert_eq!(after.lines, vec!["INFO: next"]);
    }

    #[test]
    fn test_resume_inside_a_line_skips_its_rest() {
        let (_tmp, mut source) = setup();
        std::fs::write(source.path(), "first line\nsecond\n").unwrap();
        let reader = IncrementalReader::default();

        let outcome = reader
            .read_new_lines(&mut source, &TailCursor::at("console", 4))
            .unwrap();
        assert_eq!(outcome.lines, vec!["second"]);
        assert_eq!(outcome.cursor.offset(), 18);
    }

    #[test]
    fn test_initial_load_defers_trailing_fragment() {
        let (_tmp, mut source) = setup();
        let path = source.path().to_path_buf();
        std::fs::write(&path, "done\nhalf").unwrap();
        let reader = IncrementalReader::default();

        let load = reader.initial_load(&mut source, 100).unwrap();
        assert_eq!(load.lines, vec!["done"]);

        append(&path, " line\n");
        let next = reader.read_new_lines(&mut source, &load.cursor).unwrap();
        assert_eq!(next.lines, vec!["half line"]);
    }
}
