use std::sync::Arc;

use chrono::{DateTime, Utc};

use servertail_logs::{NoiseFilter, PushScheduler, SeverityCounts, StreamControl, StreamStatus, TailScheduler};
use servertail_types::{ClassifiedRecord, PushRecord, Severity};

/// Which stream the viewer shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActiveStream {
    /// Game server console file
    #[default]
    Console,
    /// This application's own log
    Internal,
}

impl ActiveStream {
    pub fn next(self) -> Self {
        match self {
            Self::Console => Self::Internal,
            Self::Internal => Self::Console,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Internal => "internal",
        }
    }
}

/// One displayable line from either stream
#[derive(Clone, Debug)]
pub enum ViewRow {
    Console(Arc<ClassifiedRecord>),
    Internal(Arc<PushRecord>),
}

impl ViewRow {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Console(r) => r.severity,
            Self::Internal(r) => r.severity,
        }
    }

    /// Category for console lines, tracing target for internal ones
    pub fn label(&self) -> &str {
        match self {
            Self::Console(r) => &r.category,
            Self::Internal(r) => &r.source,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Console(r) => &r.message,
            Self::Internal(r) => &r.message,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Console(_) => None,
            Self::Internal(r) => Some(r.timestamp),
        }
    }
}

/// Visible rows of a stream plus the unfiltered length
#[derive(Clone, Debug, Default)]
pub struct StreamView {
    pub rows: Vec<ViewRow>,
    pub total: usize,
}

/// The two running streams and the noise filter shared by both
pub struct Streams {
    pub console: TailScheduler,
    pub internal: PushScheduler,
    pub noise: NoiseFilter,
}

impl Streams {
    pub fn new(console: TailScheduler, internal: PushScheduler, noise: NoiseFilter) -> Self {
        Self {
            console,
            internal,
            noise,
        }
    }

    pub fn control(&self, stream: ActiveStream) -> &StreamControl {
        match stream {
            ActiveStream::Console => self.console.control(),
            ActiveStream::Internal => self.internal.control(),
        }
    }

    pub fn status(&self, stream: ActiveStream) -> StreamStatus {
        self.control(stream).status()
    }

    /// Buffer mutation counter, for cache invalidation
    pub fn generation(&self, stream: ActiveStream) -> u64 {
        match stream {
            ActiveStream::Console => self.console.buffer().generation(),
            ActiveStream::Internal => self.internal.buffer().generation(),
        }
    }

    /// Build the rows to display. Filtering never touches the buffers.
    pub fn view(&self, stream: ActiveStream, filtered: bool) -> StreamView {
        match stream {
            ActiveStream::Console => {
                let view = self.noise.view(self.console.buffer(), filtered);
                StreamView {
                    total: view.total,
                    rows: view.records.into_iter().map(ViewRow::Console).collect(),
                }
            }
            ActiveStream::Internal => {
                let all = self.internal.buffer().snapshot();
                let total = all.len();
                let rows = all
                    .into_iter()
                    .filter(|r| !filtered || !self.noise.is_noisy_line(&r.message))
                    .map(ViewRow::Internal)
                    .collect();
                StreamView { rows, total }
            }
        }
    }

    pub fn counts(&self, stream: ActiveStream) -> SeverityCounts {
        match stream {
            ActiveStream::Console => self.console.buffer().count_by(|r| r.severity),
            ActiveStream::Internal => self.internal.buffer().count_by(|r| r.severity),
        }
    }

    pub fn shutdown(&self) {
        self.console.shutdown();
        self.internal.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servertail_logs::{LogSource, TailOptions};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn test_active_stream_cycles() {
        assert_eq!(ActiveStream::Console.next(), ActiveStream::Internal);
        assert_eq!(ActiveStream::Internal.next(), ActiveStream::Console);
        assert_eq!(ActiveStream::default().label(), "console");
    }

    #[tokio::test]
    async fn test_view_hides_noise_without_dropping_it() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("server-console.txt");
        std::fs::write(&path, "LOG  : General f:0> hello\n\nLOG  : General f:1> heartbeat\n").unwrap();

        let options = TailOptions {
            poll_interval: Duration::from_millis(20),
            ..TailOptions::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let streams = Streams::new(
            TailScheduler::spawn(LogSource::new("console", &path), options),
            PushScheduler::spawn(rx, 10),
            NoiseFilter::with_defaults(),
        );

        tokio::time::timeout(Duration::from_secs(5), async {
            while streams.console.buffer().len() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let filtered = streams.view(ActiveStream::Console, true);
        assert_eq!(filtered.total, 3);
        assert_eq!(filtered.rows.len(), 1);
        assert_eq!(filtered.rows[0].message(), "hello");
        assert_eq!(filtered.rows[0].label(), "General");

        let all = streams.view(ActiveStream::Console, false);
        assert_eq!(all.rows.len(), 3);

        tx.send(PushRecord::new(Severity::Warn, "slow read", "servertail")).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while streams.internal.buffer().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let internal = streams.view(ActiveStream::Internal, true);
        assert_eq!(internal.rows.len(), 1);
        assert_eq!(internal.rows[0].severity(), Severity::Warn);
        assert!(internal.rows[0].timestamp().is_some());
        assert_eq!(streams.counts(ActiveStream::Internal).warn, 1);

        streams.shutdown();
    }
}
