use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use servertail_types::ClassifiedRecord;

use crate::buffer::{DEFAULT_INITIAL_LINES, DEFAULT_RETENTION, RetentionBuffer};
use crate::classifier::classify;
use crate::cursor::{LogSource, TailCursor};
use crate::error::Result;
use crate::reader::{DEFAULT_INITIAL_MAX_BYTES, IncrementalReader};
use crate::stream::{Command, StreamControl, StreamStatus};

/// Default cadence for polling the console log
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Tuning for a polled stream
#[derive(Clone, Debug)]
pub struct TailOptions {
    pub poll_interval: Duration,
    /// Lines kept from the initial load
    pub initial_lines: usize,
    /// Byte window of the initial load
    pub initial_max_bytes: u64,
    /// Rolling capacity of the retention buffer
    pub retention: usize,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_lines: DEFAULT_INITIAL_LINES,
            initial_max_bytes: DEFAULT_INITIAL_MAX_BYTES,
            retention: DEFAULT_RETENTION,
        }
    }
}

/// Drives an [`IncrementalReader`] over one file at a fixed cadence.
///
/// All stream state lives inside the spawned task; callers only send commands
/// and watch the published [`StreamStatus`]. Reads run on the blocking pool
/// one at a time, so a cycle is never dispatched while another is in flight.
pub struct TailScheduler {
    control: StreamControl,
    buffer: RetentionBuffer<ClassifiedRecord>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl TailScheduler {
    /// Start tailing `source`. Must be called inside a Tokio runtime.
    pub fn spawn(source: LogSource, options: TailOptions) -> Self {
        let buffer = RetentionBuffer::new(options.retention);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StreamStatus::new(source.info().clone()));
        let cancel = CancellationToken::new();

        let worker = TailWorker {
            cursor: TailCursor::new(source.id()),
            source,
            reader: IncrementalReader::new(options.initial_max_bytes),
            initial_lines: options.initial_lines,
            loaded: false,
            buffer: buffer.clone(),
            status: status_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run(command_rx, options.poll_interval));

        Self {
            control: StreamControl::new(command_tx, status_rx),
            buffer,
            cancel,
            task,
        }
    }

    /// Handle for pause/resume/refresh/clear
    pub fn control(&self) -> &StreamControl {
        &self.control
    }

    pub fn buffer(&self) -> &RetentionBuffer<ClassifiedRecord> {
        &self.buffer
    }

    pub fn status(&self) -> StreamStatus {
        self.control.status()
    }

    /// Stop the timer. A read still running on the blocking pool finishes but
    /// its result is dropped.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for TailScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// What a finished read hands to the buffer
struct Delivery {
    lines: Vec<String>,
    cursor: TailCursor,
    /// Replace the buffer instead of appending
    replace: bool,
    rotated: bool,
}

struct TailWorker {
    source: LogSource,
    cursor: TailCursor,
    reader: IncrementalReader,
    initial_lines: usize,
    /// Whether the bounded initial load has happened
    loaded: bool,
    buffer: RetentionBuffer<ClassifiedRecord>,
    status: watch::Sender<StreamStatus>,
    cancel: CancellationToken,
}

impl TailWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            source = %self.source.id(),
            path = %self.source.path().display(),
            interval_ms = poll_interval.as_millis() as u64,
            "tail scheduler started"
        );

        loop {
            // Cancellation wins over a ready tick or command
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },

                _ = ticker.tick() => {
                    if !self.status.borrow().state.paused {
                        self.cycle().await;
                    }
                }
            }
        }

        tracing::info!(source = %self.source.id(), "tail scheduler stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Pause => self.status.send_modify(|s| s.state.paused = true),
            Command::Resume => self.status.send_modify(|s| s.state.paused = false),
            Command::ForceRefresh => self.cycle().await,
            Command::Clear => self.clear().await,
            Command::SetFiltered(filtered) => {
                self.status.send_modify(|s| s.state.filtered = filtered)
            }
        }
    }

    /// One read cycle. The cursor only moves when the read succeeds, and a
    /// read that completes after shutdown is dropped.
    async fn cycle(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut source = self.source.clone();
        let cursor = self.cursor.clone();
        let reader = self.reader.clone();
        let loaded = self.loaded;
        let initial_lines = self.initial_lines;

        let job = tokio::task::spawn_blocking(move || {
            let delivery = read_once(&reader, &mut source, &cursor, loaded, initial_lines);
            (source, delivery)
        });

        let joined = tokio::select! {
            biased;

            _ = self.cancel.cancelled() => return,
            joined = job => joined,
        };
        if self.cancel.is_cancelled() {
            return;
        }

        match joined {
            Ok((source, result)) => {
                self.source = source;
                match result {
                    Ok(delivery) => self.apply(delivery),
                    Err(e) => self.record_failure(e.to_string()),
                }
            }
            Err(e) => self.record_failure(format!("read task failed: {e}")),
        }
    }

    fn apply(&mut self, delivery: Delivery) {
        let records: Vec<ClassifiedRecord> =
            delivery.lines.iter().map(|line| classify(line)).collect();

        if delivery.replace {
            self.buffer.replace_all(records);
        } else if !records.is_empty() {
            self.buffer.append(records);
        }

        // Until the file exists there is nothing to bound; keep the next read
        // an initial load.
        if self.source.info().exists {
            self.loaded = true;
        }
        self.cursor = delivery.cursor;

        let info = self.source.info().clone();
        let offset = self.cursor.offset();
        self.status.send_modify(|s| {
            s.info = info;
            s.state.last_known_offset = offset;
            s.last_read_at = Some(Utc::now());
            s.last_error = None;
            s.consecutive_failures = 0;
            s.reads += 1;
            if delivery.rotated {
                s.rotations += 1;
            }
        });
    }

    fn record_failure(&mut self, error: String) {
        tracing::warn!(source = %self.source.id(), %error, "log read failed, will retry");
        self.status.send_modify(|s| {
            s.last_error = Some(error);
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        });
    }

    async fn clear(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut source = self.source.clone();
        let job = tokio::task::spawn_blocking(move || {
            let result = source.truncate();
            (source, result)
        });

        let joined = tokio::select! {
            biased;

            _ = self.cancel.cancelled() => return,
            joined = job => joined,
        };
        if self.cancel.is_cancelled() {
            return;
        }

        match joined {
            Ok((source, Ok(()))) => {
                self.source = source;
                self.cursor = self.cursor.reset();
                self.loaded = true;
                self.buffer.clear();

                let info = self.source.info().clone();
                self.status.send_modify(|s| {
                    s.info = info;
                    s.state.last_known_offset = 0;
                    s.last_error = None;
                    s.consecutive_failures = 0;
                });
                tracing::info!(source = %self.source.id(), "log source cleared");
            }
            Ok((_, Err(e))) => self.record_failure(e.to_string()),
            Err(e) => self.record_failure(format!("clear task failed: {e}")),
        }
    }
}

fn read_once(
    reader: &IncrementalReader,
    source: &mut LogSource,
    cursor: &TailCursor,
    loaded: bool,
    initial_lines: usize,
) -> Result<Delivery> {
    if loaded {
        let outcome = reader.read_new_lines(source, cursor)?;
        Ok(Delivery {
            lines: outcome.lines,
            cursor: outcome.cursor,
            replace: outcome.rotated,
            rotated: outcome.rotated,
        })
    } else {
        let load = reader.initial_load(source, initial_lines)?;
        Ok(Delivery {
            lines: load.lines,
            cursor: load.cursor,
            replace: load.info.exists,
            rotated: false,
        })
    }
}
