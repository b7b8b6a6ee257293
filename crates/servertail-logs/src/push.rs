use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use servertail_types::{PushRecord, SourceInfo};

use crate::buffer::{DEFAULT_INTERNAL_RETENTION, RetentionBuffer};
use crate::stream::{Command, StreamControl, StreamStatus};

/// Source id of the in-process application log
pub const INTERNAL_SOURCE_ID: &str = "internal";

/// Delivers records as they are produced instead of on a timer.
///
/// While paused, arriving records wait in a pending queue bounded by the same
/// retention as the buffer; resume or a forced refresh flushes them in order.
pub struct PushScheduler {
    control: StreamControl,
    buffer: RetentionBuffer<PushRecord>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl PushScheduler {
    /// Start draining `records`. Must be called inside a Tokio runtime.
    pub fn spawn(records: mpsc::UnboundedReceiver<PushRecord>, retention: usize) -> Self {
        let buffer = RetentionBuffer::new(retention);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let mut info = SourceInfo::new(INTERNAL_SOURCE_ID, PathBuf::new());
        info.exists = true;
        let (status_tx, status_rx) = watch::channel(StreamStatus::new(info));
        let cancel = CancellationToken::new();

        let worker = PushWorker {
            pending: VecDeque::new(),
            capacity: buffer.capacity(),
            buffer: buffer.clone(),
            status: status_tx,
        };
        let task = tokio::spawn(worker.run(records, command_rx, cancel.clone()));

        Self {
            control: StreamControl::new(command_tx, status_rx),
            buffer,
            cancel,
            task,
        }
    }

    /// Spawn with the default internal retention
    pub fn with_default_retention(records: mpsc::UnboundedReceiver<PushRecord>) -> Self {
        Self::spawn(records, DEFAULT_INTERNAL_RETENTION)
    }

    pub fn control(&self) -> &StreamControl {
        &self.control
    }

    pub fn buffer(&self) -> &RetentionBuffer<PushRecord> {
        &self.buffer
    }

    pub fn status(&self) -> StreamStatus {
        self.control.status()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PushScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PushWorker {
    pending: VecDeque<PushRecord>,
    capacity: usize,
    buffer: RetentionBuffer<PushRecord>,
    status: watch::Sender<StreamStatus>,
}

impl PushWorker {
    async fn run(
        mut self,
        mut records: mpsc::UnboundedReceiver<PushRecord>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },

                record = records.recv() => match record {
                    Some(record) => self.deliver(record),
                    // Producer gone; keep serving commands on what is retained
                    None => {
                        self.serve_commands(&mut commands, &cancel).await;
                        break;
                    }
                },
            }
        }
    }

    async fn serve_commands(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        cancel: &CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => return,
                },
            }
        }
    }

    fn deliver(&mut self, record: PushRecord) {
        if self.status.borrow().state.paused {
            if self.pending.len() == self.capacity {
                self.pending.pop_front();
            }
            self.pending.push_back(record);
            let pending = self.pending.len();
            self.status.send_modify(|s| s.pending = pending);
            return;
        }

        self.buffer.push(record);
        self.status.send_modify(|s| {
            s.last_read_at = Some(Utc::now());
            s.reads += 1;
        });
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.buffer.append(self.pending.drain(..));
        self.status.send_modify(|s| {
            s.pending = 0;
            s.last_read_at = Some(Utc::now());
            s.reads += 1;
        });
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Pause => self.status.send_modify(|s| s.state.paused = true),
            Command::Resume => {
                self.status.send_modify(|s| s.state.paused = false);
                self.flush();
            }
            Command::ForceRefresh => self.flush(),
            Command::Clear => {
                self.pending.clear();
                self.buffer.clear();
                self.status.send_modify(|s| s.pending = 0);
            }
            Command::SetFiltered(filtered) => {
                self.status.send_modify(|s| s.state.filtered = filtered)
            }
        }
    }
}
