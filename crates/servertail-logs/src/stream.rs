use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use servertail_types::{SchedulerState, SourceInfo, StreamState};

/// Requests a consumer can send to a running stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Pause,
    Resume,
    /// One read cycle regardless of the pause flag
    ForceRefresh,
    /// Empty the source and the buffer, cursor back to 0
    Clear,
    SetFiltered(bool),
}

/// Snapshot of a stream published after every state change or read cycle
#[derive(Clone, Debug, PartialEq)]
pub struct StreamStatus {
    pub state: StreamState,
    pub info: SourceInfo,
    /// Last successful read (or last pushed record)
    pub last_read_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub rotations: u64,
    /// Completed read cycles
    pub reads: u64,
    /// Records held back while paused (push streams only)
    pub pending: usize,
}

impl StreamStatus {
    pub fn new(info: SourceInfo) -> Self {
        Self {
            state: StreamState::default(),
            info,
            last_read_at: None,
            last_error: None,
            consecutive_failures: 0,
            rotations: 0,
            reads: 0,
            pending: 0,
        }
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.state.scheduler_state()
    }

    /// Shown data may be out of date because the latest reads failed
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Cloneable handle for driving a stream from another task
#[derive(Clone, Debug)]
pub struct StreamControl {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<StreamStatus>,
}

impl StreamControl {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<StreamStatus>,
    ) -> Self {
        Self { commands, status }
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    /// Pause when running, resume when paused
    pub fn toggle_pause(&self) {
        if self.status().state.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn force_refresh(&self) {
        self.send(Command::ForceRefresh);
    }

    pub fn clear(&self) {
        self.send(Command::Clear);
    }

    pub fn set_filtered(&self, filtered: bool) {
        self.send(Command::SetFiltered(filtered));
    }

    pub fn toggle_filtered(&self) {
        self.set_filtered(!self.status().state.filtered);
    }

    /// Latest published status
    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    fn send(&self, command: Command) {
        // A closed channel means the stream was torn down; nothing to drive
        if self.commands.send(command).is_err() {
            tracing::debug!(?command, "stream already stopped");
        }
    }
}
