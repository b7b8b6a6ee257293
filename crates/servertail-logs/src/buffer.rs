use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use servertail_types::Severity;

/// Rolling cap for the console stream
pub const DEFAULT_RETENTION: usize = 2000;

/// Lines kept from the initial load
pub const DEFAULT_INITIAL_LINES: usize = 1000;

/// Cap for the internal application log
pub const DEFAULT_INTERNAL_RETENTION: usize = 500;

/// Thread-safe bounded buffer with strict FIFO eviction.
///
/// Every mutation happens under a single write lock, so readers on another
/// task see either none or all of a batch. Entries are stored as `Arc<T>` to
/// keep snapshots cheap.
pub struct RetentionBuffer<T> {
    /// Internal storage
    entries: Arc<RwLock<VecDeque<Arc<T>>>>,

    /// Maximum capacity
    capacity: usize,

    /// Bumped on every mutation so consumers can cache derived views
    generation: Arc<AtomicU64>,
}

impl<T> Clone for RetentionBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            capacity: self.capacity,
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<T> RetentionBuffer<T> {
    /// Create a new buffer with the given capacity (at least one entry)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append a batch, evicting the oldest entries so that the length never
    /// exceeds the capacity. Returns how many of the new items were kept.
    pub fn append<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut incoming: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        if incoming.is_empty() {
            return 0;
        }
        // A batch larger than the buffer only contributes its tail
        if incoming.len() > self.capacity {
            incoming.drain(..incoming.len() - self.capacity);
        }

        let mut entries = self.entries.write();
        let overflow = (entries.len() + incoming.len()).saturating_sub(self.capacity);
        entries.drain(..overflow);
        let kept = incoming.len();
        entries.extend(incoming);
        self.generation.fetch_add(1, Ordering::Release);
        kept
    }

    /// Push a single entry
    pub fn push(&self, item: T) {
        self.append(std::iter::once(item));
    }

    /// Atomically swap the whole content (used after a rotation)
    pub fn replace_all<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut incoming: VecDeque<Arc<T>> = items.into_iter().map(Arc::new).collect();
        while incoming.len() > self.capacity {
            incoming.pop_front();
        }

        *self.entries.write() = incoming;
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// All entries, oldest first (Arc clones are cheap)
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.read().iter().cloned().collect()
    }

    /// Get the last N entries
    pub fn tail(&self, n: usize) -> Vec<Arc<T>> {
        let entries = self.entries.read();
        let start = entries.len().saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }

    /// Get entries in a range (for virtual scrolling)
    pub fn range(&self, start: usize, count: usize) -> Vec<Arc<T>> {
        let entries = self.entries.read();
        entries.iter().skip(start).take(count).cloned().collect()
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mutation counter; changes whenever the content may have changed
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Count entries per severity
    pub fn count_by<F>(&self, severity_of: F) -> SeverityCounts
    where
        F: Fn(&T) -> Severity,
    {
        let entries = self.entries.read();
        let mut counts = SeverityCounts::default();
        for entry in entries.iter() {
            counts.increment(severity_of(entry));
        }
        counts
    }
}

/// Counts per severity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub log: usize,
    pub warn: usize,
    pub error: usize,
    pub debug: usize,
    pub info: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    fn increment(&mut self, severity: Severity) {
        match severity {
            Severity::Log => self.log += 1,
            Severity::Warn => self.warn += 1,
            Severity::Error => self.error += 1,
            Severity::Debug => self.debug += 1,
            Severity::Info => self.info += 1,
            Severity::Unknown => self.unknown += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Log => self.log,
            Severity::Warn => self.warn,
            Severity::Error => self.error,
            Severity::Debug => self.debug,
            Severity::Info => self.info,
            Severity::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.log + self.warn + self.error + self.debug + self.info + self.unknown
    }
}
