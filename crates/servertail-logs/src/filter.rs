use regex::RegexSet;
use std::sync::Arc;

use servertail_types::ClassifiedRecord;

use crate::buffer::RetentionBuffer;
use crate::error::Result;

/// Patterns suppressed unless the user turns the noise filter off
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    r"^\s*$",
    // The dashboard's own RCON polling shows up in the console on every cycle
    r"(?i)\bRCON\b.*\b(?:new connection|connection (?:closed|lost)|client (?:connected|disconnected)|authenticated)\b",
    r"(?i)\bZNet\b.*\bSteamNetworking",
    r"(?i)\bheartbeat\b",
    r"(?i)\bchunk\s*(?:load|unload)",
];

/// Denylist of known-uninteresting console lines.
///
/// A line is noisy when any pattern matches its raw text or its classified
/// message. All patterns are evaluated in one pass, so their order has no
/// effect on the result.
#[derive(Clone)]
pub struct NoiseFilter {
    set: RegexSet,
    patterns: Vec<String>,
}

impl NoiseFilter {
    /// Compile a filter from a list of regular expressions
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        let set = RegexSet::new(&patterns)?;
        Ok(Self { set, patterns })
    }

    /// Filter built from [`DEFAULT_NOISE_PATTERNS`]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_NOISE_PATTERNS).expect("default noise patterns are valid")
    }

    /// Filter that never matches
    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Check a raw line against every pattern
    pub fn is_noisy_line(&self, raw: &str) -> bool {
        self.set.is_match(raw)
    }

    /// Check a classified record (raw text or message)
    pub fn is_noisy(&self, record: &ClassifiedRecord) -> bool {
        self.set.is_match(&record.raw) || self.set.is_match(&record.message)
    }

    /// Build the visible view of a buffer. The buffer itself is never touched,
    /// so turning the filter off shows everything again.
    pub fn view(&self, buffer: &RetentionBuffer<ClassifiedRecord>, enabled: bool) -> FilterView {
        let all = buffer.snapshot();
        let total = all.len();
        let records = if enabled && !self.is_empty() {
            all.into_iter().filter(|r| !self.is_noisy(r)).collect()
        } else {
            all
        };
        FilterView { records, total }
    }

    /// The source patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for NoiseFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseFilter")
            .field("patterns", &self.patterns)
            .finish()
    }
}

/// Records that survived the filter, plus the unfiltered count
#[derive(Clone, Debug, Default)]
pub struct FilterView {
    pub records: Vec<Arc<ClassifiedRecord>>,
    pub total: usize,
}

impl FilterView {
    pub fn visible(&self) -> usize {
        self.records.len()
    }

    pub fn hidden(&self) -> usize {
        self.total - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    #[test]
    fn test_default_patterns_match_noise() {
        let filter = NoiseFilter::with_defaults();
        assert!(filter.is_noisy_line(""));
        assert!(filter.is_noisy_line("LOG  : Network f:1> RCON: new connection from 127.0.0.1"));
        assert!(filter.is_noisy_line("heartbeat sent"));
        assert!(!filter.is_noisy_line("ERROR : Zombie f:1> something bad happened"));
    }

    #[test]
    fn test_matches_message_or_raw() {
        let filter = NoiseFilter::new(["^ping$"]).unwrap();
        let record = classify("INFO: ping");
        assert!(!filter.is_noisy_line(&record.raw));
        assert!(filter.is_noisy(&record));
    }

    #[test]
    fn test_pattern_order_is_irrelevant() {
        let a = NoiseFilter::new(["foo", "bar"]).unwrap();
        let b = NoiseFilter::new(["bar", "foo"]).unwrap();
        for line in ["foo", "bar", "baz", "foobar"] {
            assert_eq!(a.is_noisy_line(line), b.is_noisy_line(line));
        }
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(NoiseFilter::new(["("]).is_err());
    }

    #[test]
    fn test_view_is_non_destructive() {
        let buffer = RetentionBuffer::new(10);
        buffer.append(
            ["INFO: ready", "heartbeat", "WARN: slow tick", ""]
                .into_iter()
                .map(classify),
        );
        let filter = NoiseFilter::with_defaults();

        let filtered = filter.view(&buffer, true);
        assert_eq!(filtered.total, 4);
        assert_eq!(filtered.visible(), 2);
        assert_eq!(filtered.hidden(), 2);
        assert_eq!(buffer.len(), 4);

        let unfiltered = filter.view(&buffer, false);
        assert_eq!(unfiltered.visible(), 4);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = NoiseFilter::empty();
        assert!(filter.is_empty());
        assert!(!filter.is_noisy_line(""));
    }
}
