use regex::Regex;
use std::sync::LazyLock;

use servertail_types::{ClassifiedRecord, Severity};

/// `SEVERITY : Category <metadata> > message`, severity optional. The greedy
/// metadata group makes the message everything after the last `>`.
const STRUCTURED_PATTERN: &str = r"(?is)^(?:(LOG|WARN|ERROR|DEBUG|INFO)\s*)?:\s*(\w+)(.*)>(.*)$";

/// Prefix keywords, tried in order
const PREFIX_KEYWORDS: [Severity; 5] = [
    Severity::Error,
    Severity::Warn,
    Severity::Debug,
    Severity::Info,
    Severity::Log,
];

static DEFAULT_CLASSIFIER: LazyLock<LineClassifier> = LazyLock::new(LineClassifier::new);

/// Classify a raw line with the default rule list
pub fn classify(raw: &str) -> ClassifiedRecord {
    DEFAULT_CLASSIFIER.classify(raw)
}

enum Rule {
    /// Severity token, category word and message body
    Structured(Regex),
    /// Bare severity keyword at the start of the line
    Prefix(Severity),
}

/// Maps raw console lines to [`ClassifiedRecord`]s.
///
/// Rules are evaluated in order and the first match wins; the structured rule
/// comes first because it is the only one that yields a category. The
/// classifier is total: anything no rule accepts becomes `UNKNOWN`.
pub struct LineClassifier {
    rules: Vec<Rule>,
}

impl LineClassifier {
    pub fn new() -> Self {
        let structured =
            Regex::new(STRUCTURED_PATTERN).expect("structured console pattern is valid");

        let mut rules = vec![Rule::Structured(structured)];
        rules.extend(PREFIX_KEYWORDS.into_iter().map(Rule::Prefix));

        Self { rules }
    }

    /// Classify one raw line. Never fails.
    pub fn classify(&self, raw: &str) -> ClassifiedRecord {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ClassifiedRecord::new(Severity::Unknown, "", "", raw);
        }

        self.rules
            .iter()
            .find_map(|rule| Self::apply(rule, trimmed, raw))
            .unwrap_or_else(|| ClassifiedRecord::new(Severity::Unknown, "", trimmed, raw))
    }

    fn apply(rule: &Rule, trimmed: &str, raw: &str) -> Option<ClassifiedRecord> {
        match rule {
            Rule::Structured(re) => {
                let caps = re.captures(trimmed)?;
                let severity = caps
                    .get(1)
                    .and_then(|m| Severity::from_token(m.as_str()))
                    .unwrap_or(Severity::Unknown);
                let category = caps.get(2).map_or("", |m| m.as_str());
                let message = caps.get(4).map_or("", |m| m.as_str()).trim();
                Some(ClassifiedRecord::new(severity, category, message, raw))
            }
            Rule::Prefix(severity) => {
                let rest = strip_keyword(trimmed, severity.as_str())?;
                let rest = rest.trim_start();
                let message = rest.strip_prefix(':').unwrap_or(rest).trim();
                Some(ClassifiedRecord::new(*severity, "", message, raw))
            }
        }
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a case-insensitive keyword from the start of `text`. The keyword must
/// end at a word boundary, so `LOGGING` is not a `LOG` line.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}
