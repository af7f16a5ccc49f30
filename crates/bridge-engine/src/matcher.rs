//! Glob-like pattern matching over segmented names
//!
//! Compiles patterns such as `chat.messages.*` or `chat:**` into
//! predicates. `*` matches exactly one segment, `**` matches any run
//! of segments (including across separators). Used for the
//! synchronizer's exclude/always-sync lists (dot-separated paths) and
//! the event bus's wildcard configuration keys (colon-separated
//! names).
//!
//! Pure and infallible: a pattern that fails to compile degrades to a
//! literal string match.

use regex::Regex;

/// Compiled pattern predicate
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: String,
    kind: MatchKind,
}

#[derive(Debug, Clone)]
enum MatchKind {
    /// No wildcards present; plain string equality
    Literal,
    /// Compiled wildcard pattern
    Wildcard(Regex),
}

impl PatternMatcher {
    /// Compile a dot-separated path pattern
    pub fn compile(pattern: &str) -> Self {
        Self::compile_with_separator(pattern, '.')
    }

    /// Compile a pattern with an explicit segment separator
    pub fn compile_with_separator(pattern: &str, separator: char) -> Self {
        if !pattern.contains('*') {
            return Self {
                pattern: pattern.to_string(),
                kind: MatchKind::Literal,
            };
        }

        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        let mut chars = pattern.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '*' {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    source.push_str(".*");
                } else {
                    source.push_str(&format!("[^{}]*", regex::escape(&separator.to_string())));
                }
            } else {
                source.push_str(&regex::escape(&ch.to_string()));
            }
        }
        source.push('$');

        match Regex::new(&source) {
            Ok(regex) => Self {
                pattern: pattern.to_string(),
                kind: MatchKind::Wildcard(regex),
            },
            // Degrade to literal match rather than surface an error
            Err(_) => Self {
                pattern: pattern.to_string(),
                kind: MatchKind::Literal,
            },
        }
    }

    /// The original pattern string
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the pattern contains wildcards
    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, MatchKind::Wildcard(_))
    }

    /// Test a candidate name or path against the pattern
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.kind {
            MatchKind::Literal => self.pattern == candidate,
            MatchKind::Wildcard(regex) => regex.is_match(candidate),
        }
    }
}
