//! Redis-style glob patterns.
//!
//! Supported syntax: `*` (any run), `?` (one character), `[abc]`, `[a-z]`,
//! `[^abc]` and `\` to escape the next character. Patterns are compiled to an
//! anchored regular expression once and matched against whole keys.
//!
//! Malformed input is read the way Redis `MATCH` reads it: a trailing `\` is
//! a literal backslash, an unclosed `[` runs to the end of the pattern, a
//! reversed range is swapped, and `[]` matches nothing.

use hotquery_core::{HotqueryResult, StorageError};
use regex::Regex;

/// A compiled key pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern.
    pub fn compile(pattern: &str) -> HotqueryResult<Self> {
        let translated = translate(pattern);
        let regex = Regex::new(&translated).map_err(|e| StorageError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Never matches; stands in for an empty character class.
const NOTHING: &str = r"\b\B";

fn escaped(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0u8; 4]))
}

fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&escaped(chars[i]));
            }
            '[' => {
                i += 1;
                let negated = chars.get(i) == Some(&'^');
                if negated {
                    i += 1;
                }

                let mut class = String::new();
                while i < chars.len() {
                    let c = chars[i];
                    if c == '\\' && i + 1 < chars.len() {
                        i += 1;
                        class.push_str(&escaped(chars[i]));
                    } else if c == ']' {
                        break;
                    } else if i + 2 < chars.len() && chars[i + 1] == '-' {
                        let (start, end) = if chars[i + 2] < c {
                            (chars[i + 2], c)
                        } else {
                            (c, chars[i + 2])
                        };
                        class.push_str(&escaped(start));
                        class.push('-');
                        class.push_str(&escaped(end));
                        i += 2;
                    } else {
                        class.push_str(&escaped(c));
                    }
                    i += 1;
                }

                match (class.is_empty(), negated) {
                    (true, false) => out.push_str(NOTHING),
                    (true, true) => out.push('.'),
                    (false, false) => {
                        out.push('[');
                        out.push_str(&class);
                        out.push(']');
                    }
                    (false, true) => {
                        out.push_str("[^");
                        out.push_str(&class);
                        out.push(']');
                    }
                }
            }
            other => out.push_str(&escaped(other)),
        }
        i += 1;
    }

    out.push('$');
    out
}

// =============================================================================
// TESTS
// =============================================================================
