//! Query text normalization
//!
//! Turns raw query lines into one canonical, lower-cased string that the
//! component scanner and the dependency analyzer can pattern-match against.
//! Only `--` line comments are understood; block comments and string
//! literals are not special-cased.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use withnest_core::DEFAULT_MAX_CROSS_JOIN_PASSES;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static LEADING_WITH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^with(?:\s|$)").unwrap());

/// `from`/`join`, a table with optional alias, a comma, then the next table
static CROSS_JOIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:from|join)\s+(?:.*?)(?:\s+as\s+)?(?:.*?)),(?:\s+)?((?:.*?)(?:\s|$))").unwrap()
});

/// Normalizes raw SQL text
#[derive(Debug, Clone)]
pub struct Normalizer {
    max_cross_join_passes: usize,
}

impl Normalizer {
    /// Create a normalizer with the default cross-join pass cap
    pub fn new() -> Self {
        Self {
            max_cross_join_passes: DEFAULT_MAX_CROSS_JOIN_PASSES,
        }
    }

    /// Create a normalizer with a custom cross-join pass cap
    pub fn with_max_cross_join_passes(max_cross_join_passes: usize) -> Self {
        Self { max_cross_join_passes }
    }

    /// Normalize a whole query text
    pub fn normalize(&self, text: &str) -> String {
        self.normalize_lines(text.lines())
    }

    /// Normalize a query given as lines
    ///
    /// Each line is whitespace-collapsed, lower-cased and stripped of its
    /// `--` comment; empty lines are dropped and a leading `with` keyword is
    /// removed. Lines holding a lone comma are merged into the previous line
    /// before shorthand table lists are rewritten as `cross join`.
    pub fn normalize_lines<'a, I>(&self, lines: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let cleaned: Vec<String> = lines.into_iter().filter_map(clean_line).collect();
        let query = cleaned.join("\n").replace("\n,\n", ",\n");

        self.rewrite_cross_joins(&query)
    }

    /// Rewrite `from a, b, c` into `from a cross join b cross join c`
    ///
    /// Matches never overlap, so each pass resolves one comma per table list;
    /// passes repeat until nothing matches or the cap is reached.
    pub fn rewrite_cross_joins(&self, query: &str) -> String {
        let mut query = query.to_string();

        for _ in 0..self.max_cross_join_passes {
            if !CROSS_JOIN_RE.is_match(&query) {
                return query;
            }
            query = CROSS_JOIN_RE
                .replace_all(&query, |caps: &Captures<'_>| {
                    format!("{} cross join {}", caps[1].trim_end(), &caps[2])
                })
                .into_owned();
        }

        if CROSS_JOIN_RE.is_match(&query) {
            tracing::warn!(
                passes = self.max_cross_join_passes,
                "cross join rewrite stopped at pass cap with shorthand table lists left"
            );
        }

        query
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse whitespace runs into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Drop everything from the first `--` onwards
pub fn strip_comment(line: &str) -> &str {
    match line.find("--") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn clean_line(line: &str) -> Option<String> {
    let collapsed = collapse_whitespace(line).to_lowercase();
    let uncommented = strip_comment(&collapsed).trim_end();
    let without_with = LEADING_WITH_RE.replace(uncommented, "");

    if without_with.is_empty() {
        None
    } else {
        Some(without_with.into_owned())
    }
}
