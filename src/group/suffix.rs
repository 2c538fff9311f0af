//! Trailing-suffix patterns stripped from titles before grouping.
//!
//! Titles in the same series usually differ only by a trailing marker
//! ("part 2", "vol. 3", "#4", a bare number). The table below pairs each
//! convention with a semantic tag; the matcher is built from the table,
//! so adding a new convention is a data change, not an algorithm change.
//! Order matters: the alternation is tried left to right, so worded
//! forms that end in digits must precede the bare-number pattern only
//! where ambiguity is acceptable.

use std::sync::OnceLock;

use regex::Regex;

/// One trailing-title convention.
pub(crate) struct SuffixPattern {
    /// Semantic tag, for diagnostics and tests.
    pub tag: &'static str,
    /// Regex fragment matching the suffix (no anchors, no separators).
    pub pattern: &'static str,
}

/// Known conventions, tried in order.
pub(crate) const SUFFIX_PATTERNS: &[SuffixPattern] = &[
    SuffixPattern {
        tag: "part",
        pattern: r"part(?:e)?\s*\d+",
    },
    SuffixPattern {
        tag: "set",
        pattern: r"set\s*[a-z0-9]+",
    },
    SuffixPattern {
        tag: "numbered",
        pattern: r"#[.\s]?\d+",
    },
    SuffixPattern {
        tag: "bare-number",
        pattern: r"\d+",
    },
    SuffixPattern {
        tag: "volume",
        pattern: r"vol(?:ume)?\s*\d+",
    },
    SuffixPattern {
        tag: "chapter-es",
        pattern: r"cap(?:itulo)?\s*\d+",
    },
    SuffixPattern {
        tag: "chapter",
        pattern: r"ch(?:apter)?\s*\d+",
    },
    SuffixPattern {
        tag: "episode",
        pattern: r"ep(?:isode)?\s*\d+",
    },
    SuffixPattern {
        tag: "page-es",
        pattern: r"pagina\s*\d+",
    },
    SuffixPattern {
        tag: "page",
        pattern: r"page\s*\d+",
    },
];

/// The compiled matcher: optional separators, any convention, end of string.
#[allow(clippy::expect_used)]
fn suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = SUFFIX_PATTERNS
            .iter()
            .map(|p| p.pattern)
            .collect::<Vec<_>>()
            .join("|");
        let full = format!(r"(?i)[\s._-]*(?:{alternation})$");
        Regex::new(&full).expect("suffix pattern table must compile")
    })
}

/// Removes one trailing suffix convention from `title`, returning the
/// trimmed remainder (possibly empty).
pub(crate) fn strip_trailing_suffix(title: &str) -> String {
    suffix_regex().replace(title, "").trim().to_string()
}
