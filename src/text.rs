//! Text normalization and entity-name cleaning
//!
//! Shared by every extraction source: markup stripping, whitespace collapse,
//! and the validation rules that turn a raw mined string into a usable
//! entity-name candidate.

use once_cell::sync::Lazy;
use regex::Regex;

/// Corporate suffixes that mark a name as a legal entity rather than a brand.
/// Matched case-insensitively at the end of a name, optional trailing period.
pub const CORPORATE_SUFFIXES: &[&str] = &[
    "Inc",
    "Corp",
    "LLC",
    "Ltd",
    "GmbH",
    "AG",
    "SA",
    "SAS",
    "SpA",
    "BV",
    "NV",
    "Pty",
    "PLC",
    "SE",
    "Limited",
    "Corporation",
    "Company",
    "Incorporated",
];

/// Leading phrases stripped from page titles before treating them as names
const TITLE_PREFIXES: &[&str] = &["Welcome to", "Home", "About", "Official Website of"];

/// Trailing marketing words stripped from page titles
const TITLE_MARKETING: &[&str] = &["Services", "Solutions", "Products", "Website"];

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap()
});

static TITLE_SEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[|\u{2013}\u{2014}\-:]\s*").unwrap());

static TRAILING_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,;!?]+$").unwrap());

/// Strip markup from an HTML fragment, leaving collapsed visible text.
/// Script and style bodies are dropped entirely. Pure and total: any input
/// string yields some (possibly empty) text.
pub fn strip_markup(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_blocks, " ");
    normalize_whitespace(&without_tags)
}

/// Collapse internal whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean and validate a raw entity-name string.
///
/// Collapses whitespace and strips trailing punctuation, then rejects
/// anything shorter than 3 characters (noise) or longer than 100 (whole
/// sentences). Every candidate stored anywhere in the crate passes through
/// here, which is what upholds the [3,100] length invariant.
pub fn clean_entity_name(raw: &str) -> Option<String> {
    let collapsed = normalize_whitespace(raw);
    let cleaned = TRAILING_PUNCT_RE.replace(&collapsed, "").trim().to_string();

    // Counted in characters, not bytes: CJK and accented names are
    // mainstream inputs here
    let length = cleaned.chars().count();
    if length < 3 || length > 100 {
        return None;
    }
    Some(cleaned)
}

/// Extract an entity-name candidate from a page title.
///
/// Keeps the first segment before a separator (`|`, en/em-dash, hyphen,
/// colon), strips known lead-in phrases and trailing marketing words, then
/// applies the shared cleaning rule.
pub fn clean_title_entity(title: &str) -> Option<String> {
    let first_segment = TITLE_SEP_RE.split(title).next().unwrap_or(title);
    let mut cleaned = normalize_whitespace(first_segment);

    // get() guards against slicing mid-character in non-ASCII titles
    for prefix in TITLE_PREFIXES {
        if cleaned.len() > prefix.len() {
            if let Some(head) = cleaned.get(..prefix.len()) {
                if head.eq_ignore_ascii_case(prefix) {
                    cleaned = cleaned[prefix.len()..].trim().to_string();
                }
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for term in TITLE_MARKETING {
            if cleaned.len() > term.len() {
                let tail_start = cleaned.len() - term.len();
                let boundary = cleaned.as_bytes()[tail_start - 1] == b' ';
                if boundary && cleaned.get(tail_start..).is_some_and(|t| t.eq_ignore_ascii_case(term)) {
                    cleaned = cleaned[..tail_start].trim().to_string();
                    changed = true;
                }
            }
        }
    }

    clean_entity_name(&cleaned)
}

/// Check whether a name ends with a recognized corporate suffix.
///
/// Case-insensitive; periods are ignored so dotted acronym forms such as
/// "B.V." or "Inc." match their table entries.
pub fn has_corporate_suffix(name: &str) -> bool {
    let last_token = match name.split_whitespace().last() {
        Some(token) => token,
        None => return false,
    };
    let bare: String = last_token.chars().filter(|c| *c != '.').collect();
    CORPORATE_SUFFIXES
        .iter()
        .any(|suffix| bare.eq_ignore_ascii_case(suffix))
}
