//! Heuristic predicates over raw query text.
//!
//! None of these build a parse tree. Each inspects the text for a known
//! pattern so its false-positive and false-negative behaviour can be tested
//! in isolation.

const OUTPUT_FORMATS: [&str; 5] = ["json", "xml", "csv", "custom", "popup"];
const STATEMENT_KEYWORDS: [&str; 5] = ["node", "way", "relation", "nwr", "area"];
const FILTERED_SELECTORS: [&str; 4] = ["node[", "way[", "relation[", "nwr["];
const GEOGRAPHIC_CONSTRAINTS: [&str; 5] = ["around:", "[bbox", "area[", "{{bbox}}", "poly:"];
const RECURSIVE_EXPANSION: &str = "(.;>;)";

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `[out:<format>` with a known format, or a `[bbox` setting.
pub fn has_output_declaration(query: &str) -> bool {
    let declares_format = query.match_indices("[out:").any(|(idx, pat)| {
        let rest = &query[idx + pat.len()..];
        OUTPUT_FORMATS.iter().any(|format| rest.starts_with(format))
    });
    declares_format || query.contains("[bbox")
}

/// A statement keyword immediately followed by `[` or `(`, or a recursion
/// operator anywhere in the text.
pub fn has_query_statement(query: &str) -> bool {
    let has_statement = STATEMENT_KEYWORDS.iter().any(|keyword| {
        query.match_indices(keyword).any(|(idx, pat)| {
            matches!(query.as_bytes().get(idx + pat.len()), Some(b'[') | Some(b'('))
        })
    });
    has_statement || query.contains('<') || query.contains('>')
}

/// A standalone `out` token. The `[out:` settings prefix does not count.
pub fn has_output_statement(query: &str) -> bool {
    let bytes = query.as_bytes();
    query.match_indices("out").any(|(idx, pat)| {
        let before = idx.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(idx + pat.len()).copied();
        let bounded_before = before.map_or(true, |b| !is_word_byte(b) && b != b'[');
        let bounded_after = after.map_or(true, |b| !is_word_byte(b));
        bounded_before && bounded_after
    })
}

/// Approximate statement count: number of `;` separators.
pub fn statement_count(query: &str) -> usize {
    query.bytes().filter(|b| *b == b';').count()
}

/// Uses a tag-filtered element selector such as `node[`.
pub fn uses_filtered_selector(query: &str) -> bool {
    FILTERED_SELECTORS.iter().any(|s| query.contains(s))
}

/// Carries at least one geographic restriction.
pub fn has_geographic_constraint(query: &str) -> bool {
    GEOGRAPHIC_CONSTRAINTS.iter().any(|c| query.contains(c))
}

/// Contains the literal `(.;>;)` recurse-down idiom.
pub fn has_recursive_expansion(query: &str) -> bool {
    query.contains(RECURSIVE_EXPANSION)
}

/// Declares `[timeout:N]` with a numeric N.
pub fn has_timeout_setting(query: &str) -> bool {
    query.match_indices("[timeout:").any(|(idx, pat)| {
        let rest = &query[idx + pat.len()..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        digits > 0 && rest.as_bytes().get(digits) == Some(&b']')
    })
}

/// Integer radius of every `around:N` occurrence, in order.
///
/// Only the leading digits are read, so `around:1500.5` yields 1500.
/// Values too large for `u64` saturate. Occurrences without digits
/// (e.g. `around.set:`) are skipped.
pub fn around_radii(query: &str) -> impl Iterator<Item = u64> + '_ {
    query.match_indices("around:").filter_map(move |(idx, pat)| {
        let rest = query[idx + pat.len()..].trim_start();
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return None;
        }
        Some(rest[..len].parse::<u64>().unwrap_or(u64::MAX))
    })
}
