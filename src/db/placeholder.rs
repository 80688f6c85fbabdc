//! Placeholder-syntax translation
//!
//! All repository SQL is authored once, in canonical `$1, $2, …` placeholder
//! syntax (PostgreSQL's native form). MySQL expects positional `?` markers,
//! so the MySQL dispatch path rewrites every `$n` token before execution.
//! Parameter order is positional and preserved: callers must bind values in
//! ascending `$n` order, which is how every statement in this crate is
//! written.
//!
//! Known ambiguity: a literal `$` followed by digits inside a string literal
//! would be rewritten too. No escaping rule is defined; no statement in this
//! crate carries such a literal.

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\d+)").unwrap());

/// Rewrite canonical `$n` placeholders to MySQL `?` markers.
///
/// Scans for the highest referenced parameter number, then substitutes each
/// `$i` globally, `i` ascending from 1. The word boundary keeps `$1` from
/// eating the prefix of `$10`.
pub fn translate_placeholders(sql: &str) -> String {
    let max_param = PLACEHOLDER_RE
        .captures_iter(sql)
        .filter_map(|c| c[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0);

    let mut translated = sql.to_string();
    for i in 1..=max_param {
        let token = Regex::new(&format!(r"\${}\b", i)).expect("valid placeholder pattern");
        translated = token.replace_all(&translated, "?").into_owned();
    }
    translated
}
