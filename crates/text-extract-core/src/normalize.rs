//! Whitespace normalization of recognized text

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Collapse every whitespace run to one space and end each text with `\n`
///
/// Leading and trailing runs are collapsed, not trimmed. Texts are joined in
/// input order; empty input yields an empty string.
pub fn normalize<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(|text| {
            let mut line = WHITESPACE.replace_all(text.as_ref(), " ").into_owned();
            line.push('\n');
            line
        })
        .collect()
}
