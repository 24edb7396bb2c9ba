//! Query highlighting inside match labels.
//!
//! The produced markup is not sanitized: labels may already carry markup and
//! the query is user input. Renderers must pass the result through an
//! explicit trust step ([`trust_html`]) before injecting it.

use regex::{Captures, RegexBuilder};

/// Wrap every case-insensitive occurrence of `query` in `<strong>` tags.
/// An empty or absent query leaves the text untouched.
pub fn highlight(text: &str, query: Option<&str>) -> String {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return text.to_string();
    };

    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re
            .replace_all(text, |caps: &Captures<'_>| format!("<strong>{}</strong>", &caps[0]))
            .into_owned(),
        Err(e) => {
            tracing::warn!("highlight: query {query:?} not searchable: {e}");
            text.to_string()
        }
    }
}

/// Markup a renderer has explicitly agreed to inject verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TrustedHtml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The trust boundary: mark markup as safe to inject.
pub fn trust_html(html: impl Into<String>) -> TrustedHtml {
    TrustedHtml(html.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_every_occurrence() {
        assert_eq!(
            highlight("Banana split", Some("an")),
            "B<strong>an</strong><strong>an</strong>a split"
        );
    }

    #[test]
    fn test_highlight_is_case_insensitive_and_preserves_case() {
        assert_eq!(highlight("Alabama", Some("al")), "<strong>Al</strong>abama");
    }

    #[test]
    fn test_highlight_metacharacters_are_literal() {
        assert_eq!(highlight("C++", Some("++")), "C<strong>++</strong>");
        assert_eq!(highlight("a.b.c", Some(".")), "a<strong>.</strong>b<strong>.</strong>c");
        assert_eq!(highlight("cost (USD)", Some("(usd)")), "cost <strong>(USD)</strong>");
    }

    #[test]
    fn test_highlight_dollar_in_text_is_not_a_group_reference() {
        assert_eq!(highlight("$1 each", Some("$1")), "<strong>$1</strong> each");
    }

    #[test]
    fn test_empty_query_returns_text() {
        assert_eq!(highlight("Banana", None), "Banana");
        assert_eq!(highlight("Banana", Some("")), "Banana");
    }

    #[test]
    fn test_no_match_returns_text() {
        assert_eq!(highlight("Banana", Some("xyz")), "Banana");
    }

    #[test]
    fn test_trust_html_keeps_markup() {
        let trusted = trust_html(highlight("Ohio", Some("oh")));
        assert_eq!(trusted.as_str(), "<strong>Oh</strong>io");
    }
}
