//! Output escaping.
//!
//! Escaped variable tags (`{{name}}`) pass their formatted text through the
//! compiler's [`Escaper`]; unescaped tags (`{{{name}}}`, `{{&name}}`) bypass
//! it. The default escaper is [`Escapers::html`].

use std::borrow::Cow;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Transforms formatted variable text before it is written to the output.
pub trait Escaper: Send + Sync {
    /// Escapes `raw`, borrowing it unchanged when nothing needs escaping.
    fn escape<'a>(&self, raw: &'a str) -> Cow<'a, str>;
}

impl<F> Escaper for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn escape<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        Cow::Owned(self(raw))
    }
}

const HTML_ESCAPES: [(&str, &str); 7] = [
    ("&", "&amp;"),
    ("'", "&#39;"),
    ("\"", "&quot;"),
    ("<", "&lt;"),
    (">", "&gt;"),
    ("`", "&#x60;"),
    ("=", "&#x3D;"),
];

static HTML: Lazy<Arc<dyn Escaper>> = Lazy::new(|| Escapers::simple(&HTML_ESCAPES));
static NONE: Lazy<Arc<dyn Escaper>> = Lazy::new(|| Arc::new(NoEscaper));

/// Factories for the built-in escapers.
pub struct Escapers;

impl Escapers {
    /// Escapes `& ' " < > \` =` as HTML entities.
    ///
    /// # Examples
    ///
    /// ```
    /// use stache_rs_template::escape::Escapers;
    ///
    /// let html = Escapers::html();
    /// assert_eq!(html.escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    /// ```
    pub fn html() -> Arc<dyn Escaper> {
        Arc::clone(&HTML)
    }

    /// Passes text through unchanged.
    pub fn none() -> Arc<dyn Escaper> {
        Arc::clone(&NONE)
    }

    /// Builds an escaper that replaces each `from` with its `to`, applied in
    /// order. Single ASCII-character sources are handled in one pass.
    pub fn simple(pairs: &[(&str, &str)]) -> Arc<dyn Escaper> {
        Arc::new(SimpleEscaper::new(pairs))
    }
}

/// The identity escaper.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEscaper;

impl Escaper for NoEscaper {
    fn escape<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(raw)
    }
}

/// A table-driven replacement escaper.
#[derive(Debug, Clone)]
pub struct SimpleEscaper {
    strategy: Strategy,
}

#[derive(Debug, Clone)]
enum Strategy {
    Table(Box<[Option<Box<str>>; 128]>),
    Ordered(Vec<(String, String)>),
}

impl SimpleEscaper {
    /// Creates an escaper from `(from, to)` pairs.
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let single_ascii = pairs
            .iter()
            .all(|(from, _)| from.len() == 1 && from.is_ascii());
        let strategy = if single_ascii {
            let mut table: Box<[Option<Box<str>>; 128]> = Box::new(std::array::from_fn(|_| None));
            for (from, to) in pairs {
                let slot = usize::from(from.as_bytes()[0]);
                if table[slot].is_none() {
                    table[slot] = Some((*to).into());
                }
            }
            Strategy::Table(table)
        } else {
            Strategy::Ordered(
                pairs
                    .iter()
                    .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                    .collect(),
            )
        };
        Self { strategy }
    }
}

impl Escaper for SimpleEscaper {
    fn escape<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        match &self.strategy {
            Strategy::Table(table) => escape_with_table(table, raw),
            Strategy::Ordered(pairs) => {
                let mut text = Cow::Borrowed(raw);
                for (from, to) in pairs {
                    if !from.is_empty() && text.contains(from.as_str()) {
                        text = Cow::Owned(text.replace(from.as_str(), to));
                    }
                }
                text
            }
        }
    }
}

fn escape_with_table<'a>(table: &[Option<Box<str>>; 128], raw: &'a str) -> Cow<'a, str> {
    let mut escaped: Option<String> = None;
    let mut last = 0;
    for (ii, byte) in raw.bytes().enumerate() {
        // Bytes below 128 never occur inside a multi-byte character, so `ii`
        // is a char boundary whenever a replacement matches.
        let Some(Some(replacement)) = table.get(usize::from(byte)) else {
            continue;
        };
        let buf = escaped.get_or_insert_with(|| String::with_capacity(raw.len() + 16));
        buf.push_str(&raw[last..ii]);
        buf.push_str(replacement);
        last = ii + 1;
    }
    match escaped {
        None => Cow::Borrowed(raw),
        Some(mut buf) => {
            buf.push_str(&raw[last..]);
            Cow::Owned(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escapes_all_special_chars() {
        let html = Escapers::html();
        assert_eq!(
            html.escape(r#"&'"<>`="#),
            "&amp;&#39;&quot;&lt;&gt;&#x60;&#x3D;"
        );
    }

    #[test]
    fn test_html_borrows_when_clean() {
        let html = Escapers::html();
        assert!(matches!(html.escape("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_html_preserves_multibyte_text() {
        let html = Escapers::html();
        assert_eq!(html.escape("café <ünïcode> ✓"), "café &lt;ünïcode&gt; ✓");
    }

    #[test]
    fn test_none_is_identity() {
        assert_eq!(Escapers::none().escape("<b>&</b>"), "<b>&</b>");
    }

    #[test]
    fn test_simple_ordered_replacement() {
        let escaper = Escapers::simple(&[("\\", "\\\\"), ("\"", "\\\""), ("\n", "\\n")]);
        assert_eq!(escaper.escape("say \"hi\"\n"), "say \\\"hi\\\"\\n");

        let multi = Escapers::simple(&[("ab", "x"), ("xc", "y")]);
        assert_eq!(multi.escape("abc"), "y");
    }

    #[test]
    fn test_closure_escaper() {
        let upper = |raw: &str| raw.to_uppercase();
        assert_eq!(upper.escape("shout"), "SHOUT");
    }
}
