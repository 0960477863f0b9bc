//! Snippet rendering.
//!
//! The engine hands each paginated match to a `Highlighter` together with
//! its hit lines. `PlainHtmlHighlighter` renders line-numbered, escaped
//! HTML with hit lines marked; syntax-aware renderers plug in behind the
//! same trait.

use std::collections::BTreeSet;
use std::fmt::Write;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("highlighting {path} failed: {reason}")]
pub struct HighlightError {
    pub path: String,
    pub reason: String,
}

/// Renders file content as a snippet.
pub trait Highlighter: Send + Sync {
    /// Render `content` of `path`, emphasizing the 0-indexed `hits` lines.
    fn render(&self, path: &str, hits: &[usize], content: &[u8]) -> Result<String, HighlightError>;
}

/// Line-numbered HTML without tokenization.
///
/// Output shape:
/// `<pre class="chroma"><span class="line"><span class="ln">1</span>…</span>…</pre>`,
/// with `hl` added to the class of every hit line. Invalid UTF-8 is
/// replaced, not rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHtmlHighlighter;

impl Highlighter for PlainHtmlHighlighter {
    fn render(&self, _path: &str, hits: &[usize], content: &[u8]) -> Result<String, HighlightError> {
        let text = String::from_utf8_lossy(content);
        let hits: BTreeSet<usize> = hits.iter().copied().collect();

        let mut out = String::with_capacity(text.len() + text.len() / 2 + 32);
        out.push_str("<pre class=\"chroma\">");
        for (idx, line) in text.split('\n').enumerate() {
            let class = if hits.contains(&idx) { "line hl" } else { "line" };
            // Writing into a String cannot fail.
            let _ = write!(
                out,
                "<span class=\"{}\"><span class=\"ln\">{}</span>",
                class,
                idx + 1
            );
            escape_into(&mut out, line);
            out.push_str("\n</span>");
        }
        out.push_str("</pre>");
        Ok(out)
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
