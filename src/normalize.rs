//! Conversion of escaped inline-code markup in table-of-contents entries and
//! headings into live `<code>` elements.
//!
//! Documentation generators sometimes escape the angle brackets of `<code>` and
//! `<tt>` in titles, leaving `&lt;code&gt;foo&lt;/code&gt;` in the page. For the
//! elements in scope the first such sequence of each kind is turned back into real
//! markup. The `<tt>` form becomes `<code>` as well.

use std::collections::BTreeSet;

use html::{Document, NodePath};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, span, warn, Level};

use crate::hook::PostRenderHook;

/// Id of the table-of-contents container written by poxy
pub const DEFAULT_TOC_ID: &str = "poxy-toc";

/// Headings rewritten wherever they appear
pub const HEADING_TAGS: [&str; 5] = ["h1", "h2", "h3", "h4", "h5"];

lazy_static! {
    // The capture never crosses a line terminator
    static ref ESCAPED_CODE: Regex =
        Regex::new(r"&lt;code&gt;([^\n\r\x{2028}\x{2029}]*?)&lt;/code&gt;").unwrap();
    static ref ESCAPED_TT: Regex =
        Regex::new(r"&lt;tt&gt;([^\n\r\x{2028}\x{2029}]*?)&lt;/tt&gt;").unwrap();
}

/// Replace the first escaped `<code>` sequence, then the first escaped `<tt>`
/// sequence of the result, with a live `<code>` element.
pub fn rewrite_markup(markup: &str) -> String {
    let markup = ESCAPED_CODE.replacen(markup, 1, "<code>${1}</code>");
    ESCAPED_TT
        .replacen(&markup, 1, "<code>${1}</code>")
        .into_owned()
}

/// Normalize `document` using the default table-of-contents id
pub fn normalize(document: &mut Document) -> usize {
    Normalizer::default().normalize(document)
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Normalizer {
    toc_id: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TOC_ID)
    }
}

impl Normalizer {
    pub fn new(toc_id: impl Into<String>) -> Self {
        Self {
            toc_id: toc_id.into(),
        }
    }

    pub fn toc_id(&self) -> &str {
        &self.toc_id
    }

    /// Paths of the elements in scope, in document order: every `li` whose parent is
    /// a `ul` inside the first element carrying the table-of-contents id, plus every
    /// `h1`..`h5` in the page.
    pub fn select(&self, document: &Document) -> BTreeSet<NodePath> {
        let mut targets = BTreeSet::new();
        if let Some((toc_path, toc)) = document.find_by_id(&self.toc_id) {
            // Parent `None` means a direct child of the container itself
            for (path, element, parent) in toc.descendants() {
                if element.name == "li" && parent.map_or(false, |p| p.name == "ul") {
                    targets.insert(toc_path.join(&path));
                }
            }
        }
        for (path, element, _) in document.descendants() {
            if HEADING_TAGS.contains(&element.name.as_str()) {
                targets.insert(path);
            }
        }
        targets
    }

    /// Rewrite the inner markup of every element in scope, returning how many of them
    /// changed.
    ///
    /// The patterns see inner markup as a browser serializes it, so `&#60;code>` and
    /// `&lt;code&gt;` are the same sequence. Elements are visited last to first so that
    /// rewriting one never moves another that is still pending. The markup is always
    /// written back, even when nothing matched. Markup that no longer parses leaves
    /// the element as it was.
    pub fn normalize(&self, document: &mut Document) -> usize {
        let span = span!(Level::DEBUG, "Normalizing inline code", toc_id = %self.toc_id);
        let _enter = span.enter();

        let targets = self.select(document);
        debug!(count = targets.len(), "Selected elements");
        let mut changed = 0;
        for path in targets.iter().rev() {
            let Some(element) = document.element_at_mut(path) else {
                continue;
            };
            let before = element.inner_html();
            let after = rewrite_markup(&before);
            match element.set_inner_html(&after) {
                Ok(()) if after != before => {
                    debug!(element = %element.name, path = ?path.0, "Rewrote inline code");
                    changed += 1;
                }
                Ok(()) => {}
                Err(e) => {
                    warn!(element = %element.name, path = ?path.0, "Kept markup: {}", e)
                }
            }
        }
        changed
    }
}

impl PostRenderHook for Normalizer {
    fn name(&self) -> &str {
        "inline-code"
    }

    fn on_ready(&self, document: &mut Document) {
        let changed = self.normalize(document);
        debug!(changed, "Inline code normalized");
    }
}
