use std::fmt::{self, Display, Formatter, Write};

use super::dom::*;
use super::entities::{canonical_attribute, canonical_text};
use super::parsing::{fragment, ParseError};

/// How text and attributes are written out
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Markup {
    /// As they were read, so an untouched tree renders to its source
    Source,
    /// The way a browser serializes `innerHTML`
    Canonical,
}

enum Step<'a> {
    Content(&'a DOMContent, bool),
    Close(&'a str),
}

fn write_attributes(
    out: &mut impl Write,
    attributes: &DOMAttributes,
    markup: Markup,
) -> fmt::Result {
    for (key, value) in &attributes.0 {
        match markup {
            Markup::Canonical => write!(out, " {}=\"{}\"", key, canonical_attribute(value))?,
            Markup::Source if value.contains('"') => write!(out, " {}='{}'", key, value)?,
            Markup::Source => write!(out, " {}=\"{}\"", key, value)?,
        }
    }
    Ok(())
}

/// Write the opening tag of `element`, returning whether contents and a closing
/// tag follow
fn write_open_tag(
    out: &mut impl Write,
    element: &DOMElement,
    markup: Markup,
) -> Result<bool, fmt::Error> {
    write!(out, "<{}", element.name)?;
    write_attributes(out, &element.attributes, markup)?;
    if markup == Markup::Source && element.self_closing && element.contents.is_empty() {
        out.write_str("/>")?;
        return Ok(false);
    }
    out.write_char('>')?;
    Ok(!element.is_void())
}

/// Write `contents` in order, keeping the pending work on a stack rather than
/// recursing into child elements
fn write_contents(
    out: &mut impl Write,
    contents: &[DOMContent],
    raw_text: bool,
    markup: Markup,
) -> fmt::Result {
    let mut steps: Vec<Step> = contents
        .iter()
        .rev()
        .map(|c| Step::Content(c, raw_text))
        .collect();
    while let Some(step) = steps.pop() {
        let element = match step {
            Step::Close(name) => {
                write!(out, "</{}>", name)?;
                continue;
            }
            Step::Content(content, raw_text) => match content {
                DOMContent::Text(t) if raw_text || markup == Markup::Source => {
                    out.write_str(t)?;
                    continue;
                }
                DOMContent::Text(t) => {
                    out.write_str(&canonical_text(t))?;
                    continue;
                }
                DOMContent::Comment(c) => {
                    write!(out, "<!--{}-->", c)?;
                    continue;
                }
                DOMContent::Doctype(d) => {
                    write!(out, "<!{}>", d)?;
                    continue;
                }
                DOMContent::Element(e) => e,
            },
        };
        if !write_open_tag(out, element, markup)? {
            continue;
        }
        steps.push(Step::Close(&element.name));
        let raw_text = element.is_raw_text();
        steps.extend(
            element
                .contents
                .iter()
                .rev()
                .map(|c| Step::Content(c, raw_text)),
        );
    }
    Ok(())
}

impl Display for DOMAttributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_attributes(f, self, Markup::Source)
    }
}

impl Display for DOMContent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_contents(f, std::slice::from_ref(self), false, Markup::Source)
    }
}

impl Display for DOMElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write_outer(f, Markup::Source)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_contents(f, &self.contents, false, Markup::Source)
    }
}

impl DOMElement {
    fn write_outer(&self, out: &mut impl Write, markup: Markup) -> fmt::Result {
        if !write_open_tag(out, self, markup)? {
            return Ok(());
        }
        write_contents(out, &self.contents, self.is_raw_text(), markup)?;
        write!(out, "</{}>", self.name)
    }

    /// The markup of this element's contents, as a browser's `innerHTML` reads:
    /// text and attribute values are re-escaped and every attribute is
    /// double-quoted
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = write_contents(&mut out, &self.contents, self.is_raw_text(), Markup::Canonical);
        out
    }

    /// The markup of this element including its own tags, escaped like
    /// [`DOMElement::inner_html`]
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        let _ = self.write_outer(&mut out, Markup::Canonical);
        out
    }

    /// Replace this element's contents with the parsed `markup`.
    ///
    /// On a parse error the element is left untouched.
    pub fn set_inner_html(&mut self, markup: &str) -> Result<(), ParseError> {
        let contents = fragment(markup)?;
        if !contents.is_empty() {
            self.self_closing = false;
        }
        self.contents = contents;
        Ok(())
    }
}

impl Document {
    /// The markup of the whole page, every node written as it was read
    pub fn render(&self) -> String {
        self.to_string()
    }
}
