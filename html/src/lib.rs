//! A small HTML document model: parsing of markup into a tree of
//! [`DOMElement`]s, serialization back into markup, and path-based queries
//! for locating and mutating elements in place.

/// The tree types
mod dom;
/// Character references in text and attribute values
mod entities;
/// Parsing of markup into a [`Document`] or a list of [`DOMContent`]
mod parsing;
/// Tree walks and element lookup
mod query;
/// Rendering of the tree back into markup
mod serialize;


pub use dom::*;
pub use parsing::{document, fragment, parse_document, ParseError};
pub use query::{Descendants, NodePath};

/// Elements which never have contents or a closing tag
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose contents are kept verbatim up to the closing tag
pub const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Build [`DOMAttributes`] from `key=>value` pairs, keeping their order
#[macro_export]
macro_rules! attributes {
    ($($k:tt=>$v:expr),* $(,)?) => {
        $crate::DOMAttributes(vec![$((stringify!($k).to_string(), $v.to_string())),*])
    };
}
