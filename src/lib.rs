//! Post-processing of rendered documentation pages: escaped `<code>`/`<tt>` markup
//! left in table-of-contents entries and headings is turned into live inline code.

pub mod error;
/// Passes run once a page has been parsed
pub mod hook;
/// Rewriting of escaped inline code
pub mod normalize;
/// Loading, processing and saving of pages
pub mod page;

pub use error::{Error, Result};
pub use hook::PostRenderHook;
pub use normalize::{normalize, rewrite_markup, Normalizer};
pub use page::Page;
