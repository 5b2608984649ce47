//! Mutable HTML document tree for template analysis and editing.
//!
//! Parsing goes through `scraper` (html5ever). Edits are applied to the parsed
//! `ego_tree::Tree` in place, and [`Dom::to_html`] serializes it back through
//! html5ever.

mod style;
mod tree;

pub use ego_tree::{NodeId, NodeRef};
pub use scraper::Node;
pub use scraper::node::Element;
pub use style::{parse_inline_style, style_value};
pub use tree::{DocumentKind, Dom, VOID_ELEMENTS, normalize_text};
