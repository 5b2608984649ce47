//! Mutable document tree: a `scraper::Html` edited in place.

use ego_tree::{NodeId, NodeRef};
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Doctype, Element, Text};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use letterpress_shared::{LetterpressError, Result};

/// Elements whose text is not part of the visible text content.
const NON_CONTENT_TEXT: &[&str] = &["script", "style", "title", "noscript", "template"];

/// Whether the source was a full document or a bare fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Source had `<!doctype>`, `<html>` or `<body>`; serialized as a whole document.
    Document,
    /// Source had no document wrappers; the implied ones are dropped on output.
    Fragment,
}

// ---------------------------------------------------------------------------
// Dom
// ---------------------------------------------------------------------------

/// A parsed, mutable HTML document.
#[derive(Debug, Clone)]
pub struct Dom {
    html: Html,
    kind: DocumentKind,
}

impl Dom {
    /// Parse an HTML string. Inputs over `max_input_bytes` are rejected.
    pub fn parse(html: &str, max_input_bytes: usize) -> Result<Self> {
        if html.len() > max_input_bytes {
            return Err(LetterpressError::parse(format!(
                "input is {} bytes, limit is {max_input_bytes}",
                html.len()
            )));
        }

        let parsed = Html::parse_document(html);
        let kind = detect_kind(html);
        debug!(
            bytes = html.len(),
            ?kind,
            parse_errors = parsed.errors.len(),
            "parsed document"
        );

        Ok(Self { html: parsed, kind })
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.html.tree.get(id)?.value().as_element()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// Value of a text node.
    pub fn text_value(&self, id: NodeId) -> Option<&str> {
        self.html.tree.get(id)?.value().as_text().map(|text| &**text)
    }

    // -- Traversal ----------------------------------------------------------

    /// All attached elements in document (pre-order) order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.elements_under(self.html.tree.root().id())
    }

    /// Elements in the subtree rooted at `id`, including `id` itself.
    pub fn elements_under(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| {
                node.descendants()
                    .filter(|d| d.value().is_element())
                    .map(|d| d.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First element with the given name, in document order.
    pub fn find_element(&self, name: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| self.tag(*id) == Some(name))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_element("body")
    }

    /// First element carrying `name="value"`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|id| self.attr(*id, name) == Some(value))
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| node.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| {
                node.children()
                    .filter(|c| c.value().is_element())
                    .map(|c| c.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.html.tree.get(id)?.parent()?;
        parent.value().is_element().then(|| parent.id())
    }

    /// Element ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| {
                node.ancestors()
                    .filter(|a| a.value().is_element())
                    .map(|a| a.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.html
            .tree
            .get(node)
            .is_some_and(|n| n.ancestors().any(|a| a.id() == ancestor))
    }

    /// Number of element ancestors.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Visible text of the subtree, untrimmed.
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_nodes(id)
            .into_iter()
            .filter_map(|text_id| self.text_value(text_id))
            .collect()
    }

    /// Text nodes of the subtree that contribute to the visible text.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.html.tree.get(id) else {
            return Vec::new();
        };

        node.descendants()
            .filter(|d| d.value().is_text())
            .filter(|d| {
                !d.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|el| NON_CONTENT_TEXT.contains(&el.name()))
                })
            })
            .map(|d| d.id())
            .collect()
    }

    /// `a` descendants of `id` whose `href` points somewhere other than the page itself.
    pub fn outbound_links(&self, id: NodeId) -> Vec<NodeId> {
        self.elements_under(id)
            .into_iter()
            .skip(1)
            .filter(|link| self.tag(*link) == Some("a"))
            .filter(|link| {
                self.attr(*link, "href")
                    .map(str::trim)
                    .is_some_and(|href| !href.is_empty() && !href.starts_with('#'))
            })
            .collect()
    }

    /// CSS selector path (`html > body > table:nth-of-type(1) > ...`).
    pub fn element_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = self.html.tree.get(id);

        while let Some(node) = current {
            let Some(el) = node.value().as_element() else {
                break;
            };
            let segment = match el.name() {
                name @ ("html" | "head" | "body") => name.to_string(),
                name => {
                    let index = node
                        .prev_siblings()
                        .filter(|s| s.value().as_element().is_some_and(|e| e.name() == name))
                        .count()
                        + 1;
                    format!("{name}:nth-of-type({index})")
                }
            };
            segments.push(segment);
            current = node.parent();
        }

        segments.reverse();
        segments.join(" > ")
    }

    pub fn element_count(&self) -> usize {
        self.elements().len()
    }

    pub fn count_tag(&self, name: &str) -> usize {
        self.elements()
            .into_iter()
            .filter(|id| self.tag(*id) == Some(name))
            .count()
    }

    // -- Serialization ------------------------------------------------------

    /// Serialized markup of one element subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        self.html
            .tree
            .get(id)
            .and_then(ElementRef::wrap)
            .map(|el| el.html())
            .unwrap_or_default()
    }

    /// Serialized size of one subtree, in bytes.
    pub fn outer_len(&self, id: NodeId) -> usize {
        self.outer_html(id).len()
    }

    /// Serialize the whole document.
    ///
    /// Elements go through html5ever's serializer. Fragments come back as the
    /// contents of the implied `head` and `body`.
    pub fn to_html(&self) -> String {
        let root = self.html.tree.root();
        let mut out = String::new();

        for child in root.children() {
            match child.value() {
                Node::Doctype(doctype) if self.kind == DocumentKind::Document => {
                    write_doctype(doctype, &mut out);
                }
                Node::Comment(comment) => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
                _ => {
                    let Some(el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    match self.kind {
                        DocumentKind::Document => out.push_str(&el.html()),
                        DocumentKind::Fragment => {
                            for section in el.children().filter_map(ElementRef::wrap) {
                                out.push_str(&section.inner_html());
                            }
                        }
                    }
                }
            }
        }
        out
    }

    // -- Mutation -----------------------------------------------------------

    /// Rebuild the element at `id` with an edited attribute list.
    ///
    /// Attribute names keep their namespace and prefix (`xlink:href`).
    fn edit_attrs<R>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut Vec<Attribute>) -> R,
    ) -> Option<R> {
        let mut node = self.html.tree.get_mut(id)?;
        let Node::Element(el) = node.value() else {
            return None;
        };

        let mut attrs: Vec<Attribute> = el
            .attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        let result = edit(&mut attrs);
        *el = Element::new(el.name.clone(), attrs);
        Some(result)
    }

    /// Set an unprefixed attribute, replacing any existing value.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        self.edit_attrs(id, |attrs| {
            match attrs.iter_mut().find(|a| is_plain(&a.name, name)) {
                Some(existing) => existing.value = value.into(),
                None => attrs.push(Attribute {
                    name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
                    value: value.into(),
                }),
            }
        })
        .is_some()
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.attr(id, name)?;
        self.edit_attrs(id, |attrs| {
            let pos = attrs.iter().position(|a| is_plain(&a.name, name))?;
            let removed = attrs.remove(pos);
            Some(String::from(&*removed.value))
        })
        .flatten()
    }

    /// Remove an attribute from every element. Returns how many carried it.
    pub fn strip_attr(&mut self, name: &str) -> usize {
        let mut removed = 0;
        for id in self.elements() {
            if self.remove_attr(id, name).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Replace the value of a text node.
    pub fn set_text(&mut self, text_id: NodeId, text: impl Into<String>) -> bool {
        let Some(mut node) = self.html.tree.get_mut(text_id) else {
            return false;
        };
        match node.value() {
            Node::Text(current) => {
                let text: String = text.into();
                current.text = text.into();
                true
            }
            _ => false,
        }
    }

    /// Detach a node (and its subtree) from the document.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return false;
        };
        node.detach();
        true
    }

    /// Detach all children of `id`, returning them in order.
    pub fn clear_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id);
        for child in &children {
            self.detach(*child);
        }
        children
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> Option<NodeId> {
        let mut node = self.html.tree.get_mut(parent)?;
        let text: String = text.into();
        let text = Text { text: text.into() };
        Some(node.append(Node::Text(text)).id())
    }

    /// Move an existing node to the end of `parent`'s children.
    pub fn append_node(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || self.is_ancestor_of(child, parent) {
            return false;
        }
        let Some(mut node) = self.html.tree.get_mut(parent) else {
            return false;
        };
        node.append_id(child);
        true
    }

    /// Copy a subtree into a new detached node. Attach it with
    /// [`insert_before`](Self::insert_before) or [`insert_after`](Self::insert_after).
    pub fn deep_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let value = self.html.tree.get(id)?.value().clone();
        let children = self.children(id);
        let copy = self.html.tree.orphan(value).id();

        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.html.tree.get_mut(copy)?.append_id(child_copy);
        }

        Some(copy)
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> bool {
        if !self.can_insert_beside(anchor, node) {
            return false;
        }
        match self.html.tree.get_mut(anchor) {
            Some(mut a) => {
                a.insert_id_before(node);
                true
            }
            None => false,
        }
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> bool {
        if !self.can_insert_beside(anchor, node) {
            return false;
        }
        match self.html.tree.get_mut(anchor) {
            Some(mut a) => {
                a.insert_id_after(node);
                true
            }
            None => false,
        }
    }

    fn can_insert_beside(&self, anchor: NodeId, node: NodeId) -> bool {
        anchor != node
            && self.html.tree.get(node).is_some()
            && self.html.tree.get(anchor).and_then(|a| a.parent()).is_some()
            && !self.is_ancestor_of(node, anchor)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Elements that never have content. Text written into them is not serialized.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Collapse runs of whitespace (including `&nbsp;`) to single spaces and trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_plain(name: &QualName, local: &str) -> bool {
    name.prefix.is_none() && name.ns.is_empty() && &*name.local == local
}

/// html5ever writes only the doctype name; legacy email doctypes need the ids.
fn write_doctype(doctype: &Doctype, out: &mut String) {
    out.push_str("<!DOCTYPE ");
    out.push_str(doctype.name());
    match (doctype.public_id(), doctype.system_id()) {
        ("", "") => {}
        ("", system) => {
            out.push_str(" SYSTEM \"");
            out.push_str(system);
            out.push('"');
        }
        (public, "") => {
            out.push_str(" PUBLIC \"");
            out.push_str(public);
            out.push('"');
        }
        (public, system) => {
            out.push_str(" PUBLIC \"");
            out.push_str(public);
            out.push_str("\" \"");
            out.push_str(system);
            out.push('"');
        }
    }
    out.push('>');
}

fn detect_kind(html: &str) -> DocumentKind {
    let lower = html.to_ascii_lowercase();
    if lower.contains("<!doctype") || lower.contains("<html") || lower.contains("<body") {
        DocumentKind::Document
    } else {
        DocumentKind::Fragment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1024 * 1024;

    fn nth_tag(dom: &Dom, name: &str, n: usize) -> NodeId {
        dom.elements()
            .into_iter()
            .filter(|id| dom.tag(*id) == Some(name))
            .nth(n)
            .unwrap_or_else(|| panic!("no {name} #{n}"))
    }

    #[test]
    fn fragment_serializes_without_wrappers() {
        let html = r#"<table><tr><td class="a">Hello</td></tr></table>"#;
        let dom = Dom::parse(html, LIMIT).unwrap();
        assert_eq!(dom.kind(), DocumentKind::Fragment);
        assert_eq!(
            dom.to_html(),
            r#"<table><tbody><tr><td class="a">Hello</td></tr></tbody></table>"#
        );
    }

    #[test]
    fn fragment_keeps_head_content() {
        let html = "<style>p { color: #ff0000; }</style><p>Hi</p>";
        let dom = Dom::parse(html, LIMIT).unwrap();
        assert_eq!(dom.to_html(), html);
    }

    #[test]
    fn document_keeps_legacy_doctype() {
        let html = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd"><html><head><title>T</title></head><body><p>x</p></body></html>"#;
        let dom = Dom::parse(html, LIMIT).unwrap();
        assert_eq!(dom.kind(), DocumentKind::Document);
        assert_eq!(dom.to_html(), html);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let html = r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2</p>"#;
        let dom = Dom::parse(html, LIMIT).unwrap();
        assert_eq!(dom.to_html(), html);
    }

    #[test]
    fn raw_text_is_verbatim() {
        let html = "<div><style>td > p { color: #ff0000; }</style></div>";
        let dom = Dom::parse(html, LIMIT).unwrap();
        assert_eq!(dom.to_html(), html);
    }

    #[test]
    fn serialization_is_stable_after_first_pass() {
        let html = "<div><!--[if mso]><table><![endif]--><p>A &amp; B&nbsp;</p><br><img src=\"a.png\"></div>";
        let once = Dom::parse(html, LIMIT).unwrap().to_html();
        let twice = Dom::parse(&once, LIMIT).unwrap().to_html();
        assert_eq!(once, twice);
        assert!(once.contains("<!--[if mso]><table><![endif]-->"));
        assert!(once.contains("A &amp; B&nbsp;"));
        assert!(once.contains("<br><img src=\"a.png\">"));
        assert!(!once.contains("</img>"));
    }

    #[test]
    fn namespaced_attributes_survive_edits() {
        let html = r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#icon"></use></svg>"##;
        let mut dom = Dom::parse(html, LIMIT).unwrap();
        let svg = nth_tag(&dom, "svg", 0);
        let icon = nth_tag(&dom, "use", 0);
        assert!(dom.set_attr(svg, "data-edit-id", "edit-0"));
        assert!(dom.set_attr(icon, "width", "16"));

        let out = dom.to_html();
        assert!(out.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#), "{out}");
        assert!(out.contains(r##"xlink:href="#icon""##), "{out}");
        assert!(out.contains(r#"data-edit-id="edit-0""#));
        // The prefixed attribute is not the plain one.
        assert_eq!(dom.attr(icon, "href"), None);
    }

    #[test]
    fn oversize_input_is_rejected() {
        let err = Dom::parse("<p>too long</p>", 4).unwrap_err();
        assert!(err.to_string().contains("limit is 4"));
    }

    #[test]
    fn element_path_selects_the_same_element() {
        let html = "<table><tr><td>a</td><td>b</td></tr></table>";
        let dom = Dom::parse(html, LIMIT).unwrap();
        let td = nth_tag(&dom, "td", 1);
        let path = dom.element_path(td);
        assert_eq!(
            path,
            "html > body > table:nth-of-type(1) > tbody:nth-of-type(1) > tr:nth-of-type(1) > td:nth-of-type(2)"
        );

        let doc = scraper::Html::parse_document(html);
        let selector = scraper::Selector::parse(&path).unwrap();
        let found: Vec<String> = doc
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect();
        assert_eq!(found, vec!["b".to_string()]);
    }

    #[test]
    fn text_content_skips_style() {
        let dom =
            Dom::parse("<div><style>p{color:red}</style><p>Hi <b>there</b></p></div>", LIMIT)
                .unwrap();
        let div = nth_tag(&dom, "div", 0);
        assert_eq!(dom.text_content(div), "Hi there");
    }

    #[test]
    fn attributes_and_strip() {
        let mut dom = Dom::parse(r#"<p data-x="1">a</p><p data-x="2">b</p>"#, LIMIT).unwrap();
        let second = nth_tag(&dom, "p", 1);
        assert_eq!(dom.find_by_attr("data-x", "2"), Some(second));

        assert!(dom.set_attr(second, "title", "t"));
        assert_eq!(dom.attr(second, "title"), Some("t"));
        assert!(dom.set_attr(second, "title", "u"));
        assert_eq!(dom.attr(second, "title"), Some("u"));

        assert_eq!(dom.strip_attr("data-x"), 2);
        assert_eq!(dom.remove_attr(second, "data-x"), None);
        assert_eq!(dom.to_html(), r#"<p>a</p><p title="u">b</p>"#);
    }

    #[test]
    fn set_text_and_text_value() {
        let mut dom = Dom::parse("<p>old</p>", LIMIT).unwrap();
        let p = nth_tag(&dom, "p", 0);
        let run = dom.text_nodes(p)[0];
        assert_eq!(dom.text_value(run), Some("old"));
        assert!(dom.set_text(run, "new"));
        assert!(!dom.set_text(p, "not a text node"));
        assert_eq!(dom.to_html(), "<p>new</p>");
    }

    #[test]
    fn deep_clone_and_insert() {
        let mut dom = Dom::parse("<ul><li><b>one</b></li></ul>", LIMIT).unwrap();
        let li = nth_tag(&dom, "li", 0);
        let copy = dom.deep_clone(li).unwrap();
        assert!(dom.insert_after(li, copy));
        assert_eq!(dom.to_html(), "<ul><li><b>one</b></li><li><b>one</b></li></ul>");
        assert_eq!(dom.count_tag("b"), 2);
    }

    #[test]
    fn detach_and_clear_children() {
        let mut dom = Dom::parse("<div><span>a</span>text<em>b</em></div>", LIMIT).unwrap();
        let span = nth_tag(&dom, "span", 0);
        assert!(dom.detach(span));
        assert_eq!(dom.to_html(), "<div>text<em>b</em></div>");

        let div = nth_tag(&dom, "div", 0);
        let removed = dom.clear_children(div);
        assert_eq!(removed.len(), 2);
        dom.append_text(div, "fresh & new");
        assert_eq!(dom.to_html(), "<div>fresh &amp; new</div>");
    }

    #[test]
    fn normalize_collapses_nbsp_and_newlines() {
        assert_eq!(normalize_text("  Hello\u{a0}\n   world  "), "Hello world");
    }

    #[test]
    fn outbound_links_skip_fragments() {
        let dom = Dom::parse(
            r##"<p><a href="#top">top</a> <a href=" https://x.test/a ">a</a> <a>none</a></p>"##,
            LIMIT,
        )
        .unwrap();
        let p = nth_tag(&dom, "p", 0);
        let links = dom.outbound_links(p);
        assert_eq!(links.len(), 1);
        assert_eq!(dom.attr(links[0], "href"), Some(" https://x.test/a "));
    }

    #[test]
    fn ancestry_helpers() {
        let dom = Dom::parse("<div><p><a href=\"#\">x</a></p></div>", LIMIT).unwrap();
        let div = nth_tag(&dom, "div", 0);
        let a = nth_tag(&dom, "a", 0);
        assert!(dom.is_ancestor_of(div, a));
        assert!(!dom.is_ancestor_of(a, div));
        // html > body > div > p > a
        assert_eq!(dom.depth(a), 4);
        assert_eq!(dom.tag(dom.parent_element(a).unwrap()), Some("p"));
    }
}
