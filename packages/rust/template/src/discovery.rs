//! Editable element discovery.
//!
//! Walks the body in document order and classifies each unclaimed, unlocked
//! element with the first matching rule: banner image, repeatable table row,
//! text with one inline link, plain text. A match claims the whole subtree so
//! nothing nested inside an editable element is discovered twice.

use std::collections::HashSet;

use letterpress_dom::{Dom, Element, NodeId, normalize_text, style_value};
use letterpress_shared::{
    EditId, EditableElement, EditableField, ElementKind, FieldName, FieldType, LinkMeta,
    ParseOptions, TextStyles, Thresholds,
};
use tracing::{debug, instrument, trace};
use url::Url;

use crate::order::DocumentOrder;
use crate::patterns;

/// Tags eligible for text discovery when locking is on.
const STRICT_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "td", "th", "li", "span"];

/// Extra tags eligible when locking is off.
const BROAD_EXTRA_TAGS: &[&str] = &["div", "a", "strong", "b", "em", "i", "font", "center", "section"];

/// A text element may not contain any of these.
const BLOCK_TAGS: &[&str] = &[
    "table", "div", "p", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "blockquote", "img",
];

/// Output of the discovery pass.
#[derive(Debug, Default)]
pub(crate) struct Discovery {
    /// Elements in document order, ids `edit-0`, `edit-1`, ...
    pub elements: Vec<EditableElement>,
    /// Identifier attributes to stamp, element and cell ids alike.
    pub stamps: Vec<(NodeId, EditId)>,
}

#[instrument(skip_all, fields(locked = locked.len(), skip_locking = options.skip_locking))]
pub(crate) fn discover(
    dom: &Dom,
    order: &DocumentOrder,
    locked: &HashSet<NodeId>,
    options: &ParseOptions,
) -> Discovery {
    let Some(body) = dom.body() else {
        return Discovery::default();
    };

    let mut discoverer = Discoverer {
        dom,
        order,
        locked,
        thresholds: &options.thresholds,
        broad: options.skip_locking,
        claimed: HashSet::new(),
        banner_found: false,
        out: Discovery::default(),
    };

    for id in dom.elements_under(body).into_iter().skip(1) {
        discoverer.visit(id);
    }

    debug!(elements = discoverer.out.elements.len(), "discovery finished");
    discoverer.out
}

struct Discoverer<'a> {
    dom: &'a Dom,
    order: &'a DocumentOrder,
    locked: &'a HashSet<NodeId>,
    thresholds: &'a Thresholds,
    broad: bool,
    claimed: HashSet<NodeId>,
    banner_found: bool,
    out: Discovery,
}

/// Fields and the cell stamps that come with them.
type Extracted = (Vec<EditableField>, Vec<(NodeId, EditId)>);

impl Discoverer<'_> {
    fn visit(&mut self, id: NodeId) {
        if self.locked.contains(&id) || self.claimed.contains(&id) {
            return;
        }
        let Some(el) = self.dom.element(id) else {
            return;
        };
        let Some(kind) = self.classify(id, el) else {
            return;
        };

        let edit_id = EditId::element(self.out.elements.len());
        let (fields, cells) = match kind {
            ElementKind::Banner => self.banner_fields(id, el),
            ElementKind::TableRow => self.row_fields(id, &edit_id),
            ElementKind::MixedContent | ElementKind::Text => (self.text_fields(id, el, kind), Vec::new()),
        };
        if fields.is_empty() {
            trace!(tag = el.name(), kind = kind.as_str(), "candidate has no editable fields");
            return;
        }

        let styles = match kind {
            ElementKind::Text | ElementKind::MixedContent => text_styles(el),
            _ => None,
        };
        let link = match kind {
            ElementKind::MixedContent => self.link_meta(id),
            _ => None,
        };

        let element = EditableElement {
            id: edit_id.clone(),
            kind,
            tag: el.name().to_string(),
            editable_fields: fields,
            document_position: self.order.position(id),
            parent_path: self
                .dom
                .parent_element(id)
                .map(|parent| self.dom.element_path(parent))
                .unwrap_or_default(),
            depth: self.dom.depth(id),
            styles,
            link,
        };

        trace!(id = %edit_id, tag = el.name(), kind = kind.as_str(), "discovered");
        self.claimed.extend(self.dom.elements_under(id));
        self.banner_found |= kind == ElementKind::Banner;
        self.out.stamps.push((id, edit_id));
        self.out.stamps.extend(cells);
        self.out.elements.push(element);
    }

    // ---------------------------------------------------------------------------
    // Classification rules
    // ---------------------------------------------------------------------------

    fn classify(&self, id: NodeId, el: &Element) -> Option<ElementKind> {
        if el.name() == "img" {
            return (!self.banner_found && self.is_banner(el)).then_some(ElementKind::Banner);
        }
        if self.encloses_locked(id) {
            return None;
        }

        let text = normalize_text(&self.dom.text_content(id));
        if patterns::looks_like_date(&text, self.thresholds.header_max_chars) {
            trace!(%text, "skipping date line");
            return None;
        }

        if el.name() == "tr" {
            return self.is_repeatable_row(id).then_some(ElementKind::TableRow);
        }
        if !self.allows(el.name()) {
            return None;
        }
        if text.chars().count() < self.thresholds.text_min_chars
            || self.dom.element_children(id).len() > self.thresholds.text_max_child_elements
            || self.has_block_descendant(id)
        {
            return None;
        }

        match self.single_link(id) {
            Some(link) if self.has_text_outside(id, link) => Some(ElementKind::MixedContent),
            _ => Some(ElementKind::Text),
        }
    }

    fn allows(&self, tag: &str) -> bool {
        STRICT_TAGS.contains(&tag) || (self.broad && BROAD_EXTRA_TAGS.contains(&tag))
    }

    fn encloses_locked(&self, id: NodeId) -> bool {
        !self.locked.is_empty()
            && self
                .dom
                .elements_under(id)
                .iter()
                .any(|d| self.locked.contains(d))
    }

    fn has_block_descendant(&self, id: NodeId) -> bool {
        self.dom
            .elements_under(id)
            .into_iter()
            .skip(1)
            .any(|d| self.dom.tag(d).is_some_and(|tag| BLOCK_TAGS.contains(&tag)))
    }

    /// The only outbound link under `id`, if there is exactly one.
    fn single_link(&self, id: NodeId) -> Option<NodeId> {
        match self.dom.outbound_links(id).as_slice() {
            [link] => Some(*link),
            _ => None,
        }
    }

    /// Whether any visible text under `id` sits outside `link`.
    fn has_text_outside(&self, id: NodeId, link: NodeId) -> bool {
        self.dom.text_nodes(id).into_iter().any(|run| {
            !self.dom.is_ancestor_of(link, run)
                && self.dom.text_value(run).is_some_and(|t| !t.trim().is_empty())
        })
    }

    fn is_banner(&self, img: &Element) -> bool {
        let Some(src) = img.attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
            return false;
        };

        let width = img.attr("width").and_then(parse_pixels).or_else(|| {
            img.attr("style")
                .and_then(|style| style_value(style, "width"))
                .and_then(|w| parse_pixels(&w))
        });
        if width.is_some_and(|w| w >= self.thresholds.banner_min_width) {
            return true;
        }

        // Only the path counts for absolute URLs; hosts like `hero-cdn.net` are noise.
        let haystack = match Url::parse(src) {
            Ok(url) => url.path().to_ascii_lowercase(),
            Err(_) => src.to_ascii_lowercase(),
        };
        self.thresholds
            .banner_keywords
            .iter()
            .any(|keyword| haystack.contains(&keyword.to_ascii_lowercase()))
    }

    fn is_repeatable_row(&self, row: NodeId) -> bool {
        let marked = |id: NodeId| self.dom.element(id).is_some_and(is_repeatable_marker);
        if marked(row) {
            return true;
        }
        let Some(parent) = self.dom.parent_element(row) else {
            return false;
        };
        if marked(parent) {
            return true;
        }
        // The parser inserts `tbody`; authors mark the table.
        matches!(self.dom.tag(parent), Some("tbody" | "thead" | "tfoot"))
            && self.dom.parent_element(parent).is_some_and(|table| marked(table))
    }

    // ---------------------------------------------------------------------------
    // Field extraction, one strategy per kind
    // ---------------------------------------------------------------------------

    fn banner_fields(&self, id: NodeId, img: &Element) -> Extracted {
        let mut fields = vec![
            field(FieldName::Src, "Image URL", FieldType::Url, img.attr("src").unwrap_or_default()),
            field(FieldName::Alt, "Alt text", FieldType::Text, img.attr("alt").unwrap_or_default()),
        ];

        let wrapping_link = self
            .dom
            .ancestors(id)
            .into_iter()
            .find(|a| self.dom.tag(*a) == Some("a"))
            .and_then(|a| self.dom.attr(a, "href"));
        if let Some(href) = wrapping_link {
            fields.push(field(FieldName::Href, "Link URL", FieldType::Url, href));
        }

        (fields, Vec::new())
    }

    fn row_fields(&self, row: NodeId, row_id: &EditId) -> Extracted {
        let mut fields = Vec::new();
        let mut stamps = Vec::new();

        let cells = self
            .dom
            .element_children(row)
            .into_iter()
            .filter(|c| matches!(self.dom.tag(*c), Some("td" | "th")));

        for (k, cell) in cells.enumerate() {
            let cell_id = row_id.cell(k);
            let number = k + 1;
            let mut cell_fields = Vec::new();

            let img = self
                .dom
                .elements_under(cell)
                .into_iter()
                .find(|d| self.dom.tag(*d) == Some("img"))
                .and_then(|d| self.dom.element(d));
            if let Some(img) = img {
                cell_fields.push(field(
                    FieldName::Src,
                    format!("Cell {number} image"),
                    FieldType::Url,
                    img.attr("src").unwrap_or_default(),
                ));
                cell_fields.push(field(
                    FieldName::Alt,
                    format!("Cell {number} alt text"),
                    FieldType::Text,
                    img.attr("alt").unwrap_or_default(),
                ));
            }

            let text = normalize_text(&self.dom.text_content(cell));
            if !text.is_empty() {
                let field_type = self.text_type(&text);
                cell_fields.push(field(FieldName::Text, format!("Cell {number}"), field_type, text));
            }

            if let Some(href) = self
                .dom
                .outbound_links(cell)
                .first()
                .and_then(|link| self.dom.attr(*link, "href"))
            {
                cell_fields.push(field(
                    FieldName::Href,
                    format!("Cell {number} link"),
                    FieldType::Url,
                    href,
                ));
            }

            if cell_fields.is_empty() {
                continue;
            }
            for f in &mut cell_fields {
                f.target = Some(cell_id.clone());
            }
            fields.extend(cell_fields);
            stamps.push((cell, cell_id));
        }

        (fields, stamps)
    }

    fn text_fields(&self, id: NodeId, el: &Element, kind: ElementKind) -> Vec<EditableField> {
        let text = normalize_text(&self.dom.text_content(id));
        let field_type = self.text_type(&text);
        let mut fields = vec![field(FieldName::Text, text_label(el.name()), field_type, text)];

        if kind == ElementKind::MixedContent {
            if let Some(href) = self.single_link(id).and_then(|link| self.dom.attr(link, "href")) {
                fields.push(field(FieldName::Href, "Link URL", FieldType::Url, href));
            }
        }
        fields
    }

    fn link_meta(&self, id: NodeId) -> Option<LinkMeta> {
        let link = self.single_link(id)?;
        Some(LinkMeta {
            text: normalize_text(&self.dom.text_content(link)),
            href: self.dom.attr(link, "href")?.to_string(),
        })
    }

    fn text_type(&self, text: &str) -> FieldType {
        if text.chars().count() > self.thresholds.textarea_min_chars {
            FieldType::Textarea
        } else {
            FieldType::Text
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn field(
    name: FieldName,
    label: impl Into<String>,
    field_type: FieldType,
    value: impl Into<String>,
) -> EditableField {
    EditableField {
        name,
        label: Some(label.into()),
        field_type,
        value: value.into(),
        target: None,
    }
}

fn text_label(tag: &str) -> &'static str {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "Heading",
        "p" => "Paragraph",
        "li" => "List item",
        "td" | "th" => "Cell",
        "a" => "Link text",
        _ => "Text",
    }
}

fn text_styles(el: &Element) -> Option<TextStyles> {
    let style = el.attr("style")?;
    let styles = TextStyles {
        font_size: style_value(style, "font-size"),
        font_weight: style_value(style, "font-weight"),
        color: style_value(style, "color"),
    };
    (!styles.is_empty()).then_some(styles)
}

fn is_repeatable_marker(el: &Element) -> bool {
    el.attr("data-repeatable")
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
        || el.classes().any(|c| c.eq_ignore_ascii_case("repeatable"))
}

/// Pixel width from `600`, `600px` or ` 600 `. Percentages don't count.
fn parse_pixels(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.ends_with('%') {
        return None;
    }
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
