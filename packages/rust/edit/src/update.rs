//! Field updates.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use letterpress_dom::{Dom, NodeId, VOID_ELEMENTS, normalize_text};
use letterpress_shared::{EditId, EditOptions, FieldName, Result};

use crate::locate;

/// Table structure that cannot hold text directly; the parser moves stray text
/// out of the table.
const TABLE_STRUCTURE: &[&str] = &["table", "thead", "tbody", "tfoot", "tr", "colgroup"];

/// One field write against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    /// Element id, or the field's `target` cell id for table rows.
    pub id: EditId,
    pub field: FieldName,
    pub new_value: String,
    /// The value the caller saw; lets a text edit touch only the matching run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
}

/// Apply one field update.
///
/// Only the target's own attributes or contents change. An unknown id, or a
/// target with nothing to write to, returns `html` unchanged. Row ids have no
/// text of their own: text goes to a cell's `target` id.
#[instrument(skip(html, update, options), fields(id = %update.id, field = %update.field))]
pub fn update_element(html: &str, update: &FieldUpdate, options: &EditOptions) -> Result<String> {
    let mut dom = Dom::parse(html, options.max_input_bytes)?;

    let Some(node) = locate(&dom, update.id.as_str()) else {
        warn!("edit id not found, document unchanged");
        return Ok(html.to_string());
    };

    let applied = match update.field {
        FieldName::Text if holds_text(&dom, node) => {
            write_text(&mut dom, node, &update.new_value, update.old_value.as_deref());
            true
        }
        FieldName::Text => false,
        FieldName::Src | FieldName::Alt => match image_target(&dom, node) {
            Some(img) => dom.set_attr(img, update.field.as_str(), update.new_value.as_str()),
            None => false,
        },
        FieldName::Href => match link_target(&dom, node) {
            Some(link) => dom.set_attr(link, "href", update.new_value.as_str()),
            None => false,
        },
    };

    if !applied {
        warn!(tag = dom.tag(node).unwrap_or_default(), "no target for field, document unchanged");
        return Ok(html.to_string());
    }

    debug!("field updated");
    Ok(dom.to_html())
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn holds_text(dom: &Dom, node: NodeId) -> bool {
    dom.tag(node)
        .is_some_and(|tag| !VOID_ELEMENTS.contains(&tag) && !TABLE_STRUCTURE.contains(&tag))
}

fn write_text(dom: &mut Dom, node: NodeId, new_value: &str, old_value: Option<&str>) {
    let single_link = match dom.outbound_links(node).as_slice() {
        [link] => Some(*link),
        _ => None,
    };

    if let Some(link) = single_link {
        let link_text = normalize_text(&dom.text_content(link));
        if !link_text.is_empty() {
            if let Some(at) = new_value.find(&link_text) {
                let before = &new_value[..at];
                let after = &new_value[at + link_text.len()..];
                if rebuild_around(dom, node, link, before, after) {
                    return;
                }
            }
        }
    }

    if let Some(old) = old_value.map(normalize_text).filter(|old| !old.is_empty()) {
        if replace_matching_run(dom, node, &old, new_value) {
            return;
        }
    }

    // The whole text is the link: write inside it so the link survives.
    if let Some(link) = single_link {
        if normalize_text(&dom.text_content(node)) == normalize_text(&dom.text_content(link)) {
            replace_content(dom, link, new_value);
            return;
        }
    }

    replace_content(dom, node, new_value);
}

/// Replace the children of `node` with `before`, the branch holding `link`, `after`.
fn rebuild_around(dom: &mut Dom, node: NodeId, link: NodeId, before: &str, after: &str) -> bool {
    let ancestors = dom.ancestors(link);
    let Some(index) = ancestors.iter().position(|a| *a == node) else {
        return false;
    };
    let holder = if index == 0 { link } else { ancestors[index - 1] };

    dom.clear_children(node);
    if !before.is_empty() {
        dom.append_text(node, before);
    }
    dom.append_node(node, holder);
    if !after.is_empty() {
        dom.append_text(node, after);
    }
    true
}

/// Swap the one text run equal to `old`, keeping its surrounding whitespace.
fn replace_matching_run(dom: &mut Dom, node: NodeId, old: &str, new_value: &str) -> bool {
    let matches: Vec<(NodeId, String)> = dom
        .text_nodes(node)
        .into_iter()
        .filter_map(|id| {
            let text = dom.text_value(id)?.to_string();
            (normalize_text(&text) == old).then_some((id, text))
        })
        .collect();

    let [(run, current)] = matches.as_slice() else {
        return false;
    };
    let leading = &current[..current.len() - current.trim_start().len()];
    let trailing = &current[current.trim_end().len()..];
    dom.set_text(*run, format!("{leading}{new_value}{trailing}"))
}

fn replace_content(dom: &mut Dom, node: NodeId, text: &str) {
    dom.clear_children(node);
    dom.append_text(node, text);
}

// ---------------------------------------------------------------------------
// Attribute targets
// ---------------------------------------------------------------------------

fn image_target(dom: &Dom, node: NodeId) -> Option<NodeId> {
    if dom.tag(node) == Some("img") {
        return Some(node);
    }
    first_descendant(dom, node, "img")
}

fn link_target(dom: &Dom, node: NodeId) -> Option<NodeId> {
    if dom.tag(node) == Some("a") {
        return Some(node);
    }
    first_descendant(dom, node, "a").or_else(|| {
        dom.ancestors(node)
            .into_iter()
            .find(|a| dom.tag(*a) == Some("a"))
    })
}

fn first_descendant(dom: &Dom, node: NodeId, tag: &str) -> Option<NodeId> {
    dom.elements_under(node)
        .into_iter()
        .skip(1)
        .find(|d| dom.tag(*d) == Some(tag))
}
