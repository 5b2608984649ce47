//! Element deletion with bounded cleanup of emptied ancestors.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use letterpress_dom::{Dom, Node, NodeId};
use letterpress_shared::{EDIT_ID_ATTR, EditId, EditOptions, Result};

use crate::locate;

/// Ancestors that are never pruned.
const PROTECTED: &[&str] = &["body", "html", "head"];

/// Characters that render as blank but are not ASCII whitespace.
const INVISIBLE: &[char] = &['\u{a0}', '\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}', '\u{feff}'];

/// Outcome of a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub success: bool,
    /// The new document, or the input when nothing was deleted.
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_element: Option<DeletedElement>,
    /// Ancestors removed because the deletion left them empty, nearest first.
    pub cleaned_parents: Vec<CleanedParent>,
    pub warnings: Vec<String>,
}

/// The removed node, described in terms of the pre-deletion document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedElement {
    pub id: EditId,
    pub tag: String,
    pub element_path: String,
}

/// An ancestor pruned during cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedParent {
    pub tag: String,
    pub element_path: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Emptiness {
    Empty,
    /// Only `&nbsp;` or zero-width characters remain; likely a spacer.
    Ambiguous,
    Occupied,
}

/// Remove the node stamped with `id`, then prune ancestors it leaves empty.
///
/// The walk goes up at most `cleanup_max_depth` levels and stops at the first
/// ancestor that still has content.
#[instrument(skip(html, options), fields(id = %id))]
pub fn delete_element(html: &str, id: &EditId, options: &EditOptions) -> Result<DeleteResult> {
    let mut dom = Dom::parse(html, options.max_input_bytes)?;

    let Some(node) = locate(&dom, id.as_str()) else {
        warn!("edit id not found, nothing deleted");
        return Ok(DeleteResult {
            success: false,
            html: html.to_string(),
            deleted_element: None,
            cleaned_parents: Vec::new(),
            warnings: vec![format!("no element with {EDIT_ID_ATTR}=\"{id}\"")],
        });
    };

    let deleted = DeletedElement {
        id: id.clone(),
        tag: dom.tag(node).unwrap_or_default().to_string(),
        element_path: dom.element_path(node),
    };
    let mut parent = dom.parent_element(node);
    dom.detach(node);

    let mut cleaned_parents = Vec::new();
    let mut warnings = Vec::new();

    while let Some(ancestor) = parent {
        if cleaned_parents.len() >= options.cleanup_max_depth {
            break;
        }
        let Some(tag) = dom.tag(ancestor).map(str::to_string) else {
            break;
        };
        if PROTECTED.contains(&tag.as_str()) {
            break;
        }

        match emptiness(&dom, ancestor) {
            Emptiness::Empty => {
                cleaned_parents.push(CleanedParent {
                    element_path: dom.element_path(ancestor),
                    tag,
                });
                parent = dom.parent_element(ancestor);
                dom.detach(ancestor);
            }
            Emptiness::Ambiguous => {
                let path = dom.element_path(ancestor);
                warn!(%tag, %path, "ancestor holds only invisible spacing, kept");
                warnings.push(format!(
                    "kept <{tag}> at {path}: only non-breaking or zero-width spaces remain"
                ));
                break;
            }
            Emptiness::Occupied => break,
        }
    }

    debug!(
        tag = %deleted.tag,
        cleaned = cleaned_parents.len(),
        "element deleted"
    );

    Ok(DeleteResult {
        success: true,
        html: dom.to_html(),
        deleted_element: Some(deleted),
        cleaned_parents,
        warnings,
    })
}

fn emptiness(dom: &Dom, id: NodeId) -> Emptiness {
    let Some(node) = dom.node(id) else {
        return Emptiness::Occupied;
    };

    let mut text = String::new();
    for child in node.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t),
            // Elements and conditional comments are content.
            _ => return Emptiness::Occupied,
        }
    }

    if text.chars().all(|c| c.is_ascii_whitespace()) {
        Emptiness::Empty
    } else if text
        .chars()
        .all(|c| c.is_ascii_whitespace() || INVISIBLE.contains(&c))
    {
        Emptiness::Ambiguous
    } else {
        Emptiness::Occupied
    }
}
