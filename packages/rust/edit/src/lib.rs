//! Structure-preserving edits on a parsed template snapshot.
//!
//! Every operation takes the `htmlWithEditIds` string produced by
//! `parse_template`, locates its target by `data-edit-id`, and returns new HTML.
//! A missing target is never an error: the input comes back unchanged so callers
//! can compare `result == input`.

mod delete;
mod insert;
mod recolor;
mod update;

pub use delete::{CleanedParent, DeleteResult, DeletedElement, delete_element};
pub use insert::{InsertPosition, insert_element};
pub use recolor::{RecolorResult, replace_color};
pub use update::{FieldUpdate, update_element};

use letterpress_dom::{Dom, NodeId};
use letterpress_shared::EDIT_ID_ATTR;

/// The node stamped with `id`.
fn locate(dom: &Dom, id: &str) -> Option<NodeId> {
    dom.find_by_attr(EDIT_ID_ATTR, id)
}
