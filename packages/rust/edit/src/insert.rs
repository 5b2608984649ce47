//! Table-row duplication.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use letterpress_dom::{Dom, NodeId};
use letterpress_shared::{EDIT_ID_ATTR, EditId, EditOptions, LetterpressError, Result};

use crate::locate;

/// Where the copy goes relative to its source row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Before,
    #[default]
    After,
}

impl FromStr for InsertPosition {
    type Err = LetterpressError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            other => Err(LetterpressError::validation(format!(
                "unknown position '{other}': expected before or after"
            ))),
        }
    }
}

/// Duplicate the table row stamped with `id` and insert the copy beside it.
///
/// The copy gets the next free element id, and its cells get matching cell
/// ids. Anything that is not a stamped `<tr>` returns `html` unchanged.
#[instrument(skip(html, options), fields(id = %id, ?position))]
pub fn insert_element(
    html: &str,
    id: &EditId,
    position: InsertPosition,
    options: &EditOptions,
) -> Result<String> {
    let mut dom = Dom::parse(html, options.max_input_bytes)?;

    let Some(source) = locate(&dom, id.as_str()) else {
        warn!("edit id not found, document unchanged");
        return Ok(html.to_string());
    };
    if id.is_cell() || dom.tag(source) != Some("tr") {
        warn!(tag = dom.tag(source).unwrap_or_default(), "only table rows can be duplicated");
        return Ok(html.to_string());
    }

    let fresh = EditId::element(next_ordinal(&dom));
    let Some(copy) = dom.deep_clone(source) else {
        return Ok(html.to_string());
    };
    restamp(&mut dom, copy, &fresh);

    let inserted = match position {
        InsertPosition::Before => dom.insert_before(source, copy),
        InsertPosition::After => dom.insert_after(source, copy),
    };
    if !inserted {
        warn!("row has no parent to insert into, document unchanged");
        return Ok(html.to_string());
    }

    debug!(new_id = %fresh, "row duplicated");
    Ok(dom.to_html())
}

/// One past the highest element ordinal in the document.
fn next_ordinal(dom: &Dom) -> usize {
    dom.elements()
        .into_iter()
        .filter_map(|el| dom.attr(el, EDIT_ID_ATTR))
        .filter_map(|value| EditId::from(value).ordinal())
        .max()
        .map_or(0, |max| max + 1)
}

/// Re-mint ids inside a detached copy: the root takes `fresh`, cells keep their index.
fn restamp(dom: &mut Dom, copy: NodeId, fresh: &EditId) {
    for el in dom.elements_under(copy) {
        let Some(old) = dom.attr(el, EDIT_ID_ATTR).map(EditId::from) else {
            continue;
        };
        let new_id = if el == copy {
            Some(fresh.clone())
        } else {
            old.cell_index().map(|k| fresh.cell(k))
        };
        match new_id {
            Some(new_id) => {
                dom.set_attr(el, EDIT_ID_ATTR, new_id.as_str());
            }
            None => {
                dom.remove_attr(el, EDIT_ID_ATTR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{newsletter, parse};

    fn insert(html: &str, id: &str, position: InsertPosition) -> String {
        insert_element(html, &EditId::from(id), position, &EditOptions::default()).unwrap()
    }

    #[test]
    fn duplicates_a_row_after_itself() {
        let parsed = parse(
            r#"<table class="repeatable"><tr><td>Investor Day</td><td><a href="https://x.test/r">Register</a></td></tr></table>"#,
        );
        let out = insert(&parsed.html_with_edit_ids, "edit-0", InsertPosition::After);

        assert_eq!(
            out,
            concat!(
                r#"<table class="repeatable"><tbody>"#,
                r#"<tr data-edit-id="edit-0"><td data-edit-id="edit-0-c0">Investor Day</td><td data-edit-id="edit-0-c1"><a href="https://x.test/r">Register</a></td></tr>"#,
                r#"<tr data-edit-id="edit-1"><td data-edit-id="edit-1-c0">Investor Day</td><td data-edit-id="edit-1-c1"><a href="https://x.test/r">Register</a></td></tr>"#,
                r#"</tbody></table>"#
            )
        );
    }

    #[test]
    fn before_puts_the_copy_first() {
        let parsed = parse(r#"<table data-repeatable><tr><td>Only row text</td></tr></table>"#);
        let out = insert(&parsed.html_with_edit_ids, "edit-0", InsertPosition::Before);
        let first = out.find(r#"data-edit-id="edit-1""#).unwrap();
        let second = out.find(r#"data-edit-id="edit-0""#).unwrap();
        assert!(first < second);
    }

    #[test]
    fn fresh_ids_follow_the_highest_existing() {
        let parsed = newsletter();
        let out = insert(&parsed.html_with_edit_ids, "edit-4", InsertPosition::After);

        assert!(out.contains(r#"data-edit-id="edit-7""#));
        assert!(out.contains(r#"data-edit-id="edit-7-c2""#));
        assert_eq!(out.matches("Investor Day, New York, March 14").count(), 2);
        assert_eq!(
            Dom::parse(&out, usize::MAX).unwrap().count_tag("tr"),
            Dom::parse(&parsed.html_with_edit_ids, usize::MAX).unwrap().count_tag("tr") + 1
        );

        // A re-parse renumbers everything in document order.
        let reparsed = parse(&out);
        assert_eq!(reparsed.elements_of(letterpress_shared::ElementKind::TableRow).count(), 3);
    }

    #[test]
    fn only_rows_can_be_duplicated() {
        let parsed = newsletter();
        let html = &parsed.html_with_edit_ids;
        assert_eq!(&insert(html, "edit-1", InsertPosition::After), html);
        assert_eq!(&insert(html, "edit-4-c1", InsertPosition::After), html);
        assert_eq!(&insert(html, "nonexistent-id", InsertPosition::Before), html);
    }

    #[test]
    fn position_parsing() {
        assert_eq!("Before".parse::<InsertPosition>().unwrap(), InsertPosition::Before);
        assert_eq!(InsertPosition::default(), InsertPosition::After);
        assert!("middle".parse::<InsertPosition>().is_err());
    }
}
