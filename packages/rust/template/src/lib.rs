//! Newsletter template parsing.
//!
//! Turns raw email HTML into a [`ParsedTemplate`]: the editable elements a user
//! may change, the locked news sections they may not, the color catalog, and a
//! snapshot of the document with `data-edit-id` attributes stamped on every
//! editable node.

mod classifier;
mod colors;
mod discovery;
mod order;
mod patterns;

use tracing::{debug, instrument};

use letterpress_dom::Dom;
use letterpress_shared::{EDIT_ID_ATTR, ParseOptions, ParsedTemplate, Result};

use crate::order::DocumentOrder;

/// Parse a template.
///
/// The pipeline:
/// 1. Parse into a DOM and drop identifiers left over from an earlier snapshot
/// 2. Classify locked sections (unless `skip_locking`)
/// 3. Discover editable elements outside the locked sections
/// 4. Extract the color catalog
/// 5. Stamp identifiers and serialize
///
/// Heuristic misses never fail the call; they are reported in
/// `parse_warnings`. The only error is an input over the size limit.
#[instrument(skip(html), fields(bytes = html.len(), skip_locking = options.skip_locking))]
pub fn parse_template(html: &str, options: &ParseOptions) -> Result<ParsedTemplate> {
    let mut dom = Dom::parse(html, options.thresholds.max_input_bytes)?;

    let stale = dom.strip_attr(EDIT_ID_ATTR);
    if stale > 0 {
        debug!(stale, "dropped identifiers from a previous snapshot");
    }

    let order = DocumentOrder::new(&dom);
    let classification = classifier::classify(&dom, &order, options);
    let discovery = discovery::discover(&dom, &order, &classification.locked, options);
    let colors = colors::catalog(&dom);

    for (node, id) in &discovery.stamps {
        dom.set_attr(*node, EDIT_ID_ATTR, id.as_str());
    }

    debug!(
        editable = discovery.elements.len(),
        locked = classification.sections.len(),
        colors = colors.len(),
        warnings = classification.warnings.len(),
        "parsed template"
    );

    Ok(ParsedTemplate {
        raw_html: html.to_string(),
        html_with_edit_ids: dom.to_html(),
        editable_elements: discovery.elements,
        locked_sections: classification.sections,
        colors,
        parse_warnings: classification.warnings,
    })
}
