//! Structural classifier: finds externally sourced news blocks and locks them.
//!
//! A locked section is found from its header. Header candidates are short
//! heading-like elements whose text matches the section vocabulary; the section
//! root is the nearest enclosing `td`/`th` whose serialized size falls inside
//! the configured bounds, or failing that the nearest such `table`. Everything
//! under a root is off-limits to the discoverer.

use std::collections::HashSet;

use letterpress_dom::{Dom, Element, NodeId, normalize_text};
use letterpress_shared::{LockedSection, ParseOptions, SectionType, Thresholds};
use tracing::{debug, instrument, warn};

use crate::order::DocumentOrder;
use crate::patterns;

const HEADER_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "strong", "b", "p", "td", "th"];

/// Inline containers that count as headers only when styled bold.
const STYLED_HEADER_TAGS: &[&str] = &["span", "div", "font"];

/// Output of the classifier pass.
#[derive(Debug, Default)]
pub(crate) struct Classification {
    /// Sections in document order.
    pub sections: Vec<LockedSection>,
    /// Every element inside a locked section, roots included.
    pub locked: HashSet<NodeId>,
    pub warnings: Vec<String>,
}

#[instrument(skip_all, fields(skip_locking = options.skip_locking))]
pub(crate) fn classify(dom: &Dom, order: &DocumentOrder, options: &ParseOptions) -> Classification {
    let mut result = Classification::default();
    if options.skip_locking {
        debug!("locking disabled");
        return result;
    }

    let thresholds = &options.thresholds;
    let mut roots: Vec<(NodeId, SectionType, String)> = Vec::new();

    for id in dom.elements() {
        if result.locked.contains(&id) {
            continue;
        }
        let Some(el) = dom.element(id) else {
            continue;
        };
        if !is_header_candidate(el) {
            continue;
        }

        let text = normalize_text(&dom.text_content(id));
        if text.is_empty() || text.chars().count() > thresholds.header_max_chars {
            continue;
        }
        let Some(section_type) = patterns::match_section(&text) else {
            continue;
        };

        let Some(container) = find_container(dom, id, thresholds) else {
            warn!(header = %text, section = section_type.as_str(), "no section container in size bounds");
            result.warnings.push(format!(
                "{} header \"{text}\" has no enclosing table or cell between {} and {} characters; left unlocked",
                section_type.as_str(),
                thresholds.section_min_chars,
                thresholds.section_max_chars
            ));
            continue;
        };

        if roots.iter().any(|(root, _, _)| *root == container) {
            continue;
        }
        if roots
            .iter()
            .any(|(root, _, _)| dom.is_ancestor_of(container, *root))
        {
            warn!(header = %text, "section container would enclose an existing section");
            result.warnings.push(format!(
                "{} header \"{text}\" resolves to a container holding another locked section; left unlocked",
                section_type.as_str()
            ));
            continue;
        }

        debug!(
            header = %text,
            section = section_type.as_str(),
            path = %dom.element_path(container),
            "locked section"
        );
        result.locked.extend(dom.elements_under(container));
        roots.push((container, section_type, text));
    }

    roots.sort_by_key(|(root, _, _)| order.position(*root));
    result.sections = roots
        .into_iter()
        .enumerate()
        .map(|(n, (root, section_type, header_text))| LockedSection {
            id: format!("locked-{n}"),
            section_type,
            header_text,
            element_path: dom.element_path(root),
            article_count: count_articles(dom, root),
            document_position: order.position(root),
        })
        .collect();

    result
}

fn is_header_candidate(el: &Element) -> bool {
    if HEADER_TAGS.contains(&el.name()) {
        return true;
    }
    STYLED_HEADER_TAGS.contains(&el.name())
        && el
            .attr("style")
            .and_then(|style| letterpress_dom::style_value(style, "font-weight"))
            .is_some_and(|weight| is_bold(&weight))
}

fn is_bold(weight: &str) -> bool {
    let weight = weight.trim().to_ascii_lowercase();
    weight == "bold" || weight == "bolder" || weight.parse::<u32>().is_ok_and(|w| w >= 600)
}

/// Nearest in-bounds cell ancestor, else the nearest in-bounds table.
fn find_container(dom: &Dom, header: NodeId, thresholds: &Thresholds) -> Option<NodeId> {
    let in_bounds: Vec<NodeId> = dom
        .ancestors(header)
        .into_iter()
        .filter(|id| matches!(dom.tag(*id), Some("td" | "th" | "table")))
        .filter(|id| {
            let size = dom.outer_len(*id);
            size >= thresholds.section_min_chars && size <= thresholds.section_max_chars
        })
        .collect();

    // A cell wins over a nearer table.
    in_bounds
        .iter()
        .copied()
        .find(|id| matches!(dom.tag(*id), Some("td" | "th")))
        .or_else(|| in_bounds.first().copied())
}

/// Distinct outbound link targets inside a section.
fn count_articles(dom: &Dom, root: NodeId) -> Option<usize> {
    let hrefs: HashSet<&str> = dom
        .outbound_links(root)
        .into_iter()
        .filter_map(|id| dom.attr(id, "href"))
        .map(str::trim)
        .collect();

    (!hrefs.is_empty()).then_some(hrefs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1024 * 1024;

    fn article(n: usize) -> String {
        format!(
            r#"<p><a href="https://news.example.com/story-{n}">Story {n} title that runs long enough to matter</a> with a short summary of what happened and why it matters to readers this week.</p>"#
        )
    }

    fn run(html: &str, skip_locking: bool) -> (Dom, Classification) {
        let dom = Dom::parse(html, LIMIT).unwrap();
        let order = DocumentOrder::new(&dom);
        let result = classify(&dom, &order, &ParseOptions::with_skip_locking(skip_locking));
        (dom, result)
    }

    #[test]
    fn header_locks_enclosing_cell() {
        let html = format!(
            "<table><tr><td><h2>Companies Mentioned</h2>{}{}{}</td></tr></table>",
            article(1),
            article(2),
            article(1)
        );
        let (dom, result) = run(&html, false);

        assert_eq!(result.sections.len(), 1);
        let section = &result.sections[0];
        assert_eq!(section.id, "locked-0");
        assert_eq!(section.section_type, SectionType::Companies);
        assert_eq!(section.header_text, "Companies Mentioned");
        assert_eq!(section.article_count, Some(2));
        assert!(section.element_path.ends_with("td:nth-of-type(1)"));

        for id in dom.elements() {
            if dom.tag(id) == Some("a") {
                assert!(result.locked.contains(&id));
            }
        }
    }

    #[test]
    fn cell_is_preferred_over_nearer_table() {
        let rows: String = (1..=3)
            .map(|n| format!("<tr><td>{}</td></tr>", article(n)))
            .collect();
        let html = format!(
            "<table><tr><td><table><tr><td><h2>Companies</h2></td></tr>{rows}</table></td></tr></table>"
        );
        let (dom, result) = run(&html, false);

        assert_eq!(result.sections.len(), 1);
        let path = &result.sections[0].element_path;
        assert!(path.ends_with("td:nth-of-type(1)"), "{path}");
        let inner = dom
            .elements()
            .into_iter()
            .filter(|id| dom.tag(*id) == Some("table"))
            .nth(1)
            .unwrap();
        assert!(result.locked.contains(&inner));
    }

    #[test]
    fn small_container_is_not_locked() {
        let html = "<table><tr><td><h2>Trending Topics</h2><p>Nothing yet.</p></td></tr></table>";
        let (_, result) = run(html, false);
        assert!(result.sections.is_empty());
        assert!(result.locked.is_empty());
        // Both the cell and the heading read as headers.
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().all(|w| w.contains("Trending Topics")));
    }

    #[test]
    fn nested_headers_are_skipped() {
        let html = format!(
            "<table><tr><td><h2>People in the News</h2><strong>Executive moves</strong>{}{}{}</td></tr></table>",
            article(1),
            article(2),
            article(3)
        );
        let (_, result) = run(&html, false);
        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].section_type, SectionType::People);
        assert_eq!(result.sections[0].article_count, Some(3));
    }

    #[test]
    fn sibling_sections_stay_disjoint() {
        let html = format!(
            "<table><tr><td><h3>Top Stories</h3>{}{}{}</td></tr><tr><td><h3>Companies</h3>{}{}{}</td></tr></table>",
            article(1),
            article(2),
            article(3),
            article(4),
            article(5),
            article(6)
        );
        let (dom, result) = run(&html, false);
        assert_eq!(result.sections.len(), 2);
        assert_eq!(result.sections[0].section_type, SectionType::Headlines);
        assert_eq!(result.sections[1].section_type, SectionType::Companies);
        assert!(result.sections[0].document_position < result.sections[1].document_position);
        assert_eq!(result.sections[1].id, "locked-1");

        let tds: Vec<NodeId> = dom
            .elements()
            .into_iter()
            .filter(|id| dom.tag(*id) == Some("td"))
            .collect();
        assert!(!dom.is_ancestor_of(tds[0], tds[1]));
    }

    #[test]
    fn bold_span_is_a_header() {
        let html = format!(
            r#"<table><tr><td><span style="font-weight: 700">Company news</span>{}{}{}</td></tr></table>"#,
            article(1),
            article(2),
            article(3)
        );
        let (_, result) = run(&html, false);
        assert_eq!(result.sections.len(), 1);

        let plain = format!(
            "<table><tr><td><span>Company news</span>{}{}{}</td></tr></table>",
            article(1),
            article(2),
            article(3)
        );
        let (_, result) = run(&plain, false);
        assert!(result.sections.is_empty());
    }

    #[test]
    fn skip_locking_returns_nothing() {
        let html = format!(
            "<table><tr><td><h2>Companies Mentioned</h2>{}{}{}</td></tr></table>",
            article(1),
            article(2),
            article(3)
        );
        let (_, result) = run(&html, true);
        assert!(result.sections.is_empty());
        assert!(result.locked.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn bold_weights() {
        assert!(is_bold("bold"));
        assert!(is_bold(" 600 "));
        assert!(!is_bold("400"));
        assert!(!is_bold("normal"));
    }
}
