//! Color catalog extraction.

use std::collections::HashMap;
use std::sync::LazyLock;

use letterpress_dom::{Dom, parse_inline_style};
use letterpress_shared::{ColorUsage, ExtractedColor};
use regex::Regex;
use tracing::{debug, instrument};

/// Six-digit hex literals. Shorthand and eight-digit forms are left alone.
static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[0-9a-fA-F]{6}\b").expect("valid regex"));

/// Collect every hex color declared inline, deduplicated by `(hex, usage)`.
///
/// Sources are inline `style` declarations, `bgcolor` attributes and
/// `<font color>`. Entries are ordered by count, ties by first appearance.
#[instrument(skip_all)]
pub(crate) fn catalog(dom: &Dom) -> Vec<ExtractedColor> {
    let mut colors: Vec<ExtractedColor> = Vec::new();
    let mut index: HashMap<(String, ColorUsage), usize> = HashMap::new();

    let mut record = |value: &str, usage: ColorUsage| {
        for m in HEX_COLOR_RE.find_iter(value) {
            let hex = m.as_str().to_ascii_lowercase();
            match index.get(&(hex.clone(), usage)) {
                Some(&i) => colors[i].count += 1,
                None => {
                    index.insert((hex.clone(), usage), colors.len());
                    colors.push(ExtractedColor { hex, usage, count: 1 });
                }
            }
        }
    };

    for id in dom.elements() {
        let Some(el) = dom.element(id) else {
            continue;
        };
        if let Some(style) = el.attr("style") {
            for (property, value) in parse_inline_style(style) {
                record(&value, usage_for(&property));
            }
        }
        if let Some(bgcolor) = el.attr("bgcolor") {
            record(bgcolor, ColorUsage::Background);
        }
        if el.name() == "font" {
            if let Some(color) = el.attr("color") {
                record(color, ColorUsage::Text);
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    colors.sort_by(|a, b| b.count.cmp(&a.count));
    debug!(distinct = colors.len(), "extracted colors");
    colors
}

fn usage_for(property: &str) -> ColorUsage {
    match property {
        "color" => ColorUsage::Text,
        "background" | "background-color" => ColorUsage::Background,
        _ => ColorUsage::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors_of(html: &str) -> Vec<ExtractedColor> {
        catalog(&Dom::parse(html, 1024 * 1024).unwrap())
    }

    #[test]
    fn dedupes_by_hex_and_usage() {
        let colors = colors_of(
            r##"<div style="color: #FF0000"><p style="color:#ff0000; background-color: #FF0000">x</p></div>"##,
        );
        assert_eq!(
            colors,
            vec![
                ExtractedColor { hex: "#ff0000".into(), usage: ColorUsage::Text, count: 2 },
                ExtractedColor { hex: "#ff0000".into(), usage: ColorUsage::Background, count: 1 },
            ]
        );
    }

    #[test]
    fn attribute_sources() {
        let colors = colors_of(
            r##"<table bgcolor="#EEEEEE"><tr><td><font color="#123456">x</font></td></tr></table>"##,
        );
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].hex, "#eeeeee");
        assert_eq!(colors[0].usage, ColorUsage::Background);
        assert_eq!(colors[1].hex, "#123456");
        assert_eq!(colors[1].usage, ColorUsage::Text);
    }

    #[test]
    fn other_properties_and_ordering() {
        let colors = colors_of(
            r##"<p style="border: 1px solid #cccccc">a</p><p style="color: #111111">b</p><p style="color: #111111">c</p>"##,
        );
        assert_eq!(colors[0].hex, "#111111");
        assert_eq!(colors[0].count, 2);
        assert_eq!(colors[1].hex, "#cccccc");
        assert_eq!(colors[1].usage, ColorUsage::Other);
    }

    #[test]
    fn ignores_short_and_non_hex_forms() {
        let colors = colors_of(
            r##"<p style="color: #fff; background: rgb(1, 2, 3); border-color: #11223344">x</p>"##,
        );
        assert!(colors.is_empty());
    }
}
