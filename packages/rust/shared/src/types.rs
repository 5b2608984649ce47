//! Core domain types for parsed newsletter templates.
//!
//! Everything here crosses the engine boundary as JSON, so field names are
//! serialized in camelCase.

use serde::{Deserialize, Serialize};

/// Attribute injected on every discovered editable node.
pub const EDIT_ID_ATTR: &str = "data-edit-id";

const EDIT_ID_PREFIX: &str = "edit-";
const CELL_SEPARATOR: &str = "-c";

// ---------------------------------------------------------------------------
// EditId
// ---------------------------------------------------------------------------

/// Snapshot-scoped identifier of an editable node.
///
/// Element ids are `edit-<n>` with `n` assigned in document order. Table-row
/// cells carry `edit-<n>-c<k>`. Ids are only meaningful within the
/// `htmlWithEditIds` snapshot that minted them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditId(pub String);

impl EditId {
    /// Id of the `n`-th discovered element.
    pub fn element(n: usize) -> Self {
        Self(format!("{EDIT_ID_PREFIX}{n}"))
    }

    /// Id of the `k`-th cell under this element.
    pub fn cell(&self, k: usize) -> Self {
        Self(format!("{}{CELL_SEPARATOR}{k}", self.0))
    }

    /// The element ordinal `n`, for both element and cell ids.
    pub fn ordinal(&self) -> Option<usize> {
        let rest = self.0.strip_prefix(EDIT_ID_PREFIX)?;
        let digits = rest.split(CELL_SEPARATOR).next()?;
        digits.parse().ok()
    }

    /// The cell index `k` of a cell id.
    pub fn cell_index(&self) -> Option<usize> {
        let rest = self.0.strip_prefix(EDIT_ID_PREFIX)?;
        let (_, k) = rest.split_once(CELL_SEPARATOR)?;
        k.parse().ok()
    }

    /// Whether this is a cell id (`edit-<n>-c<k>`).
    pub fn is_cell(&self) -> bool {
        self.0
            .strip_prefix(EDIT_ID_PREFIX)
            .is_some_and(|rest| rest.contains(CELL_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EditId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Editable elements
// ---------------------------------------------------------------------------

/// Content classification of an editable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// Plain text node.
    Text,
    /// Text containing one inline link.
    MixedContent,
    /// The large header image.
    Banner,
    /// Repeatable row; the only kind that can be duplicated.
    TableRow,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::MixedContent => "mixed-content",
            Self::Banner => "banner",
            Self::TableRow => "table-row",
        }
    }
}

/// Semantic slot a field writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldName {
    Text,
    Src,
    Alt,
    Href,
}

impl FieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Src => "src",
            Self::Alt => "alt",
            Self::Href => "href",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldName {
    type Err = crate::LetterpressError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "src" => Ok(Self::Src),
            "alt" => Ok(Self::Alt),
            "href" => Ok(Self::Href),
            other => Err(crate::LetterpressError::validation(format!(
                "unknown field '{other}': expected text, src, alt, or href"
            ))),
        }
    }
}

/// Input widget hint for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Url,
}

/// One user-modifiable value of an editable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableField {
    pub name: FieldName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: String,
    /// Node the field is applied to when it differs from the element (table cells).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EditId>,
}

/// Inline text styling picked off the element's `style` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TextStyles {
    pub fn is_empty(&self) -> bool {
        self.font_size.is_none() && self.font_weight.is_none() && self.color.is_none()
    }
}

/// The single link embedded in a mixed-content element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMeta {
    pub text: String,
    pub href: String,
}

/// A discovered node exposing one or more editable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableElement {
    pub id: EditId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Element name (`td`, `p`, `img`, ...).
    pub tag: String,
    pub editable_fields: Vec<EditableField>,
    /// Pre-order element index, shared with locked sections.
    pub document_position: usize,
    /// Element path of the parent; siblings share it.
    pub parent_path: String,
    /// Number of element ancestors.
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<TextStyles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkMeta>,
}

impl EditableElement {
    /// Look up a field by slot name.
    pub fn field(&self, name: FieldName) -> Option<&EditableField> {
        self.editable_fields.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Locked sections
// ---------------------------------------------------------------------------

/// Kind of externally sourced news block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Companies,
    People,
    Topics,
    Headlines,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::People => "people",
            Self::Topics => "topics",
            Self::Headlines => "headlines",
        }
    }
}

/// A protected, data-driven subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedSection {
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub header_text: String,
    /// CSS selector path of the section root.
    pub element_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_count: Option<usize>,
    /// Pre-order element index, shared with editable elements.
    pub document_position: usize,
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Role a color plays where it is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorUsage {
    Text,
    Background,
    Other,
}

/// One catalog entry: a normalized hex in one usage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedColor {
    /// Lowercase `#rrggbb`.
    pub hex: String,
    pub usage: ColorUsage,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// ParsedTemplate
// ---------------------------------------------------------------------------

/// Output of one parse call. Immutable; edits operate on `html_with_edit_ids`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTemplate {
    /// The input, unmodified.
    #[serde(rename = "rawHTML")]
    pub raw_html: String,
    /// Serialized document with `data-edit-id` on every editable node.
    #[serde(rename = "htmlWithEditIds")]
    pub html_with_edit_ids: String,
    pub editable_elements: Vec<EditableElement>,
    pub locked_sections: Vec<LockedSection>,
    pub colors: Vec<ExtractedColor>,
    pub parse_warnings: Vec<String>,
}

impl ParsedTemplate {
    /// Find an editable element by id.
    pub fn element(&self, id: &str) -> Option<&EditableElement> {
        self.editable_elements.iter().find(|e| e.id.as_str() == id)
    }

    /// Elements of one kind, in document order.
    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &EditableElement> {
        self.editable_elements.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_id_ordinals() {
        let id = EditId::element(12);
        assert_eq!(id.as_str(), "edit-12");
        assert_eq!(id.ordinal(), Some(12));
        assert!(!id.is_cell());

        let cell = id.cell(3);
        assert_eq!(cell.as_str(), "edit-12-c3");
        assert_eq!(cell.ordinal(), Some(12));
        assert_eq!(cell.cell_index(), Some(3));
        assert!(cell.is_cell());
        assert_eq!(id.cell_index(), None);

        assert_eq!(EditId::from("nonexistent-id").ordinal(), None);
    }

    #[test]
    fn field_name_parsing() {
        assert_eq!("HREF".parse::<FieldName>().unwrap(), FieldName::Href);
        let err = "colour".parse::<FieldName>().unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn element_serializes_with_boundary_names() {
        let element = EditableElement {
            id: EditId::element(0),
            kind: ElementKind::MixedContent,
            tag: "p".into(),
            editable_fields: vec![EditableField {
                name: FieldName::Href,
                label: Some("Link URL".into()),
                field_type: FieldType::Url,
                value: "https://example.com".into(),
                target: None,
            }],
            document_position: 7,
            parent_path: "html > body".into(),
            depth: 2,
            styles: None,
            link: None,
        };

        let json = serde_json::to_value(&element).expect("serialize");
        assert_eq!(json["type"], "mixed-content");
        assert_eq!(json["documentPosition"], 7);
        assert_eq!(json["editableFields"][0]["type"], "url");
        assert!(json.get("styles").is_none());

        let parsed: EditableElement = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, element);
    }

    #[test]
    fn parsed_template_uses_html_field_names() {
        let parsed = ParsedTemplate {
            raw_html: "<p>x</p>".into(),
            html_with_edit_ids: "<p>x</p>".into(),
            editable_elements: vec![],
            locked_sections: vec![],
            colors: vec![ExtractedColor {
                hex: "#ff0000".into(),
                usage: ColorUsage::Background,
                count: 2,
            }],
            parse_warnings: vec![],
        };
        let json = serde_json::to_value(&parsed).expect("serialize");
        assert!(json.get("rawHTML").is_some());
        assert!(json.get("htmlWithEditIds").is_some());
        assert_eq!(json["colors"][0]["usage"], "background");
    }
}
