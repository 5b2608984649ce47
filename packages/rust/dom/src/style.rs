//! Inline `style` attribute parsing.

/// Split a `style` attribute into `(property, value)` declarations.
///
/// Properties are lowercased; values are trimmed but otherwise untouched.
/// Semicolons inside parentheses or quotes (`url(data:...;base64,...)`) do not
/// end a declaration.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push_declaration(&style[start..i], &mut declarations);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_declaration(&style[start..], &mut declarations);

    declarations
}

/// Value of the last declaration of `property`, if any.
pub fn style_value(style: &str, property: &str) -> Option<String> {
    parse_inline_style(style)
        .into_iter()
        .rev()
        .find(|(prop, _)| prop.eq_ignore_ascii_case(property))
        .map(|(_, value)| value)
}

fn push_declaration(chunk: &str, out: &mut Vec<(String, String)>) {
    let Some((prop, value)) = chunk.split_once(':') else {
        return;
    };
    let prop = prop.trim();
    let value = value.trim();
    if prop.is_empty() || value.is_empty() {
        return;
    }
    out.push((prop.to_ascii_lowercase(), value.to_string()));
}
