use indexmap::{IndexMap, IndexSet};

/// Replaces every `{name}` occurrence for each collected argument.
///
/// Arguments are applied in map order. Placeholders without a value stay in
/// the text literally.
pub fn substitute(template: &str, arguments: &IndexMap<String, String>) -> String {
    let mut text = template.to_owned();
    for (name, value) in arguments {
        text = text.replace(&placeholder_for(name), value);
    }
    text
}

/// Returns the `{...}` token for one argument name.
pub fn placeholder_for(name: &str) -> String {
    format!("{{{name}}}")
}

/// Lists distinct placeholder names in order of first appearance.
///
/// A token is any `{...}` run without nested braces or whitespace.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = IndexSet::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(|character: char| {
            character == '}' || character == '{' || character.is_whitespace()
        }) else {
            break;
        };
        if after_open[close..].starts_with('}') && close > 0 {
            names.insert(after_open[..close].to_owned());
            rest = &after_open[close + 1..];
        } else {
            rest = &after_open[close..];
        }
    }
    names.into_iter().collect()
}
