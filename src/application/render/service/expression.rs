//! Enrichment of an authored tree with evaluator output syntax.
//!
//! Editors store raw variable paths (`payload.name`) in node attributes,
//! with companion boolean flags marking which attributes hold variables.
//! Before any other stage runs, every flagged attribute is wrapped into a
//! `{{ … }}` expression, with `fallback` becoming a `default('…')` filter
//! and `aliasFor` substituting for the stored name.

use serde_json::Value;

use crate::domain::document::{DocumentNode, attr, kind};

/// Attribute keys that are always variables; their own value doubles as the
/// flag, and the flag is not lowered after wrapping.
const FIRST_CITIZEN_KEYS: [&str; 3] = [attr::ID, attr::SHOW_IF_KEY, attr::EACH_KEY];

/// Attribute/flag pairs that may carry a variable for a node kind.
fn variable_attribute_config(node_kind: &str) -> Vec<(&'static str, &'static str)> {
    let common = vec![
        (attr::ID, attr::ID),
        (attr::SHOW_IF_KEY, attr::SHOW_IF_KEY),
        (attr::EACH_KEY, attr::EACH_KEY),
    ];

    match node_kind {
        kind::BUTTON => [
            vec![
                (attr::TEXT, attr::IS_TEXT_VARIABLE),
                (attr::URL, attr::IS_URL_VARIABLE),
            ],
            common,
        ]
        .concat(),
        kind::IMAGE | kind::INLINE_IMAGE => [
            vec![
                (attr::SRC, attr::IS_SRC_VARIABLE),
                (attr::EXTERNAL_LINK, attr::IS_EXTERNAL_LINK_VARIABLE),
            ],
            common,
        ]
        .concat(),
        kind::LINK => [vec![(attr::HREF, attr::IS_URL_VARIABLE)], common].concat(),
        _ => common,
    }
}

/// Wrap every flagged attribute in the tree, recursing through content and
/// marks. The input is left untouched.
pub fn wrap_expressions(node: &DocumentNode) -> DocumentNode {
    let mut wrapped = node.clone();

    if let Some(content) = &node.content {
        wrapped.content = Some(content.iter().map(wrap_expressions).collect());
    }

    if wrapped.attrs.is_some() {
        wrap_node_attributes(&mut wrapped);
    }

    if let Some(marks) = &node.marks {
        wrapped.marks = Some(
            marks
                .iter()
                .map(|mark| {
                    let mut mark = mark.clone();
                    if mark.attrs.is_some() {
                        wrap_node_attributes(&mut mark);
                    }
                    mark
                })
                .collect(),
        );
    }

    wrapped
}

fn wrap_node_attributes(node: &mut DocumentNode) {
    let config = variable_attribute_config(&node.kind);
    let fallback = node.attr_str(attr::FALLBACK).map(str::to_string);
    let alias_for = node.attr_str(attr::ALIAS_FOR).map(str::to_string);

    for (attr_name, flag_name) in config {
        let Some(attr_value) = node.attr_str(attr_name).map(str::to_string) else {
            continue;
        };
        if attr_value.is_empty() || !flag_is_set(node.attr(flag_name)) {
            continue;
        }

        let wrapped =
            wrap_in_template_output(&attr_value, fallback.as_deref(), alias_for.as_deref());
        node.set_attr(attr_name, Value::String(wrapped));

        if !FIRST_CITIZEN_KEYS.contains(&flag_name) {
            node.set_attr(flag_name, Value::Bool(false));
        }
    }
}

fn flag_is_set(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn wrap_in_template_output(
    variable_name: &str,
    fallback: Option<&str>,
    alias_for: Option<&str>,
) -> String {
    let name = alias_for.unwrap_or(variable_name);
    match fallback {
        Some(fallback) => format!("{{{{ {name} | default('{fallback}') }}}}"),
        None => format!("{{{{ {name} }}}}"),
    }
}
