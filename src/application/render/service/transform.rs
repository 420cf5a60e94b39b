//! Structural transformation: conditional pruning, loop expansion with
//! index-aware expression rewriting, and variable inlining.
//!
//! Conditions and iterables are evaluated against the escaped payload while
//! the rest of the tree still holds raw expressions; the surviving tree is
//! substituted as a whole in the later template pass. Each sibling list is
//! walked by index with in-place splicing, so removals and expansions never
//! touch an already-visited node.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::application::render::types::RenderError;
use crate::domain::document::{DocumentNode, attr, kind};

use super::template::TemplateEvaluator;
use super::truthy::string_to_boolean;

static EXPRESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("expression pattern compiles"));

/// Resolve conditions, expand loops, and inline variables across the tree.
///
/// A false condition removes the node and leaves its subtree unvisited; the
/// `showIfKey` attribute is stripped from kept nodes. A repeat node is
/// replaced by index-rewritten copies of its content, one per iteration; the
/// copies are traversed like any other sibling, so nested repeats expand
/// too. Variable nodes become text nodes holding their expression.
pub fn transform_tree(
    root: &mut DocumentNode,
    evaluator: &TemplateEvaluator,
    context: &Value,
) -> Result<(), RenderError> {
    if root.has_show_condition() {
        let keep = evaluate_show_condition(root, evaluator, context)?;
        root.remove_attr(attr::SHOW_IF_KEY);
        if !keep {
            return Ok(());
        }
    }

    if root.is_repeat() {
        let copies = expand_repeat(root, evaluator, context)?;
        root.remove_attr(attr::EACH_KEY);
        root.remove_attr(attr::ITERATIONS_KEY);
        root.content = Some(copies);
    }

    if root.kind == kind::VARIABLE {
        inline_variable(root);
    }

    transform_children(root, evaluator, context)
}

fn transform_children(
    parent: &mut DocumentNode,
    evaluator: &TemplateEvaluator,
    context: &Value,
) -> Result<(), RenderError> {
    let Some(content) = parent.content.as_mut() else {
        return Ok(());
    };

    let mut index = 0;
    while index < content.len() {
        if content[index].has_show_condition() {
            let keep = evaluate_show_condition(&content[index], evaluator, context)?;
            content[index].remove_attr(attr::SHOW_IF_KEY);
            if !keep {
                content.remove(index);
                continue;
            }
        }

        if content[index].is_repeat() {
            let copies = expand_repeat(&content[index], evaluator, context)?;
            content.splice(index..index + 1, copies);
            continue;
        }

        if content[index].kind == kind::VARIABLE {
            inline_variable(&mut content[index]);
        }

        index += 1;
    }

    for child in content.iter_mut() {
        transform_children(child, evaluator, context)?;
    }

    Ok(())
}

fn evaluate_show_condition(
    node: &DocumentNode,
    evaluator: &TemplateEvaluator,
    context: &Value,
) -> Result<bool, RenderError> {
    let Some(expression) = node.attr_str(attr::SHOW_IF_KEY) else {
        return Ok(true);
    };
    let substituted = evaluator.render(expression, context)?;
    Ok(string_to_boolean(&substituted))
}

/// Rewrite a variable node into the general text-rendering path, deferring
/// evaluation to the whole-tree template pass.
fn inline_variable(node: &mut DocumentNode) {
    node.text = Some(node.attr_str(attr::ID).unwrap_or_default().to_string());
    node.kind = kind::TEXT.to_string();
}

fn expand_repeat(
    node: &DocumentNode,
    evaluator: &TemplateEvaluator,
    context: &Value,
) -> Result<Vec<DocumentNode>, RenderError> {
    let iterable_path = node.attr_str(attr::EACH_KEY).unwrap_or_default().to_string();
    let iterations = node.attr_u64(attr::ITERATIONS_KEY);
    let template_nodes = node.content.clone().unwrap_or_default();

    let items = materialize_iterable(&iterable_path, evaluator, context)?;
    let count = iterations.map_or(items.len(), |limit| items.len().min(limit as usize));

    let mut expanded = Vec::with_capacity(count * template_nodes.len());
    for item_index in 0..count {
        expanded.extend(rewrite_nodes_for_index(
            &template_nodes,
            &iterable_path,
            item_index,
        ));
    }
    Ok(expanded)
}

/// Evaluate the iterable expression and parse the result as a JSON array.
/// A failed parse retries with single quotes swapped for double quotes;
/// anything still unparsable, or not an array, is an authoring defect.
fn materialize_iterable(
    iterable_path: &str,
    evaluator: &TemplateEvaluator,
    context: &Value,
) -> Result<Vec<Value>, RenderError> {
    let rendered = evaluator.render(iterable_path, context)?;
    let parsed = serde_json::from_str::<Value>(&rendered)
        .or_else(|_| serde_json::from_str::<Value>(&rendered.replace('\'', "\"")))
        .map_err(|err| RenderError::Iterable {
            path: iterable_path.to_string(),
            message: err.to_string(),
        })?;

    match parsed {
        Value::Array(items) => Ok(items),
        other => Err(RenderError::Iterable {
            path: iterable_path.to_string(),
            message: format!("evaluated to {}", value_kind(&other)),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Deep-copy loop content for one iteration, adding the index to every
/// expression that references the iterable.
fn rewrite_nodes_for_index(
    nodes: &[DocumentNode],
    iterable_path: &str,
    item_index: usize,
) -> Vec<DocumentNode> {
    nodes
        .iter()
        .map(|node| {
            let mut copy = node.clone();

            if copy.kind == kind::VARIABLE {
                inline_variable(&mut copy);
                if let Some(text) = copy.text.take() {
                    copy.text = Some(add_index_to_expression(&text, iterable_path, item_index));
                }
                return copy;
            }

            if copy.kind == kind::BUTTON {
                rewrite_attr_for_index(&mut copy, attr::TEXT, iterable_path, item_index);
                rewrite_attr_for_index(&mut copy, attr::URL, iterable_path, item_index);
                return copy;
            }

            if copy.kind == kind::IMAGE || copy.kind == kind::INLINE_IMAGE {
                rewrite_attr_for_index(&mut copy, attr::SRC, iterable_path, item_index);
                rewrite_attr_for_index(&mut copy, attr::EXTERNAL_LINK, iterable_path, item_index);
                return copy;
            }

            if copy.kind == kind::LINK {
                rewrite_attr_for_index(&mut copy, attr::HREF, iterable_path, item_index);
                return copy;
            }

            if let Some(children) = &copy.content {
                copy.content = Some(rewrite_nodes_for_index(children, iterable_path, item_index));
            }
            if let Some(marks) = &copy.marks {
                copy.marks = Some(rewrite_nodes_for_index(marks, iterable_path, item_index));
            }
            copy
        })
        .collect()
}

fn rewrite_attr_for_index(
    node: &mut DocumentNode,
    attr_name: &str,
    iterable_path: &str,
    item_index: usize,
) {
    if let Some(value) = node.attr_str(attr_name).map(str::to_string) {
        node.set_attr(
            attr_name,
            Value::String(add_index_to_expression(&value, iterable_path, item_index)),
        );
    }
}

/// Add the iteration index to an expression unless it already carries one.
///
/// `{{ payload.comments.author }}` with iterable `{{ payload.comments }}`
/// and index 0 becomes `{{ payload.comments[0].author }}`; an expression
/// whose path already contains `[` is returned unchanged, which keeps
/// re-entrant rewriting of nested repeats idempotent.
fn add_index_to_expression(text: &str, iterable_path: &str, item_index: usize) -> String {
    let clean = iterable_path.replace("{{", "").replace("}}", "");
    let clean_path = clean.trim();

    let Some(captures) = EXPRESSION_RE.captures(text) else {
        return text.to_string();
    };
    let inner = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

    let mut parts = inner.split('|').map(str::trim);
    let path = parts.next().unwrap_or_default();
    let filters: Vec<&str> = parts.collect();

    if path.contains('[') {
        return text.to_string();
    }

    let indexed = path.replacen(clean_path, &format!("{clean_path}[{item_index}]"), 1);
    if filters.is_empty() {
        format!("{{{{ {indexed} }}}}")
    } else {
        format!("{{{{ {indexed} | {} }}}}", filters.join(" | "))
    }
}
