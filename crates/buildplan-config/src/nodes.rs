// Helper functions for extracting values from KDL nodes

use kdl::{KdlDocument, KdlNode, KdlValue};

use crate::{ConfigError, ConfigResult};

pub(crate) fn scalar(value: &KdlValue) -> Option<String> {
    match value {
        KdlValue::String(s) => Some(s.clone()),
        KdlValue::Integer(i) => Some(i.to_string()),
        KdlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reject unquoted decimals anywhere in the document. A float loses its
/// written form (`1.10` reads back as `1.1`), so such values must be quoted.
pub(crate) fn reject_floats(doc: &KdlDocument) -> ConfigResult<()> {
    for node in doc.nodes() {
        for entry in node.entries() {
            if let KdlValue::Float(f) = entry.value() {
                let field = match entry.name() {
                    Some(name) => format!("{} {}", node.name().value(), name.value()),
                    None => node.name().value().to_string(),
                };
                return Err(ConfigError::invalid(
                    field,
                    format!("decimal {} must be quoted", f),
                ));
            }
        }
        if let Some(children) = node.children() {
            reject_floats(children)?;
        }
    }
    Ok(())
}

pub(crate) fn first_string_arg(node: &KdlNode) -> Option<String> {
    string_arg_at(node, 0)
}

pub(crate) fn string_arg_at(node: &KdlNode, index: usize) -> Option<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .nth(index)
        .and_then(|e| scalar(e.value()))
}

pub(crate) fn all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| scalar(e.value()))
        .collect()
}

pub(crate) fn string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name).and_then(scalar)
}

pub(crate) fn u32_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<u32>> {
    let Some(value) = node.get(name) else {
        return Ok(None);
    };
    let field = format!("{} {}", node.name().value(), name);
    let int = value
        .as_integer()
        .ok_or_else(|| ConfigError::invalid(&field, "expected an integer"))?;
    u32::try_from(int)
        .map(Some)
        .map_err(|_| ConfigError::invalid(&field, format!("{} is out of range", int)))
}

/// Value of the first argument of a named child node (e.g. `name "x"`).
pub(crate) fn child_string(node: &KdlNode, child: &str) -> Option<String> {
    node.children()?
        .nodes()
        .iter()
        .find(|n| n.name().value() == child)
        .and_then(first_string_arg)
}

pub(crate) fn children(node: &KdlNode) -> &[KdlNode] {
    node.children().map(|doc| doc.nodes()).unwrap_or_default()
}
