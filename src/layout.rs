//! Human-readable schema tree printing.

use std::fmt::Write;

use crate::schema::SchemaNode;

/// What [`render`] prints.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutOptions {
    /// Only print nodes that are required in context.
    pub required_only: bool,
    /// Mark required nodes with `(required)`.
    pub show_required: bool,
    /// Mark repeatable nodes with `[]`.
    pub show_repeatable: bool,
}

/// Render `node` and its descendants, one indented line each.
///
/// ```text
/// phone
///   name (required)
///   lines
///     line[]
/// ```
pub fn render(node: &SchemaNode, options: &LayoutOptions) -> String {
    let mut out = String::new();
    render_node(node, 0, options, &mut out);
    out
}

fn render_node(node: &SchemaNode, depth: usize, options: &LayoutOptions, out: &mut String) {
    // An optional subtree is never needed, whatever its children say
    if options.required_only && depth > 0 && !node.required_in_context() {
        return;
    }
    let _ = write!(out, "{}{}", "  ".repeat(depth), node.name());
    if options.show_repeatable && node.is_repeatable() {
        out.push_str("[]");
    }
    if options.show_required && node.is_required() {
        out.push_str(" (required)");
    }
    out.push('\n');
    for child in node.children() {
        render_node(child, depth + 1, options, out);
    }
}
