//! Markup text ⇄ document tree.
//!
//! [`parse`] and [`serialize`] are inverse up to canonicalization:
//! `parse(serialize(d)).canonicalize() == d.canonicalize()` for any normalized
//! document `d`.

pub mod embed;
mod parser;
pub mod plugin;
mod serializer;

#[cfg(test)]
mod tests;

pub use embed::{ATTACH_SCHEME, Embed, MEDIA_SCHEME};
pub use parser::markdown_options;
pub use plugin::{CustomTagPlugin, MarkupPlugin, PluginRegistry};
pub use serializer::{SerializeOptions, Serializer, escape_text};

use crate::document::{Document, Node};

/// Parse markup into a normalized document. Markup that yields no nodes
/// produces the default single empty paragraph.
pub fn parse(markup: &str, plugins: &PluginRegistry) -> Document {
    let nodes = parser::parse_nodes(markup, plugins);
    tracing::debug!(
        target: "loom::markup",
        bytes = markup.len(),
        blocks = nodes.len(),
        "parsed markup"
    );
    Document::from_nodes(nodes)
}

/// Parse markup into top-level nodes, normalized but not wrapped in a
/// document. Used when splicing parsed content into an existing tree.
pub fn parse_fragment(markup: &str, plugins: &PluginRegistry) -> Vec<Node> {
    parse(markup, plugins).into_children()
}

pub fn serialize(doc: &Document, options: &SerializeOptions, plugins: &PluginRegistry) -> String {
    Serializer::new(options, plugins).document(doc)
}

/// Print a sequence of block nodes (a copied fragment).
pub fn serialize_nodes(
    nodes: &[Node],
    options: &SerializeOptions,
    plugins: &PluginRegistry,
) -> String {
    Serializer::new(options, plugins).blocks(nodes)
}
