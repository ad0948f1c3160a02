//! Markup extension plugins.
//!
//! Plugins are registered once, before a document is loaded, and consulted in
//! registration order ahead of the built-in rules: for every element the
//! parser opens, for raw HTML blocks, and for every element the serializer
//! prints. A claimed HTML block usually becomes an [`ElementKind::Plugin`]
//! node that the same plugin prints back.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use pulldown_cmark::Tag;
use regex::Regex;
use smol_str::SmolStr;

use crate::document::{Element, ElementKind};

pub trait MarkupPlugin: Send + Sync {
    /// Plugin node name; printed nodes are routed back by this name.
    fn name(&self) -> &str;

    /// Claim an element as the parser opens it. The returned kind replaces
    /// the built-in conversion of `tag`; a void kind also swallows whatever
    /// the tag contains.
    fn convert_tag(&self, _tag: &Tag<'_>) -> Option<ElementKind> {
        None
    }

    /// Does this plugin claim the raw HTML block?
    fn matches(&self, _html: &str) -> bool {
        false
    }

    /// Convert a claimed block. `None` falls back to the opaque HTML block.
    fn convert(&self, _html: &str) -> Option<Element> {
        None
    }

    /// Print an element ahead of the built-in printers. `Plugin` nodes are
    /// only offered to the plugin named by the node; `None` prints the stored
    /// source for those and the built-in form for everything else.
    fn serialize(&self, _element: &Element) -> Option<String> {
        None
    }
}

/// Ordered set of registered plugins.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn MarkupPlugin>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name().to_string()))
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl MarkupPlugin + 'static) -> &mut Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn with(mut self, plugin: impl MarkupPlugin + 'static) -> Self {
        self.register(plugin);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// First plugin that claims the opening `tag`.
    pub fn convert_tag(&self, tag: &Tag<'_>) -> Option<ElementKind> {
        self.plugins.iter().find_map(|p| p.convert_tag(tag))
    }

    /// First plugin conversion that claims `html`.
    pub fn convert(&self, html: &str) -> Option<Element> {
        self.plugins
            .iter()
            .filter(|p| p.matches(html))
            .find_map(|p| p.convert(html))
    }

    /// Plugin printing for `element`: the owning plugin for a plugin node,
    /// otherwise the first plugin that prints it.
    pub fn serialize(&self, element: &Element) -> Option<String> {
        match &element.kind {
            ElementKind::Plugin { name, .. } => self
                .plugins
                .iter()
                .find(|p| p.name() == name.as_str())
                .and_then(|p| p.serialize(element)),
            _ => self.plugins.iter().find_map(|p| p.serialize(element)),
        }
    }
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<([a-zA-Z][\w-]*)((?:\s+[^>]*?)?)\s*/?>").unwrap());

static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Claims HTML blocks whose root tag is a given custom element, keeping the
/// tag attributes as node attributes. The source is printed back verbatim.
#[derive(Debug, Clone)]
pub struct CustomTagPlugin {
    tag: SmolStr,
}

impl CustomTagPlugin {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self { tag: tag.into() }
    }
}

impl MarkupPlugin for CustomTagPlugin {
    fn name(&self) -> &str {
        &self.tag
    }

    fn matches(&self, html: &str) -> bool {
        TAG_RE
            .captures(html)
            .is_some_and(|caps| caps[1].eq_ignore_ascii_case(&self.tag))
    }

    fn convert(&self, html: &str) -> Option<Element> {
        let caps = TAG_RE.captures(html)?;
        let attrs: BTreeMap<String, String> = ATTR_RE
            .captures_iter(caps.get(2).map_or("", |m| m.as_str()))
            .map(|attr| {
                let value = attr.get(2).or_else(|| attr.get(3)).map_or("", |m| m.as_str());
                (attr[1].to_string(), value.to_string())
            })
            .collect();
        Some(Element::void(ElementKind::Plugin {
            name: self.tag.clone(),
            attrs,
            source: html.trim().to_string(),
        }))
    }
}
