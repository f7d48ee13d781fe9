//! Custom tag and attribute registry.
//!
//! The compiler asks [`ViewCallbacks`] once per element whether its tag is
//! custom and once per attribute whether a binding handler claims it. The
//! handlers themselves run at render time against the element being built.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use compact_str::CompactString;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use tessera_carton::{CONTENT_TAG, TEMPLATE_DEFINITION_TAG};
use tessera_relief::{Element, RenderResult};

use crate::scope::Scope;
use crate::view::View;

/// Context handed to a custom tag handler
pub struct TagData<'a> {
    pub tag: &'a str,
    pub scope: &'a Scope,
    /// Compiled children of the tag, `None` when it had none
    pub subtemplate: Option<&'a View>,
    pub template_type: &'static str,
    /// Whether the tag sits directly in a section or custom tag
    pub directly_nested: bool,
    /// Named templates defined inside the tag
    pub templates: Option<&'a FxHashMap<CompactString, View>>,
}

/// Context handed to an attribute handler
pub struct AttrData<'a> {
    pub attribute_name: &'a str,
    pub scope: &'a Scope,
}

pub trait TagHandler: Send + Sync {
    /// Mutate `element` for this render.
    ///
    /// Returning a scope renders the subtemplate with it into the element's
    /// children.
    fn render(&self, element: &mut Element, data: &TagData<'_>) -> RenderResult<Option<Scope>>;
}

impl<F> TagHandler for F
where
    F: Fn(&mut Element, &TagData<'_>) -> RenderResult<Option<Scope>> + Send + Sync,
{
    fn render(&self, element: &mut Element, data: &TagData<'_>) -> RenderResult<Option<Scope>> {
        self(element, data)
    }
}

pub trait AttrHandler: Send + Sync {
    fn apply(&self, element: &mut Element, data: &AttrData<'_>) -> RenderResult<()>;
}

impl<F> AttrHandler for F
where
    F: Fn(&mut Element, &AttrData<'_>) -> RenderResult<()> + Send + Sync,
{
    fn apply(&self, element: &mut Element, data: &AttrData<'_>) -> RenderResult<()> {
        self(element, data)
    }
}

static GLOBAL: Lazy<Arc<ViewCallbacks>> = Lazy::new(|| Arc::new(ViewCallbacks::new()));

/// Tag and attribute handler registry
pub struct ViewCallbacks {
    tags: DashMap<CompactString, Arc<dyn TagHandler>>,
    attrs: DashMap<CompactString, Arc<dyn AttrHandler>>,
    attr_patterns: RwLock<Vec<(Regex, Arc<dyn AttrHandler>)>>,
}

impl ViewCallbacks {
    /// Registry with the built-in `content` and `view-template` tags.
    pub fn new() -> Self {
        let callbacks = Self::empty();
        callbacks.register_tag(CONTENT_TAG, content_tag);
        callbacks.register_tag(TEMPLATE_DEFINITION_TAG, template_definition_tag);
        callbacks
    }

    /// The registry default compile options use.
    pub fn global() -> Arc<ViewCallbacks> {
        Arc::clone(&GLOBAL)
    }

    /// Registry without any handlers.
    pub fn empty() -> Self {
        Self {
            tags: DashMap::new(),
            attrs: DashMap::new(),
            attr_patterns: RwLock::new(Vec::new()),
        }
    }

    pub fn register_tag(&self, tag: impl Into<CompactString>, handler: impl TagHandler + 'static) {
        let tag = tag.into();
        if self.tags.insert(tag.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(%tag, "replaced custom tag handler");
        }
    }

    pub fn register_attr(
        &self,
        name: impl Into<CompactString>,
        handler: impl AttrHandler + 'static,
    ) {
        self.attrs.insert(name.into(), Arc::new(handler));
    }

    /// Register a handler for every attribute name matching `pattern`.
    ///
    /// Exact registrations win over patterns; patterns are tried in
    /// registration order.
    pub fn register_attr_pattern(&self, pattern: Regex, handler: impl AttrHandler + 'static) {
        self.attr_patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern, Arc::new(handler)));
    }

    pub fn tag(&self, tag: &str) -> Option<Arc<dyn TagHandler>> {
        self.tags.get(tag).map(|entry| Arc::clone(entry.value()))
    }

    pub fn attr(&self, name: &str) -> Option<Arc<dyn AttrHandler>> {
        if let Some(entry) = self.attrs.get(name) {
            return Some(Arc::clone(entry.value()));
        }
        self.attr_patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| pattern.is_match(name))
            .map(|(_, handler)| Arc::clone(handler))
    }
}

impl Default for ViewCallbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ViewCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<CompactString> = self.tags.iter().map(|e| e.key().clone()).collect();
        let attrs: Vec<CompactString> = self.attrs.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("ViewCallbacks")
            .field("tags", &tags)
            .field("attrs", &attrs)
            .finish_non_exhaustive()
    }
}

/// `<content>` renders its own children in the surrounding scope.
fn content_tag(_element: &mut Element, data: &TagData<'_>) -> RenderResult<Option<Scope>> {
    Ok(Some(data.scope.clone()))
}

/// Definitions are consumed by the compiler and never rendered.
fn template_definition_tag(
    _element: &mut Element,
    _data: &TagData<'_>,
) -> RenderResult<Option<Scope>> {
    Ok(None)
}
