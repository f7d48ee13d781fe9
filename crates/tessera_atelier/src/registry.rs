//! Process-wide template cache.
//!
//! Partials that are not defined by the template being rendered are looked
//! up here by id. Ids missing from the cache are compiled on demand from a
//! [`TemplateSource`], the stand-in for a document that holds templates by
//! element id.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use compact_str::{format_compact, CompactString};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tessera_relief::CompileError;

use crate::compile::compile;
use crate::view::View;

/// Supplies template text by id
pub trait TemplateSource: Send + Sync {
    fn template_text(&self, id: &str) -> Option<String>;
}

impl<F> TemplateSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn template_text(&self, id: &str) -> Option<String> {
        self(id)
    }
}

/// A partial to register: template text or an already compiled view
pub enum PartialTemplate {
    Text(String),
    View(View),
}

impl From<&str> for PartialTemplate {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PartialTemplate {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<View> for PartialTemplate {
    fn from(view: View) -> Self {
        Self::View(view)
    }
}

static GLOBAL: Lazy<TemplateRegistry> = Lazy::new(TemplateRegistry::new);

/// Id to compiled view cache
pub struct TemplateRegistry {
    templates: DashMap<CompactString, View>,
    source: RwLock<Option<Arc<dyn TemplateSource>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
            source: RwLock::new(None),
        }
    }

    /// The registry partial renderers consult.
    pub fn global() -> &'static TemplateRegistry {
        &GLOBAL
    }

    pub fn set_source(&self, source: impl TemplateSource + 'static) {
        *self.source.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(source));
    }

    pub fn clear_source(&self) {
        *self.source.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Register a partial by id, replacing any previous one.
    pub fn register_partial(
        &self,
        id: impl Into<CompactString>,
        partial: impl Into<PartialTemplate>,
    ) -> Result<View, CompileError> {
        let id = id.into();
        let view = match partial.into() {
            PartialTemplate::Text(text) => compile(None, &text)?,
            PartialTemplate::View(view) => view,
        };
        tracing::debug!(%id, "registered partial");
        self.templates.insert(id, view.clone());
        Ok(view)
    }

    /// Look up a view by id, compiling it from the source on first use.
    ///
    /// Templates compiled from the source are named `#id`.
    pub fn get(&self, id: &str) -> Result<Option<View>, CompileError> {
        if let Some(view) = self.templates.get(id) {
            return Ok(Some(view.clone()));
        }

        let source = self
            .source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(text) = source.and_then(|source| source.template_text(id)) else {
            return Ok(None);
        };

        let filename = format_compact!("#{id}");
        let view = compile(Some(filename.as_str()), &text)?;
        tracing::debug!(%id, "compiled template from source");
        // A concurrent lookup may have compiled it first; keep that one
        let view = self
            .templates
            .entry(CompactString::from(id))
            .or_insert(view)
            .clone();
        Ok(Some(view))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn remove(&self, id: &str) -> Option<View> {
        self.templates.remove(id).map(|(_, view)| view)
    }

    pub fn clear(&self) {
        self.templates.clear();
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}
