//! Callable compiled views.

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tessera_relief::{Fragment, RenderResult};

use crate::renderer::MarkupRenderer;
use crate::scope::Scope;

enum ViewKind {
    /// A whole compiled template
    Template {
        renderer: MarkupRenderer,
        inline_partials: FxHashMap<CompactString, View>,
        filename: Option<CompactString>,
    },
    /// A compiled fragment such as a custom tag's content or an inline partial
    Section(MarkupRenderer),
}

/// A compiled template, cheap to clone and safe to render concurrently
#[derive(Clone)]
pub struct View(Arc<ViewKind>);

impl View {
    pub(crate) fn template(
        renderer: MarkupRenderer,
        inline_partials: FxHashMap<CompactString, View>,
        filename: Option<CompactString>,
    ) -> Self {
        Self(Arc::new(ViewKind::Template {
            renderer,
            inline_partials,
            filename,
        }))
    }

    pub(crate) fn section(renderer: MarkupRenderer) -> Self {
        Self(Arc::new(ViewKind::Section(renderer)))
    }

    pub fn filename(&self) -> Option<&str> {
        match &*self.0 {
            ViewKind::Template { filename, .. } => filename.as_deref(),
            ViewKind::Section(_) => None,
        }
    }

    /// Inline partial defined by this template.
    pub fn inline_partial(&self, name: &str) -> Option<&View> {
        match &*self.0 {
            ViewKind::Template {
                inline_partials, ..
            } => inline_partials.get(name),
            ViewKind::Section(_) => None,
        }
    }

    pub fn inline_partial_names(&self) -> Vec<&str> {
        match &*self.0 {
            ViewKind::Template {
                inline_partials, ..
            } => {
                let mut names: Vec<&str> = inline_partials.keys().map(|k| k.as_str()).collect();
                names.sort_unstable();
                names
            }
            ViewKind::Section(_) => Vec::new(),
        }
    }

    pub fn ptr_eq(&self, other: &View) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Render into output nodes.
    ///
    /// A whole template first exposes its inline partials, itself as
    /// `scope.view` and its filename on the scope's template context. The
    /// previous view and filename are restored afterwards so a template used
    /// as a partial does not leak into the caller.
    pub fn render(&self, scope: &Scope) -> RenderResult<Fragment> {
        let mut nodes = Vec::new();
        match &*self.0 {
            ViewKind::Template {
                renderer,
                inline_partials,
                filename,
            } => {
                let context = scope.template_context();
                for (name, partial) in inline_partials {
                    context.set_partial(name.clone(), partial.clone());
                }
                let previous_view = context.replace_view(Some(self.clone()));
                let previous_filename = context.replace_filename(filename.clone());

                let result = renderer.render(scope, &mut nodes);

                context.replace_view(previous_view);
                context.replace_filename(previous_filename);
                result?;
            }
            ViewKind::Section(renderer) => renderer.render(scope, &mut nodes)?,
        }
        Ok(Fragment::from(nodes))
    }

    /// Render with `data` as the root of a fresh scope.
    pub fn render_value(&self, data: impl Into<Value>) -> RenderResult<Fragment> {
        self.render(&Scope::new(data))
    }

    /// Render with `data` and serialize to HTML.
    pub fn render_to_string(&self, data: impl Into<Value>) -> RenderResult<String> {
        Ok(self.render_value(data)?.to_html())
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ViewKind::Template {
                renderer,
                inline_partials,
                filename,
            } => f
                .debug_struct("View")
                .field("filename", filename)
                .field("renderer", renderer)
                .field("inline_partials", &inline_partials.len())
                .finish(),
            ViewKind::Section(renderer) => f.debug_tuple("View").field(renderer).finish(),
        }
    }
}
