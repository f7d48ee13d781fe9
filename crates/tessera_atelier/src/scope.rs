//! Render-time data scope.
//!
//! A [`Scope`] is an immutable chain of frames over JSON data. Sections that
//! descend into data (`{{#person}}`, `{{#each items}}`) push a frame; lookups
//! walk the chain innermost-first. Every frame of one top-level render shares
//! a single [`TemplateContext`] holding the partials, the `view`
//! self-reference and a few special variables.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use compact_str::CompactString;
use dashmap::DashMap;
use serde_json::Value;

use crate::view::View;

/// State shared by every frame of one top-level render
#[derive(Default)]
pub struct TemplateContext {
    partials: DashMap<CompactString, View>,
    view: RwLock<Option<View>>,
    filename: RwLock<Option<CompactString>>,
    line_number: AtomicU32,
    vars: DashMap<CompactString, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partial(&self, name: &str) -> Option<View> {
        self.partials.get(name).map(|view| view.clone())
    }

    pub fn set_partial(&self, name: impl Into<CompactString>, view: View) {
        self.partials.insert(name.into(), view);
    }

    /// The view currently rendering, reachable as `{{>scope.view}}`.
    pub fn view(&self) -> Option<View> {
        self.view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current view, returning the previous one.
    pub fn replace_view(&self, view: Option<View>) -> Option<View> {
        let mut slot = self.view.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, view)
    }

    pub fn filename(&self) -> Option<CompactString> {
        self.filename
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace_filename(&self, filename: Option<CompactString>) -> Option<CompactString> {
        let mut slot = self
            .filename
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, filename)
    }

    /// Line of the tag or attribute handler currently running.
    pub fn line_number(&self) -> u32 {
        self.line_number.load(Ordering::Relaxed)
    }

    pub fn set_line_number(&self, line: u32) {
        self.line_number.store(line, Ordering::Relaxed);
    }

    /// A `scope.vars.*` variable.
    pub fn var(&self, name: &str) -> Option<Value> {
        self.vars.get(name).map(|value| value.clone())
    }

    pub fn set_var(&self, name: impl Into<CompactString>, value: Value) {
        self.vars.insert(name.into(), value);
    }
}

impl fmt::Debug for TemplateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let partials: Vec<CompactString> =
            self.partials.iter().map(|entry| entry.key().clone()).collect();
        f.debug_struct("TemplateContext")
            .field("partials", &partials)
            .field("filename", &self.filename())
            .field("line_number", &self.line_number())
            .finish_non_exhaustive()
    }
}

struct Frame {
    data: Value,
    parent: Option<Scope>,
    /// Position when this frame is one item of an iterated list or object
    index: Option<usize>,
    key: Option<CompactString>,
    context: Arc<TemplateContext>,
}

/// A chain of data frames
#[derive(Clone)]
pub struct Scope(Arc<Frame>);

impl Scope {
    /// Root scope with a fresh template context.
    pub fn new(data: impl Into<Value>) -> Self {
        Self::with_context(data, Arc::new(TemplateContext::new()))
    }

    pub fn with_context(data: impl Into<Value>, context: Arc<TemplateContext>) -> Self {
        Self(Arc::new(Frame {
            data: data.into(),
            parent: None,
            index: None,
            key: None,
            context,
        }))
    }

    /// Push a frame for `data`.
    pub fn add(&self, data: impl Into<Value>) -> Self {
        self.child(data.into(), None, None)
    }

    /// Push a frame for one item of an iteration.
    pub fn add_item(&self, data: Value, index: usize, key: Option<&str>) -> Self {
        self.child(data, Some(index), key.map(CompactString::from))
    }

    fn child(&self, data: Value, index: Option<usize>, key: Option<CompactString>) -> Self {
        Self(Arc::new(Frame {
            data,
            parent: Some(self.clone()),
            index,
            key,
            context: Arc::clone(&self.0.context),
        }))
    }

    pub fn data(&self) -> &Value {
        &self.0.data
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    pub fn template_context(&self) -> &Arc<TemplateContext> {
        &self.0.context
    }

    /// Frames from this one outwards.
    pub fn frames(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }

    /// Index of the nearest iterated frame.
    pub fn index(&self) -> Option<usize> {
        self.frames().find_map(|scope| scope.0.index)
    }

    /// Key of the nearest frame iterated from an object.
    pub fn key(&self) -> Option<&str> {
        self.frames().find_map(|scope| scope.0.key.as_deref())
    }

    /// Resolve a key path.
    ///
    /// Plain paths are looked up innermost frame first; `this.x` and `./x`
    /// only read the current frame; every `../` starts one frame further out.
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = path.trim();
        match path {
            "this" | "." => return Some(self.data().clone()),
            "@index" | "scope.index" => return self.index().map(Value::from),
            "@key" | "scope.key" => return self.key().map(Value::from),
            "scope.filename" => {
                return self
                    .template_context()
                    .filename()
                    .map(|filename| Value::from(filename.as_str()))
            }
            "scope.lineNumber" => return Some(Value::from(self.template_context().line_number())),
            _ => {}
        }
        if let Some(name) = path.strip_prefix("scope.vars.") {
            return self.template_context().var(name);
        }
        if path.starts_with("scope.") {
            return None;
        }

        let mut scope = self;
        let mut rest = path;
        while let Some(stripped) = rest.strip_prefix("../") {
            scope = scope.parent()?;
            rest = stripped;
        }
        if rest == ".." {
            return scope.parent().map(|parent| parent.data().clone());
        }
        if let Some(local) = rest
            .strip_prefix("this.")
            .or_else(|| rest.strip_prefix("./"))
        {
            return descend(scope.data(), local).cloned();
        }

        let (head, tail) = match rest.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        let found = scope.frames().find_map(|frame| child(frame.data(), head))?;
        match tail {
            Some(tail) => descend(found, tail).cloned(),
            None => Some(found.clone()),
        }
    }
}

impl From<Value> for Scope {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("data", self.data())
            .field("depth", &self.frames().count())
            .finish()
    }
}

fn child<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn descend<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |value, segment| child(value, segment))
}
