//! Value helpers callable from expressions.

use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::is_truthy;
use crate::scope::Scope;

/// Evaluated arguments of one helper call
pub struct HelperArgs<'a> {
    pub name: &'a str,
    pub args: &'a [Value],
    pub hash: &'a FxHashMap<CompactString, Value>,
    pub scope: &'a Scope,
}

impl HelperArgs<'_> {
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&Value::Null)
    }
}

/// A value helper such as `{{eq a b}}`.
///
/// Errors are reported at render time as `HelperFailed`.
pub trait Helper: Send + Sync {
    fn call(&self, args: &HelperArgs<'_>) -> Result<Value, String>;
}

impl<F> Helper for F
where
    F: Fn(&HelperArgs<'_>) -> Result<Value, String> + Send + Sync,
{
    fn call(&self, args: &HelperArgs<'_>) -> Result<Value, String> {
        self(args)
    }
}

pub(super) fn builtin_helpers() -> [(&'static str, Arc<dyn Helper>); 7] {
    [
        ("eq", Arc::new(eq)),
        ("is", Arc::new(eq)),
        ("not", Arc::new(not)),
        ("and", Arc::new(and)),
        ("or", Arc::new(or)),
        ("if", Arc::new(if_value)),
        ("unless", Arc::new(unless_value)),
    ]
}

fn eq(args: &HelperArgs<'_>) -> Result<Value, String> {
    if args.args.len() < 2 {
        return Err(format!("`{}` needs at least two arguments", args.name));
    }
    let first = &args.args[0];
    Ok(Value::Bool(args.args[1..].iter().all(|other| other == first)))
}

fn not(args: &HelperArgs<'_>) -> Result<Value, String> {
    Ok(Value::Bool(!is_truthy(args.arg(0))))
}

fn and(args: &HelperArgs<'_>) -> Result<Value, String> {
    Ok(Value::Bool(args.args.iter().all(is_truthy)))
}

fn or(args: &HelperArgs<'_>) -> Result<Value, String> {
    Ok(Value::Bool(args.args.iter().any(is_truthy)))
}

/// `{{if cond a b}}` in value position.
fn if_value(args: &HelperArgs<'_>) -> Result<Value, String> {
    let pick = if is_truthy(args.arg(0)) { 1 } else { 2 };
    Ok(args.arg(pick).clone())
}

fn unless_value(args: &HelperArgs<'_>) -> Result<Value, String> {
    let pick = if is_truthy(args.arg(0)) { 2 } else { 1 };
    Ok(args.arg(pick).clone())
}
