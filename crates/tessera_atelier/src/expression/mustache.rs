//! Default expression grammar.
//!
//! ```text
//! expression := item | name item* (key=item)*
//! item       := literal | path | "(" expression ")"
//! literal    := "str" | 'str' | number | true | false | null | undefined
//! ```
//!
//! A bare path reads a value. A path followed by arguments calls a helper;
//! `if`, `unless`, `each` and `with` are understood natively as section
//! heads.

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;
use tessera_relief::{CompileError, ErrorCode, Mode, RenderError, RenderResult};

use super::helpers::{builtin_helpers, Helper, HelperArgs};
use super::{is_truthy, Branch, Expression, ExpressionFactory};
use crate::renderer::RenderState;
use crate::scope::Scope;

type Helpers = Arc<DashMap<CompactString, Arc<dyn Helper>>>;

static GLOBAL: Lazy<Arc<MustacheExpressions>> = Lazy::new(|| Arc::new(MustacheExpressions::new()));

/// Mustache-style expression factory with a helper table
pub struct MustacheExpressions {
    helpers: Helpers,
}

impl MustacheExpressions {
    pub fn new() -> Self {
        let helpers = DashMap::new();
        for (name, helper) in builtin_helpers() {
            helpers.insert(CompactString::from(name), helper);
        }
        Self {
            helpers: Arc::new(helpers),
        }
    }

    /// Shared factory whose helpers every default compile sees.
    pub fn global() -> Arc<MustacheExpressions> {
        Arc::clone(&GLOBAL)
    }

    /// Register (or replace) a value helper.
    ///
    /// Helpers resolve at render time, so registering after compiling works.
    pub fn register_helper(&self, name: impl Into<CompactString>, helper: impl Helper + 'static) {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }
}

impl Default for MustacheExpressions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MustacheExpressions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MustacheExpressions")
            .field("helpers", &self.helpers.len())
            .finish()
    }
}

impl ExpressionFactory for MustacheExpressions {
    fn compile(
        &self,
        mode: Mode,
        expression: &str,
        state: &RenderState,
    ) -> Result<Arc<dyn Expression>, CompileError> {
        let expr = parse(expression).map_err(|reason| {
            CompileError::new(ErrorCode::InvalidExpression, state.line)
                .with_detail(format!("`{expression}` ({reason})"))
                .with_filename(state.filename.as_deref())
        })?;
        Ok(Arc::new(MustacheExpression {
            source: expression.into(),
            expr,
            inverted: mode == Mode::Inverse,
            line: state.line,
            helpers: Arc::clone(&self.helpers),
        }))
    }
}

// ========== Syntax ==========

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Lookup(CompactString),
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    name: CompactString,
    args: Vec<Expr>,
    hash: Vec<(CompactString, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'s> {
    Literal(Value),
    Word(&'s str),
    Eq,
    Open,
    Close,
}

fn lex(source: &str) -> Result<Vec<Token<'_>>, String> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            b'=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            b'"' | b'\'' => {
                let (text, next) = lex_string(source, i + 1, c)?;
                tokens.push(Token::Literal(Value::String(text)));
                i = next;
            }
            _ => {
                let start = i;
                while i < bytes.len()
                    && !matches!(
                        bytes[i],
                        b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'=' | b'"' | b'\''
                    )
                {
                    i += 1;
                }
                tokens.push(word_token(&source[start..i]));
            }
        }
    }

    Ok(tokens)
}

fn lex_string(source: &str, start: usize, quote: u8) -> Result<(String, usize), String> {
    let mut text = String::new();
    let mut chars = source[start..].char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c if c as u32 == quote as u32 => return Ok((text, start + offset + 1)),
            c => text.push(c),
        }
    }
    Err("unterminated string".into())
}

fn word_token(word: &str) -> Token<'_> {
    match word {
        "true" => Token::Literal(Value::Bool(true)),
        "false" => Token::Literal(Value::Bool(false)),
        "null" | "undefined" => Token::Literal(Value::Null),
        _ if looks_numeric(word) => match serde_json::from_str::<Value>(word) {
            Ok(number @ Value::Number(_)) => Token::Literal(number),
            _ => Token::Word(word),
        },
        _ => Token::Word(word),
    }
}

fn looks_numeric(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

fn parse(source: &str) -> Result<Expr, String> {
    let tokens = lex(source)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.sequence()?;
    if parser.pos < parser.tokens.len() {
        return Err("unexpected `)`".into());
    }
    Ok(expr)
}

struct ExprParser<'s> {
    tokens: Vec<Token<'s>>,
    pos: usize,
}

impl<'s> ExprParser<'s> {
    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token<'s>> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Items up to the end of input or a closing paren.
    fn sequence(&mut self) -> Result<Expr, String> {
        let mut items = Vec::new();
        let mut hash = Vec::new();

        while let Some(token) = self.peek() {
            if *token == Token::Close {
                break;
            }
            if let (Some(Token::Word(key)), Some(Token::Eq)) =
                (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
            {
                let key = CompactString::from(*key);
                self.pos += 2;
                let value = self.item()?;
                hash.push((key, value));
                continue;
            }
            if !hash.is_empty() {
                return Err("positional argument after a key=value argument".into());
            }
            items.push(self.item()?);
        }

        let mut items = items.into_iter();
        let Some(head) = items.next() else {
            return Err("empty expression".into());
        };
        let args: Vec<Expr> = items.collect();
        if args.is_empty() && hash.is_empty() {
            return Ok(head);
        }
        match head {
            Expr::Lookup(name) => Ok(Expr::Call(Call { name, args, hash })),
            _ => Err("only a helper name can take arguments".into()),
        }
    }

    fn item(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Word(word)) => Ok(Expr::Lookup(word.into())),
            Some(Token::Open) => {
                let inner = self.sequence()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err("missing `)`".into()),
                }
            }
            Some(Token::Eq) => Err("unexpected `=`".into()),
            Some(Token::Close) | None => Err("missing argument".into()),
        }
    }
}

// ========== Evaluation ==========

struct MustacheExpression {
    source: CompactString,
    expr: Expr,
    inverted: bool,
    line: u32,
    helpers: Helpers,
}

impl fmt::Debug for MustacheExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MustacheExpression")
            .field("source", &self.source)
            .field("inverted", &self.inverted)
            .field("line", &self.line)
            .finish()
    }
}

impl MustacheExpression {
    fn eval(&self, expr: &Expr, scope: &Scope) -> RenderResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Lookup(path) => Ok(scope.get(path).unwrap_or(Value::Null)),
            Expr::Call(call) => self.call(call, scope),
        }
    }

    fn first_arg(&self, call: &Call, scope: &Scope) -> RenderResult<Value> {
        match call.args.first() {
            Some(arg) => self.eval(arg, scope),
            None => Ok(Value::Null),
        }
    }

    fn call(&self, call: &Call, scope: &Scope) -> RenderResult<Value> {
        let Some(helper) = self
            .helpers
            .get(call.name.as_str())
            .map(|entry| Arc::clone(entry.value()))
        else {
            if matches!(call.name.as_str(), "each" | "with") {
                return Err(RenderError::HelperFailed {
                    name: call.name.to_string(),
                    line: self.line,
                    message: "can only be used as a section".into(),
                });
            }
            return Err(RenderError::UnknownHelper {
                name: call.name.to_string(),
                line: self.line,
            });
        };

        let args = call
            .args
            .iter()
            .map(|arg| self.eval(arg, scope))
            .collect::<RenderResult<Vec<_>>>()?;
        let mut hash = FxHashMap::default();
        for (key, value) in &call.hash {
            hash.insert(key.clone(), self.eval(value, scope)?);
        }

        helper
            .call(&HelperArgs {
                name: &call.name,
                args: &args,
                hash: &hash,
                scope,
            })
            .map_err(|message| RenderError::HelperFailed {
                name: call.name.to_string(),
                line: self.line,
                message,
            })
    }

    fn primary_branch(&self, scope: &Scope) -> RenderResult<Branch> {
        if let Expr::Call(call) = &self.expr {
            match call.name.as_str() {
                "if" => {
                    let cond = self.first_arg(call, scope)?;
                    return Ok(if is_truthy(&cond) {
                        Branch::once(scope)
                    } else {
                        Branch::Inverse
                    });
                }
                "unless" => {
                    let cond = self.first_arg(call, scope)?;
                    return Ok(if is_truthy(&cond) {
                        Branch::Inverse
                    } else {
                        Branch::once(scope)
                    });
                }
                "each" => {
                    let items = self.first_arg(call, scope)?;
                    return Ok(iterate(scope, items));
                }
                "with" => {
                    let context = self.first_arg(call, scope)?;
                    return Ok(if is_truthy(&context) {
                        Branch::once(&scope.add(context))
                    } else {
                        Branch::Inverse
                    });
                }
                _ => {}
            }
        }
        let value = self.eval(&self.expr, scope)?;
        Ok(section_for_value(scope, value))
    }
}

impl Expression for MustacheExpression {
    fn value(&self, scope: &Scope) -> RenderResult<Value> {
        self.eval(&self.expr, scope)
    }

    fn branch(&self, scope: &Scope) -> RenderResult<Branch> {
        let branch = self.primary_branch(scope)?;
        if !self.inverted {
            return Ok(branch);
        }
        Ok(match branch {
            Branch::Primary(_) => Branch::Inverse,
            Branch::Inverse => Branch::once(scope),
        })
    }

    fn closing_tag(&self) -> &str {
        match &self.expr {
            Expr::Call(call) => &call.name,
            Expr::Lookup(path) => path,
            Expr::Literal(_) => "",
        }
    }
}

/// Plain-key section semantics: lists iterate, objects push a frame.
fn section_for_value(scope: &Scope, value: Value) -> Branch {
    match value {
        Value::Array(_) => iterate(scope, value),
        Value::Object(_) => Branch::once(&scope.add(value)),
        other if is_truthy(&other) => Branch::once(scope),
        _ => Branch::Inverse,
    }
}

/// One frame per item; objects iterate their values with `@key` set.
fn iterate(scope: &Scope, items: Value) -> Branch {
    let scopes: SmallVec<[Scope; 1]> = match items {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| scope.add_item(item, index, None))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .enumerate()
            .map(|(index, (key, item))| scope.add_item(item, index, Some(&key)))
            .collect(),
        other if is_truthy(&other) => return Branch::once(&scope.add(other)),
        _ => return Branch::Inverse,
    };
    if scopes.is_empty() {
        Branch::Inverse
    } else {
        Branch::Primary(scopes)
    }
}
