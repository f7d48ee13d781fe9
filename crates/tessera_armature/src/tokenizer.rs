//! Markup tokenizer for Tessera templates.
//!
//! A byte-level state machine in the style of htmlparser2. Template markers
//! (`{{...}}` and `{{{...}}}`) are recognized in text, between attributes,
//! inside attribute values and inside text-only elements such as `<style>`.
//!
//! Event order for `<a href="x">y</a>` is `start`, `attr_start`,
//! `attr_value`, `attr_end`, `end`, `chars`, `close`. Void and self-closing
//! elements get `start`/`end` with `unary = true` and never a `close`.

use memchr::memmem;
use tessera_carton::{is_text_content_only_tag, is_void_tag};

/// Character codes for fast comparison
pub mod char_codes {
    pub const TAB: u8 = 0x09;
    pub const NEWLINE: u8 = 0x0A;
    pub const FORM_FEED: u8 = 0x0C;
    pub const CARRIAGE_RETURN: u8 = 0x0D;
    pub const SPACE: u8 = 0x20;
    pub const EXCLAMATION_MARK: u8 = 0x21;
    pub const DOUBLE_QUOTE: u8 = 0x22;
    pub const SINGLE_QUOTE: u8 = 0x27;
    pub const DASH: u8 = 0x2D;
    pub const SLASH: u8 = 0x2F;
    pub const LT: u8 = 0x3C;
    pub const EQ: u8 = 0x3D;
    pub const GT: u8 = 0x3E;
    pub const QUESTION_MARK: u8 = 0x3F;
    pub const UPPER_A: u8 = 0x41;
    pub const UPPER_Z: u8 = 0x5A;
    pub const LOWER_A: u8 = 0x61;
    pub const LOWER_Z: u8 = 0x7A;
    pub const LEFT_BRACE: u8 = 0x7B;
}

use char_codes::*;

/// All the states the tokenizer can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Text = 1,

    // Tags
    BeforeTagName,
    InTagName,
    BeforeClosingTagName,
    InClosingTagName,
    AfterClosingTagName,

    // Attributes
    BeforeAttrName,
    InAttrName,
    AfterAttrName,
    BeforeAttrValue,
    InAttrValueDq,
    InAttrValueSq,
    InAttrValueNq,

    // Declarations and processing instructions
    InDeclaration,

    // Children of text-only elements (style, script)
    InRawText,
}

/// Handler table driven by the tokenizer.
///
/// Every event carries the 1-based line it starts on. Returning an error
/// stops tokenizing immediately.
pub trait Handler {
    type Error;

    fn start(&mut self, tag: &str, unary: bool, line: u32) -> Result<(), Self::Error>;
    fn end(&mut self, tag: &str, unary: bool, line: u32) -> Result<(), Self::Error>;
    fn close(&mut self, tag: &str, line: u32) -> Result<(), Self::Error>;

    fn attr_start(&mut self, name: &str, line: u32) -> Result<(), Self::Error>;
    fn attr_value(&mut self, value: &str, line: u32) -> Result<(), Self::Error>;
    fn attr_end(&mut self, name: &str, line: u32) -> Result<(), Self::Error>;

    fn chars(&mut self, text: &str, line: u32) -> Result<(), Self::Error>;
    /// A template marker; `text` is everything between `{{` and `}}`
    fn special(&mut self, text: &str, line: u32) -> Result<(), Self::Error>;
    fn comment(&mut self, text: &str, line: u32) -> Result<(), Self::Error>;

    fn done(&mut self, _line: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Check if character is a tag start character (a-z, A-Z)
#[inline]
pub fn is_tag_start_char(c: u8) -> bool {
    (LOWER_A..=LOWER_Z).contains(&c) || (UPPER_A..=UPPER_Z).contains(&c)
}

/// Check if character is whitespace
#[inline]
pub fn is_whitespace(c: u8) -> bool {
    c == SPACE || c == NEWLINE || c == TAB || c == FORM_FEED || c == CARRIAGE_RETURN
}

/// Check if character ends a tag section
#[inline]
pub fn is_end_of_tag_section(c: u8) -> bool {
    c == SLASH || c == GT || is_whitespace(c)
}

/// Tokenize `source` into `handler`, returning the handler afterwards.
pub fn tokenize<H: Handler>(source: &str, handler: H) -> Result<H, H::Error> {
    let mut tokenizer = Tokenizer::new(source, handler);
    tokenizer.tokenize()?;
    Ok(tokenizer.into_handler())
}

/// Markup tokenizer
pub struct Tokenizer<'a, H: Handler> {
    /// Input source
    source: &'a str,
    input: &'a [u8],
    /// Current state
    state: State,
    /// Buffer start position
    section_start: usize,
    /// Current index
    index: usize,
    /// Newline positions for line calculation
    newlines: Vec<usize>,
    handler: H,
    /// Tag currently being opened
    current_tag: &'a str,
    current_unary: bool,
    /// Attribute currently being read
    current_attr: &'a str,
    /// Elements opened and not yet closed
    open_tags: Vec<&'a str>,
    /// Text-only element whose children are being read
    raw_text_tag: Option<&'a str>,
}

impl<'a, H: Handler> Tokenizer<'a, H> {
    pub fn new(source: &'a str, handler: H) -> Self {
        let input = source.as_bytes();
        Self {
            source,
            input,
            state: State::Text,
            section_start: 0,
            index: 0,
            newlines: memchr::memchr_iter(NEWLINE, input).collect(),
            handler,
            current_tag: "",
            current_unary: false,
            current_attr: "",
            open_tags: Vec::new(),
            raw_text_tag: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// 1-based line of a byte offset
    pub fn line_at(&self, index: usize) -> u32 {
        let line = match self.newlines.binary_search(&index) {
            Ok(i) => i + 1,
            Err(i) => i + 1,
        };
        line as u32
    }

    /// Tokenize the input
    pub fn tokenize(&mut self) -> Result<(), H::Error> {
        while self.index < self.input.len() {
            let c = self.input[self.index];

            match self.state {
                State::Text => self.state_text(c)?,
                State::BeforeTagName => self.state_before_tag_name(c)?,
                State::InTagName => self.state_in_tag_name(c)?,
                State::BeforeClosingTagName => self.state_before_closing_tag_name(c),
                State::InClosingTagName => self.state_in_closing_tag_name(c)?,
                State::AfterClosingTagName => self.state_after_closing_tag_name(c),
                State::BeforeAttrName => self.state_before_attr_name(c)?,
                State::InAttrName => self.state_in_attr_name(c)?,
                State::AfterAttrName => self.state_after_attr_name(c)?,
                State::BeforeAttrValue => self.state_before_attr_value(c)?,
                State::InAttrValueDq => self.state_in_attr_value_quoted(c, DOUBLE_QUOTE)?,
                State::InAttrValueSq => self.state_in_attr_value_quoted(c, SINGLE_QUOTE)?,
                State::InAttrValueNq => self.state_in_attr_value_nq(c)?,
                State::InDeclaration => self.state_in_declaration(c),
                State::InRawText => self.state_in_raw_text(c)?,
            }

            self.index += 1;
        }

        self.cleanup()
    }

    fn cleanup(&mut self) -> Result<(), H::Error> {
        if matches!(self.state, State::Text | State::InRawText) {
            self.flush_chars(self.input.len())?;
        }

        // Unclosed elements are closed innermost first
        let line = self.line_at(self.input.len());
        while let Some(tag) = self.open_tags.pop() {
            self.handler.close(tag, line)?;
        }
        self.handler.done(line)
    }

    // ========== Emit helpers ==========

    fn flush_chars(&mut self, end: usize) -> Result<(), H::Error> {
        if end > self.section_start {
            let line = self.line_at(self.section_start);
            self.handler
                .chars(&self.source[self.section_start..end], line)?;
        }
        self.section_start = end;
        Ok(())
    }

    fn flush_attr_value(&mut self, end: usize) -> Result<(), H::Error> {
        if end > self.section_start {
            let line = self.line_at(self.section_start);
            self.handler
                .attr_value(&self.source[self.section_start..end], line)?;
        }
        self.section_start = end;
        Ok(())
    }

    #[inline]
    fn at_marker(&self) -> bool {
        self.input[self.index..].starts_with(b"{{")
    }

    /// Emit the marker starting at the current index and resume in `resume`.
    ///
    /// Returns `false` (and consumes nothing) if the marker is never closed.
    fn emit_marker(&mut self, resume: State) -> Result<bool, H::Error> {
        let start = self.index;
        let triple = self.input[start..].starts_with(b"{{{");
        let (close, open_len): (&[u8], usize) = if triple { (b"}}}", 3) } else { (b"}}", 2) };
        let search_from = start + open_len;

        let Some(rel) = memmem::find(&self.input[search_from..], close) else {
            return Ok(false);
        };
        let end = search_from + rel;
        // Triple markers keep their inner braces so the mode reads as `{`
        let content = if triple {
            &self.source[start + 2..end + 1]
        } else {
            &self.source[start + 2..end]
        };
        let line = self.line_at(start);
        self.handler.special(content, line)?;

        let next = end + close.len();
        self.section_start = next;
        self.index = next - 1;
        self.state = resume;
        Ok(true)
    }

    /// Whether the tag opened at the current index ends with `/>`.
    fn is_self_closing_from(&self, from: usize) -> bool {
        let mut i = from;
        let mut quote: Option<u8> = None;
        while i < self.input.len() {
            let c = self.input[i];
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == DOUBLE_QUOTE || c == SINGLE_QUOTE => quote = Some(c),
                None if c == LEFT_BRACE && self.input[i..].starts_with(b"{{") => {
                    match memmem::find(&self.input[i + 2..], b"}}") {
                        Some(rel) => i += rel + 3,
                        None => return false,
                    }
                }
                None if c == GT => return i > 0 && self.input[i - 1] == SLASH,
                None => {}
            }
            i += 1;
        }
        false
    }

    fn finish_open_tag(&mut self) -> Result<(), H::Error> {
        let tag = self.current_tag;
        let unary = self.current_unary;
        let line = self.line_at(self.index);
        self.handler.end(tag, unary, line)?;

        self.section_start = self.index + 1;
        if unary {
            self.state = State::Text;
            return Ok(());
        }

        self.open_tags.push(tag);
        if is_text_content_only_tag(&tag.to_ascii_lowercase()) {
            self.raw_text_tag = Some(tag);
            self.state = State::InRawText;
        } else {
            self.state = State::Text;
        }
        Ok(())
    }

    fn close_tag(&mut self, name: &str) -> Result<(), H::Error> {
        let Some(pos) = self
            .open_tags
            .iter()
            .rposition(|t| t.eq_ignore_ascii_case(name))
        else {
            // Stray closing tag
            return Ok(());
        };

        let line = self.line_at(self.index);
        while self.open_tags.len() > pos {
            if let Some(tag) = self.open_tags.pop() {
                self.handler.close(tag, line)?;
            }
        }
        Ok(())
    }

    // ========== State handlers ==========

    fn state_text(&mut self, c: u8) -> Result<(), H::Error> {
        if c == LT {
            self.flush_chars(self.index)?;
            self.state = State::BeforeTagName;
            self.section_start = self.index;
        } else if c == LEFT_BRACE && self.at_marker() {
            self.flush_chars(self.index)?;
            self.emit_marker(State::Text)?;
        }
        Ok(())
    }

    fn state_before_tag_name(&mut self, c: u8) -> Result<(), H::Error> {
        if c == EXCLAMATION_MARK {
            if self.input[self.index + 1..].starts_with(b"--") {
                self.read_comment()?;
            } else {
                self.state = State::InDeclaration;
            }
        } else if c == QUESTION_MARK {
            self.state = State::InDeclaration;
        } else if is_tag_start_char(c) {
            self.section_start = self.index;
            self.state = State::InTagName;
        } else if c == SLASH {
            self.state = State::BeforeClosingTagName;
        } else {
            // A lone `<` is text; section_start still points at it
            self.state = State::Text;
            self.state_text(c)?;
        }
        Ok(())
    }

    fn read_comment(&mut self) -> Result<(), H::Error> {
        let content_start = self.index + 3;
        let line = self.line_at(self.index);
        match memmem::find(&self.input[content_start..], b"-->") {
            Some(rel) => {
                let end = content_start + rel;
                self.handler
                    .comment(&self.source[content_start..end], line)?;
                self.index = end + 2;
                self.section_start = end + 3;
            }
            None => {
                self.handler.comment(&self.source[content_start..], line)?;
                self.index = self.input.len() - 1;
                self.section_start = self.input.len();
            }
        }
        self.state = State::Text;
        Ok(())
    }

    fn state_in_tag_name(&mut self, c: u8) -> Result<(), H::Error> {
        if is_end_of_tag_section(c) || (c == LEFT_BRACE && self.at_marker()) {
            let tag = &self.source[self.section_start..self.index];
            let unary = is_void_tag(tag) || self.is_self_closing_from(self.index);
            self.current_tag = tag;
            self.current_unary = unary;

            let line = self.line_at(self.section_start);
            self.handler.start(tag, unary, line)?;

            self.section_start = self.index;
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c)?;
        }
        Ok(())
    }

    fn state_before_closing_tag_name(&mut self, c: u8) {
        if is_whitespace(c) {
            // Skip
        } else if c == GT {
            // `</>` is dropped
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else {
            self.state = State::InClosingTagName;
            self.section_start = self.index;
        }
    }

    fn state_in_closing_tag_name(&mut self, c: u8) -> Result<(), H::Error> {
        if c == GT || is_whitespace(c) {
            let name = &self.source[self.section_start..self.index];
            self.close_tag(name)?;
            self.section_start = self.index + 1;
            self.state = if c == GT {
                State::Text
            } else {
                State::AfterClosingTagName
            };
        }
        Ok(())
    }

    fn state_after_closing_tag_name(&mut self, c: u8) {
        if c == GT {
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_before_attr_name(&mut self, c: u8) -> Result<(), H::Error> {
        if c == GT {
            self.finish_open_tag()?;
        } else if c == LEFT_BRACE && self.at_marker() {
            self.emit_marker(State::BeforeAttrName)?;
        } else if c == SLASH || is_whitespace(c) {
            // Skip
        } else {
            self.state = State::InAttrName;
            self.section_start = self.index;
        }
        Ok(())
    }

    fn state_in_attr_name(&mut self, c: u8) -> Result<(), H::Error> {
        if c == EQ || is_end_of_tag_section(c) || (c == LEFT_BRACE && self.at_marker()) {
            let name = &self.source[self.section_start..self.index];
            let line = self.line_at(self.section_start);
            self.handler.attr_start(name, line)?;
            self.current_attr = name;

            self.section_start = self.index;
            self.state = State::AfterAttrName;
            self.state_after_attr_name(c)?;
        }
        Ok(())
    }

    fn end_attr(&mut self) -> Result<(), H::Error> {
        let line = self.line_at(self.index);
        self.handler.attr_end(self.current_attr, line)?;
        self.state = State::BeforeAttrName;
        Ok(())
    }

    fn state_after_attr_name(&mut self, c: u8) -> Result<(), H::Error> {
        if c == EQ {
            self.state = State::BeforeAttrValue;
        } else if !is_whitespace(c) {
            self.end_attr()?;
            self.state_before_attr_name(c)?;
        }
        Ok(())
    }

    fn state_before_attr_value(&mut self, c: u8) -> Result<(), H::Error> {
        if c == DOUBLE_QUOTE {
            self.state = State::InAttrValueDq;
            self.section_start = self.index + 1;
        } else if c == SINGLE_QUOTE {
            self.state = State::InAttrValueSq;
            self.section_start = self.index + 1;
        } else if c == GT {
            self.end_attr()?;
            self.state_before_attr_name(c)?;
        } else if !is_whitespace(c) {
            self.section_start = self.index;
            self.state = State::InAttrValueNq;
            self.state_in_attr_value_nq(c)?;
        }
        Ok(())
    }

    fn state_in_attr_value_quoted(&mut self, c: u8, quote: u8) -> Result<(), H::Error> {
        if c == quote {
            self.flush_attr_value(self.index)?;
            self.end_attr()?;
            self.section_start = self.index + 1;
        } else if c == LEFT_BRACE && self.at_marker() {
            self.flush_attr_value(self.index)?;
            let resume = self.state;
            self.emit_marker(resume)?;
        }
        Ok(())
    }

    fn state_in_attr_value_nq(&mut self, c: u8) -> Result<(), H::Error> {
        let self_closing = c == SLASH && self.input.get(self.index + 1) == Some(&GT);
        if is_whitespace(c) || c == GT || self_closing {
            self.flush_attr_value(self.index)?;
            self.end_attr()?;
            self.state_before_attr_name(c)?;
        } else if c == LEFT_BRACE && self.at_marker() {
            self.flush_attr_value(self.index)?;
            self.emit_marker(State::InAttrValueNq)?;
        }
        Ok(())
    }

    fn state_in_declaration(&mut self, c: u8) {
        if c == GT {
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_in_raw_text(&mut self, c: u8) -> Result<(), H::Error> {
        if c == LT && self.at_raw_text_end() {
            self.flush_chars(self.index)?;
            self.raw_text_tag = None;
            self.state = State::BeforeTagName;
            self.section_start = self.index;
        } else if c == LEFT_BRACE && self.at_marker() {
            self.flush_chars(self.index)?;
            self.emit_marker(State::InRawText)?;
        }
        Ok(())
    }

    /// Whether `</tag` closing the current text-only element starts here.
    fn at_raw_text_end(&self) -> bool {
        let Some(tag) = self.raw_text_tag else {
            return false;
        };
        let rest = &self.input[self.index..];
        if rest.len() < tag.len() + 2 || rest[1] != SLASH {
            return false;
        }
        if !rest[2..2 + tag.len()].eq_ignore_ascii_case(tag.as_bytes()) {
            return false;
        }
        rest.get(2 + tag.len())
            .map_or(true, |&c| c == GT || is_whitespace(c))
    }
}
