//! VDL fragment parser.
//!
//! A fragment is a sequence of parenthesised forms:
//!
//! ```text
//! (type "struct point" "")
//! (agg name="pt" id="pt" open
//!   (val name="x" type="int" value="1" assign="pt.x=")
//!   (val name="next" type="struct point *" value="0x0"
//!     (deref id="pt.next" expr="*pt.next")))
//! ```
//!
//! [`parse`] turns a fragment into a flat, ordered list of [`VdlEvent`]s.
//! The target of a `deref` form is not flattened into the outer stream;
//! it is validated and handed over as raw text so the tree builder can
//! parse it recursively against the pointer node.

use tracing::trace;

use crate::error::VdlError;

/// Deepest form nesting accepted in one fragment, counting forms inside
/// deref targets.
pub const MAX_NESTING: usize = 128;

/// Pointer dereference directive attached to a simple value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerefDirective {
    /// Backend correlation id for the pointer target.
    pub id: Option<String>,
    /// Expression that dereferences the pointer.
    pub expr: Option<String>,
    /// VDL fragment describing the target; empty when not yet chased.
    pub target: String,
}

/// A scalar or pointer value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleValue {
    pub name: String,
    pub deref_id: Option<String>,
    pub type_name: String,
    pub array_type: String,
    pub is_static: bool,
    pub value: String,
    pub assign_template: Option<String>,
    pub deref: Option<DerefDirective>,
    pub hint: Option<String>,
    pub delta: bool,
}

/// Opening bracket of a struct, class, union or array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStart {
    pub name: String,
    pub deref_id: Option<String>,
    pub type_name: String,
    pub array_type: String,
    pub is_static: bool,
    pub delta: bool,
    /// Backend hint that the aggregate should be shown expanded.
    pub open: bool,
}

/// Structural events, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VdlEvent {
    SetLeaf(bool),
    SetType {
        type_name: String,
        array_type: String,
    },
    SetJava(bool),
    SetDelta(bool),
    SimpleValue(SimpleValue),
    StartAggregate(AggregateStart),
    EndAggregate,
}

/// Parse one VDL fragment into its event sequence.
///
/// # Errors
///
/// Returns [`VdlError::Parse`] for unbalanced parentheses, unterminated
/// strings, unknown form heads, malformed booleans or forms nested deeper
/// than [`MAX_NESTING`]. Nothing is emitted for a fragment that fails
/// anywhere, including inside a deref target.
pub fn parse(fragment: &str) -> Result<Vec<VdlEvent>, VdlError> {
    let mut parser = Parser {
        lexer: Lexer::new(fragment),
        events: Vec::new(),
        depth: 0,
    };
    parser.parse_forms()?;
    let (offset, tok) = parser.lexer.next_token()?;
    if tok != Token::Eof {
        return Err(parse_error(offset, "unbalanced ')'"));
    }
    trace!(events = parser.events.len(), "parsed VDL fragment");
    Ok(parser.events)
}

// ── lexer ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Equals,
    Word(String),
    Str(String),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Open => "'('".to_string(),
            Token::Close => "')'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Word(w) => format!("`{w}`"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '=' | '"' | ';')
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_trivia(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b';' => {
                    while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Consume the next token, returning its start offset.
    fn next_token(&mut self) -> Result<(usize, Token), VdlError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(ch) = self.src[start..].chars().next() else {
            return Ok((start, Token::Eof));
        };
        let tok = match ch {
            '(' => {
                self.pos += 1;
                Token::Open
            }
            ')' => {
                self.pos += 1;
                Token::Close
            }
            '=' => {
                self.pos += 1;
                Token::Equals
            }
            '"' => Token::Str(self.lex_string(start)?),
            _ => {
                let len = self.src[start..]
                    .find(|c: char| !is_word_char(c))
                    .unwrap_or(self.src.len() - start);
                self.pos = start + len;
                Token::Word(self.src[start..self.pos].to_string())
            }
        };
        Ok((start, tok))
    }

    fn peek(&self) -> Result<(usize, Token), VdlError> {
        self.clone().next_token()
    }

    fn lex_string(&mut self, start: usize) -> Result<String, VdlError> {
        let body = &self.src[start + 1..];
        let mut out = String::new();
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos = start + 1 + i + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                _ => out.push(c),
            }
        }
        Err(parse_error(start, "unterminated string"))
    }
}

// ── parser ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Attrs {
    entries: Vec<(usize, String, String)>,
}

impl Attrs {
    fn text(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(_, k, _)| k == key)
            .map(|(_, _, v)| v.as_str())
    }

    fn owned(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_string)
    }

    fn flag(&self, key: &str) -> Result<bool, VdlError> {
        match self.entries.iter().rev().find(|(_, k, _)| k == key) {
            None => Ok(false),
            Some((offset, _, v)) => parse_bool(*offset, v),
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    events: Vec<VdlEvent>,
    depth: usize,
}

impl Parser<'_> {
    /// Parse forms until `)` or end of input, leaving the terminator unread.
    fn parse_forms(&mut self) -> Result<(), VdlError> {
        loop {
            let (offset, tok) = self.lexer.peek()?;
            match tok {
                Token::Open => {
                    if self.depth == MAX_NESTING {
                        return Err(parse_error(offset, "nesting too deep"));
                    }
                    self.lexer.next_token()?;
                    self.depth += 1;
                    self.parse_form(offset)?;
                    self.depth -= 1;
                }
                Token::Close | Token::Eof => return Ok(()),
                other => {
                    return Err(parse_error(
                        offset,
                        format!("expected '(' but found {}", other.describe()),
                    ))
                }
            }
        }
    }

    fn parse_form(&mut self, open: usize) -> Result<(), VdlError> {
        let (offset, head) = self.lexer.next_token()?;
        let Token::Word(head) = head else {
            return Err(parse_error(
                offset,
                format!("expected form name but found {}", head.describe()),
            ));
        };
        match head.as_str() {
            "leaf" => {
                let b = self.expect_bool()?;
                self.expect_close(open)?;
                self.events.push(VdlEvent::SetLeaf(b));
            }
            "java" => {
                let b = self.expect_bool()?;
                self.expect_close(open)?;
                self.events.push(VdlEvent::SetJava(b));
            }
            "delta" => {
                let b = self.expect_bool()?;
                self.expect_close(open)?;
                self.events.push(VdlEvent::SetDelta(b));
            }
            "type" => {
                let type_name = self.expect_text()?;
                let array_type = self.expect_text()?;
                self.expect_close(open)?;
                self.events.push(VdlEvent::SetType {
                    type_name,
                    array_type,
                });
            }
            "val" => self.parse_value(open)?,
            "agg" => self.parse_aggregate(open)?,
            other => return Err(parse_error(offset, format!("unknown form `{other}`"))),
        }
        Ok(())
    }

    fn parse_attrs(&mut self) -> Result<Attrs, VdlError> {
        let mut attrs = Attrs::default();
        loop {
            let (offset, tok) = self.lexer.peek()?;
            let Token::Word(key) = tok else {
                return Ok(attrs);
            };
            self.lexer.next_token()?;
            if self.lexer.peek()?.1 == Token::Equals {
                self.lexer.next_token()?;
                let (value_offset, value) = self.lexer.next_token()?;
                let value = match value {
                    Token::Str(s) | Token::Word(s) => s,
                    other => {
                        return Err(parse_error(
                            value_offset,
                            format!("expected value for `{key}` but found {}", other.describe()),
                        ))
                    }
                };
                attrs.entries.push((offset, key, value));
            } else {
                attrs.entries.push((offset, key, "true".to_string()));
            }
        }
    }

    fn parse_value(&mut self, open: usize) -> Result<(), VdlError> {
        let attrs = self.parse_attrs()?;
        let mut deref = None;
        loop {
            let (offset, tok) = self.lexer.next_token()?;
            match tok {
                Token::Close => break,
                Token::Open => {
                    let (head_offset, head) = self.lexer.next_token()?;
                    if head != Token::Word("deref".to_string()) {
                        return Err(parse_error(
                            head_offset,
                            format!("expected `deref` inside `val` but found {}", head.describe()),
                        ));
                    }
                    if deref.is_some() {
                        return Err(parse_error(offset, "duplicate deref directive"));
                    }
                    deref = Some(self.parse_deref(offset)?);
                }
                Token::Eof => return Err(parse_error(open, "unclosed `val` form")),
                other => {
                    return Err(parse_error(
                        offset,
                        format!("unexpected {} in `val` form", other.describe()),
                    ))
                }
            }
        }

        self.events.push(VdlEvent::SimpleValue(SimpleValue {
            name: attrs.owned("name").unwrap_or_default(),
            deref_id: attrs.owned("id"),
            type_name: attrs.owned("type").unwrap_or_default(),
            array_type: attrs.owned("atype").unwrap_or_default(),
            is_static: attrs.flag("static")?,
            value: attrs.owned("value").unwrap_or_default(),
            assign_template: attrs.owned("assign"),
            deref,
            hint: attrs.owned("hint"),
            delta: attrs.flag("delta")?,
        }));
        Ok(())
    }

    fn parse_deref(&mut self, open: usize) -> Result<DerefDirective, VdlError> {
        let attrs = self.parse_attrs()?;
        let start = self.lexer.pos;

        // The target is validated here but its events are discarded; the
        // builder re-parses the text against the pointer node.
        let outer = std::mem::take(&mut self.events);
        let nested = self.parse_forms();
        let target_events = std::mem::replace(&mut self.events, outer);
        nested?;

        let (end, tok) = self.lexer.next_token()?;
        if tok != Token::Close {
            return Err(parse_error(open, "unclosed `deref` form"));
        }
        trace!(events = target_events.len(), "validated deref target");
        Ok(DerefDirective {
            id: attrs.owned("id"),
            expr: attrs.owned("expr"),
            target: self.lexer.src[start..end].trim().to_string(),
        })
    }

    fn parse_aggregate(&mut self, open: usize) -> Result<(), VdlError> {
        let attrs = self.parse_attrs()?;
        self.events.push(VdlEvent::StartAggregate(AggregateStart {
            name: attrs.owned("name").unwrap_or_default(),
            deref_id: attrs.owned("id"),
            type_name: attrs.owned("type").unwrap_or_default(),
            array_type: attrs.owned("atype").unwrap_or_default(),
            is_static: attrs.flag("static")?,
            delta: attrs.flag("delta")?,
            open: attrs.flag("open")?,
        }));
        self.parse_forms()?;
        match self.lexer.next_token()?.1 {
            Token::Close => {
                self.events.push(VdlEvent::EndAggregate);
                Ok(())
            }
            _ => Err(parse_error(open, "unclosed `agg` form")),
        }
    }

    fn expect_bool(&mut self) -> Result<bool, VdlError> {
        let (offset, tok) = self.lexer.next_token()?;
        match tok {
            Token::Word(w) => parse_bool(offset, &w),
            other => Err(parse_error(
                offset,
                format!("expected boolean but found {}", other.describe()),
            )),
        }
    }

    fn expect_text(&mut self) -> Result<String, VdlError> {
        let (offset, tok) = self.lexer.next_token()?;
        match tok {
            Token::Str(s) | Token::Word(s) => Ok(s),
            other => Err(parse_error(
                offset,
                format!("expected text but found {}", other.describe()),
            )),
        }
    }

    fn expect_close(&mut self, open: usize) -> Result<(), VdlError> {
        let (offset, tok) = self.lexer.next_token()?;
        match tok {
            Token::Close => Ok(()),
            Token::Eof => Err(parse_error(open, "unclosed form")),
            other => Err(parse_error(
                offset,
                format!("expected ')' but found {}", other.describe()),
            )),
        }
    }
}

fn parse_bool(offset: usize, text: &str) -> Result<bool, VdlError> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(parse_error(
            offset,
            format!("expected true or false but found `{other}`"),
        )),
    }
}

fn parse_error(offset: usize, message: impl Into<String>) -> VdlError {
    VdlError::Parse {
        offset,
        message: message.into(),
    }
}
