//! Token-aware global identifier rewriting.
//!
//! Renames free references to one identifier (the host bundler's global,
//! `window` by default) to the target's global binding. The scanner copies
//! string literals, template text, comments and regular expression
//! literals verbatim, and leaves property names alone: `a.window`,
//! `{ window: 1 }` and `this.#window` are not references to the global.

use crate::assembler::AssembleError;

/// Keywords after which a `/` starts a regular expression.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Keywords followed by a block rather than an object literal.
const BLOCK_KEYWORDS: &[&str] = &["else", "do", "try", "finally"];

/// Words that may precede a method or field name.
const MEMBER_MODIFIERS: &[&str] = &["get", "set", "static", "async"];

/// The previous significant token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    /// Member access (`.` or `?.`)
    Dot,
    /// Any other punctuator
    Punct(u8),
    /// Identifier; `true` for keywords that may precede an expression
    Ident(bool),
    /// Number, string, template or regex literal
    Literal,
}

impl Prev {
    fn allows_regex(self) -> bool {
        match self {
            Prev::Start => true,
            Prev::Punct(c) => !matches!(c, b')' | b']' | b'}'),
            Prev::Ident(keyword) => keyword,
            Prev::Dot | Prev::Literal => false,
        }
    }
}

/// What an open `{` started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Block,
    Object,
    Class,
    /// `${` inside a template literal
    Template,
}

/// What to do with one occurrence of the identifier.
enum Rewrite {
    Keep,
    Replace,
    /// Shorthand property: keep the key, rename the value
    Expand,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: String,
    /// Start of the not-yet-copied input
    copied: usize,
    prev: Prev,
    /// Text of the previous token when it is an identifier
    word: &'a str,
    /// Open braces, innermost last
    braces: Vec<Brace>,
    /// Open `(` and `[` count
    parens: usize,
    /// Paren depth of a `class` keyword still waiting for its body
    pending_class: Option<usize>,
}

/// Rewrite free references to `from` into `to`.
///
/// Fails on an unterminated string, template, comment or regex literal; the
/// caller keeps the original source in that case.
pub fn rewrite_global(src: &str, from: &str, to: &str) -> Result<String, AssembleError> {
    if from.is_empty() || from == to || !src.contains(from) {
        return Ok(src.to_string());
    }

    let mut scanner = Scanner {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        out: String::with_capacity(src.len()),
        copied: 0,
        prev: Prev::Start,
        word: "",
        braces: Vec::new(),
        parens: 0,
        pending_class: None,
    };
    scanner.run(from, to)?;
    scanner.flush(src.len());
    Ok(scanner.out)
}

impl<'a> Scanner<'a> {
    fn run(&mut self, from: &str, to: &str) -> Result<(), AssembleError> {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'/' if self.prev.allows_regex() => {
                    self.skip_regex()?;
                    self.prev = Prev::Literal;
                }
                b'\'' | b'"' => {
                    self.skip_string(b)?;
                    self.prev = Prev::Literal;
                }
                b'`' => {
                    self.pos += 1;
                    self.scan_template()?;
                }
                b'{' => {
                    let kind = self.open_brace_kind();
                    self.braces.push(kind);
                    self.punct(b);
                }
                b'}' => match self.braces.pop() {
                    Some(Brace::Template) => {
                        self.pos += 1;
                        self.scan_template()?;
                    }
                    // A statement ends here, so a following `/` starts a regex
                    Some(Brace::Block) | Some(Brace::Class) => {
                        self.pos += 1;
                        self.prev = Prev::Punct(b';');
                    }
                    Some(Brace::Object) | None => self.punct(b),
                },
                b'(' | b'[' => {
                    self.parens += 1;
                    self.punct(b);
                }
                b')' | b']' => {
                    self.parens = self.parens.saturating_sub(1);
                    self.punct(b);
                }
                b'.' if self.bytes[self.pos..].starts_with(b"...") => {
                    self.pos += 3;
                    self.prev = Prev::Punct(b'.');
                }
                b'.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.skip_number(),
                b'.' => {
                    self.pos += 1;
                    self.prev = Prev::Dot;
                }
                b'?' if self.peek(1) == Some(b'.')
                    && !self.peek(2).is_some_and(|c| c.is_ascii_digit()) =>
                {
                    self.pos += 2;
                    self.prev = Prev::Dot;
                }
                b'#' if self.peek(1).is_some_and(is_ident_start) => {
                    self.pos += 1;
                    self.word = self.take_ident();
                    self.prev = Prev::Ident(false);
                }
                b'0'..=b'9' => self.skip_number(),
                _ if is_ident_start(b) => self.identifier(from, to),
                _ => self.punct(b),
            }
        }

        if self.braces.contains(&Brace::Template) {
            return Err(self.unterminated("template literal", self.src.len()));
        }
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn punct(&mut self, b: u8) {
        self.pos += 1;
        self.prev = Prev::Punct(b);
    }

    /// Copy input up to `end` into the output.
    fn flush(&mut self, end: usize) {
        if end > self.copied {
            self.out.push_str(&self.src[self.copied..end]);
            self.copied = end;
        }
    }

    fn take_ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_ident_char(self.bytes[self.pos]) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Classify the `{` at the current position from the token before it.
    fn open_brace_kind(&mut self) -> Brace {
        if self.pending_class == Some(self.parens) {
            self.pending_class = None;
            return Brace::Class;
        }
        match self.prev {
            Prev::Start | Prev::Dot | Prev::Literal => Brace::Block,
            Prev::Punct(b')' | b';' | b'{' | b'}' | b'>') => Brace::Block,
            Prev::Punct(b':') => match self.braces.last() {
                Some(Brace::Object) | Some(Brace::Template) => Brace::Object,
                _ => Brace::Block,
            },
            Prev::Punct(_) => Brace::Object,
            Prev::Ident(_) if BLOCK_KEYWORDS.contains(&self.word) => Brace::Block,
            Prev::Ident(true) => Brace::Object,
            Prev::Ident(false) => Brace::Block,
        }
    }

    /// The enclosing object literal or class body, when the current token
    /// starts one of its members.
    fn member_start(&self) -> Option<Brace> {
        let kind = match self.braces.last() {
            Some(kind @ (Brace::Object | Brace::Class)) => *kind,
            _ => return None,
        };
        let at_start = match self.prev {
            Prev::Punct(b'{' | b',') => true,
            Prev::Punct(b';' | b'}') => kind == Brace::Class,
            Prev::Punct(b'*') => self.next_significant() == Some(b'('),
            Prev::Ident(_) => MEMBER_MODIFIERS.contains(&self.word),
            _ => false,
        };
        at_start.then_some(kind)
    }

    fn classify(&self) -> Rewrite {
        let after_separator = matches!(self.prev, Prev::Punct(b'{' | b','));
        match self.member_start() {
            // Method, accessor and field names
            Some(Brace::Class) => Rewrite::Keep,
            Some(_) => match self.next_significant() {
                Some(b':' | b'(') => Rewrite::Keep,
                Some(b',' | b'}' | b'=') if after_separator => Rewrite::Expand,
                _ => Rewrite::Replace,
            },
            // `{ window: ... }` in a brace taken for a block
            None if after_separator && self.next_significant() == Some(b':') => Rewrite::Keep,
            None => Rewrite::Replace,
        }
    }

    fn identifier(&mut self, from: &str, to: &str) {
        let start = self.pos;
        let ident = self.take_ident();

        if ident == from && self.prev != Prev::Dot {
            match self.classify() {
                Rewrite::Keep => {}
                Rewrite::Replace => {
                    self.flush(start);
                    self.out.push_str(to);
                    self.copied = self.pos;
                }
                Rewrite::Expand => {
                    self.flush(self.pos);
                    self.out.push_str(": ");
                    self.out.push_str(to);
                }
            }
        }

        if ident == "class" && self.prev != Prev::Dot && self.next_significant() != Some(b':') {
            self.pending_class = Some(self.parens);
        }

        self.prev = Prev::Ident(REGEX_PREFIX_KEYWORDS.contains(&ident));
        self.word = ident;
    }

    /// Next byte after the current position that is not whitespace or part
    /// of a comment.
    fn next_significant(&self) -> Option<u8> {
        let mut i = self.pos;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b' ' | b'\t' | b'\n' | b'\r' => i += 1,
                b'/' if self.bytes.get(i + 1) == Some(&b'/') => {
                    while i < self.bytes.len() && self.bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                b'/' if self.bytes.get(i + 1) == Some(&b'*') => {
                    match self.src[i + 2..].find("*/") {
                        Some(end) => i += end + 4,
                        None => return None,
                    }
                }
                b => return Some(b),
            }
        }
        None
    }

    fn skip_number(&mut self) {
        while self.pos < self.bytes.len()
            && (is_ident_char(self.bytes[self.pos]) || self.bytes[self.pos] == b'.')
        {
            self.pos += 1;
        }
        self.prev = Prev::Literal;
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), AssembleError> {
        let start = self.pos;
        match self.src[self.pos + 2..].find("*/") {
            Some(end) => {
                self.pos += end + 4;
                Ok(())
            }
            None => Err(self.unterminated("block comment", start)),
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<(), AssembleError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                c if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(self.unterminated("string literal", start))
    }

    /// Scan template text up to the closing backtick or the next `${`.
    fn scan_template(&mut self) -> Result<(), AssembleError> {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    self.prev = Prev::Literal;
                    return Ok(());
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.braces.push(Brace::Template);
                    self.prev = Prev::Punct(b'(');
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(self.unterminated("template literal", start))
    }

    fn skip_regex(&mut self) -> Result<(), AssembleError> {
        let start = self.pos;
        let mut in_class = false;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => break,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    self.take_ident();
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(self.unterminated("regular expression", start))
    }

    fn unterminated(&self, kind: &'static str, offset: usize) -> AssembleError {
        let line = self.src[..offset.min(self.src.len())].matches('\n').count() + 1;
        AssembleError::Unterminated { kind, line }
    }
}
