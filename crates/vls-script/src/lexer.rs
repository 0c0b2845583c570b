//! Tokenizer for JavaScript and TypeScript source.
//!
//! The lexer is error tolerant: it always produces a token stream covering
//! the whole input and reports malformed literals separately, so that callers
//! analysing an in-progress edit still get a usable model.

use vls_source::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword,
    Number,
    String,
    Template,
    Regex,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.slice(source).unwrap_or_default()
    }

    #[must_use]
    pub fn is_punct(&self, source: &str, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text(source) == punct
    }

    #[must_use]
    pub fn is_keyword(&self, source: &str, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text(source) == keyword
    }

    /// Identifier-like tokens, including reserved words.
    #[must_use]
    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Keyword)
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number | TokenKind::String | TokenKind::Template | TokenKind::Regex
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    UnterminatedString,
    UnterminatedTemplate,
    UnterminatedComment,
    UnterminatedRegex,
    InvalidCharacter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub span: Span,
    pub block: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub errors: Vec<LexError>,
}

pub const KEYWORDS: &[&str] = &[
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>",
];

#[must_use]
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphanumeric()
}

/// Keywords after which a `/` starts a regular expression rather than a
/// division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "instanceof", "new", "delete", "void",
    "throw", "yield", "await",
];

#[must_use]
pub fn tokenize(text: &str) -> Lexed {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Lexed,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            out: Lexed::default(),
        }
    }

    fn run(mut self) -> Lexed {
        while let Some(c) = self.peek_char() {
            let start = self.pos;
            match c {
                c if c.is_whitespace() => self.pos += c.len_utf8(),
                '/' if self.byte_at(start + 1) == Some(b'/') => {
                    self.skip_line();
                    self.out.comments.push(Comment {
                        span: Span::from_bounds(start, self.pos),
                        block: false,
                    });
                }
                '/' if self.byte_at(start + 1) == Some(b'*') => self.block_comment(start),
                '/' if self.regex_allowed() => self.regex(start),
                '"' | '\'' => self.string(start),
                '`' => self.template(start),
                c if c.is_ascii_digit() => self.number(start),
                '.' if self.byte_at(start + 1).is_some_and(|b| b.is_ascii_digit()) => {
                    self.number(start);
                }
                c if is_ident_start(c) || c == '#' => self.word(start),
                c if c.is_ascii_punctuation() => self.punct(start),
                other => {
                    self.pos += other.len_utf8();
                    self.out.errors.push(LexError {
                        kind: LexErrorKind::InvalidCharacter,
                        span: Span::from_bounds(start, self.pos),
                    });
                }
            }
        }
        self.out
    }

    fn peek_char(&self) -> Option<char> {
        self.text.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    fn byte_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.out.tokens.push(Token {
            kind,
            span: Span::from_bounds(start, self.pos),
        });
    }

    fn error(&mut self, kind: LexErrorKind, start: usize) {
        self.out.errors.push(LexError {
            kind,
            span: Span::from_bounds(start, self.pos),
        });
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.byte_at(self.pos) {
            if b == b'\n' || b == b'\r' {
                break;
            }
            self.pos += 1;
        }
    }

    fn block_comment(&mut self, start: usize) {
        self.pos += 2;
        match self.text[self.pos..].find("*/") {
            Some(end) => self.pos += end + 2,
            None => {
                self.pos = self.bytes.len();
                self.error(LexErrorKind::UnterminatedComment, start);
            }
        }
        self.out.comments.push(Comment {
            span: Span::from_bounds(start, self.pos),
            block: true,
        });
    }

    fn regex_allowed(&self) -> bool {
        let Some(previous) = self.out.tokens.last() else {
            return true;
        };
        let text = previous.text(self.text);
        match previous.kind {
            TokenKind::Ident
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::Template
            | TokenKind::Regex => false,
            TokenKind::Keyword => REGEX_PRECEDING_KEYWORDS.contains(&text),
            TokenKind::Punct => !matches!(text, ")" | "]" | "}" | "++" | "--"),
        }
    }

    fn regex(&mut self, start: usize) {
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.byte_at(self.pos) {
                None | Some(b'\n' | b'\r') => {
                    self.pos = self.pos.min(self.bytes.len());
                    self.error(LexErrorKind::UnterminatedRegex, start);
                    self.push(TokenKind::Regex, start);
                    return;
                }
                Some(b'\\') => self.pos += 2,
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        while self.byte_at(self.pos).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        self.pos = self.pos.min(self.bytes.len());
        self.push(TokenKind::Regex, start);
    }

    fn string(&mut self, start: usize) {
        let quote = self.bytes[start];
        self.pos += 1;
        loop {
            match self.byte_at(self.pos) {
                None | Some(b'\n' | b'\r') => {
                    self.error(LexErrorKind::UnterminatedString, start);
                    break;
                }
                Some(b'\\') => self.pos = (self.pos + 2).min(self.bytes.len()),
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.push(TokenKind::String, start);
    }

    fn template(&mut self, start: usize) {
        match skip_template(self.bytes, start) {
            Some(end) => self.pos = end,
            None => {
                self.pos = self.bytes.len();
                self.error(LexErrorKind::UnterminatedTemplate, start);
            }
        }
        self.push(TokenKind::Template, start);
    }

    fn number(&mut self, start: usize) {
        while let Some(b) = self.byte_at(self.pos) {
            let exponent_sign = (b == b'+' || b == b'-')
                && self.pos > start
                && matches!(self.byte_at(self.pos - 1), Some(b'e' | b'E'))
                && !self.text[start..self.pos].starts_with("0x");
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn word(&mut self, start: usize) {
        if self.byte_at(self.pos) == Some(b'#') {
            self.pos += 1;
        }
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let kind = if is_keyword(&self.text[start..self.pos]) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        self.push(kind, start);
    }

    fn punct(&mut self, start: usize) {
        let rest = &self.text[start..];
        let length = PUNCTUATORS
            .iter()
            .find(|p| rest.starts_with(**p))
            .map_or(1, |p| p.len());
        // `a?.5:b` is a conditional, not optional chaining
        let length = if length == 2
            && rest.starts_with("?.")
            && self.byte_at(start + 2).is_some_and(|b| b.is_ascii_digit())
        {
            1
        } else {
            length
        };
        self.pos += length;
        self.push(TokenKind::Punct, start);
    }
}

/// Return the index just past the closing backtick of the template literal
/// starting at `start`, or `None` when it runs to end of input.
fn skip_template(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = skip_substitution(bytes, i + 2)?;
            }
            _ => i += 1,
        }
    }
    None
}

fn skip_substitution(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'`' => {
                i = skip_template(bytes, i)?;
                continue;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
