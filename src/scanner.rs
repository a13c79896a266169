//! Module `scanner` implements a one‑pass, streaming lexer for Shnap source.
//!
//! It transforms comment‑stripped source text into a sequence of
//! `Token<'a>`s, skipping whitespace and emitting exactly one `EOF` token at
//! the end. Designed as a `FusedIterator`, it can be chained safely with
//! other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str, index: &'i LineIndex) -> Scanner<'a, 'i>`
//!   Create a new lexer over the input; `index` resolves error locations.
//!
//! - `impl Iterator for Scanner<'a, 'i>`
//!   Yields `Result<Token<'a>, ShnapError>` on each `.next()`. After an error
//!   the scanner resumes at the following byte, so every bad lexeme is
//!   reported.
//!
//! # Token Recognition
//!
//! - Punctuation: `( ) { } [ ] , . : ;` and a lone `=`.
//! - Operators: longest match against the operator table (`===` beats `==`
//!   beats `=`, `**=` beats `**` beats `*`).
//! - Numbers: digits, optional `.fraction`, optional `e[+-]digits`, optional
//!   `i`/`d` suffix. A `-` directly followed by a digit in *operand* position
//!   (anything not following a value) is part of the literal.
//! - Strings: `"…"` with escapes, `"""…"""` raw. Characters: `'c'`.
//! - Identifiers/keywords: resolved via a perfect‑hash `KEYWORDS` map.
//! - `//` comments are skipped with `memchr` for sources that did not go
//!   through [`crate::source::strip_comments`].

use crate::error::{Result, ShnapError};
use crate::operator::Operator;
use crate::source::LineIndex;
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"true"     => TokenType::TRUE,
    b"false"    => TokenType::FALSE,
    b"null"     => TokenType::NULL,
    b"void"     => TokenType::VOID,
    b"if"       => TokenType::IF,
    b"elif"     => TokenType::ELIF,
    b"else"     => TokenType::ELSE,
    b"while"    => TokenType::WHILE,
    b"do"       => TokenType::DO,
    b"for"      => TokenType::FOR,
    b"in"       => TokenType::IN,
    b"try"      => TokenType::TRY,
    b"catch"    => TokenType::CATCH,
    b"return"   => TokenType::RETURN,
    b"break"    => TokenType::BREAK,
    b"continue" => TokenType::CONTINUE,
    b"throw"    => TokenType::THROW,
    b"fn"       => TokenType::FN,
    b"static"   => TokenType::STATIC,
    b"obj"      => TokenType::OBJ,
    b"lazy"     => TokenType::LAZY,
    b"private"  => TokenType::PRIVATE,
    b"final"    => TokenType::FINAL,
    b"noimport" => TokenType::NOIMPORT,
    b"let"      => TokenType::LET,
};

/// Is `symbol` spelled by some entry of the operator table?
fn is_operator_symbol(symbol: &str) -> bool {
    Operator::binary(symbol).is_some()
        || Operator::unary(symbol).is_some()
        || Operator::assignment(symbol).is_some()
}

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s. The lifetime `'a` ties every emitted token's
/// `lexeme` slice back to the original source buffer.
pub struct Scanner<'a, 'i> {
    text: &'a str,              // source text, comments already blanked
    src: &'a [u8],              // byte view of `text`
    index: &'i LineIndex,       // offset → line/column for diagnostics
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    after_operand: bool,        // did the last emitted token end a value?
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a, 'i> Scanner<'a, 'i> {
    /// Create a new lexer over `text`.
    #[inline]
    pub fn new(text: &'a str, index: &'i LineIndex) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            index,
            start: 0,
            curr: 0,
            after_operand: false,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it. Callers guard with [`Self::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte, or `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.peek_at(1)
    }

    #[inline(always)]
    fn peek_at(&self, ahead: usize) -> u8 {
        self.src.get(self.curr + ahead).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error<S: Into<String>>(&self, at: usize, message: S) -> ShnapError {
        ShnapError::lex(self.index.locate(at), message)
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`. Whitespace is skipped
    /// by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── punctuation ──────────────────────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b'[' => self.pending = Some(TokenType::LEFT_BRACKET),
            b']' => self.pending = Some(TokenType::RIGHT_BRACKET),
            b',' => self.pending = Some(TokenType::COMMA),
            b'.' => self.pending = Some(TokenType::DOT),
            b':' => self.pending = Some(TokenType::COLON),
            b';' => self.pending = Some(TokenType::SEMICOLON),

            // ── whitespace ───────────────────────────────────────────────
            b' ' | b'\r' | b'\t' | b'\n' => return Ok(()),

            // ── line comment ─────────────────────────────────────────────
            b'/' if self.peek() == b'/' => {
                match memchr(b'\n', &self.src[self.curr..]) {
                    Some(pos) => self.curr += pos,
                    None => self.curr = self.len(),
                }
                return Ok(());
            }

            // ── negative literal in operand position ─────────────────────
            b'-' if !self.after_operand && self.peek().is_ascii_digit() => {
                self.parse_number();
            }

            b'"' => return self.parse_string(),
            b'\'' => return self.parse_char(),

            b'0'..=b'9' => self.parse_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── operators, longest match first ───────────────────────────
            b'=' | b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|'
            | b'^' | b'~' => self.parse_operator(),

            _ => {
                // Swallow the rest of a multi-byte character before reporting.
                while !self.is_at_end() && (self.peek() & 0b1100_0000) == 0b1000_0000 {
                    self.advance();
                }
                let bad = &self.text[self.start..self.curr];
                return Err(self.error(self.start, format!("Unexpected character: {bad}")));
            }
        }

        Ok(())
    }

    fn parse_operator(&mut self) {
        for width in (1..=3).rev() {
            let end = self.start + width;
            let Some(candidate) = self.text.get(self.start..end) else {
                continue;
            };

            if candidate == "=" {
                self.curr = end;
                self.pending = Some(TokenType::EQUAL);
                return;
            }
            if is_operator_symbol(candidate) {
                self.curr = end;
                self.pending = Some(TokenType::OPERATOR);
                return;
            }
        }
    }

    /// Double-quoted string, or a `"""` raw string.
    fn parse_string(&mut self) -> Result<()> {
        if self.peek() == b'"' && self.peek_next() == b'"' {
            self.curr += 2;
            let body_start = self.curr;

            while !self.is_at_end() {
                if self.src[self.curr..].starts_with(b"\"\"\"") {
                    let body = self.text[body_start..self.curr].to_owned();
                    self.curr += 3;
                    self.pending = Some(TokenType::STRING(body));
                    return Ok(());
                }
                self.advance();
            }

            return Err(self.error(self.start, "Unterminated raw string."));
        }

        let decoded = self.decode_until(b'"', "Unterminated string.")?;
        self.pending = Some(TokenType::STRING(decoded));

        Ok(())
    }

    fn parse_char(&mut self) -> Result<()> {
        let decoded = self.decode_until(b'\'', "Unterminated character literal.")?;
        let mut chars = decoded.chars();

        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                self.pending = Some(TokenType::CHAR(c));
                Ok(())
            }
            _ => Err(self.error(
                self.start,
                "Character literal must hold exactly one character.",
            )),
        }
    }

    /// Decode escapes up to the closing `quote`, consuming it.
    fn decode_until(&mut self, quote: u8, unterminated: &str) -> Result<String> {
        let mut out = String::new();
        let mut run_start = self.curr;

        loop {
            if self.is_at_end() {
                return Err(self.error(self.start, unterminated));
            }

            match self.peek() {
                b if b == quote => {
                    out.push_str(&self.text[run_start..self.curr]);
                    self.advance();
                    return Ok(out);
                }
                b'\\' => {
                    out.push_str(&self.text[run_start..self.curr]);
                    let escape_at = self.curr;
                    self.advance();
                    out.push(self.parse_escape(escape_at)?);
                    run_start = self.curr;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_escape(&mut self, escape_at: usize) -> Result<char> {
        if self.is_at_end() {
            return Err(self.error(escape_at, "Unterminated escape sequence."));
        }

        let c = match self.advance() {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'0' => '\0',
            b'\\' => '\\',
            b'"' => '"',
            b'\'' => '\'',
            b'u' => {
                if !self.match_byte(b'{') {
                    return Err(self.error(escape_at, "Expected '{' after \\u."));
                }
                let text = self.text;
                let digits_start = self.curr;
                while self.peek().is_ascii_hexdigit() {
                    self.advance();
                }
                let digits = &text[digits_start..self.curr];
                if !self.match_byte(b'}') {
                    return Err(self.error(escape_at, "Expected '}' to close \\u{...}."));
                }

                u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        self.error(escape_at, format!("Invalid unicode escape: {digits}"))
                    })?
            }
            other => {
                return Err(self.error(
                    escape_at,
                    format!("Unknown escape sequence: \\{}", other as char),
                ))
            }
        };

        Ok(c)
    }

    /// Numeric literal: `123`, `3.14`, `1e5`, `2.5e-3`, `7i`, `2d`. The
    /// lexeme keeps any leading `-` and the suffix.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if matches!(self.peek(), b'e' | b'E') {
            let signed = matches!(self.peek_next(), b'+' | b'-');
            let first_digit = if signed { 2 } else { 1 };

            if self.peek_at(first_digit).is_ascii_digit() {
                self.curr += first_digit;
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        if matches!(self.peek(), b'i' | b'd') {
            let next = self.peek_next();
            if !(next.is_ascii_alphanumeric() || next == b'_') {
                self.advance();
            }
        }

        self.pending = Some(TokenType::NUMBER);
    }

    /// Identifier or **keyword**.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

/// Tokens after which a `-` is binary subtraction.
fn ends_operand(tt: &TokenType) -> bool {
    matches!(
        tt,
        TokenType::IDENTIFIER
            | TokenType::NUMBER
            | TokenType::STRING(_)
            | TokenType::CHAR(_)
            | TokenType::RIGHT_PAREN
            | TokenType::RIGHT_BRACKET
            | TokenType::RIGHT_BRACE
            | TokenType::TRUE
            | TokenType::FALSE
            | TokenType::NULL
            | TokenType::VOID
    )
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a, 'i> Iterator for Scanner<'a, 'i> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // Emit exactly one EOF, then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.len())));
            }

            self.start = self.curr;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                let lex: &'a str = &self.text[self.start..self.curr];
                debug!("Scanned token ({:?}) at offset {}", tt, self.start);

                self.after_operand = ends_operand(&tt);
                return Some(Ok(Token::new(tt, lex, self.start)));
            }
        }

        None
    }
}

impl<'a, 'i> FusedIterator for Scanner<'a, 'i> {}
