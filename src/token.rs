use log::debug;
use serde::Serialize;
use std::fmt;
use std::mem;

/// The different kinds of tokens recognized by the Shnap scanner.
///
/// Variants without data represent punctuation or keyword tokens.
/// `STRING(String)` and `CHAR(char)` carry their decoded literal values;
/// `NUMBER` keeps its text in the lexeme so the parser can pick the numeric
/// kind from the suffix. `OPERATOR` covers every symbol in the operator table.
/// `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_BRACKET,

    /// ']'
    RIGHT_BRACKET,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// ':'
    COLON,

    /// ';'
    SEMICOLON,

    /// '='
    EQUAL,

    /// Any operator symbol (`+`, `**=`, `===`, ...); the lexeme holds it.
    OPERATOR,

    /// A user-defined identifier
    IDENTIFIER,

    /// A numeric literal such as `12`, `1.5`, `3e4`, `7i`, `2d`
    NUMBER,

    /// A string literal (decoded contents without quotes)
    STRING(String),

    /// A character literal
    CHAR(char),

    TRUE,
    FALSE,
    NULL,
    VOID,
    IF,
    ELIF,
    ELSE,
    WHILE,
    DO,
    FOR,
    IN,
    TRY,
    CATCH,
    RETURN,
    BREAK,
    CONTINUE,
    THROW,
    FN,
    STATIC,
    OBJ,
    LAZY,
    PRIVATE,
    FINAL,
    NOIMPORT,
    LET,

    /// End-of-file marker
    EOF,
}

impl TokenType {
    /// Variant name without payloads.
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::LEFT_BRACKET => "LEFT_BRACKET",
            TokenType::RIGHT_BRACKET => "RIGHT_BRACKET",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::COLON => "COLON",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::EQUAL => "EQUAL",
            TokenType::OPERATOR => "OPERATOR",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::NUMBER => "NUMBER",
            TokenType::STRING(_) => "STRING",
            TokenType::CHAR(_) => "CHAR",
            TokenType::TRUE => "TRUE",
            TokenType::FALSE => "FALSE",
            TokenType::NULL => "NULL",
            TokenType::VOID => "VOID",
            TokenType::IF => "IF",
            TokenType::ELIF => "ELIF",
            TokenType::ELSE => "ELSE",
            TokenType::WHILE => "WHILE",
            TokenType::DO => "DO",
            TokenType::FOR => "FOR",
            TokenType::IN => "IN",
            TokenType::TRY => "TRY",
            TokenType::CATCH => "CATCH",
            TokenType::RETURN => "RETURN",
            TokenType::BREAK => "BREAK",
            TokenType::CONTINUE => "CONTINUE",
            TokenType::THROW => "THROW",
            TokenType::FN => "FN",
            TokenType::STATIC => "STATIC",
            TokenType::OBJ => "OBJ",
            TokenType::LAZY => "LAZY",
            TokenType::PRIVATE => "PRIVATE",
            TokenType::FINAL => "FINAL",
            TokenType::NOIMPORT => "NOIMPORT",
            TokenType::LET => "LET",
            TokenType::EOF => "EOF",
        }
    }
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// A scanned token, including its type, the original lexeme,
/// and the byte offset where it starts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// Byte offset of the first character; resolve with a `LineIndex`.
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// Create a new Token with the given type, lexeme, and offset.
    pub fn new(token_type: TokenType, lexeme: &'a str, offset: usize) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={}, offset={}",
            token_type, lexeme, offset
        );

        Self {
            token_type,
            lexeme,
            offset,
        }
    }

    /// True for an `OPERATOR` token spelling exactly `symbol`.
    pub fn is_operator(&self, symbol: &str) -> bool {
        self.token_type == TokenType::OPERATOR && self.lexeme == symbol
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token_type {
            TokenType::STRING(s) => write!(f, "{} {} {}", self.token_type.name(), self.lexeme, s),
            TokenType::CHAR(c) => write!(f, "{} {} {}", self.token_type.name(), self.lexeme, c),
            TokenType::NUMBER => write!(f, "NUMBER {} {}", self.lexeme, self.lexeme),
            other => write!(f, "{} {} null", other.name(), self.lexeme),
        }
    }
}
