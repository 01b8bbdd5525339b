use std::{fmt, sync::Arc};

/// A lexical unit, also used as the diagnostic anchor ("marker") of every AST
/// node.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub image: String,
    pub filename: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        image: impl Into<String>,
        filename: Arc<str>,
        line: u32,
        column: u32,
    ) -> Token {
        Token {
            kind,
            image: image.into(),
            filename,
            line,
            column,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.image == keyword
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.kind == TokenKind::Operator && self.image == operator
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {:?}, {})", self.kind, self.image, self.position())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.position(), self.image, self.filename)
    }
}

/// A shared, read-only reference to the token an AST node reports its
/// diagnostics against.
pub type Marker = Arc<Token>;

/// One-based source position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}, column {}]", self.line, self.column)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Operator,
    /// Any numeric literal. Base, fraction and width are decided by the
    /// parser, not the lexer.
    Digit,
    /// A string literal. The token image holds the unescaped content.
    String,
}

pub static KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "i4", "i8", "i16", "i32", "i64",
    "u4", "u8", "u16", "u32", "u64",
    "f32", "f64", "bool", "string",

    "true", "false", "nil", "main",
    "render", "return", "defer",
};

// `!` and `~` are the unary operators of the expression grammar; `>>>` is the
// logical right shift.
pub static OPERATORS: phf::Set<&'static str> = phf::phf_set! {
    "+", "-", "/", "*", "%", "=",
    "==", "!=", "^", "&", "&&", ",",
    ".", "(", ")", "[", "]", ":",
    "{", "}", "|", "||", "<", "<<",
    "<=", ">", ">=", ">>", ">>>", "?",
    ";", "!", "~",
};

pub fn is_keyword(image: &str) -> bool {
    KEYWORDS.contains(image)
}

pub fn is_operator(image: &str) -> bool {
    OPERATORS.contains(image)
}
