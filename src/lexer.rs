use std::{fmt, iter::Peekable, str::Chars, sync::Arc};

use thiserror::Error;

use crate::token::{self, Position, Token, TokenKind};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// Scans the provided source, returning every token it could recognize along
/// with every lexical error found on the way.
///
/// The scan never aborts: unknown characters are reported and skipped, and
/// malformed literals are reported and closed at the offending character.
#[tracing::instrument(level = "debug", skip(src), fields(len = src.len()))]
pub fn scan(filename: &str, src: &str) -> Scanned {
    let scanned = Lexer::new(filename, src).scan();
    tracing::debug!(
        tokens = scanned.tokens.len(),
        errors = scanned.errors.len(),
        "scan finished"
    );
    scanned
}

#[derive(Debug, Default)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl Scanned {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

impl LexError {
    pub fn line(&self) -> u32 {
        self.position.line
    }

    pub fn column(&self) -> u32 {
        self.position.column
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.position, self.kind)
    }
}

impl std::error::Error for LexError {}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unidentified {0:?} character encountered")]
    UnidentifiedChar(char),
    #[error("expecting {0}")]
    Expecting(DigitClass),
    #[error("unclosed literal encountered")]
    UnclosedLiteral,
    #[error("invalid character escape sequence: {0:?}")]
    InvalidEscape(char),
    #[error("expecting escape character sequence, encountered EOF")]
    EscapeAtEof,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DigitClass {
    Decimal,
    Binary,
    Octal,
    Hexadecimal,
}

impl DigitClass {
    fn accepts(self, c: char) -> bool {
        match self {
            DigitClass::Decimal => c.is_ascii_digit(),
            DigitClass::Binary => matches!(c, '0' | '1'),
            DigitClass::Octal => matches!(c, '0'..='7'),
            DigitClass::Hexadecimal => c.is_ascii_hexdigit(),
        }
    }

    fn of_prefix(c: char) -> Option<DigitClass> {
        match c {
            'b' => Some(DigitClass::Binary),
            'o' => Some(DigitClass::Octal),
            'x' => Some(DigitClass::Hexadecimal),
            _ => None,
        }
    }
}

impl fmt::Display for DigitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DigitClass::Decimal => "digit",
            DigitClass::Binary => "binary",
            DigitClass::Octal => "octal",
            DigitClass::Hexadecimal => "hexadecimal",
        })
    }
}

/// The Yttria lexer
struct Lexer<'src> {
    filename: Arc<str>,
    iter: Peekable<Chars<'src>>,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl Lexer<'_> {
    /// Scans the source string until the input is exhausted.
    fn scan(mut self) -> Scanned {
        while let Some(current) = self.peek() {
            match current {
                c if is_whitespace(c) => {
                    self.advance();
                }
                '#' => self.comment(),
                '\'' | '"' => self.string(),
                c if is_operator_lead(c) => self.operator(),
                c if c.is_ascii_digit() => self.number(),
                c if c.is_ascii_alphabetic() => self.identifier_or_keyword(),
                c => {
                    let position = self.position();
                    self.advance();
                    self.error(position, LexErrorKind::UnidentifiedChar(c));
                }
            }
        }
        Scanned {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    /// Consumes up to (but excluding) the line break, so that line tracking
    /// stays in the whitespace path.
    fn comment(&mut self) {
        while !matches!(self.peek(), Some('\n') | None) {
            self.advance();
        }
    }

    /// Greedily extends the operator while the accumulated image is still an
    /// operator of the table.
    fn operator(&mut self) {
        let start = self.position();
        let mut image = String::with_capacity(3);
        image.extend(self.advance());
        while let Some(next) = self.peek() {
            image.push(next);
            if !token::is_operator(&image) {
                image.pop();
                break;
            }
            self.advance();
        }
        self.produce(TokenKind::Operator, image, start);
    }

    fn number(&mut self) {
        let start = self.position();
        let mut image = String::with_capacity(8);
        let first = self.advance();
        image.extend(first);

        let prefix = match first {
            Some('0') => self.peek().and_then(DigitClass::of_prefix),
            _ => None,
        };
        match prefix {
            Some(class) => {
                image.extend(self.advance());
                self.digits(&mut image, class);
            }
            None => {
                self.digits(&mut image, DigitClass::Decimal);
                if self.peek() == Some('.') {
                    image.extend(self.advance());
                    self.digits(&mut image, DigitClass::Decimal);
                }
            }
        }
        self.produce(TokenKind::Digit, image, start);
    }

    /// Consumes every character of the given class. An alphanumeric character
    /// outside of the class is reported and closes the literal.
    fn digits(&mut self, image: &mut String, class: DigitClass) {
        while let Some(c) = self.peek() {
            if class.accepts(c) {
                image.extend(self.advance());
                continue;
            }
            if c.is_ascii_alphanumeric() {
                let position = self.position();
                self.error(position, LexErrorKind::Expecting(class));
            }
            break;
        }
    }

    fn identifier_or_keyword(&mut self) {
        let start = self.position();
        let mut image = String::with_capacity(8);
        while let Some(c) = self.peek().filter(char::is_ascii_alphanumeric) {
            self.advance();
            image.push(c);
        }
        let kind = if token::is_keyword(&image) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.produce(kind, image, start);
    }

    /// Lexes a string literal delimited by the quote under the cursor.
    ///
    /// The produced token holds the unescaped content. Invalid escapes are
    /// reported and dropped. A line break or the end of input before the
    /// closing quote is reported at the opening quote. A line break closes
    /// the literal and is then scanned as regular input.
    fn string(&mut self) {
        let start = self.position();
        let quote = self.advance();
        let mut content = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error(start, LexErrorKind::UnclosedLiteral);
                    break;
                }
                Some(c) if Some(c) == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let position = self.position();
                    self.advance();
                    match self.advance() {
                        Some('t') => content.push('\t'),
                        Some('r') => content.push('\r'),
                        Some('n') => content.push('\n'),
                        Some(other) => self.error(position, LexErrorKind::InvalidEscape(other)),
                        None => self.error(position, LexErrorKind::EscapeAtEof),
                    }
                }
                Some(c) => {
                    self.advance();
                    content.push(c);
                }
            }
        }
        self.produce(TokenKind::String, content, start);
    }
}

impl Lexer<'_> {
    /// Constructs a new lexer with the default state.
    fn new<'src>(filename: &str, src: &'src str) -> Lexer<'src> {
        Lexer {
            filename: Arc::from(filename),
            iter: src.chars().peekable(),
            line: 1,
            column: 1,
            tokens: Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY.min(src.len() / 2 + 1)),
            errors: Vec::new(),
        }
    }

    /// Returns the next character and advances the cursor, updating the line
    /// and column counters.
    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Returns the next character without advancing the cursor.
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn produce(&mut self, kind: TokenKind, image: String, start: Position) {
        self.tokens.push(Token::new(
            kind,
            image,
            Arc::clone(&self.filename),
            start.line,
            start.column,
        ));
    }

    fn error(&mut self, position: Position, kind: LexErrorKind) {
        tracing::trace!(%position, %kind, "lexical error");
        self.errors.push(LexError { kind, position });
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\r' | '\t')
}

fn is_operator_lead(c: char) -> bool {
    token::is_operator(c.encode_utf8(&mut [0; 4]))
}

/// Decoding of `DIGIT` token images, for use by the parser.
pub mod extract {
    use std::num::IntErrorKind;

    use thiserror::Error;

    use crate::token::{Token, TokenKind};

    #[derive(Clone, Debug, PartialEq, Eq, Error)]
    pub enum ExtractError {
        #[error("malformed numeric literal {0:?}")]
        Malformed(String),
        #[error("numeric literal {0:?} is out of range")]
        OutOfRange(String),
    }

    /// Whether the literal denotes a floating-point value.
    pub fn is_float(token: &Token) -> bool {
        debug_assert_eq!(token.kind, TokenKind::Digit);
        token.image.contains('.')
    }

    pub fn int(token: &Token) -> Result<i128, ExtractError> {
        debug_assert_eq!(token.kind, TokenKind::Digit);
        let image = token.image.as_str();
        let (digits, radix) = match image.get(..2) {
            Some("0b") => (&image[2..], 2),
            Some("0o") => (&image[2..], 8),
            Some("0x") => (&image[2..], 16),
            _ => (image, 10),
        };
        i128::from_str_radix(digits, radix).map_err(|error| match error.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                ExtractError::OutOfRange(image.to_string())
            }
            _ => ExtractError::Malformed(image.to_string()),
        })
    }

    pub fn float(token: &Token) -> Result<f64, ExtractError> {
        debug_assert_eq!(token.kind, TokenKind::Digit);
        token
            .image
            .parse()
            .map_err(|_| ExtractError::Malformed(token.image.clone()))
    }
}
