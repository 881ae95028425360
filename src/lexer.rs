use crate::diagnostic::LexError;
use crate::source_manager::{SourceId, SourceSpan};
use log::trace;
use serde::Serialize;

/// Token kinds for the lexical analyzer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // === LITERALS ===
    IntegerConstant(String), // Digit run, range-checked by the parser

    // === IDENTIFIERS ===
    Identifier(String),

    // === KEYWORDS ===
    Int,
    Void,
    Return,
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,

    // === OPERATORS ===
    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Increment,
    Decrement,

    // Bitwise operators
    And,
    Or,
    Xor,
    Tilde,
    LeftShift,
    RightShift,

    // Comparison operators
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,

    // Assignment operators
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    LeftShiftAssign,
    RightShiftAssign,

    // Logical operators
    Not,
    LogicAnd,
    LogicOr,

    // Ternary operator
    Question,
    Colon,

    // === PUNCTUATION ===
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    EndOfFile,
}

impl TokenKind {
    /// Check if the token is an assignment operator
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::DivAssign
                | TokenKind::ModAssign
                | TokenKind::AndAssign
                | TokenKind::OrAssign
                | TokenKind::XorAssign
                | TokenKind::LeftShiftAssign
                | TokenKind::RightShiftAssign
        )
    }

    /// Human readable spelling used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            TokenKind::IntegerConstant(digits) => format!("constant '{}'", digits),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::EndOfFile => "end of file".to_string(),
            other => format!("'{}'", other.spelling()),
        }
    }

    fn spelling(&self) -> &str {
        match self {
            TokenKind::IntegerConstant(digits) => digits,
            TokenKind::Identifier(name) => name,
            TokenKind::Int => "int",
            TokenKind::Void => "void",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Increment => "++",
            TokenKind::Decrement => "--",
            TokenKind::And => "&",
            TokenKind::Or => "|",
            TokenKind::Xor => "^",
            TokenKind::Tilde => "~",
            TokenKind::LeftShift => "<<",
            TokenKind::RightShift => ">>",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Equal => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::DivAssign => "/=",
            TokenKind::ModAssign => "%=",
            TokenKind::AndAssign => "&=",
            TokenKind::OrAssign => "|=",
            TokenKind::XorAssign => "^=",
            TokenKind::LeftShiftAssign => "<<=",
            TokenKind::RightShiftAssign => ">>=",
            TokenKind::Not => "!",
            TokenKind::LogicAnd => "&&",
            TokenKind::LogicOr => "||",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::EndOfFile => "",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spelling())
    }
}

/// 1-based line and column of a token's first character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Token with source span for the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
    pub position: Position,
}

/// Check if an identifier spelling is a keyword.
pub fn is_keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "int" => TokenKind::Int,
        "void" => TokenKind::Void,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "for" => TokenKind::For,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        _ => return None,
    };
    Some(kind)
}

/// Operators ordered so that longer spellings are tried first.
const PUNCTUATORS: &[(&str, TokenKind)] = &[
    ("<<=", TokenKind::LeftShiftAssign),
    (">>=", TokenKind::RightShiftAssign),
    ("++", TokenKind::Increment),
    ("--", TokenKind::Decrement),
    ("<<", TokenKind::LeftShift),
    (">>", TokenKind::RightShift),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("==", TokenKind::Equal),
    ("!=", TokenKind::NotEqual),
    ("&&", TokenKind::LogicAnd),
    ("||", TokenKind::LogicOr),
    ("+=", TokenKind::PlusAssign),
    ("-=", TokenKind::MinusAssign),
    ("*=", TokenKind::StarAssign),
    ("/=", TokenKind::DivAssign),
    ("%=", TokenKind::ModAssign),
    ("&=", TokenKind::AndAssign),
    ("|=", TokenKind::OrAssign),
    ("^=", TokenKind::XorAssign),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("&", TokenKind::And),
    ("|", TokenKind::Or),
    ("^", TokenKind::Xor),
    ("~", TokenKind::Tilde),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("=", TokenKind::Assign),
    ("!", TokenKind::Not),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    ("{", TokenKind::LeftBrace),
    ("}", TokenKind::RightBrace),
];

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_identifier_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Lexer over one source buffer.
///
/// The lexer is an iterator of tokens and is cheap to clone, so a caller can
/// snapshot it and restart scanning from that point.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    source_id: SourceId,
    source: &'src str,
    pos: usize,
    line: u32,
    column: u32,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source_id: SourceId, source: &'src str) -> Self {
        Lexer {
            source_id,
            source,
            pos: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    /// Lex the whole buffer, ending with an `EndOfFile` token
    pub fn tokenize_all(self) -> Result<Vec<Token>, LexError> {
        self.collect()
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.source.as_bytes().get(self.pos + ahead).copied()
    }

    /// Advance over `count` bytes, keeping line and column current
    fn bump(&mut self, count: usize) {
        for b in &self.source.as_bytes()[self.pos..self.pos + count] {
            if *b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += count;
    }

    fn span_from(&self, start: usize) -> SourceSpan {
        SourceSpan::new(self.source_id, start as u32, self.pos as u32)
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek_byte(0), self.peek_byte(1)) {
                (Some(b), _) if b.is_ascii_whitespace() => self.bump(1),
                (Some(b'/'), Some(b'/')) => {
                    let len = self.source[self.pos..].find('\n').unwrap_or(self.source.len() - self.pos);
                    self.bump(len);
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    match self.source[self.pos + 2..].find("*/") {
                        Some(body_len) => self.bump(body_len + 4),
                        None => {
                            return Err(LexError::UnterminatedComment {
                                location: SourceSpan::new(self.source_id, start as u32, start as u32 + 2),
                            });
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let digits = self.source[start..].bytes().take_while(u8::is_ascii_digit).count();
        self.bump(digits);

        if self.peek_byte(0).is_some_and(is_identifier_start) {
            let suffix = self.source[self.pos..].bytes().take_while(|b| is_identifier_continue(*b)).count();
            self.bump(suffix);
            return Err(LexError::InvalidLiteral {
                text: self.source[start..self.pos].to_string(),
                location: self.span_from(start),
            });
        }

        Ok(TokenKind::IntegerConstant(self.source[start..self.pos].to_string()))
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        let len = self.source[start..].bytes().take_while(|b| is_identifier_continue(*b)).count();
        self.bump(len);
        let text = &self.source[start..self.pos];
        is_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }

    fn lex_punctuator(&mut self) -> Result<TokenKind, LexError> {
        let rest = &self.source[self.pos..];
        if let Some((spelling, kind)) = PUNCTUATORS.iter().find(|(spelling, _)| rest.starts_with(spelling)) {
            let kind = kind.clone();
            self.bump(spelling.len());
            return Ok(kind);
        }

        // always Some: the caller saw at least one byte
        let ch = rest.chars().next().unwrap_or('\0');
        let start = self.pos;
        let location = SourceSpan::new(self.source_id, start as u32, (start + ch.len_utf8()) as u32);
        Err(LexError::UnexpectedCharacter { ch, location })
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let start = self.pos;
        let position = Position {
            line: self.line,
            column: self.column,
        };

        let kind = match self.peek_byte(0) {
            None => TokenKind::EndOfFile,
            Some(b) if b.is_ascii_digit() => self.lex_number()?,
            Some(b) if is_identifier_start(b) => self.lex_identifier(),
            Some(_) => self.lex_punctuator()?,
        };

        let token = Token {
            kind,
            span: self.span_from(start),
            position,
        };
        trace!("lexed {:?} at {}:{}", token.kind, position.line, position.column);
        Ok(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        // stop after the first error or after EndOfFile
        if !matches!(&result, Ok(token) if token.kind != TokenKind::EndOfFile) {
            self.finished = true;
        }
        Some(result)
    }
}

/// Lex a whole buffer
pub fn tokenize(source_id: SourceId, source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source_id, source).tokenize_all()
}

#[cfg(test)]
mod tests_lexer;
