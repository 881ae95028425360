//! Recursive-descent parser.
//!
//! One function per grammar production. Binary operators are handled by the
//! precedence-climbing loop in [`expressions`]; statements live in
//! [`statements`]. The parser fails fast on the first structural error.

use crate::ast::{Block, FunctionDecl, Param, Program, ReturnType};
use crate::diagnostic::ParseError;
use crate::lexer::{Token, TokenKind};
use crate::source_manager::SourceSpan;
use log::debug;

pub mod expressions;
pub mod statements;


/// Parser state over a token slice
pub struct Parser<'src> {
    tokens: &'src [Token],
    current_idx: usize,
    /// Span of the most recently consumed token
    last_span: SourceSpan,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: &'src [Token]) -> Self {
        Parser {
            tokens,
            current_idx: 0,
            last_span: SourceSpan::empty(),
        }
    }

    pub(crate) fn try_current_token(&self) -> Option<&'src Token> {
        self.tokens.get(self.current_idx)
    }

    pub(crate) fn current_kind(&self) -> Option<&'src TokenKind> {
        self.try_current_token().map(|t| &t.kind)
    }

    /// Look `n` tokens past the current one
    pub(crate) fn peek_kind(&self, n: usize) -> Option<&'src TokenKind> {
        self.tokens.get(self.current_idx + n + 1).map(|t| &t.kind)
    }

    pub(crate) fn is_token(&self, kind: &TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    /// Consume the current token, if any
    pub(crate) fn advance(&mut self) -> Option<&'src Token> {
        let token = self.tokens.get(self.current_idx)?;
        if token.kind != TokenKind::EndOfFile {
            self.current_idx += 1;
        }
        self.last_span = token.span;
        Some(token)
    }

    /// Consume the current token if it has the given kind
    pub(crate) fn accept(&mut self, kind: &TokenKind) -> Option<&'src Token> {
        if self.is_token(kind) { self.advance() } else { None }
    }

    /// Consume a token of the given kind or fail
    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<&'src Token, ParseError> {
        match self.accept(kind) {
            Some(token) => Ok(token),
            None => Err(self.error_expected(&format!("'{}'", kind))),
        }
    }

    /// Consume an identifier and return its name
    pub(crate) fn expect_identifier(&mut self) -> Result<(String, SourceSpan), ParseError> {
        match self.try_current_token() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                span,
                ..
            }) => {
                self.advance();
                Ok((name.clone(), *span))
            }
            _ => Err(self.error_expected("identifier")),
        }
    }

    /// Span of the current token, or the end of the last consumed token at end of input
    pub(crate) fn current_span(&self) -> SourceSpan {
        self.try_current_token()
            .map(|t| t.span)
            .unwrap_or_else(|| self.last_span.end_point())
    }

    /// Span from `start` up to the last consumed token
    pub(crate) fn span_from(&self, start: SourceSpan) -> SourceSpan {
        start.merge(self.last_span)
    }

    /// Build the error for "expected X" at the current token
    pub(crate) fn error_expected(&self, expected: &str) -> ParseError {
        match self.try_current_token() {
            Some(token) if token.kind != TokenKind::EndOfFile => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.describe(),
                location: token.span,
            },
            _ => ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                location: self.current_span(),
            },
        }
    }

    /// Parse a translation unit: function definitions and prototypes up to end of file
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut functions = Vec::new();
        while !matches!(self.current_kind(), Some(TokenKind::EndOfFile) | None) {
            functions.push(self.parse_function()?);
        }
        debug!("parse_program: parsed {} function(s)", functions.len());
        Ok(Program { functions })
    }

    fn parse_return_type(&mut self) -> Result<ReturnType, ParseError> {
        if self.accept(&TokenKind::Int).is_some() {
            Ok(ReturnType::Int)
        } else if self.accept(&TokenKind::Void).is_some() {
            Ok(ReturnType::Void)
        } else {
            Err(self.error_expected("'int' or 'void'"))
        }
    }

    /// function := ("int" | "void") ident "(" params ")" (block | ";")
    fn parse_function(&mut self) -> Result<FunctionDecl, ParseError> {
        let start = self.current_span();
        let return_type = self.parse_return_type()?;
        let (name, _) = self.expect_identifier()?;
        debug!("parse_function: {}", name);

        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::RightParen)?;

        let body = if self.accept(&TokenKind::Semicolon).is_some() {
            None
        } else if self.is_token(&TokenKind::LeftBrace) {
            Some(self.parse_block()?)
        } else {
            return Err(self.error_expected("'{' or ';'"));
        };

        Ok(FunctionDecl {
            name,
            return_type,
            params,
            body,
            span: self.span_from(start),
        })
    }

    /// params := "void" | ε | "int" ident ("," "int" ident)*
    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        if self.is_token(&TokenKind::RightParen) {
            return Ok(Vec::new());
        }
        if self.is_token(&TokenKind::Void) && self.peek_kind(0) == Some(&TokenKind::RightParen) {
            self.advance();
            return Ok(Vec::new());
        }

        let mut params = Vec::new();
        loop {
            let start = self.current_span();
            self.expect(&TokenKind::Int)?;
            let (name, _) = self.expect_identifier()?;
            params.push(Param {
                name,
                span: self.span_from(start),
            });
            if self.accept(&TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(params)
    }

    /// block := "{" block_item* "}"
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace)?;

        let mut items = Vec::new();
        while !self.is_token(&TokenKind::RightBrace) {
            if matches!(self.current_kind(), Some(TokenKind::EndOfFile) | None) {
                return Err(self.error_expected("'}'"));
            }
            items.push(statements::parse_block_item(self)?);
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Block {
            items,
            span: self.span_from(start),
        })
    }
}

/// Parse a token stream ending in `EndOfFile` into a program
pub fn parse(tokens: &[Token]) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}
