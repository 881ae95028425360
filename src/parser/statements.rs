//! Statement parsing module
//!
//! This module handles block items, local declarations and all control flow
//! statements.

use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::lexer::TokenKind;
use log::debug;

use super::Parser;
use super::expressions::parse_expr_min;

/// block_item := declaration | statement
pub fn parse_block_item(parser: &mut Parser) -> Result<Stmt, ParseError> {
    if parser.is_token(&TokenKind::Int) {
        let decl = parse_declaration(parser)?;
        let span = decl.span;
        return Ok(Stmt::new(StmtKind::Declaration(decl), span));
    }
    parse_statement(parser)
}

/// declaration := "int" ident ["=" expr] ";"
pub fn parse_declaration(parser: &mut Parser) -> Result<VarDecl, ParseError> {
    let start = parser.current_span();
    parser.expect(&TokenKind::Int)?;
    let (name, _) = parser.expect_identifier()?;
    debug!("parse_declaration: {}", name);

    let init = if parser.accept(&TokenKind::Assign).is_some() {
        Some(parse_expr_min(parser)?)
    } else {
        None
    };
    parser.expect(&TokenKind::Semicolon)?;

    Ok(VarDecl {
        name,
        init,
        span: parser.span_from(start),
    })
}

/// Parse a statement
pub fn parse_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let Some(kind) = parser.current_kind() else {
        return Err(parser.error_expected("statement"));
    };

    match kind {
        TokenKind::LeftBrace => {
            let block = parser.parse_block()?;
            let span = block.span;
            Ok(Stmt::new(StmtKind::Compound(block), span))
        }
        TokenKind::Return => parse_return_statement(parser),
        TokenKind::If => parse_if_statement(parser),
        TokenKind::While => parse_while_statement(parser),
        TokenKind::Do => parse_do_while_statement(parser),
        TokenKind::For => parse_for_statement(parser),
        TokenKind::Break => parse_jump_statement(parser, StmtKind::Break),
        TokenKind::Continue => parse_jump_statement(parser, StmtKind::Continue),
        TokenKind::Semicolon => {
            let span = parser.current_span();
            parser.advance();
            Ok(Stmt::new(StmtKind::Null, span))
        }
        TokenKind::EndOfFile => Err(parser.error_expected("statement")),
        _ => parse_expression_statement(parser),
    }
}

fn parse_return_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    parser.expect(&TokenKind::Return)?;

    let value = if parser.is_token(&TokenKind::Semicolon) {
        None
    } else {
        Some(parse_expr_min(parser)?)
    };
    parser.expect(&TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::Return(value), parser.span_from(start)))
}

/// `else` binds to the nearest unmatched `if`
fn parse_if_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    parser.expect(&TokenKind::If)?;
    parser.expect(&TokenKind::LeftParen)?;
    let condition = parse_expr_min(parser)?;
    parser.expect(&TokenKind::RightParen)?;

    let then_branch = Box::new(parse_statement(parser)?);
    let else_branch = if parser.accept(&TokenKind::Else).is_some() {
        Some(Box::new(parse_statement(parser)?))
    } else {
        None
    };

    Ok(Stmt::new(
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        },
        parser.span_from(start),
    ))
}

fn parse_while_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    parser.expect(&TokenKind::While)?;
    parser.expect(&TokenKind::LeftParen)?;
    let condition = parse_expr_min(parser)?;
    parser.expect(&TokenKind::RightParen)?;
    let body = Box::new(parse_statement(parser)?);

    Ok(Stmt::new(StmtKind::While { condition, body }, parser.span_from(start)))
}

fn parse_do_while_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    parser.expect(&TokenKind::Do)?;
    let body = Box::new(parse_statement(parser)?);
    parser.expect(&TokenKind::While)?;
    parser.expect(&TokenKind::LeftParen)?;
    let condition = parse_expr_min(parser)?;
    parser.expect(&TokenKind::RightParen)?;
    parser.expect(&TokenKind::Semicolon)?;

    Ok(Stmt::new(StmtKind::DoWhile { body, condition }, parser.span_from(start)))
}

/// for := "for" "(" (declaration | [expr] ";") [expr] ";" [expr] ")" statement
fn parse_for_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    parser.expect(&TokenKind::For)?;
    parser.expect(&TokenKind::LeftParen)?;

    let init = if parser.is_token(&TokenKind::Int) {
        ForInit::Declaration(parse_declaration(parser)?)
    } else {
        let expr = parse_optional_expression(parser, &TokenKind::Semicolon)?;
        parser.expect(&TokenKind::Semicolon)?;
        ForInit::Expression(expr)
    };

    let condition = parse_optional_expression(parser, &TokenKind::Semicolon)?;
    parser.expect(&TokenKind::Semicolon)?;
    let post = parse_optional_expression(parser, &TokenKind::RightParen)?;
    parser.expect(&TokenKind::RightParen)?;

    let body = Box::new(parse_statement(parser)?);

    Ok(Stmt::new(
        StmtKind::For {
            init,
            condition,
            post,
            body,
        },
        parser.span_from(start),
    ))
}

fn parse_optional_expression(parser: &mut Parser, terminator: &TokenKind) -> Result<Option<Expr>, ParseError> {
    if parser.is_token(terminator) {
        Ok(None)
    } else {
        parse_expr_min(parser).map(Some)
    }
}

/// `break ;` and `continue ;`
fn parse_jump_statement(parser: &mut Parser, kind: StmtKind) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    parser.advance();
    parser.expect(&TokenKind::Semicolon)?;
    Ok(Stmt::new(kind, parser.span_from(start)))
}

fn parse_expression_statement(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.current_span();
    let expr = parse_expr_min(parser)?;
    parser.expect(&TokenKind::Semicolon)?;
    Ok(Stmt::new(StmtKind::Expression(expr), parser.span_from(start)))
}
