//! Expression parsing module
//!
//! Binary, assignment and conditional operators are parsed by precedence
//! climbing over a binding-power table; unary, postfix and primary
//! expressions by plain recursive descent.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::diagnostic::ParseError;
use crate::lexer::{Token, TokenKind};
use log::trace;

use super::Parser;

/// Binding power for operator precedence, higher binds tighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BindingPower(u8);

impl BindingPower {
    pub const MIN: Self = Self(0);
    pub const ASSIGNMENT: Self = Self(1);
    pub const CONDITIONAL: Self = Self(2);
    pub const LOGICAL_OR: Self = Self(3);
    pub const LOGICAL_AND: Self = Self(4);
    pub const BITWISE_OR: Self = Self(5);
    pub const BITWISE_XOR: Self = Self(6);
    pub const BITWISE_AND: Self = Self(7);
    pub const EQUALITY: Self = Self(8);
    pub const RELATIONAL: Self = Self(9);
    pub const SHIFT: Self = Self(10);
    pub const ADDITIVE: Self = Self(11);
    pub const MULTIPLICATIVE: Self = Self(12);

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Binding power and associativity of an infix operator token
pub fn get_binding_power(token_kind: &TokenKind) -> Option<(BindingPower, Associativity)> {
    let entry = match token_kind {
        kind if kind.is_assignment() => (BindingPower::ASSIGNMENT, Associativity::Right),
        TokenKind::Question => (BindingPower::CONDITIONAL, Associativity::Right),
        TokenKind::LogicOr => (BindingPower::LOGICAL_OR, Associativity::Left),
        TokenKind::LogicAnd => (BindingPower::LOGICAL_AND, Associativity::Left),
        TokenKind::Or => (BindingPower::BITWISE_OR, Associativity::Left),
        TokenKind::Xor => (BindingPower::BITWISE_XOR, Associativity::Left),
        TokenKind::And => (BindingPower::BITWISE_AND, Associativity::Left),
        TokenKind::Equal | TokenKind::NotEqual => (BindingPower::EQUALITY, Associativity::Left),
        TokenKind::Less | TokenKind::Greater | TokenKind::LessEqual | TokenKind::GreaterEqual => {
            (BindingPower::RELATIONAL, Associativity::Left)
        }
        TokenKind::LeftShift | TokenKind::RightShift => (BindingPower::SHIFT, Associativity::Left),
        TokenKind::Plus | TokenKind::Minus => (BindingPower::ADDITIVE, Associativity::Left),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => {
            (BindingPower::MULTIPLICATIVE, Associativity::Left)
        }
        _ => return None,
    };
    Some(entry)
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus | TokenKind::PlusAssign => BinaryOp::Add,
        TokenKind::Minus | TokenKind::MinusAssign => BinaryOp::Sub,
        TokenKind::Star | TokenKind::StarAssign => BinaryOp::Mul,
        TokenKind::Slash | TokenKind::DivAssign => BinaryOp::Div,
        TokenKind::Percent | TokenKind::ModAssign => BinaryOp::Mod,
        TokenKind::And | TokenKind::AndAssign => BinaryOp::BitAnd,
        TokenKind::Or | TokenKind::OrAssign => BinaryOp::BitOr,
        TokenKind::Xor | TokenKind::XorAssign => BinaryOp::BitXor,
        TokenKind::LeftShift | TokenKind::LeftShiftAssign => BinaryOp::LShift,
        TokenKind::RightShift | TokenKind::RightShiftAssign => BinaryOp::RShift,
        TokenKind::Equal => BinaryOp::Equal,
        TokenKind::NotEqual => BinaryOp::NotEqual,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::LogicAnd => BinaryOp::LogicAnd,
        TokenKind::LogicOr => BinaryOp::LogicOr,
        _ => return None,
    };
    Some(op)
}

/// Parse a full expression
pub fn parse_expr_min(parser: &mut Parser) -> Result<Expr, ParseError> {
    parse_expression(parser, BindingPower::MIN)
}

/// Precedence climbing: parse operators binding at least as tightly as `min_binding_power`
pub fn parse_expression(parser: &mut Parser, min_binding_power: BindingPower) -> Result<Expr, ParseError> {
    let mut left = parse_unary(parser)?;

    while let Some(current) = parser.try_current_token() {
        let Some((binding_power, associativity)) = get_binding_power(&current.kind) else {
            break;
        };
        if binding_power < min_binding_power {
            break;
        }

        let next_min_bp = match associativity {
            Associativity::Right => binding_power,
            Associativity::Left => binding_power.next(),
        };

        parser.advance();
        trace!("parse_expression: infix {:?} at bp {:?}", current.kind, binding_power);
        left = parse_infix(parser, left, current, next_min_bp)?;
    }

    Ok(left)
}

fn parse_infix(parser: &mut Parser, left: Expr, operator: &Token, next_min_bp: BindingPower) -> Result<Expr, ParseError> {
    if operator.kind == TokenKind::Question {
        let then_expr = parse_expr_min(parser)?;
        parser.expect(&TokenKind::Colon)?;
        let else_expr = parse_expression(parser, next_min_bp)?;
        let span = left.span.merge(else_expr.span);
        return Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(left),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ));
    }

    let right = parse_expression(parser, next_min_bp)?;
    let span = left.span.merge(right.span);

    let kind = if operator.kind.is_assignment() {
        ExprKind::Assignment {
            op: binary_op(&operator.kind),
            target: Box::new(left),
            value: Box::new(right),
        }
    } else {
        let op = binary_op(&operator.kind).ok_or_else(|| parser.error_expected("binary operator"))?;
        ExprKind::Binary {
            op,
            lhs: Box::new(left),
            rhs: Box::new(right),
        }
    };
    Ok(Expr::new(kind, span))
}

/// unary := ("-" | "+" | "~" | "!" | "++" | "--") unary | postfix
fn parse_unary(parser: &mut Parser) -> Result<Expr, ParseError> {
    let Some(token) = parser.try_current_token() else {
        return Err(parser.error_expected("expression"));
    };

    let op = match token.kind {
        TokenKind::Minus => UnaryOp::Negate,
        TokenKind::Plus => UnaryOp::Plus,
        TokenKind::Tilde => UnaryOp::Complement,
        TokenKind::Not => UnaryOp::LogicNot,
        TokenKind::Increment => UnaryOp::PreIncrement,
        TokenKind::Decrement => UnaryOp::PreDecrement,
        _ => return parse_postfix(parser),
    };

    parser.advance();
    let operand = parse_unary(parser)?;
    let span = token.span.merge(operand.span);
    Ok(Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    ))
}

/// postfix := primary ("++" | "--")*
fn parse_postfix(parser: &mut Parser) -> Result<Expr, ParseError> {
    let mut expr = parse_primary(parser)?;
    loop {
        let op = if parser.accept(&TokenKind::Increment).is_some() {
            UnaryOp::PostIncrement
        } else if parser.accept(&TokenKind::Decrement).is_some() {
            UnaryOp::PostDecrement
        } else {
            return Ok(expr);
        };
        let span = parser.span_from(expr.span);
        expr = Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(expr),
            },
            span,
        );
    }
}

/// primary := constant | identifier | identifier "(" args ")" | "(" expr ")"
fn parse_primary(parser: &mut Parser) -> Result<Expr, ParseError> {
    let Some(token) = parser.try_current_token() else {
        return Err(parser.error_expected("expression"));
    };

    match &token.kind {
        TokenKind::IntegerConstant(digits) => {
            let value = digits.parse::<i32>().map_err(|_| ParseError::IntegerOutOfRange {
                text: digits.clone(),
                location: token.span,
            })?;
            parser.advance();
            Ok(Expr::new(ExprKind::IntLiteral(value), token.span))
        }
        TokenKind::Identifier(name) => {
            parser.advance();
            if parser.accept(&TokenKind::LeftParen).is_some() {
                let args = parse_call_arguments(parser)?;
                parser.expect(&TokenKind::RightParen)?;
                Ok(Expr::new(
                    ExprKind::FunctionCall {
                        name: name.clone(),
                        args,
                    },
                    parser.span_from(token.span),
                ))
            } else {
                Ok(Expr::new(ExprKind::Variable(name.clone()), token.span))
            }
        }
        TokenKind::LeftParen => {
            parser.advance();
            let inner = parse_expr_min(parser)?;
            parser.expect(&TokenKind::RightParen)?;
            // keep the parenthesized node as is; only its span grows
            Ok(Expr::new(inner.kind, parser.span_from(token.span)))
        }
        _ => Err(parser.error_expected("expression")),
    }
}

/// args := ε | expr ("," expr)*
fn parse_call_arguments(parser: &mut Parser) -> Result<Vec<Expr>, ParseError> {
    let mut args = Vec::new();
    if parser.is_token(&TokenKind::RightParen) {
        return Ok(args);
    }
    loop {
        args.push(parse_expression(parser, BindingPower::ASSIGNMENT)?);
        if parser.accept(&TokenKind::Comma).is_none() {
            return Ok(args);
        }
    }
}
