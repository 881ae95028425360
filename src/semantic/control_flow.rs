//! Return-path analysis over the AST.

use crate::ast::{Block, Expr, ExprKind, Stmt, StmtKind};

/// True when control cannot fall off the end of `block`
pub fn block_always_returns(block: &Block) -> bool {
    block.items.iter().any(always_returns)
}

/// True when every path through `stmt` ends in a `return` or never terminates
pub fn always_returns(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Compound(block) => block_always_returns(block),
        StmtKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => always_returns(then_branch) && always_returns(else_branch),
        StmtKind::DoWhile { body, condition } => {
            always_returns(body) || (is_always_true(Some(condition)) && !breaks_out(body))
        }
        StmtKind::While { condition, body } => is_always_true(Some(condition)) && !breaks_out(body),
        StmtKind::For { condition, body, .. } => is_always_true(condition.as_ref()) && !breaks_out(body),
        _ => false,
    }
}

/// A missing condition or a non-zero constant
fn is_always_true(condition: Option<&Expr>) -> bool {
    match condition {
        None => true,
        Some(expr) => matches!(expr.kind, ExprKind::IntLiteral(value) if value != 0),
    }
}

/// Whether `stmt` contains a `break` that leaves the enclosing loop.
/// Nested loops own their breaks.
fn breaks_out(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::Compound(block) => block.items.iter().any(breaks_out),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => breaks_out(then_branch) || else_branch.as_deref().is_some_and(breaks_out),
        _ => false,
    }
}
