//! AST to IR lowering.
//!
//! One pass over the tree resolves every name, rejects invalid programs with
//! the first [`SemanticError`] found, and emits three-address instructions.
//! Locals get program-unique names (`x.3`) from a single counter so that
//! shadowed variables stay distinct in the IR; compiler temporaries draw
//! from the same counter (`tmp.4`). Labels are numbered per function.

use log::debug;

use crate::ast::{
    self, Block, Expr, ExprKind, ForInit, FunctionDecl, Program, ReturnType, Stmt, StmtKind, UnaryOp, VarDecl,
};
use crate::diagnostic::SemanticError;
use crate::ir::{self, Instruction, IrFunction, IrProgram, Label, TempId, TempKind, Value};
use crate::source_manager::SourceSpan;

use super::control_flow::block_always_returns;
use super::symbol_table::{SymbolTable, VarInfo};

/// Lower a whole program, stopping at the first error
pub fn lower(program: &Program) -> Result<IrProgram, SemanticError> {
    Lowerer::new().lower_program(program)
}

#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    break_label: Label,
    continue_label: Label,
}

/// State of the lowering pass
pub struct Lowerer {
    symbols: SymbolTable,
    name_counter: u32,
    // per-function state
    function: IrFunction,
    return_type: ReturnType,
    label_counter: u32,
    loops: Vec<LoopLabels>,
}

impl Default for Lowerer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lowerer {
    pub fn new() -> Self {
        Lowerer {
            symbols: SymbolTable::new(),
            name_counter: 0,
            function: IrFunction::new(""),
            return_type: ReturnType::Int,
            label_counter: 0,
            loops: Vec::new(),
        }
    }

    pub fn lower_program(&mut self, program: &Program) -> Result<IrProgram, SemanticError> {
        let mut functions = Vec::new();
        for decl in &program.functions {
            self.symbols.declare_function(decl)?;
            if let Some(body) = &decl.body {
                functions.push(self.lower_function(decl, body)?);
            }
        }
        debug!("lower_program: lowered {} function(s)", functions.len());
        Ok(IrProgram { functions })
    }

    fn lower_function(&mut self, decl: &FunctionDecl, body: &Block) -> Result<IrFunction, SemanticError> {
        debug!("lower_function: {}", decl.name);
        self.function = IrFunction::new(decl.name.as_str());
        self.return_type = decl.return_type;
        self.label_counter = 0;
        self.loops.clear();

        // parameters and the outermost block share one scope
        self.symbols.push_scope();
        for param in &decl.params {
            let temp = self.declare_local(&param.name, param.span, TempKind::Param)?;
            self.function.params.push(temp);
        }
        for item in &body.items {
            self.lower_statement(item)?;
        }
        self.symbols.pop_scope();

        if !block_always_returns(body) {
            match decl.return_type {
                ReturnType::Void => self.emit(Instruction::Return(None)),
                ReturnType::Int if decl.name == "main" => self.emit(Instruction::Return(Some(Value::Constant(0)))),
                ReturnType::Int => {
                    return Err(SemanticError::MissingReturn {
                        name: decl.name.clone(),
                        location: decl.span,
                    });
                }
            }
        }

        Ok(std::mem::replace(&mut self.function, IrFunction::new("")))
    }

    fn emit(&mut self, instruction: Instruction) {
        self.function.body.push(instruction);
    }

    fn next_name_id(&mut self) -> u32 {
        let id = self.name_counter;
        self.name_counter += 1;
        id
    }

    fn make_temporary(&mut self) -> TempId {
        let name = format!("tmp.{}", self.next_name_id());
        self.function.add_temp(name, TempKind::Temporary)
    }

    fn make_label(&mut self, hint: &'static str) -> Label {
        let id = self.label_counter;
        self.label_counter += 1;
        Label { id, hint }
    }

    fn declare_local(&mut self, name: &str, span: SourceSpan, kind: TempKind) -> Result<TempId, SemanticError> {
        let unique_name = format!("{}.{}", name, self.next_name_id());
        let temp = self.function.add_temp(unique_name.clone(), kind);
        self.symbols.declare_variable(name, VarInfo { unique_name, temp, span })?;
        Ok(temp)
    }

    fn lower_block(&mut self, block: &Block) -> Result<(), SemanticError> {
        self.symbols.push_scope();
        for item in &block.items {
            self.lower_statement(item)?;
        }
        self.symbols.pop_scope();
        Ok(())
    }

    fn lower_declaration(&mut self, decl: &VarDecl) -> Result<(), SemanticError> {
        // the name is in scope inside its own initializer
        let temp = self.declare_local(&decl.name, decl.span, TempKind::Variable)?;
        if let Some(init) = &decl.init {
            let src = self.lower_expr(init)?;
            self.emit(Instruction::Copy { src, dst: temp });
        }
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &Stmt) -> Result<(), SemanticError> {
        match &stmt.kind {
            StmtKind::Return(value) => self.lower_return(value.as_ref(), stmt.span),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch.as_deref()),
            StmtKind::While { condition, body } => self.lower_while(condition, body),
            StmtKind::DoWhile { body, condition } => self.lower_do_while(body, condition),
            StmtKind::For {
                init,
                condition,
                post,
                body,
            } => self.lower_for(init, condition.as_ref(), post.as_ref(), body),
            StmtKind::Compound(block) => self.lower_block(block),
            StmtKind::Expression(expr) => self.lower_discarded(expr),
            StmtKind::Declaration(decl) => self.lower_declaration(decl),
            StmtKind::Break => {
                let target = self.innermost_loop("break", stmt.span)?.break_label;
                self.emit(Instruction::Jump(target));
                Ok(())
            }
            StmtKind::Continue => {
                let target = self.innermost_loop("continue", stmt.span)?.continue_label;
                self.emit(Instruction::Jump(target));
                Ok(())
            }
            StmtKind::Null => Ok(()),
        }
    }

    fn innermost_loop(&self, keyword: &'static str, location: SourceSpan) -> Result<LoopLabels, SemanticError> {
        self.loops
            .last()
            .copied()
            .ok_or(SemanticError::InvalidBreakOrContinue { keyword, location })
    }

    fn lower_return(&mut self, value: Option<&Expr>, location: SourceSpan) -> Result<(), SemanticError> {
        match (value, self.return_type) {
            (Some(expr), ReturnType::Int) => {
                let value = self.lower_expr(expr)?;
                self.emit(Instruction::Return(Some(value)));
                Ok(())
            }
            (None, ReturnType::Void) => {
                self.emit(Instruction::Return(None));
                Ok(())
            }
            _ => Err(SemanticError::ReturnValueMismatch {
                name: self.function.name.clone(),
                location,
            }),
        }
    }

    fn lower_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> Result<(), SemanticError> {
        let else_label = self.make_label("if_else");
        let end_label = self.make_label("if_end");

        let cond = self.lower_expr(condition)?;
        match else_branch {
            None => {
                self.emit(Instruction::JumpIfZero { cond, target: end_label });
                self.lower_statement(then_branch)?;
            }
            Some(else_branch) => {
                self.emit(Instruction::JumpIfZero { cond, target: else_label });
                self.lower_statement(then_branch)?;
                self.emit(Instruction::Jump(end_label));
                self.emit(Instruction::Label(else_label));
                self.lower_statement(else_branch)?;
            }
        }
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    fn lower_loop_body(&mut self, labels: LoopLabels, body: &Stmt) -> Result<(), SemanticError> {
        self.loops.push(labels);
        let result = self.lower_statement(body);
        self.loops.pop();
        result
    }

    fn lower_while(&mut self, condition: &Expr, body: &Stmt) -> Result<(), SemanticError> {
        let labels = LoopLabels {
            continue_label: self.make_label("while_continue"),
            break_label: self.make_label("while_break"),
        };

        self.emit(Instruction::Label(labels.continue_label));
        let cond = self.lower_expr(condition)?;
        self.emit(Instruction::JumpIfZero {
            cond,
            target: labels.break_label,
        });
        self.lower_loop_body(labels, body)?;
        self.emit(Instruction::Jump(labels.continue_label));
        self.emit(Instruction::Label(labels.break_label));
        Ok(())
    }

    fn lower_do_while(&mut self, body: &Stmt, condition: &Expr) -> Result<(), SemanticError> {
        let start_label = self.make_label("do_start");
        let labels = LoopLabels {
            continue_label: self.make_label("do_continue"),
            break_label: self.make_label("do_break"),
        };

        self.emit(Instruction::Label(start_label));
        self.lower_loop_body(labels, body)?;
        self.emit(Instruction::Label(labels.continue_label));
        let cond = self.lower_expr(condition)?;
        self.emit(Instruction::JumpIfNotZero {
            cond,
            target: start_label,
        });
        self.emit(Instruction::Label(labels.break_label));
        Ok(())
    }

    fn lower_for(
        &mut self,
        init: &ForInit,
        condition: Option<&Expr>,
        post: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), SemanticError> {
        let start_label = self.make_label("for_start");
        let labels = LoopLabels {
            continue_label: self.make_label("for_continue"),
            break_label: self.make_label("for_break"),
        };

        // the init clause gets a scope of its own
        self.symbols.push_scope();
        match init {
            ForInit::Declaration(decl) => self.lower_declaration(decl)?,
            ForInit::Expression(Some(expr)) => self.lower_discarded(expr)?,
            ForInit::Expression(None) => {}
        }

        self.emit(Instruction::Label(start_label));
        if let Some(condition) = condition {
            let cond = self.lower_expr(condition)?;
            self.emit(Instruction::JumpIfZero {
                cond,
                target: labels.break_label,
            });
        }
        self.lower_loop_body(labels, body)?;
        self.emit(Instruction::Label(labels.continue_label));
        if let Some(post) = post {
            self.lower_discarded(post)?;
        }
        self.emit(Instruction::Jump(start_label));
        self.emit(Instruction::Label(labels.break_label));

        self.symbols.pop_scope();
        Ok(())
    }

    /// Lower an expression evaluated for its side effects only
    fn lower_discarded(&mut self, expr: &Expr) -> Result<(), SemanticError> {
        match &expr.kind {
            ExprKind::FunctionCall { name, args } => self.lower_call(name, args, expr.span, false).map(|_| ()),
            _ => self.lower_expr(expr).map(|_| ()),
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<Value, SemanticError> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => Ok(Value::Constant(*value)),
            ExprKind::Variable(name) => self.resolve_variable(name, expr.span).map(Value::Temp),
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand),
            ExprKind::Binary { op, lhs, rhs } => match op {
                ast::BinaryOp::LogicAnd => self.lower_short_circuit(lhs, rhs, true),
                ast::BinaryOp::LogicOr => self.lower_short_circuit(lhs, rhs, false),
                _ => {
                    let lhs = self.lower_expr(lhs)?;
                    let rhs = self.lower_expr(rhs)?;
                    let dst = self.make_temporary();
                    self.emit(Instruction::Binary {
                        op: convert_binary_op(*op),
                        lhs,
                        rhs,
                        dst,
                    });
                    Ok(Value::Temp(dst))
                }
            },
            ExprKind::Assignment { op, target, value } => self.lower_assignment(*op, target, value),
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => self.lower_conditional(condition, then_expr, else_expr),
            ExprKind::FunctionCall { name, args } => match self.lower_call(name, args, expr.span, true)? {
                Some(value) => Ok(value),
                None => Err(SemanticError::VoidValueUsed {
                    name: name.clone(),
                    location: expr.span,
                }),
            },
        }
    }

    fn resolve_variable(&self, name: &str, location: SourceSpan) -> Result<TempId, SemanticError> {
        self.symbols
            .lookup_variable(name)
            .map(|info| info.temp)
            .ok_or_else(|| SemanticError::UndeclaredVariable {
                name: name.to_string(),
                location,
            })
    }

    /// The temp an assignment or `++`/`--` writes to
    fn lower_lvalue(&self, target: &Expr) -> Result<TempId, SemanticError> {
        match &target.kind {
            ExprKind::Variable(name) => self.resolve_variable(name, target.span),
            _ => Err(SemanticError::InvalidLvalue { location: target.span }),
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, SemanticError> {
        let ir_op = match op {
            UnaryOp::Plus => return self.lower_expr(operand),
            UnaryOp::Negate => ir::UnaryOp::Negate,
            UnaryOp::Complement => ir::UnaryOp::Complement,
            UnaryOp::LogicNot => ir::UnaryOp::Not,
            UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                return self.lower_update(op, operand);
            }
        };
        let src = self.lower_expr(operand)?;
        let dst = self.make_temporary();
        self.emit(Instruction::Unary { op: ir_op, src, dst });
        Ok(Value::Temp(dst))
    }

    /// `++`/`--`: prefix yields the new value, postfix the old one
    fn lower_update(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, SemanticError> {
        let target = self.lower_lvalue(operand)?;
        let arith = match op {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => ir::BinaryOp::Add,
            _ => ir::BinaryOp::Subtract,
        };

        if matches!(op, UnaryOp::PostIncrement | UnaryOp::PostDecrement) {
            let old = self.make_temporary();
            self.emit(Instruction::Copy {
                src: Value::Temp(target),
                dst: old,
            });
            self.emit(Instruction::Binary {
                op: arith,
                lhs: Value::Temp(target),
                rhs: Value::Constant(1),
                dst: target,
            });
            Ok(Value::Temp(old))
        } else {
            let new = self.make_temporary();
            self.emit(Instruction::Binary {
                op: arith,
                lhs: Value::Temp(target),
                rhs: Value::Constant(1),
                dst: new,
            });
            self.emit(Instruction::Copy {
                src: Value::Temp(new),
                dst: target,
            });
            Ok(Value::Temp(new))
        }
    }

    /// `&&` when `is_and`, else `||`; the right operand only runs when needed
    fn lower_short_circuit(&mut self, lhs: &Expr, rhs: &Expr, is_and: bool) -> Result<Value, SemanticError> {
        let (short_label, end_label) = if is_and {
            (self.make_label("and_false"), self.make_label("and_end"))
        } else {
            (self.make_label("or_true"), self.make_label("or_end"))
        };
        let short_jump = |cond: Value| {
            if is_and {
                Instruction::JumpIfZero {
                    cond,
                    target: short_label,
                }
            } else {
                Instruction::JumpIfNotZero {
                    cond,
                    target: short_label,
                }
            }
        };

        let lhs = self.lower_expr(lhs)?;
        self.emit(short_jump(lhs));
        let rhs = self.lower_expr(rhs)?;
        self.emit(short_jump(rhs));

        let (fallthrough, shorted) = if is_and { (1, 0) } else { (0, 1) };
        let dst = self.make_temporary();
        self.emit(Instruction::Copy {
            src: Value::Constant(fallthrough),
            dst,
        });
        self.emit(Instruction::Jump(end_label));
        self.emit(Instruction::Label(short_label));
        self.emit(Instruction::Copy {
            src: Value::Constant(shorted),
            dst,
        });
        self.emit(Instruction::Label(end_label));
        Ok(Value::Temp(dst))
    }

    fn lower_assignment(
        &mut self,
        op: Option<ast::BinaryOp>,
        target: &Expr,
        value: &Expr,
    ) -> Result<Value, SemanticError> {
        let target = self.lower_lvalue(target)?;
        let src = self.lower_expr(value)?;
        match op {
            None => {
                self.emit(Instruction::Copy { src, dst: target });
                Ok(Value::Temp(target))
            }
            Some(op) => {
                let result = self.make_temporary();
                self.emit(Instruction::Binary {
                    op: convert_binary_op(op),
                    lhs: Value::Temp(target),
                    rhs: src,
                    dst: result,
                });
                self.emit(Instruction::Copy {
                    src: Value::Temp(result),
                    dst: target,
                });
                Ok(Value::Temp(result))
            }
        }
    }

    fn lower_conditional(&mut self, condition: &Expr, then_expr: &Expr, else_expr: &Expr) -> Result<Value, SemanticError> {
        let else_label = self.make_label("cond_else");
        let end_label = self.make_label("cond_end");

        let cond = self.lower_expr(condition)?;
        self.emit(Instruction::JumpIfZero { cond, target: else_label });
        let then_value = self.lower_expr(then_expr)?;
        let dst = self.make_temporary();
        self.emit(Instruction::Copy { src: then_value, dst });
        self.emit(Instruction::Jump(end_label));
        self.emit(Instruction::Label(else_label));
        let else_value = self.lower_expr(else_expr)?;
        self.emit(Instruction::Copy { src: else_value, dst });
        self.emit(Instruction::Label(end_label));
        Ok(Value::Temp(dst))
    }

    /// Returns `None` when the callee is void or the result is unused
    fn lower_call(
        &mut self,
        name: &str,
        args: &[Expr],
        location: SourceSpan,
        wants_value: bool,
    ) -> Result<Option<Value>, SemanticError> {
        if self.symbols.lookup_variable(name).is_some() {
            return Err(SemanticError::NotAFunction {
                name: name.to_string(),
                location,
            });
        }
        let Some(signature) = self.symbols.lookup_function(name) else {
            return Err(SemanticError::UndeclaredFunction {
                name: name.to_string(),
                location,
            });
        };
        if signature.param_count != args.len() {
            return Err(SemanticError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: signature.param_count,
                found: args.len(),
                location,
            });
        }
        let returns_value = signature.return_type == ReturnType::Int;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.lower_expr(arg)?);
        }

        let dst = (returns_value && wants_value).then(|| self.make_temporary());
        self.emit(Instruction::FunctionCall {
            name: name.to_string(),
            args: values,
            dst,
        });
        Ok(dst.map(Value::Temp))
    }
}

fn convert_binary_op(op: ast::BinaryOp) -> ir::BinaryOp {
    match op {
        ast::BinaryOp::Add => ir::BinaryOp::Add,
        ast::BinaryOp::Sub => ir::BinaryOp::Subtract,
        ast::BinaryOp::Mul => ir::BinaryOp::Multiply,
        ast::BinaryOp::Div => ir::BinaryOp::Divide,
        ast::BinaryOp::Mod => ir::BinaryOp::Remainder,
        ast::BinaryOp::BitAnd => ir::BinaryOp::BitAnd,
        ast::BinaryOp::BitOr => ir::BinaryOp::BitOr,
        ast::BinaryOp::BitXor => ir::BinaryOp::BitXor,
        ast::BinaryOp::LShift => ir::BinaryOp::ShiftLeft,
        ast::BinaryOp::RShift => ir::BinaryOp::ShiftRight,
        ast::BinaryOp::Equal => ir::BinaryOp::Equal,
        ast::BinaryOp::NotEqual => ir::BinaryOp::NotEqual,
        ast::BinaryOp::Less => ir::BinaryOp::Less,
        ast::BinaryOp::LessEqual => ir::BinaryOp::LessEqual,
        ast::BinaryOp::Greater => ir::BinaryOp::Greater,
        ast::BinaryOp::GreaterEqual => ir::BinaryOp::GreaterEqual,
        // short-circuit operators never reach here
        ast::BinaryOp::LogicAnd => ir::BinaryOp::BitAnd,
        ast::BinaryOp::LogicOr => ir::BinaryOp::BitOr,
    }
}
