//! Three-address intermediate representation.
//!
//! Lowering produces one [`IrFunction`] per function definition. Every value
//! is either a 32-bit constant or a temp owned by the function; control flow
//! is explicit labels and jumps. The `Display` impls render a stable textual
//! dump used by tests and `--codegen` debugging.

use serde::Serialize;
use std::fmt;

pub mod validation;

#[cfg(test)]
mod tests_validation;

/// Index into [`IrFunction::temps`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TempId(pub u32);

impl TempId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a temp stands for in the source program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TempKind {
    Param,
    /// A uniquified local variable, may be read before it is written
    Variable,
    /// Compiler-introduced intermediate value
    Temporary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TempDecl {
    pub name: String,
    pub kind: TempKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Value {
    Constant(i32),
    Temp(TempId),
}

/// Jump target, numbered per function; `hint` only makes dumps readable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Label {
    pub id: u32,
    pub hint: &'static str,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.hint, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Negate,
    Complement,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Instruction {
    Return(Option<Value>),
    Unary {
        op: UnaryOp,
        src: Value,
        dst: TempId,
    },
    Binary {
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        dst: TempId,
    },
    Copy {
        src: Value,
        dst: TempId,
    },
    Jump(Label),
    JumpIfZero {
        cond: Value,
        target: Label,
    },
    JumpIfNotZero {
        cond: Value,
        target: Label,
    },
    Label(Label),
    /// `dst` is `None` for calls whose result is discarded or void
    FunctionCall {
        name: String,
        args: Vec<Value>,
        dst: Option<TempId>,
    },
}

impl Instruction {
    /// Temp written by this instruction, if any
    pub fn destination(&self) -> Option<TempId> {
        match self {
            Instruction::Unary { dst, .. } | Instruction::Binary { dst, .. } | Instruction::Copy { dst, .. } => {
                Some(*dst)
            }
            Instruction::FunctionCall { dst, .. } => *dst,
            _ => None,
        }
    }

    /// Values read by this instruction, in operand order
    pub fn sources(&self) -> Vec<Value> {
        match self {
            Instruction::Return(value) => value.iter().copied().collect(),
            Instruction::Unary { src, .. } | Instruction::Copy { src, .. } => vec![*src],
            Instruction::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Instruction::JumpIfZero { cond, .. } | Instruction::JumpIfNotZero { cond, .. } => vec![*cond],
            Instruction::FunctionCall { args, .. } => args.clone(),
            Instruction::Jump(_) | Instruction::Label(_) => Vec::new(),
        }
    }

    /// Label this instruction may transfer control to
    pub fn jump_target(&self) -> Option<Label> {
        match self {
            Instruction::Jump(target)
            | Instruction::JumpIfZero { target, .. }
            | Instruction::JumpIfNotZero { target, .. } => Some(*target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<TempId>,
    pub temps: Vec<TempDecl>,
    pub body: Vec<Instruction>,
}

impl IrFunction {
    pub fn new(name: impl Into<String>) -> Self {
        IrFunction {
            name: name.into(),
            params: Vec::new(),
            temps: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Register a new temp and return its id
    pub fn add_temp(&mut self, name: String, kind: TempKind) -> TempId {
        let id = TempId(self.temps.len() as u32);
        self.temps.push(TempDecl { name, kind });
        id
    }

    pub fn temp(&self, id: TempId) -> Option<&TempDecl> {
        self.temps.get(id.index())
    }

    fn temp_name(&self, id: TempId) -> String {
        match self.temp(id) {
            Some(decl) => decl.name.clone(),
            None => format!("<invalid temp {}>", id.0),
        }
    }

    fn value_name(&self, value: Value) -> String {
        match value {
            Value::Constant(c) => c.to_string(),
            Value::Temp(id) => self.temp_name(id),
        }
    }

    fn fmt_instruction(&self, f: &mut fmt::Formatter<'_>, instruction: &Instruction) -> fmt::Result {
        match instruction {
            Instruction::Return(Some(value)) => writeln!(f, "    return {}", self.value_name(*value)),
            Instruction::Return(None) => writeln!(f, "    return"),
            Instruction::Unary { op, src, dst } => {
                let symbol = match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::Complement => "~",
                    UnaryOp::Not => "!",
                };
                writeln!(f, "    {} = {}{}", self.temp_name(*dst), symbol, self.value_name(*src))
            }
            Instruction::Binary { op, lhs, rhs, dst } => writeln!(
                f,
                "    {} = {} {} {}",
                self.temp_name(*dst),
                self.value_name(*lhs),
                op.symbol(),
                self.value_name(*rhs)
            ),
            Instruction::Copy { src, dst } => {
                writeln!(f, "    {} = {}", self.temp_name(*dst), self.value_name(*src))
            }
            Instruction::Jump(target) => writeln!(f, "    jump {}", target),
            Instruction::JumpIfZero { cond, target } => {
                writeln!(f, "    jump_if_zero {}, {}", self.value_name(*cond), target)
            }
            Instruction::JumpIfNotZero { cond, target } => {
                writeln!(f, "    jump_if_not_zero {}, {}", self.value_name(*cond), target)
            }
            Instruction::Label(label) => writeln!(f, "  {}:", label),
            Instruction::FunctionCall { name, args, dst } => {
                let args: Vec<String> = args.iter().map(|a| self.value_name(*a)).collect();
                match dst {
                    Some(dst) => writeln!(f, "    {} = call {}({})", self.temp_name(*dst), name, args.join(", ")),
                    None => writeln!(f, "    call {}({})", name, args.join(", ")),
                }
            }
        }
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| self.temp_name(*p)).collect();
        writeln!(f, "function {}({}) {{", self.name, params.join(", "))?;
        for instruction in &self.body {
            self.fmt_instruction(f, instruction)?;
        }
        writeln!(f, "}}")
    }
}

/// Lowered translation unit, functions in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IrProgram {
    pub functions: Vec<IrFunction>,
}

impl IrProgram {
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}
