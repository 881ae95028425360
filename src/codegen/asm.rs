//! Assembly-level data model.
//!
//! Operands start out as [`Operand::Pseudo`] references to IR temps and are
//! rewritten to frame slots by [`super::frame`] before emission.

use crate::ir::TempId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    AX,
    CX,
    DX,
    DI,
    SI,
    R8,
    R9,
    R10,
    R11,
}

/// System V AMD64 integer argument registers, in order
pub const ARG_REGISTERS: [Reg; 6] = [Reg::DI, Reg::SI, Reg::DX, Reg::CX, Reg::R8, Reg::R9];

impl Reg {
    /// 32-bit name
    pub fn name32(self) -> &'static str {
        match self {
            Reg::AX => "%eax",
            Reg::CX => "%ecx",
            Reg::DX => "%edx",
            Reg::DI => "%edi",
            Reg::SI => "%esi",
            Reg::R8 => "%r8d",
            Reg::R9 => "%r9d",
            Reg::R10 => "%r10d",
            Reg::R11 => "%r11d",
        }
    }

    pub fn name64(self) -> &'static str {
        match self {
            Reg::AX => "%rax",
            Reg::CX => "%rcx",
            Reg::DX => "%rdx",
            Reg::DI => "%rdi",
            Reg::SI => "%rsi",
            Reg::R8 => "%r8",
            Reg::R9 => "%r9",
            Reg::R10 => "%r10",
            Reg::R11 => "%r11",
        }
    }

    pub fn name8(self) -> &'static str {
        match self {
            Reg::AX => "%al",
            Reg::CX => "%cl",
            Reg::DX => "%dl",
            Reg::DI => "%dil",
            Reg::SI => "%sil",
            Reg::R8 => "%r8b",
            Reg::R9 => "%r9b",
            Reg::R10 => "%r10b",
            Reg::R11 => "%r11b",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Imm(i32),
    Reg(Reg),
    Pseudo(TempId),
    /// Offset from `%rbp`
    Stack(i32),
}

impl Operand {
    pub fn is_memory(self) -> bool {
        matches!(self, Operand::Stack(_) | Operand::Pseudo(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mult,
    And,
    Or,
    Xor,
    Shl,
    Sar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondCode {
    E,
    NE,
    L,
    LE,
    G,
    GE,
}

impl CondCode {
    pub fn suffix(self) -> &'static str {
        match self {
            CondCode::E => "e",
            CondCode::NE => "ne",
            CondCode::L => "l",
            CondCode::LE => "le",
            CondCode::G => "g",
            CondCode::GE => "ge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmInstruction {
    Mov { src: Operand, dst: Operand },
    Unary { op: UnaryOperator, operand: Operand },
    Binary { op: BinaryOperator, src: Operand, dst: Operand },
    /// Sets flags from `dst - src`
    Cmp { src: Operand, dst: Operand },
    Idiv(Operand),
    Cdq,
    /// Target is a function-qualified label name without the local prefix
    Jmp(String),
    JmpCC(CondCode, String),
    SetCC(CondCode, Operand),
    Label(String),
    AllocateStack(u32),
    DeallocateStack(u32),
    Push(Operand),
    Call(String),
    /// Epilogue and return
    Ret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmFunction {
    pub name: String,
    pub global: bool,
    pub frame_size: u32,
    pub instructions: Vec<AsmInstruction>,
}

/// Target platform conventions for symbol naming and sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Linux,
    MacOs,
}

impl Target {
    pub fn host() -> Self {
        if cfg!(target_os = "macos") { Target::MacOs } else { Target::Linux }
    }

    pub fn symbol_prefix(self) -> &'static str {
        match self {
            Target::Linux => "",
            Target::MacOs => "_",
        }
    }

    pub fn local_label_prefix(self) -> &'static str {
        match self {
            Target::Linux => ".L",
            Target::MacOs => "L",
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::host()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmProgram {
    pub functions: Vec<AsmFunction>,
    pub target: Target,
}

impl AsmProgram {
    pub fn defines(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }
}
