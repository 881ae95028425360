//! AT&T syntax text emission.

use itertools::Itertools;

use super::asm::{AsmFunction, AsmInstruction, AsmProgram, BinaryOperator, Operand, Target, UnaryOperator};

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy)]
enum Width {
    Byte,
    Long,
    Quad,
}

fn operand(op: Operand, width: Width) -> String {
    match op {
        Operand::Imm(value) => format!("${}", value),
        Operand::Reg(reg) => match width {
            Width::Byte => reg.name8(),
            Width::Long => reg.name32(),
            Width::Quad => reg.name64(),
        }
        .to_string(),
        Operand::Stack(offset) => format!("{}(%rbp)", offset),
        Operand::Pseudo(id) => format!("pseudo.{}", id.0),
    }
}

fn long(op: Operand) -> String {
    operand(op, Width::Long)
}

struct Emitter<'a> {
    program: &'a AsmProgram,
    lines: Vec<String>,
}

impl<'a> Emitter<'a> {
    fn target(&self) -> Target {
        self.program.target
    }

    fn symbol(&self, name: &str) -> String {
        format!("{}{}", self.target().symbol_prefix(), name)
    }

    fn local_label(&self, name: &str) -> String {
        format!("{}{}", self.target().local_label_prefix(), name)
    }

    fn push(&mut self, text: String) {
        self.lines.push(format!("{}{}", INDENT, text));
    }

    fn emit_function(&mut self, function: &AsmFunction) {
        let symbol = self.symbol(&function.name);
        if function.global {
            self.push(format!(".globl {}", symbol));
        }
        self.lines.push(format!("{}:", symbol));
        self.push("pushq %rbp".to_string());
        self.push("movq %rsp, %rbp".to_string());
        if function.frame_size > 0 {
            self.push(format!("subq ${}, %rsp", function.frame_size));
        }
        for instruction in &function.instructions {
            self.emit_instruction(instruction);
        }
    }

    fn emit_instruction(&mut self, instruction: &AsmInstruction) {
        match instruction {
            AsmInstruction::Mov { src, dst } => self.push(format!("movl {}, {}", long(*src), long(*dst))),
            AsmInstruction::Unary { op, operand } => {
                let mnemonic = match op {
                    UnaryOperator::Neg => "negl",
                    UnaryOperator::Not => "notl",
                };
                self.push(format!("{} {}", mnemonic, long(*operand)));
            }
            AsmInstruction::Binary { op, src, dst } => {
                let (mnemonic, src) = match op {
                    BinaryOperator::Add => ("addl", long(*src)),
                    BinaryOperator::Sub => ("subl", long(*src)),
                    BinaryOperator::Mult => ("imull", long(*src)),
                    BinaryOperator::And => ("andl", long(*src)),
                    BinaryOperator::Or => ("orl", long(*src)),
                    BinaryOperator::Xor => ("xorl", long(*src)),
                    // the count register is always %cl
                    BinaryOperator::Shl => ("sall", operand(*src, Width::Byte)),
                    BinaryOperator::Sar => ("sarl", operand(*src, Width::Byte)),
                };
                self.push(format!("{} {}, {}", mnemonic, src, long(*dst)));
            }
            AsmInstruction::Cmp { src, dst } => self.push(format!("cmpl {}, {}", long(*src), long(*dst))),
            AsmInstruction::Idiv(operand) => self.push(format!("idivl {}", long(*operand))),
            AsmInstruction::Cdq => self.push("cdq".to_string()),
            AsmInstruction::Jmp(label) => {
                let label = self.local_label(label);
                self.push(format!("jmp {}", label));
            }
            AsmInstruction::JmpCC(cc, label) => {
                let label = self.local_label(label);
                self.push(format!("j{} {}", cc.suffix(), label));
            }
            AsmInstruction::SetCC(cc, dst) => self.push(format!("set{} {}", cc.suffix(), operand(*dst, Width::Byte))),
            AsmInstruction::Label(label) => {
                let label = self.local_label(label);
                self.lines.push(format!("{}:", label));
            }
            AsmInstruction::AllocateStack(bytes) => self.push(format!("subq ${}, %rsp", bytes)),
            AsmInstruction::DeallocateStack(bytes) => self.push(format!("addq ${}, %rsp", bytes)),
            AsmInstruction::Push(operand) => self.push(format!("pushq {}", self::operand(*operand, Width::Quad))),
            AsmInstruction::Call(name) => {
                let callee = match self.target() {
                    Target::Linux if !self.program.defines(name) => format!("{}@PLT", name),
                    _ => self.symbol(name),
                };
                self.push(format!("call {}", callee));
            }
            AsmInstruction::Ret => {
                self.push("movq %rbp, %rsp".to_string());
                self.push("popq %rbp".to_string());
                self.push("ret".to_string());
            }
        }
    }
}

/// Render a whole program; output is a pure function of the input
pub fn emit_program(program: &AsmProgram) -> String {
    let functions = program
        .functions
        .iter()
        .map(|function| {
            let mut emitter = Emitter {
                program,
                lines: Vec::new(),
            };
            emitter.emit_function(function);
            emitter.lines.join("\n")
        })
        .join("\n\n");

    let mut text = functions;
    text.push('\n');
    if program.target == Target::Linux {
        text.push_str(INDENT);
        text.push_str(".section .note.GNU-stack,\"\",@progbits\n");
    }
    text
}
