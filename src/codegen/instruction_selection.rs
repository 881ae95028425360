//! IR to assembly instruction selection.
//!
//! Every IR temp becomes a [`Operand::Pseudo`]; operand constraints of the
//! real instructions are fixed up later by [`super::frame::legalize`].

use log::trace;

use crate::ir::{self, Instruction, IrFunction, Label, Value};

use super::asm::{ARG_REGISTERS, AsmInstruction, BinaryOperator, CondCode, Operand, Reg, UnaryOperator};

/// Bytes between `%rbp` and the first stack-passed argument
const STACK_ARGS_OFFSET: i32 = 16;

/// Label name qualified by its function, so labels never clash across functions
pub fn label_name(function: &str, label: Label) -> String {
    format!("{}.{}.{}", function, label.hint, label.id)
}

fn operand(value: Value) -> Operand {
    match value {
        Value::Constant(c) => Operand::Imm(c),
        Value::Temp(id) => Operand::Pseudo(id),
    }
}

/// Select instructions for one function, parameters copied in first
pub fn select_function(function: &IrFunction) -> Vec<AsmInstruction> {
    let mut out = Vec::new();

    for (i, param) in function.params.iter().enumerate() {
        let src = match ARG_REGISTERS.get(i) {
            Some(reg) => Operand::Reg(*reg),
            None => Operand::Stack(STACK_ARGS_OFFSET + 8 * (i - ARG_REGISTERS.len()) as i32),
        };
        out.push(AsmInstruction::Mov {
            src,
            dst: Operand::Pseudo(*param),
        });
    }

    for instruction in &function.body {
        select_instruction(&function.name, instruction, &mut out);
    }
    trace!("select_function: {} -> {} instruction(s)", function.name, out.len());
    out
}

fn select_instruction(function: &str, instruction: &Instruction, out: &mut Vec<AsmInstruction>) {
    match instruction {
        Instruction::Return(value) => {
            if let Some(value) = value {
                out.push(AsmInstruction::Mov {
                    src: operand(*value),
                    dst: Operand::Reg(Reg::AX),
                });
            }
            out.push(AsmInstruction::Ret);
        }
        Instruction::Unary { op, src, dst } => {
            let dst = Operand::Pseudo(*dst);
            match op {
                ir::UnaryOp::Not => {
                    out.push(AsmInstruction::Cmp {
                        src: Operand::Imm(0),
                        dst: operand(*src),
                    });
                    out.push(AsmInstruction::Mov {
                        src: Operand::Imm(0),
                        dst,
                    });
                    out.push(AsmInstruction::SetCC(CondCode::E, dst));
                }
                ir::UnaryOp::Negate | ir::UnaryOp::Complement => {
                    let op = if *op == ir::UnaryOp::Negate {
                        UnaryOperator::Neg
                    } else {
                        UnaryOperator::Not
                    };
                    out.push(AsmInstruction::Mov {
                        src: operand(*src),
                        dst,
                    });
                    out.push(AsmInstruction::Unary { op, operand: dst });
                }
            }
        }
        Instruction::Binary { op, lhs, rhs, dst } => select_binary(*op, operand(*lhs), operand(*rhs), Operand::Pseudo(*dst), out),
        Instruction::Copy { src, dst } => out.push(AsmInstruction::Mov {
            src: operand(*src),
            dst: Operand::Pseudo(*dst),
        }),
        Instruction::Jump(target) => out.push(AsmInstruction::Jmp(label_name(function, *target))),
        Instruction::JumpIfZero { cond, target } | Instruction::JumpIfNotZero { cond, target } => {
            let cc = if matches!(instruction, Instruction::JumpIfZero { .. }) {
                CondCode::E
            } else {
                CondCode::NE
            };
            out.push(AsmInstruction::Cmp {
                src: Operand::Imm(0),
                dst: operand(*cond),
            });
            out.push(AsmInstruction::JmpCC(cc, label_name(function, *target)));
        }
        Instruction::Label(label) => out.push(AsmInstruction::Label(label_name(function, *label))),
        Instruction::FunctionCall { name, args, dst } => select_call(name, args, *dst, out),
    }
}

fn select_binary(op: ir::BinaryOp, lhs: Operand, rhs: Operand, dst: Operand, out: &mut Vec<AsmInstruction>) {
    let arith = match op {
        ir::BinaryOp::Add => Some(BinaryOperator::Add),
        ir::BinaryOp::Subtract => Some(BinaryOperator::Sub),
        ir::BinaryOp::Multiply => Some(BinaryOperator::Mult),
        ir::BinaryOp::BitAnd => Some(BinaryOperator::And),
        ir::BinaryOp::BitOr => Some(BinaryOperator::Or),
        ir::BinaryOp::BitXor => Some(BinaryOperator::Xor),
        _ => None,
    };
    if let Some(arith) = arith {
        // copying lhs into dst first would clobber rhs when they alias, so
        // compute in %r11d, which legalization never uses for a plain mov
        if rhs == dst && lhs != dst {
            let scratch = Operand::Reg(Reg::R11);
            out.push(AsmInstruction::Mov { src: lhs, dst: scratch });
            out.push(AsmInstruction::Binary {
                op: arith,
                src: rhs,
                dst: scratch,
            });
            out.push(AsmInstruction::Mov { src: scratch, dst });
        } else {
            out.push(AsmInstruction::Mov { src: lhs, dst });
            out.push(AsmInstruction::Binary { op: arith, src: rhs, dst });
        }
        return;
    }

    match op {
        ir::BinaryOp::Divide | ir::BinaryOp::Remainder => {
            let result = if op == ir::BinaryOp::Divide { Reg::AX } else { Reg::DX };
            out.push(AsmInstruction::Mov {
                src: lhs,
                dst: Operand::Reg(Reg::AX),
            });
            out.push(AsmInstruction::Cdq);
            out.push(AsmInstruction::Idiv(rhs));
            out.push(AsmInstruction::Mov {
                src: Operand::Reg(result),
                dst,
            });
        }
        ir::BinaryOp::ShiftLeft | ir::BinaryOp::ShiftRight => {
            let shift = if op == ir::BinaryOp::ShiftLeft {
                BinaryOperator::Shl
            } else {
                BinaryOperator::Sar
            };
            // a variable count has to live in %cl
            let count = match rhs {
                Operand::Imm(_) => rhs,
                _ => {
                    out.push(AsmInstruction::Mov {
                        src: rhs,
                        dst: Operand::Reg(Reg::CX),
                    });
                    Operand::Reg(Reg::CX)
                }
            };
            out.push(AsmInstruction::Mov { src: lhs, dst });
            out.push(AsmInstruction::Binary { op: shift, src: count, dst });
        }
        _ => {
            let cc = match op {
                ir::BinaryOp::Equal => CondCode::E,
                ir::BinaryOp::NotEqual => CondCode::NE,
                ir::BinaryOp::Less => CondCode::L,
                ir::BinaryOp::LessEqual => CondCode::LE,
                ir::BinaryOp::Greater => CondCode::G,
                _ => CondCode::GE,
            };
            out.push(AsmInstruction::Cmp { src: rhs, dst: lhs });
            out.push(AsmInstruction::Mov {
                src: Operand::Imm(0),
                dst,
            });
            out.push(AsmInstruction::SetCC(cc, dst));
        }
    }
}

/// System V call sequence: six register arguments, the rest pushed right to left
fn select_call(name: &str, args: &[Value], dst: Option<ir::TempId>, out: &mut Vec<AsmInstruction>) {
    let split = args.len().min(ARG_REGISTERS.len());
    let (register_args, stack_args) = args.split_at(split);

    // keep %rsp 16-byte aligned at the call
    let padding = if stack_args.len() % 2 == 1 { 8 } else { 0 };
    if padding != 0 {
        out.push(AsmInstruction::AllocateStack(padding));
    }

    for (reg, arg) in ARG_REGISTERS.iter().zip(register_args) {
        out.push(AsmInstruction::Mov {
            src: operand(*arg),
            dst: Operand::Reg(*reg),
        });
    }

    for arg in stack_args.iter().rev() {
        match operand(*arg) {
            imm @ Operand::Imm(_) => out.push(AsmInstruction::Push(imm)),
            other => {
                out.push(AsmInstruction::Mov {
                    src: other,
                    dst: Operand::Reg(Reg::AX),
                });
                out.push(AsmInstruction::Push(Operand::Reg(Reg::AX)));
            }
        }
    }

    out.push(AsmInstruction::Call(name.to_string()));

    let to_remove = 8 * stack_args.len() as u32 + padding;
    if to_remove != 0 {
        out.push(AsmInstruction::DeallocateStack(to_remove));
    }

    if let Some(dst) = dst {
        out.push(AsmInstruction::Mov {
            src: Operand::Reg(Reg::AX),
            dst: Operand::Pseudo(dst),
        });
    }
}
