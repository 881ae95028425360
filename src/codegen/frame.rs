//! Stack frame layout and operand legalization.

use super::asm::{AsmInstruction, BinaryOperator, Operand, Reg};

const SLOT_SIZE: u32 = 4;
const STACK_ALIGNMENT: u32 = 16;

/// Frame offset of a temp: temp `i` lives at `-4*(i+1)(%rbp)`
pub fn slot_offset(index: usize) -> i32 {
    -((SLOT_SIZE as i32) * (index as i32 + 1))
}

/// Frame size for `temp_count` slots, rounded up to the stack alignment
pub fn frame_size(temp_count: usize) -> u32 {
    (temp_count as u32 * SLOT_SIZE).next_multiple_of(STACK_ALIGNMENT)
}

fn replace_pseudo(operand: &mut Operand) {
    if let Operand::Pseudo(id) = *operand {
        *operand = Operand::Stack(slot_offset(id.index()));
    }
}

/// Rewrite every pseudo operand to its frame slot
pub fn allocate_stack(instructions: &mut [AsmInstruction]) {
    for instruction in instructions.iter_mut() {
        match instruction {
            AsmInstruction::Mov { src, dst }
            | AsmInstruction::Binary { src, dst, .. }
            | AsmInstruction::Cmp { src, dst } => {
                replace_pseudo(src);
                replace_pseudo(dst);
            }
            AsmInstruction::Unary { operand, .. }
            | AsmInstruction::Idiv(operand)
            | AsmInstruction::SetCC(_, operand)
            | AsmInstruction::Push(operand) => replace_pseudo(operand),
            _ => {}
        }
    }
}

/// Fix operand combinations x86-64 cannot encode, using %r10d and %r11d as scratch
pub fn legalize(instructions: Vec<AsmInstruction>) -> Vec<AsmInstruction> {
    let mut out = Vec::with_capacity(instructions.len());
    let r10 = Operand::Reg(Reg::R10);
    let r11 = Operand::Reg(Reg::R11);

    for instruction in instructions {
        match instruction {
            AsmInstruction::Mov { src, dst } if src.is_memory() && dst.is_memory() => {
                out.push(AsmInstruction::Mov { src, dst: r10 });
                out.push(AsmInstruction::Mov { src: r10, dst });
            }
            AsmInstruction::Binary {
                op: BinaryOperator::Mult,
                src,
                dst,
            } if dst.is_memory() => {
                out.push(AsmInstruction::Mov { src: dst, dst: r11 });
                out.push(AsmInstruction::Binary {
                    op: BinaryOperator::Mult,
                    src,
                    dst: r11,
                });
                out.push(AsmInstruction::Mov { src: r11, dst });
            }
            AsmInstruction::Binary {
                op: op @ (BinaryOperator::Shl | BinaryOperator::Sar),
                src,
                dst,
            } if !matches!(src, Operand::Imm(_) | Operand::Reg(Reg::CX)) => {
                let count = Operand::Reg(Reg::CX);
                out.push(AsmInstruction::Mov { src, dst: count });
                out.push(AsmInstruction::Binary { op, src: count, dst });
            }
            AsmInstruction::Binary { op, src, dst } if src.is_memory() && dst.is_memory() => {
                out.push(AsmInstruction::Mov { src, dst: r10 });
                out.push(AsmInstruction::Binary { op, src: r10, dst });
            }
            AsmInstruction::Idiv(operand @ Operand::Imm(_)) => {
                out.push(AsmInstruction::Mov { src: operand, dst: r10 });
                out.push(AsmInstruction::Idiv(r10));
            }
            AsmInstruction::Cmp { src, dst } if src.is_memory() && dst.is_memory() => {
                out.push(AsmInstruction::Mov { src, dst: r10 });
                out.push(AsmInstruction::Cmp { src: r10, dst });
            }
            AsmInstruction::Cmp {
                src,
                dst: dst @ Operand::Imm(_),
            } => {
                out.push(AsmInstruction::Mov { src: dst, dst: r11 });
                out.push(AsmInstruction::Cmp { src, dst: r11 });
            }
            other => out.push(other),
        }
    }
    out
}
