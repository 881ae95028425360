//! Code generation module.
//!
//! IR → x86-64 assembly in three steps:
//! - instruction selection over pseudo operands
//! - stack slot allocation and operand legalization
//! - AT&T text emission

pub mod asm;
pub mod emit;
pub mod frame;
pub mod instruction_selection;

#[cfg(test)]
mod tests_codegen;

use itertools::Itertools;
use log::debug;

use crate::diagnostic::CodegenError;
use crate::ir::IrProgram;
use crate::ir::validation::validate;

pub use asm::{AsmFunction, AsmInstruction, AsmProgram, Operand, Reg, Target};

const MAX_SLOTS: usize = (i32::MAX / 4 - 1) as usize;

/// Translate a validated IR program into assembly for `target`
pub fn generate(program: &IrProgram, target: Target) -> Result<AsmProgram, CodegenError> {
    validate(program).map_err(|errors| CodegenError::MalformedIr(errors.iter().join("; ")))?;

    let mut functions = Vec::with_capacity(program.functions.len());
    for function in &program.functions {
        if function.temps.len() > MAX_SLOTS {
            return Err(CodegenError::UnsupportedConstruct(format!(
                "'{}' needs {} stack slots, more than a 32-bit frame offset can address",
                function.name,
                function.temps.len()
            )));
        }
        let mut instructions = instruction_selection::select_function(function);
        frame::allocate_stack(&mut instructions);
        let instructions = frame::legalize(instructions);
        let frame_size = frame::frame_size(function.temps.len());
        debug!(
            "generate: {} uses {} slot(s), frame {} byte(s)",
            function.name,
            function.temps.len(),
            frame_size
        );
        functions.push(AsmFunction {
            name: function.name.clone(),
            global: true,
            frame_size,
            instructions,
        });
    }

    Ok(AsmProgram { functions, target })
}

/// Render assembly text
pub fn emit(program: &AsmProgram) -> String {
    emit::emit_program(program)
}
