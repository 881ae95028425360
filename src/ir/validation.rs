//! IR Validation Pass
//!
//! Checks the structural invariants code generation relies on:
//! - every label is defined once per function
//! - every jump target is defined in the same function
//! - every temp id is inside the function's temp table
//! - every `Temporary` is written before it is read, in instruction order

use crate::ir::{Instruction, IrFunction, IrProgram, Label, TempDecl, TempId, TempKind, Value};
use hashbrown::HashSet;
use std::fmt;

/// IR Validation Error
#[derive(Debug, PartialEq, Clone)]
pub enum ValidationError {
    DuplicateLabel { function: String, label: String },
    UndefinedLabel { function: String, label: String },
    TempOutOfRange { function: String, temp: u32 },
    UseBeforeAssignment { function: String, temp: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateLabel { function, label } => {
                write!(f, "label '{}' defined more than once in '{}'", label, function)
            }
            ValidationError::UndefinedLabel { function, label } => {
                write!(f, "jump to undefined label '{}' in '{}'", label, function)
            }
            ValidationError::TempOutOfRange { function, temp } => {
                write!(f, "temp {} is not declared in '{}'", temp, function)
            }
            ValidationError::UseBeforeAssignment { function, temp } => {
                write!(f, "temporary '{}' read before assignment in '{}'", temp, function)
            }
        }
    }
}

/// Validate every function in `program`
///
/// Returns Ok(()) if validation passes, or every error found otherwise
pub fn validate(program: &IrProgram) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    for function in &program.functions {
        validate_function(function, &mut errors);
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_function(function: &IrFunction, errors: &mut Vec<ValidationError>) {
    let mut defined: HashSet<Label> = HashSet::new();
    for instruction in &function.body {
        if let Instruction::Label(label) = instruction
            && !defined.insert(*label)
        {
            errors.push(ValidationError::DuplicateLabel {
                function: function.name.clone(),
                label: label.to_string(),
            });
        }
    }

    let mut assigned: HashSet<TempId> = function.params.iter().copied().collect();
    for param in &function.params {
        check_in_range(function, *param, errors);
    }

    for instruction in &function.body {
        if let Some(target) = instruction.jump_target()
            && !defined.contains(&target)
        {
            errors.push(ValidationError::UndefinedLabel {
                function: function.name.clone(),
                label: target.to_string(),
            });
        }

        for source in instruction.sources() {
            let Value::Temp(id) = source else { continue };
            let Some(decl) = check_in_range(function, id, errors) else { continue };
            if decl.kind == TempKind::Temporary && !assigned.contains(&id) {
                errors.push(ValidationError::UseBeforeAssignment {
                    function: function.name.clone(),
                    temp: decl.name.clone(),
                });
            }
        }

        if let Some(dst) = instruction.destination()
            && check_in_range(function, dst, errors).is_some()
        {
            assigned.insert(dst);
        }
    }
}

fn check_in_range<'f>(
    function: &'f IrFunction,
    id: TempId,
    errors: &mut Vec<ValidationError>,
) -> Option<&'f TempDecl> {
    let decl = function.temp(id);
    if decl.is_none() {
        errors.push(ValidationError::TempOutOfRange {
            function: function.name.clone(),
            temp: id.0,
        });
    }
    decl
}
