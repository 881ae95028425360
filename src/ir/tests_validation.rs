use super::validation::{ValidationError, validate};
use super::*;

fn label(id: u32) -> Label {
    Label { id, hint: "test" }
}

fn single_function(function: IrFunction) -> IrProgram {
    IrProgram {
        functions: vec![function],
    }
}

#[test]
fn test_well_formed_function_passes() {
    let mut f = IrFunction::new("main");
    let x = f.add_temp("x.0".to_string(), TempKind::Variable);
    let tmp = f.add_temp("tmp.1".to_string(), TempKind::Temporary);
    f.body = vec![
        Instruction::Copy {
            src: Value::Constant(1),
            dst: x,
        },
        Instruction::Label(label(0)),
        Instruction::Binary {
            op: BinaryOp::Add,
            lhs: Value::Temp(x),
            rhs: Value::Constant(2),
            dst: tmp,
        },
        Instruction::JumpIfZero {
            cond: Value::Temp(tmp),
            target: label(0),
        },
        Instruction::Return(Some(Value::Temp(tmp))),
    ];
    assert_eq!(validate(&single_function(f)), Ok(()));
}

#[test]
fn test_uninitialized_variable_read_is_allowed() {
    let mut f = IrFunction::new("main");
    let x = f.add_temp("x.0".to_string(), TempKind::Variable);
    f.body = vec![Instruction::Return(Some(Value::Temp(x)))];
    assert!(validate(&single_function(f)).is_ok());
}

#[test]
fn test_params_count_as_assigned() {
    let mut f = IrFunction::new("id");
    let a = f.add_temp("a.0".to_string(), TempKind::Param);
    f.params.push(a);
    f.body = vec![Instruction::Return(Some(Value::Temp(a)))];
    assert!(validate(&single_function(f)).is_ok());
}

#[test]
fn test_rejects_duplicate_and_undefined_labels() {
    let mut f = IrFunction::new("main");
    f.body = vec![
        Instruction::Label(label(1)),
        Instruction::Label(label(1)),
        Instruction::Jump(label(2)),
        Instruction::Return(Some(Value::Constant(0))),
    ];
    let errors = validate(&single_function(f)).unwrap_err();
    assert_eq!(
        errors,
        vec![
            ValidationError::DuplicateLabel {
                function: "main".to_string(),
                label: "test.1".to_string(),
            },
            ValidationError::UndefinedLabel {
                function: "main".to_string(),
                label: "test.2".to_string(),
            },
        ]
    );
}

#[test]
fn test_rejects_temporary_read_before_write() {
    let mut f = IrFunction::new("main");
    let tmp = f.add_temp("tmp.0".to_string(), TempKind::Temporary);
    f.body = vec![
        Instruction::Return(Some(Value::Temp(tmp))),
        Instruction::Copy {
            src: Value::Constant(3),
            dst: tmp,
        },
    ];
    let errors = validate(&single_function(f)).unwrap_err();
    assert_eq!(
        errors,
        vec![ValidationError::UseBeforeAssignment {
            function: "main".to_string(),
            temp: "tmp.0".to_string(),
        }]
    );
    assert_eq!(errors[0].to_string(), "temporary 'tmp.0' read before assignment in 'main'");
}

#[test]
fn test_rejects_unknown_temp() {
    let mut f = IrFunction::new("main");
    f.body = vec![Instruction::Copy {
        src: Value::Constant(3),
        dst: TempId(5),
    }];
    assert_eq!(
        validate(&single_function(f)),
        Err(vec![ValidationError::TempOutOfRange {
            function: "main".to_string(),
            temp: 5,
        }])
    );
}

#[test]
fn test_dump_format() {
    let mut f = IrFunction::new("add");
    let a = f.add_temp("a.0".to_string(), TempKind::Param);
    let b = f.add_temp("b.1".to_string(), TempKind::Param);
    let tmp = f.add_temp("tmp.2".to_string(), TempKind::Temporary);
    f.params = vec![a, b];
    f.body = vec![
        Instruction::Binary {
            op: BinaryOp::Add,
            lhs: Value::Temp(a),
            rhs: Value::Temp(b),
            dst: tmp,
        },
        Instruction::JumpIfNotZero {
            cond: Value::Temp(tmp),
            target: label(0),
        },
        Instruction::FunctionCall {
            name: "g".to_string(),
            args: vec![Value::Constant(1), Value::Temp(a)],
            dst: None,
        },
        Instruction::Label(label(0)),
        Instruction::Return(Some(Value::Temp(tmp))),
    ];
    insta::assert_snapshot!(f.to_string(), @r"
    function add(a.0, b.1) {
        tmp.2 = a.0 + b.1
        jump_if_not_zero tmp.2, test.0
        call g(1, a.0)
      test.0:
        return tmp.2
    }
    ");
}
