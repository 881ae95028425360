//! Tests for IR to x86-64 assembly generation

use super::*;
use crate::ir::{self, Instruction, IrFunction, Label, TempKind, Value};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::semantic::lower;
use crate::source_manager::SourceManager;
use crate::tests::test_utils::run_asm_exit_status;

fn compile_to_asm(source: &str, target: Target) -> String {
    let mut sm = SourceManager::new();
    let id = sm.add_buffer(source, "test_input.c");
    let tokens = tokenize(id, source).expect("lexing should succeed");
    let program = parse(&tokens).expect("parsing should succeed");
    let ir = lower(&program).expect("lowering should succeed");
    let asm = generate(&ir, target).expect("codegen should succeed");
    emit(&asm)
}

/// Trimmed, non-empty lines of the emitted text
fn asm_lines(asm: &str) -> Vec<&str> {
    asm.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn assert_contains_sequence(asm: &str, expected: &[&str]) {
    let lines = asm_lines(asm);
    assert!(
        lines.windows(expected.len()).any(|w| w == expected),
        "expected sequence {:#?} in:\n{}",
        expected,
        asm
    );
}

#[test]
fn test_return_constant() {
    let asm = compile_to_asm("int main(void) { return 2; }", Target::Linux);
    assert_eq!(
        asm_lines(&asm),
        vec![
            ".globl main",
            "main:",
            "pushq %rbp",
            "movq %rsp, %rbp",
            "movl $2, %eax",
            "movq %rbp, %rsp",
            "popq %rbp",
            "ret",
            ".section .note.GNU-stack,\"\",@progbits",
        ]
    );
    // directives are indented, symbols are not
    assert!(asm.starts_with("    .globl main\nmain:\n"));
    assert!(asm.ends_with("@progbits\n"));
}

#[test]
fn test_arithmetic_uses_scratch_registers() {
    let asm = compile_to_asm("int main(void) { return 2 + 3 * 4; }", Target::Linux);
    assert_eq!(
        asm_lines(&asm),
        vec![
            ".globl main",
            "main:",
            "pushq %rbp",
            "movq %rsp, %rbp",
            "subq $16, %rsp",
            "movl $3, -4(%rbp)",
            "movl -4(%rbp), %r11d",
            "imull $4, %r11d",
            "movl %r11d, -4(%rbp)",
            "movl $2, -8(%rbp)",
            "movl -4(%rbp), %r10d",
            "addl %r10d, -8(%rbp)",
            "movl -8(%rbp), %eax",
            "movq %rbp, %rsp",
            "popq %rbp",
            "ret",
            ".section .note.GNU-stack,\"\",@progbits",
        ]
    );
}

#[test]
fn test_macos_symbol_prefix() {
    let source = "int f(void) { return 1; } int main(void) { return f(); }";
    let asm = compile_to_asm(source, Target::MacOs);
    let lines = asm_lines(&asm);
    assert!(lines.contains(&".globl _main"));
    assert!(lines.contains(&"_main:"));
    assert!(lines.contains(&"call _f"));
    assert!(!asm.contains("GNU-stack"));
    assert!(!asm.contains("@PLT"));
}

#[test]
fn test_external_call_goes_through_plt() {
    let source = "int putchar(int c); int main(void) { putchar(72); return 0; }";
    let asm = compile_to_asm(source, Target::Linux);
    assert_contains_sequence(&asm, &["movl $72, %edi", "call putchar@PLT"]);
}

#[test]
fn test_stack_arguments() {
    let source = "int sum8(int a, int b, int c, int d, int e, int f, int g, int h) { return a + h; }
                  int main(void) { return sum8(1, 2, 3, 4, 5, 6, 7, 8); }";
    let asm = compile_to_asm(source, Target::Linux);

    assert_contains_sequence(
        &asm,
        &[
            "movl $1, %edi",
            "movl $2, %esi",
            "movl $3, %edx",
            "movl $4, %ecx",
            "movl $5, %r8d",
            "movl $6, %r9d",
            "pushq $8",
            "pushq $7",
            "call sum8",
            "addq $16, %rsp",
            "movl %eax, -4(%rbp)",
        ],
    );
    // seventh and eighth parameters are read from the caller's frame
    assert_contains_sequence(&asm, &["movl 16(%rbp), %r10d", "movl %r10d, -28(%rbp)"]);
    assert_contains_sequence(&asm, &["movl 24(%rbp), %r10d", "movl %r10d, -32(%rbp)"]);
}

#[test]
fn test_odd_stack_arguments_are_padded() {
    let source = "int f(int a, int b, int c, int d, int e, int f, int g) { return g; }
                  int main(void) { return f(1, 2, 3, 4, 5, 6, 7); }";
    let asm = compile_to_asm(source, Target::Linux);
    assert_contains_sequence(&asm, &["subq $8, %rsp", "movl $1, %edi"]);
    assert_contains_sequence(&asm, &["pushq $7", "call f", "addq $16, %rsp"]);
}

#[test]
fn test_division_and_shifts() {
    let source = "int main(void) { int a = 7; int b = 2; return a / b + a % b + (a << b); }";
    let asm = compile_to_asm(source, Target::Linux);
    assert_contains_sequence(&asm, &["movl -4(%rbp), %eax", "cdq", "idivl -8(%rbp)", "movl %eax, -12(%rbp)"]);
    assert_contains_sequence(&asm, &["cdq", "idivl -8(%rbp)", "movl %edx, -16(%rbp)"]);
    assert_contains_sequence(&asm, &["movl -8(%rbp), %ecx"]);
    assert!(asm.contains("sall %cl, "));
}

#[test]
fn test_comparison_with_constants() {
    let asm = compile_to_asm("int main(void) { return 1 < 2; }", Target::Linux);
    assert_contains_sequence(
        &asm,
        &["movl $1, %r11d", "cmpl $2, %r11d", "movl $0, -4(%rbp)", "setl -4(%rbp)"],
    );
}

#[test]
fn test_labels_are_function_qualified() {
    let source = "int f(int a) { if (a) return 1; return 2; } int main(void) { if (1) return f(0); return 3; }";
    let asm = compile_to_asm(source, Target::Linux);
    assert!(asm.contains("je .Lf.if_end.1"));
    assert!(asm.contains(".Lf.if_end.1:"));
    assert!(asm.contains(".Lmain.if_end.1:"));
}

#[test]
fn test_generation_is_deterministic() {
    let source = "int g(int x) { return x * 2; } int main(void) { int s = 0; for (int i = 0; i < 10; i++) { if (i % 2) continue; s += g(i); } return s; }";
    assert_eq!(compile_to_asm(source, Target::Linux), compile_to_asm(source, Target::Linux));
}

/// `d = a <op> d`, with both operands in memory
fn rhs_aliases_destination(op: ir::BinaryOp) -> IrProgram {
    let mut function = IrFunction::new("main");
    let a = function.add_temp("a.0".to_string(), TempKind::Variable);
    let d = function.add_temp("d.1".to_string(), TempKind::Variable);
    function.body = vec![
        Instruction::Copy {
            src: Value::Constant(10),
            dst: a,
        },
        Instruction::Copy {
            src: Value::Constant(3),
            dst: d,
        },
        Instruction::Binary {
            op,
            lhs: Value::Temp(a),
            rhs: Value::Temp(d),
            dst: d,
        },
        Instruction::Return(Some(Value::Temp(d))),
    ];
    IrProgram {
        functions: vec![function],
    }
}

#[test]
fn test_rhs_aliasing_destination_is_not_clobbered() {
    let asm = emit(&generate(&rhs_aliases_destination(ir::BinaryOp::Subtract), Target::Linux).unwrap());
    assert_contains_sequence(
        &asm,
        &[
            "movl $10, -4(%rbp)",
            "movl $3, -8(%rbp)",
            "movl -4(%rbp), %r11d",
            "subl -8(%rbp), %r11d",
            "movl %r11d, -8(%rbp)",
            "movl -8(%rbp), %eax",
        ],
    );
    // the saved operand must not pass through the mov scratch register
    assert!(!asm.contains("%r10d"), "{}", asm);

    let asm = emit(&generate(&rhs_aliases_destination(ir::BinaryOp::Multiply), Target::Linux).unwrap());
    assert_contains_sequence(
        &asm,
        &["movl -4(%rbp), %r11d", "imull -8(%rbp), %r11d", "movl %r11d, -8(%rbp)"],
    );
}

#[test]
fn test_rhs_aliasing_destination_runs_correctly() {
    let cases = [(ir::BinaryOp::Subtract, 7), (ir::BinaryOp::Add, 13), (ir::BinaryOp::Multiply, 30)];
    for (op, expected) in cases {
        let asm = emit(&generate(&rhs_aliases_destination(op), Target::host()).unwrap());
        if let Some(status) = run_asm_exit_status(&asm) {
            assert_eq!(status, expected, "{:?}", op);
        }
    }
}

#[test]
fn test_malformed_ir_is_rejected() {
    let mut function = IrFunction::new("main");
    let tmp = function.add_temp("tmp.0".to_string(), TempKind::Temporary);
    function.body = vec![
        Instruction::Jump(Label { id: 9, hint: "nowhere" }),
        Instruction::Return(Some(Value::Temp(tmp))),
    ];
    let program = IrProgram {
        functions: vec![function],
    };
    match generate(&program, Target::Linux) {
        Err(CodegenError::MalformedIr(message)) => {
            assert!(message.contains("nowhere.9"), "unexpected message: {}", message);
            assert!(message.contains("tmp.0"), "unexpected message: {}", message);
        }
        other => panic!("expected MalformedIr, got {:?}", other),
    }
}
