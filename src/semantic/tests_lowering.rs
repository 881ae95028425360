use crate::diagnostic::SemanticError;
use crate::ir::validation::validate;
use crate::ir::{Instruction, IrProgram, TempKind, Value};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::semantic::lower;
use crate::source_manager::SourceManager;

fn lower_source(source: &str) -> Result<IrProgram, SemanticError> {
    let mut sm = SourceManager::new();
    let id = sm.add_buffer(source, "test_input.c");
    let tokens = tokenize(id, source).expect("lexing should succeed");
    let program = parse(&tokens).expect("parsing should succeed");
    lower(&program)
}

fn setup_ir(source: &str) -> IrProgram {
    let ir = lower_source(source).expect("lowering should succeed");
    assert_eq!(validate(&ir), Ok(()), "lowered IR must be well formed");
    ir
}

fn setup_semantic_error(source: &str) -> SemanticError {
    lower_source(source).expect_err("lowering should fail")
}

#[test]
fn test_arithmetic_precedence_ir() {
    let ir = setup_ir("int main(void) { return 2 + 3 * 4; }");
    insta::assert_snapshot!(ir.to_string(), @r"
    function main() {
        tmp.0 = 3 * 4
        tmp.1 = 2 + tmp.0
        return tmp.1
    }
    ");
}

#[test]
fn test_shadowing_gets_unique_names() {
    let ir = setup_ir("int main(void) { int x = 1; { int x = 2; x = x + 1; } return x; }");
    insta::assert_snapshot!(ir.to_string(), @r"
    function main() {
        x.0 = 1
        x.1 = 2
        tmp.2 = x.1 + 1
        x.1 = tmp.2
        return x.0
    }
    ");

    let main = ir.function("main").unwrap();
    let variables: Vec<&str> = main
        .temps
        .iter()
        .filter(|t| t.kind == TempKind::Variable)
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(variables, ["x.0", "x.1"]);
}

#[test]
fn test_logical_and_short_circuits() {
    let ir = setup_ir("int main(void) { int a = 0; return a && 5; }");
    insta::assert_snapshot!(ir.to_string(), @r"
    function main() {
        a.0 = 0
        jump_if_zero a.0, and_false.0
        jump_if_zero 5, and_false.0
        tmp.1 = 1
        jump and_end.1
      and_false.0:
        tmp.1 = 0
      and_end.1:
        return tmp.1
    }
    ");
}

#[test]
fn test_for_loop_ir() {
    let ir = setup_ir("int main(void) { int s = 0; for (int i = 0; i < 3; i = i + 1) s += i; return s; }");
    insta::assert_snapshot!(ir.to_string(), @r"
    function main() {
        s.0 = 0
        i.1 = 0
      for_start.0:
        tmp.2 = i.1 < 3
        jump_if_zero tmp.2, for_break.2
        tmp.3 = s.0 + i.1
        s.0 = tmp.3
      for_continue.1:
        tmp.4 = i.1 + 1
        i.1 = tmp.4
        jump for_start.0
      for_break.2:
        return s.0
    }
    ");
}

#[test]
fn test_postfix_and_prefix_updates() {
    let ir = setup_ir("int main(void) { int a = 5; int b = a++; int c = --a; return b + c; }");
    insta::assert_snapshot!(ir.to_string(), @r"
    function main() {
        a.0 = 5
        tmp.2 = a.0
        a.0 = a.0 + 1
        b.1 = tmp.2
        tmp.4 = a.0 - 1
        a.0 = tmp.4
        c.3 = tmp.4
        tmp.5 = b.1 + c.3
        return tmp.5
    }
    ");
}

#[test]
fn test_calls_and_parameters() {
    let ir = setup_ir(
        "int add(int a, int b) { return a + b; }
         void noop(void) { }
         int main(void) { noop(); add(1, 2); return add(3, 4); }",
    );
    insta::assert_snapshot!(ir.to_string(), @r"
    function add(a.0, b.1) {
        tmp.2 = a.0 + b.1
        return tmp.2
    }

    function noop() {
        return
    }

    function main() {
        call noop()
        call add(1, 2)
        tmp.3 = call add(3, 4)
        return tmp.3
    }
    ");
}

#[test]
fn test_main_gets_implicit_return_zero() {
    let ir = setup_ir("int main(void) { int x = 3; }");
    let body = &ir.function("main").unwrap().body;
    assert_eq!(body.last(), Some(&Instruction::Return(Some(Value::Constant(0)))));
}

#[test]
fn test_prototypes_are_not_lowered() {
    let ir = setup_ir("int f(int x); int main(void) { return f(1); } int f(int x) { return x; }");
    let names: Vec<&str> = ir.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["main", "f"]);
}

#[test]
fn test_recursion_sees_own_declaration() {
    let ir = setup_ir("int fact(int n) { if (n <= 1) return 1; return n * fact(n - 1); } int main(void) { return fact(5); }");
    assert_eq!(ir.functions.len(), 2);
}

#[test]
fn test_undeclared_variable() {
    let err = setup_semantic_error("int main(void) { return y; }");
    assert!(matches!(err, SemanticError::UndeclaredVariable { ref name, .. } if name == "y"));
    assert_eq!(err.location().start, 24);
}

#[test]
fn test_variable_out_of_scope_after_block() {
    let err = setup_semantic_error("int main(void) { { int x = 1; } return x; }");
    assert!(matches!(err, SemanticError::UndeclaredVariable { .. }));

    let err = setup_semantic_error("int main(void) { for (int i = 0; i < 3; i++) ; return i; }");
    assert!(matches!(err, SemanticError::UndeclaredVariable { ref name, .. } if name == "i"));
}

#[test]
fn test_duplicate_declaration() {
    let err = setup_semantic_error("int main(void) { int a = 1; int a = 2; return a; }");
    match err {
        SemanticError::DuplicateDeclaration {
            name,
            first_def,
            second_def,
        } => {
            assert_eq!(name, "a");
            assert!(first_def.start < second_def.start);
        }
        other => panic!("expected DuplicateDeclaration, got {:?}", other),
    }
}

#[test]
fn test_parameter_and_body_share_scope() {
    let err = setup_semantic_error("int f(int a) { int a = 2; return a; } int main(void) { return 0; }");
    assert!(matches!(err, SemanticError::DuplicateDeclaration { .. }));
    let err = setup_semantic_error("int f(int a, int a) { return a; }");
    assert!(matches!(err, SemanticError::DuplicateDeclaration { .. }));
    // an inner block may shadow a parameter
    setup_ir("int f(int a) { { int a = 2; return a; } } int main(void) { return f(1); }");
}

#[test]
fn test_break_and_continue_outside_loop() {
    let err = setup_semantic_error("int main(void) { break; }");
    assert!(matches!(err, SemanticError::InvalidBreakOrContinue { keyword: "break", .. }));
    let err = setup_semantic_error("int main(void) { if (1) continue; return 0; }");
    assert!(matches!(err, SemanticError::InvalidBreakOrContinue { keyword: "continue", .. }));
    setup_ir("int main(void) { while (1) { if (1) break; continue; } return 0; }");
}

#[test]
fn test_missing_return() {
    let err = setup_semantic_error("int f(int a) { if (a) return 1; } int main(void) { return f(0); }");
    assert!(matches!(err, SemanticError::MissingReturn { ref name, .. } if name == "f"));
    setup_ir("int f(int a) { if (a) return 1; else return 2; } int main(void) { return f(0); }");
    setup_ir("int f(int a) { for (;;) { a = a + 1; } } int main(void) { return 0; }");
}

#[test]
fn test_function_errors() {
    assert!(matches!(
        setup_semantic_error("int main(void) { return g(); }"),
        SemanticError::UndeclaredFunction { ref name, .. } if name == "g"
    ));
    assert!(matches!(
        setup_semantic_error("int f(void) { return 1; } int f(void) { return 2; }"),
        SemanticError::FunctionRedefinition { .. }
    ));
    assert!(matches!(
        setup_semantic_error("int f(int a); int f(void) { return 2; }"),
        SemanticError::ConflictingDeclaration { .. }
    ));
    assert!(matches!(
        setup_semantic_error("int f(int a) { return a; } int main(void) { return f(1, 2); }"),
        SemanticError::ArgumentCountMismatch {
            expected: 1,
            found: 2,
            ..
        }
    ));
    assert!(matches!(
        setup_semantic_error("int f(void) { return 1; } int main(void) { int f = 3; return f(); }"),
        SemanticError::NotAFunction { .. }
    ));
}

#[test]
fn test_value_errors() {
    assert!(matches!(
        setup_semantic_error("int main(void) { 3 = 4; return 0; }"),
        SemanticError::InvalidLvalue { .. }
    ));
    assert!(matches!(
        setup_semantic_error("int main(void) { int a = 1; (a + 1)++; return a; }"),
        SemanticError::InvalidLvalue { .. }
    ));
    assert!(matches!(
        setup_semantic_error("void f(void) { } int main(void) { return f(); }"),
        SemanticError::VoidValueUsed { .. }
    ));
    assert!(matches!(
        setup_semantic_error("void f(void) { return 1; }"),
        SemanticError::ReturnValueMismatch { .. }
    ));
    assert!(matches!(
        setup_semantic_error("int main(void) { return; }"),
        SemanticError::ReturnValueMismatch { .. }
    ));
}

#[test]
fn test_lowering_is_deterministic() {
    let source = "int f(int a, int b) { return a > b ? a : b; } int main(void) { int i = 0; do i++; while (i < 4 || 0); return f(i, 2); }";
    assert_eq!(setup_ir(source), setup_ir(source));
    assert_eq!(setup_ir(source).to_string(), setup_ir(source).to_string());
}
