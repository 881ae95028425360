use super::*;
use crate::source_manager::SourceManager;

/// Helper to lex a string and keep only the token kinds, without `EndOfFile`
fn setup_lexer(input: &str) -> Vec<TokenKind> {
    let mut sm = SourceManager::new();
    let id = sm.add_buffer(input, "test_input.c");
    tokenize(id, input)
        .expect("lexing should succeed")
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != TokenKind::EndOfFile)
        .collect()
}

fn setup_lexer_error(input: &str) -> LexError {
    let mut sm = SourceManager::new();
    let id = sm.add_buffer(input, "test_input.c");
    tokenize(id, input).expect_err("lexing should fail")
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

fn constant(digits: &str) -> TokenKind {
    TokenKind::IntegerConstant(digits.to_string())
}

#[test]
fn test_keywords() {
    let kinds = setup_lexer("int void return if else while do for break continue");
    insta::assert_yaml_snapshot!(kinds, @r"
    - Int
    - Void
    - Return
    - If
    - Else
    - While
    - Do
    - For
    - Break
    - Continue
    ");
}

#[test]
fn test_keyword_prefixes_are_identifiers() {
    let kinds = setup_lexer("integer returned _int do_it");
    assert_eq!(
        kinds,
        vec![ident("integer"), ident("returned"), ident("_int"), ident("do_it")]
    );
}

#[test]
fn test_simple_function() {
    let kinds = setup_lexer("int main(void) { return 2; }");
    assert_eq!(
        kinds,
        vec![
            TokenKind::Int,
            ident("main"),
            TokenKind::LeftParen,
            TokenKind::Void,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::Return,
            constant("2"),
            TokenKind::Semicolon,
            TokenKind::RightBrace,
        ]
    );
}

#[test]
fn test_operators_longest_match() {
    let cases = vec![
        ("<<=", TokenKind::LeftShiftAssign),
        (">>=", TokenKind::RightShiftAssign),
        ("<<", TokenKind::LeftShift),
        (">>", TokenKind::RightShift),
        ("<=", TokenKind::LessEqual),
        (">=", TokenKind::GreaterEqual),
        ("==", TokenKind::Equal),
        ("!=", TokenKind::NotEqual),
        ("&&", TokenKind::LogicAnd),
        ("||", TokenKind::LogicOr),
        ("++", TokenKind::Increment),
        ("--", TokenKind::Decrement),
        ("+=", TokenKind::PlusAssign),
        ("-=", TokenKind::MinusAssign),
        ("*=", TokenKind::StarAssign),
        ("/=", TokenKind::DivAssign),
        ("%=", TokenKind::ModAssign),
        ("&=", TokenKind::AndAssign),
        ("|=", TokenKind::OrAssign),
        ("^=", TokenKind::XorAssign),
        ("?", TokenKind::Question),
        (":", TokenKind::Colon),
        ("~", TokenKind::Tilde),
        (",", TokenKind::Comma),
    ];
    for (source, expected) in cases {
        assert_eq!(setup_lexer(source), vec![expected], "failed for {:?}", source);
    }
}

#[test]
fn test_adjacent_operators_split_greedily() {
    // `a---b` is `a -- - b`, `x+++y` is `x ++ + y`
    assert_eq!(
        setup_lexer("a---b"),
        vec![ident("a"), TokenKind::Decrement, TokenKind::Minus, ident("b")]
    );
    assert_eq!(
        setup_lexer("x+++y"),
        vec![ident("x"), TokenKind::Increment, TokenKind::Plus, ident("y")]
    );
    assert_eq!(
        setup_lexer("a<<=b>=c"),
        vec![
            ident("a"),
            TokenKind::LeftShiftAssign,
            ident("b"),
            TokenKind::GreaterEqual,
            ident("c")
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    let source = "int /* block\n comment */ x; // trailing\n// whole line\nreturn";
    assert_eq!(
        setup_lexer(source),
        vec![TokenKind::Int, ident("x"), TokenKind::Semicolon, TokenKind::Return]
    );
}

#[test]
fn test_division_is_not_a_comment() {
    assert_eq!(setup_lexer("6/2"), vec![constant("6"), TokenKind::Slash, constant("2")]);
}

#[test]
fn test_positions_track_lines_and_columns() {
    let mut sm = SourceManager::new();
    let source = "int main(void)\n{\n    return 0;\n}";
    let id = sm.add_buffer(source, "pos.c");
    let tokens = tokenize(id, source).unwrap();

    let ret = tokens.iter().find(|t| t.kind == TokenKind::Return).unwrap();
    assert_eq!(ret.position, Position { line: 3, column: 5 });
    assert_eq!(sm.get_source_text(ret.span), "return");

    let eof = tokens.last().unwrap();
    assert_eq!(eof.kind, TokenKind::EndOfFile);
    assert_eq!(eof.position, Position { line: 4, column: 2 });
}

#[test]
fn test_spans_reconstruct_source() {
    let source = "int main(void) {\n  // count down\n  int x = 10;\n  while (x > 0) x -= 3; /* done */\n  return x;\n}\n";
    let mut sm = SourceManager::new();
    let id = sm.add_buffer(source, "lossless.c");
    let tokens = tokenize(id, source).unwrap();

    let mut rebuilt = String::new();
    let mut last_end = 0usize;
    for token in &tokens {
        let gap = &source[last_end..token.span.start as usize];
        let without_comments = gap.split("/*").next().unwrap_or("");
        assert!(
            gap.trim().is_empty() || gap.trim_start().starts_with("//") || gap.contains("/*"),
            "unexpected content between tokens: {:?}",
            gap
        );
        assert!(without_comments.trim().is_empty() || without_comments.trim_start().starts_with("//"));
        rebuilt.push_str(gap);
        rebuilt.push_str(sm.get_source_text(token.span));
        last_end = token.span.end as usize;
    }
    rebuilt.push_str(&source[last_end..]);
    assert_eq!(rebuilt, source);
}

#[test]
fn test_lexer_is_lazy_and_restartable() {
    let mut sm = SourceManager::new();
    let source = "return 1 + 2;";
    let id = sm.add_buffer(source, "lazy.c");
    let mut lexer = Lexer::new(id, source);

    assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Return);
    let checkpoint = lexer.clone();
    let rest: Vec<_> = lexer.map(|t| t.unwrap().kind).collect();
    let replay: Vec<_> = checkpoint.map(|t| t.unwrap().kind).collect();
    assert_eq!(rest, replay);
    assert_eq!(rest.last(), Some(&TokenKind::EndOfFile));
}

#[test]
fn test_invalid_literal() {
    let err = setup_lexer_error("int main(void) { return 123abc; }");
    match err {
        LexError::InvalidLiteral { text, location } => {
            assert_eq!(text, "123abc");
            assert_eq!((location.start, location.end), (24, 30));
        }
        other => panic!("expected InvalidLiteral, got {:?}", other),
    }
    assert!(matches!(setup_lexer_error("1_000"), LexError::InvalidLiteral { .. }));
}

#[test]
fn test_unexpected_character() {
    let err = setup_lexer_error("int x = 1 @ 2;");
    assert_eq!(
        err,
        LexError::UnexpectedCharacter {
            ch: '@',
            location: SourceSpan::new(err.location().source_id, 10, 11),
        }
    );
    assert!(matches!(setup_lexer_error("a $ b"), LexError::UnexpectedCharacter { ch: '$', .. }));
    assert!(matches!(setup_lexer_error("int é;"), LexError::UnexpectedCharacter { ch: 'é', .. }));
}

#[test]
fn test_unterminated_comment() {
    let err = setup_lexer_error("int x; /* never closed");
    assert!(matches!(err, LexError::UnterminatedComment { .. }));
    assert_eq!(err.location().start, 7);
    assert!(matches!(setup_lexer_error("/*/"), LexError::UnterminatedComment { .. }));
}

#[test]
fn test_iterator_stops_after_error() {
    let mut sm = SourceManager::new();
    let id = sm.add_buffer("a # b", "err.c");
    let results: Vec<_> = Lexer::new(id, "a # b").collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}
