use pretty_assertions::assert_eq;

use shnap::instruction::InstructionKind;
use shnap::operator::Operator;
use shnap::parser::parse_source;

fn printed(source: &str) -> String {
    parse_source(source, "test")
        .unwrap_or_else(|e| panic!("{source:?} failed to parse: {e}"))
        .pretty_print(0)
}

fn parse_error(source: &str) -> String {
    match parse_source(source, "test") {
        Ok(program) => panic!("{source:?} parsed as {}", program.pretty_print(0)),
        Err(e) => e.to_string(),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(printed("1 + 2 * 3"), "(1 + (2 * 3));\n");
    assert_eq!(printed("1 * 2 + 3"), "((1 * 2) + 3);\n");
}

#[test]
fn power_is_right_associative() {
    assert_eq!(printed("2 ** 3 ** 2"), "(2 ** (3 ** 2));\n");
}

#[test]
fn subtraction_is_left_associative() {
    assert_eq!(printed("a - b - c"), "((a - b) - c);\n");
}

#[test]
fn negative_literal_binds_before_power() {
    assert_eq!(printed("-2 ** 2"), "((-2) ** 2);\n");
    assert_eq!(printed("-x ** 2"), "(-(x ** 2));\n");
}

#[test]
fn comparison_and_logic_layers() {
    assert_eq!(
        printed("a < b && c == d || !e"),
        "(((a < b) && (c == d)) || (!e));\n"
    );
}

#[test]
fn compound_assignment_keeps_underlying_operator() {
    let program = parse_source("total += 2", "test").unwrap();
    let InstructionKind::Sequence(statements) = &program.kind else {
        panic!("program is a sequence");
    };

    match &statements[0].kind {
        InstructionKind::Set { name, operator, local, .. } => {
            assert_eq!(name, "total");
            assert_eq!(*operator, Some(Operator::Add));
            assert!(!local);
        }
        other => panic!("expected a set, got {other:?}"),
    }
}

#[test]
fn assignment_operands_keep_their_parentheses() {
    assert_eq!(printed("(x = 1) + 2"), "((x = 1) + 2);\n");
    assert_eq!(printed("1 + (x = 2)"), "(1 + (x = 2));\n");
    assert_eq!(printed("f((x = 1), y = 2)"), "f((x = 1), y = 2);\n");
}

#[test]
fn calls_members_and_named_arguments() {
    assert_eq!(printed("a.b(c, d = 1)"), "a.b(c, d = 1);\n");
    assert_eq!(printed("f()(1).x"), "f()(1).x;\n");
}

#[test]
fn let_and_flags() {
    assert_eq!(
        printed("let x = 1; private y = 2; final z"),
        "let x = 1;\nprivate y = 2;\nfinal z;\n"
    );
}

#[test]
fn if_chain_is_braced() {
    assert_eq!(
        printed("if a b elif c { d } else e"),
        "if a {\n    b;\n} elif c {\n    d;\n} else {\n    e;\n};\n"
    );
}

#[test]
fn functions_with_defaults_and_statics() {
    assert_eq!(
        printed("fn(a, b = 2) static { let n = 0 } { return a + b }"),
        "fn(a, b = 2) static {\n    let n = 0;\n} {\n    return (a + b);\n};\n"
    );
}

#[test]
fn labeled_loops_and_transfers() {
    assert_eq!(
        printed("outer: while true { break outer: 5; continue outer }"),
        "outer: while true {\n    break outer: 5;\n    continue outer;\n};\n"
    );
}

#[test]
fn return_value_must_share_the_line() {
    assert_eq!(
        printed("fn() { return\n5 }"),
        "fn() {\n    return;\n    5;\n};\n"
    );
}

#[test]
fn for_loop_accepts_parenthesized_header() {
    assert_eq!(printed("for (x in xs) print(x)"), printed("for x in xs { print(x) }"));
}

#[test]
fn try_catch_and_literals() {
    assert_eq!(
        printed("try { throw \"boom\" } catch (e) { [1.5, 'c', null, void] }"),
        "try {\n    throw \"boom\";\n} catch e {\n    [1.5d, 'c', null, void];\n};\n"
    );
}

#[test]
fn comments_are_ignored() {
    assert_eq!(printed("1 /* two\nlines */ + // rest\n 2"), "(1 + 2);\n");
}

#[test]
fn printing_is_stable_under_reparsing() {
    let source = r#"
        let make = fn(start = 0) {
            let n = start
            return obj {
                next = fn() { n += 1; return n }
                private hidden = lazy { n * -2 }
            }
        }
        outer: for i in range(3) {
            if i == 1 { continue outer } else { print("i", i, "\t") }
        }
        do { x = x ** 2 } while x < 100
    "#;

    let first = printed(source);
    let second = printed(&first);

    assert_eq!(first, second);
}

#[test]
fn invalid_assignment_target() {
    assert!(parse_error("1 = 2").contains("Invalid assignment target"));
}

#[test]
fn required_parameter_after_default() {
    assert!(parse_error("fn(a = 1, b) {}").contains("follows a defaulted one"));
}

#[test]
fn duplicate_parameter() {
    assert!(parse_error("fn(a, a) {}").contains("Duplicate parameter"));
}

#[test]
fn positional_after_named_argument() {
    assert!(parse_error("f(a = 1, 2)").contains("Positional argument after named"));
}

#[test]
fn duplicate_named_argument() {
    assert!(parse_error("f(a = 1, a = 2)").contains("Duplicate named argument"));
}

#[test]
fn label_must_precede_a_block_or_loop() {
    assert!(parse_error("here: 5").contains("Expected a block or loop after label"));
}

#[test]
fn try_requires_catch() {
    assert!(parse_error("try { 1 }").contains("Expected 'catch'"));
}

#[test]
fn trailing_tokens_after_a_complete_program() {
    assert!(parse_error("1 }").contains("Expected expression, found '}'"));
    assert!(parse_error("1 )").contains("Expected expression, found ')'"));
}

#[test]
fn parse_errors_carry_a_location() {
    let err = parse_source("let x = 1\nlet = 2", "script.shn").unwrap_err();
    let location = err.location().expect("parse errors have a location");

    assert_eq!(location.line, 2);
    assert!(err.to_string().starts_with("[script.shn:2:"));
}
