use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use pretty_assertions::assert_eq;

use shnap::builtins::NativeRegistry;
use shnap::config::EngineConfig;
use shnap::interpreter::Interpreter;
use shnap::parser::parse_source;
use shnap::result::{ExecutionResult, State};
use shnap::value::Value;

/// Collects everything `print` writes.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn run(source: &str) -> ExecutionResult {
    let mut interpreter = Interpreter::new(EngineConfig::default());
    interpreter
        .run_source(source)
        .unwrap_or_else(|e| panic!("{source:?} failed to parse: {e}"))
}

/// Final value of a script that must complete normally.
fn value_of(source: &str) -> String {
    let result = run(source);
    assert_eq!(
        result.state(),
        State::Normal,
        "script ended abnormally with {}",
        result.value()
    );
    result.value().to_string()
}

/// Name of the error a script throws out of its top level.
fn thrown_error(source: &str) -> String {
    let result = run(source);
    assert_eq!(result.state(), State::Throwing, "script did not throw");

    match result.value() {
        Value::Error(error) => error.name.clone(),
        other => panic!("thrown value is not an error: {other}"),
    }
}

fn printed_by(source: &str) -> String {
    let buffer = SharedBuffer::default();
    let mut interpreter =
        Interpreter::new(EngineConfig::default()).with_output(Box::new(buffer.clone()));

    let result = interpreter.run_source(source).unwrap();
    assert_eq!(result.state(), State::Normal, "{}", result.value());

    buffer.contents()
}

// ───────────────────────── operators ─────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(value_of("1 + 2 * 3"), "7");
    assert_eq!(value_of("1 + 2 * 3 == 7"), "true");
    assert_eq!(value_of("(1 + 2) * 3"), "9");
    assert_eq!(value_of("2 ** 3 ** 2"), "512");
}

#[test]
fn negative_literal_is_squared() {
    assert_eq!(value_of("-2 ** 2"), "4");
    assert_eq!(value_of("let x = 2; -x ** 2"), "-4");
}

#[test]
fn integer_division_truncates() {
    assert_eq!(value_of("7 / 2"), "3");
    assert_eq!(value_of("-7 % 3"), "-1");
}

#[test]
fn numeric_promotion() {
    assert_eq!(value_of("type(1i + 1d)"), "dec");
    assert_eq!(value_of("true + true"), "2");
    assert_eq!(value_of("type(true + true)"), "int");
    assert_eq!(value_of("true + true == 2"), "true");
    assert_eq!(value_of("type(1 + 0.5)"), "dec");
}

#[test]
fn comparisons() {
    assert_eq!(
        value_of(r#"[1 < 2, 2 <= 2, 3 > 4, 4 >= 5, "a" < "b"]"#),
        "[true, true, false, false, true]"
    );
}

#[test]
fn boolean_operators_short_circuit() {
    let source = r#"
        let calls = 0
        let bump = fn() { calls += 1; return true }
        let a = false && bump()
        let b = true || bump()
        [a, b, calls]
    "#;
    assert_eq!(value_of(source), "[false, true, 0]");
}

#[test]
fn string_operators_are_order_aware() {
    assert_eq!(value_of(r#""ab" * 3"#), "ababab");
    assert_eq!(value_of(r#"1 + "a""#), "1a");
    assert_eq!(value_of(r#""a" + 1"#), "a1");
}

#[test]
fn division_by_zero_is_arithmetic_error() {
    assert_eq!(thrown_error("1 / 0"), "shnap.ArithmeticError");
}

#[test]
fn missing_operator_method_is_unsupported() {
    assert_eq!(thrown_error("null + 1"), "shnap.UnsupportedOperationError");
    assert_eq!(thrown_error("-obj {}"), "shnap.UnsupportedOperationError");
}

#[test]
fn user_operator_methods_receive_order() {
    let source = r#"
        let vec = fn(x) {
            return obj {
                v = x
                add = fn(other, order = 1) {
                    if order == 1 { return vec(v + other) }
                    return vec(other * 100 + v)
                }
            }
        }
        [(vec(1) + 2).v, (2 + vec(1)).v]
    "#;
    assert_eq!(value_of(source), "[3, 201]");
}

#[test]
fn equality_falls_back_to_identity() {
    let source = r#"
        let a = obj {}
        let b = a
        [a == b, a == obj {}, a === b, a != obj {}]
    "#;
    assert_eq!(value_of(source), "[true, false, true, true]");
}

#[test]
fn equality_uses_eq_from_either_side() {
    let source = r#"
        let p = obj { v = 1; eq = fn(other, order = 1) { return other.v == v } }
        let q = obj { v = 1 }
        [p == q, q == p]
    "#;
    assert_eq!(value_of(source), "[true, true]");
}

#[test]
fn arrays_compare_elementwise() {
    assert_eq!(value_of("[1, [2, 3]] == [1, [2, 3]]"), "true");
    assert_eq!(value_of("[1, 2] == [1, 3]"), "false");
}

#[test]
fn ordering_without_compare_to_falls_back_to_equality() {
    let source = r#"
        let a = obj {}
        let p = obj { equals = fn(other) { true } }
        [a <= a, a >= a, a <= obj {}, p <= obj {}, obj {} >= p, 2 <= 2]
    "#;
    assert_eq!(value_of(source), "[true, true, false, true, true, true]");
}

// ───────────────────────── scopes and bindings ─────────────────────────

#[test]
fn closures_capture_their_scope() {
    let source = r#"
        let make = fn() {
            let n = 0
            return fn() { n += 1; return n }
        }
        let c = make()
        c()
        c()
    "#;
    assert_eq!(value_of(source), "2");
}

#[test]
fn assignment_updates_the_owning_scope() {
    let source = r#"
        let x = 1
        { x = 2; let y = 3 }
        x
    "#;
    assert_eq!(value_of(source), "2");
    assert_eq!(thrown_error("{ let y = 3 }\ny"), "shnap.AbsentFieldError");
}

#[test]
fn compound_assignment_reads_before_the_right_side_runs() {
    assert_eq!(value_of("let x = 1; x += (x = 10); x"), "11");
    assert_eq!(value_of("let s = \"a\"; s += (s = \"b\"); s"), "ab");
}

#[test]
fn private_members_are_hidden_outside() {
    let source = r#"
        let o = obj {
            private secret = 42
            reveal = fn() { return secret }
        }
        o.reveal()
    "#;
    assert_eq!(value_of(source), "42");

    let outside = r#"
        let o = obj { private secret = 42 }
        o.secret
    "#;
    assert_eq!(thrown_error(outside), "shnap.AccessError");
}

#[test]
fn final_bindings_are_write_once() {
    assert_eq!(thrown_error("final x = 1\nx = 2"), "shnap.AccessError");
    assert_eq!(value_of("final y\ny = 5\ny"), "5");
    assert_eq!(thrown_error("final y\ny = 5\ny = 6"), "shnap.AccessError");
}

#[test]
fn finalize_native_locks_an_object_member() {
    let source = r#"
        let o = obj { v = 1 }
        finalize(o, "v")
        o.v = 2
    "#;
    assert_eq!(thrown_error(source), "shnap.AccessError");
}

#[test]
fn mixin_skips_private_and_noimport() {
    let source = r#"
        let source = obj {
            shared = 1
            private hidden = 2
            noimport local = 3
        }
        let target = mixin(source, obj {})
        [target.shared, delete(target, "hidden"), delete(target, "local")]
    "#;
    assert_eq!(value_of(source), "[1, false, false]");
}

#[test]
fn copy_makes_an_independent_object() {
    let source = r#"
        let a = obj { v = 1 }
        let b = copy(a)
        b.v = 2
        [a.v, b.v]
    "#;
    assert_eq!(value_of(source), "[1, 2]");
}

#[test]
fn lazy_values_are_forced_once() {
    let source = r#"
        let calls = 0
        let v = lazy { calls += 1; 10 }
        let before = calls
        let total = v + v
        [before, total, calls]
    "#;
    assert_eq!(value_of(source), "[0, 20, 1]");
}

// ───────────────────────── functions ─────────────────────────

#[test]
fn named_arguments_override_defaults() {
    let source = r#"
        let greet = fn(name, greeting = "Hello") { return greeting + ", " + name }
        [greet("Ann"), greet("Bob", greeting = "Hi")]
    "#;
    assert_eq!(value_of(source), r#"["Hello, Ann", "Hi, Bob"]"#);
}

#[test]
fn defaults_see_earlier_parameters() {
    assert_eq!(value_of("let f = fn(a, b = a * 2) { return a + b }\nf(3)"), "9");
}

#[test]
fn static_initializers_run_once() {
    let source = r#"
        let counter = fn() static { let n = 0 } { n += 1; return n }
        counter()
        counter()
        counter()
    "#;
    assert_eq!(value_of(source), "3");
}

#[test]
fn function_body_value_is_returned_without_return() {
    assert_eq!(value_of("let f = fn(x) { x * 2 }\nf(21)"), "42");
}

#[test]
fn natives_check_their_arity() {
    assert_eq!(thrown_error("len()"), "shnap.ArgumentError");
}

#[test]
fn missing_required_argument_does_not_see_outer_bindings() {
    assert_eq!(
        thrown_error("let x = 5\nlet f = fn(x) { x }\nf()"),
        "shnap.ArgumentError"
    );
    assert_eq!(
        thrown_error("let f = fn(a, b = 1) { a + b }\nf(b = 2)"),
        "shnap.ArgumentError"
    );
}

#[test]
fn argument_given_by_position_and_name_is_rejected() {
    assert_eq!(thrown_error("let f = fn(a) { a }\nf(1, a = 2)"), "shnap.ArgumentError");
    assert_eq!(value_of("let f = fn(a, b = 0) { a - b }\nf(5, b = 2)"), "3");
}

// ───────────────────────── control flow ─────────────────────────

#[test]
fn if_chain_selects_first_true_branch() {
    let source = r#"
        let classify = fn(n) {
            if n < 0 { "negative" } elif n == 0 { "zero" } else { "positive" }
        }
        [classify(-1), classify(0), classify(5)]
    "#;
    assert_eq!(value_of(source), r#"["negative", "zero", "positive"]"#);
}

#[test]
fn while_and_do_while() {
    assert_eq!(value_of("let i = 0\nwhile i < 5 { i += 1 }\ni"), "5");
    assert_eq!(value_of("let i = 10\ndo { i += 1 } while i < 5\ni"), "11");
}

#[test]
fn labeled_break_and_continue_cross_nested_loops() {
    let source = r#"
        let count = 0
        outer: for i in range(0, 3) {
            for j in range(0, 3) {
                if j == 1 { continue outer }
                if i == 2 { break outer: 99 }
                count += 1
            }
        }
        count
    "#;
    assert_eq!(value_of(source), "2");
}

#[test]
fn break_carries_a_value_out_of_a_loop() {
    assert_eq!(value_of("let r = while true { break 7 }\nr"), "7");
}

#[test]
fn named_block_consumes_its_own_break() {
    assert_eq!(value_of("blk: { break blk: 5; 6 }"), "5");
}

#[test]
fn stray_break_escapes_unnamed_block() {
    let result = run("{ break 1 }");
    assert_eq!(result.state(), State::Breaking);
}

#[test]
fn for_each_over_strings_and_user_iterators() {
    assert_eq!(
        value_of("let out = []\nfor c in \"abc\" { out.push(c) }\nout"),
        "[a, b, c]"
    );

    let source = r#"
        let counter = obj {
            iterator = fn() {
                let i = 0
                return obj {
                    hasNext = fn() { return i < 3 }
                    next = fn() { i += 1; return i }
                }
            }
        }
        let sum = 0
        for x in counter { sum += x }
        sum
    "#;
    assert_eq!(value_of(source), "6");
}

#[test]
fn return_passes_through_try() {
    let source = r#"
        let f = fn() {
            try { return 1 } catch e { return 2 }
            return 3
        }
        f()
    "#;
    assert_eq!(value_of(source), "1");
}

#[test]
fn try_catches_type_errors() {
    let source = r#"
        let caught = try {
            num(obj {})
        } catch e {
            [e.is("shnap.TypeError"), e.is("shnap.Error"), e.name]
        }
        caught
    "#;
    assert_eq!(value_of(source), r#"[true, true, "shnap.TypeError"]"#);
}

#[test]
fn user_errors_with_parents_and_cause() {
    let source = r#"
        try {
            throw error("app.Oops", "bad", error("io.Fail", "disk"), parents = ["app.Base"])
        } catch e {
            [e.is("app.Base"), e.is("io.Fail"), e.is("shnap.Error"), e.message]
        }
    "#;
    assert_eq!(value_of(source), r#"[true, true, true, "bad"]"#);
}

#[test]
fn uncaught_errors_keep_a_trace() {
    let source = r#"
        let inner = fn() { throw error("app.Deep", "down here") }
        let outer = fn() { inner() }
        outer()
    "#;
    let result = run(source);
    assert_eq!(result.state(), State::Throwing);

    let Value::Error(error) = result.value() else {
        panic!("expected an error value");
    };
    assert_eq!(error.name, "app.Deep");
    assert_eq!(error.trace.borrow().len(), 3);
}

#[test]
fn thrown_non_errors_are_plain_values() {
    let result = run("throw 5");
    assert_eq!(result.state(), State::Throwing);
    assert_eq!(result.value().to_string(), "5");
}

// ───────────────────────── natives and output ─────────────────────────

#[test]
fn print_writes_space_separated_line() {
    assert_eq!(printed_by(r#"print("a", 1, [2, "b"])"#), "a 1 [2, \"b\"]\n");
}

#[test]
fn object_conversions_use_methods() {
    let source = r#"
        let money = obj {
            asString = fn() { "$5" }
            asNumber = fn() { 5 }
            asBoolean = fn() { false }
        }
        [str(money), num(money) + 1, bool(money)]
    "#;
    assert_eq!(value_of(source), r#"["$5", 6, false]"#);
}

#[test]
fn range_len_and_array_methods() {
    assert_eq!(value_of("range(5)"), "[0, 1, 2, 3, 4]");
    assert_eq!(value_of("range(5, 0, step = -2)"), "[5, 3, 1]");
    assert_eq!(
        value_of("let xs = [1, 2]\nxs.push(3)\n[len(xs), xs.get(2), len(\"héllo\")]"),
        "[3, 3, 5]"
    );
    assert_eq!(thrown_error("[1].get(4)"), "shnap.IndexError");
}

#[test]
fn custom_registry_replaces_defaults() {
    let mut registry = NativeRegistry::new();
    registry.register("answer", 0, |_, _, _| Ok(Value::int(42)));

    let mut interpreter = Interpreter::with_registry(EngineConfig::default(), &registry);
    let result = interpreter.run_source("answer()").unwrap();
    assert_eq!(result.value().to_string(), "42");

    let result = interpreter.run_source("print(1)").unwrap();
    assert_eq!(result.state(), State::Throwing);
}

#[test]
fn pretty_printed_program_evaluates_the_same() {
    let source = r#"
        let fib = fn(n) {
            if n < 2 { return n }
            fib(n - 1) + fib(n - 2)
        }
        let out = []
        outer: for i in range(10) {
            if i % 2 == 0 { continue outer }
            if i > 7 { break outer: }
            out.push(fib(i) * -1)
        }
        let o = obj { private k = 1.5; get = fn() { k } }
        [out, o.get(), "tab\there"]
    "#;

    let original = parse_source(source, "original").unwrap();
    let reprinted = parse_source(&original.pretty_print(0), "reprinted").unwrap();

    let mut first = Interpreter::new(EngineConfig::default());
    let mut second = Interpreter::new(EngineConfig::default());
    let a = first.run(&original);
    let b = second.run(&reprinted);

    assert_eq!(a.state(), b.state());
    assert_eq!(a.value().to_string(), b.value().to_string());
    assert_eq!(a.value().to_string(), "[[-1, -2, -5, -13], 1.5, \"tab\\there\"]");
}

#[test]
fn parenthesized_assignments_survive_reprinting() {
    let cases = [
        ("let x = 0; (x = 1) + 2; x", "1"),
        ("let x = 0; 1 + (x = 2)", "3"),
        ("let x = 0; (x = 3) * (x = 4) + x", "16"),
        ("let f = fn(a) { a }; let y = 0; f((y = 4)) + y", "8"),
    ];

    for (source, expected) in cases {
        let original = parse_source(source, "original").unwrap();
        let text = original.pretty_print(0);
        let reprinted = parse_source(&text, "reprinted")
            .unwrap_or_else(|e| panic!("{text:?} failed to reparse: {e}"));

        let a = Interpreter::new(EngineConfig::default()).run(&original);
        let b = Interpreter::new(EngineConfig::default()).run(&reprinted);

        assert_eq!(a.value().to_string(), expected, "{source}");
        assert_eq!(b.value().to_string(), expected, "{text}");
    }
}
