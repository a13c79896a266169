use std::cmp::Ordering;

use num_bigint::BigInt;

use shnap::config::EngineConfig;
use shnap::interpreter::Interpreter;
use shnap::numeric::{MathContext, Number, NumericError, Numeric};

fn int(i: i64) -> Number {
    Number::Int(BigInt::from(i))
}

fn literal(text: &str) -> Number {
    Number::parse_literal(text, false).unwrap()
}

fn eval(source: &str) -> String {
    let mut interpreter = Interpreter::new(EngineConfig::default());
    let result = interpreter.run_source(source).unwrap();
    result.value().to_string()
}

#[test]
fn literals_pick_their_kind() {
    assert!(matches!(literal("42"), Number::Int(_)));
    assert!(matches!(literal("4.2"), Number::Decimal(_)));
    assert!(matches!(literal("4e2"), Number::Decimal(_)));
    assert!(matches!(Number::parse_literal("42", true), Some(Number::Decimal(_))));
    assert_eq!(Number::parse_literal("4x", false), None);
}

#[test]
fn mixed_arithmetic_promotes_to_decimal() {
    let sum = int(1).add(&literal("0.25"));
    assert_eq!(sum.to_string(), "1.25");
    assert!(matches!(sum, Number::Decimal(_)));
}

#[test]
fn compare_across_kinds() {
    assert_eq!(int(2).compare(&literal("2.0")), Ordering::Equal);
    assert_eq!(int(2).compare(&literal("2.5")), Ordering::Less);
    assert_eq!(literal("-0.5").signum(), -1);
}

#[test]
fn division_by_zero_is_reported() {
    let ctx = MathContext::default();
    assert_eq!(int(1).divide(&int(0), &ctx), Err(NumericError::DivisionByZero));
    assert_eq!(int(1).remainder(&int(0)), Err(NumericError::DivisionByZero));
    assert_eq!(literal("1.0").divide(&literal("0.0"), &ctx), Err(NumericError::DivisionByZero));
}

#[test]
fn negative_integer_exponent_gives_decimal() {
    let ctx = MathContext::default();
    let result = int(2).pow(&int(-2), &ctx).unwrap();
    assert_eq!(result.to_string(), "0.25");
}

#[test]
fn negative_base_with_fractional_exponent_is_a_domain_error() {
    let ctx = MathContext::default();
    assert!(matches!(
        int(-8).pow(&literal("0.5"), &ctx),
        Err(NumericError::Domain(_))
    ));
}

#[test]
fn bit_operations_need_integers() {
    assert_eq!(int(1).shift_left(&int(4)), Ok(int(16)));
    assert_eq!(int(16).shift_right(&int(2)), Ok(int(4)));
    assert_eq!(int(6).bitwise_xor(&int(3)), Ok(int(5)));
    assert_eq!(int(5).bitwise_not(), Ok(int(-6)));
    assert_eq!(literal("1.5").shift_left(&int(1)), Err(NumericError::Unsupported));
}

#[test]
fn wrapping_keeps_the_stronger_kind() {
    let result = Numeric::wrap_binary(&Numeric::Bool(true), &Numeric::Bool(true), int(2));
    assert_eq!(result, Numeric::Int(BigInt::from(2)));

    let result = Numeric::wrap_binary(&Numeric::Char('a'), &Numeric::Int(BigInt::from(1)), int(98));
    assert_eq!(result, Numeric::Char('b'));

    let result = Numeric::wrap_binary(&Numeric::Int(BigInt::from(1)), &Numeric::Char('a'), int(98));
    assert_eq!(result, Numeric::Char('b'));
}

#[test]
fn script_level_numeric_behaviour() {
    assert_eq!(eval("'a' + 1"), "b");
    assert_eq!(eval("type(1 / 2.0)"), "dec");
    assert_eq!(eval("1 / 2.0"), "0.5");
    assert_eq!(eval("1 << 10"), "1024");
    assert_eq!(eval("~0"), "-1");
    assert_eq!(eval("10 ** 20"), "100000000000000000000");
}

#[test]
fn decimal_shift_is_unsupported_in_scripts() {
    let mut interpreter = Interpreter::new(EngineConfig::default());
    let result = interpreter.run_source("try { 1.5 << 1 } catch e { e.name }").unwrap();
    assert_eq!(result.value().to_string(), "shnap.UnsupportedOperationError");
}
