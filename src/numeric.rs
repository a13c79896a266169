//! Arbitrary-precision numeric tower.
//!
//! Raw arithmetic works on [`Number`] magnitudes: exact integers
//! (`BigInt`) or decimals (`BigDecimal`). Mixed operations promote the
//! integer side to decimal first. The scripting-level numeric *kinds*
//! (integer, decimal, boolean, character) live in [`Numeric`]; after a raw
//! operation the kind with the higher casting precedence wraps the result,
//! the left operand winning ties.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use log::debug;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use thiserror::Error;

/// Why a raw numeric operation produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    /// The operation is not defined for these magnitudes (e.g. decimal shift).
    #[error("operation not supported for these operands")]
    Unsupported,

    #[error("division by zero")]
    DivisionByZero,

    /// Out of the operation's mathematical domain.
    #[error("{0}")]
    Domain(String),
}

pub type NumericResult = std::result::Result<Number, NumericError>;

/// Precision knobs for operations that cannot be computed exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathContext {
    /// Extra digits, beyond both operands' own digits, kept by decimal division.
    pub division_digits: u64,

    /// Significant digits produced by `exp`/`ln` based exponentiation.
    pub transcendental_digits: u64,
}

impl Default for MathContext {
    fn default() -> Self {
        Self {
            division_digits: 32,
            transcendental_digits: 34,
        }
    }
}

/// A raw numeric magnitude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Number {
    Int(BigInt),
    Decimal(BigDecimal),
}

/// Both operands after promotion.
enum Promoted {
    Ints(BigInt, BigInt),
    Decimals(BigDecimal, BigDecimal),
}

fn promote(a: &Number, b: &Number) -> Promoted {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Promoted::Ints(x.clone(), y.clone()),
        _ => Promoted::Decimals(a.to_decimal(), b.to_decimal()),
    }
}

fn ten_pow(exp: u64) -> BigInt {
    int_pow(&BigInt::from(10), exp)
}

fn digit_count(n: &BigInt) -> u64 {
    if n.is_zero() {
        1
    } else {
        n.abs().to_string().len() as u64
    }
}

/// Integer division rounding half away from zero.
fn div_round(num: &BigInt, den: &BigInt) -> BigInt {
    let (q, r) = num.div_rem(den);
    if r.abs() * BigInt::from(2) >= den.abs() {
        if num.is_negative() != den.is_negative() {
            q - 1
        } else {
            q + 1
        }
    } else {
        q
    }
}

/// `base ** exp` by binary exponentiation. The magnitude is raised first and
/// the sign restored from the exponent's parity.
pub fn int_pow(base: &BigInt, mut exp: u64) -> BigInt {
    let negative = base.is_negative() && exp % 2 == 1;
    let mut acc = BigInt::one();
    let mut square = base.abs();

    while exp > 0 {
        if exp & 1 == 1 {
            acc *= &square;
        }
        exp >>= 1;
        if exp > 0 {
            square = &square * &square;
        }
    }

    if negative {
        -acc
    } else {
        acc
    }
}

fn decimal_pow(base: &BigDecimal, mut exp: u64) -> BigDecimal {
    let mut acc = BigDecimal::one();
    let mut square = base.clone();

    while exp > 0 {
        if exp & 1 == 1 {
            acc = &acc * &square;
        }
        exp >>= 1;
        if exp > 0 {
            square = &square * &square;
        }
    }

    acc
}

/// Exact-as-configured decimal division. The result scale is derived from
/// both operands' scales and digit counts so terminating quotients come out
/// exact and non-terminating ones keep `ctx.division_digits` extra digits.
fn divide_decimals(a: &BigDecimal, b: &BigDecimal, ctx: &MathContext) -> NumericResult {
    if b.is_zero() {
        return Err(NumericError::DivisionByZero);
    }

    let (ma, sa) = a.as_bigint_and_exponent();
    let (mb, sb) = b.as_bigint_and_exponent();
    let scale = sa.max(sb).max(0) + (digit_count(&ma) + digit_count(&mb) + ctx.division_digits) as i64;

    // a / b = (ma / mb) * 10^(sb - sa); scaled to `scale` digits.
    let shift = scale - sa + sb;
    let quotient = if shift >= 0 {
        div_round(&(ma * ten_pow(shift as u64)), &mb)
    } else {
        div_round(&ma, &(mb * ten_pow(shift.unsigned_abs())))
    };

    Ok(Number::Decimal(BigDecimal::new(quotient, scale).normalized()))
}

fn remainder_decimals(a: &BigDecimal, b: &BigDecimal) -> NumericResult {
    if b.is_zero() {
        return Err(NumericError::DivisionByZero);
    }

    let (ma, sa) = a.as_bigint_and_exponent();
    let (mb, sb) = b.as_bigint_and_exponent();
    let scale = sa.max(sb);
    let aligned_a = ma * ten_pow((scale - sa) as u64);
    let aligned_b = mb * ten_pow((scale - sb) as u64);

    Ok(Number::Decimal(BigDecimal::new(aligned_a % aligned_b, scale)))
}

fn working_digits(ctx: &MathContext) -> u64 {
    ctx.transcendental_digits + 10
}

/// `e^x` by halving `x` below one, summing the Taylor series, and squaring
/// back up.
fn exp_decimal(x: &BigDecimal, ctx: &MathContext) -> BigDecimal {
    let digits = working_digits(ctx);
    let one = BigDecimal::one();
    let two = BigDecimal::from(2);
    let tolerance = BigDecimal::new(BigInt::one(), digits as i64 + 2);

    let mut reduced = x.clone();
    let mut halvings = 0u32;
    while reduced.abs() > one {
        reduced = &reduced / &two;
        halvings += 1;
    }

    let mut sum = BigDecimal::one();
    let mut term = BigDecimal::one();
    let mut n = 1u32;
    loop {
        term = (&term * &reduced / BigDecimal::from(n)).with_prec(digits);
        if term.abs() < tolerance {
            break;
        }
        sum += &term;
        n += 1;
    }

    for _ in 0..halvings {
        sum = (&sum * &sum).with_prec(digits);
    }

    sum
}

/// `ln(x)` for positive `x`: square-root reduction into `[0.5, 2]`, then the
/// `atanh` series `2 * sum(y^(2k+1) / (2k+1))` with `y = (x-1)/(x+1)`.
fn ln_decimal(x: &BigDecimal, ctx: &MathContext) -> Option<BigDecimal> {
    let digits = working_digits(ctx);
    let one = BigDecimal::one();
    let two = BigDecimal::from(2);
    let half = BigDecimal::new(BigInt::from(5), 1);
    let tolerance = BigDecimal::new(BigInt::one(), digits as i64 + 2);

    let mut reduced = x.clone();
    let mut roots = 0u32;
    while reduced > two || reduced < half {
        reduced = reduced.sqrt()?.with_prec(digits);
        roots += 1;
    }

    let y = ((&reduced - &one) / (&reduced + &one)).with_prec(digits);
    let y_squared = (&y * &y).with_prec(digits);
    let mut power = y.clone();
    let mut sum = y;
    let mut k = 1u32;
    loop {
        power = (&power * &y_squared).with_prec(digits);
        let term = (&power / BigDecimal::from(2 * k + 1)).with_prec(digits);
        if term.abs() < tolerance {
            break;
        }
        sum += term;
        k += 1;
    }

    let scale = int_pow(&BigInt::from(2), u64::from(roots) + 1);
    Some((sum * BigDecimal::from(scale)).with_prec(digits))
}

impl Number {
    /// Parse a literal's digits (suffix already removed).
    pub fn parse_literal(text: &str, decimal: bool) -> Option<Number> {
        if decimal || text.contains(['.', 'e', 'E']) {
            BigDecimal::from_str(text).ok().map(Number::Decimal)
        } else {
            BigInt::from_str(text).ok().map(Number::Int)
        }
    }

    pub fn to_decimal(&self) -> BigDecimal {
        match self {
            Number::Int(i) => BigDecimal::from(i.clone()),
            Number::Decimal(d) => d.clone(),
        }
    }

    /// The exact integer value, if there is one.
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Number::Int(i) => Some(i.clone()),
            Number::Decimal(d) if d.is_integer() => Some(d.with_scale(0).as_bigint_and_exponent().0),
            Number::Decimal(_) => None,
        }
    }

    pub fn to_char(&self) -> Option<char> {
        self.to_bigint()
            .and_then(|i| i.to_u32())
            .and_then(char::from_u32)
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_bigint().and_then(|i| i.to_i64())
    }

    pub fn is_integral(&self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Decimal(d) => d.is_integer(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => i.is_zero(),
            Number::Decimal(d) => d.is_zero(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Number::Int(i) => i.is_negative(),
            Number::Decimal(d) => d.is_negative(),
        }
    }

    /// -1, 0 or 1.
    pub fn signum(&self) -> i32 {
        match self.compare(&Number::Int(BigInt::zero())) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    pub fn compare(&self, other: &Number) -> Ordering {
        match promote(self, other) {
            Promoted::Ints(a, b) => a.cmp(&b),
            Promoted::Decimals(a, b) => a.cmp(&b),
        }
    }

    pub fn add(&self, other: &Number) -> Number {
        match promote(self, other) {
            Promoted::Ints(a, b) => Number::Int(a + b),
            Promoted::Decimals(a, b) => Number::Decimal(a + b),
        }
    }

    pub fn subtract(&self, other: &Number) -> Number {
        match promote(self, other) {
            Promoted::Ints(a, b) => Number::Int(a - b),
            Promoted::Decimals(a, b) => Number::Decimal(a - b),
        }
    }

    pub fn multiply(&self, other: &Number) -> Number {
        match promote(self, other) {
            Promoted::Ints(a, b) => Number::Int(a * b),
            Promoted::Decimals(a, b) => Number::Decimal(a * b),
        }
    }

    /// Integer division truncates toward zero; decimal division keeps the
    /// precision described on [`MathContext`].
    pub fn divide(&self, other: &Number, ctx: &MathContext) -> NumericResult {
        match promote(self, other) {
            Promoted::Ints(_, b) if b.is_zero() => Err(NumericError::DivisionByZero),
            Promoted::Ints(a, b) => Ok(Number::Int(a / b)),
            Promoted::Decimals(a, b) => divide_decimals(&a, &b, ctx),
        }
    }

    /// Truncated remainder; the sign follows the dividend.
    pub fn remainder(&self, other: &Number) -> NumericResult {
        match promote(self, other) {
            Promoted::Ints(_, b) if b.is_zero() => Err(NumericError::DivisionByZero),
            Promoted::Ints(a, b) => Ok(Number::Int(a % b)),
            Promoted::Decimals(a, b) => remainder_decimals(&a, &b),
        }
    }

    pub fn pow(&self, exponent: &Number, ctx: &MathContext) -> NumericResult {
        debug!("Computing {} ** {}", self, exponent);

        if let Some(exp) = exponent.to_bigint() {
            if exp.is_negative() {
                if self.is_zero() {
                    return Err(NumericError::DivisionByZero);
                }
                let positive = self.pow(&Number::Int(-exp), ctx)?;
                return Number::Decimal(BigDecimal::one()).divide(&positive, ctx);
            }

            let exp = exp
                .to_u64()
                .ok_or_else(|| NumericError::Domain("exponent too large".into()))?;

            return Ok(match self {
                Number::Int(base) => Number::Int(int_pow(base, exp)),
                Number::Decimal(base) => Number::Decimal(decimal_pow(base, exp)),
            });
        }

        let base = self.to_decimal();
        if base.is_negative() {
            return Err(NumericError::Domain(
                "negative base raised to a non-integer power".into(),
            ));
        }
        if base.is_zero() {
            return if exponent.is_negative() {
                Err(NumericError::DivisionByZero)
            } else {
                Ok(Number::Decimal(BigDecimal::zero()))
            };
        }

        let ln = ln_decimal(&base, ctx)
            .ok_or_else(|| NumericError::Domain("logarithm undefined".into()))?;
        let product = (exponent.to_decimal() * ln).with_prec(working_digits(ctx));
        let result = exp_decimal(&product, ctx).with_prec(ctx.transcendental_digits);

        Ok(Number::Decimal(result.normalized()))
    }

    fn integers(&self, other: &Number) -> std::result::Result<(BigInt, BigInt), NumericError> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Ok((a.clone(), b.clone())),
            _ => Err(NumericError::Unsupported),
        }
    }

    pub fn shift_left(&self, other: &Number) -> NumericResult {
        let (a, b) = self.integers(other)?;
        let amount = b
            .abs()
            .to_usize()
            .ok_or_else(|| NumericError::Domain("shift amount too large".into()))?;

        Ok(Number::Int(if b.is_negative() { a >> amount } else { a << amount }))
    }

    pub fn shift_right(&self, other: &Number) -> NumericResult {
        let (a, b) = self.integers(other)?;
        Number::Int(a).shift_left(&Number::Int(-b))
    }

    pub fn bitwise_and(&self, other: &Number) -> NumericResult {
        let (a, b) = self.integers(other)?;
        Ok(Number::Int(a & b))
    }

    pub fn bitwise_or(&self, other: &Number) -> NumericResult {
        let (a, b) = self.integers(other)?;
        Ok(Number::Int(a | b))
    }

    pub fn bitwise_xor(&self, other: &Number) -> NumericResult {
        let (a, b) = self.integers(other)?;
        Ok(Number::Int(a ^ b))
    }

    pub fn negate(&self) -> Number {
        match self {
            Number::Int(i) => Number::Int(-i),
            Number::Decimal(d) => Number::Decimal(-d),
        }
    }

    pub fn bitwise_not(&self) -> NumericResult {
        match self {
            Number::Int(i) => Ok(Number::Int(-i - 1)),
            Number::Decimal(_) => Err(NumericError::Unsupported),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Decimal(d) => write!(f, "{d}"),
        }
    }
}

/// The scripting-level numeric kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Numeric {
    Bool(bool),
    Int(BigInt),
    Decimal(BigDecimal),
    Char(char),
}

impl Numeric {
    /// The underlying magnitude: booleans are 0/1, characters their codepoint.
    pub fn magnitude(&self) -> Number {
        match self {
            Numeric::Bool(b) => Number::Int(BigInt::from(u8::from(*b))),
            Numeric::Int(i) => Number::Int(i.clone()),
            Numeric::Decimal(d) => Number::Decimal(d.clone()),
            Numeric::Char(c) => Number::Int(BigInt::from(u32::from(*c))),
        }
    }

    /// Rank used to decide which operand's kind wraps a binary result.
    pub fn casting_precedence(&self, result: &Number) -> i32 {
        match self {
            Numeric::Char(_) if result.to_char().is_some() && matches!(result, Number::Int(_)) => {
                100
            }
            Numeric::Char(_) => -1,
            Numeric::Decimal(_) => 60,
            Numeric::Int(_) => 50,
            Numeric::Bool(_) => 0,
        }
    }

    /// Wrap a raw result back into this kind. Booleans never wrap: their
    /// results become integers. A decimal result stays decimal.
    pub fn copy_with(&self, result: Number) -> Numeric {
        match (self, result) {
            (Numeric::Char(_), Number::Int(i)) => match i.to_u32().and_then(char::from_u32) {
                Some(c) => Numeric::Char(c),
                None => Numeric::Int(i),
            },
            (Numeric::Decimal(_), n) => Numeric::Decimal(n.to_decimal()),
            (_, Number::Int(i)) => Numeric::Int(i),
            (_, Number::Decimal(d)) => Numeric::Decimal(d),
        }
    }

    /// Pick the winning kind for a binary result, left operand on ties.
    pub fn wrap_binary(left: &Numeric, right: &Numeric, result: Number) -> Numeric {
        if right.casting_precedence(&result) > left.casting_precedence(&result) {
            right.copy_with(result)
        } else {
            left.copy_with(result)
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Numeric::Bool(_) => "bool",
            Numeric::Int(_) => "int",
            Numeric::Decimal(_) => "dec",
            Numeric::Char(_) => "char",
        }
    }
}

impl From<Number> for Numeric {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Numeric::Int(i),
            Number::Decimal(d) => Numeric::Decimal(d),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Bool(b) => write!(f, "{b}"),
            Numeric::Int(i) => write!(f, "{i}"),
            Numeric::Decimal(d) => write!(f, "{d}"),
            Numeric::Char(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn int_pow_keeps_sign_by_parity() {
        assert_eq!(int_pow(&BigInt::from(-2), 3), BigInt::from(-8));
        assert_eq!(int_pow(&BigInt::from(-2), 4), BigInt::from(16));
        assert_eq!(int_pow(&BigInt::from(7), 0), BigInt::one());
    }

    #[test]
    fn decimal_division_is_exact_when_terminating() {
        let q = divide_decimals(&dec("1"), &dec("8"), &MathContext::default()).unwrap();
        assert_eq!(q, Number::Decimal(dec("0.125")));
    }

    #[test]
    fn decimal_division_rounds_repeating_quotients() {
        let Number::Decimal(q) =
            divide_decimals(&dec("2"), &dec("3"), &MathContext::default()).unwrap()
        else {
            panic!("expected decimal");
        };
        assert!(q.to_string().starts_with("0.6666666666"));
        assert!(q.to_string().ends_with('7'));
    }

    #[test]
    fn transcendental_square_root() {
        let ctx = MathContext::default();
        let root = Number::Int(BigInt::from(2))
            .pow(&Number::Decimal(dec("0.5")), &ctx)
            .unwrap();
        let Number::Decimal(root) = root else {
            panic!("expected decimal");
        };
        assert!(root.to_string().starts_with("1.41421356237309504880"));
    }

    #[test]
    fn exp_and_ln_are_inverse() {
        let ctx = MathContext::default();
        let ln = ln_decimal(&dec("10"), &ctx).unwrap();
        let back = exp_decimal(&ln, &ctx).with_prec(20);
        assert_eq!(back.round(10), dec("10"));
    }
}
