//! Native functions and the native methods of built-in value kinds.
//!
//! Global natives live in an explicit [`NativeRegistry`] that the
//! interpreter installs into its root scope; nothing here is process-global.
//! Methods on numbers, strings, arrays, errors and iterators are produced on
//! demand by [`native_member`], each bound to its receiver.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use log::{debug, info};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::function::{Arguments, Closure, Function, NativeFunction};
use crate::interpreter::Interpreter;
use crate::numeric::{MathContext, Number, NumericError, NumericResult, Numeric};
use crate::operator::Operator;
use crate::result::{ExecutionResult, Flow};
use crate::scope::{BindingFlags, Scope, ScopeError};
use crate::source::Location;
use crate::value::{
    ErrorValue, Value, ARGUMENT_ERROR, ARITHMETIC_ERROR, BASE_ERROR, INDEX_ERROR, TYPE_ERROR,
};

/// Build a native whose body reports abnormal outcomes through [`Flow`].
fn flow_native<F>(name: &str, required: usize, body: F) -> NativeFunction
where
    F: Fn(&mut Interpreter, Arguments, &Location) -> Flow<Value> + 'static,
{
    NativeFunction::new(name, required, move |env, args, at| {
        ExecutionResult::from_flow(body(env, args, at), at)
    })
}

fn method<F>(name: &str, required: usize, body: F) -> Value
where
    F: Fn(&mut Interpreter, Arguments, &Location) -> Flow<Value> + 'static,
{
    Value::Function(Rc::new(Function::Native(flow_native(name, required, body))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Named natives to install into a root scope.
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    natives: BTreeMap<String, NativeFunction>,
}

impl NativeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard natives.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry
            .register("print", 0, native_print)
            .register("str", 1, |env, args, at| {
                Ok(Value::string(env.as_string(&args.get(0), at)?))
            })
            .register("num", 1, |env, args, at| {
                Ok(Value::Num(env.as_number(&args.get(0), at)?))
            })
            .register("bool", 1, |env, args, at| {
                Ok(Value::bool(env.as_boolean(&args.get(0), at)?))
            })
            .register("array", 0, |env, args, at| match args.positional.first() {
                Some(value) => Ok(Value::array(env.as_array(value, at)?)),
                None => Ok(Value::array(Vec::new())),
            })
            .register("len", 1, native_len)
            .register("type", 1, |_, args, _| Ok(Value::string(args.get(0).type_name())))
            .register("range", 1, native_range)
            .register("error", 2, native_error)
            .register("clock", 0, |_, _, _| {
                let millis = Utc::now().timestamp_millis();
                Ok(Value::decimal(BigDecimal::new(BigInt::from(millis), 3)))
            })
            .register("mixin", 2, native_mixin)
            .register("delete", 2, native_delete)
            .register("copy", 1, |_, args, _| Ok(copy_value(&args.get(0))))
            .register("finalize", 2, native_finalize);

        registry
    }

    pub fn register<F>(&mut self, name: &str, required: usize, body: F) -> &mut Self
    where
        F: Fn(&mut Interpreter, Arguments, &Location) -> Flow<Value> + 'static,
    {
        debug!("Registering native '{}'", name);

        self.natives
            .insert(name.to_string(), flow_native(name, required, body));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.natives.keys().map(String::as_str)
    }

    /// Bind every native in `scope`, flagged so merges never copy them.
    pub fn install(&self, scope: &Scope) -> Result<(), ScopeError> {
        info!("Installing {} native(s)", self.natives.len());

        for (name, native) in &self.natives {
            let function = Rc::new(Function::Native(native.clone()));
            scope.set_locally(name, Value::Function(function))?;
            scope.set_flag(name, BindingFlags::DONT_IMPORT);
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Global natives
// ─────────────────────────────────────────────────────────────────────────────

fn native_print(env: &mut Interpreter, args: Arguments, at: &Location) -> Flow<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for value in &args.positional {
        parts.push(env.as_string(value, at)?);
    }

    env.write_line(&parts.join(" "), at)?;
    Ok(Value::Void)
}

fn native_len(env: &mut Interpreter, args: Arguments, at: &Location) -> Flow<Value> {
    let value = args.get(0);

    match &value {
        Value::Str(s) => Ok(Value::int(s.chars().count())),
        Value::Array(items) => Ok(Value::int(items.borrow().len())),
        _ => match env.find_method(&value, "len", 0) {
            Some(len) => env.invoke(&len, Arguments::default(), at).into_flow(),
            None => Err(env.raise(
                TYPE_ERROR,
                format!("{} has no length", value.type_name()),
                at,
            )),
        },
    }
}

fn integer_argument(env: &mut Interpreter, value: &Value, at: &Location) -> Flow<BigInt> {
    let number = env.as_number(value, at)?;
    match number.magnitude().to_bigint() {
        Some(i) => Ok(i),
        None => Err(env.raise(ARGUMENT_ERROR, format!("expected an integer, got {number}"), at)),
    }
}

/// `range(end)`, `range(start, end)`, `range(start, end, step)`.
fn native_range(env: &mut Interpreter, args: Arguments, at: &Location) -> Flow<Value> {
    let (start, end) = if args.len() >= 2 {
        (
            integer_argument(env, &args.get(0), at)?,
            integer_argument(env, &args.get(1), at)?,
        )
    } else {
        (BigInt::zero(), integer_argument(env, &args.get(0), at)?)
    };

    let step = match args.positional.get(2).or_else(|| args.named("step")) {
        Some(step) => integer_argument(env, step, at)?,
        None => BigInt::from(1),
    };

    if step.is_zero() {
        return Err(env.raise(ARGUMENT_ERROR, "range step must not be zero", at));
    }

    let mut items = Vec::new();
    let mut current = start;
    while (step.is_positive() && current < end) || (step.is_negative() && current > end) {
        items.push(Value::int(current.clone()));
        current += &step;
    }

    Ok(Value::array(items))
}

/// `error(name, message, cause?, parents = [...])`
fn native_error(env: &mut Interpreter, args: Arguments, at: &Location) -> Flow<Value> {
    let name = env.as_string(&args.get(0), at)?;
    let message = env.as_string(&args.get(1), at)?;

    let mut error = ErrorValue::new(name, message);

    match args.get(2) {
        Value::Void | Value::Null => {}
        cause => error = error.with_cause(cause),
    }

    if let Some(parents) = args.named("parents") {
        let mut names = Vec::new();
        for parent in env.as_array(parents, at)? {
            names.push(env.as_string(&parent, at)?);
        }
        if error.name != BASE_ERROR && !names.iter().any(|n| n == BASE_ERROR) {
            names.push(BASE_ERROR.to_string());
        }
        error = error.with_parents(names);
    }

    Ok(Value::error(error))
}

fn scope_argument(env: &Interpreter, value: &Value, at: &Location) -> Flow<Scope> {
    value.scope().ok_or_else(|| {
        env.raise(
            TYPE_ERROR,
            format!("expected an object, got {}", value.type_name()),
            at,
        )
    })
}

/// `mixin(source, target)`: copy the source's importable bindings.
fn native_mixin(env: &mut Interpreter, args: Arguments, at: &Location) -> Flow<Value> {
    let source = scope_argument(env, &args.get(0), at)?;
    let target_value = args.get(1);
    let target = scope_argument(env, &target_value, at)?;

    source
        .merge_into(&target)
        .map_err(|e| env.scope_error(e, at))?;

    Ok(target_value)
}

fn native_delete(env: &mut Interpreter, args: Arguments, at: &Location) -> Flow<Value> {
    let scope = scope_argument(env, &args.get(0), at)?;
    let name = env.as_string(&args.get(1), at)?;

    Ok(Value::bool(scope.del(&name)))
}

/// `finalize(object, name)`: make the binding write-once.
fn native_finalize(env: &mut Interpreter, args: Arguments, at: &Location) -> Flow<Value> {
    let target = args.get(0);
    let scope = scope_argument(env, &target, at)?;
    let name = env.as_string(&args.get(1), at)?;

    scope.set_flag(&name, BindingFlags::FINALIZED);
    Ok(target)
}

/// Shallow copy: objects and closures get a sibling scope, arrays a new
/// backing vector, everything else is shared.
fn copy_value(value: &Value) -> Value {
    match value {
        Value::Object(scope) => Value::Object(scope.copy()),
        Value::Array(items) => Value::array(items.borrow().clone()),
        Value::Function(function) => match function.as_ref() {
            Function::Closure(closure) => Value::Function(Rc::new(Function::Closure(Closure {
                scope: closure.scope.copy(),
                ..closure.clone()
            }))),
            Function::Native(_) => value.clone(),
        },
        other => other.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native members
// ─────────────────────────────────────────────────────────────────────────────

/// Member `name` of a built-in value: a bound method or a property.
pub fn native_member(value: &Value, name: &str) -> Option<Value> {
    match value {
        Value::Num(n) => number_member(n, name),
        Value::Str(s) => string_member(s, name),
        Value::Array(items) => array_member(items, name),
        Value::Error(e) => error_member(e, name),
        Value::Object(_) | Value::Function(_) if name == "copy" => {
            let receiver = value.clone();
            Some(method("copy", 0, move |_, _, _| Ok(copy_value(&receiver))))
        }
        _ => None,
    }
}

fn numeric_operator(name: &str) -> Option<Operator> {
    Some(match name {
        "add" => Operator::Add,
        "subtract" => Operator::Subtract,
        "multiply" => Operator::Multiply,
        "divide" => Operator::Divide,
        "remainder" => Operator::Remainder,
        "pow" => Operator::Pow,
        "shiftLeft" => Operator::ShiftLeft,
        "shiftRight" => Operator::ShiftRight,
        "bitwiseAnd" => Operator::BitwiseAnd,
        "bitwiseOr" => Operator::BitwiseOr,
        "bitwiseXor" => Operator::BitwiseXor,
        _ => return None,
    })
}

fn apply_numeric(op: Operator, a: &Number, b: &Number, ctx: &MathContext) -> NumericResult {
    match op {
        Operator::Add => Ok(a.add(b)),
        Operator::Subtract => Ok(a.subtract(b)),
        Operator::Multiply => Ok(a.multiply(b)),
        Operator::Divide => a.divide(b, ctx),
        Operator::Remainder => a.remainder(b),
        Operator::Pow => a.pow(b, ctx),
        Operator::ShiftLeft => a.shift_left(b),
        Operator::ShiftRight => a.shift_right(b),
        Operator::BitwiseAnd => a.bitwise_and(b),
        Operator::BitwiseOr => a.bitwise_or(b),
        Operator::BitwiseXor => a.bitwise_xor(b),
        _ => Err(NumericError::Unsupported),
    }
}

/// `Unsupported` becomes `void` so dispatch can try the other operand.
fn numeric_outcome(
    env: &Interpreter,
    outcome: std::result::Result<Numeric, NumericError>,
    at: &Location,
) -> Flow<Value> {
    match outcome {
        Ok(n) => Ok(Value::Num(n)),
        Err(NumericError::Unsupported) => Ok(Value::Void),
        Err(e) => Err(env.raise(ARITHMETIC_ERROR, e.to_string(), at)),
    }
}

/// The receiver and the other operand in source order.
fn ordered<T>(receiver: T, other: T, args: &Arguments) -> (T, T) {
    if args.order() == 2 {
        (other, receiver)
    } else {
        (receiver, other)
    }
}

fn number_member(n: &Numeric, name: &str) -> Option<Value> {
    let receiver = n.clone();
    let qualified = format!("{}.{}", n.kind_name(), name);

    if let Some(op) = numeric_operator(name) {
        return Some(method(&qualified, 1, move |env, args, at| {
            let Value::Num(other) = args.get(0) else {
                return Ok(Value::Void);
            };
            let (left, right) = ordered(receiver.clone(), other, &args);
            let ctx = env.math();
            let outcome = apply_numeric(op, &left.magnitude(), &right.magnitude(), &ctx)
                .map(|result| Numeric::wrap_binary(&left, &right, result));
            numeric_outcome(env, outcome, at)
        }));
    }

    let member = match name {
        "negate" => method(&qualified, 0, move |_, _, _| {
            Ok(Value::Num(receiver.copy_with(receiver.magnitude().negate())))
        }),
        "bitwiseNot" => method(&qualified, 0, move |env, _, at| {
            let outcome = receiver
                .magnitude()
                .bitwise_not()
                .map(|result| receiver.copy_with(result));
            numeric_outcome(env, outcome, at)
        }),
        "compareTo" => method(&qualified, 1, move |_, args, _| {
            let Value::Num(other) = args.get(0) else {
                return Ok(Value::Void);
            };
            let (left, right) = ordered(receiver.magnitude(), other.magnitude(), &args);
            Ok(Value::int(left.compare(&right) as i8))
        }),
        "eq" | "equals" => method(&qualified, 1, move |_, args, _| match args.get(0) {
            Value::Num(other) => Ok(Value::bool(
                receiver.magnitude().compare(&other.magnitude()).is_eq(),
            )),
            _ => Ok(Value::Void),
        }),
        "asString" => method(&qualified, 0, move |_, _, _| Ok(Value::string(receiver.to_string()))),
        _ => return None,
    };

    Some(member)
}

fn index_argument(env: &mut Interpreter, value: &Value, len: usize, at: &Location) -> Flow<usize> {
    let index = integer_argument(env, value, at)?;

    match index.to_usize() {
        Some(i) if i < len => Ok(i),
        _ => Err(env.raise(
            INDEX_ERROR,
            format!("index {index} out of bounds for length {len}"),
            at,
        )),
    }
}

fn string_member(s: &Rc<str>, name: &str) -> Option<Value> {
    let receiver = s.clone();
    let qualified = format!("str.{name}");

    let member = match name {
        "add" => method(&qualified, 1, move |env, args, at| {
            let other = env.as_string(&args.get(0), at)?;
            let (left, right) = ordered(receiver.to_string(), other, &args);
            Ok(Value::string(left + &right))
        }),
        "multiply" => method(&qualified, 1, move |_, args, _| match args.get(0) {
            Value::Num(n) => match n.magnitude().to_bigint().and_then(|i| i.to_usize()) {
                Some(times) => Ok(Value::string(receiver.repeat(times))),
                None => Ok(Value::Void),
            },
            _ => Ok(Value::Void),
        }),
        "compareTo" => method(&qualified, 1, move |_, args, _| match args.get(0) {
            Value::Str(other) => {
                let (left, right) = ordered(receiver.clone(), other, &args);
                Ok(Value::int(left.cmp(&right) as i8))
            }
            _ => Ok(Value::Void),
        }),
        "eq" | "equals" => method(&qualified, 1, move |_, args, _| match args.get(0) {
            Value::Str(other) => Ok(Value::bool(*receiver == *other)),
            _ => Ok(Value::Void),
        }),
        "len" => method(&qualified, 0, move |_, _, _| {
            Ok(Value::int(receiver.chars().count()))
        }),
        "charAt" => method(&qualified, 1, move |env, args, at| {
            let len = receiver.chars().count();
            let index = index_argument(env, &args.get(0), len, at)?;
            Ok(receiver.chars().nth(index).map(Value::char).unwrap_or(Value::Void))
        }),
        "asString" => method(&qualified, 0, move |_, _, _| Ok(Value::Str(receiver.clone()))),
        "iterator" => method(&qualified, 0, move |_, _, _| {
            Ok(make_iterator(receiver.chars().map(Value::char).collect()))
        }),
        _ => return None,
    };

    Some(member)
}

fn array_member(items: &Rc<RefCell<Vec<Value>>>, name: &str) -> Option<Value> {
    let receiver = items.clone();
    let qualified = format!("array.{name}");

    let member = match name {
        "add" => method(&qualified, 1, move |_, args, _| match args.get(0) {
            Value::Array(other) => {
                let mine = receiver.borrow().clone();
                let theirs = other.borrow().clone();
                let (mut left, right) = ordered(mine, theirs, &args);
                left.extend(right);
                Ok(Value::array(left))
            }
            _ => Ok(Value::Void),
        }),
        "get" => method(&qualified, 1, move |env, args, at| {
            let len = receiver.borrow().len();
            let index = index_argument(env, &args.get(0), len, at)?;
            Ok(receiver.borrow()[index].clone())
        }),
        "set" => method(&qualified, 2, move |env, args, at| {
            let len = receiver.borrow().len();
            let index = index_argument(env, &args.get(0), len, at)?;
            let value = args.get(1);
            receiver.borrow_mut()[index] = value.clone();
            Ok(value)
        }),
        "push" => method(&qualified, 1, move |_, args, _| {
            receiver.borrow_mut().push(args.get(0));
            Ok(Value::Array(receiver.clone()))
        }),
        "len" => method(&qualified, 0, move |_, _, _| {
            Ok(Value::int(receiver.borrow().len()))
        }),
        "eq" | "equals" => method(&qualified, 1, move |env, args, at| match args.get(0) {
            Value::Array(other) => {
                let mine = receiver.borrow().clone();
                let theirs = other.borrow().clone();
                if mine.len() != theirs.len() {
                    return Ok(Value::bool(false));
                }
                for (a, b) in mine.iter().zip(theirs.iter()) {
                    if !env.equals(a, b, at)? {
                        return Ok(Value::bool(false));
                    }
                }
                Ok(Value::bool(true))
            }
            _ => Ok(Value::Void),
        }),
        "iterator" => method(&qualified, 0, move |_, _, _| {
            Ok(make_iterator(receiver.borrow().clone()))
        }),
        _ => return None,
    };

    Some(member)
}

fn error_member(error: &Rc<ErrorValue>, name: &str) -> Option<Value> {
    match name {
        "name" => Some(Value::string(&error.name)),
        "message" => Some(Value::string(&error.message)),
        "cause" => Some(error.cause.clone().unwrap_or(Value::Null)),
        "trace" => Some(Value::array(
            error
                .trace
                .borrow()
                .iter()
                .map(|frame| Value::string(frame.to_string()))
                .collect(),
        )),
        "is" => {
            let receiver = error.clone();
            Some(method("error.is", 1, move |env, args, at| {
                let name = env.as_string(&args.get(0), at)?;
                Ok(Value::bool(receiver.is(&name)))
            }))
        }
        _ => None,
    }
}

/// An object with `hasNext()` and `next()` over a snapshot of `items`.
pub fn make_iterator(items: Vec<Value>) -> Value {
    let items: Rc<[Value]> = Rc::from(items);
    let position = Rc::new(Cell::new(0usize));
    let scope = Scope::new();

    let (remaining, cursor) = (items.clone(), position.clone());
    let has_next = method("iterator.hasNext", 0, move |_, _, _| {
        Ok(Value::bool(cursor.get() < remaining.len()))
    });

    let next = method("iterator.next", 0, move |env, _, at| {
        let index = position.get();
        match items.get(index) {
            Some(item) => {
                position.set(index + 1);
                Ok(item.clone())
            }
            None => Err(env.raise(INDEX_ERROR, "iterator exhausted", at)),
        }
    });

    // A fresh scope has no locked bindings.
    let _ = scope.set_locally("hasNext", has_next);
    let _ = scope.set_locally("next", next);

    Value::Object(scope)
}
