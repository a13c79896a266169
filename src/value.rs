use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::function::Function;
use crate::instruction::Instruction;
use crate::numeric::Numeric;
use crate::scope::Scope;
use crate::source::Location;

/// Every value a script can hold.
#[derive(Debug, Clone)]
pub enum Value {
    /// "No value": the result of statements, and the signal that an
    /// operation is unsupported.
    Void,
    Null,
    Num(Numeric),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    /// A scope-bearing object.
    Object(Scope),
    /// A deferred value, forced the first time a binding holding it is read.
    Resolver(Rc<Resolver>),
    Error(Rc<ErrorValue>),
}

impl Value {
    pub fn bool(b: bool) -> Self {
        Value::Num(Numeric::Bool(b))
    }

    pub fn int<I: Into<BigInt>>(i: I) -> Self {
        Value::Num(Numeric::Int(i.into()))
    }

    pub fn decimal(d: BigDecimal) -> Self {
        Value::Num(Numeric::Decimal(d))
    }

    pub fn char(c: char) -> Self {
        Value::Num(Numeric::Char(c))
    }

    pub fn string<S: AsRef<str>>(s: S) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn error(error: ErrorValue) -> Self {
        Value::Error(Rc::new(error))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn as_numeric(&self) -> Option<&Numeric> {
        match self {
            Value::Num(n) => Some(n),
            _ => None,
        }
    }

    /// The scope backing member access, for values that have one.
    pub fn scope(&self) -> Option<Scope> {
        match self {
            Value::Object(scope) => Some(scope.clone()),
            Value::Function(function) => function.scope().cloned(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Null => "null",
            Value::Num(n) => n.kind_name(),
            Value::Str(_) => "str",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
            Value::Resolver(_) => "resolver",
            Value::Error(_) => "error",
        }
    }

    /// Structural identity used by `===`: scalars compare by kind and value,
    /// shared values by reference.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Resolver(a), Value::Resolver(b)) => Rc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Null => write!(f, "null"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "{s:?}")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name()),
            Value::Object(_) => write!(f, "<object>"),
            Value::Resolver(_) => write!(f, "<resolver>"),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}

/// A lazily evaluated value.
#[derive(Debug)]
pub struct Resolver {
    pub body: Rc<Instruction>,
    pub scope: Scope,
    pub cached: RefCell<Option<Value>>,
}

/// One entry of a diagnostic trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub location: Location,
    pub description: String,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} ({})", self.description, self.location)
    }
}

/// Root of every error raised by the engine.
pub const BASE_ERROR: &str = "shnap.Error";
pub const ABSENT_FIELD_ERROR: &str = "shnap.AbsentFieldError";
pub const ACCESS_ERROR: &str = "shnap.AccessError";
pub const TYPE_ERROR: &str = "shnap.TypeError";
pub const ARITHMETIC_ERROR: &str = "shnap.ArithmeticError";
pub const UNSUPPORTED_OPERATION_ERROR: &str = "shnap.UnsupportedOperationError";
pub const ARGUMENT_ERROR: &str = "shnap.ArgumentError";
pub const INDEX_ERROR: &str = "shnap.IndexError";

/// A first-class error value.
#[derive(Debug)]
pub struct ErrorValue {
    /// Dotted category, e.g. `shnap.TypeError`.
    pub name: String,
    pub message: String,
    pub cause: Option<Value>,
    /// Names this error also counts as for [`ErrorValue::is`].
    pub parents: Vec<String>,
    /// Frames active when the error was raised, innermost last.
    pub trace: RefCell<Vec<Frame>>,
}

impl ErrorValue {
    pub fn new<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        let name = name.into();
        let parents = if name == BASE_ERROR {
            Vec::new()
        } else {
            vec![BASE_ERROR.to_string()]
        };

        Self {
            name,
            message: message.into(),
            cause: None,
            parents,
            trace: RefCell::new(Vec::new()),
        }
    }

    pub fn with_cause(mut self, cause: Value) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_parents(mut self, parents: Vec<String>) -> Self {
        self.parents = parents;
        self
    }

    /// Hierarchy check: own name, declared parents, then the cause chain.
    pub fn is(&self, name: &str) -> bool {
        if self.name == name || self.parents.iter().any(|p| p == name) {
            return true;
        }

        match &self.cause {
            Some(Value::Error(cause)) => cause.is(name),
            _ => false,
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by {cause})")?;
        }
        Ok(())
    }
}
