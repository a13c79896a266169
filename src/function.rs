//! Callable values.
//!
//! User closures and host-supplied native functions share one entry point,
//! [`Function::invoke`], so call sites never need to know which kind they
//! hold.

use std::fmt;
use std::rc::Rc;

use crate::instruction::{Instruction, Parameter};
use crate::interpreter::Interpreter;
use crate::result::ExecutionResult;
use crate::scope::Scope;
use crate::source::Location;
use crate::value::Value;

/// Arguments of one call.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: Vec::new(),
        }
    }

    pub fn with_named<S: Into<String>>(mut self, name: S, value: Value) -> Self {
        self.named.push((name.into(), value));
        self
    }

    /// Positional argument `index`, or `void` when missing.
    pub fn get(&self, index: usize) -> Value {
        self.positional.get(index).cloned().unwrap_or(Value::Void)
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Operand position passed by operator dispatch: 1 when the receiver is
    /// the left operand, 2 when it is the right.
    pub fn order(&self) -> u8 {
        match self.named("order") {
            Some(Value::Num(n)) if n.magnitude().to_i64() == Some(2) => 2,
            _ => 1,
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }
}

pub type NativeFn = dyn Fn(&mut Interpreter, Arguments, &Location) -> ExecutionResult;

/// A function implemented by the host.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: Rc<str>,
    /// Required positional parameter count, consulted by operator dispatch.
    pub required: usize,
    pub func: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, required: usize, func: F) -> Self
    where
        F: Fn(&mut Interpreter, Arguments, &Location) -> ExecutionResult + 'static,
    {
        Self {
            name: Rc::from(name),
            required,
            func: Rc::new(func),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({}/{})", self.name, self.required)
    }
}

/// A user-defined function: parameters and body plus its own scope, whose
/// parent is the scope the function was created in. Static initializers
/// have already run against that scope.
#[derive(Debug, Clone)]
pub struct Closure {
    pub parameters: Rc<[Parameter]>,
    pub body: Rc<Instruction>,
    pub scope: Scope,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum Function {
    Closure(Closure),
    Native(NativeFunction),
}

impl Function {
    pub fn native<F>(name: &str, required: usize, func: F) -> Rc<Function>
    where
        F: Fn(&mut Interpreter, Arguments, &Location) -> ExecutionResult + 'static,
    {
        Rc::new(Function::Native(NativeFunction::new(name, required, func)))
    }

    pub fn name(&self) -> String {
        match self {
            Function::Closure(c) => format!("fn@{}", c.location),
            Function::Native(n) => n.name.to_string(),
        }
    }

    pub fn required_parameters(&self) -> usize {
        match self {
            Function::Closure(c) => Instruction::required_parameters(&c.parameters),
            Function::Native(n) => n.required,
        }
    }

    /// The function's own scope (closures only).
    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Function::Closure(c) => Some(&c.scope),
            Function::Native(_) => None,
        }
    }

    /// Call with already-evaluated arguments.
    pub fn invoke(&self, args: Arguments, env: &mut Interpreter, at: &Location) -> ExecutionResult {
        match self {
            Function::Closure(closure) => env.call_closure(closure, args, at),
            Function::Native(native) => (native.func)(env, args, at),
        }
    }
}
