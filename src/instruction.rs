//! **Instruction tree**: the immutable AST produced by the parser and
//! walked by the [`Interpreter`].
//!
//! Every node carries the [`Location`] it was parsed from. All constructor
//! arguments are public fields so external tree walkers (serializers,
//! linters) can read and rebuild nodes without help from the engine.

use std::rc::Rc;

use crate::interpreter::Interpreter;
use crate::operator::Operator;
use crate::result::{ExecutionResult, State};
use crate::scope::{BindingFlags, Scope};
use crate::source::Location;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Instruction {
    pub location: Location,
    pub kind: InstructionKind,
}

/// A declared function parameter; parameters with a default form a suffix.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Instruction>,
}

/// A `name = value` argument at a call site.
#[derive(Debug, Clone)]
pub struct NamedArgument {
    pub name: String,
    pub value: Instruction,
}

/// One link of an `if` / `elif` / `else` chain. A missing condition is the
/// terminal `else`.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub condition: Option<Box<Instruction>>,
    pub body: Box<Instruction>,
    pub next: Option<Box<Conditional>>,
}

#[derive(Debug, Clone)]
pub enum InstructionKind {
    /// A constant: number, string, char, `true`, `false`, `null`, `void`.
    Literal(Value),

    /// `[a, b, c]`
    ArrayLiteral(Vec<Instruction>),

    /// `name` or `target.name`
    Get {
        target: Option<Box<Instruction>>,
        name: String,
    },

    /// `name = v`, `target.name = v`, `name += v`, `let name = v`
    Set {
        target: Option<Box<Instruction>>,
        name: String,
        /// Present for compound assignment; the binary operator to apply.
        operator: Option<Operator>,
        value: Box<Instruction>,
        /// Always define in the current scope instead of updating an owner.
        local: bool,
    },

    /// `target(args..., name = value...)`
    Invoke {
        target: Box<Instruction>,
        arguments: Vec<Instruction>,
        named: Vec<NamedArgument>,
    },

    /// Unary (`right` is `None`) or binary operator application.
    Operate {
        operator: Operator,
        left: Box<Instruction>,
        right: Option<Box<Instruction>>,
    },

    /// Statement list; evaluates to its last statement's value.
    Sequence(Vec<Instruction>),

    /// `fn(params) static { ... } body`
    MakeFunction {
        parameters: Rc<[Parameter]>,
        statics: Vec<Instruction>,
        body: Rc<Instruction>,
    },

    /// `obj { ... }`
    MakeObject { body: Box<Instruction> },

    /// `lazy body`
    MakeResolver { body: Rc<Instruction> },

    /// `private name = v`, `final name`, `noimport name`
    FlagAssign {
        flag: BindingFlags,
        name: String,
        value: Option<Box<Instruction>>,
    },

    /// `return v`, `break label: v`, `continue label`, `throw v`
    StateChange {
        state: State,
        label: Option<String>,
        value: Option<Box<Instruction>>,
    },

    If {
        label: Option<String>,
        chain: Conditional,
    },

    While {
        label: Option<String>,
        condition: Box<Instruction>,
        body: Box<Instruction>,
    },

    DoWhile {
        label: Option<String>,
        body: Box<Instruction>,
        condition: Box<Instruction>,
    },

    ForEach {
        label: Option<String>,
        variable: String,
        iterable: Box<Instruction>,
        body: Box<Instruction>,
    },

    TryCatch {
        label: Option<String>,
        body: Box<Instruction>,
        variable: String,
        handler: Box<Instruction>,
    },

    /// `{ ... }` run in its own child scope.
    ScopeBlock {
        label: Option<String>,
        body: Box<Instruction>,
    },
}

impl Instruction {
    pub fn new(kind: InstructionKind, location: Location) -> Self {
        Self { location, kind }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Evaluate against `scope`.
    pub fn evaluate(&self, scope: &Scope, env: &mut Interpreter) -> ExecutionResult {
        env.evaluate(self, scope)
    }

    /// Label of a labeled block or loop.
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::If { label, .. }
            | InstructionKind::While { label, .. }
            | InstructionKind::DoWhile { label, .. }
            | InstructionKind::ForEach { label, .. }
            | InstructionKind::TryCatch { label, .. }
            | InstructionKind::ScopeBlock { label, .. } => label.as_deref(),
            _ => None,
        }
    }

    /// Number of leading parameters without a default.
    pub fn required_parameters(parameters: &[Parameter]) -> usize {
        parameters
            .iter()
            .take_while(|p| p.default.is_none())
            .count()
    }

    /// A required parameter may not follow a defaulted one.
    pub fn parameters_are_ordered(parameters: &[Parameter]) -> bool {
        let required = Self::required_parameters(parameters);
        parameters[required..].iter().all(|p| p.default.is_some())
    }
}
