//! The outcome of evaluating one instruction.
//!
//! Control flow is data: a `return`, `break`, `continue` or `throw` produces
//! an *abnormal* [`ExecutionResult`] that every enclosing construct hands
//! back unchanged until one that consumes that state is reached.

use std::fmt;
use std::rc::Rc;

use crate::source::Location;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Normal,
    Returning,
    Breaking,
    Continuing,
    Throwing,
}

impl State {
    pub fn keyword(self) -> &'static str {
        match self {
            State::Normal => "",
            State::Returning => "return",
            State::Breaking => "break",
            State::Continuing => "continue",
            State::Throwing => "throw",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Normal => "NORMAL",
            State::Returning => "RETURNING",
            State::Breaking => "BREAKING",
            State::Continuing => "CONTINUING",
            State::Throwing => "THROWING",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    value: Value,
    state: State,
    /// Target of a labeled `break`/`continue`.
    label: Option<Rc<str>>,
    location: Location,
}

/// Evaluation helper: `Err` carries an abnormal result up with `?`.
pub type Flow<T> = Result<T, ExecutionResult>;

impl ExecutionResult {
    pub fn new(value: Value, state: State, label: Option<Rc<str>>, location: Location) -> Self {
        Self {
            value,
            state,
            label,
            location,
        }
    }

    pub fn normal(value: Value, location: Location) -> Self {
        Self::new(value, State::Normal, None, location)
    }

    pub fn returning(value: Value, location: Location) -> Self {
        Self::new(value, State::Returning, None, location)
    }

    pub fn breaking(label: Option<Rc<str>>, value: Value, location: Location) -> Self {
        Self::new(value, State::Breaking, label, location)
    }

    pub fn continuing(label: Option<Rc<str>>, location: Location) -> Self {
        Self::new(Value::Void, State::Continuing, label, location)
    }

    pub fn throwing(value: Value, location: Location) -> Self {
        Self::new(value, State::Throwing, None, location)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn is_normal(&self) -> bool {
        self.state == State::Normal
    }

    pub fn is_abnormal(&self) -> bool {
        !self.is_normal()
    }

    /// Does this break/continue target a construct named `name`? Unlabeled
    /// transfers target the nearest loop.
    pub fn targets(&self, name: Option<&str>) -> bool {
        match self.label() {
            None => true,
            Some(label) => name == Some(label),
        }
    }

    /// Does this break/continue name exactly `name`?
    pub fn names(&self, name: Option<&str>) -> bool {
        self.label.is_some() && self.label() == name
    }

    pub fn into_flow(self) -> Flow<Value> {
        if self.is_normal() {
            Ok(self.value)
        } else {
            Err(self)
        }
    }

    pub fn from_flow(flow: Flow<Value>, location: &Location) -> Self {
        match flow {
            Ok(value) => Self::normal(value, location.clone()),
            Err(abnormal) => abnormal,
        }
    }
}
