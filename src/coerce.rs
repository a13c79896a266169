//! Value coercions: `asBoolean`, `asString`, `asNumber`, `asArray`.
//!
//! Built-in kinds convert directly. Objects convert through a zero-argument
//! method of the same name; an object without one is a `shnap.TypeError`
//! (except for `asString`, which falls back to a placeholder).

use crate::function::Arguments;
use crate::interpreter::Interpreter;
use crate::numeric::{Number, Numeric};
use crate::result::Flow;
use crate::source::Location;
use crate::value::{Value, TYPE_ERROR};

impl Interpreter {
    /// Call the zero-argument conversion method `name` on an object, if it
    /// has one.
    fn convert_with(&mut self, value: &Value, name: &str, at: &Location) -> Flow<Option<Value>> {
        match self.find_method(value, name, 0) {
            Some(method) => {
                let converted = self.invoke(&method, Arguments::default(), at).into_flow()?;
                Ok(Some(converted))
            }
            None => Ok(None),
        }
    }

    fn type_error<T>(&self, value: &Value, target: &str, at: &Location) -> Flow<T> {
        Err(self.raise(
            TYPE_ERROR,
            format!("cannot convert {} to {}", value.type_name(), target),
            at,
        ))
    }

    pub fn as_boolean(&mut self, value: &Value, at: &Location) -> Flow<bool> {
        match value {
            Value::Num(Numeric::Bool(b)) => Ok(*b),
            Value::Num(n) => Ok(!n.magnitude().is_zero()),
            Value::Str(s) => Ok(!s.is_empty()),
            Value::Array(items) => Ok(!items.borrow().is_empty()),
            Value::Null | Value::Void => Ok(false),
            Value::Object(_) => match self.convert_with(value, "asBoolean", at)? {
                Some(converted @ (Value::Object(_) | Value::Function(_))) => {
                    self.type_error(&converted, "bool", at)
                }
                Some(converted) => self.as_boolean(&converted, at),
                None => self.type_error(value, "bool", at),
            },
            _ => self.type_error(value, "bool", at),
        }
    }

    pub fn as_string(&mut self, value: &Value, at: &Location) -> Flow<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            Value::Array(items) => {
                let items: Vec<Value> = items.borrow().clone();
                let mut parts = Vec::with_capacity(items.len());
                for item in &items {
                    parts.push(match item {
                        Value::Str(s) => format!("{s:?}"),
                        other => self.as_string(other, at)?,
                    });
                }
                Ok(format!("[{}]", parts.join(", ")))
            }
            Value::Object(_) => match self.convert_with(value, "asString", at)? {
                Some(Value::Str(s)) => Ok(s.to_string()),
                Some(converted @ Value::Object(_)) => self.type_error(&converted, "str", at),
                Some(converted) => self.as_string(&converted, at),
                None => Ok(value.to_string()),
            },
            other => Ok(other.to_string()),
        }
    }

    pub fn as_number(&mut self, value: &Value, at: &Location) -> Flow<Numeric> {
        match value {
            Value::Num(n) => Ok(n.clone()),
            Value::Str(s) => match Number::parse_literal(s.trim(), false) {
                Some(number) => Ok(Numeric::from(number)),
                None => self.type_error(value, "number", at),
            },
            Value::Object(_) => match self.convert_with(value, "asNumber", at)? {
                Some(Value::Num(n)) => Ok(n),
                Some(converted) => self.type_error(&converted, "number", at),
                None => self.type_error(value, "number", at),
            },
            _ => self.type_error(value, "number", at),
        }
    }

    pub fn as_array(&mut self, value: &Value, at: &Location) -> Flow<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::Str(s) => Ok(s.chars().map(Value::char).collect()),
            Value::Object(_) => match self.convert_with(value, "asArray", at)? {
                Some(Value::Array(items)) => Ok(items.borrow().clone()),
                Some(converted) => self.type_error(&converted, "array", at),
                None => self.type_error(value, "array", at),
            },
            _ => self.type_error(value, "array", at),
        }
    }
}
