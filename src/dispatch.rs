//! Operator dispatch.
//!
//! Operators are not built into values: `a + b` calls the `add` method of
//! `a` with `b` and a named `order = 1`. When `a` has no such method, or
//! the call produces `void` or fails, `b.add(a, order = 2)` is tried. The
//! boolean operators short-circuit on `asBoolean`, identity compares values
//! directly, and comparisons are derived from `compareTo` and `eq`.

use std::cmp::Ordering;
use std::rc::Rc;

use log::debug;

use crate::builtins::native_member;
use crate::function::{Arguments, Function};
use crate::instruction::Instruction;
use crate::interpreter::Interpreter;
use crate::operator::Operator;
use crate::result::{ExecutionResult, Flow, State};
use crate::scope::Scope;
use crate::source::Location;
use crate::value::{Value, UNSUPPORTED_OPERATION_ERROR};

/// Outcome of trying a method on both operands.
enum Attempt {
    Succeeded(Value),
    /// Neither operand produced a value; the first failure, if any.
    Failed(Option<ExecutionResult>),
}

impl Interpreter {
    /// Evaluate an `Operate` node.
    pub(crate) fn operate(
        &mut self,
        operator: Operator,
        left: &Instruction,
        right: Option<&Instruction>,
        scope: &Scope,
        at: &Location,
    ) -> ExecutionResult {
        let flow = self.operate_flow(operator, left, right, scope, at);
        ExecutionResult::from_flow(flow, at)
    }

    fn operate_flow(
        &mut self,
        operator: Operator,
        left: &Instruction,
        right: Option<&Instruction>,
        scope: &Scope,
        at: &Location,
    ) -> Flow<Value> {
        match operator {
            Operator::And | Operator::Or => {
                let lhs = self.eval(left, scope)?;
                let truthy = self.as_boolean(&lhs, at)?;

                if truthy == (operator == Operator::Or) {
                    return Ok(Value::bool(truthy));
                }

                let rhs = match right {
                    Some(right) => self.eval(right, scope)?,
                    None => Value::Void,
                };
                Ok(Value::bool(self.as_boolean(&rhs, at)?))
            }
            Operator::Not => {
                let operand = self.eval(left, scope)?;
                Ok(Value::bool(!self.as_boolean(&operand, at)?))
            }
            _ => {
                let lhs = self.eval(left, scope)?;
                let rhs = match right {
                    Some(right) => Some(self.eval(right, scope)?),
                    None => None,
                };
                self.dispatch(&lhs, operator, rhs.as_ref(), at).into_flow()
            }
        }
    }

    /// Apply `operator` to already-evaluated operands. `right` is `None` for
    /// prefix operators.
    pub fn dispatch(
        &mut self,
        left: &Value,
        operator: Operator,
        right: Option<&Value>,
        at: &Location,
    ) -> ExecutionResult {
        let flow = self.dispatch_flow(left, operator.underlying(), right, at);
        ExecutionResult::from_flow(flow, at)
    }

    fn dispatch_flow(
        &mut self,
        left: &Value,
        operator: Operator,
        right: Option<&Value>,
        at: &Location,
    ) -> Flow<Value> {
        debug!("Dispatching '{}' on {}", operator, left.type_name());

        let Some(right) = right else {
            return match operator {
                Operator::Not => Ok(Value::bool(!self.as_boolean(left, at)?)),
                _ => self.unary(left, operator, at),
            };
        };

        match operator {
            Operator::Identical => Ok(Value::bool(left.identical(right))),
            Operator::NotIdentical => Ok(Value::bool(!left.identical(right))),
            Operator::And => {
                let both = self.as_boolean(left, at)? && self.as_boolean(right, at)?;
                Ok(Value::bool(both))
            }
            Operator::Or => {
                let either = self.as_boolean(left, at)? || self.as_boolean(right, at)?;
                Ok(Value::bool(either))
            }
            Operator::Equal => Ok(Value::bool(self.equals(left, right, at)?)),
            Operator::NotEqual => Ok(Value::bool(!self.equals(left, right, at)?)),
            Operator::Less => Ok(Value::bool(self.compare(left, right, at)?.is_lt())),
            Operator::Greater => Ok(Value::bool(self.compare(left, right, at)?.is_gt())),
            Operator::LessEqual => self.ordered_or_equal(left, right, Ordering::Less, at),
            Operator::GreaterEqual => self.ordered_or_equal(left, right, Ordering::Greater, at),
            _ => match self.attempt(left, right, operator.method_name(), at)? {
                Attempt::Succeeded(value) => Ok(value),
                Attempt::Failed(failure) => Err(self.unsupported(failure, left, operator, at)),
            },
        }
    }

    /// `-x`, `~x`: the operand's own zero-argument method, no swapping.
    fn unary(&mut self, operand: &Value, operator: Operator, at: &Location) -> Flow<Value> {
        let name = operator.method_name();

        if let Some(method) = self.find_method(operand, name, 0) {
            let result = self.invoke(&method, Arguments::default(), at);
            match result.state() {
                State::Normal if !result.value().is_void() => return Ok(result.into_value()),
                State::Throwing => return Err(result),
                _ => {}
            }
        }

        Err(self.unsupported(None, operand, operator, at))
    }

    /// Try `method` on the left operand, then on the right.
    fn attempt(
        &mut self,
        left: &Value,
        right: &Value,
        method: &str,
        at: &Location,
    ) -> Flow<Attempt> {
        let mut failure: Option<ExecutionResult> = None;

        for (receiver, other, order) in [(left, right, 1), (right, left, 2)] {
            let Some(function) = self.find_method(receiver, method, 1) else {
                continue;
            };

            let args = Arguments::new(vec![other.clone()]).with_named("order", Value::int(order));
            let result = self.invoke(&function, args, at);

            match result.state() {
                State::Normal if !result.value().is_void() => {
                    return Ok(Attempt::Succeeded(result.into_value()));
                }
                State::Throwing if failure.is_none() => failure = Some(result),
                _ => debug!("'{}' on operand {} gave no value", method, order),
            }
        }

        Ok(Attempt::Failed(failure))
    }

    fn unsupported(
        &self,
        failure: Option<ExecutionResult>,
        left: &Value,
        operator: Operator,
        at: &Location,
    ) -> ExecutionResult {
        failure.unwrap_or_else(|| {
            self.raise(
                UNSUPPORTED_OPERATION_ERROR,
                format!(
                    "operator '{}' is not supported for {}",
                    operator,
                    left.type_name()
                ),
                at,
            )
        })
    }

    /// `==`: `eq`, then `equals`, then identity.
    pub fn equals(&mut self, left: &Value, right: &Value, at: &Location) -> Flow<bool> {
        let mut failure = None;

        for method in ["eq", "equals"] {
            match self.attempt(left, right, method, at)? {
                Attempt::Succeeded(value) => return self.as_boolean(&value, at),
                Attempt::Failed(thrown) => {
                    if failure.is_none() {
                        failure = thrown;
                    }
                }
            }
        }

        match failure {
            Some(thrown) => Err(thrown),
            None => Ok(left.identical(right)),
        }
    }

    /// `compareTo`, reduced to an ordering by the sign of its result. The
    /// method sees `order` and answers for `left` against `right`.
    pub fn compare(&mut self, left: &Value, right: &Value, at: &Location) -> Flow<Ordering> {
        match self.try_compare(left, right, at)? {
            Some(ordering) => Ok(ordering),
            None => Err(self.unsupported(None, left, Operator::Less, at)),
        }
    }

    /// `None` when neither operand has a `compareTo`.
    fn try_compare(&mut self, left: &Value, right: &Value, at: &Location) -> Flow<Option<Ordering>> {
        match self.attempt(left, right, "compareTo", at)? {
            Attempt::Succeeded(Value::Num(n)) => Ok(Some(n.magnitude().signum().cmp(&0))),
            Attempt::Succeeded(other) => Err(self.raise(
                UNSUPPORTED_OPERATION_ERROR,
                format!("compareTo returned {}", other.type_name()),
                at,
            )),
            Attempt::Failed(None) => Ok(None),
            Attempt::Failed(failure) => Err(self.unsupported(failure, left, Operator::Less, at)),
        }
    }

    /// `<=` and `>=`: `wanted` ordering or `==`. Values that cannot be
    /// ordered still compare equal through `equals`.
    fn ordered_or_equal(
        &mut self,
        left: &Value,
        right: &Value,
        wanted: Ordering,
        at: &Location,
    ) -> Flow<Value> {
        let holds = match self.try_compare(left, right, at)? {
            Some(ordering) => ordering == wanted || self.equals(left, right, at)?,
            None => self.equals(left, right, at)?,
        };
        Ok(Value::bool(holds))
    }

    /// A callable member `name` taking exactly `required` parameters.
    /// Objects are searched locally only; built-in kinds expose native
    /// methods.
    pub fn find_method(&self, value: &Value, name: &str, required: usize) -> Option<Rc<Function>> {
        let member = match value {
            Value::Object(scope) => scope
                .get_local(name)
                .or_else(|| native_member(value, name)),
            Value::Function(function) => function
                .scope()
                .and_then(|scope| scope.get_local(name))
                .or_else(|| native_member(value, name)),
            _ => native_member(value, name),
        };

        match member {
            Some(Value::Function(function)) if function.required_parameters() == required => {
                Some(function)
            }
            _ => None,
        }
    }
}
